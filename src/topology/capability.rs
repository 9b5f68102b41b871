//! Narrow views of a mesh used by the loop filling code.

use crate::error::TopologyError;
use crate::geometry::Aabb;
use crate::math::{Point3, Vector3};

use super::{SharedVertexId, TriangleId};

/// Read access to vertex positions.
pub trait VertexLookup {
    /// Position at `index` in the mesh position array.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::VertexOutOfRange` for an index past the end.
    fn vertex(&self, index: usize) -> Result<Point3, TopologyError>;

    /// Position-array index of a shared vertex.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::EntityNotFound` for a stale handle.
    fn vertex_index(&self, id: SharedVertexId) -> Result<usize, TopologyError>;

    /// Position of a shared vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle or its index is stale.
    fn position_of(&self, id: SharedVertexId) -> Result<Point3, TopologyError> {
        self.vertex(self.vertex_index(id)?)
    }

    /// Current bounds of the mesh triangles, `None` while they are unknown.
    fn mesh_bounds(&self) -> Option<Aabb>;
}

/// Creation of shared vertices.
pub trait SharedVertexFactory {
    /// Returns a shared vertex at `position`, reusing one that already lies
    /// there when `look_up_existing` is set.
    fn add_shared_vertex(&mut self, position: Point3, look_up_existing: bool) -> SharedVertexId;
}

/// Triangle insertion.
pub trait MeshMutation {
    /// Joins three shared vertices into a triangle.
    ///
    /// # Errors
    ///
    /// Returns an error for a stale handle or a repeated vertex.
    fn add_triangle(
        &mut self,
        sv0: SharedVertexId,
        sv1: SharedVertexId,
        sv2: SharedVertexId,
        normal: Vector3,
        update_bounds: bool,
        look_up_existing: bool,
    ) -> Result<TriangleId, TopologyError>;

    /// Sets the `original` flag of a triangle.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::EntityNotFound` for a stale handle.
    fn set_original(&mut self, id: TriangleId, original: bool) -> Result<(), TopologyError>;
}

/// Everything loop filling needs from a mesh.
pub trait MeshEditor: VertexLookup + SharedVertexFactory + MeshMutation {}

impl<T: VertexLookup + SharedVertexFactory + MeshMutation> MeshEditor for T {}
