pub mod capability;
pub mod shared_vertex;
pub mod spatial_hash;
pub mod triangle;

pub use capability::{MeshEditor, MeshMutation, SharedVertexFactory, VertexLookup};
pub use shared_vertex::{SharedVertex, SharedVertexId};
pub use triangle::{Triangle, TriangleId};

use crate::error::TopologyError;
use crate::geometry::Aabb;
use crate::math::{Point3, Vector3, POSITION_TOLERANCE};
use slotmap::SlotMap;
use spatial_hash::SpatialHash;

/// Arena that owns the positions, shared vertices and triangles of a mesh.
///
/// Triangles and shared vertices reference each other through generational
/// handles; adjacency is derived from each vertex's triangle list.
#[derive(Debug, Clone)]
pub struct MeshStore {
    positions: Vec<Point3>,
    shared_vertices: SlotMap<SharedVertexId, SharedVertex>,
    triangles: SlotMap<TriangleId, Triangle>,
    lookup: SpatialHash,
    bounds: Option<Aabb>,
    next_triangle_index: usize,
}

impl Default for MeshStore {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            shared_vertices: SlotMap::with_key(),
            triangles: SlotMap::with_key(),
            lookup: SpatialHash::new(POSITION_TOLERANCE),
            bounds: None,
            next_triangle_index: 0,
        }
    }
}

impl MeshStore {
    /// Creates a new, empty mesh store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Position operations ---

    /// Appends a raw position and returns its index.
    pub fn add_vertex(&mut self, position: Point3) -> usize {
        self.positions.push(position);
        self.positions.len() - 1
    }

    /// Returns the position at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::VertexOutOfRange` for an index past the end.
    pub fn vertex(&self, index: usize) -> Result<Point3, TopologyError> {
        self.positions
            .get(index)
            .copied()
            .ok_or(TopologyError::VertexOutOfRange {
                index,
                len: self.positions.len(),
            })
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    // --- Shared vertex operations ---

    /// Returns a shared vertex at `position`.
    ///
    /// With `look_up_existing`, a shared vertex already within
    /// [`POSITION_TOLERANCE`] per axis is returned instead of a new one.
    pub fn add_shared_vertex(&mut self, position: Point3, look_up_existing: bool) -> SharedVertexId {
        if look_up_existing {
            if let Some(id) = self.lookup.find(&position) {
                return id;
            }
        }
        let index = self.add_vertex(position);
        let id = self.shared_vertices.insert(SharedVertex::new(index));
        self.lookup.insert(position, id);
        id
    }

    /// Returns a reference to the shared vertex, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shared_vertex(&self, id: SharedVertexId) -> Result<&SharedVertex, TopologyError> {
        self.shared_vertices
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shared vertex".into()))
    }

    /// Position of a shared vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle or its position index is stale.
    pub fn position_of(&self, id: SharedVertexId) -> Result<Point3, TopologyError> {
        self.vertex(self.shared_vertex(id)?.index)
    }

    /// Shared vertex lying at `position`, if any.
    #[must_use]
    pub fn find_shared_vertex(&self, position: &Point3) -> Option<SharedVertexId> {
        self.lookup.find(position)
    }

    #[must_use]
    pub fn shared_vertex_count(&self) -> usize {
        self.shared_vertices.len()
    }

    pub fn shared_vertices(&self) -> impl Iterator<Item = (SharedVertexId, &SharedVertex)> {
        self.shared_vertices.iter()
    }

    // --- Triangle operations ---

    /// Joins three shared vertices into a triangle and returns its ID.
    ///
    /// With `look_up_existing`, a triangle already joining the same three
    /// vertices is returned unchanged. With `update_bounds`, the mesh bounds
    /// grow to hold the corners.
    ///
    /// # Errors
    ///
    /// Returns `TopologyError::EntityNotFound` for a stale handle and
    /// `TopologyError::RepeatedVertex` when two corners coincide.
    pub fn add_triangle(
        &mut self,
        sv0: SharedVertexId,
        sv1: SharedVertexId,
        sv2: SharedVertexId,
        normal: Vector3,
        update_bounds: bool,
        look_up_existing: bool,
    ) -> Result<TriangleId, TopologyError> {
        if sv0 == sv1 || sv1 == sv2 || sv0 == sv2 {
            return Err(TopologyError::RepeatedVertex);
        }
        let corners = [
            self.position_of(sv0)?,
            self.position_of(sv1)?,
            self.position_of(sv2)?,
        ];

        if look_up_existing {
            let existing = self
                .shared_vertex(sv0)?
                .triangles
                .iter()
                .copied()
                .find(|t| self.triangles.get(*t).is_some_and(|tri| tri.joins(sv0, sv1, sv2)));
            if let Some(id) = existing {
                return Ok(id);
            }
        }

        let index = self.next_triangle_index;
        self.next_triangle_index += 1;
        let id = self
            .triangles
            .insert(Triangle::new([sv0, sv1, sv2], index, normal));
        for sv in [sv0, sv1, sv2] {
            self.shared_vertex_mut(sv)?.triangles.push(id);
        }

        if update_bounds {
            let bounds = self
                .bounds
                .get_or_insert_with(|| Aabb::new(corners[0], corners[0]));
            for corner in &corners {
                bounds.expand(corner);
            }
        }
        Ok(id)
    }

    /// Removes a triangle and detaches it from its shared vertices.
    ///
    /// Bounds are left as they are; see [`MeshStore::rebuild_bounds`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn remove_triangle(&mut self, id: TriangleId) -> Result<Triangle, TopologyError> {
        let triangle = self
            .triangles
            .remove(id)
            .ok_or_else(|| TopologyError::EntityNotFound("triangle".into()))?;
        for sv in triangle.vertices {
            if let Some(shared) = self.shared_vertices.get_mut(sv) {
                shared.triangles.retain(|t| *t != id);
            }
        }
        Ok(triangle)
    }

    /// Returns a reference to the triangle, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn triangle(&self, id: TriangleId) -> Result<&Triangle, TopologyError> {
        self.triangles
            .get(id)
            .ok_or_else(|| TopologyError::EntityNotFound("triangle".into()))
    }

    /// Returns a mutable reference to the triangle, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn triangle_mut(&mut self, id: TriangleId) -> Result<&mut Triangle, TopologyError> {
        self.triangles
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("triangle".into()))
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> impl Iterator<Item = (TriangleId, &Triangle)> {
        self.triangles.iter()
    }

    /// Corner positions of a triangle.
    ///
    /// # Errors
    ///
    /// Returns an error if the triangle or one of its vertices is stale.
    pub fn triangle_positions(&self, id: TriangleId) -> Result<[Point3; 3], TopologyError> {
        let [a, b, c] = self.triangle(id)?.vertices;
        Ok([self.position_of(a)?, self.position_of(b)?, self.position_of(c)?])
    }

    // --- Adjacency queries ---

    /// Triangles using both `a` and `b`.
    ///
    /// # Errors
    ///
    /// Returns an error if either shared vertex is not found.
    pub fn edge_triangles(
        &self,
        a: SharedVertexId,
        b: SharedVertexId,
    ) -> Result<Vec<TriangleId>, TopologyError> {
        let other = self.shared_vertex(b)?;
        Ok(self
            .shared_vertex(a)?
            .triangles
            .iter()
            .copied()
            .filter(|t| other.uses(*t))
            .collect())
    }

    /// Triangles sharing an edge with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the triangle or one of its vertices is not found.
    pub fn triangle_neighbors(&self, id: TriangleId) -> Result<Vec<TriangleId>, TopologyError> {
        let mut neighbors = Vec::new();
        for (a, b) in self.triangle(id)?.edges() {
            for t in self.edge_triangles(a, b)? {
                if t != id && !neighbors.contains(&t) {
                    neighbors.push(t);
                }
            }
        }
        Ok(neighbors)
    }

    // --- Bounds ---

    /// Box around every triangle corner added with `update_bounds`.
    #[must_use]
    pub fn bounds(&self) -> Option<&Aabb> {
        self.bounds.as_ref()
    }

    /// Recomputes the bounds from the current triangles.
    pub fn rebuild_bounds(&mut self) {
        let corners: Vec<Point3> = self
            .triangles
            .values()
            .flat_map(|t| t.vertices)
            .filter_map(|sv| self.position_of(sv).ok())
            .collect();
        self.bounds = Aabb::from_points(&corners);
    }

    fn shared_vertex_mut(&mut self, id: SharedVertexId) -> Result<&mut SharedVertex, TopologyError> {
        self.shared_vertices
            .get_mut(id)
            .ok_or_else(|| TopologyError::EntityNotFound("shared vertex".into()))
    }
}

impl VertexLookup for MeshStore {
    fn vertex(&self, index: usize) -> Result<Point3, TopologyError> {
        Self::vertex(self, index)
    }

    fn vertex_index(&self, id: SharedVertexId) -> Result<usize, TopologyError> {
        Ok(self.shared_vertex(id)?.index)
    }

    fn mesh_bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}

impl SharedVertexFactory for MeshStore {
    fn add_shared_vertex(&mut self, position: Point3, look_up_existing: bool) -> SharedVertexId {
        Self::add_shared_vertex(self, position, look_up_existing)
    }
}

impl MeshMutation for MeshStore {
    fn add_triangle(
        &mut self,
        sv0: SharedVertexId,
        sv1: SharedVertexId,
        sv2: SharedVertexId,
        normal: Vector3,
        update_bounds: bool,
        look_up_existing: bool,
    ) -> Result<TriangleId, TopologyError> {
        Self::add_triangle(self, sv0, sv1, sv2, normal, update_bounds, look_up_existing)
    }

    fn set_original(&mut self, id: TriangleId, original: bool) -> Result<(), TopologyError> {
        self.triangle_mut(id)?.original = original;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, LoopfillError};
    use approx::assert_relative_eq;

    fn quad(mesh: &mut MeshStore) -> [SharedVertexId; 4] {
        [
            mesh.add_shared_vertex(Point3::new(0.0, 0.0, 0.0), true),
            mesh.add_shared_vertex(Point3::new(1.0, 0.0, 0.0), true),
            mesh.add_shared_vertex(Point3::new(1.0, 1.0, 0.0), true),
            mesh.add_shared_vertex(Point3::new(0.0, 1.0, 0.0), true),
        ]
    }

    #[test]
    fn shared_vertices_dedupe_within_tolerance() {
        let mut mesh = MeshStore::new();
        let a = mesh.add_shared_vertex(Point3::new(1.0, 2.0, 3.0), true);
        let b = mesh.add_shared_vertex(Point3::new(1.0 + 1e-7, 2.0, 3.0 - 1e-7), true);
        let c = mesh.add_shared_vertex(Point3::new(1.0, 2.0, 3.0), false);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(mesh.shared_vertex_count(), 2);
        assert_eq!(mesh.vertex_count(), 2);
        assert_relative_eq!(mesh.position_of(c).unwrap().z, 3.0);
    }

    #[test]
    fn triangles_link_their_vertices() {
        let mut mesh = MeshStore::new();
        let [a, b, c, d] = quad(&mut mesh);
        let t0 = mesh.add_triangle(a, b, c, Vector3::z(), true, false).unwrap();
        let t1 = mesh.add_triangle(a, c, d, Vector3::z(), true, false).unwrap();

        assert_eq!(mesh.edge_triangles(a, c).unwrap(), vec![t0, t1]);
        assert_eq!(mesh.edge_triangles(b, d).unwrap(), Vec::<TriangleId>::new());
        assert_eq!(mesh.triangle_neighbors(t0).unwrap(), vec![t1]);
        assert_eq!(mesh.triangle(t1).unwrap().index, 1);
        assert!(mesh.triangle(t0).unwrap().original);

        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.max.x, 1.0);
        assert_relative_eq!(bounds.max.y, 1.0);
    }

    #[test]
    fn existing_triangle_is_reused_on_request() {
        let mut mesh = MeshStore::new();
        let [a, b, c, _] = quad(&mut mesh);
        let t0 = mesh.add_triangle(a, b, c, Vector3::z(), false, false).unwrap();
        let same = mesh.add_triangle(c, a, b, Vector3::z(), false, true).unwrap();
        let fresh = mesh.add_triangle(c, a, b, Vector3::z(), false, false).unwrap();
        assert_eq!(t0, same);
        assert_ne!(t0, fresh);
        assert!(mesh.bounds().is_none());
    }

    #[test]
    fn removal_detaches_and_bounds_rebuild() {
        let mut mesh = MeshStore::new();
        let [a, b, c, d] = quad(&mut mesh);
        let far = mesh.add_shared_vertex(Point3::new(5.0, 0.0, 0.0), true);
        let t0 = mesh.add_triangle(a, b, c, Vector3::z(), true, false).unwrap();
        let t1 = mesh.add_triangle(b, far, c, Vector3::z(), true, false).unwrap();
        mesh.add_triangle(a, c, d, Vector3::z(), true, false).unwrap();

        mesh.remove_triangle(t1).unwrap();
        assert!(!mesh.shared_vertex(far).unwrap().uses(t1));
        assert_eq!(mesh.triangle_neighbors(t0).unwrap().len(), 1);
        assert_relative_eq!(mesh.bounds().unwrap().max.x, 5.0);

        mesh.rebuild_bounds();
        assert_relative_eq!(mesh.bounds().unwrap().max.x, 1.0);
        assert!(mesh.remove_triangle(t1).is_err());
    }

    #[test]
    fn bad_handles_and_repeats_are_errors() {
        let mut mesh = MeshStore::new();
        let [a, b, _, _] = quad(&mut mesh);
        let err = mesh.add_triangle(a, b, a, Vector3::z(), false, false).unwrap_err();
        assert_eq!(LoopfillError::from(err).kind(), ErrorKind::InvalidInput);

        let err = mesh.vertex(99).unwrap_err();
        assert_eq!(LoopfillError::from(err).kind(), ErrorKind::IndexOutOfRange);
    }

    #[test]
    fn capability_traits_delegate() {
        fn fill(editor: &mut impl MeshEditor) -> TriangleId {
            let a = editor.add_shared_vertex(Point3::new(0.0, 0.0, 0.0), true);
            let b = editor.add_shared_vertex(Point3::new(1.0, 0.0, 0.0), true);
            let c = editor.add_shared_vertex(Point3::new(0.0, 1.0, 0.0), true);
            assert_relative_eq!(editor.position_of(b).unwrap().x, 1.0);
            let t = MeshMutation::add_triangle(editor, a, b, c, Vector3::z(), true, true).unwrap();
            editor.set_original(t, false).unwrap();
            t
        }

        let mut mesh = MeshStore::new();
        let t = fill(&mut mesh);
        assert!(!mesh.triangle(t).unwrap().original);
        assert_eq!(mesh.triangle_count(), 1);
    }
}
