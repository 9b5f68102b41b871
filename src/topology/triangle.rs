use crate::math::Vector3;

use super::SharedVertexId;

slotmap::new_key_type! {
    /// Unique identifier for a triangle in the mesh store.
    pub struct TriangleId;
}

/// A mesh triangle over three shared vertices.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct Triangle {
    pub vertices: [SharedVertexId; 3],
    /// Running insertion index.
    pub index: usize,
    pub normal: Vector3,
    pub visited: bool,
    pub selected: bool,
    pub on_edge: bool,
    /// Part of the mesh as loaded, as opposed to added by an edit.
    pub original: bool,
}

impl Triangle {
    /// Creates an original triangle with all other flags cleared.
    #[must_use]
    pub fn new(vertices: [SharedVertexId; 3], index: usize, normal: Vector3) -> Self {
        Self {
            vertices,
            index,
            normal,
            visited: false,
            selected: false,
            on_edge: false,
            original: true,
        }
    }

    /// Whether the triangle joins exactly the vertices `a`, `b` and `c`.
    #[must_use]
    pub fn joins(&self, a: SharedVertexId, b: SharedVertexId, c: SharedVertexId) -> bool {
        [a, b, c].iter().all(|v| self.vertices.contains(v))
    }

    /// The three edges as vertex pairs, in winding order.
    #[must_use]
    pub fn edges(&self) -> [(SharedVertexId, SharedVertexId); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}
