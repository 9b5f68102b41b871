use super::TriangleId;

slotmap::new_key_type! {
    /// Unique identifier for a shared vertex in the mesh store.
    pub struct SharedVertexId;
}

/// A mesh position shared by the triangles that meet at it.
#[derive(Debug, Clone)]
pub struct SharedVertex {
    /// Index into the mesh position array.
    pub index: usize,
    /// Triangles using this vertex, in insertion order.
    pub triangles: Vec<TriangleId>,
}

impl SharedVertex {
    /// Creates a shared vertex with no incident triangles.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            triangles: Vec::new(),
        }
    }

    /// Whether `triangle` uses this vertex.
    #[must_use]
    pub fn uses(&self, triangle: TriangleId) -> bool {
        self.triangles.contains(&triangle)
    }
}
