//! Grid hash mapping positions to the shared vertex created there.
//!
//! Cells are twice the tolerance wide, so a match within tolerance always
//! lies in the query point's cell or one of its 26 neighbours.

use std::collections::HashMap;

use crate::math::Point3;

use super::SharedVertexId;

type Cell = (i64, i64, i64);

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cells: HashMap<Cell, Vec<(Point3, SharedVertexId)>>,
    cell_size: f64,
    tolerance: f64,
}

impl SpatialHash {
    /// Creates an empty hash matching points within `tolerance` per axis.
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: tolerance * 2.0,
            tolerance,
        }
    }

    #[inline]
    fn cell_of(&self, p: &Point3) -> Cell {
        #[allow(clippy::cast_possible_truncation)]
        let discretize = |v: f64| (v / self.cell_size).floor() as i64;
        (discretize(p.x), discretize(p.y), discretize(p.z))
    }

    /// Returns the first stored vertex within tolerance of `point`.
    #[must_use]
    pub fn find(&self, point: &Point3) -> Option<SharedVertexId> {
        let (cx, cy, cz) = self.cell_of(point);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(entries) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if let Some((_, id)) = entries
                        .iter()
                        .find(|(p, _)| (p - point).amax() <= self.tolerance)
                    {
                        return Some(*id);
                    }
                }
            }
        }
        None
    }

    /// Records `id` at `point` without checking for duplicates.
    pub fn insert(&mut self, point: Point3, id: SharedVertexId) {
        self.cells.entry(self.cell_of(&point)).or_default().push((point, id));
    }
}
