use crate::error::TriangulationError;
use crate::math::Point2;

use super::TriResult;

/// Side of a split trapezoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Left,
    Right,
}

/// A cell of the planar subdivision.
///
/// Bounded above by `hi`, below by `lo`, and on the sides by the `lseg` and
/// `rseg` segments (`None` toward infinity). Up to two neighbours share each
/// horizontal edge.
#[derive(Debug, Clone)]
pub struct Trapezoid {
    pub lseg: Option<usize>,
    pub rseg: Option<usize>,
    pub hi: Point2,
    pub lo: Point2,
    pub u0: Option<usize>,
    pub u1: Option<usize>,
    pub d0: Option<usize>,
    pub d1: Option<usize>,
    /// Sink node in the query DAG.
    pub sink: usize,
    /// Third upper neighbour parked while a segment threads through.
    pub usave: Option<usize>,
    pub uside: Side,
    pub valid: bool,
}

impl Default for Trapezoid {
    fn default() -> Self {
        Self {
            lseg: None,
            rseg: None,
            hi: Point2::origin(),
            lo: Point2::origin(),
            u0: None,
            u1: None,
            d0: None,
            d1: None,
            sink: 0,
            usave: None,
            uside: Side::Left,
            valid: true,
        }
    }
}

impl Trapezoid {
    /// Whether the trapezoid has no neighbour above or none below.
    #[must_use]
    pub fn is_triangular(&self) -> bool {
        (self.u0.is_none() && self.u1.is_none()) || (self.d0.is_none() && self.d1.is_none())
    }
}

/// Trapezoid storage; entries are invalidated, never removed.
#[derive(Debug, Clone, Default)]
pub struct TrapezoidTable {
    trapezoids: Vec<Trapezoid>,
}

impl TrapezoidTable {
    /// Creates a table with room for the trapezoids `segments` will need.
    #[must_use]
    pub fn with_segments(segments: usize) -> Self {
        Self {
            trapezoids: Vec::with_capacity(4 * segments + 4),
        }
    }

    /// Appends a fresh trapezoid and returns its index.
    pub fn push(&mut self, trapezoid: Trapezoid) -> usize {
        self.trapezoids.push(trapezoid);
        self.trapezoids.len() - 1
    }

    /// Number of entries, valid or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trapezoids.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trapezoids.is_empty()
    }

    /// Returns the trapezoid at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn get(&self, index: usize) -> TriResult<&Trapezoid> {
        let len = self.trapezoids.len();
        self.trapezoids
            .get(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "trapezoid",
                index,
                len,
            })
    }

    /// Returns the trapezoid at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn get_mut(&mut self, index: usize) -> TriResult<&mut Trapezoid> {
        let len = self.trapezoids.len();
        self.trapezoids
            .get_mut(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "trapezoid",
                index,
                len,
            })
    }

    /// Returns a valid trapezoid, rejecting invalidated ones.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index and
    /// `TriangulationError::BrokenLink` for an invalidated one.
    pub fn get_valid(&self, index: usize) -> TriResult<&Trapezoid> {
        let t = self.get(index)?;
        if t.valid {
            Ok(t)
        } else {
            Err(TriangulationError::BrokenLink {
                table: "trapezoid",
                detail: "reference to a merged trapezoid",
            })
        }
    }

    /// Iterates over `(index, trapezoid)` for valid entries.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &Trapezoid)> {
        self.trapezoids.iter().enumerate().filter(|(_, t)| t.valid)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn invalidated_entries_stay_addressable() {
        let mut table = TrapezoidTable::with_segments(3);
        let a = table.push(Trapezoid::default());
        let b = table.push(Trapezoid::default());
        table.get_mut(b).unwrap().valid = false;

        assert!(table.get(b).is_ok());
        assert!(table.get_valid(b).is_err());
        assert!(table.get_valid(a).is_ok());
        assert_eq!(table.iter_valid().count(), 1);
        assert!(table.get(7).is_err());
    }

    #[test]
    fn triangular_needs_an_open_side() {
        let mut t = Trapezoid {
            u0: Some(1),
            d0: Some(2),
            ..Trapezoid::default()
        };
        assert!(!t.is_triangular());
        t.d0 = None;
        assert!(t.is_triangular());
    }
}
