use crate::error::TriangulationError;
use crate::math::polygon_2d::cross;
use crate::math::Point2;

use super::TriResult;

/// `a` is above `b`, ties on y broken by larger x.
#[inline]
#[must_use]
pub fn greater_than(a: &Point2, b: &Point2) -> bool {
    if a.y > b.y {
        true
    } else if a.y < b.y {
        false
    } else {
        a.x > b.x
    }
}

/// `a` is above or equal to `b` in sweep order.
#[inline]
#[must_use]
pub fn greater_than_equal_to(a: &Point2, b: &Point2) -> bool {
    if a.y > b.y {
        true
    } else if a.y < b.y {
        false
    } else {
        a.x >= b.x
    }
}

/// `a` is below `b` in sweep order.
#[inline]
#[must_use]
pub fn less_than(a: &Point2, b: &Point2) -> bool {
    if a.y < b.y {
        true
    } else if a.y > b.y {
        false
    } else {
        a.x < b.x
    }
}

/// Endpoint selector for [`SegmentTable::inserted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    First,
    Last,
}

/// One directed boundary edge, from `v0` to `v1`.
#[derive(Debug, Clone)]
pub struct Segment {
    pub v0: Point2,
    pub v1: Point2,
    pub is_inserted: bool,
    /// DAG node from which `v0` is located.
    pub root0: usize,
    /// DAG node from which `v1` is located.
    pub root1: usize,
    /// Segment starting at `v1`.
    pub next: usize,
    /// Segment ending at `v0`.
    pub prev: usize,
}

/// Boundary segments of every contour, segment `i` starting at vertex `i`.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    /// Builds the table from closed contours.
    ///
    /// Contours are laid out one after another; each closes back on its
    /// first point.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::InvalidInput` when a contour has fewer
    /// than three points, a coordinate is not finite, or two consecutive
    /// points coincide.
    pub fn from_contours(contours: &[&[Point2]]) -> TriResult<Self> {
        if contours.is_empty() {
            return Err(TriangulationError::InvalidInput("no contours".into()));
        }
        let total = contours.iter().map(|c| c.len()).sum();
        let mut segments = Vec::with_capacity(total);
        for (ci, contour) in contours.iter().enumerate() {
            let n = contour.len();
            if n < 3 {
                return Err(TriangulationError::InvalidInput(format!(
                    "contour {ci} has {n} points, at least 3 are required"
                )));
            }
            let base = segments.len();
            for (i, p) in contour.iter().enumerate() {
                if !p.x.is_finite() || !p.y.is_finite() {
                    return Err(TriangulationError::InvalidInput(format!(
                        "contour {ci} point {i} is not finite"
                    )));
                }
                let q = contour[(i + 1) % n];
                if *p == q {
                    return Err(TriangulationError::InvalidInput(format!(
                        "contour {ci} repeats point {i}"
                    )));
                }
                segments.push(Segment {
                    v0: *p,
                    v1: q,
                    is_inserted: false,
                    root0: 0,
                    root1: 0,
                    next: base + (i + 1) % n,
                    prev: base + (i + n - 1) % n,
                });
            }
        }
        Ok(Self { segments })
    }

    /// Number of segments, equal to the number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the segment at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn get(&self, index: usize) -> TriResult<&Segment> {
        let len = self.segments.len();
        self.segments
            .get(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "segment",
                index,
                len,
            })
    }

    /// Returns the segment at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn get_mut(&mut self, index: usize) -> TriResult<&mut Segment> {
        let len = self.segments.len();
        self.segments
            .get_mut(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "segment",
                index,
                len,
            })
    }

    /// Iterates over all segments in vertex order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Whether the neighbour sharing the selected endpoint is already inserted.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn inserted(&self, index: usize, end: Endpoint) -> TriResult<bool> {
        let seg = self.get(index)?;
        let other = match end {
            Endpoint::First => seg.prev,
            Endpoint::Last => seg.next,
        };
        Ok(self.get(other)?.is_inserted)
    }

    /// Whether `v` lies strictly left of the segment, walked bottom to top.
    ///
    /// A point level with an endpoint (`v1` checked first) is resolved by x
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    #[allow(clippy::float_cmp)]
    pub fn is_left_of(&self, index: usize, v: &Point2) -> TriResult<bool> {
        let s = self.get(index)?;
        let area = if s.v1.y == v.y {
            if v.x < s.v1.x {
                1.0
            } else {
                -1.0
            }
        } else if s.v0.y == v.y {
            if v.x < s.v0.x {
                1.0
            } else {
                -1.0
            }
        } else if greater_than(&s.v1, &s.v0) {
            cross(&s.v0, &s.v1, v)
        } else {
            cross(&s.v1, &s.v0, v)
        };
        Ok(area > 0.0)
    }
}
