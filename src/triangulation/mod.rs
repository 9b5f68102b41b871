//! Seidel's randomized trapezoidation, monotone decomposition and greedy
//! triangulation of simple polygons with holes.

pub mod greedy;
pub mod monotone;
pub mod query;
pub mod segment;
pub mod trapezoid;
pub mod trapezoidation;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::error::{Result, TriangulationError};
use crate::math::polygon_2d::{cross, signed_area};
use crate::math::Point2;

pub use greedy::triangulate_monotone_polygons;
pub use monotone::MonotonePolygons;
pub use segment::SegmentTable;
pub use trapezoidation::Trapezoidation;

pub(crate) type TriResult<T> = std::result::Result<T, TriangulationError>;

/// Source of the segment insertion permutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InsertionOrder {
    /// Shuffle with an RNG seeded from OS entropy.
    #[default]
    Entropy,
    /// Shuffle with a reproducible seed.
    Seeded(u64),
    /// Insert segments in input order.
    AsGiven,
    /// Insert segments in reverse input order.
    Reversed,
    /// Caller-supplied permutation of `0..n`.
    Explicit(Vec<usize>),
}

impl InsertionOrder {
    /// Produces the permutation for `n` segments.
    #[must_use]
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        match self {
            Self::Entropy => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut rand::rng());
                order
            }
            Self::Seeded(seed) => {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(&mut StdRng::seed_from_u64(*seed));
                order
            }
            Self::AsGiven => (0..n).collect(),
            Self::Reversed => (0..n).rev().collect(),
            Self::Explicit(order) => order.clone(),
        }
    }
}

/// Parameters of a triangulation run.
#[derive(Debug, Clone, Default)]
pub struct TriangulationParams {
    pub order: InsertionOrder,
}

impl TriangulationParams {
    /// Parameters with a fixed shuffle seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            order: InsertionOrder::Seeded(seed),
        }
    }
}

/// Triangulates polygons with holes.
#[derive(Debug, Clone, Default)]
pub struct Triangulator {
    params: TriangulationParams,
}

impl Triangulator {
    #[must_use]
    pub fn new(params: TriangulationParams) -> Self {
        Self { params }
    }

    #[must_use]
    pub fn params(&self) -> &TriangulationParams {
        &self.params
    }

    /// Triangulates `outer` minus `holes`.
    ///
    /// Returned indices address the concatenation of `outer` and every hole
    /// in order. Contour orientation is normalized internally; every
    /// triangle comes back counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidInput` for degenerate contours or a bad
    /// explicit permutation, `ReflexStackOverflow` when greedy triangulation
    /// runs out of stack, and `IndexOutOfRange` for broken internal links.
    pub fn triangulate(&self, outer: &[Point2], holes: &[Vec<Point2>]) -> Result<Vec<[usize; 3]>> {
        let mut contours: Vec<Vec<Point2>> = Vec::with_capacity(holes.len() + 1);
        // pipeline index -> caller index
        let mut index_map: Vec<usize> = Vec::new();
        let mut base = 0usize;
        for (ci, contour) in std::iter::once(outer).chain(holes.iter().map(Vec::as_slice)).enumerate() {
            let area = signed_area(contour);
            let reverse = if ci == 0 { area < 0.0 } else { area > 0.0 };
            let mut points = contour.to_vec();
            let mut map: Vec<usize> = (base..base + contour.len()).collect();
            if reverse {
                points.reverse();
                map.reverse();
            }
            base += contour.len();
            contours.push(points);
            index_map.extend(map);
        }

        let slices: Vec<&[Point2]> = contours.iter().map(Vec::as_slice).collect();
        let segments = SegmentTable::from_contours(&slices)?;
        let order = self.params.order.permutation(segments.len());
        let trapezoidation = Trapezoidation::build(segments, &order)?;
        let polygons = MonotonePolygons::extract(&trapezoidation)?;
        let raw = triangulate_monotone_polygons(&polygons)?;

        let points: Vec<Point2> = contours.into_iter().flatten().collect();
        let corner = |i: usize| {
            points.get(i).ok_or(TriangulationError::IndexOutOfRange {
                table: "contour point",
                index: i,
                len: points.len(),
            })
        };
        let mut triangles = Vec::with_capacity(raw.len());
        for [a, b, c] in raw {
            let turn = cross(corner(a)?, corner(b)?, corner(c)?);
            let tri = if turn < 0.0 { [a, c, b] } else { [a, b, c] };
            let mut mapped = [0usize; 3];
            for (slot, i) in mapped.iter_mut().zip(tri) {
                *slot = *index_map.get(i).ok_or(TriangulationError::IndexOutOfRange {
                    table: "index map",
                    index: i,
                    len: index_map.len(),
                })?;
            }
            triangles.push(mapped);
        }

        debug!(
            vertices = points.len(),
            contours = holes.len() + 1,
            monotone = polygons.len(),
            triangles = triangles.len(),
            "polygon triangulated"
        );
        Ok(triangles)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::math::polygon_2d::triangle_area;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn unit_square() -> Vec<Point2> {
        vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]
    }

    fn area_of(points: &[Point2], triangles: &[[usize; 3]]) -> f64 {
        triangles
            .iter()
            .map(|t| triangle_area(&points[t[0]], &points[t[1]], &points[t[2]]))
            .sum()
    }

    fn assert_ccw(points: &[Point2], triangles: &[[usize; 3]]) {
        for t in triangles {
            assert!(cross(&points[t[0]], &points[t[1]], &points[t[2]]) > 0.0);
        }
    }

    #[test]
    fn unit_square_gives_two_triangles() {
        let square = unit_square();
        let tris = Triangulator::new(TriangulationParams::seeded(1))
            .triangulate(&square, &[])
            .unwrap();
        assert_eq!(tris.len(), 2);
        assert_relative_eq!(area_of(&square, &tris), 1.0, epsilon = 1e-12);
        assert_ccw(&square, &tris);
    }

    #[test]
    fn square_with_hole() {
        let outer = vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)];
        // clockwise hole
        let hole = vec![p(1.0, 1.0), p(1.0, 3.0), p(3.0, 3.0), p(3.0, 1.0)];
        let tris = Triangulator::new(TriangulationParams::seeded(7))
            .triangulate(&outer, &[hole.clone()])
            .unwrap();
        assert_eq!(tris.len(), 8);

        let all: Vec<Point2> = outer.iter().chain(hole.iter()).copied().collect();
        assert_relative_eq!(area_of(&all, &tris), 12.0, epsilon = 1e-9);
        assert_ccw(&all, &tris);
    }

    #[test]
    fn counts_area_and_distinct_indices() {
        // concave arrow with a triangular hole
        let outer = vec![
            p(0.0, 0.0),
            p(6.0, 0.2),
            p(7.0, 3.1),
            p(5.0, 5.9),
            p(3.1, 3.0),
            p(1.2, 6.1),
            p(-0.8, 2.9),
        ];
        let hole = vec![p(2.0, 1.0), p(3.0, 2.1), p(4.1, 1.2)];
        let tris = Triangulator::new(TriangulationParams::seeded(99))
            .triangulate(&outer, &[hole.clone()])
            .unwrap();
        assert_eq!(tris.len(), outer.len() + hole.len());

        let all: Vec<Point2> = outer.iter().chain(hole.iter()).copied().collect();
        let expected = signed_area(&outer) - signed_area(&hole).abs();
        assert_relative_eq!(area_of(&all, &tris), expected, epsilon = 1e-9);
        for t in &tris {
            assert!(t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
            assert!(t.iter().all(|&i| i < all.len()));
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let outer = vec![
            p(0.0, 0.0),
            p(3.0, 0.5),
            p(5.0, 0.1),
            p(4.2, 3.0),
            p(2.5, 1.7),
            p(0.7, 3.3),
        ];
        let a = Triangulator::new(TriangulationParams::seeded(42))
            .triangulate(&outer, &[])
            .unwrap();
        let b = Triangulator::new(TriangulationParams::seeded(42))
            .triangulate(&outer, &[])
            .unwrap();
        assert_eq!(a, b);

        for seed in 0..8 {
            let c = Triangulator::new(TriangulationParams::seeded(seed))
                .triangulate(&outer, &[])
                .unwrap();
            assert_eq!(c.len(), outer.len() - 2);
            assert_relative_eq!(area_of(&outer, &c), signed_area(&outer), epsilon = 1e-9);
        }
    }

    #[test]
    fn clockwise_outer_is_normalized() {
        let mut square = unit_square();
        square.reverse();
        let tris = Triangulator::new(TriangulationParams {
            order: InsertionOrder::Reversed,
        })
        .triangulate(&square, &[])
        .unwrap();
        assert_eq!(tris.len(), 2);
        assert_ccw(&square, &tris);
        assert_relative_eq!(area_of(&square, &tris), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn explicit_order_must_be_a_permutation() {
        let err = Triangulator::new(TriangulationParams {
            order: InsertionOrder::Explicit(vec![0, 0, 1, 2]),
        })
        .triangulate(&unit_square(), &[])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn degenerate_contour_is_rejected() {
        let err = Triangulator::default()
            .triangulate(&[p(0.0, 0.0), p(1.0, 0.0)], &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn permutations_cover_every_index() {
        for order in [
            InsertionOrder::Entropy,
            InsertionOrder::Seeded(3),
            InsertionOrder::AsGiven,
            InsertionOrder::Reversed,
        ] {
            let mut perm = order.permutation(9);
            perm.sort_unstable();
            assert_eq!(perm, (0..9).collect::<Vec<_>>());
        }
    }
}
