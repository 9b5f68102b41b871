use super::{Point2, TOLERANCE};

/// Computes the signed area of a closed polygon (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Signed area of the triangle `(a, b, c)`.
#[must_use]
pub fn triangle_area(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    0.5 * cross(a, b, c)
}

/// Orientation of `c` relative to the directed line `a -> b`.
///
/// Positive when `c` lies to the left.
#[inline]
#[must_use]
pub fn cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Where a point lies relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Outside,
    OnVertex,
    OnEdge,
}

/// Classifies `point` against `polygon` by ray-crossing parity.
///
/// Crossings are counted separately for the rays toward +x and -x so a point
/// lying on an edge shows up as a parity mismatch.
#[must_use]
pub fn locate_point(point: &Point2, polygon: &[Point2]) -> PointLocation {
    let n = polygon.len();
    if n < 3 {
        return PointLocation::Outside;
    }

    let mut right_crossings = 0usize;
    let mut left_crossings = 0usize;
    for i in 0..n {
        let cur = polygon[i] - point;
        if cur.x.abs() < TOLERANCE && cur.y.abs() < TOLERANCE {
            return PointLocation::OnVertex;
        }
        let prev = polygon[(i + n - 1) % n] - point;

        let right_straddle = (cur.y > 0.0) != (prev.y > 0.0);
        let left_straddle = (cur.y < 0.0) != (prev.y < 0.0);
        if right_straddle || left_straddle {
            let x = (cur.x * prev.y - prev.x * cur.y) / (prev.y - cur.y);
            if right_straddle && x > 0.0 {
                right_crossings += 1;
            }
            if left_straddle && x < 0.0 {
                left_crossings += 1;
            }
        }
    }

    if right_crossings % 2 != left_crossings % 2 {
        PointLocation::OnEdge
    } else if right_crossings % 2 == 1 {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}
