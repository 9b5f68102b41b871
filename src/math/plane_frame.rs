use std::f64::consts::PI;

use super::{Point2, Point3, Rotation3, Vector3, COLLINEAR_TOLERANCE};

/// A plane together with the rotation that lays it flat on XY.
///
/// Points on the plane map to `z == plane_z` after rotation, so dropping `z`
/// gives their 2D coordinates and `(x, y, plane_z)` maps back.
#[derive(Debug, Clone, Copy)]
pub struct PlaneFrame {
    origin: Point3,
    normal: Vector3,
    rotation: Rotation3,
    plane_z: f64,
}

impl PlaneFrame {
    /// Builds the frame from a point on the plane and a unit normal.
    #[must_use]
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        let rotation = rotation_to_z(&normal);
        let plane_z = rotation.transform_point(&origin).z;
        Self {
            origin,
            normal,
            rotation,
            plane_z,
        }
    }

    /// Builds the frame from the first three consecutive non-collinear points.
    ///
    /// The triples wrap around the end of `points`. Returns `None` when every
    /// triple is collinear or fewer than three points are given.
    #[must_use]
    pub fn from_points(points: &[Point3]) -> Option<Self> {
        let n = points.len();
        if n < 3 {
            return None;
        }
        (0..n).find_map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            let c = points[(i + 2) % n];
            let seg1 = b - a;
            let seg2 = c - b;
            let scale = seg1.norm() * seg2.norm();
            let normal = seg1.cross(&seg2);
            let len = normal.norm();
            (scale > 0.0 && len > COLLINEAR_TOLERANCE * scale).then(|| Self::new(a, normal / len))
        })
    }

    /// Point the frame was built from.
    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.origin
    }

    /// Unit plane normal.
    #[must_use]
    pub fn normal(&self) -> &Vector3 {
        &self.normal
    }

    /// Rotation taking the plane normal onto +Z.
    #[must_use]
    pub fn rotation(&self) -> &Rotation3 {
        &self.rotation
    }

    /// Signed distance of `point` from the plane.
    #[must_use]
    pub fn distance(&self, point: &Point3) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Rotates `point` into the frame and drops its height.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        let r = self.rotation.transform_point(point);
        Point2::new(r.x, r.y)
    }

    /// Lifts a 2D point back onto the plane.
    #[must_use]
    pub fn unproject(&self, point: &Point2) -> Point3 {
        self.rotation
            .inverse_transform_point(&Point3::new(point.x, point.y, self.plane_z))
    }
}

/// Rotation taking `normal` onto +Z; a half turn about X when they are opposite.
#[must_use]
pub fn rotation_to_z(normal: &Vector3) -> Rotation3 {
    Rotation3::rotation_between(normal, &Vector3::z())
        .unwrap_or_else(|| Rotation3::from_axis_angle(&Vector3::x_axis(), PI))
}
