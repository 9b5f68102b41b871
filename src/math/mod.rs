pub mod plane_frame;
pub mod polygon_2d;

pub use plane_frame::PlaneFrame;

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// 3D rotation type.
pub type Rotation3 = nalgebra::Rotation3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Per-axis distance under which two mesh positions name the same shared vertex.
pub const POSITION_TOLERANCE: f64 = 1e-6;

/// Per-axis spread under which a coordinate counts as constant across a loop.
pub const COPLANAR_TOLERANCE: f64 = 1e-6;

/// Distance from the loop plane beyond which a point is off the plane.
///
/// Scaled by the loop extent when it exceeds one unit.
pub const PLANE_TOLERANCE: f64 = 1e-6;

/// Sine of the angle under which three consecutive points count as collinear.
pub const COLLINEAR_TOLERANCE: f64 = 1e-6;

/// Distance from a box face under which a point lies on that face.
pub const BOX_EDGE_TOLERANCE: f64 = 1e-9;

/// Selects one of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}
