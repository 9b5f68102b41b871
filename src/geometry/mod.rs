pub mod aabb;

pub use aabb::{Aabb, BoxCorner, BoxEdge, Extreme};
