pub mod boundary;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod topology;
pub mod triangulation;

pub use error::{ErrorKind, LoopfillError, Result};
