//! Closed loops of shared vertices and the code that fills them.

pub mod boundary_loop;
pub mod densify;
pub mod splitter;

pub use boundary_loop::{BoundaryLoop, FillPlan, PlannedTriangle};
pub use densify::{bisection_params, densify, Chord};
pub use splitter::{LoopSplitter, SplitLoops};
