use thiserror::Error;

use crate::geometry::BoxEdge;

/// Top-level error type for the loopfill crate.
#[derive(Debug, Error)]
pub enum LoopfillError {
    #[error(transparent)]
    Triangulation(#[from] TriangulationError),

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Coarse classification of every error the crate can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Degenerate or too-small input.
    InvalidInput,
    /// A loop whose points do not share one plane.
    NonPlanarLoop,
    /// A loop the splitter refuses to partition.
    UnsupportedSplitConfiguration,
    /// A monotone chain outgrew its reflex stack.
    ReflexStackOverflow,
    /// A broken internal table reference.
    IndexOutOfRange,
}

impl LoopfillError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Triangulation(e) => e.kind(),
            Self::Boundary(e) => e.kind(),
            Self::Split(e) => e.kind(),
            Self::Topology(e) => e.kind(),
        }
    }
}

/// Errors raised by the 2D triangulation pipeline.
#[derive(Debug, Error)]
pub enum TriangulationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("reflex chain exceeded its capacity of {capacity} vertices")]
    ReflexStackOverflow { capacity: usize },

    #[error("{table} index {index} out of range (len {len})")]
    IndexOutOfRange {
        table: &'static str,
        index: usize,
        len: usize,
    },

    #[error("broken {table} link: {detail}")]
    BrokenLink {
        table: &'static str,
        detail: &'static str,
    },
}

impl TriangulationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ReflexStackOverflow { .. } => ErrorKind::ReflexStackOverflow,
            Self::IndexOutOfRange { .. } | Self::BrokenLink { .. } => ErrorKind::IndexOutOfRange,
        }
    }
}

/// Errors raised by boundary loops.
#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("loop has {count} points, at least 3 are required")]
    TooFewPoints { count: usize },

    #[error("loop has no three consecutive non-collinear points")]
    DegeneratePlane,

    #[error("loop point {index} lies {distance} off the loop plane")]
    NonPlanar { index: usize, distance: f64 },

    #[error("loop index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("planned triangle {triangle} repeats a shared vertex")]
    RepeatedVertex { triangle: usize },
}

impl BoundaryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::TooFewPoints { .. } | Self::DegeneratePlane | Self::RepeatedVertex { .. } => {
                ErrorKind::InvalidInput
            }
            Self::NonPlanar { .. } => ErrorKind::NonPlanarLoop,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        }
    }
}

/// Errors raised while splitting a loop against a bounding box.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error("loop has no transition points on the box edges")]
    NoTransitionPoints,

    #[error("transition points lie on {count} box edges, at most 3 are supported")]
    TooManyEdges { count: usize },

    #[error("box edge {edge:?} holds an odd number ({count}) of transition points")]
    OddTransitionCount { edge: BoxEdge, count: usize },

    #[error("3 edges with transition point counts {counts:?}, each must hold exactly one")]
    AmbiguousTripleEdge { counts: [usize; 3] },

    #[error("edge id total {total} does not name a box corner")]
    UnknownCorner { total: u32 },

    #[error("cannot split this loop between indices {start} and {stop}")]
    CannotSplit { start: usize, stop: usize },

    #[error("loop index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl SplitError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            _ => ErrorKind::UnsupportedSplitConfiguration,
        }
    }
}

/// Errors related to the mesh arena.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("vertex index {index} out of range (len {len})")]
    VertexOutOfRange { index: usize, len: usize },

    #[error("triangle repeats a shared vertex")]
    RepeatedVertex,
}

impl TopologyError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::EntityNotFound(_) | Self::VertexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::RepeatedVertex => ErrorKind::InvalidInput,
        }
    }
}

/// Convenience type alias for results using [`LoopfillError`].
pub type Result<T> = std::result::Result<T, LoopfillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let e: LoopfillError = TriangulationError::ReflexStackOverflow { capacity: 4 }.into();
        assert_eq!(e.kind(), ErrorKind::ReflexStackOverflow);

        let e: LoopfillError = BoundaryError::NonPlanar {
            index: 3,
            distance: 0.5,
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::NonPlanarLoop);

        let e: LoopfillError = SplitError::OddTransitionCount {
            edge: BoxEdge::ZminYmin,
            count: 3,
        }
        .into();
        assert_eq!(e.kind(), ErrorKind::UnsupportedSplitConfiguration);

        let e: LoopfillError = SplitError::IndexOutOfRange { index: 9, len: 4 }.into();
        assert_eq!(e.kind(), ErrorKind::IndexOutOfRange);

        let e: LoopfillError = BoundaryError::TooFewPoints { count: 2 }.into();
        assert_eq!(e.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn messages_name_the_problem() {
        let e = SplitError::AmbiguousTripleEdge { counts: [1, 2, 1] };
        assert!(e.to_string().contains("exactly one"));
    }
}
