use crate::error::TriangulationError;
use crate::math::Point2;

use super::TriResult;

/// Node payload of the point-location DAG.
///
/// `left` is the branch below a Y-node or left of an X-node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Split by a segment.
    X {
        segment: usize,
        left: usize,
        right: usize,
    },
    /// Split by the horizontal line through `yval`.
    Y {
        yval: Point2,
        left: usize,
        right: usize,
    },
    /// Leaf naming a trapezoid.
    Sink { trapezoid: usize },
}

/// A DAG node and the node that first pointed at it.
#[derive(Debug, Clone)]
pub struct QueryNode {
    pub kind: NodeKind,
    pub parent: Option<usize>,
}

/// Point-location structure grown alongside the trapezoid table.
#[derive(Debug, Clone, Default)]
pub struct QueryDag {
    nodes: Vec<QueryNode>,
}

impl QueryDag {
    /// Creates a DAG with room for the nodes `segments` will need.
    #[must_use]
    pub fn with_segments(segments: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(8 * segments + 8),
        }
    }

    /// Appends a node and returns its index.
    pub fn push(&mut self, kind: NodeKind, parent: Option<usize>) -> usize {
        self.nodes.push(QueryNode { kind, parent });
        self.nodes.len() - 1
    }

    /// Appends a sink for `trapezoid`.
    pub fn push_sink(&mut self, trapezoid: usize, parent: Option<usize>) -> usize {
        self.push(NodeKind::Sink { trapezoid }, parent)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DAG is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn get(&self, index: usize) -> TriResult<&QueryNode> {
        let len = self.nodes.len();
        self.nodes
            .get(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "query node",
                index,
                len,
            })
    }

    fn get_mut(&mut self, index: usize) -> TriResult<&mut QueryNode> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(TriangulationError::IndexOutOfRange {
                table: "query node",
                index,
                len,
            })
    }

    /// Replaces the payload of `index`, keeping its parent.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::IndexOutOfRange` for an unknown index.
    pub fn replace(&mut self, index: usize, kind: NodeKind) -> TriResult<()> {
        self.get_mut(index)?.kind = kind;
        Ok(())
    }

    /// Trapezoid named by the sink at `index`.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::BrokenLink` when `index` is not a sink.
    pub fn trapezoid_of(&self, index: usize) -> TriResult<usize> {
        match self.get(index)?.kind {
            NodeKind::Sink { trapezoid } => Ok(trapezoid),
            _ => Err(TriangulationError::BrokenLink {
                table: "query node",
                detail: "expected a sink",
            }),
        }
    }

    /// Repoints whichever child of `parent` is `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns `TriangulationError::BrokenLink` when `parent` is a sink.
    pub fn redirect_child(&mut self, parent: usize, from: usize, to: usize) -> TriResult<()> {
        match &mut self.get_mut(parent)?.kind {
            NodeKind::X { left, right, .. } | NodeKind::Y { left, right, .. } => {
                if *left == from {
                    *left = to;
                } else {
                    *right = to;
                }
                Ok(())
            }
            NodeKind::Sink { .. } => Err(TriangulationError::BrokenLink {
                table: "query node",
                detail: "sink has no children",
            }),
        }
    }
}
