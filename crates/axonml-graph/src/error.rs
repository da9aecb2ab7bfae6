//! Graph Error Types
//!
//! Error handling for graph construction.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::fmt;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction errors.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Two nodes with the same name.
    DuplicateNodeName(String),
    /// Node input that does not precede the node.
    InvalidNodeReference {
        /// Node holding the reference.
        node: String,
        /// Referenced index.
        input: usize,
    },
    /// Weight data that does not match its shape.
    WeightShapeMismatch {
        /// Element count implied by the shape.
        expected: usize,
        /// Actual element count.
        found: usize,
    },
    /// Lookup of a node name that is not in the graph.
    NodeNotFound(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeName(name) => write!(f, "Duplicate node name: {name}"),
            Self::InvalidNodeReference { node, input } => {
                write!(f, "Node '{node}' references invalid input {input}")
            }
            Self::WeightShapeMismatch { expected, found } => {
                write!(f, "Weight shape mismatch: expected {expected} values, found {found}")
            }
            Self::NodeNotFound(name) => write!(f, "Node not found: {name}"),
        }
    }
}

impl std::error::Error for GraphError {}
