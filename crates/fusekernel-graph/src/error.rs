//! Graph error types.

use thiserror::Error;

use crate::{NodeId, OperatorType};

/// Graph result type.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and lookup errors.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph has no nodes.
    #[error("Expression graph is empty")]
    Empty,

    /// Root node is not an assignment.
    #[error("Root node must be an assignment, found {0}")]
    RootNotAssignment(OperatorType),

    /// Assignment target is not a device-memory operand.
    #[error("Invalid assignment target: {0}")]
    InvalidTarget(String),

    /// Node operand count does not match its operator family.
    #[error("Node {node} ({op}) has the wrong number of operands")]
    ArityMismatch {
        /// Offending node.
        node: NodeId,
        /// Its operator.
        op: OperatorType,
    },

    /// Child reference does not point strictly forward into the graph.
    #[error("Node {parent} references invalid child {child}")]
    InvalidChild {
        /// Referencing node.
        parent: NodeId,
        /// Referenced index.
        child: NodeId,
    },

    /// Node not reachable from the root.
    #[error("Node {0} is not referenced by any parent")]
    Orphan(NodeId),

    /// Lookup of an index outside the graph.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Operator name with no known operator.
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Scalar type name with no known type.
    #[error("Unknown scalar type: {0}")]
    UnknownScalarType(String),
}
