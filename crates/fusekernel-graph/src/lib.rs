//! Expression graphs for fused linear-algebra kernels.
//!
//! A statement such as `z = alpha*x + y` is represented as a flat sequence of
//! nodes addressed by [`NodeId`]. Index 0 is the root assignment and every
//! child reference points strictly forward, so the sequence is acyclic by
//! construction. Leaves are [`Terminal`] operands: host scalars, dense
//! vectors, and dense matrices together with the layout information the code
//! generator needs to address them.
//!
//! # Example
//!
//! ```
//! use fusekernel_graph::{GraphBuilder, ScalarType, StatementBatch, Terminal};
//!
//! let alpha = Terminal::scalar("alpha", ScalarType::F32);
//! let x = Terminal::vector("x", ScalarType::F32, 1024);
//! let y = Terminal::vector("y", ScalarType::F32, 1024);
//!
//! let mut b = GraphBuilder::new();
//! let ax = b.mult(alpha, x);
//! let statement = b.inplace_add(y, ax).unwrap();
//!
//! let batch = StatementBatch::new().with(statement);
//! assert_eq!(batch.len(), 1);
//! ```

#![warn(missing_docs)]

mod builder;
mod error;
mod graph;
mod nodes;
mod printer;
mod types;

pub use builder::{ExprId, GraphBuilder, Operand};
pub use error::{GraphError, GraphResult};
pub use graph::{ExpressionGraph, StatementBatch};
pub use nodes::*;
pub use printer::GraphPrinter;
pub use types::ScalarType;

/// Index of a node within one [`ExpressionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root assignment of every graph.
    pub const ROOT: NodeId = NodeId(0);

    /// Create a node index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the position in the flat node sequence.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Check if this is the root index.
    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_ordering() {
        assert!(NodeId::ROOT < NodeId::new(1));
        assert!(NodeId::ROOT.is_root());
        assert_eq!(NodeId::new(7).index(), 7);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(format!("{}", NodeId::new(3)), "#3");
    }
}
