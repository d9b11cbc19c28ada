//! Position keys: the lookup identity of leaf slots.

use std::fmt;

use fusekernel_graph::{Child, NodeId};

/// Logical slot a leaf occupies within a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// The node itself (interior node, or a node that acts as a leaf).
    Parent,
    /// Left terminal operand.
    Lhs,
    /// Right terminal operand.
    Rhs,
    /// Left terminal of the root assignment: the statement's target.
    LhsLeaf,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Parent => write!(f, "parent"),
            Role::Lhs => write!(f, "lhs"),
            Role::Rhs => write!(f, "rhs"),
            Role::LhsLeaf => write!(f, "lhs_leaf"),
        }
    }
}

/// `(node, role)` pair identifying one leaf position in one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    /// Node index.
    pub node: NodeId,
    /// Slot within the node.
    pub role: Role,
}

impl PositionKey {
    /// Create a key.
    pub fn new(node: NodeId, role: Role) -> Self {
        Self { node, role }
    }

    /// Key of the node itself.
    pub fn parent(node: NodeId) -> Self {
        Self::new(node, Role::Parent)
    }

    /// Key of the statement's assignment target.
    pub fn target() -> Self {
        Self::new(NodeId::ROOT, Role::LhsLeaf)
    }

    /// Key of the child in slot `side` (`Lhs` or `Rhs`) of `parent`.
    ///
    /// Sub-expressions are keyed by their own index; terminals by the parent
    /// index and slot, with the root's left terminal promoted to `LhsLeaf`.
    pub fn for_child(parent: NodeId, side: Role, child: &Child) -> Self {
        match child {
            Child::Node(id) => Self::parent(*id),
            Child::Terminal(_) if parent.is_root() && side == Role::Lhs => Self::target(),
            Child::Terminal(_) => Self::new(parent, side),
        }
    }

    /// Check if the position itself denotes a terminal leaf.
    pub fn is_terminal(&self) -> bool {
        self.role != Role::Parent
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.node, self.role)
    }
}
