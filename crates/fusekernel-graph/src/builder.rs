//! Graph builder API.
//!
//! Expressions are assembled bottom-up, the way an expression-template front
//! end produces them, and renumbered into the flat root-first layout of
//! [`ExpressionGraph`] when the statement is finished.

use crate::{Child, ExpressionGraph, GraphError, GraphResult, Node, NodeId, OperatorType, Terminal};

/// Builder-local handle to a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

/// Operand accepted by the builder.
#[derive(Debug, Clone)]
pub enum Operand {
    /// Sub-expression created by this builder.
    Expr(ExprId),
    /// Terminal operand.
    Terminal(Terminal),
}

impl From<ExprId> for Operand {
    fn from(id: ExprId) -> Self {
        Operand::Expr(id)
    }
}

impl From<Terminal> for Operand {
    fn from(terminal: Terminal) -> Self {
        Operand::Terminal(terminal)
    }
}

impl From<&Terminal> for Operand {
    fn from(terminal: &Terminal) -> Self {
        Operand::Terminal(terminal.clone())
    }
}

#[derive(Debug, Clone)]
struct PendingNode {
    op: OperatorType,
    lhs: Operand,
    rhs: Option<Operand>,
}

/// Builder for constructing one statement.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    pending: Vec<PendingNode>,
}

impl GraphBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Sub-expressions
    // ========================================================================

    /// Add a unary sub-expression.
    pub fn unary(&mut self, op: OperatorType, operand: impl Into<Operand>) -> ExprId {
        self.add(op, operand.into(), None)
    }

    /// Add a binary sub-expression.
    pub fn binary(
        &mut self,
        op: OperatorType,
        lhs: impl Into<Operand>,
        rhs: impl Into<Operand>,
    ) -> ExprId {
        self.add(op, lhs.into(), Some(rhs.into()))
    }

    /// `lhs + rhs`.
    pub fn add_expr(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> ExprId {
        self.binary(OperatorType::Add, lhs, rhs)
    }

    /// `lhs - rhs`.
    pub fn sub_expr(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> ExprId {
        self.binary(OperatorType::Sub, lhs, rhs)
    }

    /// `lhs * rhs` with a scalar factor.
    pub fn mult(&mut self, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> ExprId {
        self.binary(OperatorType::Mult, lhs, rhs)
    }

    /// `container[index]`.
    pub fn access(&mut self, container: Terminal, index: impl Into<Operand>) -> ExprId {
        self.binary(OperatorType::Access, container, index)
    }

    fn add(&mut self, op: OperatorType, lhs: Operand, rhs: Option<Operand>) -> ExprId {
        let id = ExprId(self.pending.len());
        self.pending.push(PendingNode { op, lhs, rhs });
        id
    }

    // ========================================================================
    // Finishing
    // ========================================================================

    /// Finish the statement `target op value` and validate it.
    ///
    /// Sub-expressions referenced more than once are duplicated so every
    /// child index stays strictly after its parent.
    pub fn finish(
        self,
        op: OperatorType,
        target: Terminal,
        value: impl Into<Operand>,
    ) -> GraphResult<ExpressionGraph> {
        let root = PendingNode {
            op,
            lhs: Operand::Terminal(target),
            rhs: Some(value.into()),
        };

        let mut out = Vec::with_capacity(self.pending.len() + 1);
        self.lay_out(&root, self.pending.len(), &mut out)?;
        ExpressionGraph::new(out)
    }

    /// Finish the statement `target = value`.
    pub fn assign(self, target: Terminal, value: impl Into<Operand>) -> GraphResult<ExpressionGraph> {
        self.finish(OperatorType::Assign, target, value)
    }

    /// Finish the statement `target += value`.
    pub fn inplace_add(
        self,
        target: Terminal,
        value: impl Into<Operand>,
    ) -> GraphResult<ExpressionGraph> {
        self.finish(OperatorType::InplaceAdd, target, value)
    }

    /// Operands of `node` may only reference pending nodes below `bound`,
    /// which keeps the recursion finite.
    fn lay_out(&self, node: &PendingNode, bound: usize, out: &mut Vec<Node>) -> GraphResult<NodeId> {
        let slot = out.len();
        let id = NodeId::new(slot as u32);
        // Placeholder keeps the parent's index ahead of its children.
        out.push(Node {
            op: node.op,
            lhs: Child::Node(id),
            rhs: None,
        });

        let lhs = self.lay_out_operand(&node.lhs, bound, out)?;
        let rhs = match &node.rhs {
            Some(rhs) => Some(self.lay_out_operand(rhs, bound, out)?),
            None => None,
        };

        out[slot] = Node {
            op: node.op,
            lhs,
            rhs,
        };
        Ok(id)
    }

    fn lay_out_operand(
        &self,
        operand: &Operand,
        bound: usize,
        out: &mut Vec<Node>,
    ) -> GraphResult<Child> {
        match operand {
            Operand::Terminal(t) => Ok(Child::Terminal(t.clone())),
            Operand::Expr(ExprId(index)) if *index < bound => {
                Ok(Child::Node(self.lay_out(&self.pending[*index], *index, out)?))
            }
            Operand::Expr(ExprId(index)) => Err(GraphError::UnknownNode(NodeId::new(*index as u32))),
        }
    }
}
