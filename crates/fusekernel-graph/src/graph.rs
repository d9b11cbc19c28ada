//! Expression graphs and statement batches.

use crate::{
    Child, GraphError, GraphResult, Node, NodeId, OperatorClass, OperatorFamily, ScalarType,
    TerminalKind,
};

/// One top-level assignment as a flat, index-addressed DAG.
///
/// Index 0 is always the root assignment. Child references point strictly
/// forward, so the sequence can never contain a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpressionGraph {
    nodes: Vec<Node>,
}

impl ExpressionGraph {
    /// Create a graph from its node sequence, validating the structure.
    pub fn new(nodes: Vec<Node>) -> GraphResult<Self> {
        let graph = Self { nodes };
        graph.validate()?;
        Ok(graph)
    }

    /// Get the root assignment node.
    pub fn root(&self) -> &Node {
        // Non-empty is checked on construction.
        &self.nodes[0]
    }

    /// Get a node by index.
    pub fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over nodes with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::new(i as u32), node))
    }

    /// Element type `child` evaluates to.
    ///
    /// Binary operands are promoted with [`ScalarType::promote`]; an element
    /// access has the type of its container.
    pub fn value_type(&self, child: &Child) -> GraphResult<ScalarType> {
        let id = match child {
            Child::Terminal(t) => return Ok(t.scalar_type()),
            Child::Node(id) => *id,
        };
        let node = self.node(id)?;
        let lhs = self.value_type(&node.lhs)?;
        match &node.rhs {
            Some(rhs) if node.op.class() != OperatorClass::Access => {
                Ok(lhs.promote(self.value_type(rhs)?))
            }
            _ => Ok(lhs),
        }
    }

    fn validate(&self) -> GraphResult<()> {
        let root = self.nodes.first().ok_or(GraphError::Empty)?;

        if !root.op.is_assignment() {
            return Err(GraphError::RootNotAssignment(root.op));
        }
        match &root.lhs {
            Child::Terminal(t) if t.kind() != TerminalKind::Scalar => {}
            Child::Terminal(t) => {
                return Err(GraphError::InvalidTarget(format!(
                    "scalar '{}' is passed by value and cannot be assigned",
                    t.name()
                )))
            }
            Child::Node(id) => {
                return Err(GraphError::InvalidTarget(format!(
                    "sub-expression {} is not an operand",
                    id
                )))
            }
        }

        let mut referenced = vec![false; self.nodes.len()];
        referenced[0] = true;

        for (id, node) in self.iter() {
            let arity_ok = match node.op.family() {
                OperatorFamily::Unary => node.rhs.is_none(),
                OperatorFamily::Binary => node.rhs.is_some(),
            };
            if !arity_ok {
                return Err(GraphError::ArityMismatch { node: id, op: node.op });
            }

            for child in node.children().filter_map(Child::as_node) {
                if child <= id || child.index() >= self.nodes.len() {
                    return Err(GraphError::InvalidChild { parent: id, child });
                }
                referenced[child.index()] = true;
            }
        }

        if let Some(orphan) = referenced.iter().position(|r| !r) {
            return Err(GraphError::Orphan(NodeId::new(orphan as u32)));
        }

        Ok(())
    }
}

/// Ordered sequence of statements fused into one kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StatementBatch {
    statements: Vec<ExpressionGraph>,
}

impl StatementBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement.
    pub fn push(&mut self, statement: ExpressionGraph) {
        self.statements.push(statement);
    }

    /// Append a statement (builder style).
    pub fn with(mut self, statement: ExpressionGraph) -> Self {
        self.push(statement);
        self
    }

    /// Number of statements.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Check if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Iterate over statements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ExpressionGraph> {
        self.statements.iter()
    }
}

impl FromIterator<ExpressionGraph> for StatementBatch {
    fn from_iter<I: IntoIterator<Item = ExpressionGraph>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StatementBatch {
    type Item = &'a ExpressionGraph;
    type IntoIter = std::slice::Iter<'a, ExpressionGraph>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
