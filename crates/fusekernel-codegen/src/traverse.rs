//! Generic depth-first traversal of an expression graph.
//!
//! The traversal decides *when* something happens (a leaf is reached, an
//! operator sits between its operands, a parenthesized group opens or
//! closes); visitors decide *what* happens. Mapping construction, reduction
//! discovery and source emission are all visitors over the same walk.
//!
//! Per operator class:
//!
//! | class       | events                                              |
//! |-------------|-----------------------------------------------------|
//! | unary       | operator, enter, operand, exit                      |
//! | elementwise | enter, lhs, operator, rhs, exit                     |
//! | access      | leaf (the container); deep: enter, index, exit      |
//! | reducing    | leaf; deep: not implemented                         |

use fusekernel_graph::{
    ExpressionGraph, GraphError, Node, NodeId, OperatorClass, OperatorFamily, OperatorType,
};
use tracing::trace;

use crate::{CodegenError, PositionKey, Result, Role};

/// Event reported to a [`Visitor`].
#[derive(Debug, Clone, Copy)]
pub enum TraversalEvent<'a> {
    /// A leaf position was reached.
    Leaf {
        /// Position of the leaf.
        key: PositionKey,
        /// Node owning the position.
        node: &'a Node,
    },
    /// An operator sits at this point of the expression.
    Operator {
        /// Operator family.
        family: OperatorFamily,
        /// Operator.
        op: OperatorType,
        /// Node carrying the operator.
        node: &'a Node,
    },
    /// A grouped sub-expression begins.
    EnterGroup,
    /// The innermost open group ends.
    ExitGroup,
}

/// Receiver of traversal events.
pub trait Visitor {
    /// Handle one event. An error aborts the traversal.
    fn visit(&mut self, event: TraversalEvent<'_>) -> Result<()>;
}

impl<F> Visitor for F
where
    F: FnMut(TraversalEvent<'_>) -> Result<()>,
{
    fn visit(&mut self, event: TraversalEvent<'_>) -> Result<()> {
        self(event)
    }
}

/// Walk the expression rooted at `key`.
///
/// With `deep` unset, access and reducing nodes are reported as single
/// leaves and their operands are not visited.
pub fn traverse<V: Visitor + ?Sized>(
    graph: &ExpressionGraph,
    visitor: &mut V,
    deep: bool,
    key: PositionKey,
) -> Result<()> {
    let node = graph.node(key.node)?;
    trace!(key = %key, op = %node.op, deep, "traverse");

    if key.is_terminal() {
        return visitor.visit(TraversalEvent::Leaf { key, node });
    }

    let lhs = PositionKey::for_child(key.node, Role::Lhs, &node.lhs);
    match node.op.class() {
        OperatorClass::Unary => {
            visitor.visit(TraversalEvent::Operator {
                family: OperatorFamily::Unary,
                op: node.op,
                node,
            })?;
            visitor.visit(TraversalEvent::EnterGroup)?;
            traverse(graph, visitor, deep, lhs)?;
            visitor.visit(TraversalEvent::ExitGroup)
        }
        OperatorClass::Elementwise => {
            let rhs = rhs_key(key.node, node)?;
            visitor.visit(TraversalEvent::EnterGroup)?;
            traverse(graph, visitor, deep, lhs)?;
            visitor.visit(TraversalEvent::Operator {
                family: OperatorFamily::Binary,
                op: node.op,
                node,
            })?;
            traverse(graph, visitor, deep, rhs)?;
            visitor.visit(TraversalEvent::ExitGroup)
        }
        OperatorClass::Access => {
            visitor.visit(TraversalEvent::Leaf { key, node })?;
            if deep {
                let rhs = rhs_key(key.node, node)?;
                visitor.visit(TraversalEvent::EnterGroup)?;
                traverse(graph, visitor, deep, rhs)?;
                visitor.visit(TraversalEvent::ExitGroup)?;
            }
            Ok(())
        }
        OperatorClass::Reducing => {
            if deep {
                return Err(CodegenError::NotImplemented(format!(
                    "inlining of reducing operator {} at node {}",
                    node.op, key.node
                )));
            }
            visitor.visit(TraversalEvent::Leaf { key, node })
        }
    }
}

/// Walk a whole statement from its root.
pub fn traverse_statement<V: Visitor + ?Sized>(
    graph: &ExpressionGraph,
    visitor: &mut V,
    deep: bool,
) -> Result<()> {
    traverse(graph, visitor, deep, PositionKey::parent(NodeId::ROOT))
}

/// Indices of the reducing nodes reachable without descending into
/// reductions, in traversal order.
pub fn find_reductions(graph: &ExpressionGraph) -> Result<Vec<NodeId>> {
    let mut found = Vec::new();
    let mut collect = |event: TraversalEvent<'_>| -> Result<()> {
        if let TraversalEvent::Leaf { key, node } = event {
            if !key.is_terminal() && node.op.is_reducing() {
                found.push(key.node);
            }
        }
        Ok(())
    };
    traverse_statement(graph, &mut collect, false)?;
    Ok(found)
}

fn rhs_key(id: NodeId, node: &Node) -> Result<PositionKey> {
    let rhs = node
        .rhs
        .as_ref()
        .ok_or(GraphError::ArityMismatch { node: id, op: node.op })?;
    Ok(PositionKey::for_child(id, Role::Rhs, rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusekernel_graph::{GraphBuilder, ScalarType, Terminal};

    fn vector(name: &str) -> Terminal {
        Terminal::vector(name, ScalarType::F32, 64)
    }

    /// Render events as a compact token stream.
    fn tokens(graph: &ExpressionGraph, deep: bool) -> Result<Vec<String>> {
        let mut out = Vec::new();
        let mut record = |event: TraversalEvent<'_>| -> Result<()> {
            out.push(match event {
                TraversalEvent::Leaf { key, .. } => key.to_string(),
                TraversalEvent::Operator { op, .. } => op.to_string(),
                TraversalEvent::EnterGroup => "(".to_string(),
                TraversalEvent::ExitGroup => ")".to_string(),
            });
            Ok(())
        };
        traverse_statement(graph, &mut record, deep)?;
        Ok(out)
    }

    #[test]
    fn test_elementwise_order() {
        let mut b = GraphBuilder::new();
        let sum = b.add_expr(vector("x"), vector("y"));
        let graph = b.assign(vector("z"), sum).unwrap();

        assert_eq!(
            tokens(&graph, true).unwrap(),
            vec![
                "(", "(#0, lhs_leaf)", "assign", "(", "(#1, lhs)", "add", "(#1, rhs)", ")", ")"
            ]
        );
    }

    #[test]
    fn test_unary_order() {
        let mut b = GraphBuilder::new();
        let root = b.unary(OperatorType::Sqrt, vector("x"));
        let graph = b.assign(vector("y"), root).unwrap();

        assert_eq!(
            tokens(&graph, true).unwrap(),
            vec!["(", "(#0, lhs_leaf)", "assign", "sqrt", "(", "(#1, lhs)", ")", ")"]
        );
    }

    #[test]
    fn test_access_descends_only_when_deep() {
        let mut b = GraphBuilder::new();
        let elem = b.access(vector("x"), Terminal::scalar("k", ScalarType::U32));
        let graph = b.assign(vector("y"), elem).unwrap();

        let deep = tokens(&graph, true).unwrap();
        assert_eq!(
            deep,
            vec!["(", "(#0, lhs_leaf)", "assign", "(#1, parent)", "(", "(#1, rhs)", ")", ")"]
        );

        let shallow = tokens(&graph, false).unwrap();
        assert_eq!(
            shallow,
            vec!["(", "(#0, lhs_leaf)", "assign", "(#1, parent)", ")"]
        );
    }

    #[test]
    fn test_reductions() {
        let mut b = GraphBuilder::new();
        let dot = b.binary(OperatorType::InnerProd, vector("x"), vector("y"));
        let sum = b.add_expr(dot, vector("w"));
        let graph = b.assign(vector("z"), sum).unwrap();

        assert_eq!(find_reductions(&graph).unwrap(), vec![NodeId::new(2)]);
        assert!(matches!(
            tokens(&graph, true),
            Err(CodegenError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_visitor_error_aborts() {
        let graph = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let mut seen = 0;
        let mut failing = |_: TraversalEvent<'_>| -> Result<()> {
            seen += 1;
            Err(CodegenError::NotImplemented("stop".to_string()))
        };
        assert!(traverse_statement(&graph, &mut failing, true).is_err());
        assert_eq!(seen, 1);
    }
}
