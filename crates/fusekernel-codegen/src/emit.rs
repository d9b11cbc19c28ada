//! Statement emission.

use fusekernel_graph::{ExpressionGraph, OperatorFamily, OperatorType};

use crate::traverse::{traverse_statement, TraversalEvent, Visitor};
use crate::{AccessCache, CodegenError, IndexSpace, MappedOperand, MappingTable, Result};

/// Open group awaiting its closer.
enum Group<'a> {
    Paren,
    /// Index of an element access; `outer` is the text emitted before it.
    Subscript {
        container: &'a MappedOperand,
        outer: String,
    },
}

/// Visitor that serializes one statement into source text.
///
/// Leaves resolve through the mapping table. Fetched operands are referred to
/// by register, everything else by its memory-access expression. Every group
/// is parenthesized; the group directly following an element access is
/// emitted on its own and handed to the container to build the subscript.
pub struct ExpressionEmitter<'a> {
    out: String,
    graph: &'a ExpressionGraph,
    mapping: &'a MappingTable,
    cache: &'a AccessCache,
    space: IndexSpace<'a>,
    groups: Vec<Group<'a>>,
    pending_container: Option<&'a MappedOperand>,
}

impl<'a> ExpressionEmitter<'a> {
    /// Create an emitter over one statement and its mapping.
    pub fn new(
        graph: &'a ExpressionGraph,
        mapping: &'a MappingTable,
        cache: &'a AccessCache,
        space: IndexSpace<'a>,
    ) -> Self {
        Self {
            out: String::new(),
            graph,
            mapping,
            cache,
            space,
            groups: Vec::new(),
            pending_container: None,
        }
    }

    /// Get the emitted text.
    pub fn finish(self) -> String {
        self.out
    }
}

impl<'a> Visitor for ExpressionEmitter<'a> {
    fn visit(&mut self, event: TraversalEvent<'_>) -> Result<()> {
        match event {
            TraversalEvent::Leaf { key, node } => {
                let operand = self.mapping.get(&key)?;
                if !key.is_terminal() && node.op == OperatorType::Access {
                    // Container; the index group follows.
                    self.pending_container = Some(operand);
                } else if let Some(register) = self.cache.access_name(operand.name()) {
                    self.out.push_str(register);
                } else {
                    self.out.push_str(&operand.generate_access(self.space)?);
                }
            }
            TraversalEvent::Operator { family, op, node } => {
                let symbol = match family {
                    OperatorFamily::Unary => op.symbol_for(self.graph.value_type(&node.lhs)?),
                    OperatorFamily::Binary => op.symbol(),
                };
                let symbol =
                    symbol.ok_or_else(|| CodegenError::UnsupportedOperator(op.to_string()))?;
                match family {
                    OperatorFamily::Unary => self.out.push_str(symbol),
                    OperatorFamily::Binary => {
                        self.out.push(' ');
                        self.out.push_str(symbol);
                        self.out.push(' ');
                    }
                }
            }
            TraversalEvent::EnterGroup => match self.pending_container.take() {
                Some(container) => {
                    let outer = std::mem::take(&mut self.out);
                    self.groups.push(Group::Subscript { container, outer });
                }
                None => {
                    self.out.push('(');
                    self.groups.push(Group::Paren);
                }
            },
            TraversalEvent::ExitGroup => match self.groups.pop() {
                Some(Group::Subscript { container, outer }) => {
                    let index = std::mem::replace(&mut self.out, outer);
                    self.out.push_str(&container.generate_indexed(&index)?);
                }
                Some(Group::Paren) | None => self.out.push(')'),
            },
        }
        Ok(())
    }
}

/// Emit one statement, terminated by `;`.
pub fn emit_statement(
    graph: &ExpressionGraph,
    mapping: &MappingTable,
    cache: &AccessCache,
    space: IndexSpace<'_>,
) -> Result<String> {
    let mut emitter = ExpressionEmitter::new(graph, mapping, cache, space);
    traverse_statement(graph, &mut emitter, true)?;
    let mut statement = emitter.finish();
    statement.push(';');
    Ok(statement)
}
