//! Graph pretty printer.
//!
//! Produces a human-readable listing of a statement, one node per line.

use std::fmt::Write;

use crate::{ExpressionGraph, StatementBatch};

/// Graph pretty printer.
#[derive(Debug, Default)]
pub struct GraphPrinter {
    output: String,
}

impl GraphPrinter {
    /// Create a new printer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Print one statement.
    pub fn print(mut self, graph: &ExpressionGraph) -> String {
        self.print_graph(graph, "");
        self.output
    }

    /// Print every statement of a batch.
    pub fn print_batch(mut self, batch: &StatementBatch) -> String {
        for (i, graph) in batch.iter().enumerate() {
            let _ = writeln!(self.output, "; statement {}", i);
            self.print_graph(graph, "  ");
        }
        self.output
    }

    fn print_graph(&mut self, graph: &ExpressionGraph, indent: &str) {
        for (id, node) in graph.iter() {
            let _ = match &node.rhs {
                Some(rhs) => writeln!(
                    self.output,
                    "{indent}{} = {}({}, {})",
                    id, node.op, node.lhs, rhs
                ),
                None => writeln!(self.output, "{indent}{} = {}({})", id, node.op, node.lhs),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GraphBuilder, OperatorType, ScalarType, Terminal};

    #[test]
    fn test_print_statement() {
        let x = Terminal::vector("x", ScalarType::F32, 8);
        let y = Terminal::vector("y", ScalarType::F32, 8);
        let mut b = GraphBuilder::new();
        let s = b.unary(OperatorType::Sqrt, x);
        let graph = b.assign(y, s).unwrap();

        let text = GraphPrinter::new().print(&graph);
        assert_eq!(
            text,
            "#0 = assign(y:vector<f32>, #1)\n#1 = sqrt(x:vector<f32>)\n"
        );
    }

    #[test]
    fn test_print_batch() {
        let x = Terminal::vector("x", ScalarType::F32, 8);
        let y = Terminal::vector("y", ScalarType::F32, 8);
        let graph = GraphBuilder::new().assign(y, x).unwrap();
        let batch = StatementBatch::new().with(graph.clone()).with(graph);

        let text = GraphPrinter::new().print_batch(&batch);
        assert!(text.contains("; statement 0"));
        assert!(text.contains("; statement 1"));
        assert_eq!(text.lines().count(), 4);
    }
}
