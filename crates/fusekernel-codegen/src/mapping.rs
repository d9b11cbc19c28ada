//! Operand mapping tables.
//!
//! A [`MappingTable`] is built once per statement by a deep traversal and
//! answers "which operand sits at this leaf position". Emission looks every
//! leaf up by key, so the table and the emitter must agree on key
//! construction; both go through [`PositionKey::for_child`].

use std::collections::btree_map;
use std::collections::BTreeMap;

use fusekernel_graph::{Child, ExpressionGraph, OperatorType, Terminal};
use tracing::trace;

use crate::traverse::{traverse_statement, TraversalEvent};
use crate::{CodegenError, MappedOperand, PositionKey, Result, Role};

/// Leaf position to operand map for one statement.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: BTreeMap<PositionKey, MappedOperand>,
    root_op: Option<OperatorType>,
}

impl MappingTable {
    /// Build the table for one statement.
    pub fn build(graph: &ExpressionGraph) -> Result<Self> {
        let mut entries = BTreeMap::new();
        let mut record = |event: TraversalEvent<'_>| -> Result<()> {
            if let TraversalEvent::Leaf { key, node } = event {
                let terminal = match key.role {
                    Role::Lhs | Role::LhsLeaf | Role::Parent => terminal_of(&node.lhs, key)?,
                    Role::Rhs => match &node.rhs {
                        Some(rhs) => terminal_of(rhs, key)?,
                        None => return Err(CodegenError::KeyNotFound(key)),
                    },
                };
                trace!(key = %key, operand = %terminal, "mapped");
                entries.insert(key, MappedOperand::from(terminal));
            }
            Ok(())
        };
        traverse_statement(graph, &mut record, true)?;

        Ok(Self {
            entries,
            root_op: Some(graph.root().op),
        })
    }

    /// Look up the operand at `key`.
    pub fn get(&self, key: &PositionKey) -> Result<&MappedOperand> {
        self.entries
            .get(key)
            .ok_or(CodegenError::KeyNotFound(*key))
    }

    /// Statement target, if the table was built from a statement.
    pub fn target(&self) -> Option<&MappedOperand> {
        self.entries.get(&PositionKey::target())
    }

    /// Check if the statement reads its own target (`+=`, `-=`).
    pub fn reads_target(&self) -> bool {
        self.root_op.is_some_and(|op| op.reads_target())
    }

    /// Entries in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, PositionKey, MappedOperand> {
        self.entries.iter()
    }

    /// Number of mapped positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The node at a `Parent` leaf is an access; its container is the left child.
fn terminal_of(child: &Child, key: PositionKey) -> Result<&Terminal> {
    match child {
        Child::Terminal(t) => Ok(t),
        Child::Node(_) if key.role == Role::Parent => Err(CodegenError::NotImplemented(format!(
            "element access into a computed expression at node {}",
            key.node
        ))),
        Child::Node(_) => Err(CodegenError::KeyNotFound(key)),
    }
}

/// Distinct operands of a statement batch in first-seen order.
///
/// Operands are identified by name. Seeing the same name with a different
/// descriptor is an error: parameters are declared once per name. Names must
/// be identifiers that do not collide with the loop variables, bounds and
/// registers of the generated kernel.
#[derive(Debug, Clone, Default)]
pub struct OperandSet {
    operands: Vec<MappedOperand>,
}

impl OperandSet {
    /// Union of the operands of every table, tables in order, keys in order.
    pub fn collect<'a>(tables: impl IntoIterator<Item = &'a MappingTable>) -> Result<Self> {
        let mut set = Self::default();
        for table in tables {
            for (_, operand) in table.iter() {
                set.insert(operand)?;
            }
        }
        Ok(set)
    }

    fn insert(&mut self, operand: &MappedOperand) -> Result<()> {
        match self.get(operand.name()) {
            Some(existing) if existing == operand => Ok(()),
            Some(_) => Err(CodegenError::ConflictingOperand(operand.name().to_string())),
            None => {
                operand.check_name()?;
                self.operands.push(operand.clone());
                Ok(())
            }
        }
    }

    /// Find an operand by name.
    pub fn get(&self, name: &str) -> Option<&MappedOperand> {
        self.operands.iter().find(|o| o.name() == name)
    }

    /// Operands in first-seen order.
    pub fn iter(&self) -> std::slice::Iter<'_, MappedOperand> {
        self.operands.iter()
    }

    /// Number of distinct operands.
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusekernel_graph::{GraphBuilder, NodeId, ScalarType};

    fn vector(name: &str) -> Terminal {
        Terminal::vector(name, ScalarType::F32, 64)
    }

    #[test]
    fn test_simple_assignment() {
        let graph = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let table = MappingTable::build(&graph).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.target().unwrap().name(), "y");
        let rhs = PositionKey::new(NodeId::ROOT, Role::Rhs);
        assert_eq!(table.get(&rhs).unwrap().name(), "x");
        assert!(!table.reads_target());
    }

    #[test]
    fn test_nested_keys() {
        let alpha = Terminal::scalar("alpha", ScalarType::F32);
        let mut b = GraphBuilder::new();
        let ax = b.mult(alpha, vector("x"));
        let graph = b.inplace_add(vector("y"), ax).unwrap();
        let table = MappingTable::build(&graph).unwrap();

        let names: Vec<_> = table.iter().map(|(k, o)| (k.to_string(), o.name())).collect();
        assert_eq!(
            names,
            vec![
                ("(#0, lhs_leaf)".to_string(), "y"),
                ("(#1, lhs)".to_string(), "alpha"),
                ("(#1, rhs)".to_string(), "x"),
            ]
        );
        assert!(table.reads_target());
    }

    #[test]
    fn test_access_maps_container() {
        let mut b = GraphBuilder::new();
        let elem = b.access(vector("x"), Terminal::scalar("k", ScalarType::U32));
        let graph = b.assign(vector("y"), elem).unwrap();
        let table = MappingTable::build(&graph).unwrap();

        let container = table.get(&PositionKey::parent(NodeId::new(1))).unwrap();
        assert_eq!(container.name(), "x");
        let index = table.get(&PositionKey::new(NodeId::new(1), Role::Rhs)).unwrap();
        assert_eq!(index.name(), "k");
    }

    #[test]
    fn test_missing_key() {
        let graph = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let table = MappingTable::build(&graph).unwrap();
        let key = PositionKey::new(NodeId::new(5), Role::Lhs);
        assert!(matches!(table.get(&key), Err(CodegenError::KeyNotFound(k)) if k == key));
    }

    #[test]
    fn test_reduction_rejected() {
        let mut b = GraphBuilder::new();
        let dot = b.binary(OperatorType::InnerProd, vector("x"), vector("y"));
        let graph = b.assign(vector("z"), dot).unwrap();
        assert!(matches!(
            MappingTable::build(&graph),
            Err(CodegenError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_operand_set_union() {
        let first = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let second = GraphBuilder::new().assign(vector("z"), vector("x")).unwrap();
        let tables = [
            MappingTable::build(&first).unwrap(),
            MappingTable::build(&second).unwrap(),
        ];

        let set = OperandSet::collect(&tables).unwrap();
        let names: Vec<_> = set.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_operand_set_rejects_generated_names() {
        let mut b = GraphBuilder::new();
        let sum = b.add_expr(vector("x"), vector("x_private"));
        let graph = b.assign(vector("z"), sum).unwrap();
        let tables = [MappingTable::build(&graph).unwrap()];
        assert!(matches!(
            OperandSet::collect(&tables),
            Err(CodegenError::InvalidName { name, .. }) if name == "x_private"
        ));

        for reserved in ["i", "N", "i_chunk"] {
            let graph = GraphBuilder::new().assign(vector(reserved), vector("x")).unwrap();
            let tables = [MappingTable::build(&graph).unwrap()];
            assert!(matches!(
                OperandSet::collect(&tables),
                Err(CodegenError::InvalidName { name, .. }) if name == reserved
            ));
        }
    }

    #[test]
    fn test_operand_set_rejects_non_identifiers() {
        let alpha = Terminal::scalar("alpha beta", ScalarType::F32);
        let mut b = GraphBuilder::new();
        let scaled = b.mult(alpha, vector("x"));
        let graph = b.assign(vector("y"), scaled).unwrap();
        let tables = [MappingTable::build(&graph).unwrap()];
        assert!(matches!(
            OperandSet::collect(&tables),
            Err(CodegenError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_operand_set_conflict() {
        let first = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let other_x = Terminal::vector("x", ScalarType::F64, 64);
        let second = GraphBuilder::new().assign(vector("z"), other_x).unwrap();
        let tables = [
            MappingTable::build(&first).unwrap(),
            MappingTable::build(&second).unwrap(),
        ];

        assert!(matches!(
            OperandSet::collect(&tables),
            Err(CodegenError::ConflictingOperand(name)) if name == "x"
        ));
    }
}
