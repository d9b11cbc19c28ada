//! Register cache for device-memory operands.
//!
//! Every handle operand is loaded into a private register once before the
//! statements, the statements operate on registers only, and every assigned
//! handle is stored back once after the statements. The [`AccessCache`] is the
//! state shared by those three phases; it is created per kernel and never
//! outlives one generation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::{IndexSpace, MappedOperand, MappingTable, PositionKey, Result, SourceWriter};

/// Register name holding the current element of `name`.
pub fn register_name(name: &str) -> String {
    format!("{name}_private")
}

/// Fetched operands and the register each one lives in.
#[derive(Debug, Clone, Default)]
pub struct AccessCache {
    fetched: BTreeSet<String>,
    access_names: BTreeMap<String, String>,
}

impl AccessCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register currently standing in for `name`, if any.
    pub fn access_name(&self, name: &str) -> Option<&str> {
        self.access_names.get(name).map(String::as_str)
    }

    /// Check if `name` has been fetched and not yet written back.
    pub fn is_fetched(&self, name: &str) -> bool {
        self.fetched.contains(name)
    }

    /// Number of operands currently held in registers.
    pub fn len(&self) -> usize {
        self.fetched.len()
    }

    /// Check if no operand is held.
    pub fn is_empty(&self) -> bool {
        self.fetched.is_empty()
    }
}

/// Names whose current value is read by some statement of a batch.
///
/// A handle that is only ever assigned (with `=`) gets a register but no
/// load, so pure outputs are never read from memory.
#[derive(Debug, Clone, Default)]
pub struct ReadSet {
    names: BTreeSet<String>,
}

impl ReadSet {
    /// Collect read names across all tables.
    pub fn collect<'a>(tables: impl IntoIterator<Item = &'a MappingTable>) -> Self {
        let mut names = BTreeSet::new();
        for table in tables {
            for (key, operand) in table.iter() {
                if *key != PositionKey::target() || table.reads_target() {
                    names.insert(operand.name().to_string());
                }
            }
        }
        Self { names }
    }

    /// Check if `name` is read.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Bring `operand` into its register unless it is already there.
///
/// With `load` set the register is initialized from memory, otherwise it is
/// only declared. Scalars are never fetched. Returns whether code was emitted.
pub fn fetch(
    operand: &MappedOperand,
    space: IndexSpace<'_>,
    load: bool,
    cache: &mut AccessCache,
    writer: &mut SourceWriter,
) -> Result<bool> {
    if !operand.is_handle() || cache.is_fetched(operand.name()) {
        return Ok(false);
    }

    let ty = operand.scalar_type().c_name();
    let register = register_name(operand.name());
    if load {
        let access = operand.generate_access(space)?;
        writer.line(format!("{ty} {register} = {access};"));
    } else {
        writer.line(format!("{ty} {register};"));
    }
    trace!(operand = operand.name(), load, "fetched");

    cache.fetched.insert(operand.name().to_string());
    cache
        .access_names
        .insert(operand.name().to_string(), register);
    Ok(true)
}

/// Store the register of `operand` back to memory, once.
///
/// Operands that are not currently fetched are skipped. Returns whether code
/// was emitted.
pub fn write_back(
    operand: &MappedOperand,
    space: IndexSpace<'_>,
    cache: &mut AccessCache,
    writer: &mut SourceWriter,
) -> Result<bool> {
    if !cache.fetched.remove(operand.name()) {
        return Ok(false);
    }

    let access = operand.generate_access(space)?;
    let register = cache
        .access_names
        .remove(operand.name())
        .unwrap_or_else(|| register_name(operand.name()));
    writer.line(format!("{access} = {register};"));
    trace!(operand = operand.name(), "written back");
    Ok(true)
}

/// Fetch every handle of every statement.
///
/// Tables are visited in statement order. Within a table, operands are
/// visited in key order with the statement target last, so a statement's
/// inputs are loaded before its output register is declared.
pub(crate) fn fetch_all(
    tables: &[MappingTable],
    reads: &ReadSet,
    space: IndexSpace<'_>,
    cache: &mut AccessCache,
    writer: &mut SourceWriter,
) -> Result<()> {
    for table in tables {
        let inputs = table
            .iter()
            .filter(|(key, _)| key.is_terminal() && **key != PositionKey::target())
            .map(|(_, operand)| operand);
        for operand in inputs.chain(table.target()) {
            fetch(operand, space, reads.contains(operand.name()), cache, writer)?;
        }
    }
    Ok(())
}

/// Write back the target of every statement, in statement order.
pub(crate) fn write_back_all(
    tables: &[MappingTable],
    space: IndexSpace<'_>,
    cache: &mut AccessCache,
    writer: &mut SourceWriter,
) -> Result<()> {
    for target in tables.iter().filter_map(MappingTable::target) {
        write_back(target, space, cache, writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusekernel_graph::{GraphBuilder, ScalarType, Terminal};

    const SPACE: IndexSpace<'static> = IndexSpace::Linear("i");

    fn vector(name: &str) -> Terminal {
        Terminal::vector(name, ScalarType::F32, 64)
    }

    #[test]
    fn test_fetch_once() {
        let x = MappedOperand::new(vector("x"));
        let mut cache = AccessCache::new();
        let mut w = SourceWriter::default();

        assert!(fetch(&x, SPACE, true, &mut cache, &mut w).unwrap());
        assert!(!fetch(&x, SPACE, true, &mut cache, &mut w).unwrap());
        assert_eq!(cache.access_name("x"), Some("x_private"));
        assert_eq!(w.finish(), "float x_private = x[i];\n");
    }

    #[test]
    fn test_declare_without_load() {
        let y = MappedOperand::new(vector("y"));
        let mut cache = AccessCache::new();
        let mut w = SourceWriter::default();

        fetch(&y, SPACE, false, &mut cache, &mut w).unwrap();
        assert_eq!(w.finish(), "float y_private;\n");
        assert!(cache.is_fetched("y"));
    }

    #[test]
    fn test_scalars_not_fetched() {
        let alpha = MappedOperand::new(Terminal::scalar("alpha", ScalarType::F32));
        let mut cache = AccessCache::new();
        let mut w = SourceWriter::default();

        assert!(!fetch(&alpha, SPACE, true, &mut cache, &mut w).unwrap());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_write_back_once() {
        let y = MappedOperand::new(vector("y"));
        let mut cache = AccessCache::new();
        let mut w = SourceWriter::default();

        assert!(!write_back(&y, SPACE, &mut cache, &mut w).unwrap());
        fetch(&y, SPACE, false, &mut cache, &mut w).unwrap();
        assert!(write_back(&y, SPACE, &mut cache, &mut w).unwrap());
        assert!(!write_back(&y, SPACE, &mut cache, &mut w).unwrap());
        assert!(cache.access_name("y").is_none());
        assert_eq!(w.finish(), "float y_private;\ny[i] = y_private;\n");
    }

    #[test]
    fn test_read_set() {
        let plain = GraphBuilder::new().assign(vector("y"), vector("x")).unwrap();
        let accumulate = GraphBuilder::new()
            .inplace_add(vector("z"), vector("x"))
            .unwrap();
        let tables = [
            MappingTable::build(&plain).unwrap(),
            MappingTable::build(&accumulate).unwrap(),
        ];

        let reads = ReadSet::collect(&tables);
        assert!(reads.contains("x"));
        assert!(!reads.contains("y"));
        assert!(reads.contains("z"));
    }

    #[test]
    fn test_fetch_all_order() {
        let mut b = GraphBuilder::new();
        let sum = b.add_expr(vector("a"), vector("b"));
        let graph = b.assign(vector("c"), sum).unwrap();
        let tables = [MappingTable::build(&graph).unwrap()];
        let reads = ReadSet::collect(&tables);

        let mut cache = AccessCache::new();
        let mut w = SourceWriter::default();
        fetch_all(&tables, &reads, SPACE, &mut cache, &mut w).unwrap();
        write_back_all(&tables, SPACE, &mut cache, &mut w).unwrap();

        assert_eq!(
            w.finish(),
            "float a_private = a[i];\nfloat b_private = b[i];\nfloat c_private;\nc[i] = c_private;\n"
        );
        assert!(cache.is_empty());
    }
}
