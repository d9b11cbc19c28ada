//! Kernel source generation for fused linear-algebra statements.
//!
//! This crate compiles a [`StatementBatch`] of elementwise vector or matrix
//! assignments into the source of a single data-parallel kernel.
//!
//! # Overview
//!
//! Generation runs in four stages:
//!
//! - every statement gets a [`MappingTable`] that assigns each leaf position a
//!   [`MappedOperand`] (name, element type, memory-access pattern);
//! - a fetch pass loads every device-memory operand into a register once;
//! - the [`ExpressionEmitter`] serializes each statement through the generic
//!   [`traverse`] engine, referring to registers instead of memory;
//! - a write-back pass stores each assignment target once.
//!
//! The surrounding grid-stride loops, kernel signature and launch shape come
//! from the [`SaxpyTemplate`] and its [`Profile`].
//!
//! # Example
//!
//! ```
//! use fusekernel_codegen::{Profile, SaxpyTemplate};
//! use fusekernel_graph::{GraphBuilder, ScalarType, StatementBatch, Terminal};
//!
//! let x = Terminal::vector("x", ScalarType::F32, 1024);
//! let y = Terminal::vector("y", ScalarType::F32, 1024);
//! let batch = StatementBatch::new().with(GraphBuilder::new().assign(y, x).unwrap());
//!
//! let kernel = SaxpyTemplate::vector(&batch, Profile::vector(128, 32, Default::default()))
//!     .generate()
//!     .unwrap();
//!
//! assert!(kernel.source().contains("y[i] = y_private;"));
//! ```

#![warn(missing_docs)]

mod cache;
mod dialect;
mod emit;
mod key;
mod mapping;
mod operand;
mod profile;
mod template;
mod traverse;
mod writer;

pub use cache::{fetch, register_name, write_back, AccessCache, ReadSet};
pub use dialect::Dialect;
pub use emit::{emit_statement, ExpressionEmitter};
pub use key::{PositionKey, Role};
pub use mapping::{MappingTable, OperandSet};
pub use operand::{check_identifier, IndexSpace, MappedOperand};
pub use profile::{Decomposition, Profile};
pub use template::{GeneratedKernel, SaxpyTemplate, TemplateKind};
pub use traverse::{find_reductions, traverse, traverse_statement, TraversalEvent, Visitor};
pub use writer::SourceWriter;

pub use fusekernel_graph::StatementBatch;

use fusekernel_graph::{GraphError, TerminalKind};
use thiserror::Error;

/// Errors that can occur during kernel generation.
///
/// Generation is deterministic, so none of these are transient: the caller
/// should treat any of them as "this expression shape is not supported by the
/// generator" and fall back to another execution strategy.
#[derive(Error, Debug)]
pub enum CodegenError {
    /// Malformed expression graph.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Operator without an inline spelling.
    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Traversal produced a position with no mapped operand.
    #[error("No operand mapped at {0}")]
    KeyNotFound(PositionKey),

    /// Expression shape the generator deliberately does not handle.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Operand cannot be addressed by the selected template.
    #[error("Operand '{name}' ({kind}) is incompatible: {reason}")]
    IncompatibleOperand {
        /// Operand name.
        name: String,
        /// Operand kind.
        kind: TerminalKind,
        /// Why it was rejected.
        reason: String,
    },

    /// Name that cannot appear verbatim in generated source.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// One name used for two different containers.
    #[error("Operand '{0}' is used with conflicting descriptors")]
    ConflictingOperand(String),

    /// Nothing to generate.
    #[error("Statement batch is empty")]
    EmptyBatch,

    /// Profile unusable for the selected template.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Unknown target dialect name.
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    /// Unknown template name.
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),
}

/// Result type for generation operations.
pub type Result<T> = std::result::Result<T, CodegenError>;
