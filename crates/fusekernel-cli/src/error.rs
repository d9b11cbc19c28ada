//! Error types for the fusekernel CLI.

use fusekernel_codegen::CodegenError;
use fusekernel_graph::GraphError;
use thiserror::Error;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed kernel description.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Statement does not form a valid expression graph.
    #[error("Invalid statement: {0}")]
    Graph(#[from] GraphError),

    /// Kernel generation error.
    #[error("Code generation failed: {0}")]
    Codegen(#[from] CodegenError),

    /// Validation error.
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        CliError::Config(e.to_string())
    }
}
