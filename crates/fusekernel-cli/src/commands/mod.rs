//! CLI command implementations.

pub mod check;
pub mod generate;

use std::path::Path;

use crate::config::KernelDescription;
use crate::error::{CliError, CliResult};

/// Load a kernel description, reporting a missing file clearly.
pub fn load_description(file: &str) -> CliResult<KernelDescription> {
    let path = Path::new(file);
    if !path.exists() {
        return Err(CliError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Kernel description not found: {}", file),
        )));
    }
    KernelDescription::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_description() {
        let err = load_description("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
