//! `fusekernel generate` command - Generate kernel source from a description.

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::debug;

use fusekernel_codegen::check_identifier;

use crate::error::{CliError, CliResult};

use super::load_description;

/// Execute the `generate` command.
///
/// Returns the path written to, or `None` for a dry run.
pub fn execute(
    file: &str,
    dialect: Option<&str>,
    output: Option<&str>,
    dry_run: bool,
) -> CliResult<Option<PathBuf>> {
    let description = load_description(file)?;
    let batch = description.batch()?;
    let template = description.template(&batch, dialect)?;

    println!(
        "{} Generating {} kernel from {} statement(s)",
        "→".bright_cyan(),
        template.kind().to_string().bright_white(),
        batch.len().to_string().bright_white()
    );
    println!("  {} Source: {}", "•".dimmed(), file.bright_yellow());

    let kernel = template.generate()?;
    println!(
        "  {} Dialect: {}",
        "•".dimmed(),
        kernel.dialect.to_string().bright_yellow()
    );
    println!(
        "  {} Launch: local {:?}, global {:?}",
        "•".dimmed(),
        kernel.local_size,
        kernel.global_size
    );
    println!();

    let source = kernel.source();
    if dry_run {
        println!("{}:", "Generated code".bright_white().underline());
        println!("{}", source.dimmed());
        return Ok(None);
    }

    // The kernel name becomes the file stem.
    check_identifier(&kernel.name).map_err(|e| CliError::Validation(e.to_string()))?;

    let output_dir = output.map(Path::new).unwrap_or_else(|| Path::new("generated"));
    fs::create_dir_all(output_dir)?;

    let output_file = output_dir.join(format!(
        "{}.{}",
        kernel.name,
        kernel.dialect.file_extension()
    ));
    fs::write(&output_file, &source)?;
    debug!(path = %output_file.display(), bytes = source.len(), "kernel written");

    println!(
        "{} Written to {}",
        "✓".bright_green(),
        output_file.display().to_string().bright_white()
    );

    Ok(Some(output_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    const COPY: &str = r#"
[kernel]
name = "copy"
dialect = "cuda"

[[operands]]
name = "x"
kind = "vector"
type = "f32"
size = 64

[[operands]]
name = "y"
kind = "vector"
type = "f32"
size = 64

[[statements]]
nodes = [{ op = "assign", lhs = { operand = "y" }, rhs = { operand = "x" } }]
"#;

    fn description_file() -> NamedTempFile {
        write_description(COPY)
    }

    fn write_description(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_kernel_name_cannot_leave_output_dir() {
        let file = write_description(&COPY.replace("name = \"copy\"", "name = \"../escape\""));
        let root = tempdir().unwrap();
        let out = root.path().join("out");

        let result = execute(file.path().to_str().unwrap(), None, out.to_str(), false);
        assert!(result.is_err());
        assert!(!root.path().join("escape.cu").exists());
        assert!(!out.exists());
    }

    #[test]
    fn test_generate_writes_file() {
        let file = description_file();
        let out = tempdir().unwrap();
        let path_str = file.path().to_str().unwrap();

        let written = execute(path_str, None, out.path().to_str(), false)
            .unwrap()
            .unwrap();
        assert_eq!(written, out.path().join("copy.cu"));

        let source = fs::read_to_string(written).unwrap();
        assert!(source.starts_with("extern \"C\" __global__ void copy("));
        assert!(source.contains("y[i] = y_private;"));
    }

    #[test]
    fn test_dialect_override() {
        let file = description_file();
        let out = tempdir().unwrap();

        let written = execute(
            file.path().to_str().unwrap(),
            Some("opencl"),
            out.path().to_str(),
            false,
        )
        .unwrap()
        .unwrap();
        assert_eq!(written.extension().unwrap(), "cl");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let file = description_file();
        let out = tempdir().unwrap();

        let written = execute(file.path().to_str().unwrap(), None, out.path().to_str(), true).unwrap();
        assert!(written.is_none());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
