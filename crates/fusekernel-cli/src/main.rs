//! fusekernel CLI - Generate fused elementwise GPU kernels from TOML descriptions.
//!
//! # Commands
//!
//! - `fusekernel generate <file>` - Generate kernel source
//! - `fusekernel check <file>` - Validate a description without generating
//! - `fusekernel completions <shell>` - Print shell completions
//!
//! # Examples
//!
//! ```bash
//! # Generate an OpenCL kernel into ./generated
//! fusekernel generate axpy.toml
//!
//! # Print the CUDA version instead of writing it
//! fusekernel generate axpy.toml --dialect cuda --dry-run
//!
//! # Show each statement's node listing
//! fusekernel check axpy.toml --detailed
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::{check, generate};

/// fusekernel - fused linear-algebra kernel generator
#[derive(Parser)]
#[command(name = "fusekernel")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate kernel source from a TOML description
    Generate {
        /// Kernel description file
        file: String,

        /// Target dialect (opencl, cuda); overrides the description
        #[arg(short, long)]
        dialect: Option<String>,

        /// Output directory for generated code
        #[arg(short, long)]
        output: Option<String>,

        /// Show generated code without writing files
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a kernel description
    Check {
        /// Kernel description file
        file: String,

        /// Print each statement's node listing
        #[arg(long)]
        detailed: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn print_banner() {
    println!(
        "\n  {} {}\n",
        "fusekernel".bright_cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let show_banner = !cli.quiet && !matches!(cli.command, Commands::Completions { .. });
    if show_banner {
        print_banner();
    }

    let result = match cli.command {
        Commands::Generate {
            file,
            dialect,
            output,
            dry_run,
        } => generate::execute(&file, dialect.as_deref(), output.as_deref(), dry_run).map(|_| ()),

        Commands::Check { file, detailed } => check::execute(&file, detailed),

        Commands::Completions { shell } => {
            use clap::CommandFactory;
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "fusekernel",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from(["fusekernel", "generate", "k.toml", "--dialect", "cuda", "--dry-run"]);
        match cli.command {
            Commands::Generate {
                file,
                dialect,
                dry_run,
                ..
            } => {
                assert_eq!(file, "k.toml");
                assert_eq!(dialect.as_deref(), Some("cuda"));
                assert!(dry_run);
            }
            _ => panic!("expected generate"),
        }
    }
}
