//! `fusekernel check` command - Validate a kernel description without emitting source.

use colored::Colorize;
use fusekernel_codegen::find_reductions;
use fusekernel_graph::GraphPrinter;

use crate::error::{CliError, CliResult};

use super::load_description;

/// A statement the generator cannot fuse.
#[derive(Debug)]
struct CompatibilityIssue {
    statement: usize,
    message: String,
}

/// Execute the `check` command.
pub fn execute(file: &str, detailed: bool) -> CliResult<()> {
    let description = load_description(file)?;
    let batch = description.batch()?;
    let template = description.template(&batch, None)?;

    println!("{} Checking kernel description", "→".bright_cyan());
    println!("  {} Source: {}", "•".dimmed(), file.bright_yellow());
    println!(
        "  {} Template: {}",
        "•".dimmed(),
        template.kind().to_string().bright_yellow()
    );
    println!();

    let mut issues = Vec::new();
    for (i, graph) in batch.iter().enumerate() {
        for node in find_reductions(graph)? {
            issues.push(CompatibilityIssue {
                statement: i,
                message: format!(
                    "reduction at node {} must be dispatched to a dedicated kernel",
                    node
                ),
            });
        }

        if detailed {
            println!("  {} statement {}:", "•".dimmed(), i);
            for line in GraphPrinter::new().print(graph).lines() {
                println!("      {}", line.dimmed());
            }
        }
    }

    if !issues.is_empty() {
        println!("{}:", "Issues".bright_white().underline());
        for issue in &issues {
            println!(
                "  {} statement {}: {}",
                "✗".bright_red(),
                issue.statement,
                issue.message
            );
        }
        return Err(CliError::Validation(format!(
            "{} statement(s) cannot be fused",
            issues.len()
        )));
    }

    let operands = template.check()?;
    println!("{}:", "Operands".bright_white().underline());
    for operand in operands.iter() {
        println!(
            "  {} {} ({}, {})",
            "✓".bright_green(),
            operand.name().bright_white(),
            operand.kind(),
            operand.scalar_type()
        );
    }

    println!();
    println!(
        "{} {} statement(s) fuse into one kernel",
        "✓".bright_green().bold(),
        batch.len()
    );
    Ok(())
}
