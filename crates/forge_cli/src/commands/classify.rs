//! Classify command - Group xcodebuild errors by recovery category.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use forge_core::{BuildError, ErrorCategory};
use forge_recovery::{classify, parse_errors};
use forge_runner::parse_diagnostics;
use serde::Serialize;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Build log to read (stdin when omitted)
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Serialize)]
struct Report {
    categories: BTreeMap<ErrorCategory, Vec<String>>,
    errors: Vec<BuildError>,
}

pub async fn execute(args: ClassifyArgs) -> Result<()> {
    let output = match &args.log {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let errors = error_lines(&output);
    let report = Report {
        categories: classify(&errors),
        errors: parse_errors(&errors),
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if report.errors.is_empty() {
                println!("✅ No errors found");
                return Ok(());
            }
            println!("📋 {} error(s) in {} categor(ies)", report.errors.len(), report.categories.len());
            for (category, lines) in &report.categories {
                let fixer = if category.has_pattern_fixer() { "pattern" } else { "model" };
                println!("\n{} ({}, {}):", category, lines.len(), fixer);
                for line in lines {
                    println!("   - {}", line);
                }
            }
        }
    }
    Ok(())
}

/// Compiler error lines, or every non-empty line when the input is not
/// xcodebuild output.
fn error_lines(output: &str) -> Vec<String> {
    let diagnostics = parse_diagnostics(output);
    if !diagnostics.errors.is_empty() {
        return diagnostics.errors;
    }
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.to_lowercase().contains("warning:"))
        .map(str::to_string)
        .collect()
}
