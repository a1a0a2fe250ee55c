//! Fix command - Apply the deterministic pattern fixers once.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use forge_core::ProjectDir;
use forge_recovery::{classify, PatternRecoveryEngine};
use forge_runner::parse_diagnostics;
use tracing::warn;

use super::CommandFailure;

#[derive(Args)]
pub struct FixArgs {
    /// Project directory
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Build log with the errors to fix
    #[arg(short, long)]
    log: PathBuf,

    /// Show what would change without writing
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(args: FixArgs) -> Result<()> {
    if !args.path.is_dir() {
        return Err(CommandFailure::InvalidArgs(format!("project not found: {}", args.path.display())).into());
    }
    let log = std::fs::read_to_string(&args.log)
        .with_context(|| format!("Failed to read {}", args.log.display()))?;
    let errors = parse_diagnostics(&log).errors;
    if errors.is_empty() {
        println!("✅ No errors in {}", args.log.display());
        return Ok(());
    }

    let project = ProjectDir::new(&args.path);
    let files = project.load_sources().context("Failed to load Swift sources")?;
    let outcome = PatternRecoveryEngine::new().run(&classify(&errors), &files);

    for failure in &outcome.failures {
        warn!("{}", failure);
    }
    if !outcome.changed {
        println!("ℹ️  No pattern fix applies to these {} error(s)", errors.len());
        return Ok(());
    }

    let applied: Vec<&str> = outcome.applied.iter().map(|c| c.as_str()).collect();
    println!("🔧 Applied: {}", applied.join(", "));
    for path in &outcome.changed_paths {
        println!("   ✏️  {}", path);
    }

    if args.dry_run {
        println!("(dry run, nothing written)");
    } else {
        let written = project.write_files(&outcome.files).context("Failed to write fixed files")?;
        println!("✅ Wrote {} file(s)", written);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROKEN: &str = "import SwiftUI\n\nstruct ContentView: View {\n    var body: some View {\n        Text(\"Hello)\n    }\n}\n";

    fn project() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ContentView.swift"), BROKEN).unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(
            &log,
            "/tmp/App/ContentView.swift:5:14: error: unterminated string literal\n** BUILD FAILED **\n",
        )
        .unwrap();
        (dir, log)
    }

    #[tokio::test]
    async fn test_fix_writes_repaired_file() {
        let (dir, log) = project();
        let args = FixArgs { path: dir.path().to_path_buf(), log, dry_run: false };

        execute(args).await.unwrap();

        let fixed = std::fs::read_to_string(dir.path().join("ContentView.swift")).unwrap();
        assert!(fixed.contains(r#"Text("Hello")"#));
    }

    #[tokio::test]
    async fn test_fix_dry_run_leaves_files() {
        let (dir, log) = project();
        let args = FixArgs { path: dir.path().to_path_buf(), log, dry_run: true };

        execute(args).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("ContentView.swift")).unwrap();
        assert_eq!(content, BROKEN);
    }

    #[tokio::test]
    async fn test_fix_rejects_missing_project() {
        let dir = tempfile::tempdir().unwrap();
        let args = FixArgs {
            path: dir.path().join("missing"),
            log: dir.path().join("build.log"),
            dry_run: false,
        };

        let err = execute(args).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CommandFailure>(), Some(CommandFailure::InvalidArgs(_))));
    }
}
