//! Recover command - Run the self-healing build loop on an existing project.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use forge_core::ProjectDir;
use forge_recovery::SessionContext;
use tracing::info;

use super::{build_loop, code_generators, load_config, report_outcome, run_session, CommandFailure};

#[derive(Args)]
pub struct RecoverArgs {
    /// Project directory
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    /// Bundle identifier to build and launch
    #[arg(long, default_value = "com.swiftforge.app")]
    bundle_id: String,

    /// Total builds allowed, the first one included
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Skip launching the app in the simulator
    #[arg(long)]
    no_launch: bool,
}

pub async fn execute(args: RecoverArgs, config_path: Option<&Path>) -> Result<()> {
    if !args.path.is_dir() {
        return Err(CommandFailure::InvalidArgs(format!("project not found: {}", args.path.display())).into());
    }
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", args.path.display()))?;

    let config = load_config(config_path, &root, args.max_attempts)?;
    let project = ProjectDir::new(&root);
    let files = project.load_sources().context("Failed to load Swift sources")?;
    if files.is_empty() {
        return Err(CommandFailure::InvalidArgs(format!("no Swift sources under {}", root.display())).into());
    }
    info!(files = files.len(), "Loaded project sources");

    let generators = code_generators(&config)?;
    let history_cap = config.recovery.history_cap;
    let build_loop = build_loop(&config, generators, !args.no_launch).with_bundle_id(args.bundle_id);
    let project_id = root.display().to_string();

    println!("🔨 Building {} (max {} attempt(s))...", root.display(), build_loop.max_attempts());
    let session_project = project_id.clone();
    let outcome = run_session(&project_id, move |cancel| async move {
        let mut ctx = SessionContext::new(session_project)
            .with_cancel(cancel)
            .with_history_cap(history_cap);
        build_loop.run(&mut ctx, &project, files).await
    })
    .await?;

    report_outcome(&outcome)
}
