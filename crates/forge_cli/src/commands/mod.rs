//! CLI command definitions.
//!
//! This module defines the command structure for the SwiftForge CLI and
//! the wiring shared by the commands that run the build loop.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use forge_core::{ForgeConfig, RecoveryAttempt};
use forge_llm::{parse_provider_order, CodeGenerator, LlmAdapter, LlmCodeGenerator};
use forge_recovery::{
    BuildLoop, BuildOutcome, BuildStatus, ModelAssistedRecoveryEngine, RecoveryOrchestrator,
    RecoveryResult, SessionRegistry,
};
use forge_runner::{BuildConfig, SimctlSimulator, SimulatorConfig, XcodeBuilder};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub mod classify;
pub mod fix;
pub mod generate;
pub mod recover;

/// SwiftForge - AI-driven iOS app generator
#[derive(Parser)]
#[command(name = "swiftforge")]
#[command(version, about = "SwiftForge - AI-driven iOS app generator")]
#[command(long_about = r#"
SwiftForge turns a description into a SwiftUI app, repairs the generated
code until it compiles, and launches it in the iOS Simulator.

COMMANDS:
  generate  → Generate an app, build it with self-healing, launch it
  recover   → Run the self-healing build loop on an existing project
  classify  → Classify xcodebuild errors
  fix       → Apply only the deterministic pattern fixers

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Build failure
  4 - Recovery exhausted
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (defaults to swiftforge.toml in the project)
    #[arg(long, global = true, env = "SWIFTFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new app from a description
    Generate(generate::GenerateArgs),

    /// Repair and build an existing project
    Recover(recover::RecoverArgs),

    /// Classify build errors from a log file or stdin
    Classify(classify::ClassifyArgs),

    /// Apply the deterministic pattern fixers once
    Fix(fix::FixArgs),
}

/// Failures that map onto dedicated exit codes.
#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("Build failed with {errors} error(s)")]
    BuildFailed { errors: usize },

    #[error("Recovery exhausted with {errors} error(s) remaining")]
    RecoveryExhausted { errors: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgs(String),
}

/// Load configuration for a project, with CLI overrides.
pub fn load_config(explicit: Option<&Path>, project_root: &Path, max_attempts: Option<u32>) -> Result<ForgeConfig> {
    let mut config = ForgeConfig::load(explicit, Some(project_root)).context("Failed to load configuration")?;
    if let Some(attempts) = max_attempts {
        if attempts == 0 {
            return Err(CommandFailure::InvalidArgs("--max-attempts must be at least 1".to_string()).into());
        }
        config = config.with_max_attempts(attempts);
    }
    Ok(config)
}

/// Code generators for every configured provider that has an API key,
/// in preference order.
pub fn code_generators(config: &ForgeConfig) -> Result<Vec<Arc<dyn CodeGenerator>>> {
    let order = parse_provider_order(&config.llm.providers).context("Invalid provider list")?;
    let mut generators: Vec<Arc<dyn CodeGenerator>> = Vec::new();

    for provider in order {
        let model = config.llm.models.get(provider.as_str()).cloned();
        match LlmAdapter::from_env(provider, model) {
            Ok(adapter) => {
                let adapter = adapter
                    .with_max_tokens(config.llm.max_tokens)
                    .with_timeout(Duration::from_secs(config.llm.timeout_secs));
                info!(provider = %provider, model = %adapter.model(), "Provider configured");
                generators.push(Arc::new(LlmCodeGenerator::new(adapter)));
            }
            Err(e) => warn!(provider = %provider, "Provider skipped: {}", e),
        }
    }
    Ok(generators)
}

/// Build loop backed by Xcode and, if requested, the simulator.
pub fn build_loop(config: &ForgeConfig, generators: Vec<Arc<dyn CodeGenerator>>, launch: bool) -> BuildLoop {
    let mut orchestrator = RecoveryOrchestrator::new();
    if generators.is_empty() {
        warn!("No LLM provider configured; model-assisted recovery disabled");
    } else {
        orchestrator = orchestrator.with_model_engine(
            ModelAssistedRecoveryEngine::new(generators)
                .with_call_timeout(Duration::from_secs(config.llm.timeout_secs))
                .with_max_prompt_errors(config.recovery.max_prompt_errors),
        );
    }

    let builder = XcodeBuilder::new(BuildConfig::from(&config.build));
    let mut build_loop = BuildLoop::new(Arc::new(builder), orchestrator)
        .with_max_attempts(config.recovery.max_attempts)
        .with_build_timeout(Duration::from_secs(config.build.timeout_secs));

    if launch && config.simulator.launch {
        build_loop = build_loop.with_simulator(Arc::new(SimctlSimulator::new(SimulatorConfig::from(&config.simulator))));
    }
    build_loop
}

/// Run `session` as the project's only session; Ctrl-C cancels it.
pub async fn run_session<F, Fut>(project_id: &str, session: F) -> Result<BuildOutcome>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = RecoveryResult<BuildOutcome>> + Send + 'static,
{
    let registry = SessionRegistry::new();
    let handle = registry.spawn(project_id, session).await;
    let cancel = handle.cancel_token();

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            cancel.cancel();
        }
    });

    let outcome = handle.outcome().await;
    ctrl_c.abort();
    let outcome = outcome??;
    Ok(outcome)
}

/// Print a build outcome and turn failures into exit-code errors.
pub fn report_outcome(outcome: &BuildOutcome) -> Result<()> {
    println!();
    if !outcome.strategy_trail.is_empty() {
        println!("🔧 Recovery:");
        for line in trail_lines(&outcome.strategy_trail) {
            println!("   {}", line);
        }
    }

    match outcome.status {
        BuildStatus::Succeeded => {
            println!("✅ Build succeeded after {} build(s)", outcome.builds);
            if let Some(app) = &outcome.app_path {
                println!("   App: {}", app.display());
            }
            if let Some(launch) = &outcome.launch {
                let icon = if launch.success { "📱" } else { "⚠️ " };
                println!("{} {}", icon, launch.message);
            }
            Ok(())
        }
        BuildStatus::Cancelled => {
            println!("⏹️  Cancelled");
            Err(anyhow::anyhow!("Session cancelled"))
        }
        status => {
            println!("❌ Build failed ({} build(s)):", outcome.builds);
            for error in &outcome.remaining_errors {
                println!("   - {}", error);
            }
            let errors = outcome.remaining_errors.len();
            Err(match status {
                BuildStatus::RecoveryExhausted => CommandFailure::RecoveryExhausted { errors },
                _ => CommandFailure::BuildFailed { errors },
            }
            .into())
        }
    }
}

/// One line per recovery attempt, e.g. `round 2: model ✗ (0 file(s))`.
fn trail_lines(trail: &[RecoveryAttempt]) -> Vec<String> {
    trail
        .iter()
        .map(|a| {
            let mark = if a.success { "✓" } else { "✗" };
            format!("round {}: {} {} ({} file(s))", a.round, a.strategy_name(), mark, a.files_changed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{FileSet, Strategy};

    fn outcome(status: BuildStatus, trail: Vec<RecoveryAttempt>) -> BuildOutcome {
        BuildOutcome {
            success: status == BuildStatus::Succeeded,
            status,
            final_files: FileSet::new(),
            remaining_errors: vec!["A.swift:1:1: error: expected '}'".to_string()],
            strategy_trail: trail,
            app_path: None,
            launch: None,
            builds: 3,
        }
    }

    #[test]
    fn test_trail_lines_include_failed_attempts() {
        let trail = vec![
            RecoveryAttempt::new(1, "syntax:0123456789abcdef", Strategy::Pattern, true, 1),
            RecoveryAttempt::new(2, "syntax:0123456789abcdef", Strategy::Model, false, 0),
            RecoveryAttempt::new(2, "syntax:0123456789abcdef", Strategy::Fallback, true, 2),
        ];

        assert_eq!(
            trail_lines(&trail),
            vec![
                "round 1: pattern ✓ (1 file(s))",
                "round 2: model ✗ (0 file(s))",
                "round 2: fallback ✓ (2 file(s))",
            ]
        );
    }

    #[test]
    fn test_report_outcome_maps_status() {
        let exhausted = report_outcome(&outcome(BuildStatus::RecoveryExhausted, Vec::new())).unwrap_err();
        assert!(matches!(
            exhausted.downcast_ref::<CommandFailure>(),
            Some(CommandFailure::RecoveryExhausted { errors: 1 })
        ));

        let failed = report_outcome(&outcome(BuildStatus::BudgetExhausted, Vec::new())).unwrap_err();
        assert!(matches!(
            failed.downcast_ref::<CommandFailure>(),
            Some(CommandFailure::BuildFailed { errors: 1 })
        ));
    }
}
