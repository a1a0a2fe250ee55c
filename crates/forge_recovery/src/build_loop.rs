//! The self-healing build loop.
//!
//! Build, and while the build fails, run one recovery round, write the
//! files back and build again. The loop stops on success, when the
//! orchestrator is exhausted, when the attempt budget runs out, or when
//! the session is cancelled. A failed outcome always carries the errors
//! of the last real build.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use forge_core::{FileSet, ProjectDir, RecoveryAttempt};
use forge_runner::{BuildResult, Builder, LaunchResult, RunnerError, Simulator};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RecoveryResult;
use crate::orchestrator::RecoveryOrchestrator;
use crate::session::SessionContext;

/// Default total number of builds per session.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default hard timeout for one build.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(300);

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Succeeded,
    /// Every attempt was used and the last build still failed
    BudgetExhausted,
    /// The orchestrator had nothing left to try
    RecoveryExhausted,
    Cancelled,
}

/// Final result of a session.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub success: bool,
    pub status: BuildStatus,
    pub final_files: FileSet,
    /// Raw errors of the last build; empty on success
    pub remaining_errors: Vec<String>,
    /// Every strategy attempt of every recovery round, failed ones
    /// included, in order
    pub strategy_trail: Vec<RecoveryAttempt>,
    pub app_path: Option<PathBuf>,
    pub launch: Option<LaunchResult>,
    /// Number of builds run
    pub builds: u32,
}

impl BuildOutcome {
    fn stopped(
        status: BuildStatus,
        files: FileSet,
        errors: Vec<String>,
        trail: Vec<RecoveryAttempt>,
        builds: u32,
    ) -> Self {
        Self {
            success: false,
            status,
            final_files: files,
            remaining_errors: errors,
            strategy_trail: trail,
            app_path: None,
            launch: None,
            builds,
        }
    }
}

/// Drives builder → orchestrator → builder rounds for one project.
pub struct BuildLoop {
    builder: Arc<dyn Builder>,
    simulator: Option<Arc<dyn Simulator>>,
    orchestrator: RecoveryOrchestrator,
    max_attempts: u32,
    build_timeout: Duration,
    bundle_id: String,
}

impl BuildLoop {
    pub fn new(builder: Arc<dyn Builder>, orchestrator: RecoveryOrchestrator) -> Self {
        Self {
            builder,
            simulator: None,
            orchestrator,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            bundle_id: "com.swiftforge.app".to_string(),
        }
    }

    pub fn with_simulator(mut self, simulator: Arc<dyn Simulator>) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// Total builds allowed, the first one included. At least one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_build_timeout(mut self, timeout: Duration) -> Self {
        self.build_timeout = timeout;
        self
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = bundle_id.into();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Write `files`, build, and recover until success or the budget is spent.
    pub async fn run(
        &self,
        ctx: &mut SessionContext,
        project: &ProjectDir,
        files: FileSet,
    ) -> RecoveryResult<BuildOutcome> {
        info!(
            session = %ctx.session_id,
            project = %ctx.project_id,
            files = files.len(),
            max_attempts = self.max_attempts,
            "Starting build loop"
        );
        ctx.baseline = files.baseline();
        project.write_files(&files)?;

        let cancel = ctx.cancel.clone();
        let result = match self.build_once(project, &cancel, 0).await {
            Ok(result) => result,
            Err(RunnerError::Cancelled) => {
                return Ok(BuildOutcome::stopped(BuildStatus::Cancelled, files, Vec::new(), Vec::new(), 0));
            }
            Err(e) => return Err(e.into()),
        };

        if result.success {
            return Ok(self.succeeded(files, result, Vec::new(), 1).await);
        }

        let mut outcome = self
            .recover_rounds(ctx, project, failure_errors(&result), files, self.max_attempts - 1)
            .await?;
        outcome.builds += 1;
        Ok(outcome)
    }

    /// Entry point for callers that already hold build errors: up to
    /// `max_attempts` recovery rounds, each followed by a rebuild.
    pub async fn recover_and_rebuild(
        &self,
        ctx: &mut SessionContext,
        project: &ProjectDir,
        initial_errors: Vec<String>,
        files: FileSet,
        max_attempts: u32,
    ) -> RecoveryResult<BuildOutcome> {
        if ctx.baseline.basenames.is_empty() {
            ctx.baseline = files.baseline();
        }
        self.recover_rounds(ctx, project, initial_errors, files, max_attempts).await
    }

    async fn recover_rounds(
        &self,
        ctx: &mut SessionContext,
        project: &ProjectDir,
        initial_errors: Vec<String>,
        files: FileSet,
        rounds: u32,
    ) -> RecoveryResult<BuildOutcome> {
        let cancel = ctx.cancel.clone();
        let mut files = files;
        let mut errors = initial_errors;
        let mut trail: Vec<RecoveryAttempt> = Vec::new();
        let mut builds = 0;

        for _ in 0..rounds {
            if cancel.is_cancelled() {
                return Ok(BuildOutcome::stopped(BuildStatus::Cancelled, files, errors, trail, builds));
            }

            let report = tokio::select! {
                report = self.orchestrator.recover(ctx, &errors, &files) => report,
                _ = cancel.cancelled() => {
                    return Ok(BuildOutcome::stopped(BuildStatus::Cancelled, files, errors, trail, builds));
                }
            };

            trail.extend(report.attempts.iter().cloned());

            if !report.should_rebuild() {
                error!(
                    round = report.round,
                    reason = report.reason.as_deref().unwrap_or("unknown"),
                    "Recovery exhausted"
                );
                return Ok(BuildOutcome::stopped(BuildStatus::RecoveryExhausted, files, errors, trail, builds));
            }

            files = report.files;
            let written = project.write_files(&files)?;
            debug!(round = report.round, written, "Files written back");

            let result = match self.build_once(project, &cancel, report.round).await {
                Ok(result) => result,
                Err(RunnerError::Cancelled) => {
                    return Ok(BuildOutcome::stopped(BuildStatus::Cancelled, files, errors, trail, builds));
                }
                Err(e) => return Err(e.into()),
            };
            builds += 1;

            if result.success {
                let strategies: Vec<&str> = trail.iter().filter(|a| a.success).map(|a| a.strategy_name()).collect();
                info!(round = report.round, strategies = ?strategies, "Build succeeded after recovery");
                return Ok(self.succeeded(files, result, trail, builds).await);
            }
            errors = failure_errors(&result);
            info!(round = report.round, errors = errors.len(), "Build still failing");
        }

        warn!(builds, "Attempt budget exhausted");
        Ok(BuildOutcome::stopped(BuildStatus::BudgetExhausted, files, errors, trail, builds))
    }

    /// One build under the hard timeout. A timeout, ours or the builder's
    /// own, becomes a synthetic failed build; dropping the build future
    /// kills the subprocess.
    async fn build_once(
        &self,
        project: &ProjectDir,
        cancel: &CancellationToken,
        round: u32,
    ) -> Result<BuildResult, RunnerError> {
        let build = self.builder.build(project.root(), &self.bundle_id, cancel);
        let result = match tokio::time::timeout(self.build_timeout, build).await {
            Ok(Ok(result)) => result,
            Ok(Err(RunnerError::Timeout(seconds))) => {
                warn!(round, timeout_secs = seconds, "Builder reported a timeout");
                BuildResult::timed_out(seconds)
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(round, timeout_secs = self.build_timeout.as_secs(), "Build timed out");
                BuildResult::timed_out(self.build_timeout.as_secs())
            }
        };

        if let Err(e) = project.append_build_log(round, &result.stdout, &result.stderr) {
            warn!(round, "Failed to append build log: {}", e);
        }
        Ok(result)
    }

    async fn succeeded(
        &self,
        files: FileSet,
        result: BuildResult,
        trail: Vec<RecoveryAttempt>,
        builds: u32,
    ) -> BuildOutcome {
        let launch = match (&self.simulator, &result.app_path) {
            (Some(simulator), Some(app_path)) => {
                let launch = simulator
                    .install_and_launch(app_path, &self.bundle_id)
                    .await
                    .unwrap_or_else(|e| LaunchResult::failed(e.to_string()));
                if !launch.success {
                    warn!("Launch failed: {}", launch.message);
                }
                Some(launch)
            }
            _ => None,
        };

        BuildOutcome {
            success: true,
            status: BuildStatus::Succeeded,
            final_files: files,
            remaining_errors: Vec::new(),
            strategy_trail: trail,
            app_path: result.app_path,
            launch,
            builds,
        }
    }
}

/// Errors to recover from; a failed build always yields at least one.
fn failure_errors(result: &BuildResult) -> Vec<String> {
    if result.errors.is_empty() {
        vec!["build failed without diagnostics".to_string()]
    } else {
        result.errors.clone()
    }
}
