//! Builder and simulator traits and their result types.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::RunnerResult;

/// Outcome of one build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub success: bool,
    /// Built `.app` bundle, when the build succeeded
    pub app_path: Option<PathBuf>,
    /// Raw error lines
    pub errors: Vec<String>,
    /// Raw warning lines
    pub warnings: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl BuildResult {
    /// A successful build.
    pub fn succeeded(app_path: Option<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            success: true,
            app_path,
            errors: Vec::new(),
            warnings: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    /// A failed build carrying raw error lines.
    pub fn failed(errors: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            success: false,
            app_path: None,
            stderr: errors.join("\n"),
            errors,
            warnings: Vec::new(),
            stdout: String::new(),
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    /// Synthetic failure used when a build exceeds its time budget.
    pub fn timed_out(seconds: u64) -> Self {
        Self::failed(vec![format!("build timed out after {} seconds", seconds)])
    }

    /// Combined output (stdout + stderr).
    pub fn combined_output(&self) -> String {
        if self.stdout.is_empty() {
            self.stderr.clone()
        } else if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Outcome of installing and launching an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchResult {
    pub success: bool,
    pub message: String,
}

impl LaunchResult {
    pub fn launched(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Compiles a project directory.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Check whether the underlying toolchain is installed.
    async fn is_available(&self) -> RunnerResult<bool>;

    /// Build the project. Implementations must stop (and kill any child
    /// process) when `cancel` fires.
    async fn build(
        &self,
        project_dir: &Path,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> RunnerResult<BuildResult>;
}

/// Installs and launches a built app.
#[async_trait]
pub trait Simulator: Send + Sync {
    async fn install_and_launch(&self, app_path: &Path, bundle_id: &str)
        -> RunnerResult<LaunchResult>;
}
