//! xcodebuild-backed [`Builder`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::builder::{BuildResult, Builder};
use crate::config::BuildConfig;
use crate::diagnostics::parse_diagnostics;
use crate::error::{RunnerError, RunnerResult};
use crate::process::{probe, run_command};

/// Builds iOS projects with `xcodebuild`, generating the project with
/// `xcodegen` first when only a `project.yml` is present.
#[derive(Debug, Clone, Default)]
pub struct XcodeBuilder {
    config: BuildConfig,
}

impl XcodeBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    async fn generate_project(
        &self,
        project_dir: &Path,
        cancel: &CancellationToken,
    ) -> RunnerResult<()> {
        if !self.config.use_xcodegen
            || !project_dir.join("project.yml").exists()
            || find_xcodeproj(project_dir).is_some()
        {
            return Ok(());
        }

        info!("Generating Xcode project with xcodegen");
        let output = run_command(
            "xcodegen",
            &["generate".to_string()],
            project_dir,
            self.config.timeout_seconds,
            cancel,
        )
        .await?;

        if !output.success() {
            return Err(RunnerError::ExecutionFailed(format!(
                "xcodegen exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(())
    }

    /// Assemble the xcodebuild argument list.
    pub fn build_args(&self, project: &Path, scheme: &str, derived_data: &Path) -> Vec<String> {
        vec![
            "-project".to_string(),
            project.display().to_string(),
            "-scheme".to_string(),
            scheme.to_string(),
            "-configuration".to_string(),
            self.config.configuration.clone(),
            "-sdk".to_string(),
            self.config.sdk.clone(),
            "-destination".to_string(),
            self.config.destination.clone(),
            "-derivedDataPath".to_string(),
            derived_data.display().to_string(),
            "build".to_string(),
        ]
    }
}

#[async_trait]
impl Builder for XcodeBuilder {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(probe("xcodebuild", &["-version"]).await)
    }

    async fn build(
        &self,
        project_dir: &Path,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> RunnerResult<BuildResult> {
        let started_at = Utc::now();

        self.generate_project(project_dir, cancel).await?;

        let project = find_xcodeproj(project_dir).ok_or_else(|| {
            RunnerError::ProjectNotFound(format!(
                "no .xcodeproj in {}",
                project_dir.display()
            ))
        })?;
        let scheme = self
            .config
            .scheme
            .clone()
            .or_else(|| project.file_stem().map(|s| s.to_string_lossy().to_string()))
            .unwrap_or_else(|| "App".to_string());
        let derived_data = self
            .config
            .derived_data_path
            .clone()
            .unwrap_or_else(|| project_dir.join("build").join("DerivedData"));

        info!("Building scheme '{}' ({})", scheme, bundle_id);
        let args = self.build_args(&project, &scheme, &derived_data);
        let output = run_command(
            "xcodebuild",
            &args,
            project_dir,
            self.config.timeout_seconds,
            cancel,
        )
        .await?;

        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let mut diagnostics = parse_diagnostics(&combined);
        let success = output.success() && diagnostics.errors.is_empty();

        if !output.success() && diagnostics.errors.is_empty() {
            warn!("xcodebuild failed without parseable errors");
            diagnostics
                .errors
                .push(format!("xcodebuild exited with code {}", output.exit_code));
        }

        let app_path = if success {
            find_app_bundle(&derived_data)
        } else {
            None
        };
        debug!("Build finished: success={}, app={:?}", success, app_path);

        Ok(BuildResult {
            success,
            app_path,
            errors: diagnostics.errors,
            warnings: diagnostics.warnings,
            stdout: output.stdout,
            stderr: output.stderr,
            started_at,
            finished_at: Utc::now(),
            duration_ms: output.duration_ms,
        })
    }
}

/// First `*.xcodeproj` directly inside `dir`.
fn find_xcodeproj(dir: &Path) -> Option<PathBuf> {
    let mut projects: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "xcodeproj"))
        .collect();
    projects.sort();
    projects.into_iter().next()
}

/// The `.app` bundle produced for the simulator SDK.
fn find_app_bundle(derived_data: &Path) -> Option<PathBuf> {
    let products = derived_data.join("Build").join("Products");
    WalkDir::new(&products)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|entry| {
            entry.file_type().is_dir()
                && entry.path().extension().map_or(false, |ext| ext == "app")
                && entry
                    .path()
                    .parent()
                    .and_then(|p| p.file_name())
                    .map_or(false, |name| {
                        name.to_string_lossy().ends_with("-iphonesimulator")
                    })
        })
        .map(|entry| entry.into_path())
}
