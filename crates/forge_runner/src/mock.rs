//! Mock builder and simulator for testing.
//!
//! Provides scripted implementations of the [`Builder`] and [`Simulator`]
//! traits so the recovery pipeline can be exercised without Xcode.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::builder::{BuildResult, Builder, LaunchResult, Simulator};
use crate::error::{RunnerError, RunnerResult};

/// Inspects the project on disk and returns the errors a build would
/// report, or `None` when it would succeed.
pub type BuildValidator = Arc<dyn Fn(&Path) -> Option<Vec<String>> + Send + Sync>;

/// Predefined outcome for one build call.
#[derive(Debug, Clone)]
pub struct MockBuild {
    pub success: bool,
    pub errors: Vec<String>,
    pub app_path: Option<PathBuf>,
}

impl MockBuild {
    pub fn success() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            app_path: Some(PathBuf::from("/tmp/mock/Build/Products/Debug-iphonesimulator/App.app")),
        }
    }

    pub fn failure<S: Into<String>>(errors: impl IntoIterator<Item = S>) -> Self {
        Self {
            success: false,
            errors: errors.into_iter().map(Into::into).collect(),
            app_path: None,
        }
    }

    fn into_result(self) -> BuildResult {
        if self.success {
            BuildResult::succeeded(self.app_path)
        } else {
            BuildResult::failed(self.errors)
        }
    }
}

/// Captured build call for verification.
#[derive(Debug, Clone)]
pub struct CapturedBuild {
    pub project_dir: PathBuf,
    pub bundle_id: String,
}

/// Mock builder for testing.
///
/// Responses are consumed in order; once exhausted the last one repeats.
/// A validator, when set, takes precedence and decides the outcome from
/// the files actually written to disk.
#[derive(Clone)]
pub struct MockBuilder {
    available: Arc<RwLock<bool>>,
    responses: Arc<RwLock<Vec<MockBuild>>>,
    response_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<CapturedBuild>>>,
    simulate_failure: Arc<RwLock<Option<String>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    validator: Arc<RwLock<Option<BuildValidator>>>,
}

impl Default for MockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuilder {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            responses: Arc::new(RwLock::new(Vec::new())),
            response_index: Arc::new(AtomicUsize::new(0)),
            captured: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            validator: Arc::new(RwLock::new(None)),
        }
    }

    /// Set whether the builder is available.
    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Add a response for the next build call.
    pub fn add_response(self, response: MockBuild) -> Self {
        self.responses.write().push(response);
        self
    }

    /// Replace all responses.
    pub fn with_responses(self, responses: Vec<MockBuild>) -> Self {
        *self.responses.write() = responses;
        self
    }

    /// Make every build return `ExecutionFailed`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some(message.into());
        self
    }

    /// Sleep before answering. The sleep honours the cancel token.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.write() = Some(delay);
        self
    }

    /// Decide build outcomes from the project contents.
    pub fn with_validator<F>(self, validator: F) -> Self
    where
        F: Fn(&Path) -> Option<Vec<String>> + Send + Sync + 'static,
    {
        *self.validator.write() = Some(Arc::new(validator));
        self
    }

    /// Get all captured builds.
    pub fn get_builds(&self) -> Vec<CapturedBuild> {
        self.captured.read().clone()
    }

    /// Number of build calls made.
    pub fn build_count(&self) -> usize {
        self.captured.read().len()
    }

    fn next_response(&self) -> MockBuild {
        let responses = self.responses.read();
        if responses.is_empty() {
            return MockBuild::success();
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses
            .get(index.min(responses.len() - 1))
            .cloned()
            .unwrap_or_else(MockBuild::success)
    }
}

#[async_trait]
impl Builder for MockBuilder {
    async fn is_available(&self) -> RunnerResult<bool> {
        Ok(*self.available.read())
    }

    async fn build(
        &self,
        project_dir: &Path,
        bundle_id: &str,
        cancel: &CancellationToken,
    ) -> RunnerResult<BuildResult> {
        self.captured.write().push(CapturedBuild {
            project_dir: project_dir.to_path_buf(),
            bundle_id: bundle_id.to_string(),
        });

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(RunnerError::Cancelled),
            }
        }
        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled);
        }

        if let Some(msg) = self.simulate_failure.read().clone() {
            return Err(RunnerError::ExecutionFailed(msg));
        }

        let validator = self.validator.read().clone();
        if let Some(validator) = validator {
            return Ok(match validator(project_dir) {
                Some(errors) if !errors.is_empty() => BuildResult::failed(errors),
                _ => MockBuild::success().into_result(),
            });
        }

        Ok(self.next_response().into_result())
    }
}

/// Mock simulator recording every launch.
#[derive(Clone, Default)]
pub struct MockSimulator {
    launches: Arc<RwLock<Vec<(PathBuf, String)>>>,
    fail_with: Arc<RwLock<Option<String>>>,
}

impl MockSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make launches report failure with `message`.
    pub fn failing(self, message: impl Into<String>) -> Self {
        *self.fail_with.write() = Some(message.into());
        self
    }

    /// Recorded `(app_path, bundle_id)` pairs.
    pub fn launches(&self) -> Vec<(PathBuf, String)> {
        self.launches.read().clone()
    }
}

#[async_trait]
impl Simulator for MockSimulator {
    async fn install_and_launch(
        &self,
        app_path: &Path,
        bundle_id: &str,
    ) -> RunnerResult<LaunchResult> {
        self.launches
            .write()
            .push((app_path.to_path_buf(), bundle_id.to_string()));
        match self.fail_with.read().clone() {
            Some(msg) => Ok(LaunchResult::failed(msg)),
            None => Ok(LaunchResult::launched(format!("{} launched", bundle_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_in_order_last_repeats() {
        let builder = MockBuilder::new().with_responses(vec![
            MockBuild::failure(["Foo.swift:1: error: boom"]),
            MockBuild::success(),
        ]);
        let cancel = CancellationToken::new();
        let dir = Path::new("/tmp/project");

        let r1 = builder.build(dir, "com.example.app", &cancel).await.unwrap();
        let r2 = builder.build(dir, "com.example.app", &cancel).await.unwrap();
        let r3 = builder.build(dir, "com.example.app", &cancel).await.unwrap();

        assert!(!r1.success);
        assert_eq!(r1.errors, vec!["Foo.swift:1: error: boom"]);
        assert!(r2.success);
        assert!(r3.success);
        assert_eq!(builder.build_count(), 3);
        assert_eq!(builder.get_builds()[0].bundle_id, "com.example.app");
    }

    #[tokio::test]
    async fn test_failure_simulation() {
        let builder = MockBuilder::new().simulate_failure("xcodebuild crashed");
        let cancel = CancellationToken::new();

        let result = builder.build(Path::new("."), "b", &cancel).await;
        assert!(matches!(result, Err(RunnerError::ExecutionFailed(_))));
    }

    #[tokio::test]
    async fn test_delay_is_cancellable() {
        let builder = MockBuilder::new().with_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = builder.build(Path::new("."), "b", &cancel).await;
        assert!(matches!(result, Err(RunnerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_validator_decides_outcome() {
        let builder = MockBuilder::new().with_validator(|dir| {
            if dir.ends_with("broken") {
                Some(vec!["error: broken".to_string()])
            } else {
                None
            }
        });
        let cancel = CancellationToken::new();

        let bad = builder.build(Path::new("/x/broken"), "b", &cancel).await.unwrap();
        let good = builder.build(Path::new("/x/fine"), "b", &cancel).await.unwrap();
        assert!(!bad.success);
        assert!(good.success);
    }

    #[tokio::test]
    async fn test_mock_simulator() {
        let sim = MockSimulator::new();
        let result = sim
            .install_and_launch(Path::new("/tmp/App.app"), "com.example.app")
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(sim.launches().len(), 1);

        let failing = MockSimulator::new().failing("no device");
        let result = failing
            .install_and_launch(Path::new("/tmp/App.app"), "com.example.app")
            .await
            .unwrap();
        assert!(!result.success);
    }
}
