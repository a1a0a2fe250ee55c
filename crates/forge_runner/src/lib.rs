//! # forge_runner
//!
//! Build and launch execution wrapper for SwiftForge.
//!
//! The recovery pipeline only ever talks to the [`Builder`] and
//! [`Simulator`] traits. This crate ships the real implementations, which
//! shell out to Xcode tooling, and scripted mocks for tests.
//!
//! # Features
//!
//! - **XcodeBuilder**: `xcodegen` + `xcodebuild` with a hard timeout and
//!   cancellation that kills the subprocess
//! - **SimctlSimulator**: boot, install and launch through `xcrun simctl`
//! - **Diagnostics**: error/warning extraction from xcodebuild output
//! - **Mocks**: `MockBuilder` / `MockSimulator` capturing every call
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_runner::{BuildConfig, Builder, XcodeBuilder};
//! use std::path::Path;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = XcodeBuilder::new(BuildConfig::default().timeout(600));
//!     let cancel = CancellationToken::new();
//!
//!     let result = builder
//!         .build(Path::new("/tmp/TodoApp"), "com.example.todo", &cancel)
//!         .await?;
//!     println!("success={} errors={}", result.success, result.errors.len());
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod mock;
pub mod process;
pub mod simctl;
pub mod xcode;

pub use builder::{BuildResult, Builder, LaunchResult, Simulator};
pub use config::{BuildConfig, SimulatorConfig};
pub use diagnostics::{parse_diagnostics, Diagnostics};
pub use error::{RunnerError, RunnerResult};
pub use mock::{BuildValidator, CapturedBuild, MockBuild, MockBuilder, MockSimulator};
pub use simctl::SimctlSimulator;
pub use xcode::XcodeBuilder;
