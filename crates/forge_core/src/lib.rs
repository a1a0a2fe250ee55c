//! # forge_core
//!
//! Shared domain model for SwiftForge.
//!
//! This crate holds the types every other crate in the workspace passes
//! around while a generated iOS project is being built and repaired:
//!
//! - **SourceFile / FileSet**: the in-memory Swift sources of one project,
//!   with the basename-uniqueness and non-empty-content invariants
//! - **BuildError / ErrorCategory**: compiler diagnostics and their taxonomy
//! - **RecoveryAttempt**: one entry of a session's strategy trail
//! - **ProjectDir**: loading sources from disk, writing them back, build log
//! - **ForgeConfig**: `swiftforge.toml` plus environment overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use forge_core::{FileSet, ProjectDir, SourceFile};
//!
//! # fn main() -> forge_core::CoreResult<()> {
//! let project = ProjectDir::new("/tmp/TodoApp");
//! let mut files = project.load_sources()?;
//! files.insert(SourceFile::new("TodoApp/Extra.swift", "import SwiftUI\n"))?;
//! project.write_files(&files)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod file_set;
pub mod model;
pub mod project;

pub use config::{BuildSettings, ForgeConfig, LlmSettings, RecoverySettings, SimulatorSettings};
pub use error::{CoreError, CoreResult};
pub use file_set::{
    FileSet, FileSetBaseline, InvariantViolation, SourceFile, ENTRY_POINT_MARKER,
    MIN_MEANINGFUL_CHARS,
};
pub use model::{BuildError, ErrorCategory, RecoveryAttempt, Strategy};
pub use project::ProjectDir;
