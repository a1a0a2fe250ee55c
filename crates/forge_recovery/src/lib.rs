//! # forge_recovery
//!
//! Error recovery and the self-healing build loop for SwiftForge.
//!
//! Sits between "a model produced some Swift files" and "the project
//! builds". Each failed build is classified, repaired by the cheapest
//! strategy that has not already failed on the same problem, written back
//! and rebuilt until it succeeds or the attempt budget runs out.
//!
//! # Architecture
//!
//! - **Classifier**: raw compiler lines to [`ErrorCategory`](forge_core::ErrorCategory) groups
//! - **Patterns**: deterministic per-category fixers and their engine
//! - **Assisted**: provider-fallback repair through [`CodeGenerator`](forge_llm::CodeGenerator)
//! - **Escalation**: issue signatures and repeat counts
//! - **Orchestrator**: the Pattern → Model → Fallback state machine
//! - **BuildLoop**: build, recover, write back, rebuild
//! - **Registry**: one cancellable session per project
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use forge_core::ProjectDir;
//! use forge_recovery::{BuildLoop, RecoveryOrchestrator, SessionContext};
//! use forge_runner::MockBuilder;
//!
//! let project = ProjectDir::new("/tmp/TodoApp");
//! let files = project.load_sources()?;
//! let build_loop = BuildLoop::new(Arc::new(MockBuilder::new()), RecoveryOrchestrator::new())
//!     .with_max_attempts(3);
//!
//! let mut ctx = SessionContext::new("todo");
//! let outcome = build_loop.run(&mut ctx, &project, files).await?;
//! println!("{:?} after {} builds", outcome.status, outcome.builds);
//! ```

pub mod assisted;
pub mod build_loop;
pub mod classifier;
pub mod error;
pub mod escalation;
pub mod fallback;
pub mod orchestrator;
pub mod patterns;
pub mod registry;
pub mod session;

pub use assisted::{merge_fix, relevant_files, ModelAssistedRecoveryEngine, REPAIR_RULES};
pub use build_loop::{BuildLoop, BuildOutcome, BuildStatus};
pub use classifier::{classify, classify_one, fixable_categories, parse_errors};
pub use error::{RecoveryError, RecoveryResult};
pub use escalation::{escalation_level, should_escalate, signature_for, EscalationTracker};
pub use fallback::{minimal_app, FallbackOutcome};
pub use orchestrator::{RecoveryOrchestrator, RecoveryState, RoundReport, Terminal};
pub use patterns::{PatternOutcome, PatternRecoveryEngine};
pub use registry::{SessionHandle, SessionRegistry};
pub use session::SessionContext;
