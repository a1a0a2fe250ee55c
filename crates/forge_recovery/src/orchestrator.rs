//! The per-round recovery state machine.
//!
//! ```text
//! Start ──► PatternPass ──changed──► Done(Success)
//!   │            │
//!   │            └─no change / violation─┐
//!   └─only Other / repeated signature────┴─► ModelPass ──fixed──► Done(Success)
//!                                               │
//!                                               └─failed──► FallbackPass ──► Done(Degraded | Exhausted)
//! ```
//!
//! A successful pass ends the round so the caller can rebuild; passes are
//! never chained within one round. After every pass the file set is
//! checked against the session baseline and a violating result is thrown
//! away as if the pass had failed.

use std::collections::BTreeMap;
use std::fmt;

use forge_core::{ErrorCategory, FileSet, FileSetBaseline, InvariantViolation, RecoveryAttempt, Strategy};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::assisted::ModelAssistedRecoveryEngine;
use crate::classifier::{classify, fixable_categories};
use crate::escalation::escalation_level;
use crate::fallback::{minimal_app, FallbackOutcome};
use crate::patterns::PatternRecoveryEngine;
use crate::session::SessionContext;

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Terminal {
    /// A pattern or model pass changed the files; rebuild
    Success,
    /// The minimal fallback app replaced the entry point; rebuild
    Degraded,
    /// Nothing left to try
    Exhausted,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Degraded => write!(f, "degraded"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// States visited during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "terminal")]
pub enum RecoveryState {
    Start,
    PatternPass,
    ModelPass,
    FallbackPass,
    Done(Terminal),
}

/// Everything a caller needs to know about one round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub round: u32,
    pub terminal: Terminal,
    /// Files to write back; unchanged when the round is exhausted
    pub files: FileSet,
    /// Strategy whose result is in `files`
    pub strategy: Option<Strategy>,
    pub attempts: Vec<RecoveryAttempt>,
    pub signature: String,
    pub classification: BTreeMap<ErrorCategory, Vec<String>>,
    pub states: Vec<RecoveryState>,
    /// Why the round was exhausted
    pub reason: Option<String>,
}

impl RoundReport {
    /// Whether the caller should write the files and rebuild.
    pub fn should_rebuild(&self) -> bool {
        self.terminal != Terminal::Exhausted
    }
}

/// Runs Pattern → Model → Fallback for one round.
pub struct RecoveryOrchestrator {
    pattern: PatternRecoveryEngine,
    model: Option<ModelAssistedRecoveryEngine>,
}

impl Default for RecoveryOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryOrchestrator {
    pub fn new() -> Self {
        Self {
            pattern: PatternRecoveryEngine::new(),
            model: None,
        }
    }

    pub fn with_model_engine(mut self, engine: ModelAssistedRecoveryEngine) -> Self {
        self.model = Some(engine);
        self
    }

    pub fn has_model_engine(&self) -> bool {
        self.model.is_some()
    }

    /// Run one recovery round for `errors` against `files`.
    pub async fn recover(
        &self,
        ctx: &mut SessionContext,
        errors: &[String],
        files: &FileSet,
    ) -> RoundReport {
        let round = ctx.next_round();
        if ctx.baseline.basenames.is_empty() {
            ctx.baseline = files.baseline();
        }
        let baseline = ctx.baseline.clone();

        let classification = classify(errors);
        let fixable = fixable_categories(&classification);
        let primary = fixable.first().copied().unwrap_or(ErrorCategory::Other);
        let signature = ctx.tracker.signature_for(primary, errors);
        let count = ctx.tracker.record_attempt(&signature);
        let level = escalation_level(count);

        info!(
            round,
            signature = %signature,
            count,
            level = %level,
            categories = ?classification.keys().collect::<Vec<_>>(),
            "Starting recovery round"
        );

        let mut report = RoundReport {
            round,
            terminal: Terminal::Exhausted,
            files: files.clone(),
            strategy: None,
            attempts: Vec::new(),
            signature: signature.clone(),
            classification,
            states: vec![RecoveryState::Start],
            reason: None,
        };

        if level == Strategy::Pattern && !fixable.is_empty() {
            report.states.push(RecoveryState::PatternPass);
            let outcome = self.pattern.run(&report.classification, files);
            let accepted = outcome.changed && passes_invariants(Strategy::Pattern, &outcome.files, files, &baseline);
            record(ctx, &mut report, Strategy::Pattern, accepted, outcome.changed_paths.len());

            if accepted {
                debug!(round, applied = ?outcome.applied, "Pattern pass changed files");
                return finish(report, Terminal::Success, outcome.files, Strategy::Pattern);
            }
        } else {
            debug!(round, level = %level, "Skipping pattern pass");
        }

        if ctx.is_cancelled() {
            return exhausted(report, "session cancelled");
        }

        if level != Strategy::Fallback {
            if let Some(model) = &self.model {
                report.states.push(RecoveryState::ModelPass);
                match model.recover(errors, files).await {
                    Ok(fixed) if passes_invariants(Strategy::Model, &fixed, files, &baseline) => {
                        let changed = fixed.changed_paths(files).len();
                        record(ctx, &mut report, Strategy::Model, true, changed);
                        return finish(report, Terminal::Success, fixed, Strategy::Model);
                    }
                    Ok(fixed) => {
                        let changed = fixed.changed_paths(files).len();
                        record(ctx, &mut report, Strategy::Model, false, changed);
                    }
                    Err(e) => {
                        warn!(round, "Model-assisted pass failed: {}", e);
                        record(ctx, &mut report, Strategy::Model, false, 0);
                    }
                }
            }
        }

        if ctx.is_cancelled() {
            return exhausted(report, "session cancelled");
        }

        report.states.push(RecoveryState::FallbackPass);
        match minimal_app(files, &baseline) {
            FallbackOutcome::Degraded(fallback) if passes_invariants(Strategy::Fallback, &fallback, files, &baseline) => {
                let changed = fallback.changed_paths(files).len();
                record(ctx, &mut report, Strategy::Fallback, true, changed);
                finish(report, Terminal::Degraded, fallback, Strategy::Fallback)
            }
            FallbackOutcome::Degraded(_) => {
                record(ctx, &mut report, Strategy::Fallback, false, 0);
                exhausted(report, "fallback app violated file-set invariants")
            }
            FallbackOutcome::Exhausted(reason) => {
                record(ctx, &mut report, Strategy::Fallback, false, 0);
                exhausted(report, &reason)
            }
        }
    }
}

fn passes_invariants(
    strategy: Strategy,
    files: &FileSet,
    previous: &FileSet,
    baseline: &FileSetBaseline,
) -> bool {
    let violations: Vec<InvariantViolation> = files.check_invariants(previous, baseline);
    if violations.is_empty() {
        return true;
    }
    for violation in &violations {
        warn!(strategy = %strategy, "Rejecting pass result: {}", violation);
    }
    false
}

fn record(
    ctx: &mut SessionContext,
    report: &mut RoundReport,
    strategy: Strategy,
    success: bool,
    files_changed: usize,
) {
    let attempt = RecoveryAttempt::new(report.round, &report.signature, strategy, success, files_changed);
    ctx.tracker.record(attempt.clone());
    report.attempts.push(attempt);
}

fn finish(mut report: RoundReport, terminal: Terminal, files: FileSet, strategy: Strategy) -> RoundReport {
    info!(
        round = report.round,
        strategy = %strategy,
        terminal = %terminal,
        "Recovery round finished"
    );
    report.terminal = terminal;
    report.files = files;
    report.strategy = Some(strategy);
    report.states.push(RecoveryState::Done(terminal));
    report
}

fn exhausted(mut report: RoundReport, reason: &str) -> RoundReport {
    warn!(round = report.round, "Recovery exhausted: {}", reason);
    report.terminal = Terminal::Exhausted;
    report.reason = Some(reason.to_string());
    report.states.push(RecoveryState::Done(Terminal::Exhausted));
    report
}
