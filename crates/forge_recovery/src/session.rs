//! Per-session recovery state.

use forge_core::FileSetBaseline;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::escalation::{EscalationTracker, DEFAULT_HISTORY_CAP};

/// Everything one build/recovery session owns. Passed explicitly; nothing
/// here is shared between sessions.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub project_id: String,
    pub tracker: EscalationTracker,
    /// Files that must survive recovery, captured before the first round
    pub baseline: FileSetBaseline,
    /// Current round, 1-based once recovery has started
    pub round: u32,
    pub cancel: CancellationToken,
}

impl SessionContext {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            project_id: project_id.into(),
            tracker: EscalationTracker::new(DEFAULT_HISTORY_CAP),
            baseline: FileSetBaseline::default(),
            round: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.tracker = EscalationTracker::new(cap);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_baseline(mut self, baseline: FileSetBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Advance to the next round and return its number.
    pub fn next_round(&mut self) -> u32 {
        self.round += 1;
        self.round
    }
}
