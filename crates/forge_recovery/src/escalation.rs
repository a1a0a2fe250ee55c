//! Repeat-failure tracking.
//!
//! An issue signature identifies "the same problem" across rounds even when
//! the compiler's wording shifts by line or column. The tracker counts how
//! often each signature has been seen in a session and maps the count onto
//! the strategy that should handle it next.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::OnceLock;

use forge_core::{ErrorCategory, RecoveryAttempt, Strategy};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Default cap on the attempt history.
pub const DEFAULT_HISTORY_CAP: usize = 50;

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[^\s:'\x22]+/)?([^\s/:'\x22]+\.swift)(?::\d+)+:?").expect("location regex is valid")
    })
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^']+)'").expect("quoted token regex is valid"))
}

fn digits_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("digits regex is valid"))
}

/// Distinctive tokens of one error: the file basename plus quoted
/// identifiers, or the normalized message when nothing is quoted.
fn distinctive_tokens(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut message = raw.to_string();

    if let Some(caps) = location_regex().captures(raw) {
        tokens.push(caps[1].to_string());
        message = location_regex().replace_all(raw, "").to_string();
    }

    let quoted: Vec<String> = quoted_regex()
        .captures_iter(&message)
        .map(|caps| caps[1].to_string())
        .collect();

    if quoted.is_empty() {
        let normalized = digits_regex()
            .replace_all(&message, "#")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if !normalized.is_empty() {
            tokens.push(normalized);
        }
    } else {
        tokens.extend(quoted);
    }
    tokens
}

/// Stable key for `(category, errors)`, rendered `<category>:<16 hex>`.
///
/// Line and column numbers and directory prefixes do not contribute, and
/// the token set is sorted, so reordered or shifted errors map to the same
/// signature.
pub fn signature_for<S: AsRef<str>>(category: ErrorCategory, errors: &[S]) -> String {
    let tokens: BTreeSet<String> = errors
        .iter()
        .flat_map(|e| distinctive_tokens(e.as_ref()))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    for token in &tokens {
        hasher.update(b"\n");
        hasher.update(token.as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("{}:{}", category.as_str(), &digest[..16])
}

/// Whether `attempt_count` sightings of a signature call for a stronger
/// strategy than the pattern fixers.
pub fn should_escalate(attempt_count: u32) -> bool {
    attempt_count > 1
}

/// Strategy to start from on the `attempt_count`-th sighting.
pub fn escalation_level(attempt_count: u32) -> Strategy {
    match attempt_count {
        0 | 1 => Strategy::Pattern,
        2 => Strategy::Model,
        _ => Strategy::Fallback,
    }
}

/// Per-session signature counts and bounded attempt history.
#[derive(Debug, Clone)]
pub struct EscalationTracker {
    counts: HashMap<String, u32>,
    history: VecDeque<RecoveryAttempt>,
    history_cap: usize,
}

impl Default for EscalationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl EscalationTracker {
    pub fn new(history_cap: usize) -> Self {
        Self {
            counts: HashMap::new(),
            history: VecDeque::new(),
            history_cap: history_cap.max(1),
        }
    }

    pub fn signature_for<S: AsRef<str>>(&self, category: ErrorCategory, errors: &[S]) -> String {
        signature_for(category, errors)
    }

    /// Count one more sighting of `signature`; returns the new count.
    pub fn record_attempt(&mut self, signature: &str) -> u32 {
        let count = self.counts.entry(signature.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, signature: &str) -> u32 {
        self.counts.get(signature).copied().unwrap_or(0)
    }

    pub fn should_escalate(&self, attempt_count: u32) -> bool {
        should_escalate(attempt_count)
    }

    /// Append to the history, evicting the oldest entry past the cap.
    pub fn record(&mut self, attempt: RecoveryAttempt) {
        if self.history.len() == self.history_cap {
            self.history.pop_front();
        }
        self.history.push_back(attempt);
    }

    pub fn history(&self) -> impl Iterator<Item = &RecoveryAttempt> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Distinct signatures seen so far.
    pub fn signatures(&self) -> usize {
        self.counts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ignores_line_numbers_and_order() {
        let a = signature_for(
            ErrorCategory::ReservedType,
            &[
                "/tmp/p/Todo/List.swift:3:20: error: cannot find type 'Task' in scope",
                "/tmp/p/Todo/Row.swift:9:4: error: cannot find type 'Task' in scope",
            ],
        );
        let b = signature_for(
            ErrorCategory::ReservedType,
            &[
                "/other/root/Row.swift:11:4: error: cannot find type 'Task' in scope",
                "/other/root/List.swift:30:2: error: cannot find type 'Task' in scope",
            ],
        );
        assert_eq!(a, b);
        assert!(a.starts_with("reserved_type:"));
        assert_eq!(a.len(), "reserved_type:".len() + 16);
    }

    #[test]
    fn test_signature_distinguishes_identifiers_and_categories() {
        let task = signature_for(ErrorCategory::MissingImport, &["A.swift:1:1: error: cannot find 'Foo' in scope"]);
        let bar = signature_for(ErrorCategory::MissingImport, &["A.swift:1:1: error: cannot find 'Bar' in scope"]);
        let other = signature_for(ErrorCategory::Other, &["A.swift:1:1: error: cannot find 'Foo' in scope"]);
        assert_ne!(task, bar);
        assert_ne!(task, other);
    }

    #[test]
    fn test_signature_for_unquoted_message() {
        let a = signature_for(ErrorCategory::Other, &["build timed out after 300 seconds"]);
        let b = signature_for(ErrorCategory::Other, &["build timed out after 600 seconds"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_record_and_escalate() {
        let mut tracker = EscalationTracker::default();
        let sig = tracker.signature_for(ErrorCategory::Syntax, &["expected '}'"]);

        assert_eq!(tracker.record_attempt(&sig), 1);
        assert!(!tracker.should_escalate(1));
        assert_eq!(tracker.record_attempt(&sig), 2);
        assert!(tracker.should_escalate(2));
        assert_eq!(tracker.count(&sig), 2);
        assert_eq!(tracker.count("unknown"), 0);
    }

    #[test]
    fn test_escalation_levels() {
        assert_eq!(escalation_level(1), Strategy::Pattern);
        assert_eq!(escalation_level(2), Strategy::Model);
        assert_eq!(escalation_level(3), Strategy::Fallback);
        assert_eq!(escalation_level(7), Strategy::Fallback);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut tracker = EscalationTracker::new(3);
        for round in 1..=5 {
            tracker.record(RecoveryAttempt::new(round, "s", Strategy::Pattern, true, 1));
        }
        assert_eq!(tracker.history_len(), 3);
        assert_eq!(tracker.history().next().unwrap().round, 3);
    }
}
