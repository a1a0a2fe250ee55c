//! Error taxonomy and recovery bookkeeping types.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category assigned to a compiler or validator error.
///
/// The set is closed; `Other` is the default bucket. Declaration order is
/// the classifier's iteration order, not the fixer order (see
/// [`ErrorCategory::PATTERN_ORDER`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    StringLiteral,
    MissingImport,
    ReservedType,
    ProtocolConformance,
    Syntax,
    Other,
}

impl ErrorCategory {
    /// Every category.
    pub const ALL: [ErrorCategory; 6] = [
        Self::StringLiteral,
        Self::MissingImport,
        Self::ReservedType,
        Self::ProtocolConformance,
        Self::Syntax,
        Self::Other,
    ];

    /// Order in which deterministic fixers run. String literals first since
    /// broken quoting defeats line-level parsing; imports before conformance
    /// since some conformance errors are a missing Foundation import.
    pub const PATTERN_ORDER: [ErrorCategory; 5] = [
        Self::StringLiteral,
        Self::MissingImport,
        Self::ProtocolConformance,
        Self::ReservedType,
        Self::Syntax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringLiteral => "string_literal",
            Self::MissingImport => "missing_import",
            Self::ReservedType => "reserved_type",
            Self::ProtocolConformance => "protocol_conformance",
            Self::Syntax => "syntax",
            Self::Other => "other",
        }
    }

    /// Whether a deterministic fixer exists for this category.
    pub fn has_pattern_fixer(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<path>[^\s:'\x22]+\.swift):(?P<line>\d+)(?::\d+)?")
            .expect("location regex is valid")
    })
}

/// A single compiler error, recomputed every round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildError {
    /// The raw diagnostic line
    pub raw: String,
    /// Source path mentioned by the diagnostic, if any
    pub file: Option<String>,
    /// Line number, if any
    pub line: Option<u32>,
    pub category: ErrorCategory,
}

impl BuildError {
    pub fn new(raw: impl Into<String>, category: ErrorCategory) -> Self {
        let raw = raw.into();
        let (file, line) = Self::locate(&raw);
        Self {
            raw,
            file,
            line,
            category,
        }
    }

    /// Best-effort `path.swift:line[:col]` extraction.
    pub fn locate(raw: &str) -> (Option<String>, Option<u32>) {
        match location_regex().captures(raw) {
            Some(caps) => (
                caps.name("path").map(|m| m.as_str().to_string()),
                caps.name("line").and_then(|m| m.as_str().parse().ok()),
            ),
            None => (None, None),
        }
    }

    /// Basename of the referenced file.
    pub fn basename(&self) -> Option<&str> {
        self.file.as_deref().map(crate::file_set::basename_of)
    }
}

/// Recovery strategy that produced a [`RecoveryAttempt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Deterministic regex fixers
    Pattern,
    /// LLM-assisted rewrite
    Model,
    /// Minimal placeholder app
    Fallback,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Model => "model",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy execution within a recovery round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub round: u32,
    pub issue_signature: String,
    pub strategy: Strategy,
    pub success: bool,
    pub files_changed: usize,
    pub recorded_at: DateTime<Utc>,
}

impl RecoveryAttempt {
    pub fn new(
        round: u32,
        issue_signature: impl Into<String>,
        strategy: Strategy,
        success: bool,
        files_changed: usize,
    ) -> Self {
        Self {
            round,
            issue_signature: issue_signature.into(),
            strategy,
            success,
            files_changed,
            recorded_at: Utc::now(),
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.as_str()
    }
}
