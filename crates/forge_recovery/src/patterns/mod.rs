//! Deterministic, regex-driven fixers and the engine that runs them.
//!
//! Every fixer is a pure function `fn(content, errors) -> Option<new>`
//! over a single file; the engine applies them across the file set in
//! [`ErrorCategory::PATTERN_ORDER`], isolates per-file failures, rejects
//! results that would empty a file, and finishes with a global brace
//! balance pass.

pub mod braces;
pub mod conformance;
pub mod imports;
pub mod reserved_type;
pub mod scan;
pub mod string_literal;

use std::collections::BTreeMap;

use forge_core::file_set::meaningful_len;
use forge_core::{ErrorCategory, FileSet, SourceFile, MIN_MEANINGFUL_CHARS};
use tracing::{debug, warn};

use crate::error::{RecoveryError, RecoveryResult};

/// A single-file fixer.
pub type FixerFn = fn(&str, &[String]) -> RecoveryResult<Option<String>>;

/// Fixer for `category`, if it has one.
pub fn fixer_for(category: ErrorCategory) -> Option<FixerFn> {
    match category {
        ErrorCategory::StringLiteral => Some(string_literal::fix),
        ErrorCategory::MissingImport => Some(imports::fix),
        ErrorCategory::ProtocolConformance => Some(conformance::fix),
        ErrorCategory::ReservedType => Some(reserved_type::fix),
        ErrorCategory::Syntax => Some(braces::fix),
        ErrorCategory::Other => None,
    }
}

/// Result of one pattern pass.
#[derive(Debug)]
pub struct PatternOutcome {
    pub changed: bool,
    pub files: FileSet,
    /// Categories whose fixer changed at least one file
    pub applied: Vec<ErrorCategory>,
    /// Paths whose content changed
    pub changed_paths: Vec<String>,
    /// Per-file fixer failures that were skipped
    pub failures: Vec<RecoveryError>,
}

/// Stateless driver for the pattern fixers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternRecoveryEngine;

impl PatternRecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run one category's fixer over every file.
    pub fn apply(
        &self,
        category: ErrorCategory,
        files: &FileSet,
        errors: &[String],
    ) -> (bool, FileSet) {
        self.apply_collecting(category, files, errors, &mut Vec::new())
    }

    fn apply_collecting(
        &self,
        category: ErrorCategory,
        files: &FileSet,
        errors: &[String],
        failures: &mut Vec<RecoveryError>,
    ) -> (bool, FileSet) {
        let Some(fixer) = fixer_for(category) else {
            return (false, files.clone());
        };

        let mut next = files.clone();
        let mut changed = false;
        for file in files {
            match run_fixer(fixer, category, file, errors) {
                Ok(Some(content)) => {
                    debug!(category = %category, path = %file.path, "Pattern fix applied");
                    next.set_content(&file.path, content);
                    changed = true;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(category = %category, path = %file.path, "Fixer skipped file: {}", e);
                    failures.push(e);
                }
            }
        }
        (changed, next)
    }

    /// Run every applicable fixer once, in priority order, then balance
    /// braces globally.
    pub fn run(
        &self,
        classification: &BTreeMap<ErrorCategory, Vec<String>>,
        files: &FileSet,
    ) -> PatternOutcome {
        let mut current = files.clone();
        let mut applied = Vec::new();
        let mut failures = Vec::new();

        for category in ErrorCategory::PATTERN_ORDER {
            let Some(errors) = classification.get(&category) else {
                continue;
            };
            let (changed, next) = self.apply_collecting(category, &current, errors, &mut failures);
            if changed {
                applied.push(category);
                current = next;
            }
        }

        let (balanced, next) =
            self.apply_collecting(ErrorCategory::Syntax, &current, &[], &mut failures);
        if balanced {
            if !applied.contains(&ErrorCategory::Syntax) {
                applied.push(ErrorCategory::Syntax);
            }
            current = next;
        }

        let changed_paths = current.changed_paths(files);
        PatternOutcome {
            changed: !changed_paths.is_empty(),
            files: current,
            applied,
            changed_paths,
            failures,
        }
    }
}

/// Run `fixer` on one file, rejecting output that would leave it empty.
fn run_fixer(
    fixer: FixerFn,
    category: ErrorCategory,
    file: &SourceFile,
    errors: &[String],
) -> RecoveryResult<Option<String>> {
    let fixed = fixer(&file.content, errors).map_err(|e| RecoveryError::Fixer {
        category,
        path: file.path.clone(),
        message: e.to_string(),
    })?;

    match fixed {
        Some(content) if content == file.content => Ok(None),
        Some(content) if meaningful_len(&content) < MIN_MEANINGFUL_CHARS => {
            Err(RecoveryError::Fixer {
                category,
                path: file.path.clone(),
                message: "fix would leave the file empty".to_string(),
            })
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    fn set(files: &[(&str, &str)]) -> FileSet {
        FileSet::from_files(files.iter().map(|(p, c)| SourceFile::new(*p, *c))).unwrap()
    }

    #[test]
    fn test_string_and_brace_fixed_in_one_pass() {
        let files = set(&[(
            "App/ContentView.swift",
            "import SwiftUI\n\nstruct ContentView: View {\n    var body: some View {\n        Text(\"Hello)\n    }\n",
        )]);
        let errors = vec![
            "App/ContentView.swift:5:14: error: unterminated string literal".to_string(),
            "App/ContentView.swift:7:1: error: expected '}' in struct".to_string(),
        ];

        let outcome = PatternRecoveryEngine::new().run(&classify(&errors), &files);

        assert!(outcome.changed);
        let content = &outcome.files.get("App/ContentView.swift").unwrap().content;
        assert!(content.contains("Text(\"Hello\")"));
        assert_eq!(scan::brace_deficit(content), 0);
        assert_eq!(outcome.applied[0], ErrorCategory::StringLiteral);
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_only_present_categories_run() {
        // Needs an import, but no MissingImport error was reported
        let files = set(&[("Model.swift", "struct Item {\n    let id = UUID()\n}\n")]);
        let errors = vec!["Model.swift:1:1: error: expected declaration".to_string()];

        let outcome = PatternRecoveryEngine::new().run(&classify(&errors), &files);
        assert!(!outcome.changed);
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_brace_pass_runs_for_other_errors() {
        let files = set(&[("App.swift", "@main\nstruct App {\n")]);
        let errors = vec!["build timed out after 300 seconds".to_string()];

        let outcome = PatternRecoveryEngine::new().run(&classify(&errors), &files);
        // The global brace pass runs whatever the categories
        assert!(outcome.changed);
        assert_eq!(outcome.applied, vec![ErrorCategory::Syntax]);
    }

    #[test]
    fn test_apply_single_category_idempotent() {
        let files = set(&[
            ("A.swift", "struct Task { let id: Int }\nlet all: [Task] = []\n"),
            ("B.swift", "import Foundation\nlet x = 1 // plain\n"),
        ]);
        let engine = PatternRecoveryEngine::new();

        let (changed, once) = engine.apply(ErrorCategory::ReservedType, &files, &[]);
        assert!(changed);
        assert_eq!(once.changed_paths(&files), vec!["A.swift".to_string()]);

        let (changed_again, twice) = engine.apply(ErrorCategory::ReservedType, &once, &[]);
        assert!(!changed_again);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_empty_result_rejected_per_file() {
        fn wipe(_: &str, _: &[String]) -> RecoveryResult<Option<String>> {
            Ok(Some("  ".to_string()))
        }
        let file = SourceFile::new("A.swift", "struct A { let a = 1 }");
        let result = run_fixer(wipe, ErrorCategory::Syntax, &file, &[]);
        assert!(matches!(result, Err(RecoveryError::Fixer { .. })));
    }

    #[test]
    fn test_fixer_error_isolated_to_file() {
        fn flaky(content: &str, _: &[String]) -> RecoveryResult<Option<String>> {
            if content.contains("poison") {
                return Err(RecoveryError::Pattern(regex::Error::Syntax("bad".to_string())));
            }
            Ok(Some(format!("{}\n// fixed", content)))
        }
        let good = SourceFile::new("Good.swift", "struct Good { let a = 1 }");
        let bad = SourceFile::new("Bad.swift", "struct Bad { let poison = 1 }");

        assert!(run_fixer(flaky, ErrorCategory::Syntax, &bad, &[]).is_err());
        assert!(run_fixer(flaky, ErrorCategory::Syntax, &good, &[]).unwrap().is_some());
    }
}
