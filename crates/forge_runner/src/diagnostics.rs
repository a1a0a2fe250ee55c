//! xcodebuild output parsing.

use std::collections::HashSet;

/// Error and warning lines extracted from build output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Extract error and warning lines, de-duplicated in first-seen order.
///
/// xcodebuild prints most compiler diagnostics twice (once per
/// compile step, once in the summary), hence the de-duplication.
pub fn parse_diagnostics(output: &str) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let mut seen = HashSet::new();

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("**") {
            continue;
        }
        let lower = line.to_lowercase();
        let bucket = if lower.contains("error:") {
            &mut diagnostics.errors
        } else if lower.contains("warning:") {
            &mut diagnostics.warnings
        } else {
            continue;
        };
        if seen.insert(line.to_string()) {
            bucket.push(line.to_string());
        }
    }

    diagnostics
}
