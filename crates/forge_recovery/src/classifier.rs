//! Error classification.
//!
//! Each raw error is tested against an ordered list of matchers and lands
//! in the first category that matches. Order matters: an unresolved
//! `Codable` conformance also says "cannot find", and a broken string
//! literal usually also reports "expected".

use std::collections::BTreeMap;
use std::sync::OnceLock;

use forge_core::{BuildError, ErrorCategory};
use regex::Regex;

/// Type names that collide with Swift standard library or concurrency types.
pub const RESERVED_TYPE_NAMES: [&str; 6] = ["Task", "State", "Action", "Result", "Error", "Never"];

const SERIALIZATION_PROTOCOLS: [&str; 3] = ["Codable", "Decodable", "Encodable"];

fn stray_escape_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)invalid escape sequence|unexpected '\\'|unexpected backslash|\\"\s*\)"#)
            .expect("stray escape regex is valid")
    })
}

fn unresolved_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"cannot find (?:type )?'([A-Za-z_][A-Za-z0-9_]*)'")
            .expect("unresolved identifier regex is valid")
    })
}

/// Identifier named by a "cannot find 'X'" / "cannot find type 'X'" error.
pub fn unresolved_identifier(raw: &str) -> Option<&str> {
    unresolved_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Category of a single raw error line.
pub fn classify_one(raw: &str) -> ErrorCategory {
    let lower = raw.to_lowercase();

    if lower.contains("unterminated string literal") || stray_escape_regex().is_match(raw) {
        return ErrorCategory::StringLiteral;
    }

    if lower.contains("conform to") && SERIALIZATION_PROTOCOLS.iter().any(|p| raw.contains(p)) {
        return ErrorCategory::ProtocolConformance;
    }

    if lower.contains("cannot find") && (lower.contains("type") || lower.contains("in scope")) {
        return match unresolved_identifier(raw) {
            Some(name) if RESERVED_TYPE_NAMES.contains(&name) => ErrorCategory::ReservedType,
            _ => ErrorCategory::MissingImport,
        };
    }

    if lower.contains("expected") || lower.contains("syntax") {
        return ErrorCategory::Syntax;
    }

    ErrorCategory::Other
}

/// Group errors by category. Categories without errors are absent.
pub fn classify<S: AsRef<str>>(errors: &[S]) -> BTreeMap<ErrorCategory, Vec<String>> {
    let mut groups: BTreeMap<ErrorCategory, Vec<String>> = BTreeMap::new();
    for error in errors {
        let raw = error.as_ref();
        groups
            .entry(classify_one(raw))
            .or_default()
            .push(raw.to_string());
    }
    groups
}

/// Parse raw lines into located, categorized [`BuildError`]s.
pub fn parse_errors<S: AsRef<str>>(errors: &[S]) -> Vec<BuildError> {
    errors
        .iter()
        .map(|e| BuildError::new(e.as_ref(), classify_one(e.as_ref())))
        .collect()
}

/// Categories present in `classification` that have a pattern fixer, in
/// the order the fixers must run.
pub fn fixable_categories(classification: &BTreeMap<ErrorCategory, Vec<String>>) -> Vec<ErrorCategory> {
    ErrorCategory::PATTERN_ORDER
        .iter()
        .copied()
        .filter(|c| classification.contains_key(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_literal() {
        assert_eq!(
            classify_one("ContentView.swift:12:19: error: unterminated string literal"),
            ErrorCategory::StringLiteral
        );
        assert_eq!(
            classify_one("Views.swift:4:10: error: invalid escape sequence in literal"),
            ErrorCategory::StringLiteral
        );
    }

    #[test]
    fn test_conformance_before_cannot_find() {
        assert_eq!(
            classify_one("Store.swift:8:5: error: type 'Note' does not conform to protocol 'Codable'"),
            ErrorCategory::ProtocolConformance
        );
        assert_eq!(
            classify_one("Store.swift:9:5: error: instance method 'encode' requires that 'Note' conform to 'Encodable'"),
            ErrorCategory::ProtocolConformance
        );
    }

    #[test]
    fn test_reserved_vs_missing_import() {
        assert_eq!(
            classify_one("List.swift:3:20: error: cannot find type 'Task' in scope"),
            ErrorCategory::ReservedType
        );
        assert_eq!(
            classify_one("Model.swift:5:14: error: cannot find type 'UUID' in scope"),
            ErrorCategory::MissingImport
        );
        assert_eq!(
            classify_one("Model.swift:7:9: error: cannot find 'Published' in scope"),
            ErrorCategory::MissingImport
        );
    }

    #[test]
    fn test_syntax_and_other() {
        assert_eq!(
            classify_one("App.swift:20:1: error: expected '}' in struct"),
            ErrorCategory::Syntax
        );
        assert_eq!(classify_one("Syntax Error somewhere"), ErrorCategory::Syntax);
        assert_eq!(
            classify_one("build timed out after 300 seconds"),
            ErrorCategory::Other
        );
    }

    #[test]
    fn test_classify_groups_and_omits_empty() {
        let errors = vec![
            "A.swift:1:1: error: unterminated string literal",
            "B.swift:2:1: error: expected '}' in struct",
            "C.swift:3:1: error: unterminated string literal",
        ];
        let groups = classify(&errors);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&ErrorCategory::StringLiteral].len(), 2);
        assert_eq!(groups[&ErrorCategory::Syntax].len(), 1);
        assert!(!groups.contains_key(&ErrorCategory::Other));
    }

    #[test]
    fn test_fixable_categories_follow_pattern_order() {
        let errors = vec![
            "A.swift:1:1: error: expected expression",
            "B.swift:1:1: error: cannot find type 'State' in scope",
            "C.swift:1:1: error: unterminated string literal",
            "linker command failed",
        ];
        let categories = fixable_categories(&classify(&errors));
        assert_eq!(
            categories,
            vec![
                ErrorCategory::StringLiteral,
                ErrorCategory::ReservedType,
                ErrorCategory::Syntax,
            ]
        );
    }

    #[test]
    fn test_parse_errors_locates() {
        let parsed = parse_errors(&["/tmp/Todo/Item.swift:14:3: error: expected ')'"]);
        assert_eq!(parsed[0].category, ErrorCategory::Syntax);
        assert_eq!(parsed[0].line, Some(14));
        assert_eq!(parsed[0].basename(), Some("Item.swift"));
    }
}
