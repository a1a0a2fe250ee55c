//! ReservedType fixer.
//!
//! | Pre-condition                                           | Post-condition                                         |
//! |---------------------------------------------------------|--------------------------------------------------------|
//! | file declares `struct/class/enum/protocol/typealias R`  | declaration renamed to the synonym of `R`              |
//! | for a reserved `R` (`Task`, `State`, …)                 | same-file type references renamed as well              |
//! | the synonym is already declared in the file             | unchanged for that name                                |
//! | no reserved declaration                                 | unchanged (`None`)                                     |
//!
//! A reference is renamed when it sits in a type position: after a
//! declaration keyword, `:`, `[`, `<`, `,`, `->`, `as`, `is`, `some`,
//! `any`, or directly before `(`, `?`, `!`, `]`, `>` or a member access.
//! Other files are left alone, so references from them still need a
//! rebuild round (or the model) to catch up.

use regex::Regex;

use crate::error::RecoveryResult;
use crate::patterns::scan::code_mask;

/// Reserved name → replacement.
pub const SYNONYMS: [(&str, &str); 6] = [
    ("Task", "TodoItem"),
    ("State", "AppState"),
    ("Action", "AppAction"),
    ("Result", "ResultItem"),
    ("Error", "AppError"),
    ("Never", "NeverItem"),
];

const DECL_KEYWORDS: [&str; 6] = ["struct", "class", "enum", "protocol", "typealias", "extension"];
const PRECEDING_KEYWORDS: [&str; 4] = ["as", "is", "some", "any"];

fn declares(content: &str, name: &str) -> RecoveryResult<bool> {
    let pattern = format!(
        r"(?m)^[ \t]*(?:(?:public|private|internal|fileprivate|final|open|indirect)[ \t]+)*(?:struct|class|enum|protocol|typealias|actor)[ \t]+{}\b",
        regex::escape(name)
    );
    Ok(Regex::new(&pattern)?.is_match(content))
}

/// Word immediately before byte `at`, skipping whitespace.
fn previous_word(content: &str, at: usize) -> &str {
    let before = content[..at].trim_end();
    let start = before
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '?' || c == '!'))
        .map(|i| i + 1)
        .unwrap_or(0);
    &before[start..]
}

fn in_type_position(content: &str, start: usize, end: usize) -> bool {
    // `@State(...)` and friends are attributes, not references
    if content[..start].ends_with('@') {
        return false;
    }
    let before = content[..start].trim_end();
    if before.ends_with("->") {
        return true;
    }
    if let Some(c) = before.chars().last() {
        if matches!(c, ':' | '[' | '<' | ',') {
            return true;
        }
    }
    let word = previous_word(content, start);
    let word = word.trim_end_matches(['?', '!']);
    if DECL_KEYWORDS.contains(&word) || PRECEDING_KEYWORDS.contains(&word) {
        return true;
    }

    matches!(
        content[end..].chars().next(),
        Some('(' | '?' | '!' | ']' | '>' | '.')
    )
}

fn rename(content: &str, from: &str, to: &str) -> RecoveryResult<String> {
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(from)))?;
    let mask = code_mask(content);

    let mut out = String::with_capacity(content.len() + 16);
    let mut last = 0;
    for m in re.find_iter(content) {
        let is_code = mask.get(m.start()).copied().unwrap_or(false);
        if is_code && in_type_position(content, m.start(), m.end()) {
            out.push_str(&content[last..m.start()]);
            out.push_str(to);
            last = m.end();
        }
    }
    out.push_str(&content[last..]);
    Ok(out)
}

pub fn fix(content: &str, _errors: &[String]) -> RecoveryResult<Option<String>> {
    let mut current = content.to_string();
    for (reserved, synonym) in SYNONYMS {
        if declares(&current, reserved)? && !declares(&current, synonym)? {
            current = rename(&current, reserved, synonym)?;
        }
    }
    Ok((current != content).then_some(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> Option<String> {
        fix(content, &[]).unwrap()
    }

    #[test]
    fn test_task_declaration_and_array_reference() {
        let content = "import Foundation\n\nstruct Task { let id: UUID }\n\nfinal class Store {\n    var items: [Task] = []\n}\n";
        let fixed = run(content).unwrap();
        assert!(fixed.contains("struct TodoItem { let id: UUID }"));
        assert!(fixed.contains("var items: [TodoItem] = []"));
        assert!(!fixed.contains("Task"));
    }

    #[test]
    fn test_reference_positions() {
        let content = r#"enum State { case idle }
func load(current: State?, all: [String: State]) -> State {
    let s = State.idle
    let t: Result<State, Never> = .success(.idle)
    print("State")
    return current ?? State(rawValue: 0)!
}
"#;
        let fixed = run(content).unwrap();
        assert!(fixed.contains("enum AppState { case idle }"));
        assert!(fixed.contains("func load(current: AppState?, all: [String: AppState]) -> AppState {"));
        assert!(fixed.contains("Result<AppState, Never>"));
        assert!(fixed.contains("let s = AppState.idle"));
        // Strings untouched
        assert!(fixed.contains("print(\"State\")"));
        assert!(fixed.contains("AppState(rawValue: 0)"));
    }

    #[test]
    fn test_property_wrapper_attribute_untouched() {
        let content = "import SwiftUI\n\nenum State { case idle }\n\nstruct CounterView: View {\n    @State(initialValue: 0) var count: Int\n    @State private var mode: State = .idle\n    var body: some View { Text(\"\\(count)\") }\n}\n";
        let fixed = run(content).unwrap();
        assert!(fixed.contains("enum AppState { case idle }"));
        assert!(fixed.contains("@State(initialValue: 0) var count: Int"));
        assert!(fixed.contains("@State private var mode: AppState = .idle"));
    }

    #[test]
    fn test_undeclared_reserved_untouched() {
        let content = "func run() {\n    Task { await load() }\n    let r: Result<Int, Error> = .success(1)\n}\n";
        assert!(run(content).is_none());
    }

    #[test]
    fn test_synonym_already_declared() {
        let content = "struct Task {}\nstruct TodoItem {}\n";
        assert!(run(content).is_none());
    }

    #[test]
    fn test_idempotent() {
        let once = run("class Action {}\nlet a: Action? = nil\n").unwrap();
        assert_eq!(once, "class AppAction {}\nlet a: AppAction? = nil\n");
        assert!(run(&once).is_none());
    }
}
