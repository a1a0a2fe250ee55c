//! MissingImport fixer.
//!
//! | Pre-condition                                                  | Post-condition                    |
//! |----------------------------------------------------------------|-----------------------------------|
//! | SwiftUI keywords (`: View`, `VStack {`, `@State` …), no import | `import SwiftUI` added            |
//! | `@Published` / `ObservableObject`, no `import Combine`         | `import Combine` added            |
//! | `UUID` / `Date` / `URL`, neither Foundation nor SwiftUI        | `import Foundation` added         |
//! | every required import already present                         | unchanged (`None`)                |
//!
//! New imports go directly after the existing import block, keeping its
//! order; with no block they go at the top of the file.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::RecoveryResult;

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:@testable\s+|@_exported\s+)?import\s+(?:struct\s+|class\s+)?([A-Za-z_][A-Za-z0-9_]*)")
            .expect("import regex is valid")
    })
}

fn swiftui_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:some\s+View\b|:\s*View\b|:\s*App\b|\b(?:VStack|HStack|ZStack|LazyVStack|LazyHStack|NavigationStack|NavigationView|WindowGroup|ScrollView|List|Form|Section)\s*[\({]|\b(?:Text|Button|Image|Label|TextField|Toggle|Spacer|Color)\s*\(|@(?:State|Binding|StateObject|ObservedObject|EnvironmentObject|Environment)\b)",
        )
        .expect("swiftui keyword regex is valid")
    })
}

fn combine_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"@Published\b|\bObservableObject\b|\bAnyCancellable\b|\b(?:Passthrough|CurrentValue)Subject\b")
            .expect("combine keyword regex is valid")
    })
}

fn foundation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:UUID|Date|URL|JSONEncoder|JSONDecoder|DateFormatter|UserDefaults)\b")
            .expect("foundation keyword regex is valid")
    })
}

/// Modules imported by `content`, in order.
pub fn existing_imports(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| import_regex().captures(line))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Modules `content` needs but does not import.
pub fn missing_imports(content: &str) -> Vec<&'static str> {
    let existing = existing_imports(content);
    let has = |module: &str| existing.iter().any(|m| m == module);

    let needs_swiftui = swiftui_regex().is_match(content);
    let mut missing = Vec::new();

    if needs_swiftui && !has("SwiftUI") {
        missing.push("SwiftUI");
    }
    if combine_regex().is_match(content) && !has("Combine") {
        missing.push("Combine");
    }
    let covered_by_swiftui = needs_swiftui || has("SwiftUI");
    if foundation_regex().is_match(content) && !has("Foundation") && !covered_by_swiftui {
        missing.push("Foundation");
    }
    missing
}

pub fn fix(content: &str, _errors: &[String]) -> RecoveryResult<Option<String>> {
    let missing = missing_imports(content);
    if missing.is_empty() {
        return Ok(None);
    }

    let lines: Vec<&str> = content.split('\n').collect();
    let insert_at = lines
        .iter()
        .rposition(|line| import_regex().is_match(line))
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut out: Vec<String> = lines[..insert_at].iter().map(|l| l.to_string()).collect();
    out.extend(missing.iter().map(|m| format!("import {}", m)));
    if insert_at == 0 && lines.first().map_or(false, |l| !l.trim().is_empty()) {
        out.push(String::new());
    }
    out.extend(lines[insert_at..].iter().map(|l| l.to_string()));

    Ok(Some(out.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_after_existing_block() {
        let content = "import Foundation\nimport os\n\nstruct V: View {\n    @State var on = false\n}\n";
        let fixed = fix(content, &[]).unwrap().unwrap();
        assert!(fixed.starts_with("import Foundation\nimport os\nimport SwiftUI\n\nstruct V"));
    }

    #[test]
    fn test_adds_at_top_without_block() {
        let content = "final class Store: ObservableObject {\n    @Published var ids: [UUID] = []\n}\n";
        let fixed = fix(content, &[]).unwrap().unwrap();
        assert!(fixed.starts_with("import Combine\nimport Foundation\n\nfinal class Store"));
    }

    #[test]
    fn test_swiftui_covers_foundation() {
        let content = "import SwiftUI\n\nstruct Row: View {\n    let date: Date\n    var body: some View { Text(\"x\") }\n}\n";
        assert!(missing_imports(content).is_empty());
        assert!(fix(content, &[]).unwrap().is_none());
    }

    #[test]
    fn test_idempotent() {
        let content = "struct Item: Identifiable {\n    let id = UUID()\n}\n";
        let once = fix(content, &[]).unwrap().unwrap();
        assert!(once.starts_with("import Foundation\n"));
        assert!(fix(&once, &[]).unwrap().is_none());
    }
}
