//! Minimal safe fallback.
//!
//! Rewrites the entry file as a bare `App` showing a placeholder
//! `ContentView`. Every other file is left as it is; the fallback only
//! adds or overwrites those two.

use std::sync::OnceLock;

use forge_core::file_set::basename_of;
use forge_core::{FileSet, FileSetBaseline, SourceFile};
use regex::Regex;
use tracing::{info, warn};

/// File name of the placeholder root view.
pub const CONTENT_VIEW_FILE: &str = "ContentView.swift";

/// Result of a fallback pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    /// Entry point and placeholder view regenerated
    Degraded(FileSet),
    /// Nothing left to try
    Exhausted(String),
}

fn app_struct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"struct\s+([A-Za-z_][A-Za-z0-9_]*)\s*:\s*(?:SwiftUI\.)?App\b")
            .expect("app struct regex is valid")
    })
}

/// Name of the `App` struct, or the entry file stem.
fn app_name(entry: &SourceFile) -> String {
    if let Some(caps) = app_struct_regex().captures(&entry.content) {
        return caps[1].to_string();
    }
    let stem = entry.basename().trim_end_matches(".swift");
    let name: String = stem.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        "GeneratedApp".to_string()
    } else {
        name
    }
}

pub fn entry_source(app_name: &str) -> String {
    format!(
        "import SwiftUI\n\n@main\nstruct {name}: App {{\n    var body: some Scene {{\n        WindowGroup {{\n            ContentView()\n        }}\n    }}\n}}\n",
        name = app_name
    )
}

pub fn content_view_source(app_name: &str) -> String {
    format!(
        "import SwiftUI\n\nstruct ContentView: View {{\n    var body: some View {{\n        VStack(spacing: 12) {{\n            Image(systemName: \"hammer\")\n                .font(.largeTitle)\n            Text(\"{name}\")\n                .font(.title)\n            Text(\"This app is being rebuilt.\")\n                .foregroundStyle(.secondary)\n        }}\n        .padding()\n    }}\n}}\n",
        name = app_name
    )
}

/// Directory part of `path`, including the trailing separator.
fn directory_of(path: &str) -> &str {
    let name = basename_of(path);
    &path[..path.len() - name.len()]
}

/// Regenerate the entry file and a placeholder `ContentView`.
///
/// The entry file is the one carrying `@main`, or failing that the
/// baseline's entry basename. With neither, the fallback is exhausted.
pub fn minimal_app(files: &FileSet, baseline: &FileSetBaseline) -> FallbackOutcome {
    let entry = files.entry_point().or_else(|| {
        baseline
            .entry_point
            .as_deref()
            .and_then(|name| files.find_by_basename(name))
    });

    let Some(entry) = entry else {
        warn!("No entry file to rebuild around");
        return FallbackOutcome::Exhausted("no @main entry file found".to_string());
    };

    let name = app_name(entry);
    let entry_path = entry.path.clone();
    let mut next = files.clone();
    let mut changed = next.set_content(&entry_path, entry_source(&name));

    let view = content_view_source(&name);
    if files.find_by_basename(CONTENT_VIEW_FILE).is_some() {
        changed |= next.upsert(SourceFile::new(CONTENT_VIEW_FILE, view));
    } else {
        let path = format!("{}{}", directory_of(&entry_path), CONTENT_VIEW_FILE);
        changed |= next.upsert(SourceFile::new(path, view));
    }

    if !changed {
        return FallbackOutcome::Exhausted("fallback app is already in place".to_string());
    }

    info!(entry = %entry_path, app = %name, "Rebuilt minimal app");
    FallbackOutcome::Degraded(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regenerates_entry_and_adds_content_view() {
        let files = FileSet::from_files(vec![
            SourceFile::new("Notes/NotesApp.swift", "import SwiftUI\n@main\nstruct NotesApp: App {\n    var body: some Scene { WindowGroup { RootView( } }\n"),
            SourceFile::new("Notes/Models/Note.swift", "struct Note { let title: String }"),
        ])
        .unwrap();
        let baseline = files.baseline();

        let FallbackOutcome::Degraded(next) = minimal_app(&files, &baseline) else {
            panic!("expected degraded outcome");
        };

        assert_eq!(next.get("Notes/NotesApp.swift").unwrap().content, entry_source("NotesApp"));
        assert!(next.get("Notes/ContentView.swift").unwrap().content.contains("Text(\"NotesApp\")"));
        assert_eq!(next.get("Notes/Models/Note.swift"), files.get("Notes/Models/Note.swift"));
        assert!(next.check_invariants(&files, &baseline).is_empty());
    }

    #[test]
    fn test_overwrites_existing_content_view_in_place() {
        let files = FileSet::from_files(vec![
            SourceFile::new("App/Main.swift", "@main\nstruct Shop: App { var body: some Scene { WindowGroup { ContentView() } } }"),
            SourceFile::new("App/Views/ContentView.swift", "struct ContentView: View { broken"),
        ])
        .unwrap();

        let FallbackOutcome::Degraded(next) = minimal_app(&files, &files.baseline()) else {
            panic!("expected degraded outcome");
        };
        assert_eq!(next.len(), 2);
        assert_eq!(next.get("App/Views/ContentView.swift").unwrap().content, content_view_source("Shop"));
    }

    #[test]
    fn test_uses_baseline_when_marker_lost() {
        let files = FileSet::from_files(vec![SourceFile::new(
            "Todo/TodoApp.swift",
            "import SwiftUI\nstruct TodoApp: App { var body: some Scene { WindowGroup { Text(\"x\") } } }",
        )])
        .unwrap();
        let baseline = FileSetBaseline {
            basenames: files.basenames(),
            entry_point: Some("TodoApp.swift".to_string()),
        };
        assert!(matches!(minimal_app(&files, &baseline), FallbackOutcome::Degraded(_)));
    }

    #[test]
    fn test_no_entry_is_exhausted() {
        let files = FileSet::from_files(vec![SourceFile::new("Models/Item.swift", "struct Item { let id: Int }")]).unwrap();
        assert!(matches!(minimal_app(&files, &files.baseline()), FallbackOutcome::Exhausted(_)));
    }

    #[test]
    fn test_second_fallback_is_exhausted() {
        let files = FileSet::from_files(vec![SourceFile::new("A/Demo.swift", "@main\nstruct Demo: App {}")]).unwrap();
        let FallbackOutcome::Degraded(once) = minimal_app(&files, &files.baseline()) else {
            panic!("expected degraded outcome");
        };
        assert!(matches!(minimal_app(&once, &files.baseline()), FallbackOutcome::Exhausted(_)));
    }
}
