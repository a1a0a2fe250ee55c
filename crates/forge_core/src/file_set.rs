//! In-memory Swift sources for one project.
//!
//! The build system flattens source directories, so two files may never
//! share a basename even when they live in different folders. A `FileSet`
//! enforces that on insertion; [`FileSet::check_invariants`] re-checks it
//! (together with the no-emptied-file and no-dropped-file rules) after
//! every recovery pass.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Minimum number of non-whitespace characters a file must keep.
pub const MIN_MEANINGFUL_CHARS: usize = 10;

/// Marker identifying the app entry-point file.
pub const ENTRY_POINT_MARKER: &str = "@main";

/// A single project-relative source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the project root
    pub path: String,
    /// Full file content
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// File name without any directory component.
    pub fn basename(&self) -> &str {
        basename_of(&self.path)
    }

    /// Number of non-whitespace characters.
    pub fn meaningful_len(&self) -> usize {
        meaningful_len(&self.content)
    }

    /// Whether the content is substantial enough to keep.
    pub fn is_meaningful(&self) -> bool {
        self.meaningful_len() >= MIN_MEANINGFUL_CHARS
    }

    /// Whether this file declares the app entry point.
    pub fn is_entry_point(&self) -> bool {
        self.content.contains(ENTRY_POINT_MARKER)
    }
}

/// Basename of a `/`- or `\`-separated path.
pub fn basename_of(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(path)
}

/// Count of non-whitespace characters in `content`.
pub fn meaningful_len(content: &str) -> usize {
    content.chars().filter(|c| !c.is_whitespace()).count()
}

/// A violated file-set invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "file")]
pub enum InvariantViolation {
    /// Two files share a basename
    DuplicateBasename(String),
    /// A file has fewer than [`MIN_MEANINGFUL_CHARS`] meaningful characters
    EmptyContent(String),
    /// A file present at the start of the round is gone
    MissingFile(String),
    /// The original entry-point file is gone or lost its marker
    MissingEntryPoint(String),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateBasename(name) => write!(f, "duplicate basename {}", name),
            Self::EmptyContent(path) => write!(f, "empty content in {}", path),
            Self::MissingFile(name) => write!(f, "file {} was dropped", name),
            Self::MissingEntryPoint(name) => write!(f, "entry point {} is missing", name),
        }
    }
}

/// Snapshot of a file set taken before a recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSetBaseline {
    pub basenames: BTreeSet<String>,
    pub entry_point: Option<String>,
}

/// Ordered collection of source files with unique basenames.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a file set, rejecting duplicate basenames.
    pub fn from_files(files: impl IntoIterator<Item = SourceFile>) -> CoreResult<Self> {
        let mut set = Self::new();
        for file in files {
            set.insert(file)?;
        }
        Ok(set)
    }

    /// Add a new file. Fails if another file already uses the basename.
    pub fn insert(&mut self, file: SourceFile) -> CoreResult<()> {
        if self.find_by_basename(file.basename()).is_some() {
            return Err(CoreError::DuplicateBasename(file.basename().to_string()));
        }
        self.files.push(file);
        Ok(())
    }

    /// Replace the content of the file sharing `file`'s basename, or append
    /// it. The existing path wins so directories never fork. Returns true if
    /// anything changed.
    pub fn upsert(&mut self, file: SourceFile) -> bool {
        let basename = file.basename().to_string();
        match self.files.iter_mut().find(|f| f.basename() == basename) {
            Some(existing) if existing.content == file.content => false,
            Some(existing) => {
                existing.content = file.content;
                true
            }
            None => {
                self.files.push(file);
                true
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn find_by_basename(&self, basename: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.basename() == basename)
    }

    /// Overwrite the content at `path`. Returns true if the content changed.
    pub fn set_content(&mut self, path: &str, content: impl Into<String>) -> bool {
        let content = content.into();
        match self.files.iter_mut().find(|f| f.path == path) {
            Some(file) if file.content != content => {
                file.content = content;
                true
            }
            _ => false,
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn basenames(&self) -> BTreeSet<String> {
        self.files.iter().map(|f| f.basename().to_string()).collect()
    }

    /// The first file carrying the entry-point marker.
    pub fn entry_point(&self) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.is_entry_point())
    }

    /// Capture what must survive the next recovery pass.
    pub fn baseline(&self) -> FileSetBaseline {
        FileSetBaseline {
            basenames: self.basenames(),
            entry_point: self.entry_point().map(|f| f.basename().to_string()),
        }
    }

    /// Paths whose content differs from `previous` (including new files).
    pub fn changed_paths(&self, previous: &FileSet) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| previous.get(&f.path).map(|p| p.content != f.content).unwrap_or(true))
            .map(|f| f.path.clone())
            .collect()
    }

    /// Check the invariants every recovery pass must preserve. `previous`
    /// is the set the pass started from: only files the pass wrote or added
    /// are held to the minimum-content rule.
    pub fn check_invariants(
        &self,
        previous: &FileSet,
        baseline: &FileSetBaseline,
    ) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();

        for file in &self.files {
            if !seen.insert(file.basename()) {
                violations.push(InvariantViolation::DuplicateBasename(
                    file.basename().to_string(),
                ));
            }
            let touched = previous
                .get(&file.path)
                .map(|p| p.content != file.content)
                .unwrap_or(true);
            if touched && !file.is_meaningful() {
                violations.push(InvariantViolation::EmptyContent(file.path.clone()));
            }
        }

        for name in &baseline.basenames {
            if !seen.contains(name.as_str()) {
                violations.push(InvariantViolation::MissingFile(name.clone()));
            }
        }

        if let Some(entry) = &baseline.entry_point {
            let present = self
                .find_by_basename(entry)
                .map(|f| f.is_entry_point())
                .unwrap_or(false);
            if !present {
                violations.push(InvariantViolation::MissingEntryPoint(entry.clone()));
            }
        }

        violations
    }

    pub fn into_files(self) -> Vec<SourceFile> {
        self.files
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_file() -> SourceFile {
        SourceFile::new(
            "TodoApp/TodoApp.swift",
            "import SwiftUI\n\n@main\nstruct TodoApp: App {\n    var body: some Scene { WindowGroup { ContentView() } }\n}\n",
        )
    }

    fn content_view() -> SourceFile {
        SourceFile::new(
            "TodoApp/Views/ContentView.swift",
            "import SwiftUI\n\nstruct ContentView: View {\n    var body: some View { Text(\"Hi\") }\n}\n",
        )
    }

    #[test]
    fn test_basename_uniqueness_across_directories() {
        let mut set = FileSet::from_files(vec![app_file(), content_view()]).unwrap();
        let dup = SourceFile::new("Other/ContentView.swift", "struct ContentView {}");

        let err = set.insert(dup).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateBasename(name) if name == "ContentView.swift"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_upsert_keeps_existing_path() {
        let mut set = FileSet::from_files(vec![content_view()]).unwrap();
        let changed = set.upsert(SourceFile::new(
            "ContentView.swift",
            "import SwiftUI\nstruct ContentView: View { var body: some View { EmptyView() } }",
        ));

        assert!(changed);
        assert_eq!(set.len(), 1);
        assert_eq!(set.files()[0].path, "TodoApp/Views/ContentView.swift");
        assert!(set.files()[0].content.contains("EmptyView"));
    }

    #[test]
    fn test_upsert_identical_content_is_noop() {
        let mut set = FileSet::from_files(vec![content_view()]).unwrap();
        assert!(!set.upsert(content_view()));
    }

    #[test]
    fn test_entry_point_detection() {
        let set = FileSet::from_files(vec![content_view(), app_file()]).unwrap();
        assert_eq!(set.entry_point().unwrap().basename(), "TodoApp.swift");
        assert_eq!(set.baseline().entry_point.as_deref(), Some("TodoApp.swift"));
    }

    #[test]
    fn test_invariants_hold_for_untouched_set() {
        let set = FileSet::from_files(vec![app_file(), content_view()]).unwrap();
        let baseline = set.baseline();
        assert!(set.check_invariants(&set, &baseline).is_empty());
    }

    #[test]
    fn test_invariants_detect_empty_and_missing() {
        let original = FileSet::from_files(vec![app_file(), content_view()]).unwrap();
        let baseline = original.baseline();

        let mut emptied = original.clone();
        emptied.set_content("TodoApp/Views/ContentView.swift", "  \n ");
        assert_eq!(
            emptied.check_invariants(&original, &baseline),
            vec![InvariantViolation::EmptyContent(
                "TodoApp/Views/ContentView.swift".to_string()
            )]
        );

        let dropped = FileSet::from_files(vec![content_view()]).unwrap();
        let violations = dropped.check_invariants(&original, &baseline);
        assert!(violations.contains(&InvariantViolation::MissingFile("TodoApp.swift".to_string())));
        assert!(violations
            .contains(&InvariantViolation::MissingEntryPoint("TodoApp.swift".to_string())));
    }

    #[test]
    fn test_invariants_ignore_small_untouched_files() {
        let exports = SourceFile::new("TodoApp/Exports.swift", "import os\n");
        let before = FileSet::from_files(vec![app_file(), content_view(), exports]).unwrap();
        let baseline = before.baseline();

        let mut after = before.clone();
        after.set_content(
            "TodoApp/Views/ContentView.swift",
            "import SwiftUI\n\nstruct ContentView: View {\n    var body: some View { Text(\"Hello\") }\n}\n",
        );
        assert!(after.check_invariants(&before, &baseline).is_empty());

        after.set_content("TodoApp/Exports.swift", "import\n");
        assert_eq!(
            after.check_invariants(&before, &baseline),
            vec![InvariantViolation::EmptyContent("TodoApp/Exports.swift".to_string())]
        );
    }

    #[test]
    fn test_changed_paths_includes_new_files() {
        let before = FileSet::from_files(vec![app_file()]).unwrap();
        let mut after = before.clone();
        after.insert(content_view()).unwrap();

        assert_eq!(after.changed_paths(&before), vec!["TodoApp/Views/ContentView.swift"]);
    }

    #[test]
    fn test_meaningful_len_ignores_whitespace() {
        assert_eq!(meaningful_len(" a b\n\tc "), 3);
        assert!(!SourceFile::new("A.swift", "import\n").is_meaningful());
    }
}
