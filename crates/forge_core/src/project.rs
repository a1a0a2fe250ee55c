//! On-disk project directory handling.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::{CoreError, CoreResult};
use crate::file_set::{FileSet, SourceFile};

/// Directory (relative to the project root) holding SwiftForge state.
pub const STATE_DIR: &str = ".swiftforge";

/// Directories never scanned for sources.
const SKIPPED_DIRS: &[&str] = &["build", "DerivedData", "Pods", STATE_DIR];

/// A generated project on disk.
#[derive(Debug, Clone)]
pub struct ProjectDir {
    root: PathBuf,
}

impl ProjectDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR)
    }

    pub fn build_log_path(&self) -> PathBuf {
        self.state_dir().join("build.log")
    }

    /// Collect every `.swift` file under the root.
    pub fn load_sources(&self) -> CoreResult<FileSet> {
        if !self.root.is_dir() {
            return Err(CoreError::ProjectNotFound(self.root.display().to_string()));
        }

        let mut files = FileSet::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

        for entry in walker {
            let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("swift") {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| CoreError::InvalidPath(entry.path().display().to_string()))?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let content = fs::read_to_string(entry.path())?;
            files.insert(SourceFile::new(path, content))?;
        }

        debug!("Loaded {} source file(s) from {:?}", files.len(), self.root);
        Ok(files)
    }

    /// Write every file whose on-disk content differs. Returns the number of
    /// files written.
    pub fn write_files(&self, files: &FileSet) -> CoreResult<usize> {
        let mut written = 0;
        for file in files {
            let target = self.resolve(&file.path)?;
            if let Ok(existing) = fs::read_to_string(&target) {
                if existing == file.content {
                    continue;
                }
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &file.content)?;
            written += 1;
        }

        if written > 0 {
            info!("Wrote {} file(s) to {:?}", written, self.root);
        }
        Ok(written)
    }

    /// Append one round's raw compiler output to the build log.
    pub fn append_build_log(&self, round: u32, stdout: &str, stderr: &str) -> CoreResult<()> {
        let path = self.build_log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut log = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(
            log,
            "===== round {} @ {} =====",
            round,
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ")
        )?;
        writeln!(log, "--- stdout ---\n{}", stdout.trim_end())?;
        writeln!(log, "--- stderr ---\n{}", stderr.trim_end())?;
        Ok(())
    }

    /// Map a project-relative path to an absolute one, refusing anything that
    /// would escape the root.
    fn resolve(&self, relative: &str) -> CoreResult<PathBuf> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(CoreError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(path))
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir()
        && (name.starts_with('.')
            || name.ends_with(".xcodeproj")
            || SKIPPED_DIRS.contains(&&*name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let project = ProjectDir::new(temp.path());

        let files = FileSet::from_files(vec![
            SourceFile::new("Notes/NotesApp.swift", "import SwiftUI\n@main struct NotesApp: App {}\n"),
            SourceFile::new("Notes/Views/ContentView.swift", "import SwiftUI\nstruct ContentView {}\n"),
        ])
        .unwrap();

        assert_eq!(project.write_files(&files).unwrap(), 2);
        let loaded = project.load_sources().unwrap();

        assert_eq!(loaded.len(), 2);
        assert!(loaded.get("Notes/Views/ContentView.swift").is_some());
        assert!(loaded.entry_point().is_some());
    }

    #[test]
    fn test_write_skips_unchanged_files() {
        let temp = TempDir::new().unwrap();
        let project = ProjectDir::new(temp.path());
        let files = FileSet::from_files(vec![SourceFile::new(
            "App.swift",
            "import SwiftUI\n@main struct App {}\n",
        )])
        .unwrap();

        assert_eq!(project.write_files(&files).unwrap(), 1);
        assert_eq!(project.write_files(&files).unwrap(), 0);
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let temp = TempDir::new().unwrap();
        let project = ProjectDir::new(temp.path());
        let files =
            FileSet::from_files(vec![SourceFile::new("../evil.swift", "import Foundation\n")])
                .unwrap();

        assert!(matches!(
            project.write_files(&files),
            Err(CoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_load_skips_build_and_hidden_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("build")).unwrap();
        fs::create_dir_all(temp.path().join(".swiftforge")).unwrap();
        fs::write(temp.path().join("build/Generated.swift"), "let x = 1").unwrap();
        fs::write(temp.path().join(".swiftforge/Cache.swift"), "let y = 2").unwrap();
        fs::write(temp.path().join("Main.swift"), "import SwiftUI\n").unwrap();
        fs::write(temp.path().join("README.md"), "# readme").unwrap();

        let loaded = ProjectDir::new(temp.path()).load_sources().unwrap();
        assert_eq!(loaded.paths(), vec!["Main.swift".to_string()]);
    }

    #[test]
    fn test_build_log_appends_rounds() {
        let temp = TempDir::new().unwrap();
        let project = ProjectDir::new(temp.path());

        project.append_build_log(1, "Build started", "error: one").unwrap();
        project.append_build_log(2, "Build started", "error: two").unwrap();

        let log = fs::read_to_string(project.build_log_path()).unwrap();
        assert!(log.contains("===== round 1"));
        assert!(log.contains("===== round 2"));
        assert!(log.contains("error: two"));
    }

    #[test]
    fn test_missing_project_dir() {
        let project = ProjectDir::new("/definitely/not/here");
        assert!(matches!(
            project.load_sources(),
            Err(CoreError::ProjectNotFound(_))
        ));
    }
}
