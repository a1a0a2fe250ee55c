//! Model-assisted recovery.
//!
//! Builds a focused repair prompt, asks each configured provider in turn
//! (at most once per round) and merges the first usable reply onto the
//! file set. A reply that cannot be parsed, has no files, or changes
//! nothing counts as that provider failing; the original files are never
//! handed back as if they were a fix.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use forge_core::file_set::basename_of;
use forge_core::{BuildError, FileSet, SourceFile};
use forge_llm::{next_provider, CodeGenerator, FixRequest, FixResponse, LlmError, LlmProvider};
use tracing::{debug, info, warn};

use crate::error::{RecoveryError, RecoveryResult};

/// Default number of errors included in a prompt.
pub const DEFAULT_MAX_PROMPT_ERRORS: usize = 10;

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Do/don't rules sent with every repair request. They mirror what the
/// pattern fixers enforce so the model does not undo their work.
pub const REPAIR_RULES: &str = "\
- Fix only the reported errors; keep all existing functionality.
- Return the COMPLETE content of every file you change, never a diff or a placeholder.
- Keep every path exactly as given. Never rename, split, merge or delete files.
- Never introduce two files with the same file name.
- Keep the @main App struct in its current file.
- Do not name types Task, State, Action, Result, Error or Never; use TodoItem, AppState, AppAction, ResultItem, AppError, NeverItem.
- Add `import SwiftUI` to files using SwiftUI views and `import Foundation` where UUID, Date or URL are used.
- Close every string literal on the line it opens and balance every brace.
- Types that are encoded or decoded must declare Codable.";

/// Wraps one or more [`CodeGenerator`]s, tried in preference order.
pub struct ModelAssistedRecoveryEngine {
    generators: Vec<Arc<dyn CodeGenerator>>,
    call_timeout: Duration,
    max_prompt_errors: usize,
}

impl ModelAssistedRecoveryEngine {
    /// `generators` are in preference order; later duplicates of a
    /// provider are ignored.
    pub fn new(generators: Vec<Arc<dyn CodeGenerator>>) -> Self {
        let mut seen = BTreeSet::new();
        let generators = generators
            .into_iter()
            .filter(|g| seen.insert(g.provider().as_str()))
            .collect();
        Self {
            generators,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_prompt_errors: DEFAULT_MAX_PROMPT_ERRORS,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_max_prompt_errors(mut self, max: usize) -> Self {
        self.max_prompt_errors = max.max(1);
        self
    }

    /// Provider preference order.
    pub fn provider_order(&self) -> Vec<LlmProvider> {
        self.generators.iter().map(|g| g.provider()).collect()
    }

    fn generator_for(&self, provider: LlmProvider) -> Option<&Arc<dyn CodeGenerator>> {
        self.generators.iter().find(|g| g.provider() == provider)
    }

    /// Build the repair request for `errors` against `files`.
    pub fn build_request(&self, errors: &[String], files: &FileSet) -> FixRequest {
        let errors: Vec<String> = errors.iter().take(self.max_prompt_errors).cloned().collect();
        FixRequest {
            files: relevant_files(&errors, files),
            errors,
            instructions: REPAIR_RULES.to_string(),
        }
    }

    /// Ask the providers for a fix and merge the first usable one.
    pub async fn recover(&self, errors: &[String], files: &FileSet) -> RecoveryResult<FileSet> {
        let order = self.provider_order();
        if order.is_empty() {
            return Err(RecoveryError::RecoveryFailed("no code generator configured".to_string()));
        }

        let request = self.build_request(errors, files);
        let mut failed: Vec<LlmProvider> = Vec::new();
        let mut reasons: Vec<String> = Vec::new();
        let mut attempt = 0;

        while let Some(provider) = next_provider(&order, &failed, attempt) {
            attempt += 1;
            let Some(generator) = self.generator_for(provider) else {
                failed.push(provider);
                continue;
            };

            info!(
                provider = %provider,
                errors = request.errors.len(),
                files = request.files.len(),
                "Requesting model-assisted fix"
            );

            match self.call(generator.as_ref(), &request).await {
                Ok(response) => {
                    let (merged, changed) = merge_fix(files, &response);
                    if changed > 0 {
                        info!(
                            provider = %provider,
                            files_changed = changed,
                            "Model fix merged ({} fixes reported)",
                            response.fixes_applied.len()
                        );
                        return Ok(merged);
                    }
                    warn!(provider = %provider, "Model reply changed nothing");
                    reasons.push(format!("{}: reply changed nothing", provider));
                }
                Err(e) => {
                    warn!(provider = %provider, "Model fix failed: {}", e);
                    reasons.push(format!("{}: {}", provider, e));
                }
            }
            failed.push(provider);
        }

        Err(RecoveryError::RecoveryFailed(reasons.join("; ")))
    }

    async fn call(
        &self,
        generator: &dyn CodeGenerator,
        request: &FixRequest,
    ) -> Result<FixResponse, LlmError> {
        match tokio::time::timeout(self.call_timeout, generator.fix_errors(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                provider: generator.provider(),
                seconds: self.call_timeout.as_secs(),
            }),
        }
    }
}

/// Files the errors point at, by basename; every file when none match.
pub fn relevant_files(errors: &[String], files: &FileSet) -> Vec<SourceFile> {
    let referenced: BTreeSet<String> = errors
        .iter()
        .filter_map(|e| BuildError::locate(e).0)
        .map(|path| basename_of(&path).to_string())
        .collect();

    let matched: Vec<SourceFile> = files
        .iter()
        .filter(|f| referenced.contains(f.basename()))
        .cloned()
        .collect();

    if matched.is_empty() {
        files.files().to_vec()
    } else {
        matched
    }
}

/// Merge a reply onto `files` by basename. Returned files that would be
/// empty are skipped. Returns the merged set and the number of files that
/// changed.
pub fn merge_fix(files: &FileSet, response: &FixResponse) -> (FileSet, usize) {
    let mut merged = files.clone();
    let mut changed = 0;
    for file in &response.files {
        if !file.is_meaningful() {
            debug!(path = %file.path, "Skipping empty file in model reply");
            continue;
        }
        if merged.upsert(file.clone()) {
            changed += 1;
        }
    }
    (merged, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> FileSet {
        FileSet::from_files(vec![
            SourceFile::new("Todo/TodoApp.swift", "import SwiftUI\n@main\nstruct TodoApp: App { var body: some Scene { WindowGroup { ContentView() } } }"),
            SourceFile::new("Todo/Views/ContentView.swift", "import SwiftUI\nstruct ContentView: View { var body: some View { Text(\"x\") } }"),
        ])
        .unwrap()
    }

    #[test]
    fn test_relevant_files_by_basename() {
        let errors = vec!["/abs/path/ContentView.swift:3:5: error: cannot find 'Foo' in scope".to_string()];
        let relevant = relevant_files(&errors, &files());
        assert_eq!(relevant.len(), 1);
        assert_eq!(relevant[0].path, "Todo/Views/ContentView.swift");
    }

    #[test]
    fn test_relevant_files_falls_back_to_all() {
        let errors = vec!["build timed out after 300 seconds".to_string()];
        assert_eq!(relevant_files(&errors, &files()).len(), 2);
    }

    #[test]
    fn test_merge_keeps_existing_path_and_skips_empty() {
        let response = FixResponse {
            files: vec![
                SourceFile::new("ContentView.swift", "import SwiftUI\nstruct ContentView: View { var body: some View { EmptyView() } }"),
                SourceFile::new("TodoApp.swift", "   "),
            ],
            fixes_applied: vec!["replaced text".to_string()],
        };
        let (merged, changed) = merge_fix(&files(), &response);

        assert_eq!(changed, 1);
        assert_eq!(merged.len(), 2);
        assert!(merged.get("Todo/Views/ContentView.swift").unwrap().content.contains("EmptyView"));
        assert!(merged.get("Todo/TodoApp.swift").unwrap().content.contains("@main"));
    }

    #[test]
    fn test_request_caps_errors() {
        let engine = ModelAssistedRecoveryEngine::new(Vec::new());
        let errors: Vec<String> = (0..25).map(|i| format!("A.swift:{}:1: error: expected '}}'", i)).collect();
        let request = engine.build_request(&errors, &files());
        assert_eq!(request.errors.len(), DEFAULT_MAX_PROMPT_ERRORS);
        assert_eq!(request.instructions, REPAIR_RULES);
    }

    #[tokio::test]
    async fn test_recover_without_generators_fails() {
        let engine = ModelAssistedRecoveryEngine::new(Vec::new());
        let result = engine.recover(&["x".to_string()], &files()).await;
        assert!(matches!(result, Err(RecoveryError::RecoveryFailed(_))));
    }
}
