//! The code generation capability consumed by the recovery pipeline.

use async_trait::async_trait;
use forge_core::SourceFile;
use tracing::{debug, info};

use crate::client::LlmAdapter;
use crate::error::LlmResult;
use crate::parse::{parse_fix_response, parse_generated_app, FixResponse, GeneratedApp};
use crate::provider::LlmProvider;

/// Everything a provider needs to repair a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixRequest {
    /// Raw compiler errors, already capped by the caller
    pub errors: Vec<String>,
    /// Only the files the errors point at
    pub files: Vec<SourceFile>,
    /// Repair rules the reply must follow
    pub instructions: String,
}

/// Produces and repairs Swift sources.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Which provider backs this generator.
    fn provider(&self) -> LlmProvider;

    /// Generate a complete app from a description.
    async fn generate(&self, description: &str, app_name: &str) -> LlmResult<GeneratedApp>;

    /// Repair the files in `request`.
    async fn fix_errors(&self, request: &FixRequest) -> LlmResult<FixResponse>;
}

const GENERATE_SYSTEM_PROMPT: &str = r#"You are an expert iOS engineer writing SwiftUI apps for iOS 17.
Respond with a single JSON object and nothing else:
{"files": [{"path": "<AppName>/<File>.swift", "content": "<swift source>"}],
 "bundle_id": "com.swiftforge.<appname>", "app_name": "<AppName>", "features": ["..."]}
Rules:
- Exactly one file contains the @main App struct.
- Every file name is unique, even across folders.
- Never name a type Task, State, Action, Result, Error or Never.
- Import SwiftUI in every view file and Foundation where UUID, Date or URL are used."#;

const FIX_SYSTEM_PROMPT: &str =
    "You repair Swift compiler errors. Respond with a single JSON object and nothing else.";

/// [`CodeGenerator`] backed by an HTTP LLM provider.
#[derive(Debug, Clone)]
pub struct LlmCodeGenerator {
    adapter: LlmAdapter,
}

impl LlmCodeGenerator {
    pub fn new(adapter: LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &LlmAdapter {
        &self.adapter
    }
}

#[async_trait]
impl CodeGenerator for LlmCodeGenerator {
    fn provider(&self) -> LlmProvider {
        self.adapter.provider()
    }

    async fn generate(&self, description: &str, app_name: &str) -> LlmResult<GeneratedApp> {
        info!(provider = %self.provider(), "Generating app '{}'", app_name);
        let prompt = format!(
            "App name: {}\n\nDescription:\n{}\n",
            app_name, description
        );
        let response = self.adapter.complete(GENERATE_SYSTEM_PROMPT, &prompt).await?;
        debug!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Generation reply received"
        );
        parse_generated_app(&response.content)
    }

    async fn fix_errors(&self, request: &FixRequest) -> LlmResult<FixResponse> {
        let prompt = render_fix_prompt(request);
        let response = self.adapter.complete(FIX_SYSTEM_PROMPT, &prompt).await?;
        debug!(
            provider = %self.provider(),
            output_tokens = response.output_tokens,
            "Fix reply received"
        );
        parse_fix_response(&response.content)
    }
}

/// Render a fix request as the user message.
pub fn render_fix_prompt(request: &FixRequest) -> String {
    let mut prompt = String::from("## Build errors\n");
    for error in &request.errors {
        prompt.push_str("- ");
        prompt.push_str(error);
        prompt.push('\n');
    }

    prompt.push_str("\n## Files\n");
    for file in &request.files {
        prompt.push_str(&format!("\n### {}\n```swift\n{}\n```\n", file.path, file.content));
    }

    prompt.push_str("\n## Rules\n");
    prompt.push_str(&request.instructions);
    prompt.push_str(
        "\n\n## Output\nReturn JSON: {\"files\": [{\"path\": \"...\", \"content\": \"...\"}], \
         \"fixes_applied\": [\"...\"]}. Include the complete content of every file you change, \
         keep each path exactly as given, and omit files you did not change.\n",
    );
    prompt
}
