//! Generate command - Generate an app and build it with self-healing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use forge_core::{FileSet, ProjectDir};
use forge_llm::GeneratedApp;
use forge_recovery::SessionContext;
use tracing::{info, warn};

use super::{build_loop, code_generators, load_config, report_outcome, run_session, CommandFailure};

#[derive(Args)]
pub struct GenerateArgs {
    /// What the app should do
    description: String,

    /// App name (also the project directory name)
    #[arg(short, long)]
    name: String,

    /// Directory the project is created in
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Total builds allowed, the first one included
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Skip launching the app in the simulator
    #[arg(long)]
    no_launch: bool,
}

pub async fn execute(args: GenerateArgs, config_path: Option<&Path>) -> Result<()> {
    let app_name = type_name(&args.name)
        .ok_or_else(|| CommandFailure::InvalidArgs(format!("'{}' is not a usable app name", args.name)))?;
    let root = args.output.join(&app_name);
    if root.exists() && root.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        return Err(CommandFailure::InvalidArgs(format!("{} already exists and is not empty", root.display())).into());
    }

    let config = load_config(config_path, &root, args.max_attempts)?;
    let generators = code_generators(&config)?;
    if generators.is_empty() {
        anyhow::bail!("No LLM provider configured: set ANTHROPIC_API_KEY, OPENAI_API_KEY or XAI_API_KEY");
    }

    println!("🤖 Generating {}...", app_name);
    let mut generated: Option<GeneratedApp> = None;
    for generator in &generators {
        match generator.generate(&args.description, &app_name).await {
            Ok(app) => {
                info!(provider = %generator.provider(), files = app.files.len(), "App generated");
                generated = Some(app);
                break;
            }
            Err(e) => warn!(provider = %generator.provider(), "Generation failed: {}", e),
        }
    }
    let app = generated.context("Every provider failed to generate the app")?;

    let mut files = FileSet::new();
    for file in app.files {
        let basename = file.basename().to_string();
        if files.find_by_basename(&basename).is_some() {
            warn!(file = %file.path, "Duplicate file name in generated app; keeping the last copy");
        }
        files.upsert(file);
    }
    for feature in &app.features {
        println!("   • {}", feature);
    }

    let bundle_id = bundle_id(&app.bundle_id, &app_name);
    std::fs::create_dir_all(&root).with_context(|| format!("Failed to create {}", root.display()))?;
    std::fs::write(root.join("project.yml"), project_spec(&app_name, &bundle_id, &files))
        .context("Failed to write project.yml")?;
    println!("📁 Project written to {}", root.display());

    let history_cap = config.recovery.history_cap;
    let build_loop = build_loop(&config, generators, !args.no_launch).with_bundle_id(bundle_id);
    let project = ProjectDir::new(&root);
    let project_id = app_name.clone();

    println!("🔨 Building (max {} attempt(s))...", build_loop.max_attempts());
    let outcome = run_session(&app_name, move |cancel| async move {
        let mut ctx = SessionContext::new(project_id)
            .with_cancel(cancel)
            .with_history_cap(history_cap);
        build_loop.run(&mut ctx, &project, files).await
    })
    .await?;

    report_outcome(&outcome)
}

/// UpperCamelCase Swift type name from free text.
fn type_name(name: &str) -> Option<String> {
    let mut out = String::new();
    for word in name.split(|c: char| !c.is_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    match out.chars().next() {
        Some(c) if c.is_alphabetic() => Some(out),
        _ => None,
    }
}

fn bundle_id(generated: &str, app_name: &str) -> String {
    let valid = !generated.is_empty()
        && generated.contains('.')
        && generated.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        generated.to_string()
    } else {
        format!("com.swiftforge.{}", app_name.to_lowercase())
    }
}

/// xcodegen spec listing the top-level source entries.
fn project_spec(app_name: &str, bundle_id: &str, files: &FileSet) -> String {
    let sources: BTreeSet<&str> = files
        .iter()
        .filter_map(|f| f.path.split('/').next())
        .collect();

    let mut spec = format!(
        "name: {name}\noptions:\n  deploymentTarget:\n    iOS: \"17.0\"\ntargets:\n  {name}:\n    type: application\n    platform: iOS\n    sources:\n",
        name = app_name
    );
    for source in sources {
        spec.push_str(&format!("      - path: \"{}\"\n", source));
    }
    spec.push_str(&format!(
        "    settings:\n      base:\n        PRODUCT_BUNDLE_IDENTIFIER: {}\n        GENERATE_INFOPLIST_FILE: YES\n        INFOPLIST_KEY_UILaunchScreen_Generation: YES\n        MARKETING_VERSION: \"1.0\"\n        CURRENT_PROJECT_VERSION: \"1\"\n",
        bundle_id
    ));
    spec
}
