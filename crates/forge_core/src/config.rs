//! SwiftForge configuration.
//!
//! Loaded from `swiftforge.toml` (project root or an explicit path) and then
//! overridden from `SWIFTFORGE_*` environment variables. Every field has a
//! default so an empty file, or no file at all, is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Default config file name looked up in the project root.
pub const CONFIG_FILE: &str = "swiftforge.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub build: BuildSettings,
    pub simulator: SimulatorSettings,
    pub recovery: RecoverySettings,
    pub llm: LlmSettings,
}

/// `[build]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Hard timeout for one build, in seconds
    pub timeout_secs: u64,
    /// Scheme to build (defaults to the project name)
    pub scheme: Option<String>,
    pub configuration: String,
    pub destination: String,
    /// Run `xcodegen generate` when a `project.yml` is present
    pub use_xcodegen: bool,
    pub derived_data_path: Option<PathBuf>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            scheme: None,
            configuration: "Debug".to_string(),
            destination: "platform=iOS Simulator,name=iPhone 15".to_string(),
            use_xcodegen: true,
            derived_data_path: None,
        }
    }
}

/// `[simulator]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    pub device: String,
    /// Launch the app after a successful build
    pub launch: bool,
    pub boot_timeout_secs: u64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            device: "iPhone 15".to_string(),
            launch: true,
            boot_timeout_secs: 120,
        }
    }
}

/// `[recovery]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoverySettings {
    pub max_attempts: u32,
    /// Number of recovery attempts kept for escalation and diagnostics
    pub history_cap: usize,
    /// Errors included in a model-assisted prompt
    pub max_prompt_errors: usize,
}

impl Default for RecoverySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            history_cap: 50,
            max_prompt_errors: 10,
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider preference order
    pub providers: Vec<String>,
    /// Per-call timeout, in seconds
    pub timeout_secs: u64,
    pub max_tokens: u32,
    /// Model overrides keyed by provider name
    pub models: BTreeMap<String, String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            providers: vec![
                "anthropic".to_string(),
                "openai".to_string(),
                "grok".to_string(),
            ],
            timeout_secs: 120,
            max_tokens: 8192,
            models: BTreeMap::new(),
        }
    }
}

impl ForgeConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `explicit` if given, else `<project_root>/swiftforge.toml`
    /// if it exists, else defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>, project_root: Option<&Path>) -> CoreResult<Self> {
        let path = match (explicit, project_root) {
            (Some(path), _) => Some(path.to_path_buf()),
            (None, Some(root)) => Some(root.join(CONFIG_FILE)).filter(|p| p.exists()),
            (None, None) => None,
        };

        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    CoreError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                debug!("Loaded configuration from {:?}", path);
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `SWIFTFORGE_*` overrides from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> CoreResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SWIFTFORGE_MAX_ATTEMPTS") {
            self.recovery.max_attempts = parse_number("SWIFTFORGE_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("SWIFTFORGE_BUILD_TIMEOUT") {
            self.build.timeout_secs = parse_number("SWIFTFORGE_BUILD_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("SWIFTFORGE_LLM_TIMEOUT") {
            self.llm.timeout_secs = parse_number("SWIFTFORGE_LLM_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("SWIFTFORGE_PROVIDERS") {
            let providers: Vec<String> = value
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
            if !providers.is_empty() {
                self.llm.providers = providers;
            }
        }
        if let Some(value) = lookup("SWIFTFORGE_SIMULATOR") {
            self.simulator.device = value;
        }
        Ok(())
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.recovery.max_attempts = attempts;
        self
    }

    pub fn with_build_timeout(mut self, seconds: u64) -> Self {
        self.build.timeout_secs = seconds;
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{} must be a number, got '{}'", key, value)))
}
