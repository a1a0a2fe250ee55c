//! Build and simulator configuration types.

use std::path::PathBuf;

use forge_core::{BuildSettings, SimulatorSettings};
use serde::{Deserialize, Serialize};

/// xcodebuild configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Scheme to build; defaults to the `.xcodeproj` name
    pub scheme: Option<String>,
    /// Build configuration (Debug/Release)
    pub configuration: String,
    /// SDK passed to `-sdk`
    pub sdk: String,
    /// Destination passed to `-destination`
    pub destination: String,
    /// DerivedData location; defaults to `<project>/build/DerivedData`
    pub derived_data_path: Option<PathBuf>,
    /// Timeout in seconds (0 = no timeout)
    pub timeout_seconds: u64,
    /// Generate the Xcode project from `project.yml` when missing
    pub use_xcodegen: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            scheme: None,
            configuration: "Debug".to_string(),
            sdk: "iphonesimulator".to_string(),
            destination: "platform=iOS Simulator,name=iPhone 15".to_string(),
            derived_data_path: None,
            timeout_seconds: 300, // 5 minutes
            use_xcodegen: true,
        }
    }
}

impl BuildConfig {
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn derived_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.derived_data_path = Some(path.into());
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn xcodegen(mut self, enabled: bool) -> Self {
        self.use_xcodegen = enabled;
        self
    }
}

impl From<&BuildSettings> for BuildConfig {
    fn from(settings: &BuildSettings) -> Self {
        Self {
            scheme: settings.scheme.clone(),
            configuration: settings.configuration.clone(),
            destination: settings.destination.clone(),
            derived_data_path: settings.derived_data_path.clone(),
            timeout_seconds: settings.timeout_secs,
            use_xcodegen: settings.use_xcodegen,
            ..Self::default()
        }
    }
}

/// Simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Device name, e.g. "iPhone 15"
    pub device: String,
    /// Timeout for each simctl invocation, in seconds
    pub timeout_seconds: u64,
    /// Bring the Simulator app to the foreground
    pub open_app: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            device: "iPhone 15".to_string(),
            timeout_seconds: 120,
            open_app: true,
        }
    }
}

impl SimulatorConfig {
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn headless(mut self) -> Self {
        self.open_app = false;
        self
    }
}

impl From<&SimulatorSettings> for SimulatorConfig {
    fn from(settings: &SimulatorSettings) -> Self {
        Self {
            device: settings.device.clone(),
            timeout_seconds: settings.boot_timeout_secs,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_builder() {
        let config = BuildConfig::default()
            .scheme("TodoApp")
            .configuration("Release")
            .timeout(60)
            .xcodegen(false);

        assert_eq!(config.scheme.as_deref(), Some("TodoApp"));
        assert_eq!(config.configuration, "Release");
        assert_eq!(config.sdk, "iphonesimulator");
        assert_eq!(config.timeout_seconds, 60);
        assert!(!config.use_xcodegen);
    }

    #[test]
    fn test_from_settings() {
        let settings = BuildSettings {
            timeout_secs: 42,
            scheme: Some("Notes".to_string()),
            ..BuildSettings::default()
        };
        let config = BuildConfig::from(&settings);

        assert_eq!(config.timeout_seconds, 42);
        assert_eq!(config.scheme.as_deref(), Some("Notes"));
        assert_eq!(config.sdk, "iphonesimulator");

        let sim = SimulatorConfig::from(&SimulatorSettings::default()).headless();
        assert_eq!(sim.device, "iPhone 15");
        assert!(!sim.open_app);
    }
}
