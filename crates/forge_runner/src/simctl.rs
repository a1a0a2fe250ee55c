//! iOS Simulator control through `xcrun simctl`.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::{LaunchResult, Simulator};
use crate::config::SimulatorConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::process::run_command;

/// Output of `xcrun simctl list devices --json`.
#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: HashMap<String, Vec<Device>>,
}

#[derive(Debug, Clone, Deserialize)]
struct Device {
    name: String,
    udid: String,
    state: String,
    #[serde(rename = "isAvailable", default = "default_available")]
    is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Installs and launches apps on a booted simulator.
#[derive(Debug, Clone, Default)]
pub struct SimctlSimulator {
    config: SimulatorConfig,
}

impl SimctlSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    async fn simctl(&self, args: &[&str]) -> RunnerResult<String> {
        let mut full = vec!["simctl".to_string()];
        full.extend(args.iter().map(|a| a.to_string()));

        let cancel = CancellationToken::new();
        let output = run_command(
            "xcrun",
            &full,
            Path::new("."),
            self.config.timeout_seconds,
            &cancel,
        )
        .await?;

        if output.success() {
            Ok(output.stdout)
        } else {
            Err(RunnerError::Simulator(format!(
                "simctl {} failed: {}",
                args.first().copied().unwrap_or_default(),
                output.stderr.trim()
            )))
        }
    }

    /// Resolve the configured device name to a UDID.
    async fn find_device(&self) -> RunnerResult<Option<Device>> {
        let json = self.simctl(&["list", "devices", "--json"]).await?;
        pick_device(&json, &self.config.device)
    }

    async fn boot(&self) -> RunnerResult<()> {
        let target = match self.find_device().await {
            Ok(Some(device)) if device.state == "Booted" => {
                debug!("Simulator '{}' already booted", device.name);
                return Ok(());
            }
            Ok(Some(device)) => device.udid,
            Ok(None) => {
                warn!("No simulator named '{}', booting by name", self.config.device);
                self.config.device.clone()
            }
            Err(e) => {
                warn!("Could not list simulators: {}", e);
                self.config.device.clone()
            }
        };

        info!("Booting simulator '{}'", self.config.device);
        match self.simctl(&["boot", &target]).await {
            Ok(_) => Ok(()),
            // simctl refuses to boot an already-booted device
            Err(RunnerError::Simulator(msg)) if msg.contains("Booted") => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn pick_device(json: &str, name: &str) -> RunnerResult<Option<Device>> {
    let list: DeviceList = serde_json::from_str(json)?;
    let mut runtimes: Vec<_> = list.devices.into_iter().collect();
    // Newest runtime first
    runtimes.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(runtimes
        .into_iter()
        .flat_map(|(_, devices)| devices)
        .filter(|d| d.is_available && d.name == name)
        .max_by_key(|d| d.state == "Booted"))
}

#[async_trait]
impl Simulator for SimctlSimulator {
    async fn install_and_launch(
        &self,
        app_path: &Path,
        bundle_id: &str,
    ) -> RunnerResult<LaunchResult> {
        if let Err(e) = self.boot().await {
            return Ok(LaunchResult::failed(format!("boot failed: {}", e)));
        }

        if self.config.open_app {
            let cancel = CancellationToken::new();
            let args = vec!["-a".to_string(), "Simulator".to_string()];
            if let Err(e) = run_command("open", &args, Path::new("."), 30, &cancel).await {
                debug!("Could not open Simulator.app: {}", e);
            }
        }

        let app = app_path.display().to_string();
        if let Err(e) = self.simctl(&["install", "booted", &app]).await {
            return Ok(LaunchResult::failed(format!("install failed: {}", e)));
        }

        info!("Launching {}", bundle_id);
        match self.simctl(&["launch", "booted", bundle_id]).await {
            Ok(stdout) => Ok(LaunchResult::launched(format!(
                "{} launched on {} ({})",
                bundle_id,
                self.config.device,
                stdout.trim()
            ))),
            Err(e) => Ok(LaunchResult::failed(format!("launch failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICES: &str = r#"{
      "devices": {
        "com.apple.CoreSimulator.SimRuntime.iOS-16-4": [
          {"name": "iPhone 15", "udid": "OLD", "state": "Shutdown", "isAvailable": true}
        ],
        "com.apple.CoreSimulator.SimRuntime.iOS-17-2": [
          {"name": "iPhone 15", "udid": "NEW", "state": "Booted", "isAvailable": true},
          {"name": "iPad Pro", "udid": "PAD", "state": "Shutdown", "isAvailable": true},
          {"name": "iPhone 14", "udid": "GONE", "state": "Shutdown", "isAvailable": false}
        ]
      }
    }"#;

    #[test]
    fn test_pick_device_prefers_booted() {
        let device = pick_device(DEVICES, "iPhone 15").unwrap().unwrap();
        assert_eq!(device.udid, "NEW");
    }

    #[test]
    fn test_pick_device_skips_unavailable() {
        assert!(pick_device(DEVICES, "iPhone 14").unwrap().is_none());
        assert!(pick_device(DEVICES, "Apple Watch").unwrap().is_none());
    }

    #[test]
    fn test_pick_device_rejects_bad_json() {
        assert!(matches!(
            pick_device("not json", "iPhone 15"),
            Err(RunnerError::Json(_))
        ));
    }
}
