//! Configuration file for the demo binary.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use scansrv_runtime::RuntimeConfig;
use scansrv_runtime::sim::SimulationConfig;
use scansrv_sm::ScanSrvConfig;

/// Everything the demo reads from its JSON configuration file.
///
/// Every section is optional.
///
/// ```json
/// {
///   "scan_service": { "no_scan_complete_to_recovery": 2 },
///   "runtime": { "channel_capacity": 32 },
///   "simulation": { "power_latency_ms": 10, "firmware_hang": true }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub scan_service: ScanSrvConfig,
    pub runtime: RuntimeConfig,
    pub simulation: SimulationConfig,
}

impl DemoConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.scan_service.validate()?;
        Ok(config)
    }
}
