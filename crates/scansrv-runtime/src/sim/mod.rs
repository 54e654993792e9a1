//! Simulated collaborators.
//!
//! These stand in for the power server, the HAL and the recovery module when
//! no real driver is attached. Unlike the mocks in `scansrv-hardware`, they
//! answer asynchronously: every completion is posted back to the runtime
//! after a configurable latency, the way the real driver's callbacks arrive.

pub mod hal;
pub mod power;
pub mod recovery;

pub use hal::SimulatedHal;
pub use power::SimulatedPowerSrv;
pub use recovery::SimulatedRecovery;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Latencies and fault injection for the simulated collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Power server transition latency; zero completes synchronously.
    pub power_latency_ms: u64,

    /// Delay before the command mailbox acknowledges a scan command.
    pub command_ack_latency_ms: u64,

    /// Firmware accepts scan commands but never reports completion.
    pub firmware_hang: bool,

    /// Delay between a failure report and the firmware reset notification.
    pub recovery_latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            power_latency_ms: 5,
            command_ack_latency_ms: 1,
            firmware_hang: false,
            recovery_latency_ms: 50,
        }
    }
}

impl SimulationConfig {
    pub fn power_latency(&self) -> Duration {
        Duration::from_millis(self.power_latency_ms)
    }

    pub fn command_ack_latency(&self) -> Duration {
        Duration::from_millis(self.command_ack_latency_ms)
    }

    pub fn recovery_latency(&self) -> Duration {
        Duration::from_millis(self.recovery_latency_ms)
    }
}
