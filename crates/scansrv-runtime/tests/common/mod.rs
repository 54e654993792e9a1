//! Common test utilities for runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use scansrv_core::{ChannelEntry, ScanParams, ScanType};
use scansrv_runtime::sim::{SimulatedHal, SimulatedPowerSrv, SimulatedRecovery, SimulationConfig};
use scansrv_runtime::{RuntimeConfig, ScanServiceHandle, ScanServiceRuntime, TokioScanTimer};
use scansrv_sm::{ScanService, ScanSrvConfig};

/// Running service wired to simulated collaborators.
pub struct SimulatedService {
    pub handle: ScanServiceHandle,
    pub resets: Arc<AtomicUsize>,
}

/// Spawn a scan service on the current tokio runtime.
pub fn spawn(config: ScanSrvConfig, sim: SimulationConfig) -> SimulatedService {
    let runtime = ScanServiceRuntime::new(RuntimeConfig::default());
    let events = runtime.event_sender();

    let recovery = SimulatedRecovery::new(events.clone(), sim.recovery_latency());
    let resets = recovery.reset_counter();

    let service = ScanService::new(
        config,
        TokioScanTimer::new(events.clone()),
        SimulatedPowerSrv::new(events.clone(), sim.power_latency()),
        SimulatedHal::new(events, sim.command_ack_latency()).with_firmware_hang(sim.firmware_hang),
        recovery,
    )
    .expect("test config must be valid");

    SimulatedService {
        handle: runtime.spawn(service),
        resets,
    }
}

pub fn spawn_default() -> SimulatedService {
    spawn(ScanSrvConfig::default(), SimulationConfig::default())
}

/// Normal active scan over `channels`, 10-30ms dwell each.
pub fn normal_params(channels: &[u8]) -> ScanParams {
    channels
        .iter()
        .fold(ScanParams::new(ScanType::NormalActive), |params, ch| {
            params.with_channel(ChannelEntry::basic(*ch, 10_000, 30_000))
        })
}
