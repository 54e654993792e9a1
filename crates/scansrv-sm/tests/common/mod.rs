//! Common test utilities for integration tests.
//!
//! [`Harness`] wires a [`ScanService`] to the mock collaborators from
//! `scansrv-hardware` and records every callback the service invokes, so
//! tests can script the collaborators and then assert on the complete
//! observable outcome of a scan cycle.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common::{self, Harness};
//!
//! let mut h = Harness::new();
//! h.request(common::normal_params(&[1, 6, 11]));
//! h.service.scan_complete(ScanCompleteInfo::normal());
//! h.assert_notified_once(CompletionStatus::Success);
//! ```

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use scansrv_core::{
    ChannelEntry, CommandStatus, CompletionStatus, ScanCompleteReport, ScanParams, ScanType,
};
use scansrv_hardware::mock::{
    MockFailureReporter, MockFailureReporterHandle, MockPowerSrv, MockPowerSrvHandle,
    MockScanCommands, MockScanCommandsHandle, MockTimer, MockTimerHandle,
};
use scansrv_sm::{ScanRequest, ScanService, ScanSrvConfig, ScanSrvState};

pub type MockService =
    ScanService<MockTimer, MockPowerSrv, MockScanCommands, MockFailureReporter>;

/// Scan service plus handles to every mock and the recorded callbacks.
pub struct Harness {
    pub service: MockService,
    pub timer: MockTimerHandle,
    pub power: MockPowerSrvHandle,
    pub hal: MockScanCommandsHandle,
    pub reporter: MockFailureReporterHandle,
    pub reports: Arc<Mutex<Vec<ScanCompleteReport>>>,
    pub accepted: Arc<Mutex<Vec<CommandStatus>>>,
}

impl Harness {
    /// Harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ScanSrvConfig::default())
    }

    pub fn with_config(config: ScanSrvConfig) -> Self {
        let (timer, timer_handle) = MockTimer::new();
        let (power, power_handle) = MockPowerSrv::new();
        let (hal, hal_handle) = MockScanCommands::new();
        let (reporter, reporter_handle) = MockFailureReporter::new();

        let service = ScanService::new(config, timer, power, hal, reporter)
            .expect("default test config must be valid");

        Self {
            service,
            timer: timer_handle,
            power: power_handle,
            hal: hal_handle,
            reporter: reporter_handle,
            reports: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Attach the recording callbacks to `request`.
    pub fn instrument(&self, request: ScanRequest) -> ScanRequest {
        let reports = Arc::clone(&self.reports);
        let accepted = Arc::clone(&self.accepted);

        request
            .on_command_accepted(move |status| accepted.lock().unwrap().push(status))
            .on_scan_complete(move |report| reports.lock().unwrap().push(report))
    }

    /// Submit an instrumented request with default policy.
    pub fn request(&mut self, params: ScanParams) -> CompletionStatus {
        self.submit(ScanRequest::new(params))
    }

    /// Submit an instrumented copy of `request`.
    pub fn submit(&mut self, request: ScanRequest) -> CompletionStatus {
        let request = self.instrument(request);
        self.service
            .request_scan(request)
            .expect("scan request must be accepted")
    }

    /// Fire the guard timer as the hardware would.
    pub fn fire_timer(&mut self) {
        self.timer.mark_fired();
        self.service.timer_expired();
    }

    pub fn reports(&self) -> Vec<ScanCompleteReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn accepted(&self) -> Vec<CommandStatus> {
        self.accepted.lock().unwrap().clone()
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn state(&self) -> ScanSrvState {
        self.service.state()
    }

    /// Assert exactly one completion report was delivered, with `status`.
    pub fn assert_notified_once(&self, status: CompletionStatus) {
        let reports = self.reports();
        assert_eq!(
            reports.len(),
            1,
            "expected exactly one completion report, got {:?}",
            reports
        );
        assert_eq!(reports[0].status, status);
    }

    /// Assert the service is back in Idle with the guard timer disarmed.
    pub fn assert_idle_and_quiet(&self) {
        assert_eq!(self.state(), ScanSrvState::Idle);
        assert!(!self.service.timer_running());
        assert!(!self.timer.is_running());
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Normal active scan over `channels`, 10-30ms dwell each.
pub fn normal_params(channels: &[u8]) -> ScanParams {
    channels
        .iter()
        .fold(ScanParams::new(ScanType::NormalActive), |params, ch| {
            params.with_channel(ChannelEntry::basic(*ch, 10_000, 30_000))
        })
}

/// SPS scan over `channels`, back to back 20ms windows.
pub fn sps_params(channels: &[u8]) -> ScanParams {
    channels
        .iter()
        .enumerate()
        .fold(ScanParams::new(ScanType::Sps), |params, (i, ch)| {
            params.with_channel(ChannelEntry::sps(*ch, i as u64 * 20_000, 20_000))
        })
}
