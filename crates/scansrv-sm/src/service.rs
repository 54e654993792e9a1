//! Scan service: the action handlers behind the state machine.
//!
//! [`ScanService`] owns one [`StateMachine`] together with the per-cycle
//! state (return status, driver-mode flags, guard timer flag, timeout
//! counter) and drives the collaborators from the actions the table selects.
//!
//! # Dispatch Model
//!
//! Every public entry point feeds one event into the machine and runs to
//! completion before returning. Actions may feed follow-up events back in
//! synchronously (for example, an immediate `AlreadyInMode` answer from the
//! power server becomes a `PsSuccess` event on the same call stack). Results
//! that arrive later are delivered through the completion entry points:
//!
//! | Entry point | Source | Event |
//! |---|---|---|
//! | [`power_save_complete`](ScanService::power_save_complete) | power server | `PsSuccess` / `PsFail` / `PsPend` |
//! | [`command_response`](ScanService::command_response) | HAL mailbox | `ScanComplete` on rejection |
//! | [`scan_complete`](ScanService::scan_complete) | firmware | `ScanComplete` |
//! | [`timer_expired`](ScanService::timer_expired) | guard timer | `TimerExpired` |
//!
//! # Notification
//!
//! The scan-complete callback of a request fires exactly once per cycle. If
//! the whole cycle finishes inside [`request_scan`](ScanService::request_scan)
//! (for example, the HAL rejects the command synchronously), the report is
//! held back and delivered after dispatching has finished, just before
//! `request_scan` returns.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use scansrv_core::{
    CommandStatus, CompletionStatus, Error, FailureKind, PowerSaveMode, PsCallbackResult,
    PsCommandStatus, Result, ScanCompleteInfo, ScanCompleteReport,
};
use scansrv_hardware::{FailureReporter, PowerSaveService, ScanCommands, ScanTimer};

use crate::config::ScanSrvConfig;
use crate::request::ScanRequest;
use crate::state_machine::{Action, ScanSrvEvent, ScanSrvState, StateMachine, StateTransition};
use crate::timeout::scan_timeout;

/// Point-in-time view of a scan service, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ScanServiceSnapshot {
    pub state: ScanSrvState,
    pub return_status: CompletionStatus,
    pub timer_running: bool,
    pub exit_from_driver_mode: bool,
    pub consecutive_no_scan_complete: u32,
    pub request_pending: bool,
}

/// Scan service coordinating driver mode, scan commands and recovery.
///
/// # Examples
///
/// ```
/// use scansrv_core::{ChannelEntry, CompletionStatus, ScanCompleteInfo, ScanParams, ScanType};
/// use scansrv_hardware::mock::{MockFailureReporter, MockPowerSrv, MockScanCommands, MockTimer};
/// use scansrv_sm::{ScanRequest, ScanService, ScanSrvConfig, ScanSrvState};
///
/// let (timer, _) = MockTimer::new();
/// let (power, _) = MockPowerSrv::new();
/// let (hal, hal_handle) = MockScanCommands::new();
/// let (reporter, _) = MockFailureReporter::new();
///
/// let mut service =
///     ScanService::new(ScanSrvConfig::default(), timer, power, hal, reporter).unwrap();
///
/// let params = ScanParams::new(ScanType::NormalActive)
///     .with_channel(ChannelEntry::basic(6, 10_000, 30_000));
/// service.request_scan(ScanRequest::new(params)).unwrap();
///
/// // Driver mode was granted synchronously, so the scan is already running.
/// assert_eq!(service.state(), ScanSrvState::Scanning);
/// assert_eq!(hal_handle.start_count(), 1);
///
/// service.scan_complete(ScanCompleteInfo::normal());
/// assert_eq!(service.state(), ScanSrvState::Idle);
/// assert_eq!(service.return_status(), CompletionStatus::Success);
/// ```
pub struct ScanService<T, P, H, R> {
    machine: StateMachine,
    config: ScanSrvConfig,

    timer: T,
    power: P,
    hal: H,
    reporter: R,

    /// Request currently travelling through the machine.
    active: Option<ScanRequest>,

    /// Driver mode must be released before completing.
    exit_from_driver_mode: bool,

    /// Proceed with the scan if driver mode cannot be entered.
    scan_on_driver_mode_failure: bool,

    /// Accumulated outcome of the current cycle.
    return_status: CompletionStatus,

    /// The guard timer is armed.
    timer_running: bool,

    /// Consecutive timeouts without a real scan completion.
    consecutive_no_scan_complete: u32,

    /// The scan is known to overlap DTIM beacons.
    dtim_overlapping: bool,

    /// TSF error flag and SPS result of the last completion.
    scan_result: ScanCompleteInfo,

    /// Dispatching from inside `request_scan`.
    in_request: bool,

    /// Report produced while `in_request` was set.
    deferred_report: Option<ScanCompleteReport>,
}

impl<T, P, H, R> ScanService<T, P, H, R>
where
    T: ScanTimer,
    P: PowerSaveService,
    H: ScanCommands,
    R: FailureReporter,
{
    /// Create a scan service in the Idle state.
    ///
    /// # Errors
    /// Returns the validation error if `config` is not usable.
    pub fn new(config: ScanSrvConfig, timer: T, power: P, hal: H, reporter: R) -> Result<Self> {
        config.validate()?;

        let machine = StateMachine::builder()
            .with_history_capacity(config.history_size)
            .build();

        Ok(Self {
            machine,
            config,
            timer,
            power,
            hal,
            reporter,
            active: None,
            exit_from_driver_mode: false,
            scan_on_driver_mode_failure: false,
            return_status: CompletionStatus::Success,
            timer_running: false,
            consecutive_no_scan_complete: 0,
            dtim_overlapping: false,
            scan_result: ScanCompleteInfo::normal(),
            in_request: false,
            deferred_report: None,
        })
    }

    // ------------------------------------------------------------------
    // Public entry points
    // ------------------------------------------------------------------

    /// Start a scan cycle.
    ///
    /// Returns the status accumulated by the time the call returns:
    /// `Success` while the cycle is still in progress, or the final status
    /// if the cycle already completed (in which case the request's callbacks
    /// have been invoked before returning).
    ///
    /// # Errors
    /// - `Error::Busy` if a scan cycle is already in progress
    /// - `Error::InvalidScanParams` if the scan parameters do not validate
    pub fn request_scan(&mut self, request: ScanRequest) -> Result<CompletionStatus> {
        let state = self.state();
        if state != ScanSrvState::Idle {
            warn!(%state, request_id = %request.id, "Scan request rejected, service busy");
            return Err(Error::Busy {
                state: state.to_string(),
            });
        }

        request.params.validate()?;

        info!(
            request_id = %request.id,
            scan_type = %request.params.scan_type,
            channels = request.params.num_channels(),
            driver_mode = request.enter_driver_mode,
            "Scan requested"
        );

        self.return_status = CompletionStatus::Success;
        self.exit_from_driver_mode = request.enter_driver_mode;
        self.scan_on_driver_mode_failure = request.scan_on_driver_mode_failure;
        self.scan_result = ScanCompleteInfo::normal();

        let first_event = if request.enter_driver_mode {
            ScanSrvEvent::RequestPs
        } else {
            ScanSrvEvent::PsSuccess
        };
        self.active = Some(request);

        self.in_request = true;
        self.handle_event(first_event);
        self.in_request = false;

        let status = self.return_status;
        if let Some(report) = self.deferred_report.take() {
            debug!("Scan cycle completed within request, delivering now");
            self.deliver(report);
        }

        Ok(status)
    }

    /// Stop the current scan.
    ///
    /// If a scan command is in flight, the HAL is asked to stop it; the cycle
    /// then completes when the firmware reports scan completion.
    pub fn request_stop_scan(&mut self) {
        let before = self.state();
        info!(state = %before, "Stop scan requested");

        if matches!(before, ScanSrvState::PsWait | ScanSrvState::Scanning) {
            self.return_status = self.return_status.cancelled();
        }

        self.handle_event(ScanSrvEvent::StopScan);

        if before == ScanSrvState::Scanning {
            self.issue_stop_command();
        }
    }

    /// Notify that the recovery module has reset the firmware.
    ///
    /// The pending request is abandoned without notification; the recovery
    /// module owns driver mode from here on.
    pub fn notify_firmware_reset(&mut self) {
        self.handle_event(ScanSrvEvent::FwReset);
    }

    /// Deliver the asynchronous outcome of a reserve or release call.
    pub fn power_save_complete(&mut self, result: PsCallbackResult) {
        let state = self.state();
        debug!(%state, ?result, "Power server callback");

        let event = match result {
            PsCallbackResult::Success => ScanSrvEvent::PsSuccess,
            PsCallbackResult::Pending => ScanSrvEvent::PsPend,
            PsCallbackResult::Fail => match state {
                // Driver mode entry failed, nothing to release later
                ScanSrvState::PsWait | ScanSrvState::Stopping => {
                    self.exit_from_driver_mode = false;
                    if self.scan_on_driver_mode_failure {
                        info!("Driver mode failed, continuing to scan");
                        ScanSrvEvent::PsSuccess
                    } else {
                        info!("Driver mode failed, aborting scan");
                        self.return_status = CompletionStatus::Failure;
                        ScanSrvEvent::PsFail
                    }
                }
                ScanSrvState::PsExit => {
                    warn!("Driver mode exit failed");
                    self.return_status = CompletionStatus::Failure;
                    ScanSrvEvent::PsFail
                }
                ScanSrvState::Idle | ScanSrvState::Scanning => ScanSrvEvent::PsFail,
            },
        };

        self.handle_event(event);
    }

    /// Deliver the HAL mailbox acknowledgement of the scan command.
    pub fn command_response(&mut self, status: CommandStatus) {
        if let Some(callback) = self
            .active
            .as_mut()
            .and_then(|request| request.on_command_accepted.take())
        {
            callback(status);
        }

        if !status.is_accepted() {
            error!("Scan command rejected by firmware, quitting scan");
            self.return_status = CompletionStatus::Failure;
            self.handle_event(ScanSrvEvent::ScanComplete);
        }
    }

    /// Deliver a scan completion reported by the firmware.
    pub fn scan_complete(&mut self, info: ScanCompleteInfo) {
        debug!(
            tsf_error = info.tsf_error,
            sps_scan_result = info.sps_scan_result,
            "Scan complete from firmware"
        );
        self.scan_result = info;
        self.consecutive_no_scan_complete = 0;
        self.handle_event(ScanSrvEvent::ScanComplete);
    }

    /// Deliver a guard timer expiry.
    pub fn timer_expired(&mut self) {
        self.handle_event(ScanSrvEvent::TimerExpired);
    }

    /// Record whether scans overlap DTIM beacons (affects the guard timeout).
    pub fn set_dtim_overlapping(&mut self, overlapping: bool) {
        self.dtim_overlapping = overlapping;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> ScanSrvState {
        self.machine.current_state()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == ScanSrvState::Idle
    }

    pub fn return_status(&self) -> CompletionStatus {
        self.return_status
    }

    pub fn timer_running(&self) -> bool {
        self.timer_running
    }

    pub fn exit_from_driver_mode(&self) -> bool {
        self.exit_from_driver_mode
    }

    pub fn consecutive_no_scan_complete(&self) -> u32 {
        self.consecutive_no_scan_complete
    }

    pub fn config(&self) -> &ScanSrvConfig {
        &self.config
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.machine.last_transitions(self.config.history_size)
    }

    pub fn snapshot(&self) -> ScanServiceSnapshot {
        ScanServiceSnapshot {
            state: self.state(),
            return_status: self.return_status,
            timer_running: self.timer_running,
            exit_from_driver_mode: self.exit_from_driver_mode,
            consecutive_no_scan_complete: self.consecutive_no_scan_complete,
            request_pending: self.active.is_some(),
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn handle_event(&mut self, event: ScanSrvEvent) {
        match self.machine.process(event) {
            Action::RequestPs => self.request_ps(),
            Action::StartScan => self.start_scan(),
            Action::ReleasePs => self.release_ps(),
            Action::NotifyComplete => self.notify_complete(),
            Action::TimerExpiry => self.handle_timer_expiry(),
            Action::PsFailWhileScanning => self.ps_fail_while_scanning(),
            Action::HandleRecovery => self.handle_recovery(),
            Action::Unexpected => self.action_unexpected(event),
            Action::Nop => {}
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    fn request_ps(&mut self) {
        let (ps_request, send_null_data) = self
            .active
            .as_ref()
            .map(|request| (request.ps_request, request.send_null_data))
            .unwrap_or_default();

        info!(?ps_request, "Requesting driver mode from power server");

        match self.power.reserve_ps(ps_request, send_null_data) {
            PsCommandStatus::AlreadyInMode => {
                info!("Driver mode successful, continuing to scan");
                self.handle_event(ScanSrvEvent::PsSuccess);
            }
            PsCommandStatus::Pending | PsCommandStatus::Ok => {
                info!("Driver mode pending, waiting");
                self.handle_event(ScanSrvEvent::PsPend);
            }
            PsCommandStatus::Error => {
                // No entry was performed, so no exit either
                self.exit_from_driver_mode = false;

                if self.scan_on_driver_mode_failure {
                    info!("Driver mode failed, continuing to scan");
                    self.handle_event(ScanSrvEvent::PsSuccess);
                } else {
                    info!("Driver mode failed, aborting scan");
                    self.return_status = CompletionStatus::Failure;
                    self.handle_event(ScanSrvEvent::PsFail);
                }
            }
        }
    }

    fn start_scan(&mut self) {
        let Some(request) = self.active.as_ref() else {
            error!("Driver mode granted with no pending scan request");
            // Nothing was reserved for this cycle, so nothing may be released
            self.end_cycle();
            self.return_status = CompletionStatus::Failure;
            self.handle_event(ScanSrvEvent::ScanComplete);
            return;
        };

        let timeout = scan_timeout(&request.params, !self.dtim_overlapping, &self.config);
        if self.timer_running {
            self.timer.stop();
        }
        self.timer_running = true;
        self.timer.start(timeout);

        info!(
            scan_type = %request.params.scan_type,
            ?timeout,
            "Sending scan to HAL"
        );

        let result = if request.params.scan_type.is_sps() {
            self.hal.start_sps_scan(&request.params)
        } else {
            self.hal.start_scan(&request.params, request.high_priority)
        };

        if let Err(e) = result {
            error!(error = %e, "HAL rejected scan request, quitting scan");
            self.return_status = CompletionStatus::Failure;
            // Unwinds timer, driver mode and notification
            self.handle_event(ScanSrvEvent::ScanComplete);
        }
    }

    fn release_ps(&mut self) {
        self.stop_timer();

        if !self.exit_from_driver_mode {
            self.handle_event(ScanSrvEvent::PsSuccess);
            return;
        }

        let send_null_data = self
            .active
            .as_ref()
            .is_some_and(|request| request.send_null_data);

        info!("Releasing driver mode from power server");

        match self.power.release_ps(send_null_data) {
            PsCommandStatus::AlreadyInMode => {
                info!("Driver mode exit successful, scan done");
                self.handle_event(ScanSrvEvent::PsSuccess);
            }
            PsCommandStatus::Pending | PsCommandStatus::Ok => {
                info!("Driver mode exit pending, waiting");
            }
            PsCommandStatus::Error => {
                warn!("Driver mode exit failed, scan done");
                self.return_status = CompletionStatus::Failure;
                self.handle_event(ScanSrvEvent::PsFail);
            }
        }
    }

    fn notify_complete(&mut self) {
        self.end_cycle();

        let Some(request_id) = self.active.as_ref().map(ScanRequest::id) else {
            warn!("Scan cycle completed with no pending request");
            return;
        };

        let report = ScanCompleteReport {
            request_id,
            sps_scan_result: self.scan_result.sps_scan_result,
            tsf_error: self.scan_result.tsf_error,
            status: self.return_status,
            power_save_mode: PowerSaveMode::from_ps_on(self.power.is_power_save_on()),
            completed_at: Utc::now(),
        };

        info!(
            %request_id,
            status = %report.status,
            power_save_mode = ?report.power_save_mode,
            "Scan complete"
        );

        if self.in_request {
            self.deferred_report = Some(report);
        } else {
            self.deliver(report);
        }
    }

    fn handle_timer_expiry(&mut self) {
        // One-shot timer: it is no longer armed once it has fired
        self.timer_running = false;
        self.consecutive_no_scan_complete += 1;

        if self.consecutive_no_scan_complete >= self.config.no_scan_complete_to_recovery {
            error!(
                consecutive = self.consecutive_no_scan_complete,
                "Timer expired, starting recovery process"
            );
            self.consecutive_no_scan_complete = 0;
            self.return_status = CompletionStatus::Failure;
            self.reporter.report_failure(FailureKind::NoScanComplete);
        } else {
            error!(
                consecutive = self.consecutive_no_scan_complete,
                threshold = self.config.no_scan_complete_to_recovery,
                "Timer expired, still not calling recovery"
            );

            // A stop command frees firmware stuck on a loaded channel
            self.issue_stop_command();

            self.scan_result = ScanCompleteInfo::synthetic();
            self.handle_event(ScanSrvEvent::ScanComplete);
        }
    }

    fn ps_fail_while_scanning(&mut self) {
        info!("Driver mode lost while scanning, will not exit driver mode");
        self.exit_from_driver_mode = false;
    }

    fn handle_recovery(&mut self) {
        info!("FW reset event from outside");

        if self.timer_running {
            self.stop_timer();
        } else {
            warn!("External FW reset while timer is not running");
        }

        // Recovery owns driver mode and notification from here on
        self.end_cycle();
        if let Some(request) = self.active.take() {
            debug!(request_id = %request.id, "Abandoning request after FW reset");
        }
    }

    fn action_unexpected(&mut self, event: ScanSrvEvent) {
        let from = self
            .machine
            .last_transitions(1)
            .first()
            .map(|transition| transition.from);
        error!(?from, %event, "Scan SRV state machine error, unexpected event");

        self.stop_timer();
        self.end_cycle();

        // Callbacks may be stale once the machine is out of step
        if let Some(request) = self.active.take() {
            warn!(request_id = %request.id, "Dropping pending scan callbacks");
        }
        self.deferred_report = None;

        self.return_status = CompletionStatus::Failure;
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Forget the driver-mode bookkeeping of the cycle that just ended.
    fn end_cycle(&mut self) {
        self.exit_from_driver_mode = false;
        self.scan_on_driver_mode_failure = false;
    }

    fn stop_timer(&mut self) {
        if self.timer_running {
            self.timer.stop();
            self.timer_running = false;
        }
    }

    fn issue_stop_command(&mut self) {
        let sps = self
            .active
            .as_ref()
            .is_some_and(|request| request.params.scan_type.is_sps());

        if sps {
            self.hal.stop_sps_scan();
        } else {
            self.hal.stop_scan();
        }
    }

    fn deliver(&mut self, report: ScanCompleteReport) {
        let Some(mut request) = self.active.take() else {
            return;
        };

        if let Some(callback) = request.on_command_accepted.take() {
            callback(report.status.as_command_status());
        }

        if let Some(callback) = request.on_scan_complete.take() {
            callback(report);
        }
    }
}

impl<T, P, H, R> std::fmt::Debug for ScanService<T, P, H, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanService")
            .field("state", &self.machine.current_state())
            .field("return_status", &self.return_status)
            .field("timer_running", &self.timer_running)
            .field("exit_from_driver_mode", &self.exit_from_driver_mode)
            .field(
                "consecutive_no_scan_complete",
                &self.consecutive_no_scan_complete,
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use scansrv_core::{ChannelEntry, ScanParams, ScanType};
    use scansrv_hardware::mock::{
        MockFailureReporter, MockPowerSrv, MockPowerSrvHandle, MockScanCommands, MockTimer,
        MockTimerHandle,
    };

    type TestService = ScanService<MockTimer, MockPowerSrv, MockScanCommands, MockFailureReporter>;

    fn service() -> (TestService, MockTimerHandle, MockPowerSrvHandle) {
        let (timer, timer_handle) = MockTimer::new();
        let (power, power_handle) = MockPowerSrv::new();
        let (hal, _) = MockScanCommands::new();
        let (reporter, _) = MockFailureReporter::new();
        let service =
            ScanService::new(ScanSrvConfig::default(), timer, power, hal, reporter).unwrap();
        (service, timer_handle, power_handle)
    }

    fn request() -> ScanRequest {
        ScanRequest::new(
            ScanParams::new(ScanType::NormalPassive)
                .with_channel(ChannelEntry::basic(1, 10_000, 20_000)),
        )
    }

    #[test]
    fn test_new_service_is_idle() {
        let (service, _, _) = service();
        assert!(service.is_idle());
        assert!(!service.timer_running());
        assert_eq!(service.return_status(), CompletionStatus::Success);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let (timer, _) = MockTimer::new();
        let (power, _) = MockPowerSrv::new();
        let (hal, _) = MockScanCommands::new();
        let (reporter, _) = MockFailureReporter::new();
        let config = ScanSrvConfig::default().with_no_scan_complete_to_recovery(0);

        let result = ScanService::new(config, timer, power, hal, reporter);
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_second_request_is_busy() {
        let (mut service, _, _) = service();
        service.request_scan(request()).unwrap();
        assert_eq!(service.state(), ScanSrvState::Scanning);

        let result = service.request_scan(request());
        assert!(matches!(result, Err(Error::Busy { .. })));
        assert_eq!(service.state(), ScanSrvState::Scanning);
    }

    #[test]
    fn test_invalid_params_are_rejected_without_transition() {
        let (mut service, _, _) = service();
        let result = service.request_scan(ScanRequest::new(ScanParams::new(ScanType::NormalActive)));

        assert!(matches!(result, Err(Error::InvalidScanParams(_))));
        assert!(service.is_idle());
        assert!(service.history().is_empty());
    }

    #[test]
    fn test_dtim_overlap_shortens_timeout() {
        let (mut service, timer, _) = service();
        service.request_scan(request()).unwrap();
        let with_dtim = timer.last_duration().unwrap();
        service.scan_complete(ScanCompleteInfo::normal());

        service.set_dtim_overlapping(true);
        service.request_scan(request()).unwrap();
        let without_dtim = timer.last_duration().unwrap();

        assert_eq!(
            with_dtim - without_dtim,
            Duration::from_millis(service.config().dtim_period_ms)
        );
    }

    #[test]
    fn test_snapshot_reflects_cycle() {
        let (mut service, _, power) = service();
        power.push_reserve(PsCommandStatus::Pending);
        service.request_scan(request()).unwrap();

        let snapshot = service.snapshot();
        assert_eq!(snapshot.state, ScanSrvState::PsWait);
        assert!(snapshot.request_pending);
        assert!(snapshot.exit_from_driver_mode);
        assert!(!snapshot.timer_running);
    }

}
