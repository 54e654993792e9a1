//! Collaborator trait definitions.
//!
//! This module defines the interfaces the scan service consumes: the guard
//! timer, the power server, the HAL scan command layer, and the failure
//! reporter. They establish the contract between the scan state machine and
//! the rest of the driver, enabling substitution between mock, simulated and
//! real implementations.
//!
//! All methods are synchronous and must return promptly. Operations whose
//! outcome is only known later (power-save transitions, command mailbox
//! acknowledgements, scan completion, timer expiry) report that outcome by
//! calling the matching entry point on the scan service, never by calling
//! back from inside the trait method itself.

use std::time::Duration;

use scansrv_core::{FailureKind, PsCommandStatus, PsRequest, ScanParams};

use crate::error::Result;

/// Single-shot guard timer.
///
/// Expiry is reported to the scan service as a timer-expired event. Starting
/// an already-running timer restarts it; stopping a stopped timer is a no-op.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scansrv_hardware::traits::ScanTimer;
/// use scansrv_hardware::mock::MockTimer;
///
/// let (mut timer, handle) = MockTimer::new();
/// timer.start(Duration::from_millis(500));
/// assert!(handle.is_running());
///
/// timer.stop();
/// assert!(!handle.is_running());
/// ```
pub trait ScanTimer {
    /// Arm the timer to fire once after `duration`.
    fn start(&mut self, duration: Duration);

    /// Disarm the timer.
    fn stop(&mut self);
}

/// Power server: arbitrates driver mode between its clients.
///
/// `reserve_ps` and `release_ps` return [`PsCommandStatus::AlreadyInMode`]
/// when the transition is already complete, [`PsCommandStatus::Pending`] or
/// [`PsCommandStatus::Ok`] when the outcome will be delivered later, and
/// [`PsCommandStatus::Error`] on immediate failure.
pub trait PowerSaveService {
    /// Reserve driver mode, entering the requested power-save mode.
    fn reserve_ps(&mut self, request: PsRequest, send_null_data: bool) -> PsCommandStatus;

    /// Release a previous reservation.
    fn release_ps(&mut self, send_null_data: bool) -> PsCommandStatus;

    /// Whether the station is currently in 802.11 power save.
    fn is_power_save_on(&self) -> bool;
}

/// HAL scan command layer.
///
/// A successful return from `start_scan` / `start_sps_scan` means the command
/// was queued to the firmware. The mailbox acknowledgement and the final scan
/// completion are reported separately.
pub trait ScanCommands {
    /// Issue a normal or triggered scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the HAL rejects the command synchronously.
    fn start_scan(&mut self, params: &ScanParams, high_priority: bool) -> Result<()>;

    /// Issue a scheduled power-save scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the HAL rejects the command synchronously.
    fn start_sps_scan(&mut self, params: &ScanParams) -> Result<()>;

    /// Abort a running normal scan. Fire-and-forget.
    fn stop_scan(&mut self);

    /// Abort a running SPS scan. Fire-and-forget.
    fn stop_sps_scan(&mut self);
}

/// Recovery module entry point.
pub trait FailureReporter {
    /// Report a failure. The reporter decides whether to reset the hardware.
    fn report_failure(&mut self, kind: FailureKind);
}
