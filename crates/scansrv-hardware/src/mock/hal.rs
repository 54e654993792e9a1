//! Mock HAL scan command layer.
//!
//! Records every scan command and can be told to reject the next start
//! commands synchronously.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scansrv_core::ScanParams;

use super::lock;
use crate::error::{HardwareError, Result};
use crate::traits::ScanCommands;

/// A command received by the mock HAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanCommandCall {
    StartScan {
        params: ScanParams,
        high_priority: bool,
    },
    StartSpsScan {
        params: ScanParams,
    },
    StopScan,
    StopSpsScan,
}

#[derive(Debug, Default)]
struct HalState {
    rejections: VecDeque<HardwareError>,
    calls: Vec<ScanCommandCall>,
}

/// Mock HAL that accepts every command unless a rejection is queued.
///
/// # Examples
///
/// ```
/// use scansrv_core::{ChannelEntry, ScanParams, ScanType};
/// use scansrv_hardware::HardwareError;
/// use scansrv_hardware::mock::MockScanCommands;
/// use scansrv_hardware::traits::ScanCommands;
///
/// let (mut hal, handle) = MockScanCommands::new();
/// let params = ScanParams::new(ScanType::NormalPassive)
///     .with_channel(ChannelEntry::basic(6, 10_000, 20_000));
///
/// handle.reject_next(HardwareError::busy("StartScan"));
/// assert!(hal.start_scan(&params, false).is_err());
/// assert!(hal.start_scan(&params, false).is_ok());
/// assert_eq!(handle.start_count(), 2);
/// ```
#[derive(Debug)]
pub struct MockScanCommands {
    state: Arc<Mutex<HalState>>,
}

impl MockScanCommands {
    /// Create a new mock HAL and its control handle.
    pub fn new() -> (Self, MockScanCommandsHandle) {
        let state = Arc::new(Mutex::new(HalState::default()));
        let handle = MockScanCommandsHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }

    fn accept_or_reject(state: &mut HalState) -> Result<()> {
        match state.rejections.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl ScanCommands for MockScanCommands {
    fn start_scan(&mut self, params: &ScanParams, high_priority: bool) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(ScanCommandCall::StartScan {
            params: params.clone(),
            high_priority,
        });
        Self::accept_or_reject(&mut state)
    }

    fn start_sps_scan(&mut self, params: &ScanParams) -> Result<()> {
        let mut state = lock(&self.state);
        state.calls.push(ScanCommandCall::StartSpsScan {
            params: params.clone(),
        });
        Self::accept_or_reject(&mut state)
    }

    fn stop_scan(&mut self) {
        lock(&self.state).calls.push(ScanCommandCall::StopScan);
    }

    fn stop_sps_scan(&mut self) {
        lock(&self.state).calls.push(ScanCommandCall::StopSpsScan);
    }
}

/// Handle for scripting and inspecting a [`MockScanCommands`].
#[derive(Debug, Clone)]
pub struct MockScanCommandsHandle {
    state: Arc<Mutex<HalState>>,
}

impl MockScanCommandsHandle {
    /// Reject the next start command with `error`.
    pub fn reject_next(&self, error: HardwareError) {
        lock(&self.state).rejections.push_back(error);
    }

    /// All commands received so far, oldest first.
    pub fn calls(&self) -> Vec<ScanCommandCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of start commands (normal and SPS) received.
    pub fn start_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    ScanCommandCall::StartScan { .. } | ScanCommandCall::StartSpsScan { .. }
                )
            })
            .count()
    }

    /// Number of stop commands (normal and SPS) received.
    pub fn stop_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    ScanCommandCall::StopScan | ScanCommandCall::StopSpsScan
                )
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scansrv_core::{ChannelEntry, ScanType};

    #[test]
    fn test_sps_commands_are_recorded() {
        let (mut hal, handle) = MockScanCommands::new();
        let params = ScanParams::new(ScanType::Sps).with_channel(ChannelEntry::sps(1, 0, 10_000));

        hal.start_sps_scan(&params).unwrap();
        hal.stop_sps_scan();

        assert_eq!(
            handle.calls(),
            vec![
                ScanCommandCall::StartSpsScan { params },
                ScanCommandCall::StopSpsScan
            ]
        );
        assert_eq!(handle.start_count(), 1);
        assert_eq!(handle.stop_count(), 1);
    }
}
