//! Mock power server.
//!
//! Answers reserve/release calls from scripted queues, falling back to a
//! configurable default answer, and records every call it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scansrv_core::{PsCommandStatus, PsRequest};

use super::lock;
use crate::traits::PowerSaveService;

/// A call received by the mock power server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSrvCall {
    Reserve {
        request: PsRequest,
        send_null_data: bool,
    },
    Release {
        send_null_data: bool,
    },
}

#[derive(Debug)]
struct PowerSrvState {
    reserve_script: VecDeque<PsCommandStatus>,
    release_script: VecDeque<PsCommandStatus>,
    default_reserve: PsCommandStatus,
    default_release: PsCommandStatus,
    power_save_on: bool,
    calls: Vec<PowerSrvCall>,
}

impl Default for PowerSrvState {
    fn default() -> Self {
        Self {
            reserve_script: VecDeque::new(),
            release_script: VecDeque::new(),
            default_reserve: PsCommandStatus::AlreadyInMode,
            default_release: PsCommandStatus::AlreadyInMode,
            power_save_on: false,
            calls: Vec::new(),
        }
    }
}

/// Mock power server.
///
/// By default every reserve and release completes synchronously
/// ([`PsCommandStatus::AlreadyInMode`]).
///
/// # Examples
///
/// ```
/// use scansrv_core::{PsCommandStatus, PsRequest};
/// use scansrv_hardware::mock::MockPowerSrv;
/// use scansrv_hardware::traits::PowerSaveService;
///
/// let (mut power, handle) = MockPowerSrv::new();
/// handle.push_reserve(PsCommandStatus::Pending);
///
/// assert_eq!(power.reserve_ps(PsRequest::KeepCurrent, false), PsCommandStatus::Pending);
/// assert_eq!(power.reserve_ps(PsRequest::KeepCurrent, false), PsCommandStatus::AlreadyInMode);
/// assert_eq!(handle.reserve_count(), 2);
/// ```
#[derive(Debug)]
pub struct MockPowerSrv {
    state: Arc<Mutex<PowerSrvState>>,
}

impl MockPowerSrv {
    /// Create a new mock power server and its control handle.
    pub fn new() -> (Self, MockPowerSrvHandle) {
        let state = Arc::new(Mutex::new(PowerSrvState::default()));
        let handle = MockPowerSrvHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }
}

impl PowerSaveService for MockPowerSrv {
    fn reserve_ps(&mut self, request: PsRequest, send_null_data: bool) -> PsCommandStatus {
        let mut state = lock(&self.state);
        state.calls.push(PowerSrvCall::Reserve {
            request,
            send_null_data,
        });
        let default = state.default_reserve;
        state.reserve_script.pop_front().unwrap_or(default)
    }

    fn release_ps(&mut self, send_null_data: bool) -> PsCommandStatus {
        let mut state = lock(&self.state);
        state.calls.push(PowerSrvCall::Release { send_null_data });
        let default = state.default_release;
        state.release_script.pop_front().unwrap_or(default)
    }

    fn is_power_save_on(&self) -> bool {
        lock(&self.state).power_save_on
    }
}

/// Handle for scripting and inspecting a [`MockPowerSrv`].
#[derive(Debug, Clone)]
pub struct MockPowerSrvHandle {
    state: Arc<Mutex<PowerSrvState>>,
}

impl MockPowerSrvHandle {
    /// Queue the answer for the next reserve call.
    pub fn push_reserve(&self, status: PsCommandStatus) {
        lock(&self.state).reserve_script.push_back(status);
    }

    /// Queue the answer for the next release call.
    pub fn push_release(&self, status: PsCommandStatus) {
        lock(&self.state).release_script.push_back(status);
    }

    /// Answer used for reserve calls once the script is exhausted.
    pub fn set_default_reserve(&self, status: PsCommandStatus) {
        lock(&self.state).default_reserve = status;
    }

    /// Answer used for release calls once the script is exhausted.
    pub fn set_default_release(&self, status: PsCommandStatus) {
        lock(&self.state).default_release = status;
    }

    /// Set the value reported by `is_power_save_on`.
    pub fn set_power_save_on(&self, on: bool) {
        lock(&self.state).power_save_on = on;
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<PowerSrvCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of reserve calls received.
    pub fn reserve_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| matches!(call, PowerSrvCall::Reserve { .. }))
            .count()
    }

    /// Number of release calls received.
    pub fn release_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| matches!(call, PowerSrvCall::Release { .. }))
            .count()
    }
}
