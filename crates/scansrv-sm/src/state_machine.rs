//! Scan service state machine engine.
//!
//! This module holds the transition table of the scan service and the
//! bookkeeping around it: the current state and a bounded history of recent
//! transitions. It decides *where* the machine goes and *which* action runs;
//! the actions themselves live in [`ScanService`](crate::ScanService).
//!
//! # States
//!
//! - `Idle`: no scan in progress (initial state, re-entered after every cycle)
//! - `PsWait`: waiting for the power server to grant driver mode
//! - `Scanning`: scan command issued, waiting for completion or timeout
//! - `Stopping`: a stop was requested, waiting for the scan (or PS) to settle
//! - `PsExit`: waiting for the power server to release driver mode
//!
//! # Transition Table
//!
//! | State | RequestPs | PsFail | PsSuccess | PsPend | StopScan | FwReset | TimerExpired | ScanComplete |
//! |---|---|---|---|---|---|---|---|---|
//! | Idle | PsWait, request PS | * | Scanning, start scan | * | Idle | Idle | * | * |
//! | PsWait | * | PsExit, release PS | Scanning, start scan | PsWait | Stopping | Idle, recovery | * | * |
//! | Scanning | * | Scanning, PS fail while scanning | * | * | Stopping | Idle, recovery | Scanning, timer expiry | PsExit, release PS |
//! | Stopping | * | PsExit, release PS | PsExit, release PS | * | Stopping | Idle, recovery | Stopping, timer expiry | PsExit, release PS |
//! | PsExit | * | Idle, notify | Idle, notify | PsExit | PsExit | Idle, recovery | * | * |
//!
//! `*` marks an unexpected event: the machine returns to `Idle` and runs the
//! unexpected-event action.
//!
//! # Examples
//!
//! ```
//! use scansrv_sm::{Action, ScanSrvEvent, ScanSrvState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! assert_eq!(machine.process(ScanSrvEvent::RequestPs), Action::RequestPs);
//! assert_eq!(machine.current_state(), ScanSrvState::PsWait);
//!
//! assert_eq!(machine.process(ScanSrvEvent::PsPend), Action::Nop);
//! assert_eq!(machine.current_state(), ScanSrvState::PsWait);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use scansrv_core::constants::DEFAULT_HISTORY_SIZE;

/// States of the scan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSrvState {
    /// No scan in progress.
    #[default]
    Idle,

    /// Waiting for driver mode.
    PsWait,

    /// Scan command issued to the firmware.
    Scanning,

    /// Stop requested, waiting for the cycle to unwind.
    Stopping,

    /// Waiting for driver mode to be released.
    PsExit,
}

impl fmt::Display for ScanSrvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            ScanSrvState::Idle => "Idle",
            ScanSrvState::PsWait => "PsWait",
            ScanSrvState::Scanning => "Scanning",
            ScanSrvState::Stopping => "Stopping",
            ScanSrvState::PsExit => "PsExit",
        };
        write!(f, "{}", state_str)
    }
}

impl ScanSrvState {
    /// All states, in table order.
    pub const ALL: [ScanSrvState; 5] = [
        ScanSrvState::Idle,
        ScanSrvState::PsWait,
        ScanSrvState::Scanning,
        ScanSrvState::Stopping,
        ScanSrvState::PsExit,
    ];

    /// Whether the guard timer may legitimately be armed in this state.
    pub fn allows_timer(&self) -> bool {
        matches!(self, ScanSrvState::Scanning | ScanSrvState::Stopping)
    }
}

/// Events consumed by the scan service state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanSrvEvent {
    /// A scan request asks for driver mode.
    RequestPs,
    /// The power server failed to enter or exit driver mode.
    PsFail,
    /// The power server entered or exited driver mode.
    PsSuccess,
    /// The power server transition is still in progress.
    PsPend,
    /// The caller asked to stop the scan.
    StopScan,
    /// The firmware was reset by the recovery module.
    FwReset,
    /// The scan guard timer expired.
    TimerExpired,
    /// The scan finished (really, synthetically, or after a rejection).
    ScanComplete,
}

impl ScanSrvEvent {
    /// All events, in table order.
    pub const ALL: [ScanSrvEvent; 8] = [
        ScanSrvEvent::RequestPs,
        ScanSrvEvent::PsFail,
        ScanSrvEvent::PsSuccess,
        ScanSrvEvent::PsPend,
        ScanSrvEvent::StopScan,
        ScanSrvEvent::FwReset,
        ScanSrvEvent::TimerExpired,
        ScanSrvEvent::ScanComplete,
    ];
}

impl fmt::Display for ScanSrvEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let event_str = match self {
            ScanSrvEvent::RequestPs => "RequestPs",
            ScanSrvEvent::PsFail => "PsFail",
            ScanSrvEvent::PsSuccess => "PsSuccess",
            ScanSrvEvent::PsPend => "PsPend",
            ScanSrvEvent::StopScan => "StopScan",
            ScanSrvEvent::FwReset => "FwReset",
            ScanSrvEvent::TimerExpired => "TimerExpired",
            ScanSrvEvent::ScanComplete => "ScanComplete",
        };
        write!(f, "{}", event_str)
    }
}

/// Action run after a transition has been committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Ask the power server for driver mode.
    RequestPs,
    /// Arm the guard timer and issue the scan command.
    StartScan,
    /// Stop the timer and release driver mode if it was entered.
    ReleasePs,
    /// Deliver the completion callbacks.
    NotifyComplete,
    /// Retry or escalate a missing scan completion.
    TimerExpiry,
    /// Driver mode was lost while scanning.
    PsFailWhileScanning,
    /// Clean up after an external firmware reset.
    HandleRecovery,
    /// Event not valid in the current state.
    Unexpected,
    /// Nothing to do.
    Nop,
}

/// Look up the next state and action for `event` in `state`.
///
/// # Examples
///
/// ```
/// use scansrv_sm::{Action, ScanSrvEvent, ScanSrvState, transition};
///
/// assert_eq!(
///     transition(ScanSrvState::Scanning, ScanSrvEvent::ScanComplete),
///     (ScanSrvState::PsExit, Action::ReleasePs)
/// );
/// assert_eq!(
///     transition(ScanSrvState::PsExit, ScanSrvEvent::TimerExpired),
///     (ScanSrvState::Idle, Action::Unexpected)
/// );
/// ```
pub fn transition(state: ScanSrvState, event: ScanSrvEvent) -> (ScanSrvState, Action) {
    use Action as A;
    use ScanSrvEvent as E;
    use ScanSrvState as S;

    match (state, event) {
        // From Idle
        (S::Idle, E::RequestPs) => (S::PsWait, A::RequestPs),
        (S::Idle, E::PsSuccess) => (S::Scanning, A::StartScan),
        (S::Idle, E::StopScan | E::FwReset) => (S::Idle, A::Nop),

        // From PsWait
        (S::PsWait, E::PsFail) => (S::PsExit, A::ReleasePs),
        (S::PsWait, E::PsSuccess) => (S::Scanning, A::StartScan),
        (S::PsWait, E::PsPend) => (S::PsWait, A::Nop),
        (S::PsWait, E::StopScan) => (S::Stopping, A::Nop),

        // From Scanning
        (S::Scanning, E::PsFail) => (S::Scanning, A::PsFailWhileScanning),
        (S::Scanning, E::StopScan) => (S::Stopping, A::Nop),
        (S::Scanning, E::TimerExpired) => (S::Scanning, A::TimerExpiry),
        (S::Scanning, E::ScanComplete) => (S::PsExit, A::ReleasePs),

        // From Stopping
        (S::Stopping, E::PsFail | E::PsSuccess | E::ScanComplete) => (S::PsExit, A::ReleasePs),
        (S::Stopping, E::StopScan) => (S::Stopping, A::Nop),
        (S::Stopping, E::TimerExpired) => (S::Stopping, A::TimerExpiry),

        // From PsExit
        (S::PsExit, E::PsFail | E::PsSuccess) => (S::Idle, A::NotifyComplete),
        (S::PsExit, E::PsPend | E::StopScan) => (S::PsExit, A::Nop),

        // Firmware reset is handled the same way from every busy state
        (S::PsWait | S::Scanning | S::Stopping | S::PsExit, E::FwReset) => {
            (S::Idle, A::HandleRecovery)
        }

        _ => (S::Idle, A::Unexpected),
    }
}

/// A single committed transition with timestamp.
///
/// # Serialization Note
///
/// The `timestamp` field is not serialized as `Instant` is process-specific.
/// When deserializing, the timestamp will be set to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: ScanSrvState,

    /// The event that caused the transition.
    pub event: ScanSrvEvent,

    /// The state transitioned to.
    pub to: ScanSrvState,

    /// The action run for this transition.
    pub action: Action,

    /// When the transition occurred.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    /// Create a new transition record stamped with the current time.
    pub fn new(from: ScanSrvState, event: ScanSrvEvent, to: ScanSrvState, action: Action) -> Self {
        Self {
            from,
            event,
            to,
            action,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Table-driven state machine with a bounded transition history.
///
/// The machine commits the next state *before* returning the action, so an
/// action that feeds a new event back in sees the new state.
///
/// # Thread Safety
///
/// This struct is not thread-safe by design. It is owned by a single
/// [`ScanService`](crate::ScanService), which is itself driven from one
/// event loop.
#[derive(Debug)]
pub struct StateMachine {
    /// Current state.
    current_state: ScanSrvState,

    /// History of transitions (limited to `history_capacity`).
    history: VecDeque<StateTransition>,

    /// Maximum number of transitions kept.
    history_capacity: usize,
}

impl StateMachine {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for constructing a state machine with custom configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use scansrv_sm::{ScanSrvState, StateMachine};
    ///
    /// let machine = StateMachine::builder()
    ///     .with_initial_state(ScanSrvState::Scanning)
    ///     .with_history_capacity(8)
    ///     .build();
    ///
    /// assert_eq!(machine.current_state(), ScanSrvState::Scanning);
    /// ```
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::default()
    }

    /// Get the current state.
    pub fn current_state(&self) -> ScanSrvState {
        self.current_state
    }

    /// Get the transition history, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last N transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Consume an event: commit the next state and return the action to run.
    pub fn process(&mut self, event: ScanSrvEvent) -> Action {
        let from = self.current_state;
        let (to, action) = transition(from, event);

        debug!(%from, %event, %to, ?action, "scan SRV transition");

        self.current_state = to;
        self.add_to_history(StateTransition::new(from, event, to, action));

        action
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(transition);
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`StateMachine`].
#[derive(Debug)]
pub struct StateMachineBuilder {
    initial_state: ScanSrvState,
    history_capacity: usize,
}

impl StateMachineBuilder {
    /// Set the initial state (defaults to `Idle`).
    pub fn with_initial_state(mut self, state: ScanSrvState) -> Self {
        self.initial_state = state;
        self
    }

    /// Set the history capacity (at least 1).
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    /// Build the state machine.
    pub fn build(self) -> StateMachine {
        StateMachine {
            current_state: self.initial_state,
            history: VecDeque::with_capacity(self.history_capacity),
            history_capacity: self.history_capacity,
        }
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self {
            initial_state: ScanSrvState::Idle,
            history_capacity: DEFAULT_HISTORY_SIZE,
        }
    }
}
