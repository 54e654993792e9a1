//! WLAN scan service state machine.
//!
//! This crate contains the scan service (`ScanSrvSM`): the state machine
//! that coordinates driver mode with the power server, issues scan commands
//! to the HAL, guards each scan with a timer, and escalates repeated missing
//! scan completions to the recovery module.
//!
//! - [`state_machine`]: the pure transition table and its bookkeeping
//! - [`service`]: the actions run on each transition, and the public API
//! - [`timeout`]: guard timer sizing
//! - [`request`]: scan requests and their completion callbacks
//! - [`config`]: tunables loaded from JSON

pub mod config;
pub mod request;
pub mod service;
pub mod state_machine;
pub mod timeout;

pub use config::ScanSrvConfig;
pub use request::{CommandAcceptedCallback, ScanCompleteCallback, ScanRequest};
pub use service::{ScanService, ScanServiceSnapshot};
pub use state_machine::{
    Action, ScanSrvEvent, ScanSrvState, StateMachine, StateMachineBuilder, StateTransition,
    transition,
};
pub use timeout::scan_timeout;
