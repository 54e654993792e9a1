//! Tokio host for the WLAN scan service.
//!
//! This crate runs a [`ScanService`](scansrv_sm::ScanService) on its own
//! task and provides async-native collaborators for it:
//!
//! - [`runtime`]: the event loop and the [`ScanServiceHandle`] used to talk to it
//! - [`timer`]: a guard timer built on `tokio::time`
//! - [`sim`]: simulated power server, HAL and recovery module
//! - [`event`]: the events carried by the loop's channel

pub mod event;
pub mod runtime;
pub mod sim;
pub mod timer;

pub use event::{EventSender, ScanServiceEvent, TimerTicket};
pub use runtime::{RuntimeConfig, ScanServiceHandle, ScanServiceRuntime};
pub use timer::TokioScanTimer;
