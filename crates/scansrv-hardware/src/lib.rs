//! Collaborator abstractions for the WLAN scan service.
//!
//! The scan state machine never talks to hardware directly. It drives four
//! collaborators through the traits in [`traits`]:
//!
//! - [`ScanTimer`]: single-shot guard timer for the running scan
//! - [`PowerSaveService`]: the power server that grants driver mode
//! - [`ScanCommands`]: the HAL scan command layer
//! - [`FailureReporter`]: the recovery module
//!
//! # Completion Model
//!
//! Trait methods only *start* an operation. Outcomes that arrive later are
//! fed back into the scan service through its completion entry points, so
//! that every event runs to completion on the service's own call stack and
//! no collaborator ever re-enters the state machine from inside one of these
//! methods.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides scriptable implementations of every trait,
//! each paired with a handle used by tests to queue answers and inspect
//! recorded calls:
//!
//! ```
//! use scansrv_core::{PsCommandStatus, PsRequest};
//! use scansrv_hardware::mock::MockPowerSrv;
//! use scansrv_hardware::traits::PowerSaveService;
//!
//! let (mut power, handle) = MockPowerSrv::new();
//! handle.push_reserve(PsCommandStatus::Error);
//!
//! assert_eq!(power.reserve_ps(PsRequest::PowerSaveOff, true), PsCommandStatus::Error);
//! ```
//!
//! [`ScanTimer`]: traits::ScanTimer
//! [`PowerSaveService`]: traits::PowerSaveService
//! [`ScanCommands`]: traits::ScanCommands
//! [`FailureReporter`]: traits::FailureReporter

pub mod error;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::{FailureReporter, PowerSaveService, ScanCommands, ScanTimer};
