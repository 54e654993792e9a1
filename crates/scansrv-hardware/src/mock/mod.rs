//! Mock collaborator implementations for testing and development.
//!
//! Each mock comes paired with a cloneable handle. The mock is moved into the
//! scan service; the handle stays with the test to script responses and
//! inspect the calls the service made.

pub mod hal;
pub mod power;
pub mod reporter;
pub mod timer;

// Re-export commonly used types
pub use hal::{MockScanCommands, MockScanCommandsHandle, ScanCommandCall};
pub use power::{MockPowerSrv, MockPowerSrvHandle, PowerSrvCall};
pub use reporter::{MockFailureReporter, MockFailureReporterHandle};
pub use timer::{MockTimer, MockTimerHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock shared mock state, ignoring poisoning from a panicked test thread.
fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
