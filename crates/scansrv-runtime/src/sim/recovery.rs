//! Simulated recovery module.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::warn;

use scansrv_core::FailureKind;
use scansrv_hardware::FailureReporter;

use crate::event::{EventSender, ScanServiceEvent};

/// Recovery module that "resets" the firmware after every failure report
/// and then notifies the scan service.
#[derive(Debug)]
pub struct SimulatedRecovery {
    events: EventSender,
    latency: Duration,
    resets: Arc<AtomicUsize>,
}

impl SimulatedRecovery {
    pub fn new(events: EventSender, latency: Duration) -> Self {
        Self {
            events,
            latency,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of resets triggered so far.
    pub fn reset_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

impl FailureReporter for SimulatedRecovery {
    fn report_failure(&mut self, kind: FailureKind) {
        let count = self.resets.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(%kind, resets = count, "Failure reported, resetting firmware");

        self.events
            .post_after(self.latency, ScanServiceEvent::FirmwareReset);
    }
}
