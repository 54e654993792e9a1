//! Events processed by the runtime loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use scansrv_core::{
    CommandStatus, CompletionStatus, PsCallbackResult, Result, ScanCompleteInfo,
};
use scansrv_sm::{ScanRequest, ScanServiceSnapshot};

/// Input to the scan service runtime.
///
/// Callers send these through a [`ScanServiceHandle`](crate::ScanServiceHandle);
/// collaborators post completions through an [`EventSender`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ScanServiceEvent {
    /// Start a scan cycle and report the immediate status.
    RequestScan {
        request: ScanRequest,
        reply: oneshot::Sender<Result<CompletionStatus>>,
    },

    /// Stop the running scan.
    StopScan,

    /// The recovery module reset the firmware.
    FirmwareReset,

    /// Power server finished a reserve or release.
    PowerSaveComplete(PsCallbackResult),

    /// HAL mailbox acknowledged the scan command.
    CommandResponse(CommandStatus),

    /// Firmware reported scan completion.
    ScanComplete(ScanCompleteInfo),

    /// A guard timer armed with `ticket` fired.
    TimerExpired(TimerTicket),

    /// Update the DTIM overlap flag.
    SetDtimOverlapping(bool),

    /// Read the service state.
    Snapshot(oneshot::Sender<ScanServiceSnapshot>),

    /// Stop the runtime loop after acknowledging.
    Shutdown(oneshot::Sender<()>),
}

/// Sending side of the runtime event channel, for collaborators.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ScanServiceEvent>,
}

impl EventSender {
    pub(crate) fn new(tx: mpsc::Sender<ScanServiceEvent>) -> Self {
        Self { tx }
    }

    /// Post an event, waiting for channel capacity.
    ///
    /// Events posted after the runtime stopped are dropped with a warning.
    pub async fn post(&self, event: ScanServiceEvent) {
        if self.tx.send(event).await.is_err() {
            warn!("Scan service runtime stopped, dropping event");
        }
    }

    /// Post `event` from a new task after `delay`.
    ///
    /// Returns the task handle so the caller can cancel the delivery.
    pub fn post_after(
        &self,
        delay: std::time::Duration,
        event: ScanServiceEvent,
    ) -> tokio::task::JoinHandle<()> {
        let sender = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sender.post(event).await;
        })
    }
}

/// Identifies one arming of a guard timer.
///
/// Every start or stop of the timer moves its generation forward, so an
/// expiry already queued when the timer was stopped or restarted is
/// recognised as stale.
#[derive(Debug, Clone)]
pub struct TimerTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl TimerTicket {
    pub(crate) fn new(generation: u64, current: Arc<AtomicU64>) -> Self {
        Self {
            generation,
            current,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the timer has not been stopped or restarted since this ticket
    /// was issued.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }
}
