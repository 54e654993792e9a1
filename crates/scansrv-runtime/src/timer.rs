//! Guard timer backed by tokio.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use scansrv_hardware::ScanTimer;

use crate::event::{EventSender, ScanServiceEvent, TimerTicket};

/// [`ScanTimer`] that posts [`ScanServiceEvent::TimerExpired`] to the runtime.
///
/// Must be started from within a tokio runtime (the runtime loop calls it).
#[derive(Debug)]
pub struct TokioScanTimer {
    events: EventSender,
    generation: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl TokioScanTimer {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            generation: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Generation of the most recent start or stop.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn invalidate(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl ScanTimer for TokioScanTimer {
    fn start(&mut self, duration: Duration) {
        let generation = self.invalidate();
        trace!(generation, ?duration, "Guard timer armed");

        let ticket = TimerTicket::new(generation, Arc::clone(&self.generation));
        self.task = Some(
            self.events
                .post_after(duration, ScanServiceEvent::TimerExpired(ticket)),
        );
    }

    fn stop(&mut self) {
        let generation = self.invalidate();
        trace!(generation, "Guard timer disarmed");
    }
}

impl Drop for TokioScanTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn timer() -> (TokioScanTimer, mpsc::Receiver<ScanServiceEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (TokioScanTimer::new(EventSender::new(tx)), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_is_posted_with_current_ticket() {
        let (mut timer, mut rx) = timer();
        timer.start(Duration::from_millis(500));

        match rx.recv().await {
            Some(ScanServiceEvent::TimerExpired(ticket)) => {
                assert!(ticket.is_current());
                assert_eq!(ticket.generation(), timer.generation());
            }
            other => panic!("expected timer expiry, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_expiry() {
        let (mut timer, mut rx) = timer();
        timer.start(Duration::from_millis(500));
        timer.stop();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_makes_old_ticket_stale() {
        let (mut timer, mut rx) = timer();
        timer.start(Duration::from_millis(10));

        // Let the first expiry reach the channel before restarting
        tokio::time::sleep(Duration::from_millis(20)).await;
        timer.start(Duration::from_millis(500));

        match rx.recv().await {
            Some(ScanServiceEvent::TimerExpired(ticket)) => assert!(!ticket.is_current()),
            other => panic!("expected timer expiry, got {:?}", other),
        }
        match rx.recv().await {
            Some(ScanServiceEvent::TimerExpired(ticket)) => assert!(ticket.is_current()),
            other => panic!("expected timer expiry, got {:?}", other),
        }
    }
}
