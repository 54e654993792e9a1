//! Simulated power server.

use std::time::Duration;

use tracing::debug;

use scansrv_core::{PsCallbackResult, PsCommandStatus, PsRequest};
use scansrv_hardware::PowerSaveService;

use crate::event::{EventSender, ScanServiceEvent};

/// Power server that grants every reservation after a fixed latency.
///
/// With zero latency, reservations and releases complete synchronously
/// (`AlreadyInMode`); otherwise they return `Pending` and the outcome is
/// posted as [`ScanServiceEvent::PowerSaveComplete`].
#[derive(Debug)]
pub struct SimulatedPowerSrv {
    events: EventSender,
    latency: Duration,
    power_save_on: bool,
    saved_power_save_on: Option<bool>,
}

impl SimulatedPowerSrv {
    pub fn new(events: EventSender, latency: Duration) -> Self {
        Self {
            events,
            latency,
            power_save_on: false,
            saved_power_save_on: None,
        }
    }

    fn complete(&self) -> PsCommandStatus {
        if self.latency.is_zero() {
            return PsCommandStatus::AlreadyInMode;
        }

        self.events.post_after(
            self.latency,
            ScanServiceEvent::PowerSaveComplete(PsCallbackResult::Success),
        );
        PsCommandStatus::Pending
    }
}

impl PowerSaveService for SimulatedPowerSrv {
    fn reserve_ps(&mut self, request: PsRequest, send_null_data: bool) -> PsCommandStatus {
        debug!(?request, send_null_data, "Simulated driver mode reserve");

        self.saved_power_save_on = Some(self.power_save_on);
        match request {
            PsRequest::PowerSaveOn => self.power_save_on = true,
            PsRequest::PowerSaveOff => self.power_save_on = false,
            PsRequest::KeepCurrent => {}
        }

        self.complete()
    }

    fn release_ps(&mut self, send_null_data: bool) -> PsCommandStatus {
        debug!(send_null_data, "Simulated driver mode release");

        if let Some(previous) = self.saved_power_save_on.take() {
            self.power_save_on = previous;
        }

        self.complete()
    }

    fn is_power_save_on(&self) -> bool {
        self.power_save_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_pending_reserve_posts_success() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut power = SimulatedPowerSrv::new(EventSender::new(tx), Duration::from_millis(5));

        assert_eq!(
            power.reserve_ps(PsRequest::PowerSaveOn, false),
            PsCommandStatus::Pending
        );
        assert!(power.is_power_save_on());

        assert!(matches!(
            rx.recv().await,
            Some(ScanServiceEvent::PowerSaveComplete(PsCallbackResult::Success))
        ));
    }

    #[tokio::test]
    async fn test_zero_latency_is_synchronous_and_restores_mode() {
        let (tx, _rx) = mpsc::channel(4);
        let mut power = SimulatedPowerSrv::new(EventSender::new(tx), Duration::ZERO);

        assert_eq!(
            power.reserve_ps(PsRequest::PowerSaveOn, true),
            PsCommandStatus::AlreadyInMode
        );
        assert!(power.is_power_save_on());

        assert_eq!(power.release_ps(true), PsCommandStatus::AlreadyInMode);
        assert!(!power.is_power_save_on());
    }
}
