//! Simulated HAL scan command layer.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scansrv_core::{ChannelTiming, CommandStatus, ScanCompleteInfo, ScanParams};
use scansrv_hardware::{HardwareError, ScanCommands};

use crate::event::{EventSender, ScanServiceEvent};

/// HAL that "scans" for the sum of the channel dwell times.
///
/// Each start command is acknowledged after `ack_latency`, then completion is
/// posted once the simulated dwell time has elapsed. A hung firmware
/// acknowledges commands but never completes them.
#[derive(Debug)]
pub struct SimulatedHal {
    events: EventSender,
    ack_latency: Duration,
    firmware_hang: bool,
    in_flight: Option<JoinHandle<()>>,
}

impl SimulatedHal {
    pub fn new(events: EventSender, ack_latency: Duration) -> Self {
        Self {
            events,
            ack_latency,
            firmware_hang: false,
            in_flight: None,
        }
    }

    /// Make the firmware swallow scan commands without completing them.
    pub fn with_firmware_hang(mut self, hang: bool) -> Self {
        self.firmware_hang = hang;
        self
    }

    fn launch(&mut self, params: &ScanParams) {
        self.cancel_in_flight();

        let events = self.events.clone();
        let ack_latency = self.ack_latency;
        let duration = scan_duration(params);
        let info = completion_info(params);
        let hang = self.firmware_hang;

        self.in_flight = Some(tokio::spawn(async move {
            tokio::time::sleep(ack_latency).await;
            events
                .post(ScanServiceEvent::CommandResponse(CommandStatus::Accepted))
                .await;

            if hang {
                return;
            }

            tokio::time::sleep(duration).await;
            events.post(ScanServiceEvent::ScanComplete(info)).await;
        }));
    }

    fn halt(&mut self) {
        self.cancel_in_flight();

        if self.firmware_hang {
            warn!("Simulated firmware hung, ignoring stop");
            return;
        }

        // Firmware reports the aborted scan as complete
        self.in_flight = Some(self.events.post_after(
            self.ack_latency,
            ScanServiceEvent::ScanComplete(ScanCompleteInfo::normal()),
        ));
    }

    fn cancel_in_flight(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

impl ScanCommands for SimulatedHal {
    fn start_scan(
        &mut self,
        params: &ScanParams,
        high_priority: bool,
    ) -> scansrv_hardware::Result<()> {
        if params.scan_type.is_sps() {
            return Err(HardwareError::rejected(
                "StartScan",
                "SPS scans use the SPS entry point",
            ));
        }

        debug!(
            channels = params.num_channels(),
            high_priority, "Simulated scan started"
        );
        self.launch(params);
        Ok(())
    }

    fn start_sps_scan(&mut self, params: &ScanParams) -> scansrv_hardware::Result<()> {
        if !params.scan_type.is_sps() {
            return Err(HardwareError::rejected(
                "StartSpsScan",
                "not an SPS scan",
            ));
        }

        debug!(channels = params.num_channels(), "Simulated SPS scan started");
        self.launch(params);
        Ok(())
    }

    fn stop_scan(&mut self) {
        debug!("Simulated scan stopped");
        self.halt();
    }

    fn stop_sps_scan(&mut self) {
        debug!("Simulated SPS scan stopped");
        self.halt();
    }
}

impl Drop for SimulatedHal {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

fn scan_duration(params: &ScanParams) -> Duration {
    let micros: u64 = params
        .channels
        .iter()
        .map(|entry| match entry.timing {
            ChannelTiming::Basic {
                max_dwell_time_us, ..
            } => u64::from(max_dwell_time_us),
            ChannelTiming::Sps {
                scan_duration_us, ..
            } => u64::from(scan_duration_us),
        })
        .sum();
    Duration::from_micros(micros)
}

fn completion_info(params: &ScanParams) -> ScanCompleteInfo {
    if !params.scan_type.is_sps() {
        return ScanCompleteInfo::normal();
    }

    // One bit per channel scanned
    let channels = params.num_channels();
    let sps_scan_result = if channels >= 16 {
        u16::MAX
    } else {
        (1u16 << channels) - 1
    };

    ScanCompleteInfo {
        tsf_error: false,
        sps_scan_result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scansrv_core::{ChannelEntry, ScanType};
    use tokio::sync::mpsc;

    fn hal() -> (SimulatedHal, mpsc::Receiver<ScanServiceEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (
            SimulatedHal::new(EventSender::new(tx), Duration::from_millis(1)),
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_is_acknowledged_then_completed() {
        let (mut hal, mut rx) = hal();
        let params = ScanParams::new(ScanType::NormalPassive)
            .with_channel(ChannelEntry::basic(1, 10_000, 20_000));

        hal.start_scan(&params, false).unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(ScanServiceEvent::CommandResponse(CommandStatus::Accepted))
        ));
        assert!(matches!(
            rx.recv().await,
            Some(ScanServiceEvent::ScanComplete(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sps_completion_marks_each_channel() {
        let (mut hal, mut rx) = hal();
        let params = ScanParams::new(ScanType::Sps)
            .with_channel(ChannelEntry::sps(1, 0, 10_000))
            .with_channel(ChannelEntry::sps(6, 10_000, 10_000))
            .with_channel(ChannelEntry::sps(11, 20_000, 10_000));

        hal.start_sps_scan(&params).unwrap();
        rx.recv().await;

        match rx.recv().await {
            Some(ScanServiceEvent::ScanComplete(info)) => assert_eq!(info.sps_scan_result, 0b111),
            other => panic!("expected scan complete, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_entry_point_is_rejected() {
        let (mut hal, _rx) = hal();
        let sps = ScanParams::new(ScanType::Sps).with_channel(ChannelEntry::sps(1, 0, 10_000));

        assert!(matches!(
            hal.start_scan(&sps, false),
            Err(HardwareError::Rejected { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_firmware_never_completes() {
        let (hal, mut rx) = hal();
        let mut hal = hal.with_firmware_hang(true);
        let params = ScanParams::new(ScanType::NormalPassive)
            .with_channel(ChannelEntry::basic(1, 10_000, 20_000));

        hal.start_scan(&params, false).unwrap();
        rx.recv().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
