//! Scan service runtime.
//!
//! This module provides the [`ScanServiceRuntime`], which moves a
//! [`ScanService`] onto a dedicated tokio task and feeds it events from a
//! single channel, one at a time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ Handle(s)    │──────►┌─────────────────┐
//! └──────────────┘       │                 │
//! ┌──────────────┐       │  Event Channel  │       ┌──────────────┐
//! │ Timer task   │──────►│  (mpsc)         │──────►│ ScanService  │
//! └──────────────┘       │                 │       │ (owned task) │
//! ┌──────────────┐       │                 │       └──────────────┘
//! │ PowerSrv/HAL │──────►│                 │
//! └──────────────┘       └─────────────────┘
//! ```
//!
//! Because the service is only ever touched by its own task, every event
//! runs to completion before the next one is looked at, including the
//! follow-up events an action dispatches synchronously.
//!
//! # Examples
//!
//! ```no_run
//! use scansrv_core::{ChannelEntry, ScanParams, ScanType};
//! use scansrv_runtime::sim::{SimulatedHal, SimulatedPowerSrv, SimulatedRecovery, SimulationConfig};
//! use scansrv_runtime::{RuntimeConfig, ScanServiceRuntime, TokioScanTimer};
//! use scansrv_sm::{ScanRequest, ScanService, ScanSrvConfig};
//!
//! #[tokio::main]
//! async fn main() -> scansrv_core::Result<()> {
//!     let runtime = ScanServiceRuntime::new(RuntimeConfig::default());
//!     let events = runtime.event_sender();
//!     let sim = SimulationConfig::default();
//!
//!     let service = ScanService::new(
//!         ScanSrvConfig::default(),
//!         TokioScanTimer::new(events.clone()),
//!         SimulatedPowerSrv::new(events.clone(), sim.power_latency()),
//!         SimulatedHal::new(events.clone(), sim.command_ack_latency()),
//!         SimulatedRecovery::new(events, sim.recovery_latency()),
//!     )?;
//!     let handle = runtime.spawn(service);
//!
//!     let params = ScanParams::new(ScanType::NormalActive)
//!         .with_channel(ChannelEntry::basic(6, 10_000, 30_000));
//!     let report = handle.scan(ScanRequest::new(params)).await?;
//!     println!("scan finished: {}", report.status);
//!
//!     handle.shutdown().await
//! }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use scansrv_core::{
    CommandStatus, CompletionStatus, Error, PsCallbackResult, Result, ScanCompleteInfo,
    ScanCompleteReport,
};
use scansrv_hardware::{FailureReporter, PowerSaveService, ScanCommands, ScanTimer};
use scansrv_sm::{ScanRequest, ScanService, ScanServiceSnapshot};

use crate::event::{EventSender, ScanServiceEvent};

/// Configuration for the runtime event loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the event channel.
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

/// Owns the event channel until the service task is spawned.
///
/// # Lifecycle
///
/// 1. Create the runtime with [`ScanServiceRuntime::new`]
/// 2. Hand [`event_sender`](Self::event_sender) clones to the collaborators
/// 3. Build the [`ScanService`] from those collaborators
/// 4. Call [`spawn`](Self::spawn) to start the loop and get a handle
/// 5. Call [`ScanServiceHandle::shutdown`] to stop the loop
#[derive(Debug)]
pub struct ScanServiceRuntime {
    event_tx: mpsc::Sender<ScanServiceEvent>,
    event_rx: mpsc::Receiver<ScanServiceEvent>,
}

impl ScanServiceRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        Self { event_tx, event_rx }
    }

    /// Sender for collaborators that post completions.
    pub fn event_sender(&self) -> EventSender {
        EventSender::new(self.event_tx.clone())
    }

    /// Start the service loop on a new tokio task.
    pub fn spawn<T, P, H, R>(self, service: ScanService<T, P, H, R>) -> ScanServiceHandle
    where
        T: ScanTimer + Send + 'static,
        P: PowerSaveService + Send + 'static,
        H: ScanCommands + Send + 'static,
        R: FailureReporter + Send + 'static,
    {
        tokio::spawn(run_service(service, self.event_rx));

        ScanServiceHandle {
            event_tx: self.event_tx,
        }
    }
}

async fn run_service<T, P, H, R>(
    mut service: ScanService<T, P, H, R>,
    mut event_rx: mpsc::Receiver<ScanServiceEvent>,
) where
    T: ScanTimer,
    P: PowerSaveService,
    H: ScanCommands,
    R: FailureReporter,
{
    info!("Scan service runtime started");

    while let Some(event) = event_rx.recv().await {
        match event {
            ScanServiceEvent::RequestScan { request, reply } => {
                let _ = reply.send(service.request_scan(request));
            }
            ScanServiceEvent::StopScan => service.request_stop_scan(),
            ScanServiceEvent::FirmwareReset => service.notify_firmware_reset(),
            ScanServiceEvent::PowerSaveComplete(result) => service.power_save_complete(result),
            ScanServiceEvent::CommandResponse(status) => service.command_response(status),
            ScanServiceEvent::ScanComplete(info) => service.scan_complete(info),
            ScanServiceEvent::TimerExpired(ticket) => {
                if ticket.is_current() {
                    service.timer_expired();
                } else {
                    debug!(
                        generation = ticket.generation(),
                        "Discarding stale timer expiry"
                    );
                }
            }
            ScanServiceEvent::SetDtimOverlapping(overlapping) => {
                service.set_dtim_overlapping(overlapping)
            }
            ScanServiceEvent::Snapshot(reply) => {
                let _ = reply.send(service.snapshot());
            }
            ScanServiceEvent::Shutdown(reply) => {
                info!(state = %service.state(), "Scan service runtime shutting down");
                let _ = reply.send(());
                break;
            }
        }
    }

    info!("Scan service runtime stopped");
}

/// Cloneable handle for talking to a running scan service.
#[derive(Debug, Clone)]
pub struct ScanServiceHandle {
    event_tx: mpsc::Sender<ScanServiceEvent>,
}

impl ScanServiceHandle {
    async fn send(&self, event: ScanServiceEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| Error::RuntimeStopped)
    }

    /// Submit a scan request and return its immediate status.
    ///
    /// # Errors
    /// - `Error::RuntimeStopped` if the runtime is no longer running
    /// - Any error returned by [`ScanService::request_scan`]
    pub async fn request_scan(&self, request: ScanRequest) -> Result<CompletionStatus> {
        let (reply, response) = oneshot::channel();
        self.send(ScanServiceEvent::RequestScan { request, reply })
            .await?;
        response.await.map_err(|_| Error::RuntimeStopped)?
    }

    /// Submit a scan request and wait for its completion report.
    ///
    /// The request's scan-complete callback is replaced.
    ///
    /// # Errors
    /// - `Error::RequestDropped` if the request was abandoned (firmware
    ///   reset, unexpected event) without a report
    /// - Any error returned by [`request_scan`](Self::request_scan)
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanCompleteReport> {
        let (report_tx, report_rx) = oneshot::channel();
        let request = request.on_scan_complete(move |report| {
            let _ = report_tx.send(report);
        });

        self.request_scan(request).await?;
        report_rx.await.map_err(|_| Error::RequestDropped)
    }

    pub async fn stop_scan(&self) -> Result<()> {
        self.send(ScanServiceEvent::StopScan).await
    }

    pub async fn firmware_reset(&self) -> Result<()> {
        self.send(ScanServiceEvent::FirmwareReset).await
    }

    pub async fn power_save_complete(&self, result: PsCallbackResult) -> Result<()> {
        self.send(ScanServiceEvent::PowerSaveComplete(result)).await
    }

    pub async fn command_response(&self, status: CommandStatus) -> Result<()> {
        self.send(ScanServiceEvent::CommandResponse(status)).await
    }

    pub async fn scan_complete(&self, info: ScanCompleteInfo) -> Result<()> {
        self.send(ScanServiceEvent::ScanComplete(info)).await
    }

    pub async fn set_dtim_overlapping(&self, overlapping: bool) -> Result<()> {
        self.send(ScanServiceEvent::SetDtimOverlapping(overlapping))
            .await
    }

    /// Read the current service state.
    pub async fn snapshot(&self) -> Result<ScanServiceSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(ScanServiceEvent::Snapshot(reply)).await?;
        response.await.map_err(|_| Error::RuntimeStopped)
    }

    /// Stop the runtime loop. Pending events behind the shutdown are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.send(ScanServiceEvent::Shutdown(reply)).await?;
        response.await.map_err(|_| Error::RuntimeStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_config_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.channel_capacity, 64);
    }
}
