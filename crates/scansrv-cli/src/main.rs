//! Scan service demo entry point.
//!
//! Runs scan cycles on the tokio runtime against the simulated power server,
//! HAL and recovery module, logging every transition.
//!
//! # Usage
//!
//! ```bash
//! # Three scans on channels 1, 6 and 11
//! scansrv
//!
//! # Show every transition
//! RUST_LOG=debug scansrv --cycles 1
//!
//! # Firmware never completes: watch timeouts escalate to recovery
//! scansrv --hang --cycles 4
//!
//! # SPS scans, stopped after 20ms
//! scansrv --sps --stop-after-ms 20
//! ```

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use scansrv_core::{ChannelEntry, Error, ScanCompleteReport, ScanParams, ScanType};
use scansrv_runtime::sim::{SimulatedHal, SimulatedPowerSrv, SimulatedRecovery};
use scansrv_runtime::{ScanServiceHandle, ScanServiceRuntime, TokioScanTimer};
use scansrv_sm::{ScanRequest, ScanService};

use config::DemoConfig;

/// WLAN scan service demo against simulated hardware
#[derive(Parser, Debug)]
#[command(name = "scansrv")]
#[command(author, version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of scan cycles to run
    #[arg(short = 'n', long, default_value_t = 3)]
    cycles: u32,

    /// Channels to scan
    #[arg(long, value_delimiter = ',', default_value = "1,6,11")]
    channels: Vec<u8>,

    /// Run SPS scans instead of normal active scans
    #[arg(long)]
    sps: bool,

    /// Simulate firmware that never reports scan completion
    #[arg(long)]
    hang: bool,

    /// Scan without reserving driver mode
    #[arg(long)]
    no_driver_mode: bool,

    /// Stop each scan this many milliseconds after requesting it
    #[arg(long)]
    stop_after_ms: Option<u64>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DemoConfig::load(path)?,
        None => DemoConfig::default(),
    };
    if cli.hang {
        config.simulation.firmware_hang = true;
    }

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let handle = start_service(&config)?;

    for cycle in 1..=cli.cycles {
        let request = ScanRequest::new(scan_params(&cli)?)
            .with_enter_driver_mode(!cli.no_driver_mode);

        let outcome = match cli.stop_after_ms {
            Some(ms) => scan_and_stop(&handle, request, Duration::from_millis(ms)).await,
            None => handle.scan(request).await,
        };

        match outcome {
            Ok(report) => println!(
                "cycle {cycle}: {} (power save: {:?}, sps result: {:#06x})",
                report.status, report.power_save_mode, report.sps_scan_result
            ),
            Err(Error::RequestDropped) => {
                println!("cycle {cycle}: abandoned after firmware reset")
            }
            Err(e) => return Err(e).context(format!("scan cycle {cycle}")),
        }
    }

    let snapshot = handle.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    handle.shutdown().await?;
    Ok(())
}

fn start_service(config: &DemoConfig) -> anyhow::Result<ScanServiceHandle> {
    let runtime = ScanServiceRuntime::new(config.runtime.clone());
    let events = runtime.event_sender();
    let sim = &config.simulation;

    let service = ScanService::new(
        config.scan_service.clone(),
        TokioScanTimer::new(events.clone()),
        SimulatedPowerSrv::new(events.clone(), sim.power_latency()),
        SimulatedHal::new(events.clone(), sim.command_ack_latency())
            .with_firmware_hang(sim.firmware_hang),
        SimulatedRecovery::new(events, sim.recovery_latency()),
    )
    .context("creating scan service")?;

    info!(?config, "Scan service configured");
    Ok(runtime.spawn(service))
}

fn scan_params(cli: &Cli) -> anyhow::Result<ScanParams> {
    let params = if cli.sps {
        cli.channels
            .iter()
            .enumerate()
            .fold(ScanParams::new(ScanType::Sps), |params, (i, ch)| {
                params.with_channel(ChannelEntry::sps(*ch, i as u64 * 30_000, 30_000))
            })
    } else {
        cli.channels
            .iter()
            .fold(ScanParams::new(ScanType::NormalActive), |params, ch| {
                params.with_channel(ChannelEntry::basic(*ch, 10_000, 30_000))
            })
    };

    params.validate().context("invalid --channels")?;
    Ok(params)
}

async fn scan_and_stop(
    handle: &ScanServiceHandle,
    request: ScanRequest,
    delay: Duration,
) -> scansrv_core::Result<ScanCompleteReport> {
    let (report_tx, report_rx) = oneshot::channel();
    let request = request.on_scan_complete(move |report| {
        let _ = report_tx.send(report);
    });

    handle.request_scan(request).await?;
    tokio::time::sleep(delay).await;
    handle.stop_scan().await?;

    report_rx.await.map_err(|_| Error::RequestDropped)
}
