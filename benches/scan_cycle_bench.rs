//! Performance benchmarks for the scan service state machine.
//!
//! These benchmarks measure the cost of the pieces on the scan hot path:
//! a single transition-table lookup, guard timeout sizing across channel
//! counts, and a complete scan cycle driven against the mock collaborators.
//!
//! # Run Benchmarks
//!
//! ```sh
//! # Run all scan cycle benchmarks
//! cargo bench --bench scan_cycle_bench
//!
//! # Run specific benchmark group
//! cargo bench --bench scan_cycle_bench -- scan_timeout
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use scansrv_core::{ChannelEntry, ScanCompleteInfo, ScanParams, ScanType};
use scansrv_hardware::mock::{MockFailureReporter, MockPowerSrv, MockScanCommands, MockTimer};
use scansrv_sm::{
    ScanRequest, ScanService, ScanSrvConfig, ScanSrvEvent, ScanSrvState, scan_timeout, transition,
};

fn params(channels: usize) -> ScanParams {
    (1..=channels as u8).fold(ScanParams::new(ScanType::NormalActive), |p, ch| {
        p.with_channel(ChannelEntry::basic(ch, 10_000, 30_000))
    })
}

/// Benchmark a lookup of every cell of the transition table.
fn bench_transition_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("transition_table");
    group.throughput(Throughput::Elements(
        (ScanSrvState::ALL.len() * ScanSrvEvent::ALL.len()) as u64,
    ));

    group.bench_function("all_cells", |b| {
        b.iter(|| {
            for state in ScanSrvState::ALL {
                for event in ScanSrvEvent::ALL {
                    black_box(transition(black_box(state), black_box(event)));
                }
            }
        });
    });

    group.finish();
}

/// Benchmark guard timeout sizing for normal and SPS scans.
fn bench_scan_timeout(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_timeout");
    let config = ScanSrvConfig::default();

    for channels in [1usize, 14, 30] {
        let normal = params(channels);
        group.bench_with_input(BenchmarkId::new("normal", channels), &normal, |b, p| {
            b.iter(|| black_box(scan_timeout(black_box(p), true, &config)));
        });

        let sps = (1..=channels as u8).fold(ScanParams::new(ScanType::Sps), |p, ch| {
            p.with_channel(ChannelEntry::sps(ch, u64::from(ch) * 20_000, 20_000))
        });
        group.bench_with_input(BenchmarkId::new("sps", channels), &sps, |b, p| {
            b.iter(|| black_box(scan_timeout(black_box(p), true, &config)));
        });
    }

    group.finish();
}

/// Benchmark one full request-to-notification cycle with synchronous
/// collaborators (driver mode granted and released immediately).
fn bench_full_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_cycle");
    group.throughput(Throughput::Elements(1));

    let (timer, _) = MockTimer::new();
    let (power, _) = MockPowerSrv::new();
    let (hal, _) = MockScanCommands::new();
    let (reporter, _) = MockFailureReporter::new();
    let mut service = ScanService::new(
        ScanSrvConfig::default().with_history_size(16),
        timer,
        power,
        hal,
        reporter,
    )
    .unwrap();

    let scan = params(3);

    group.bench_function("sync_driver_mode", |b| {
        b.iter(|| {
            let request = ScanRequest::new(scan.clone()).on_scan_complete(|report| {
                black_box(report);
            });
            service.request_scan(request).unwrap();
            service.scan_complete(ScanCompleteInfo::normal());
            black_box(service.state())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_transition_table,
    bench_scan_timeout,
    bench_full_cycle
);
criterion_main!(benches);
