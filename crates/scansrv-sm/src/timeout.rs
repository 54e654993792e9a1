//! Scan guard timer sizing.
//!
//! The guard timer must outlast a healthy scan, so its duration grows with
//! the number of channels and their dwell times. Normal scans are sized from
//! the sum of the per-channel maximum dwell times plus switching overhead,
//! and one DTIM period per channel when beacons may interrupt the scan. SPS
//! scans are sized from the TSF window they span.

use std::time::Duration;

use scansrv_core::{ChannelTiming, ScanParams};

use crate::config::ScanSrvConfig;

/// Compute the guard timeout for a scan.
///
/// `consider_dtim` is false when the scan is known to overlap DTIM beacons
/// already accounted for by the firmware.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scansrv_core::{ChannelEntry, ScanParams, ScanType};
/// use scansrv_sm::{ScanSrvConfig, scan_timeout};
///
/// let config = ScanSrvConfig::default()
///     .with_timeout_margin_ms(1000)
///     .with_per_channel_overhead_ms(5)
///     .with_dtim_period_ms(100);
/// let params = ScanParams::new(ScanType::NormalActive)
///     .with_channel(ChannelEntry::basic(1, 10_000, 30_000))
///     .with_channel(ChannelEntry::basic(6, 10_000, 30_000));
///
/// // 60ms dwell + 2 * 5ms overhead + 1000ms margin
/// assert_eq!(scan_timeout(&params, false, &config), Duration::from_millis(1070));
/// // plus 2 * 100ms DTIM
/// assert_eq!(scan_timeout(&params, true, &config), Duration::from_millis(1270));
/// ```
pub fn scan_timeout(params: &ScanParams, consider_dtim: bool, config: &ScanSrvConfig) -> Duration {
    let channels = params.num_channels() as u64;

    let scan_ms = if params.scan_type.is_sps() {
        sps_window_us(params).div_ceil(1000)
    } else {
        let dwell_us: u64 = params
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

        let dtim_ms = if consider_dtim {
            config.dtim_period_ms.saturating_mul(channels)
        } else {
            0
        };

        dwell_us
            .div_ceil(1000)
            .saturating_add(config.per_channel_overhead_ms.saturating_mul(channels))
            .saturating_add(dtim_ms)
    };

    Duration::from_millis(scan_ms.saturating_add(config.timeout_margin_ms))
}

/// Span of the SPS schedule, from the earliest channel start to the latest
/// channel end (microseconds).
fn sps_window_us(params: &ScanParams) -> u64 {
    let windows = params.channels.iter().filter_map(|entry| match entry.timing {
        ChannelTiming::Sps {
            scan_start_tsf_us,
            scan_duration_us,
        } => Some((
            scan_start_tsf_us,
            scan_start_tsf_us.saturating_add(u64::from(scan_duration_us)),
        )),
        ChannelTiming::Basic { .. } => None,
    });

    let (first_start, last_end) = windows.fold((u64::MAX, 0), |(start, end), (s, e)| {
        (start.min(s), end.max(e))
    });

    last_end.saturating_sub(first_start)
}
