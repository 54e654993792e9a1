use crate::{
    Result,
    constants::{
        MAX_CHANNEL_NUMBER, MAX_SCAN_CHANNELS, MIN_CHANNEL_NUMBER, SPS_SCAN_RESULT_UNKNOWN,
    },
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier attached to each scan request for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random request ID.
    #[must_use]
    pub fn new() -> Self {
        RequestId(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of scan the firmware is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanType {
    /// Listen-only scan on the serving schedule.
    NormalPassive,
    /// Scan sending probe requests on each channel.
    NormalActive,
    /// Passive scan triggered by traffic (QoS triggered scan).
    TriggeredPassive,
    /// Active scan triggered by traffic (QoS triggered scan).
    TriggeredActive,
    /// Scheduled power-save scan, timed against the TSF.
    Sps,
}

impl ScanType {
    /// Whether this scan goes through the SPS command entry points.
    #[must_use]
    pub fn is_sps(&self) -> bool {
        matches!(self, ScanType::Sps)
    }

    /// Whether this scan sends probe requests.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, ScanType::NormalActive | ScanType::TriggeredActive)
    }
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ScanType::NormalPassive => "normal-passive",
            ScanType::NormalActive => "normal-active",
            ScanType::TriggeredPassive => "triggered-passive",
            ScanType::TriggeredActive => "triggered-active",
            ScanType::Sps => "sps",
        };
        write!(f, "{name}")
    }
}

/// Per-channel timing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ChannelTiming {
    /// Dwell times for normal and triggered scans (microseconds).
    Basic {
        min_dwell_time_us: u32,
        max_dwell_time_us: u32,
    },
    /// TSF-scheduled window for SPS scans (microseconds).
    Sps {
        scan_start_tsf_us: u64,
        scan_duration_us: u32,
    },
}

/// A single channel entry in a scan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    /// 802.11 channel number.
    pub channel: u8,

    /// How long (or when) to listen on this channel.
    pub timing: ChannelTiming,
}

impl ChannelEntry {
    /// Create an entry for a normal or triggered scan.
    #[must_use]
    pub fn basic(channel: u8, min_dwell_time_us: u32, max_dwell_time_us: u32) -> Self {
        Self {
            channel,
            timing: ChannelTiming::Basic {
                min_dwell_time_us,
                max_dwell_time_us,
            },
        }
    }

    /// Create an entry for an SPS scan.
    #[must_use]
    pub fn sps(channel: u8, scan_start_tsf_us: u64, scan_duration_us: u32) -> Self {
        Self {
            channel,
            timing: ChannelTiming::Sps {
                scan_start_tsf_us,
                scan_duration_us,
            },
        }
    }
}

/// Parameters of a scan command as handed to the HAL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanParams {
    /// Scan variant.
    pub scan_type: ScanType,

    /// Channels to scan, in order.
    pub channels: Vec<ChannelEntry>,

    /// Probe requests sent per channel (active scans only).
    pub probe_requests_per_channel: u8,
}

impl ScanParams {
    /// Create scan parameters with an empty channel list.
    #[must_use]
    pub fn new(scan_type: ScanType) -> Self {
        Self {
            scan_type,
            channels: Vec::new(),
            probe_requests_per_channel: if scan_type.is_active() { 2 } else { 0 },
        }
    }

    /// Append a channel entry.
    #[must_use]
    pub fn with_channel(mut self, entry: ChannelEntry) -> Self {
        self.channels.push(entry);
        self
    }

    /// Set the number of probe requests per channel.
    #[must_use]
    pub fn with_probe_requests(mut self, count: u8) -> Self {
        self.probe_requests_per_channel = count;
        self
    }

    /// Number of channels in the command.
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Validate the parameters before they are handed to the state machine.
    ///
    /// # Errors
    /// Returns `Error::InvalidScanParams` if:
    /// - The channel list is empty or longer than [`MAX_SCAN_CHANNELS`]
    /// - A channel number is out of range
    /// - A channel's timing kind does not match the scan type
    /// - A basic channel has `min_dwell_time_us > max_dwell_time_us`
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(Error::InvalidScanParams(
                "Channel list must not be empty".to_string(),
            ));
        }

        if self.channels.len() > MAX_SCAN_CHANNELS {
            return Err(Error::InvalidScanParams(format!(
                "At most {MAX_SCAN_CHANNELS} channels per scan, got {}",
                self.channels.len()
            )));
        }

        for entry in &self.channels {
            if !(MIN_CHANNEL_NUMBER..=MAX_CHANNEL_NUMBER).contains(&entry.channel) {
                return Err(Error::InvalidScanParams(format!(
                    "Channel must be {MIN_CHANNEL_NUMBER}-{MAX_CHANNEL_NUMBER}, got {}",
                    entry.channel
                )));
            }

            match (self.scan_type.is_sps(), entry.timing) {
                (
                    false,
                    ChannelTiming::Basic {
                        min_dwell_time_us,
                        max_dwell_time_us,
                    },
                ) => {
                    if min_dwell_time_us > max_dwell_time_us {
                        return Err(Error::InvalidScanParams(format!(
                            "Channel {}: min dwell {min_dwell_time_us}us exceeds max dwell {max_dwell_time_us}us",
                            entry.channel
                        )));
                    }
                }
                (true, ChannelTiming::Sps { .. }) => {}
                _ => {
                    return Err(Error::InvalidScanParams(format!(
                        "Channel {}: timing does not match scan type {}",
                        entry.channel, self.scan_type
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Power-save mode requested from the power server while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsRequest {
    /// Enter 802.11 power save for the duration of the scan.
    PowerSaveOn,
    /// Stay awake for the duration of the scan.
    PowerSaveOff,
    /// Keep whatever mode is current.
    #[default]
    KeepCurrent,
}

/// Immediate answer of the power server to a reserve/release call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsCommandStatus {
    /// The requested mode is already current; no callback will follow.
    AlreadyInMode,
    /// The transition started; the outcome arrives through the callback.
    Pending,
    /// Accepted; the outcome arrives through the callback.
    Ok,
    /// The request failed outright.
    Error,
}

/// Asynchronous outcome delivered by the power server callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsCallbackResult {
    Success,
    Fail,
    Pending,
}

/// Power-save state reported to the caller once a scan completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerSaveMode {
    /// Station is in 802.11 power save.
    PowerSave,
    /// Station is awake.
    Active,
}

impl PowerSaveMode {
    /// Build from the power server's "is power save on" flag.
    #[must_use]
    pub fn from_ps_on(on: bool) -> Self {
        if on {
            PowerSaveMode::PowerSave
        } else {
            PowerSaveMode::Active
        }
    }
}

/// Status delivered to the command-accepted callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Accepted,
    Rejected,
}

impl CommandStatus {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandStatus::Accepted)
    }
}

/// Accumulated outcome of a scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every step succeeded.
    #[default]
    Success,
    /// A step failed, the hardware timed out, or an unexpected event arrived.
    Failure,
    /// The scan was stopped by the caller.
    Cancelled,
}

impl CompletionStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionStatus::Success)
    }

    /// Combine with a cancellation; a recorded failure is never downgraded.
    #[must_use]
    pub fn cancelled(self) -> Self {
        match self {
            CompletionStatus::Failure => CompletionStatus::Failure,
            _ => CompletionStatus::Cancelled,
        }
    }

    /// Command-accepted status corresponding to this outcome.
    #[must_use]
    pub fn as_command_status(&self) -> CommandStatus {
        match self {
            CompletionStatus::Failure => CommandStatus::Rejected,
            _ => CommandStatus::Accepted,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompletionStatus::Success => write!(f, "success"),
            CompletionStatus::Failure => write!(f, "failure"),
            CompletionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Failure kinds escalated to the recovery module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum FailureKind {
    /// The firmware repeatedly failed to report scan completion.
    NoScanComplete,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::NoScanComplete => write!(f, "no scan complete"),
        }
    }
}

/// Scan completion data delivered by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCompleteInfo {
    /// The TSF jumped while the scan was running.
    pub tsf_error: bool,

    /// SPS channel bitmap, or [`SPS_SCAN_RESULT_UNKNOWN`].
    pub sps_scan_result: u16,
}

impl ScanCompleteInfo {
    /// Completion of a normal scan (no SPS result, no TSF error).
    #[must_use]
    pub fn normal() -> Self {
        Self {
            tsf_error: false,
            sps_scan_result: SPS_SCAN_RESULT_UNKNOWN,
        }
    }

    /// Completion synthesized after a timer expiry.
    #[must_use]
    pub fn synthetic() -> Self {
        Self::normal()
    }
}

impl Default for ScanCompleteInfo {
    fn default() -> Self {
        Self::normal()
    }
}

/// Report handed to the scan-complete notifier, exactly once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCompleteReport {
    /// Request the report belongs to.
    pub request_id: RequestId,

    /// SPS channel bitmap (or [`SPS_SCAN_RESULT_UNKNOWN`]).
    pub sps_scan_result: u16,

    /// Whether a TSF error occurred during the scan.
    pub tsf_error: bool,

    /// Accumulated outcome.
    pub status: CompletionStatus,

    /// Power-save mode at the time of notification.
    pub power_save_mode: PowerSaveMode,

    /// Wall-clock time the report was produced.
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn basic_params(channels: &[u8]) -> ScanParams {
        channels.iter().fold(ScanParams::new(ScanType::NormalActive), |p, ch| {
            p.with_channel(ChannelEntry::basic(*ch, 10_000, 30_000))
        })
    }

    #[rstest]
    #[case(&[1])]
    #[case(&[1, 6, 11])]
    #[case(&[36, 40, 44, 48])]
    fn test_scan_params_valid(#[case] channels: &[u8]) {
        assert!(basic_params(channels).validate().is_ok());
    }

    #[rstest]
    #[case(&[])] // empty
    #[case(&[0])] // below range
    #[case(&[197])] // above range
    fn test_scan_params_invalid_channels(#[case] channels: &[u8]) {
        let result = basic_params(channels).validate();
        assert!(matches!(result, Err(Error::InvalidScanParams(_))));
    }

    #[test]
    fn test_scan_params_too_many_channels() {
        let channels: Vec<u8> = (1..=(MAX_SCAN_CHANNELS as u8 + 1)).collect();
        assert!(basic_params(&channels).validate().is_err());
    }

    #[test]
    fn test_scan_params_dwell_order() {
        let params = ScanParams::new(ScanType::NormalPassive)
            .with_channel(ChannelEntry::basic(6, 50_000, 20_000));
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_scan_params_timing_must_match_type() {
        let sps_with_basic = ScanParams::new(ScanType::Sps)
            .with_channel(ChannelEntry::basic(1, 10_000, 20_000));
        assert!(sps_with_basic.validate().is_err());

        let basic_with_sps = ScanParams::new(ScanType::NormalPassive)
            .with_channel(ChannelEntry::sps(1, 0, 20_000));
        assert!(basic_with_sps.validate().is_err());

        let sps = ScanParams::new(ScanType::Sps).with_channel(ChannelEntry::sps(1, 0, 20_000));
        assert!(sps.validate().is_ok());
    }

    #[test]
    fn test_active_scan_defaults_probe_requests() {
        assert_eq!(
            ScanParams::new(ScanType::NormalActive).probe_requests_per_channel,
            2
        );
        assert_eq!(
            ScanParams::new(ScanType::NormalPassive).probe_requests_per_channel,
            0
        );
    }

    #[rstest]
    #[case(CompletionStatus::Success, CompletionStatus::Cancelled)]
    #[case(CompletionStatus::Cancelled, CompletionStatus::Cancelled)]
    #[case(CompletionStatus::Failure, CompletionStatus::Failure)]
    fn test_completion_status_cancelled(
        #[case] input: CompletionStatus,
        #[case] expected: CompletionStatus,
    ) {
        assert_eq!(input.cancelled(), expected);
    }

    #[test]
    fn test_power_save_mode_from_flag() {
        assert_eq!(PowerSaveMode::from_ps_on(true), PowerSaveMode::PowerSave);
        assert_eq!(PowerSaveMode::from_ps_on(false), PowerSaveMode::Active);
    }

    #[test]
    fn test_synthetic_completion_has_unknown_result() {
        let info = ScanCompleteInfo::synthetic();
        assert!(!info.tsf_error);
        assert_eq!(info.sps_scan_result, SPS_SCAN_RESULT_UNKNOWN);
    }

    #[test]
    fn test_scan_params_deserialize() {
        let json = r#"{
            "scan_type": "sps",
            "channels": [
                {"channel": 1, "timing": {"kind": "sps", "scan_start_tsf_us": 1000, "scan_duration_us": 20000}}
            ],
            "probe_requests_per_channel": 0
        }"#;

        let params: ScanParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.scan_type, ScanType::Sps);
        assert_eq!(params.channels[0], ChannelEntry::sps(1, 1000, 20_000));
        assert!(params.validate().is_ok());
    }
}
