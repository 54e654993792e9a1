//! Core constants for the scan service.
//!
//! These values mirror the limits and defaults of the WLAN driver scan
//! service: channel limits per scan command, the number of consecutive
//! missing scan-complete events tolerated before recovery, and the margins
//! used when sizing the scan guard timer.
//!
//! # Usage
//!
//! ```
//! use scansrv_core::constants::*;
//!
//! assert_eq!(SPS_SCAN_RESULT_UNKNOWN, 0xffff);
//! assert!(DEFAULT_NO_SCAN_COMPLETE_TO_RECOVERY >= 1);
//! ```

// ============================================================================
// Scan Command Limits
// ============================================================================

/// Maximum number of channels a single scan command may carry.
pub const MAX_SCAN_CHANNELS: usize = 30;

/// Lowest valid 802.11 channel number accepted in a channel list.
pub const MIN_CHANNEL_NUMBER: u8 = 1;

/// Highest valid 802.11 channel number accepted in a channel list.
///
/// Covers both the 2.4 GHz (1-14) and 5 GHz (36-196) channel plans.
pub const MAX_CHANNEL_NUMBER: u8 = 196;

/// SPS scan result bitmap reported when no real result is available.
///
/// Used when a scan-complete event is synthesized by the timeout workaround
/// rather than delivered by the firmware.
pub const SPS_SCAN_RESULT_UNKNOWN: u16 = 0xffff;

// ============================================================================
// Recovery Policy
// ============================================================================

/// Default number of consecutive scan timeouts before recovery is triggered.
///
/// Firmware can get stuck on a heavily loaded channel and never report scan
/// completion. A stop-scan command usually frees it, so a timeout is retried
/// this many times before the failure reporter is called.
pub const DEFAULT_NO_SCAN_COMPLETE_TO_RECOVERY: u32 = 3;

// ============================================================================
// Scan Guard Timer
// ============================================================================

/// Fixed margin added to every computed scan timeout (milliseconds).
pub const DEFAULT_SCAN_TIMEOUT_MARGIN_MS: u64 = 2000;

/// Per-channel firmware overhead added to the dwell time (milliseconds).
///
/// Accounts for channel switching and probe request transmission.
pub const DEFAULT_PER_CHANNEL_OVERHEAD_MS: u64 = 5;

/// Default DTIM period assumed when the scan may be interrupted by DTIM
/// beacons (milliseconds).
pub const DEFAULT_DTIM_PERIOD_MS: u64 = 100;

// ============================================================================
// Diagnostics
// ============================================================================

/// Default number of state transitions kept in the diagnostic history.
pub const DEFAULT_HISTORY_SIZE: usize = 64;
