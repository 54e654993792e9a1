//! Scan service configuration.
//!
//! [`ScanSrvConfig`] holds the instance-wide policy of a scan service: the
//! recovery threshold for missing scan-complete events and the parameters of
//! the scan guard timer. Per-request policy (driver mode, PS failure
//! handling) travels with each [`ScanRequest`](crate::ScanRequest) instead.
//!
//! # Examples
//!
//! ```
//! use scansrv_sm::ScanSrvConfig;
//!
//! let config = ScanSrvConfig::default()
//!     .with_no_scan_complete_to_recovery(5)
//!     .with_timeout_margin_ms(1500);
//! assert!(config.validate().is_ok());
//!
//! let parsed = ScanSrvConfig::from_json(r#"{"no_scan_complete_to_recovery": 2}"#).unwrap();
//! assert_eq!(parsed.no_scan_complete_to_recovery, 2);
//! assert_eq!(parsed.timeout_margin_ms, ScanSrvConfig::default().timeout_margin_ms);
//! ```

use serde::{Deserialize, Serialize};

use scansrv_core::constants::{
    DEFAULT_DTIM_PERIOD_MS, DEFAULT_HISTORY_SIZE, DEFAULT_NO_SCAN_COMPLETE_TO_RECOVERY,
    DEFAULT_PER_CHANNEL_OVERHEAD_MS, DEFAULT_SCAN_TIMEOUT_MARGIN_MS,
};
use scansrv_core::{Error, Result};

/// Instance-wide configuration of a scan service.
///
/// Missing fields take their default values when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSrvConfig {
    /// Consecutive scan timeouts tolerated before the failure reporter is
    /// called. Must be at least 1.
    pub no_scan_complete_to_recovery: u32,

    /// Fixed margin added to every scan guard timeout (milliseconds).
    pub timeout_margin_ms: u64,

    /// Per-channel switching overhead for normal scans (milliseconds).
    pub per_channel_overhead_ms: u64,

    /// DTIM period added per channel when DTIMs may interrupt the scan
    /// (milliseconds).
    pub dtim_period_ms: u64,

    /// Number of transitions kept in the diagnostic history.
    pub history_size: usize,
}

impl Default for ScanSrvConfig {
    fn default() -> Self {
        Self {
            no_scan_complete_to_recovery: DEFAULT_NO_SCAN_COMPLETE_TO_RECOVERY,
            timeout_margin_ms: DEFAULT_SCAN_TIMEOUT_MARGIN_MS,
            per_channel_overhead_ms: DEFAULT_PER_CHANNEL_OVERHEAD_MS,
            dtim_period_ms: DEFAULT_DTIM_PERIOD_MS,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

impl ScanSrvConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    /// Returns `Error::Config` if the JSON is malformed, or the error of
    /// [`validate`](Self::validate) if a value is out of range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid scan service config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all values are usable.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfigValue` if the recovery threshold or the
    /// history size is zero.
    pub fn validate(&self) -> Result<()> {
        if self.no_scan_complete_to_recovery == 0 {
            return Err(Error::InvalidConfigValue {
                key: "no_scan_complete_to_recovery".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.history_size == 0 {
            return Err(Error::InvalidConfigValue {
                key: "history_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Set the recovery threshold.
    #[must_use]
    pub fn with_no_scan_complete_to_recovery(mut self, count: u32) -> Self {
        self.no_scan_complete_to_recovery = count;
        self
    }

    /// Set the fixed timeout margin.
    #[must_use]
    pub fn with_timeout_margin_ms(mut self, margin_ms: u64) -> Self {
        self.timeout_margin_ms = margin_ms;
        self
    }

    /// Set the per-channel overhead.
    #[must_use]
    pub fn with_per_channel_overhead_ms(mut self, overhead_ms: u64) -> Self {
        self.per_channel_overhead_ms = overhead_ms;
        self
    }

    /// Set the DTIM period.
    #[must_use]
    pub fn with_dtim_period_ms(mut self, period_ms: u64) -> Self {
        self.dtim_period_ms = period_ms;
        self
    }

    /// Set the transition history capacity.
    #[must_use]
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ScanSrvConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.no_scan_complete_to_recovery,
            DEFAULT_NO_SCAN_COMPLETE_TO_RECOVERY
        );
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = ScanSrvConfig::default().with_no_scan_complete_to_recovery(0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));
    }

    #[test]
    fn test_zero_history_rejected() {
        let config = ScanSrvConfig::default().with_history_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            ScanSrvConfig::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_invalid_values() {
        let result = ScanSrvConfig::from_json(r#"{"no_scan_complete_to_recovery": 0}"#);
        assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    }
}
