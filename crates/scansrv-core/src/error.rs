use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Request errors
    #[error("Scan service busy: request rejected in state {state}")]
    Busy { state: String },

    #[error("Invalid scan parameters: {0}")]
    InvalidScanParams(String),

    // Runtime errors
    #[error("Scan service runtime stopped")]
    RuntimeStopped,

    #[error("Scan request dropped before completion")]
    RequestDropped,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidConfigValue { key: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_error_display() {
        let error = Error::Busy {
            state: "Scanning".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Scan service busy: request rejected in state Scanning"
        );
    }

    #[test]
    fn test_config_value_error_display() {
        let error = Error::InvalidConfigValue {
            key: "no_scan_complete_to_recovery".to_string(),
            reason: "must be at least 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for no_scan_complete_to_recovery: must be at least 1"
        );
    }
}
