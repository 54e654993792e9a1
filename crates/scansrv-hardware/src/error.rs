//! Error types for collaborator operations.
//!
//! This module defines errors raised by the hardware-facing collaborators of
//! the scan service: the HAL scan command layer rejecting a command or the
//! firmware being busy with another one.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur when issuing commands to the hardware layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The command was rejected synchronously by the HAL.
    #[error("Command rejected: {command}: {reason}")]
    Rejected { command: String, reason: String },

    /// The firmware is already executing a conflicting command.
    #[error("Firmware busy: {command}")]
    Busy { command: String },
}

impl HardwareError {
    /// Create a new rejected-command error.
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a new busy error.
    pub fn busy(command: impl Into<String>) -> Self {
        Self::Busy {
            command: command.into(),
        }
    }
}
