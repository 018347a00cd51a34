//! Error types for hardware operations.
//!
//! This module defines error types specific to bus and transceiver
//! operations, covering failed I2C transactions, timeouts, initialization
//! failures and card protocol errors.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during hardware device operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// An I2C transaction failed.
    #[error("Bus error at 0x{address:02X}: {message}")]
    Bus { address: u8, message: String },

    /// Operation timed out.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device initialization failed.
    #[error("Initialization failed: {message}")]
    InitializationFailed { message: String },

    /// No channel is selected on the multiplexer.
    #[error("No channel selected")]
    NoChannelSelected,

    /// No card answered a request.
    #[error("No card in field")]
    NoCard,

    /// More than one card answered during anticollision.
    #[error("Card collision detected")]
    Collision,

    /// The card or transceiver answered with an invalid frame.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl HardwareError {
    /// Create a new bus error.
    pub fn bus(address: u8, message: impl Into<String>) -> Self {
        Self::Bus {
            address,
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new initialization failed error.
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::InitializationFailed {
            message: message.into(),
        }
    }

    /// Create a new protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Convert an `embedded-hal` I2C error into a bus error.
    pub fn from_i2c<E: embedded_hal_async::i2c::Error>(address: u8, error: E) -> Self {
        Self::bus(address, format!("{:?}", error.kind()))
    }
}
