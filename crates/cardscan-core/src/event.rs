//! Events handed from the detection core to an event sink.
//!
//! Events are owned values: the core builds one per emission and moves it
//! into the sink, so a sink running on another task never borrows scanner
//! state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{BOOT_REASON_POWER_ON, ERROR_RFID_INIT_FAILED};
use crate::types::{Channel, Uid};

/// Lifecycle and detection events reported off-device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A card passed the cooldown check on a channel.
    CardDetected {
        /// Channel the card was read on.
        channel: Channel,
        /// Card identifier.
        uid: Uid,
    },

    /// A recoverable device error.
    Error {
        /// Short machine-readable slug, e.g. `rfid_init_failed`.
        code: String,
        /// Free-form diagnostic text.
        message: String,
    },

    /// The device started.
    Boot {
        /// `power_on` or a recovery-specific slug.
        reason: String,
    },
}

impl Event {
    /// Create a card detection event.
    pub fn card_detected(channel: Channel, uid: Uid) -> Self {
        Self::CardDetected { channel, uid }
    }

    /// Create an error event.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a boot event.
    pub fn boot(reason: impl Into<String>) -> Self {
        Self::Boot {
            reason: reason.into(),
        }
    }

    /// Boot event for a normal power-on.
    pub fn power_on() -> Self {
        Self::boot(BOOT_REASON_POWER_ON)
    }

    /// Error event for a reader that failed its startup check.
    pub fn reader_init_failed(channel: Channel) -> Self {
        Self::error(
            ERROR_RFID_INIT_FAILED,
            format!("Failed to initialize RFID reader on channel {channel}"),
        )
    }

    /// Short name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CardDetected { .. } => "card",
            Self::Error { .. } => "error",
            Self::Boot { .. } => "boot",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CardDetected { channel, uid } => write!(f, "card {uid} on channel {channel}"),
            Self::Error { code, message } => write!(f, "error {code}: {message}"),
            Self::Boot { reason } => write!(f, "boot ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_init_failed_message() {
        let event = Event::reader_init_failed(Channel::from_index(3));
        assert_eq!(
            event,
            Event::Error {
                code: "rfid_init_failed".to_string(),
                message: "Failed to initialize RFID reader on channel 3".to_string(),
            }
        );
    }

    #[test]
    fn test_event_kind() {
        let uid = Uid::new(vec![1, 2, 3, 4]).unwrap();
        assert_eq!(Event::card_detected(Channel::from_index(0), uid).kind(), "card");
        assert_eq!(Event::power_on().kind(), "boot");
        assert_eq!(Event::error("x", "y").kind(), "error");
    }

    #[test]
    fn test_event_json_shape() {
        let uid = Uid::new(vec![0x04, 0xAA]).unwrap();
        let event = Event::card_detected(Channel::from_index(1), uid);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "card_detected");
        assert_eq!(json["channel"], 1);
        assert_eq!(json["uid"], "04 AA");
    }

    #[test]
    fn test_event_display() {
        assert_eq!(Event::power_on().to_string(), "boot (power_on)");
    }
}
