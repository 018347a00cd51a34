//! Common types shared across hardware device implementations.

use serde::{Deserialize, Serialize};

/// Transceiver information read during initialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderInfo {
    /// Chip name (e.g., "MFRC522").
    pub name: String,

    /// Raw value of the chip version register.
    pub version: u8,
}

impl ReaderInfo {
    /// Create a new ReaderInfo.
    pub fn new(name: impl Into<String>, version: u8) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Human readable chip revision.
    pub fn revision(&self) -> &'static str {
        match self.version {
            0x88 => "FM17522 clone",
            0x90 => "v0.0",
            0x91 => "v1.0",
            0x92 => "v2.0",
            0x12 => "counterfeit",
            _ => "unknown",
        }
    }
}

/// LED colors for the pair indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum LedColor {
    /// LED off.
    Off,

    /// Green LED.
    Green,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_info_revision() {
        assert_eq!(ReaderInfo::new("MFRC522", 0x92).revision(), "v2.0");
        assert_eq!(ReaderInfo::new("MFRC522", 0x00).revision(), "unknown");
    }

    #[test]
    fn test_led_color_serialization() {
        let color = LedColor::Green;
        let json = serde_json::to_string(&color).unwrap();
        let deserialized: LedColor = serde_json::from_str(&json).unwrap();
        assert_eq!(color, deserialized);
    }
}
