//! Core constants for the multi-antenna card scanner.
//!
//! This module centralizes the bus addresses, timing windows and limits used
//! throughout the workspace. Drivers, the detection core and the event sinks
//! all read their defaults from here so that a single table describes the
//! behavior of a device.
//!
//! # Bus Layout
//!
//! ```text
//!            I2C bus (100 kHz)
//!                 │
//!        ┌────────┴────────┐
//!        │ TCA9548A  @0x70 │  multiplexer ("PaHub")
//!        └─┬──┬──┬──┬──┬──┬┘
//!          0  1  2  3  4  5      downstream channels
//!          │  │  │  │  │  │
//!        MFRC522 @0x28 on every channel
//! ```
//!
//! Every reader answers at the same address, so only one downstream line
//! may be selected at a time.
//!
//! # Usage
//!
//! ```
//! use cardscan_core::constants::*;
//! use std::time::Duration;
//!
//! let cooldown = Duration::from_millis(CARD_SEND_COOLDOWN_MS as u64);
//! assert_eq!(cooldown.as_secs(), 10);
//! assert!(MAX_READERS <= 8);
//! ```

// ============================================================================
// Bus Addressing
// ============================================================================

/// I2C address of the TCA9548A channel multiplexer.
pub const MULTIPLEXER_I2C_ADDRESS: u8 = 0x70;

/// I2C address of every MFRC522 reader behind the multiplexer.
pub const READER_I2C_ADDRESS: u8 = 0x28;

// ============================================================================
// Channel Limits
// ============================================================================

/// Maximum number of readers a device may drive.
///
/// The multiplexer has eight downstream lines but the reference hardware
/// never wires more than six antennas.
pub const MAX_READERS: usize = 6;

/// Reader count for player and muck devices (two hole cards).
pub const PLAYER_READER_COUNT: usize = 2;

/// Reader count for board devices (five community cards).
pub const BOARD_READER_COUNT: usize = 5;

/// Reader count used when the operating mode is unknown.
///
/// Matches the two-antenna Atom board the fallback mode was written for.
pub const FALLBACK_READER_COUNT: usize = 2;

// ============================================================================
// Timing
// ============================================================================

/// Window during which the same UID on the same channel is not re-sent.
///
/// # Value: 10000ms (10 seconds)
pub const CARD_SEND_COOLDOWN_MS: u32 = 10_000;

/// Delay between consecutive emissions within one board-mode cycle.
pub const BOARD_PACING_MS: u64 = 100;

/// Settle delay after all readers have been initialized.
pub const READER_SETTLE_MS: u64 = 500;

/// Delay between two scan cycles in the interactive clients.
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 200;

// ============================================================================
// Event Transmission
// ============================================================================

/// Number of attempts for an HTTP post before the event is dropped.
pub const DEFAULT_POST_ATTEMPTS: u32 = 3;

/// Delay between two HTTP post attempts.
pub const DEFAULT_POST_BACKOFF_MS: u64 = 100;

/// Request timeout for a single HTTP post attempt.
pub const DEFAULT_POST_TIMEOUT_MS: u64 = 10_000;

/// Capacity of the background event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 32;

/// Delay before the process exits after a fatal provisioning failure.
pub const RESTART_DELAY_MS: u64 = 5_000;

// ============================================================================
// Event Vocabulary
// ============================================================================

/// Error code reported when a reader fails its startup check.
pub const ERROR_RFID_INIT_FAILED: &str = "rfid_init_failed";

/// Boot reason for a normal power-on start.
pub const BOOT_REASON_POWER_ON: &str = "power_on";

/// Card technology reported in serial card records.
pub const CARD_TECH_MIFARE: &str = "MIFARE";

/// Firmware version reported when none is configured.
pub const UNKNOWN_FIRMWARE_VERSION: &str = "unknown";
