//! Hardware layer for the cardscan multi-antenna RFID scanner.
//!
//! Every reader sits behind one TCA9548A I2C switch and shares a single
//! bus address, so a reader can only be reached after the switch has routed
//! the bus to its channel. This crate provides:
//!
//! - the device contracts ([`Multiplexer`], [`CardReader`], [`Indicator`]);
//! - async I2C drivers for the TCA9548A and MFRC522, written against
//!   `embedded-hal-async` so they run on any HAL that implements it;
//! - [`SharedI2c`], which lets both drivers own a handle to the same bus;
//! - a simulated table ([`mock::MockTable`]) for development without
//!   hardware.
//!
//! # Wiring
//!
//! The crate ships no platform bus. A board support package hands its
//! `embedded-hal-async` I2C peripheral to [`SharedI2c::new`] and builds the
//! drivers on top, as in the example below; the `cardscan` binary runs the
//! same detection core against the simulated table instead.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All bus operations use native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Absence is not an error**: [`CardReader::detect`] returns `Option`;
//!   a missing or unreadable card is the common case of every poll.
//!
//! # Example
//!
//! ```no_run
//! use cardscan_core::Channel;
//! use cardscan_hardware::{CardReader, Multiplexer, SharedI2c, TokioDelay};
//! use cardscan_hardware::drivers::{Mfrc522, Tca9548a};
//! use embedded_hal_async::i2c::I2c;
//!
//! async fn scan_once<I: I2c + Send + Sync>(i2c: I) -> cardscan_hardware::Result<()> {
//!     let bus = SharedI2c::new(i2c);
//!     let mut mux = Tca9548a::new(bus.clone(), 2);
//!     let mut reader = Mfrc522::new(bus, TokioDelay);
//!
//!     for channel in Channel::all(mux.channel_count()) {
//!         mux.select(channel).await?;
//!         reader.initialize().await?;
//!         if let Some(uid) = reader.detect().await {
//!             println!("{channel}: {uid}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod drivers;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use bus::{SharedI2c, TokioDelay};
pub use error::{HardwareError, Result};
pub use traits::{CardReader, Indicator, Multiplexer};
pub use types::{LedColor, ReaderInfo};
