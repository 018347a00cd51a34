//! Hardware device trait definitions.
//!
//! This module defines the contract between the detection core and the
//! devices on the shared bus: a channel multiplexer, the card reader that
//! sits behind every channel, and the pair indicator LED. Mock and real
//! drivers implement the same traits, so the core never knows which one it
//! is talking to.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use cardscan_core::{Channel, Uid};

use crate::error::Result;
use crate::types::LedColor;

/// Bus switch that routes the shared bus to one downstream channel.
///
/// After a successful [`select`](Multiplexer::select), every reader
/// operation targets the selected channel until the next call.
///
/// # Object Safety and Dynamic Dispatch
///
/// This trait is NOT object-safe because `async fn` methods return opaque
/// futures. Use generic type parameters:
///
/// ```no_run
/// use cardscan_core::Channel;
/// use cardscan_hardware::traits::Multiplexer;
/// use cardscan_hardware::error::Result;
///
/// async fn select_all<M: Multiplexer>(mux: &mut M) -> Result<()> {
///     for channel in Channel::all(mux.channel_count()) {
///         mux.select(channel).await?;
///     }
///     Ok(())
/// }
/// ```
pub trait Multiplexer: Send + Sync {
    /// Number of channels wired on this device.
    fn channel_count(&self) -> usize;

    /// Route the bus to `channel`.
    ///
    /// Channels at or beyond [`channel_count`](Multiplexer::channel_count)
    /// are ignored and return `Ok(())` without touching the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the control write fails on the bus. The
    /// previously selected channel must be considered unknown afterwards.
    async fn select(&mut self, channel: Channel) -> Result<()>;
}

/// RFID transceiver reached through the currently selected channel.
///
/// # Examples
///
/// ```no_run
/// use cardscan_core::Channel;
/// use cardscan_hardware::traits::{CardReader, Multiplexer};
///
/// async fn read_channel<M: Multiplexer, R: CardReader>(
///     mux: &mut M,
///     reader: &mut R,
///     channel: Channel,
/// ) -> Option<String> {
///     mux.select(channel).await.ok()?;
///     reader.detect().await.map(|uid| uid.to_hex())
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Identify and configure the reader on the selected channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader does not answer on the bus or does
    /// not come out of reset.
    async fn initialize(&mut self) -> Result<()>;

    /// Read the UID of a card in the field of the selected reader.
    ///
    /// Returns `None` when no card answers or the UID cannot be read.
    /// Card absence is the normal outcome of most polls, so failures are
    /// never reported as errors here.
    async fn detect(&mut self) -> Option<Uid>;
}

/// Status LED driven from pair completion.
pub trait Indicator: Send + Sync {
    /// Set the LED color.
    ///
    /// # Errors
    ///
    /// Returns an error if the LED cannot be driven.
    async fn set_color(&mut self, color: LedColor) -> Result<()>;
}
