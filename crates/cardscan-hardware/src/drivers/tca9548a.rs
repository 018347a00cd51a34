//! TCA9548A eight-channel I2C switch.
//!
//! The switch has a single control register: bit `n` connects downstream
//! channel `n`. The driver always writes a one-hot mask, so exactly one
//! reader is on the bus after a select.

use cardscan_core::Channel;
use cardscan_core::constants::{MAX_READERS, MULTIPLEXER_I2C_ADDRESS};
use embedded_hal_async::i2c::I2c;
use tracing::trace;

use crate::error::{HardwareError, Result};
use crate::traits::Multiplexer;

/// Channels physically present on the switch.
pub const SWITCH_CHANNELS: usize = 8;

/// TCA9548A driver limited to the channels that have a reader wired.
#[derive(Debug)]
pub struct Tca9548a<I> {
    i2c: I,
    address: u8,
    channel_count: usize,
    selected: Option<Channel>,
}

impl<I: I2c> Tca9548a<I> {
    /// Create a driver for `channel_count` wired channels at the default address.
    ///
    /// The count is capped at the number of supported readers.
    pub fn new(i2c: I, channel_count: usize) -> Self {
        Self {
            i2c,
            address: MULTIPLEXER_I2C_ADDRESS,
            channel_count: channel_count.min(MAX_READERS).min(SWITCH_CHANNELS),
            selected: None,
        }
    }

    /// Channel routed by the last successful select.
    pub fn selected(&self) -> Option<Channel> {
        self.selected
    }

}

impl<I> Multiplexer for Tca9548a<I>
where
    I: I2c + Send + Sync,
{
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    async fn select(&mut self, channel: Channel) -> Result<()> {
        if channel.index() >= self.channel_count {
            return Ok(());
        }

        let mask = 1u8 << channel.as_u8();
        match self.i2c.write(self.address, &[mask]).await {
            Ok(()) => {
                trace!(channel = channel.as_u8(), "Channel selected");
                self.selected = Some(channel);
                Ok(())
            }
            Err(e) => {
                self.selected = None;
                Err(HardwareError::from_i2c(self.address, e))
            }
        }
    }
}
