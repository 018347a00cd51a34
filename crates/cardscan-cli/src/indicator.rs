//! Pair indicator for hosts without an LED.

use cardscan_core::PairId;
use cardscan_hardware::{Indicator, LedColor, Result};
use tracing::info;

/// Logs every color change of the pair LED.
#[derive(Debug)]
pub struct LogIndicator {
    pair: PairId,
}

impl LogIndicator {
    pub fn new(pair: PairId) -> Self {
        Self { pair }
    }
}

impl Indicator for LogIndicator {
    async fn set_color(&mut self, color: LedColor) -> Result<()> {
        info!(pair = self.pair.as_u8(), ?color, "Pair indicator");
        Ok(())
    }
}
