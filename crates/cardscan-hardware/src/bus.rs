//! Shared bus plumbing.
//!
//! The multiplexer and every reader sit on one physical I2C bus. Each
//! driver owns a [`SharedI2c`] handle; the handles serialize transactions
//! through a single async mutex. Transaction-level locking does not make a
//! select followed by a detect atomic: that guarantee comes from the
//! detection core holding both drivers exclusively for a whole scan.

use std::sync::Arc;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use tokio::sync::Mutex;

/// Cloneable handle to an I2C bus shared between drivers.
///
/// # Examples
///
/// ```ignore
/// let bus = SharedI2c::new(hal_i2c);
/// let mux = Tca9548a::new(bus.clone(), 2);
/// let reader = Mfrc522::new(bus, TokioDelay);
/// ```
#[derive(Debug)]
pub struct SharedI2c<I> {
    bus: Arc<Mutex<I>>,
}

impl<I> SharedI2c<I> {
    /// Wrap a bus so it can be handed to several drivers.
    pub fn new(bus: I) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
        }
    }
}

impl<I> Clone for SharedI2c<I> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<I: ErrorType> ErrorType for SharedI2c<I> {
    type Error = I::Error;
}

impl<I: I2c> I2c for SharedI2c<I> {
    async fn read(&mut self, address: SevenBitAddress, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.read(address, read).await
    }

    async fn write(&mut self, address: SevenBitAddress, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock().await.write(address, write).await
    }

    async fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.write_read(address, write, read).await
    }

    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}

/// [`DelayNs`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

impl DelayNs for TokioDelay {
    async fn delay_ns(&mut self, ns: u32) {
        tokio::time::sleep(std::time::Duration::from_nanos(u64::from(ns))).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        tokio::time::sleep(std::time::Duration::from_millis(u64::from(ms))).await;
    }
}
