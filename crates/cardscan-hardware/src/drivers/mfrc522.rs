//! MFRC522 contactless reader driven over I2C.
//!
//! The driver only retrieves card UIDs: it sends REQA, runs the ISO 14443-3
//! anticollision loop over up to three cascade levels and selects the card.
//! Reading or writing card memory is out of scope.
//!
//! # Detection sequence
//!
//! ```text
//! REQA (7 bits) ──► ATQA (2 bytes)
//! SEL CLn 0x20  ──► UID CLn (4 bytes) + BCC
//! SEL CLn 0x70 + UID CLn + BCC + CRC_A ──► SAK + CRC_A
//!                       └─ SAK bit 2 set: UID incomplete, next cascade level
//! ```
//!
//! A card that was selected during the previous poll stays ACTIVE and
//! ignores the first REQA, which only returns it to IDLE. Detection
//! therefore issues a second request when the first one gets no answer.

use cardscan_core::Uid;
use cardscan_core::constants::READER_I2C_ADDRESS;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::traits::CardReader;
use crate::types::ReaderInfo;

/// Register map (I2C addresses, no SPI shift).
mod reg {
    pub const COMMAND: u8 = 0x01;
    pub const COM_IRQ: u8 = 0x04;
    pub const ERROR: u8 = 0x06;
    pub const FIFO_DATA: u8 = 0x09;
    pub const FIFO_LEVEL: u8 = 0x0A;
    pub const CONTROL: u8 = 0x0C;
    pub const BIT_FRAMING: u8 = 0x0D;
    pub const COLL: u8 = 0x0E;
    pub const MODE: u8 = 0x11;
    pub const TX_MODE: u8 = 0x12;
    pub const RX_MODE: u8 = 0x13;
    pub const TX_CONTROL: u8 = 0x14;
    pub const TX_ASK: u8 = 0x15;
    pub const MOD_WIDTH: u8 = 0x24;
    pub const T_MODE: u8 = 0x2A;
    pub const T_PRESCALER: u8 = 0x2B;
    pub const T_RELOAD_H: u8 = 0x2C;
    pub const T_RELOAD_L: u8 = 0x2D;
    pub const VERSION: u8 = 0x37;
}

/// Transceiver commands.
mod cmd {
    pub const IDLE: u8 = 0x00;
    pub const TRANSCEIVE: u8 = 0x0C;
    pub const SOFT_RESET: u8 = 0x0F;
}

/// ISO 14443-3 card commands.
mod picc {
    pub const REQA: u8 = 0x26;
    pub const SEL_CL1: u8 = 0x93;
    pub const SEL_CL2: u8 = 0x95;
    pub const SEL_CL3: u8 = 0x97;
    pub const NVB_ANTICOLLISION: u8 = 0x20;
    pub const NVB_SELECT: u8 = 0x70;
    pub const CASCADE_TAG: u8 = 0x88;
    pub const SAK_CASCADE: u8 = 0x04;
}

const POWER_DOWN: u8 = 0x10;
const START_SEND: u8 = 0x80;
const VALUES_AFTER_COLL: u8 = 0x80;
const FIFO_FLUSH: u8 = 0x80;
const CLEAR_ALL_IRQ: u8 = 0x7F;
const RX_IDLE_IRQ: u8 = 0x30;
const TIMER_IRQ: u8 = 0x01;
const ERROR_FATAL_MASK: u8 = 0x13;
const ERROR_COLLISION: u8 = 0x08;

/// Upper bound on interrupt register polls per transceive.
///
/// The on-chip timer fires after ~25ms, well before this is exhausted on a
/// 100 kHz bus.
const MAX_IRQ_POLLS: usize = 2000;
const TRANSCEIVE_TIMEOUT_MS: u64 = 25;
const RESET_SETTLE_MS: u32 = 50;
const RESET_POLLS: usize = 3;

/// Largest frame the driver ever sends (SELECT with CRC).
const MAX_FRAME: usize = 9;

/// Compute the ISO 14443-3 type A CRC of `data`, low byte first.
pub fn crc_a(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        let mut ch = byte ^ (crc as u8);
        ch ^= ch << 4;
        let ch = u16::from(ch);
        crc = (crc >> 8) ^ (ch << 8) ^ (ch << 3) ^ (ch >> 4);
    }
    [crc as u8, (crc >> 8) as u8]
}

/// Received frame size and the number of valid bits in its last byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    len: usize,
    last_bits: u8,
}

/// MFRC522 reader on an I2C bus.
#[derive(Debug)]
pub struct Mfrc522<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Mfrc522<I, D> {
    /// Create a driver for a reader at the default address.
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: READER_I2C_ADDRESS,
        }
    }

    /// Identify, reset and configure the reader, returning the chip identity.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the reader does not answer at its
    /// address or stays in power-down after the soft reset.
    pub async fn init(&mut self) -> Result<ReaderInfo> {
        let address = self.address;
        self.i2c.write(address, &[]).await.map_err(|e| {
            HardwareError::initialization_failed(format!(
                "no reader at 0x{address:02X}: {}",
                HardwareError::from_i2c(address, e)
            ))
        })?;
        let version = self.read_register(reg::VERSION).await?;

        self.soft_reset().await?;

        self.write_register(reg::TX_MODE, 0x00).await?;
        self.write_register(reg::RX_MODE, 0x00).await?;
        self.write_register(reg::MOD_WIDTH, 0x26).await?;

        // Timer: auto start, f = 13.56 MHz / (2 * 0xA9 + 1) ~ 40 kHz,
        // reload 1000 ticks ~ 25ms receive timeout.
        self.write_register(reg::T_MODE, 0x80).await?;
        self.write_register(reg::T_PRESCALER, 0xA9).await?;
        self.write_register(reg::T_RELOAD_H, 0x03).await?;
        self.write_register(reg::T_RELOAD_L, 0xE8).await?;

        // 100% ASK modulation, CRC preset 0x6363.
        self.write_register(reg::TX_ASK, 0x40).await?;
        self.write_register(reg::MODE, 0x3D).await?;

        self.antenna_on().await?;

        let info = ReaderInfo::new("MFRC522", version);
        debug!(
            address = self.address,
            version = info.version,
            revision = info.revision(),
            "Reader initialized"
        );
        Ok(info)
    }

    /// Read the UID of the card in the field.
    ///
    /// # Errors
    ///
    /// Returns `NoCard` when nothing answers, or a protocol error when the
    /// anticollision exchange is corrupted.
    pub async fn read_uid(&mut self) -> Result<Uid> {
        if self.is_new_card_present().await.is_err() {
            self.is_new_card_present().await?;
        }
        self.select_card().await
    }

    /// Send REQA and wait for an ATQA.
    pub async fn request_a(&mut self) -> Result<[u8; 2]> {
        self.clear_bits(reg::COLL, VALUES_AFTER_COLL).await?;

        let mut atqa = [0u8; 2];
        let frame = self.transceive(&[picc::REQA], 7, &mut atqa).await?;
        if frame.len != 2 || frame.last_bits != 0 {
            return Err(HardwareError::protocol(format!(
                "unexpected ATQA length {} bytes",
                frame.len
            )));
        }
        Ok(atqa)
    }

    async fn is_new_card_present(&mut self) -> Result<()> {
        self.write_register(reg::TX_MODE, 0x00).await?;
        self.write_register(reg::RX_MODE, 0x00).await?;
        self.write_register(reg::MOD_WIDTH, 0x26).await?;
        self.request_a().await.map(|_| ())
    }

    async fn select_card(&mut self) -> Result<Uid> {
        self.clear_bits(reg::COLL, VALUES_AFTER_COLL).await?;

        let mut uid = Vec::with_capacity(10);
        for sel in [picc::SEL_CL1, picc::SEL_CL2, picc::SEL_CL3] {
            let mut answer = [0u8; 5];
            let frame = self
                .transceive(&[sel, picc::NVB_ANTICOLLISION], 0, &mut answer)
                .await?;
            if frame.len != 5 {
                return Err(HardwareError::protocol(format!(
                    "anticollision answer of {} bytes",
                    frame.len
                )));
            }

            let bcc = answer[..4].iter().fold(0u8, |acc, b| acc ^ b);
            if bcc != answer[4] {
                return Err(HardwareError::protocol("BCC mismatch"));
            }

            let mut select = [0u8; MAX_FRAME];
            select[0] = sel;
            select[1] = picc::NVB_SELECT;
            select[2..7].copy_from_slice(&answer);
            let crc = crc_a(&select[..7]);
            select[7..9].copy_from_slice(&crc);

            let mut sak = [0u8; 3];
            let frame = self.transceive(&select, 0, &mut sak).await?;
            if frame.len != 3 || frame.last_bits != 0 {
                return Err(HardwareError::protocol(format!(
                    "SAK of {} bytes",
                    frame.len
                )));
            }
            if crc_a(&sak[..1]) != [sak[1], sak[2]] {
                return Err(HardwareError::protocol("SAK CRC mismatch"));
            }

            let incomplete = sak[0] & picc::SAK_CASCADE != 0;
            if answer[0] == picc::CASCADE_TAG {
                if !incomplete {
                    return Err(HardwareError::protocol("cascade tag on a complete UID"));
                }
                uid.extend_from_slice(&answer[1..4]);
            } else {
                uid.extend_from_slice(&answer[..4]);
            }

            if !incomplete {
                trace!(sak = sak[0], len = uid.len(), "Card selected");
                return Uid::new(uid).map_err(|e| HardwareError::protocol(e.to_string()));
            }
        }

        Err(HardwareError::protocol("UID longer than three cascade levels"))
    }

    async fn transceive(&mut self, send: &[u8], tx_last_bits: u8, recv: &mut [u8]) -> Result<Frame> {
        self.write_register(reg::COMMAND, cmd::IDLE).await?;
        self.write_register(reg::COM_IRQ, CLEAR_ALL_IRQ).await?;
        self.write_register(reg::FIFO_LEVEL, FIFO_FLUSH).await?;
        self.write_fifo(send).await?;
        self.write_register(reg::BIT_FRAMING, tx_last_bits & 0x07).await?;
        self.write_register(reg::COMMAND, cmd::TRANSCEIVE).await?;
        self.set_bits(reg::BIT_FRAMING, START_SEND).await?;

        let mut completed = false;
        for _ in 0..MAX_IRQ_POLLS {
            let irq = self.read_register(reg::COM_IRQ).await?;
            if irq & RX_IDLE_IRQ != 0 {
                completed = true;
                break;
            }
            if irq & TIMER_IRQ != 0 {
                return Err(HardwareError::NoCard);
            }
        }
        if !completed {
            return Err(HardwareError::timeout(TRANSCEIVE_TIMEOUT_MS));
        }

        let error = self.read_register(reg::ERROR).await?;
        if error & ERROR_FATAL_MASK != 0 {
            return Err(HardwareError::protocol(format!("transceiver error 0x{error:02X}")));
        }
        if error & ERROR_COLLISION != 0 {
            return Err(HardwareError::Collision);
        }

        let len = usize::from(self.read_register(reg::FIFO_LEVEL).await? & 0x7F);
        if len > recv.len() {
            return Err(HardwareError::protocol(format!(
                "response of {len} bytes exceeds buffer of {}",
                recv.len()
            )));
        }
        self.read_fifo(&mut recv[..len]).await?;
        let last_bits = self.read_register(reg::CONTROL).await? & 0x07;

        Ok(Frame { len, last_bits })
    }

    async fn soft_reset(&mut self) -> Result<()> {
        self.write_register(reg::COMMAND, cmd::SOFT_RESET).await?;
        for _ in 0..RESET_POLLS {
            self.delay.delay_ms(RESET_SETTLE_MS).await;
            if self.read_register(reg::COMMAND).await? & POWER_DOWN == 0 {
                return Ok(());
            }
        }
        Err(HardwareError::initialization_failed(
            "reader did not leave power-down after reset",
        ))
    }

    async fn antenna_on(&mut self) -> Result<()> {
        let value = self.read_register(reg::TX_CONTROL).await?;
        if value & 0x03 != 0x03 {
            self.write_register(reg::TX_CONTROL, value | 0x03).await?;
        }
        Ok(())
    }

    async fn read_register(&mut self, register: u8) -> Result<u8> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut value)
            .await
            .map_err(|e| HardwareError::from_i2c(self.address, e))?;
        Ok(value[0])
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|e| HardwareError::from_i2c(self.address, e))
    }

    async fn set_bits(&mut self, register: u8, mask: u8) -> Result<()> {
        let value = self.read_register(register).await?;
        self.write_register(register, value | mask).await
    }

    async fn clear_bits(&mut self, register: u8, mask: u8) -> Result<()> {
        let value = self.read_register(register).await?;
        self.write_register(register, value & !mask).await
    }

    async fn write_fifo(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > MAX_FRAME {
            return Err(HardwareError::protocol("frame too long for FIFO write"));
        }
        let mut buffer = [0u8; MAX_FRAME + 1];
        buffer[0] = reg::FIFO_DATA;
        buffer[1..=data.len()].copy_from_slice(data);
        self.i2c
            .write(self.address, &buffer[..=data.len()])
            .await
            .map_err(|e| HardwareError::from_i2c(self.address, e))
    }

    async fn read_fifo(&mut self, buffer: &mut [u8]) -> Result<()> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.i2c
            .write_read(self.address, &[reg::FIFO_DATA], buffer)
            .await
            .map_err(|e| HardwareError::from_i2c(self.address, e))
    }
}

impl<I, D> CardReader for Mfrc522<I, D>
where
    I: I2c + Send + Sync,
    D: DelayNs + Send + Sync,
{
    async fn initialize(&mut self) -> Result<()> {
        self.init().await.map(|_| ())
    }

    async fn detect(&mut self) -> Option<Uid> {
        match self.read_uid().await {
            Ok(uid) => Some(uid),
            Err(HardwareError::NoCard) => None,
            Err(e) => {
                trace!(error = %e, "Card read failed");
                None
            }
        }
    }
}
