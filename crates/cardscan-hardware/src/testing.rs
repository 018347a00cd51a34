//! Register-level bus fake for driver tests.
//!
//! [`FakeI2c`] answers at the reader address with a small MFRC522 model: a
//! register file, a FIFO and a card that walks through the ISO 14443-3
//! IDLE, READY and ACTIVE states. Every write on any address is logged.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use cardscan_core::constants::READER_I2C_ADDRESS;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use crate::drivers::mfrc522::crc_a;

const COMMAND: usize = 0x01;
const COM_IRQ: usize = 0x04;
const ERROR: usize = 0x06;
const FIFO_DATA: usize = 0x09;
const FIFO_LEVEL: usize = 0x0A;
const CONTROL: usize = 0x0C;
const BIT_FRAMING: usize = 0x0D;
const VERSION: usize = 0x37;

const SOFT_RESET: u8 = 0x0F;
const TRANSCEIVE: u8 = 0x0C;

pub type WriteLog = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardState {
    Idle,
    Ready,
    Active,
}

#[derive(Debug)]
struct FakeState {
    registers: [u8; 64],
    fifo: VecDeque<u8>,
    pointer: usize,
    absent: HashSet<u8>,
    card: Option<Vec<u8>>,
    card_state: CardState,
    corrupt_bcc: bool,
}

impl FakeState {
    fn new() -> Self {
        let mut state = Self {
            registers: [0; 64],
            fifo: VecDeque::new(),
            pointer: 0,
            absent: HashSet::new(),
            card: None,
            card_state: CardState::Idle,
            corrupt_bcc: false,
        };
        state.reset();
        state
    }

    fn reset(&mut self) {
        self.registers = [0; 64];
        self.registers[COMMAND] = 0x20;
        self.registers[VERSION] = 0x92;
        self.fifo.clear();
    }

    fn write(&mut self, bytes: &[u8]) {
        let Some((&register, data)) = bytes.split_first() else {
            return;
        };
        self.pointer = usize::from(register) & 0x3F;
        let Some(&value) = data.first() else {
            return;
        };

        match self.pointer {
            FIFO_DATA => self.fifo.extend(data),
            COMMAND if value & 0x0F == SOFT_RESET => self.reset(),
            COM_IRQ => {
                if value & 0x80 != 0 {
                    self.registers[COM_IRQ] |= value & 0x7F;
                } else {
                    self.registers[COM_IRQ] &= !value;
                }
            }
            FIFO_LEVEL => {
                if value & 0x80 != 0 {
                    self.fifo.clear();
                }
            }
            BIT_FRAMING => {
                self.registers[BIT_FRAMING] = value & 0x7F;
                if value & 0x80 != 0 && self.registers[COMMAND] & 0x0F == TRANSCEIVE {
                    self.transceive(value & 0x07);
                }
            }
            register => self.registers[register] = value,
        }
    }

    fn read(&mut self, buffer: &mut [u8]) {
        match self.pointer {
            FIFO_DATA => {
                for byte in buffer.iter_mut() {
                    *byte = self.fifo.pop_front().unwrap_or(0);
                }
            }
            FIFO_LEVEL => buffer.fill(self.fifo.len() as u8),
            register => buffer.fill(self.registers[register]),
        }
    }

    fn transceive(&mut self, tx_last_bits: u8) {
        let request: Vec<u8> = self.fifo.drain(..).collect();
        self.registers[ERROR] = 0;
        self.registers[CONTROL] = 0;
        match self.respond(&request, tx_last_bits) {
            Some(response) => {
                self.fifo.extend(response);
                self.registers[COM_IRQ] |= 0x30;
            }
            None => self.registers[COM_IRQ] |= 0x01,
        }
    }

    fn respond(&mut self, request: &[u8], tx_last_bits: u8) -> Option<Vec<u8>> {
        let uid = self.card.clone()?;
        match request {
            [0x26] if tx_last_bits == 7 => match self.card_state {
                CardState::Active => {
                    self.card_state = CardState::Idle;
                    None
                }
                _ => {
                    self.card_state = CardState::Ready;
                    Some(vec![0x44, 0x00])
                }
            },
            [sel, 0x20] if self.card_state == CardState::Ready => {
                let mut answer = cascade_level(&uid, *sel)?.to_vec();
                let mut bcc = answer.iter().fold(0u8, |acc, b| acc ^ b);
                if self.corrupt_bcc {
                    bcc ^= 0xFF;
                }
                answer.push(bcc);
                Some(answer)
            }
            [sel, 0x70, rest @ ..] if self.card_state == CardState::Ready && rest.len() == 7 => {
                let crc = crc_a(&request[..7]);
                if crc != [rest[5], rest[6]] {
                    return None;
                }
                let complete = is_last_level(&uid, *sel);
                let sak = if complete { 0x08 } else { 0x04 };
                if complete {
                    self.card_state = CardState::Active;
                }
                let crc = crc_a(&[sak]);
                Some(vec![sak, crc[0], crc[1]])
            }
            _ => None,
        }
    }
}

fn level_index(sel: u8) -> Option<usize> {
    match sel {
        0x93 => Some(0),
        0x95 => Some(1),
        0x97 => Some(2),
        _ => None,
    }
}

fn levels(uid: &[u8]) -> usize {
    match uid.len() {
        0..=4 => 1,
        5..=7 => 2,
        _ => 3,
    }
}

fn is_last_level(uid: &[u8], sel: u8) -> bool {
    level_index(sel).is_some_and(|level| level + 1 == levels(uid))
}

fn cascade_level(uid: &[u8], sel: u8) -> Option<[u8; 4]> {
    let level = level_index(sel)?;
    if level >= levels(uid) {
        return None;
    }
    let start = level * 3;
    if level + 1 == levels(uid) {
        uid.get(start..start + 4)?.try_into().ok()
    } else {
        let part = uid.get(start..start + 3)?;
        Some([0x88, part[0], part[1], part[2]])
    }
}

/// Cloneable bus fake; clones share state.
#[derive(Debug, Clone)]
pub struct FakeI2c {
    state: Arc<Mutex<FakeState>>,
    log: WriteLog,
}

impl FakeI2c {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::new())),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> WriteLog {
        Arc::clone(&self.log)
    }

    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == address)
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    pub fn register(&self, address: u8, register: u8) -> u8 {
        assert_eq!(address, READER_I2C_ADDRESS);
        self.state.lock().unwrap().registers[usize::from(register)]
    }

    /// Make `address` NACK every transaction.
    pub fn set_absent(&self, address: u8, absent: bool) {
        let mut state = self.state.lock().unwrap();
        if absent {
            state.absent.insert(address);
        } else {
            state.absent.remove(&address);
        }
    }

    pub fn place_card(&self, uid: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.card = Some(uid);
        state.card_state = CardState::Idle;
    }

    pub fn remove_card(&self) {
        let mut state = self.state.lock().unwrap();
        state.card = None;
        state.card_state = CardState::Idle;
    }

    pub fn corrupt_bcc(&self, corrupt: bool) {
        self.state.lock().unwrap().corrupt_bcc = corrupt;
    }
}

impl ErrorType for FakeI2c {
    type Error = ErrorKind;
}

impl I2c for FakeI2c {
    async fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut state = self.state.lock().unwrap();
        if state.absent.contains(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    self.log.lock().unwrap().push((address, bytes.to_vec()));
                    if address == READER_I2C_ADDRESS {
                        state.write(bytes);
                    }
                }
                Operation::Read(buffer) => {
                    if address == READER_I2C_ADDRESS {
                        state.read(buffer);
                    } else {
                        buffer.fill(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Delay that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    async fn delay_ns(&mut self, _ns: u32) {}
}
