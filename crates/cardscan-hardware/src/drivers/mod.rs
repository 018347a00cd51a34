//! Drivers for the devices on the scanner bus.

pub mod mfrc522;
pub mod tca9548a;

pub use mfrc522::Mfrc522;
pub use tca9548a::Tca9548a;
