//! Detection core of the cardscan scanner.
//!
//! This crate turns raw per-channel reads into reported cards: it keeps
//! the per-channel detection state, applies the cooldown so a card lying on
//! an antenna is reported once and not every cycle, and decides per
//! operating mode which reads are worth reporting.

pub mod clock;
pub mod history;
pub mod scanner;

pub use clock::{ManualClock, MonotonicClock, TokioClock, elapsed_ms};
pub use history::{CardHistory, SentCard};
pub use scanner::{ScanStats, Scanner, ScannerConfig, TickReport};
