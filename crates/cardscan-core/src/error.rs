use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    // Channel errors
    #[error("Channel {channel} out of range (reader count {reader_count})")]
    ChannelOutOfRange { channel: usize, reader_count: usize },

    #[error("Reader count {0} exceeds the maximum of {max}", max = crate::constants::MAX_READERS)]
    TooManyReaders(usize),

    #[error("Reader count must be at least 1")]
    NoReaders,

    #[error("Mode {mode} requires exactly {expected} readers, got {actual}")]
    ReaderCountMismatch {
        mode: String,
        expected: usize,
        actual: usize,
    },

    // Card errors
    #[error("Invalid UID: {0}")]
    InvalidUid(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
