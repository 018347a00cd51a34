pub mod constants;
pub mod error;
pub mod event;
pub mod pairing;
pub mod types;

pub use error::{Error, Result};
pub use event::Event;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
