//! Event delivery for the cardscan scanner.
//!
//! This crate defines the [`EventSink`] contract the detection core reports
//! through, and the transports that implement it.
//!
//! # Components
//!
//! - **JsonLinesSink**: one JSON object per line on stdout or a serial port
//! - **HttpSink**: POSTs cards and boots to the table server, with retry
//! - **EventDispatcher**: bounded queue and worker task in front of a slow sink
//! - **AnyEventSink**: runtime transport selection
//! - **MemorySink**: in-memory sink for tests and development
//!
//! # Example
//!
//! ```no_run
//! use cardscan_core::{Channel, OperatingMode, Uid};
//! use cardscan_network::{EventDispatcher, EventSink, HttpConfig, HttpSink};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = HttpSink::new(
//!     HttpConfig::new("http://192.168.0.10:8080"),
//!     "AA:BB:CC:DD:EE:FF",
//!     OperatingMode::Player,
//!     2,
//! )?;
//! let dispatcher = EventDispatcher::spawn(http, 32);
//! let mut sink = dispatcher.sink();
//!
//! sink.on_boot("power_on").await?;
//! sink.on_card_detected(Channel::from_index(0), "04 AA BB CC".parse()?).await?;
//!
//! dispatcher.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod any;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod memory;
pub mod serial;
pub mod sink;

pub use any::AnyEventSink;
pub use dispatcher::{DispatchStats, EventDispatcher, QueuedSink};
pub use error::{Result, SinkError};
pub use http::{HttpConfig, HttpSink};
pub use serial::{JsonLinesSink, open_serial_port};
pub use sink::EventSink;
