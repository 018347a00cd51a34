//! Enum wrapper for sink dispatch.
//!
//! `EventSink::emit` returns an opaque future, so the trait cannot be used
//! as `Box<dyn EventSink>`. The binary picks its transport at runtime and
//! hands the scanner an [`AnyEventSink`] instead.

use std::io::Stdout;

use cardscan_core::Event;
use serialport::SerialPort;

use crate::dispatcher::QueuedSink;
use crate::error::Result;
use crate::serial::JsonLinesSink;
use crate::sink::EventSink;

/// Every transport the scanner can report through.
#[non_exhaustive]
pub enum AnyEventSink {
    /// JSON Lines on the process stdout.
    Stdout(JsonLinesSink<Stdout>),

    /// JSON Lines on a serial device.
    Serial(JsonLinesSink<Box<dyn SerialPort>>),

    /// Queue in front of a background dispatcher (HTTP).
    Queued(QueuedSink),
}

impl AnyEventSink {
    /// Transport name for logs.
    pub fn transport(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Serial(_) => "serial",
            Self::Queued(_) => "http",
        }
    }
}

impl EventSink for AnyEventSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        match self {
            Self::Stdout(sink) => sink.emit(event).await,
            Self::Serial(sink) => sink.emit(event).await,
            Self::Queued(sink) => sink.emit(event).await,
        }
    }
}

impl std::fmt::Debug for AnyEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnyEventSink").field(&self.transport()).finish()
    }
}
