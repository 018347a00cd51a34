//! Event sink contract.
//!
//! A sink takes ownership of each [`Event`] the detection core produces and
//! moves it off the device. The core treats an `Err` as "not delivered": it
//! keeps no record of the card and the next tick will try again.
//!
//! `emit` is declared with an explicit `Send` future so that a sink can be
//! moved into a background task (see [`EventDispatcher`](crate::EventDispatcher)).
//! Implementors still write a plain `async fn`.

use std::future::Future;

use cardscan_core::{Channel, Event, Uid};

use crate::error::Result;

/// Destination for detection, error and boot events.
///
/// # Examples
///
/// ```
/// use cardscan_core::Event;
/// use cardscan_network::{EventSink, Result};
///
/// struct Stderr;
///
/// impl EventSink for Stderr {
///     async fn emit(&mut self, event: Event) -> Result<()> {
///         eprintln!("{event}");
///         Ok(())
///     }
/// }
/// ```
pub trait EventSink: Send {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event was not delivered.
    fn emit(&mut self, event: Event) -> impl Future<Output = Result<()>> + Send;

    /// Report a card read on `channel`.
    fn on_card_detected(
        &mut self,
        channel: Channel,
        uid: Uid,
    ) -> impl Future<Output = Result<()>> + Send {
        self.emit(Event::card_detected(channel, uid))
    }

    /// Report a device error.
    fn on_error(
        &mut self,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> impl Future<Output = Result<()>> + Send {
        self.emit(Event::error(code, message))
    }

    /// Report a boot with the given reason slug.
    fn on_boot(&mut self, reason: impl Into<String>) -> impl Future<Output = Result<()>> + Send {
        self.emit(Event::boot(reason))
    }
}

impl<S: EventSink> EventSink for &mut S {
    fn emit(&mut self, event: Event) -> impl Future<Output = Result<()>> + Send {
        (**self).emit(event)
    }
}
