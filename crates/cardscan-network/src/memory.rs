//! In-memory sink for testing and development.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use cardscan_core::Event;

use crate::error::{Result, SinkError};
use crate::sink::EventSink;

#[derive(Debug, Default)]
struct Shared {
    events: Mutex<Vec<Event>>,
    failures: AtomicUsize,
}

/// Sink that keeps every delivered event in memory.
///
/// # Examples
///
/// ```
/// use cardscan_core::Event;
/// use cardscan_network::EventSink;
/// use cardscan_network::memory::MemorySink;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (mut sink, handle) = MemorySink::new();
/// handle.fail_next(1);
///
/// assert!(sink.emit(Event::power_on()).await.is_err());
/// assert!(sink.emit(Event::power_on()).await.is_ok());
/// assert_eq!(handle.events(), vec![Event::power_on()]);
/// # }
/// ```
#[derive(Debug)]
pub struct MemorySink {
    shared: Arc<Shared>,
}

impl MemorySink {
    /// Create a sink and the handle that inspects it.
    pub fn new() -> (Self, MemorySinkHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                shared: Arc::clone(&shared),
            },
            MemorySinkHandle { shared },
        )
    }
}

impl EventSink for MemorySink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        let failing = self
            .shared
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SinkError::http("simulated delivery failure"));
        }

        self.shared
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

/// Inspection and fault-injection side of a [`MemorySink`].
#[derive(Debug, Clone)]
pub struct MemorySinkHandle {
    shared: Arc<Shared>,
}

impl MemorySinkHandle {
    /// Events delivered so far, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.shared
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the delivered events.
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(
            &mut *self
                .shared
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Fail the next `count` deliveries.
    pub fn fail_next(&self, count: usize) {
        self.shared.failures.store(count, Ordering::SeqCst);
    }
}
