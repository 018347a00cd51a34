//! Background event delivery.
//!
//! An HTTP post can block for seconds while it retries. The dispatcher moves
//! delivery off the polling loop: the loop hands owned events to a
//! [`QueuedSink`], which pushes them into a bounded channel, and a worker
//! task feeds them to the real sink one at a time, in order.
//!
//! ```text
//! ┌──────────┐  try_send  ┌──────────────┐  emit  ┌──────────┐
//! │ Scanner  │───────────►│ mpsc (bound) │───────►│ HttpSink │
//! │ (tick)   │            └──────────────┘ worker └──────────┘
//! └──────────┘
//! ```
//!
//! The queue never blocks the loop. When it is full the event is dropped and
//! the producer gets [`SinkError::QueueFull`], so a card read is retried on
//! the next tick like any other delivery failure.

use cardscan_core::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{Result, SinkError};
use crate::sink::EventSink;

/// Outcome counters of a dispatcher worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events the inner sink accepted.
    pub delivered: u64,

    /// Events the inner sink rejected.
    pub failed: u64,
}

/// Owns the worker task that drains the event queue into a sink.
///
/// # Examples
///
/// ```no_run
/// use cardscan_core::Event;
/// use cardscan_network::{EventDispatcher, EventSink, HttpConfig, HttpSink};
/// use cardscan_core::OperatingMode;
///
/// # async fn example() -> cardscan_network::Result<()> {
/// let http = HttpSink::new(HttpConfig::new("http://table.local"), "table-1", OperatingMode::Board, 5)?;
/// let dispatcher = EventDispatcher::spawn(http, 32);
///
/// let mut sink = dispatcher.sink();
/// sink.emit(Event::power_on()).await?;
///
/// let stats = dispatcher.shutdown().await;
/// println!("delivered {}", stats.delivered);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventDispatcher {
    tx: mpsc::Sender<Event>,
    shutdown_tx: oneshot::Sender<()>,
    worker: JoinHandle<DispatchStats>,
}

impl EventDispatcher {
    /// Spawn a worker delivering to `sink` through a queue of `capacity` events.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn<S>(sink: S, capacity: usize) -> Self
    where
        S: EventSink + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(Self::worker(sink, rx, shutdown_rx));

        Self {
            tx,
            shutdown_tx,
            worker,
        }
    }

    /// Producer side of the queue.
    pub fn sink(&self) -> QueuedSink {
        QueuedSink {
            tx: self.tx.clone(),
        }
    }

    /// Events waiting in the queue.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Stop accepting events, deliver what is queued and wait for the worker.
    pub async fn shutdown(self) -> DispatchStats {
        let _ = self.shutdown_tx.send(());
        drop(self.tx);

        match self.worker.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Dispatcher worker terminated abnormally");
                DispatchStats::default()
            }
        }
    }

    async fn worker<S: EventSink>(
        mut sink: S,
        mut rx: mpsc::Receiver<Event>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();

        loop {
            tokio::select! {
                biased;
                event = rx.recv() => match event {
                    Some(event) => Self::deliver(&mut sink, event, &mut stats).await,
                    None => break,
                },
                _ = &mut shutdown_rx => {
                    rx.close();
                    while let Some(event) = rx.recv().await {
                        Self::deliver(&mut sink, event, &mut stats).await;
                    }
                    break;
                }
            }
        }

        debug!(
            delivered = stats.delivered,
            failed = stats.failed,
            "Dispatcher worker stopped"
        );
        stats
    }

    async fn deliver<S: EventSink>(sink: &mut S, event: Event, stats: &mut DispatchStats) {
        let kind = event.kind();
        match sink.emit(event).await {
            Ok(()) => stats.delivered += 1,
            Err(e) => {
                stats.failed += 1;
                warn!(kind, error = %e, "Event delivery failed");
            }
        }
    }
}

/// Sink that enqueues events for an [`EventDispatcher`].
///
/// `Ok` means the event was queued, not that it reached the server.
#[derive(Debug, Clone)]
pub struct QueuedSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink for QueuedSink {
    async fn emit(&mut self, event: Event) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(kind = event.kind(), "Event queue full, dropping event");
                Err(SinkError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkError::QueueClosed),
        }
    }
}
