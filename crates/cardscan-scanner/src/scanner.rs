//! Detection core.
//!
//! The [`Scanner`] owns the multiplexer, the reader and the sink. One call
//! to [`Scanner::tick`] is one scan cycle:
//!
//! 1. Clear the detection state of every channel.
//! 2. For each channel in order: route the bus to it, poll the reader and
//!    stage the UID if a card answered.
//! 3. Apply the emission policy of the operating mode, subject to the
//!    per-channel cooldown.
//!
//! # Emission policy
//!
//! | Mode | Rule |
//! |------|------|
//! | `Player`, `Muck` | report only when channels 0 and 1 both hold a card, channel 0 first |
//! | `Board` | report each channel on its own, pausing between reports |
//! | `Unknown` | report each channel on its own, no pause |
//!
//! # Failure handling
//!
//! Nothing that happens during a tick stops the scanner. A channel that
//! cannot be selected or read counts as empty. A card the sink rejects is
//! not remembered, so the next tick reports it again.

use std::time::Duration;

use cardscan_core::constants::{BOARD_PACING_MS, CARD_SEND_COOLDOWN_MS, READER_SETTLE_MS};
use cardscan_core::pairing::channels_of;
use cardscan_core::{Channel, Error, Event, OperatingMode, PairId, Result, Uid};
use cardscan_hardware::{CardReader, Multiplexer};
use cardscan_network::EventSink;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::clock::MonotonicClock;
use crate::history::CardHistory;

/// Scanner settings, fixed for the life of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Operating mode.
    pub mode: OperatingMode,

    /// Readers wired behind the multiplexer.
    pub reader_count: usize,

    /// Minimum time before a channel reports the same card again.
    pub cooldown_ms: u32,

    /// Pause between two reports of one board cycle.
    pub board_pacing: Duration,

    /// Wait after reader initialization before the first scan.
    pub settle: Duration,
}

impl ScannerConfig {
    /// Settings for `mode` with its default reader count.
    pub fn new(mode: OperatingMode) -> Self {
        Self {
            mode,
            reader_count: mode.default_reader_count(),
            cooldown_ms: CARD_SEND_COOLDOWN_MS,
            board_pacing: Duration::from_millis(BOARD_PACING_MS),
            settle: Duration::from_millis(READER_SETTLE_MS),
        }
    }

    /// Override the reader count.
    ///
    /// # Errors
    /// Returns an error if the mode does not accept this count.
    pub fn with_reader_count(mut self, reader_count: usize) -> Result<Self> {
        self.reader_count = self.mode.reader_count(Some(reader_count))?;
        Ok(self)
    }

    /// Override the board pacing delay.
    pub fn with_board_pacing(mut self, pacing: Duration) -> Self {
        self.board_pacing = pacing;
        self
    }

    /// Override the post-initialization settle delay.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// Outcome of one scan cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Channels that held a readable card.
    pub present: usize,

    /// Cards the sink accepted.
    pub emitted: usize,

    /// Cards held back by the cooldown.
    pub suppressed: usize,

    /// Cards the sink rejected.
    pub failed: usize,
}

/// Counters accumulated since the scanner was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Scan cycles run.
    pub ticks: u64,

    /// Cards the sink accepted.
    pub emitted: u64,

    /// Cards held back by the cooldown.
    pub suppressed: u64,

    /// Failed multiplexer selects.
    pub select_failures: u64,

    /// Events the sink rejected, cards and lifecycle events alike.
    pub sink_failures: u64,
}

/// Multi-channel card scanner.
///
/// # Examples
///
/// ```
/// use cardscan_core::{Channel, OperatingMode, Uid};
/// use cardscan_hardware::mock::MockTable;
/// use cardscan_network::memory::MemorySink;
/// use cardscan_scanner::{ManualClock, Scanner, ScannerConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> cardscan_core::Result<()> {
/// let table = MockTable::new(2);
/// let (sink, events) = MemorySink::new();
/// let mut scanner = Scanner::new(
///     ScannerConfig::new(OperatingMode::Player),
///     table.multiplexer,
///     table.reader,
///     sink,
///     ManualClock::default(),
/// )?;
///
/// table.handle.place_card(Channel::from_index(0), Uid::parse_hex("01020304")?);
/// table.handle.place_card(Channel::from_index(1), Uid::parse_hex("05060708")?);
///
/// let report = scanner.tick().await;
/// assert_eq!(report.emitted, 2);
/// assert_eq!(events.events().len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Scanner<M, R, S, C> {
    config: ScannerConfig,
    multiplexer: M,
    reader: R,
    sink: S,
    clock: C,
    detected: Vec<bool>,
    history: CardHistory,
    stats: ScanStats,
}

impl<M, R, S, C> Scanner<M, R, S, C>
where
    M: Multiplexer,
    R: CardReader,
    S: EventSink,
    C: MonotonicClock,
{
    /// Create a scanner over the given devices.
    ///
    /// # Errors
    /// Returns an error if the reader count is invalid for the mode or
    /// larger than the multiplexer can route.
    pub fn new(config: ScannerConfig, multiplexer: M, reader: R, sink: S, clock: C) -> Result<Self> {
        let reader_count = config.mode.reader_count(Some(config.reader_count))?;
        if reader_count > multiplexer.channel_count() {
            return Err(Error::Config(format!(
                "{reader_count} readers configured but the multiplexer routes {}",
                multiplexer.channel_count()
            )));
        }

        Ok(Self {
            detected: vec![false; reader_count],
            history: CardHistory::new(reader_count),
            stats: ScanStats::default(),
            config,
            multiplexer,
            reader,
            sink,
            clock,
        })
    }

    /// Initialize every reader, then wait for the antennas to settle.
    ///
    /// A reader that fails is reported with an error event and skipped;
    /// scanning goes on with the others. Returns the number of readers
    /// that came up.
    pub async fn initialize(&mut self) -> usize {
        let mut ready = 0;

        for channel in Channel::all(self.config.reader_count) {
            let result = match self.multiplexer.select(channel).await {
                Ok(()) => self.reader.initialize().await,
                Err(e) => {
                    self.stats.select_failures += 1;
                    Err(e)
                }
            };

            match result {
                Ok(()) => {
                    debug!(channel = channel.as_u8(), "Reader ready");
                    ready += 1;
                }
                Err(e) => {
                    warn!(channel = channel.as_u8(), error = %e, "Reader initialization failed");
                    self.report(Event::reader_init_failed(channel)).await;
                }
            }
        }

        info!(
            ready,
            readers = self.config.reader_count,
            mode = %self.config.mode,
            "Readers initialized"
        );
        tokio::time::sleep(self.config.settle).await;
        ready
    }

    /// Run one scan cycle.
    pub async fn tick(&mut self) -> TickReport {
        self.stats.ticks += 1;
        self.detected.fill(false);

        let mut staged = Vec::new();
        for channel in Channel::all(self.config.reader_count) {
            if let Err(e) = self.multiplexer.select(channel).await {
                warn!(channel = channel.as_u8(), error = %e, "Channel select failed");
                self.stats.select_failures += 1;
                continue;
            }

            if let Some(uid) = self.reader.detect().await {
                trace!(channel = channel.as_u8(), %uid, "Card present");
                self.detected[channel.index()] = true;
                staged.push((channel, uid));
            }
        }

        let mut report = TickReport {
            present: staged.len(),
            ..TickReport::default()
        };

        let candidates = match self.config.mode {
            OperatingMode::Player | OperatingMode::Muck => {
                if self.hole_cards_present() {
                    staged
                } else {
                    Vec::new()
                }
            }
            OperatingMode::Board | OperatingMode::Unknown => staged,
        };

        let pacing = match self.config.mode {
            OperatingMode::Board => Some(self.config.board_pacing),
            _ => None,
        };

        let mut sent_this_tick = false;
        for (channel, uid) in candidates {
            let now = self.clock.now_ms();
            if !self
                .history
                .should_emit(channel, &uid, now, self.config.cooldown_ms)
            {
                trace!(channel = channel.as_u8(), %uid, "Card in cooldown");
                report.suppressed += 1;
                self.stats.suppressed += 1;
                continue;
            }

            if let Some(pacing) = pacing.filter(|_| sent_this_tick) {
                tokio::time::sleep(pacing).await;
            }
            sent_this_tick = true;

            if self.send_card(channel, uid).await {
                report.emitted += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    /// Hand a lifecycle event to the sink.
    ///
    /// Returns whether the sink accepted it; failures are logged and counted.
    pub async fn report(&mut self, event: Event) -> bool {
        let kind = event.kind();
        match self.sink.emit(event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(kind, error = %e, "Event not delivered");
                self.stats.sink_failures += 1;
                false
            }
        }
    }

    async fn send_card(&mut self, channel: Channel, uid: Uid) -> bool {
        match self.sink.emit(Event::card_detected(channel, uid.clone())).await {
            Ok(()) => {
                info!(channel = channel.as_u8(), %uid, "Card reported");
                self.history.record(channel, uid, self.clock.now_ms());
                self.stats.emitted += 1;
                true
            }
            Err(e) => {
                warn!(channel = channel.as_u8(), %uid, error = %e, "Card not delivered");
                self.stats.sink_failures += 1;
                false
            }
        }
    }

    fn hole_cards_present(&self) -> bool {
        matches!(self.detected.as_slice(), [true, true, ..])
    }

    /// Whether a card answered on `channel` during the last tick.
    ///
    /// Channels beyond the reader count are never detected.
    pub fn is_detected(&self, channel: Channel) -> bool {
        self.detected.get(channel.index()).copied().unwrap_or(false)
    }

    /// Detection state of every channel during the last tick.
    pub fn detection_state(&self) -> &[bool] {
        &self.detected
    }

    /// Whether every channel of `pair` held a card during the last tick.
    ///
    /// A pair no channel maps to is never complete.
    pub fn is_pair_complete(&self, pair: PairId) -> bool {
        let mut channels = channels_of(pair, self.config.mode, self.config.reader_count).peekable();
        channels.peek().is_some() && channels.all(|c| self.is_detected(c))
    }

    /// Scanner settings.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Cooldown bookkeeping.
    pub fn history(&self) -> &CardHistory {
        &self.history
    }

    /// Counters since creation.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Take the devices back.
    pub fn into_parts(self) -> (M, R, S) {
        (self.multiplexer, self.reader, self.sink)
    }
}
