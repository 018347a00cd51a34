//! Simulated scanner table for testing and development.
//!
//! A [`MockTable`] models the multiplexer and the readers behind it as one
//! shared piece of state: each channel may hold a card, and the reader
//! answers for whichever channel the multiplexer last routed. Faults can be
//! injected per channel and every bus operation is recorded so tests can
//! check ordering.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cardscan_core::constants::MULTIPLEXER_I2C_ADDRESS;
use cardscan_core::{Channel, Uid};

use crate::error::{HardwareError, Result};
use crate::traits::{CardReader, Multiplexer};

/// A bus operation observed by the simulated table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOperation {
    /// The multiplexer routed the bus to a channel.
    Select(Channel),

    /// The reader on a channel was initialized.
    Initialize(Channel),

    /// The reader on a channel was polled for a card.
    Detect(Channel),
}

#[derive(Debug)]
struct TableState {
    channel_count: usize,
    cards: Vec<Option<Uid>>,
    selected: Option<Channel>,
    reader_faults: HashSet<Channel>,
    select_faults: HashSet<Channel>,
    operations: Vec<BusOperation>,
}

type SharedState = Arc<Mutex<TableState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, TableState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multiplexer, reader and control handle sharing one simulated table.
///
/// # Examples
///
/// ```
/// use cardscan_core::{Channel, Uid};
/// use cardscan_hardware::mock::MockTable;
/// use cardscan_hardware::traits::{CardReader, Multiplexer};
///
/// #[tokio::main]
/// async fn main() -> cardscan_hardware::Result<()> {
///     let MockTable { mut multiplexer, mut reader, handle } = MockTable::new(2);
///
///     handle.place_card(Channel::from_index(1), Uid::parse_hex("04AABBCC").unwrap());
///
///     multiplexer.select(Channel::from_index(1)).await?;
///     let uid = reader.detect().await;
///     assert_eq!(uid.map(|u| u.to_hex()), Some("04 AA BB CC".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTable {
    pub multiplexer: MockMultiplexer,
    pub reader: MockReader,
    pub handle: MockTableHandle,
}

impl MockTable {
    /// Create an empty table with `channel_count` wired channels.
    pub fn new(channel_count: usize) -> Self {
        let state = Arc::new(Mutex::new(TableState {
            channel_count,
            cards: vec![None; channel_count],
            selected: None,
            reader_faults: HashSet::new(),
            select_faults: HashSet::new(),
            operations: Vec::new(),
        }));

        Self {
            multiplexer: MockMultiplexer {
                state: Arc::clone(&state),
            },
            reader: MockReader {
                state: Arc::clone(&state),
            },
            handle: MockTableHandle { state },
        }
    }
}

/// Simulated multiplexer.
#[derive(Debug)]
pub struct MockMultiplexer {
    state: SharedState,
}

impl Multiplexer for MockMultiplexer {
    fn channel_count(&self) -> usize {
        lock(&self.state).channel_count
    }

    async fn select(&mut self, channel: Channel) -> Result<()> {
        let mut state = lock(&self.state);
        if channel.index() >= state.channel_count {
            return Ok(());
        }

        state.operations.push(BusOperation::Select(channel));
        if state.select_faults.contains(&channel) {
            state.selected = None;
            return Err(HardwareError::bus(
                MULTIPLEXER_I2C_ADDRESS,
                format!("simulated NACK selecting channel {channel}"),
            ));
        }

        state.selected = Some(channel);
        Ok(())
    }
}

/// Simulated reader answering for the selected channel.
#[derive(Debug)]
pub struct MockReader {
    state: SharedState,
}

impl CardReader for MockReader {
    async fn initialize(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        let channel = state.selected.ok_or(HardwareError::NoChannelSelected)?;
        state.operations.push(BusOperation::Initialize(channel));

        if state.reader_faults.contains(&channel) {
            return Err(HardwareError::initialization_failed(format!(
                "simulated reader fault on channel {channel}"
            )));
        }
        Ok(())
    }

    async fn detect(&mut self) -> Option<Uid> {
        let mut state = lock(&self.state);
        let channel = state.selected?;
        state.operations.push(BusOperation::Detect(channel));
        state.cards.get(channel.index()).cloned().flatten()
    }
}

/// Handle for placing cards and injecting faults.
///
/// Clones share the same table.
#[derive(Debug, Clone)]
pub struct MockTableHandle {
    state: SharedState,
}

impl MockTableHandle {
    /// Put a card on `channel`, replacing any card already there.
    ///
    /// Returns `false` if the channel is not wired.
    pub fn place_card(&self, channel: Channel, uid: Uid) -> bool {
        let mut state = lock(&self.state);
        match state.cards.get_mut(channel.index()) {
            Some(slot) => {
                *slot = Some(uid);
                true
            }
            None => false,
        }
    }

    /// Take the card off `channel`, returning it.
    pub fn remove_card(&self, channel: Channel) -> Option<Uid> {
        lock(&self.state)
            .cards
            .get_mut(channel.index())
            .and_then(Option::take)
    }

    /// Take every card off the table.
    pub fn clear(&self) {
        lock(&self.state).cards.iter_mut().for_each(|slot| *slot = None);
    }

    /// Card currently lying on `channel`.
    pub fn card_on(&self, channel: Channel) -> Option<Uid> {
        lock(&self.state).cards.get(channel.index()).cloned().flatten()
    }

    /// Make the reader on `channel` fail initialization.
    pub fn set_reader_fault(&self, channel: Channel, faulty: bool) {
        let mut state = lock(&self.state);
        if faulty {
            state.reader_faults.insert(channel);
        } else {
            state.reader_faults.remove(&channel);
        }
    }

    /// Make selecting `channel` fail on the bus.
    pub fn set_select_fault(&self, channel: Channel, faulty: bool) {
        let mut state = lock(&self.state);
        if faulty {
            state.select_faults.insert(channel);
        } else {
            state.select_faults.remove(&channel);
        }
    }

    /// Channel routed by the last successful select.
    pub fn selected(&self) -> Option<Channel> {
        lock(&self.state).selected
    }

    /// Bus operations recorded so far.
    pub fn operations(&self) -> Vec<BusOperation> {
        lock(&self.state).operations.clone()
    }

    /// Forget the recorded operations.
    pub fn clear_operations(&self) {
        lock(&self.state).operations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(text: &str) -> Uid {
        Uid::parse_hex(text).unwrap()
    }

    #[tokio::test]
    async fn test_reader_answers_for_selected_channel() {
        let MockTable {
            mut multiplexer,
            mut reader,
            handle,
        } = MockTable::new(2);
        handle.place_card(Channel::from_index(0), uid("01020304"));

        multiplexer.select(Channel::from_index(0)).await.unwrap();
        assert_eq!(reader.detect().await, Some(uid("01020304")));

        multiplexer.select(Channel::from_index(1)).await.unwrap();
        assert_eq!(reader.detect().await, None);
    }

    #[tokio::test]
    async fn test_detect_without_selection() {
        let mut table = MockTable::new(2);
        assert_eq!(table.reader.detect().await, None);
        assert_eq!(
            table.reader.initialize().await,
            Err(HardwareError::NoChannelSelected)
        );
    }

    #[tokio::test]
    async fn test_out_of_range_select_is_ignored() {
        let mut table = MockTable::new(2);
        table.multiplexer.select(Channel::from_index(0)).await.unwrap();
        table.multiplexer.select(Channel::from_index(4)).await.unwrap();

        assert_eq!(table.handle.selected(), Some(Channel::from_index(0)));
        assert_eq!(
            table.handle.operations(),
            vec![BusOperation::Select(Channel::from_index(0))]
        );
    }

    #[tokio::test]
    async fn test_select_fault_clears_selection() {
        let mut table = MockTable::new(2);
        table.multiplexer.select(Channel::from_index(0)).await.unwrap();
        table.handle.set_select_fault(Channel::from_index(1), true);

        let result = table.multiplexer.select(Channel::from_index(1)).await;
        assert!(matches!(result, Err(HardwareError::Bus { .. })));
        assert_eq!(table.handle.selected(), None);
    }

    #[tokio::test]
    async fn test_reader_fault_fails_initialize() {
        let mut table = MockTable::new(2);
        table.handle.set_reader_fault(Channel::from_index(1), true);

        table.multiplexer.select(Channel::from_index(0)).await.unwrap();
        assert!(table.reader.initialize().await.is_ok());

        table.multiplexer.select(Channel::from_index(1)).await.unwrap();
        assert!(matches!(
            table.reader.initialize().await,
            Err(HardwareError::InitializationFailed { .. })
        ));
    }

    #[test]
    fn test_handle_place_remove_clear() {
        let table = MockTable::new(2);
        let handle = table.handle.clone();

        assert!(handle.place_card(Channel::from_index(1), uid("AA")));
        assert!(!handle.place_card(Channel::from_index(3), uid("BB")));
        assert_eq!(handle.card_on(Channel::from_index(1)), Some(uid("AA")));

        assert_eq!(handle.remove_card(Channel::from_index(1)), Some(uid("AA")));
        assert_eq!(handle.remove_card(Channel::from_index(1)), None);

        handle.place_card(Channel::from_index(0), uid("CC"));
        handle.clear();
        assert_eq!(handle.card_on(Channel::from_index(0)), None);
    }
}
