//! Channel to pair mapping.
//!
//! A pair groups the antennas whose cards are dealt together: the two hole
//! cards of a seat, or a single slot of the board. The mapping is a pure
//! function of the channel and the [`OperatingMode`], so it can never drift
//! while the device runs.
//!
//! | Mode | Channels → pair |
//! |------|-----------------|
//! | `Player`, `Muck` | every channel → 1 |
//! | `Board` | channel k → k + 1 |
//! | `Unknown` | {0,1} → 1, {2,3} → 2, {4,5} → 3, otherwise unmapped |
//!
//! # Examples
//!
//! ```
//! use cardscan_core::{Channel, OperatingMode, PairId};
//! use cardscan_core::pairing::{list_pair_ids, pair_id_of};
//!
//! assert_eq!(pair_id_of(Channel::from_index(3), OperatingMode::Board), PairId::new(4));
//! assert_eq!(list_pair_ids(5), vec![PairId::new(1), PairId::new(2), PairId::new(3)]);
//! ```

use crate::types::{Channel, OperatingMode, PairId};

/// Pair a channel belongs to in the given mode.
#[must_use]
pub fn pair_id_of(channel: Channel, mode: OperatingMode) -> PairId {
    match mode {
        OperatingMode::Player | OperatingMode::Muck => PairId::new(1),
        OperatingMode::Board => PairId::new(channel.as_u8() + 1),
        OperatingMode::Unknown => match channel.as_u8() {
            0 | 1 => PairId::new(1),
            2 | 3 => PairId::new(2),
            4 | 5 => PairId::new(3),
            _ => PairId::UNMAPPED,
        },
    }
}

/// Coarse pair capability table keyed on the reader count alone.
///
/// This table does not look at the mode: a five-reader board device
/// reports `[1, 2, 3]` here even though its channels map to pairs 1–5.
/// Use [`OperatingMode::pair_ids`] when the pairs actually produced by
/// [`pair_id_of`] are needed.
#[must_use]
pub fn list_pair_ids(reader_count: usize) -> Vec<PairId> {
    let top = match reader_count {
        0..=2 => 1,
        3..=4 => 2,
        5..=6 => 3,
        _ => 0,
    };
    (1..=top).map(PairId::new).collect()
}

/// Channels of a `reader_count` device that belong to `pair`.
pub fn channels_of(
    pair: PairId,
    mode: OperatingMode,
    reader_count: usize,
) -> impl Iterator<Item = Channel> {
    Channel::all(reader_count).filter(move |c| pair_id_of(*c, mode) == pair)
}

impl OperatingMode {
    /// Pairs produced by this mode on a `reader_count` device, ascending.
    ///
    /// This is what a device registers at boot.
    #[must_use]
    pub fn pair_ids(&self, reader_count: usize) -> Vec<PairId> {
        let mut pairs: Vec<PairId> = Channel::all(reader_count)
            .map(|c| pair_id_of(c, *self))
            .filter(PairId::is_mapped)
            .collect();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    /// Pair a channel belongs to in this mode.
    #[must_use]
    pub fn pair_id_of(&self, channel: Channel) -> PairId {
        pair_id_of(channel, *self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ids(raw: &[u8]) -> Vec<PairId> {
        raw.iter().copied().map(PairId::new).collect()
    }

    #[rstest]
    #[case(0, OperatingMode::Player, 1)]
    #[case(1, OperatingMode::Player, 1)]
    #[case(1, OperatingMode::Muck, 1)]
    #[case(0, OperatingMode::Board, 1)]
    #[case(3, OperatingMode::Board, 4)]
    #[case(4, OperatingMode::Board, 5)]
    #[case(1, OperatingMode::Unknown, 1)]
    #[case(2, OperatingMode::Unknown, 2)]
    #[case(5, OperatingMode::Unknown, 3)]
    #[case(6, OperatingMode::Unknown, 0)]
    fn test_pair_id_of(#[case] channel: u8, #[case] mode: OperatingMode, #[case] expected: u8) {
        assert_eq!(pair_id_of(Channel::from_index(channel), mode), PairId::new(expected));
    }

    #[rstest]
    #[case(1, &[1])]
    #[case(2, &[1])]
    #[case(3, &[1, 2])]
    #[case(4, &[1, 2])]
    #[case(5, &[1, 2, 3])]
    #[case(6, &[1, 2, 3])]
    #[case(7, &[])]
    fn test_list_pair_ids(#[case] reader_count: usize, #[case] expected: &[u8]) {
        assert_eq!(list_pair_ids(reader_count), ids(expected));
    }

    #[test]
    fn test_mode_pair_ids() {
        assert_eq!(OperatingMode::Player.pair_ids(2), ids(&[1]));
        assert_eq!(OperatingMode::Board.pair_ids(5), ids(&[1, 2, 3, 4, 5]));
        assert_eq!(OperatingMode::Unknown.pair_ids(5), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_mode_pair_ids_agree_with_table_for_fallback() {
        for count in 1..=6 {
            assert_eq!(OperatingMode::Unknown.pair_ids(count), list_pair_ids(count));
        }
    }

    #[test]
    fn test_channels_of() {
        let channels: Vec<_> = channels_of(PairId::new(2), OperatingMode::Unknown, 6).collect();
        assert_eq!(channels, vec![Channel::from_index(2), Channel::from_index(3)]);

        let channels: Vec<_> = channels_of(PairId::new(1), OperatingMode::Player, 2).collect();
        assert_eq!(channels.len(), 2);

        assert_eq!(channels_of(PairId::new(9), OperatingMode::Board, 5).count(), 0);
    }
}
