//! Per-channel record of the last card reported.

use cardscan_core::{Channel, Uid};
use serde::Serialize;

use crate::clock::elapsed_ms;

/// The last card successfully reported on a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentCard {
    /// Card that was reported.
    pub uid: Uid,

    /// Clock reading when the sink accepted it.
    pub sent_at_ms: u32,
}

/// Cooldown bookkeeping for every channel of the device.
///
/// A channel suppresses a card only if it is the same UID it last reported
/// and less than the cooldown has passed. A different card is always
/// reported at once.
#[derive(Debug, Clone, Default)]
pub struct CardHistory {
    entries: Vec<Option<SentCard>>,
}

impl CardHistory {
    /// Empty history for `reader_count` channels.
    pub fn new(reader_count: usize) -> Self {
        Self {
            entries: vec![None; reader_count],
        }
    }

    /// Whether `uid` on `channel` should be reported at `now_ms`.
    pub fn should_emit(&self, channel: Channel, uid: &Uid, now_ms: u32, cooldown_ms: u32) -> bool {
        match self.last_sent(channel) {
            Some(last) if last.uid == *uid => elapsed_ms(now_ms, last.sent_at_ms) >= cooldown_ms,
            _ => true,
        }
    }

    /// Remember that `uid` was reported on `channel` at `now_ms`.
    ///
    /// Channels beyond the device reader count are ignored.
    pub fn record(&mut self, channel: Channel, uid: Uid, now_ms: u32) {
        if let Some(slot) = self.entries.get_mut(channel.index()) {
            *slot = Some(SentCard {
                uid,
                sent_at_ms: now_ms,
            });
        }
    }

    /// Last card reported on `channel`.
    pub fn last_sent(&self, channel: Channel) -> Option<&SentCard> {
        self.entries.get(channel.index()).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const COOLDOWN: u32 = 10_000;

    fn uid(text: &str) -> Uid {
        Uid::parse_hex(text).unwrap()
    }

    #[test]
    fn test_empty_history_always_emits() {
        let history = CardHistory::new(2);
        assert!(history.should_emit(Channel::from_index(0), &uid("01"), 0, COOLDOWN));
    }

    #[rstest]
    #[case(0, 5_000, false)]
    #[case(0, 9_999, false)]
    #[case(0, 10_000, true)]
    #[case(0, 11_000, true)]
    #[case(u32::MAX - 1_000, 3_000, false)]
    #[case(u32::MAX - 1_000, 9_500, true)]
    fn test_same_uid_cooldown(#[case] sent: u32, #[case] now: u32, #[case] emits: bool) {
        let mut history = CardHistory::new(2);
        let channel = Channel::from_index(1);
        history.record(channel, uid("04 AA"), sent);

        assert_eq!(history.should_emit(channel, &uid("04 AA"), now, COOLDOWN), emits);
    }

    #[test]
    fn test_different_uid_bypasses_cooldown() {
        let mut history = CardHistory::new(2);
        let channel = Channel::from_index(0);
        history.record(channel, uid("01"), 1_000);

        assert!(history.should_emit(channel, &uid("02"), 1_001, COOLDOWN));
    }

    #[test]
    fn test_channels_are_independent() {
        let mut history = CardHistory::new(2);
        history.record(Channel::from_index(0), uid("01"), 0);

        assert!(history.should_emit(Channel::from_index(1), &uid("01"), 1, COOLDOWN));
        assert_eq!(history.last_sent(Channel::from_index(1)), None);
    }

    #[test]
    fn test_record_out_of_range_ignored() {
        let mut history = CardHistory::new(1);
        history.record(Channel::from_index(4), uid("01"), 0);
        assert_eq!(history.last_sent(Channel::from_index(4)), None);
    }

    proptest! {
        #[test]
        fn prop_cooldown_measured_across_wrap(sent in any::<u32>(), delta in 0u32..30_000) {
            let mut history = CardHistory::new(1);
            let channel = Channel::from_index(0);
            history.record(channel, uid("04 AA BB CC"), sent);

            let now = sent.wrapping_add(delta);
            prop_assert_eq!(
                history.should_emit(channel, &uid("04 AA BB CC"), now, COOLDOWN),
                delta >= COOLDOWN
            );
        }
    }
}
