use crate::{
    Result,
    constants::{BOARD_READER_COUNT, FALLBACK_READER_COUNT, MAX_READERS, PLAYER_READER_COUNT},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical antenna position behind the bus multiplexer (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    /// Create a channel index checked against the device reader count.
    ///
    /// # Errors
    /// Returns `Error::ChannelOutOfRange` if `index >= reader_count`.
    pub fn new(index: usize, reader_count: usize) -> Result<Self> {
        if index >= reader_count || index >= MAX_READERS {
            return Err(Error::ChannelOutOfRange {
                channel: index,
                reader_count,
            });
        }
        Ok(Channel(index as u8))
    }

    /// Create a channel without range validation.
    ///
    /// Drivers use this for raw indices; range checks happen where the
    /// reader count is known.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        Channel(index)
    }

    /// Iterate over every channel of a device with `reader_count` readers.
    pub fn all(reader_count: usize) -> impl Iterator<Item = Channel> {
        (0..reader_count.min(MAX_READERS)).map(|i| Channel(i as u8))
    }

    /// Get the channel as a slice index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Get the raw channel number.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Card unique identifier as read from the transceiver.
///
/// The canonical text form is two-digit uppercase hex bytes separated by
/// a single space, e.g. `04 AA BB CC DD 11`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid(Vec<u8>);

impl Uid {
    /// Create a UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if `bytes` is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidUid("UID must not be empty".to_string()));
        }
        Ok(Uid(bytes))
    }

    /// Parse a UID from hex text.
    ///
    /// Accepts the canonical spaced form as well as compact (`04AABB`) or
    /// colon-separated input, in either case.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` for odd-length or non-hex input.
    pub fn parse_hex(text: &str) -> Result<Self> {
        let mut digits = Vec::with_capacity(text.len());
        for c in text.chars() {
            if c.is_whitespace() || c == ':' || c == '-' {
                continue;
            }
            let Some(digit) = c.to_digit(16) else {
                return Err(Error::InvalidUid(format!("not hexadecimal: {text}")));
            };
            digits.push(digit as u8);
        }

        if digits.len() % 2 != 0 {
            return Err(Error::InvalidUid(format!("odd number of hex digits: {text}")));
        }

        Uid::new(
            digits
                .chunks_exact(2)
                .map(|pair| (pair[0] << 4) | pair[1])
                .collect::<Vec<_>>(),
        )
    }

    /// Get the raw UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the UID.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; an empty UID cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Format the UID in its canonical spaced hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uid::parse_hex(s)
    }
}

impl Serialize for Uid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Uid::parse_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Logical group of channels dealt together (hole cards, board slot).
///
/// `PairId(0)` marks a channel with no pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(u8);

impl PairId {
    /// The "no pair" marker.
    pub const UNMAPPED: PairId = PairId(0);

    /// Create a pair identifier.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        PairId(id)
    }

    /// Get the raw pair number.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Check whether this is a real pair rather than [`PairId::UNMAPPED`].
    #[must_use]
    pub fn is_mapped(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for PairId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role of the device at the table.
///
/// Resolved once at startup; reader count, pairing and emission policy all
/// dispatch on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// Player seat: two antennas for the hole cards.
    Player,

    /// Muck pile: two antennas, same policy as a player seat.
    Muck,

    /// Community cards: one antenna per board card.
    Board,

    /// Unrecognised role; legacy two-by-two pairing.
    #[serde(other)]
    Unknown,
}

impl OperatingMode {
    /// Default reader count for this mode.
    #[must_use]
    pub fn default_reader_count(&self) -> usize {
        match self {
            Self::Player | Self::Muck => PLAYER_READER_COUNT,
            Self::Board => BOARD_READER_COUNT,
            Self::Unknown => FALLBACK_READER_COUNT,
        }
    }

    /// Resolve the reader count for this mode.
    ///
    /// Only the fallback mode accepts an override; the other modes have a
    /// fixed antenna layout.
    ///
    /// # Errors
    /// Returns an error when the override exceeds [`MAX_READERS`], is zero,
    /// or conflicts with a fixed layout.
    pub fn reader_count(&self, requested: Option<usize>) -> Result<usize> {
        let expected = self.default_reader_count();
        let Some(count) = requested else {
            return Ok(expected);
        };

        if count == 0 {
            return Err(Error::NoReaders);
        }
        if count > MAX_READERS {
            return Err(Error::TooManyReaders(count));
        }
        if *self != Self::Unknown && count != expected {
            return Err(Error::ReaderCountMismatch {
                mode: self.to_string(),
                expected,
                actual: count,
            });
        }
        Ok(count)
    }

    /// Get the configuration name of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Muck => "muck",
            Self::Board => "board",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperatingMode {
    type Err = Error;

    /// Parse a mode name. Unrecognised names resolve to
    /// [`OperatingMode::Unknown`], matching how devices without a role
    /// have always behaved.
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "player" => Self::Player,
            "muck" => Self::Muck,
            "board" => Self::Board,
            _ => Self::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_uid_canonical_format() {
        let uid = Uid::new(vec![0x04, 0xAA]).unwrap();
        assert_eq!(uid.to_hex(), "04 AA");
        assert_eq!(uid.to_string(), "04 AA");
    }

    #[test]
    fn test_uid_format_seven_bytes() {
        let uid = Uid::new(vec![0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x0F]).unwrap();
        let text = uid.to_hex();
        assert_eq!(text, "04 AA BB CC DD 11 0F");
        assert!(!text.starts_with(' '));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_uid_rejects_empty() {
        assert!(matches!(Uid::new(Vec::new()), Err(Error::InvalidUid(_))));
    }

    #[rstest]
    #[case("04 AA BB CC", vec![0x04, 0xAA, 0xBB, 0xCC])]
    #[case("04aabbcc", vec![0x04, 0xAA, 0xBB, 0xCC])]
    #[case("04:AA:BB:CC", vec![0x04, 0xAA, 0xBB, 0xCC])]
    fn test_uid_parse_hex(#[case] text: &str, #[case] expected: Vec<u8>) {
        let uid: Uid = text.parse().unwrap();
        assert_eq!(uid.as_bytes(), expected.as_slice());
    }

    #[rstest]
    #[case("04A")]
    #[case("ZZ")]
    #[case("")]
    #[case("aéa")]
    #[case("ü1")]
    #[case("04 AA ß")]
    #[case("+1")]
    #[case("０４")]
    fn test_uid_parse_invalid(#[case] text: &str) {
        assert!(Uid::parse_hex(text).is_err());
    }

    #[test]
    fn test_uid_serializes_as_canonical_string() {
        let uid = Uid::new(vec![0x04, 0xAA, 0x01]).unwrap();
        let json = serde_json::to_string(&uid).unwrap();
        assert_eq!(json, "\"04 AA 01\"");

        let back: Uid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uid);
    }

    #[test]
    fn test_channel_range() {
        assert!(Channel::new(1, 2).is_ok());
        assert_eq!(
            Channel::new(2, 2),
            Err(Error::ChannelOutOfRange {
                channel: 2,
                reader_count: 2
            })
        );
    }

    #[test]
    fn test_channel_all_is_capped() {
        assert_eq!(Channel::all(5).count(), 5);
        assert_eq!(Channel::all(9).count(), MAX_READERS);
    }

    #[rstest]
    #[case("player", OperatingMode::Player)]
    #[case("MUCK", OperatingMode::Muck)]
    #[case(" board ", OperatingMode::Board)]
    #[case("atom", OperatingMode::Unknown)]
    #[case("", OperatingMode::Unknown)]
    fn test_mode_from_str(#[case] text: &str, #[case] expected: OperatingMode) {
        assert_eq!(text.parse::<OperatingMode>().unwrap(), expected);
    }

    #[test]
    fn test_mode_deserialize_unknown_name() {
        let mode: OperatingMode = serde_json::from_str("\"dealer\"").unwrap();
        assert_eq!(mode, OperatingMode::Unknown);
    }

    #[rstest]
    #[case(OperatingMode::Player, 2)]
    #[case(OperatingMode::Muck, 2)]
    #[case(OperatingMode::Board, 5)]
    #[case(OperatingMode::Unknown, 2)]
    fn test_mode_default_reader_count(#[case] mode: OperatingMode, #[case] expected: usize) {
        assert_eq!(mode.default_reader_count(), expected);
        assert_eq!(mode.reader_count(None).unwrap(), expected);
    }

    #[test]
    fn test_mode_reader_count_override() {
        assert_eq!(OperatingMode::Unknown.reader_count(Some(6)).unwrap(), 6);
        assert_eq!(
            OperatingMode::Unknown.reader_count(Some(7)),
            Err(Error::TooManyReaders(7))
        );
        assert_eq!(OperatingMode::Unknown.reader_count(Some(0)), Err(Error::NoReaders));
        assert!(matches!(
            OperatingMode::Board.reader_count(Some(3)),
            Err(Error::ReaderCountMismatch { .. })
        ));
        assert_eq!(OperatingMode::Board.reader_count(Some(5)).unwrap(), 5);
    }
}
