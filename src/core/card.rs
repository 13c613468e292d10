use core::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Rank characters in ascending rank order.
pub const RANK_CHARS: [char; 13] = [
    '2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A',
];

/// Suit characters in ascending suit order.
pub const SUIT_CHARS: [char; 4] = ['s', 'h', 'd', 'c'];

/// The largest number of suits a deck can be configured with.
pub const MAX_SUITS: u8 = 4;

/// The largest number of ranks a deck can be configured with.
pub const MAX_RANKS: u8 = 13;

/// Errors from parsing cards or card strings.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum CardParseError {
    #[error("card text must be rank/suit character pairs, got {0} characters")]
    OddLength(usize),

    #[error("unknown rank character {0:?}")]
    UnknownRank(char),

    #[error("unknown suit character {0:?}")]
    UnknownSuit(char),
}

/// A single playing card, identified by a small integer id.
///
/// The id packs the rank into the high bits and the suit into the low two
/// bits (`rank << 2 | suit`), so ids order cards by rank first. The id space
/// always uses the four-suit encoding regardless of how many suits a deck is
/// configured with; decks with fewer suits simply never produce the unused
/// ids.
///
/// # Example
///
/// ```
/// use abstracted_poker::core::Card;
///
/// let card: Card = "Ah".parse().unwrap();
/// assert_eq!(card.rank(), 12);
/// assert_eq!(card.suit(), 1);
/// assert_eq!(card.to_string(), "Ah");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Card(u8);

impl Card {
    /// Create a card from a suit in `0..4` and a rank in `0..13`.
    pub fn new(suit: u8, rank: u8) -> Self {
        debug_assert!(suit < MAX_SUITS);
        debug_assert!(rank < MAX_RANKS);
        Card(rank << 2 | suit)
    }

    /// Create a card directly from its id.
    pub fn from_id(id: u8) -> Self {
        debug_assert!(id < MAX_SUITS * MAX_RANKS);
        Card(id)
    }

    /// The packed card id.
    pub fn id(self) -> u8 {
        self.0
    }

    /// The suit in `0..4`.
    pub fn suit(self) -> u8 {
        self.0 & 3
    }

    /// The rank in `0..13`.
    pub fn rank(self) -> u8 {
        self.0 >> 2
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(rank_char), Some(suit_char), None) => {
                let rank = RANK_CHARS
                    .iter()
                    .position(|&c| c == rank_char)
                    .ok_or(CardParseError::UnknownRank(rank_char))?;
                let suit = SUIT_CHARS
                    .iter()
                    .position(|&c| c == suit_char)
                    .ok_or(CardParseError::UnknownSuit(suit_char))?;
                Ok(Card::new(suit as u8, rank as u8))
            }
            _ => Err(CardParseError::OddLength(s.chars().count())),
        }
    }
}

/// Parse a concatenated card string (`"5s9sAh"`) into cards in text order.
pub fn parse_cards(s: &str) -> Result<Vec<Card>, CardParseError> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() % 2 != 0 {
        return Err(CardParseError::OddLength(chars.len()));
    }
    chars
        .chunks(2)
        .map(|pair| {
            let rank = RANK_CHARS
                .iter()
                .position(|&c| c == pair[0])
                .ok_or(CardParseError::UnknownRank(pair[0]))?;
            let suit = SUIT_CHARS
                .iter()
                .position(|&c| c == pair[1])
                .ok_or(CardParseError::UnknownSuit(pair[1]))?;
            Ok(Card::new(suit as u8, rank as u8))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_cards() {
        for id in 0..52u8 {
            let card = Card::from_id(id);
            let parsed: Card = card.to_string().parse().unwrap();
            assert_eq!(card, parsed);
        }
    }

    #[test]
    fn test_id_packing() {
        let card = Card::new(3, 12);
        assert_eq!(card.to_string(), "Ac");
        assert_eq!(card.id(), 12 << 2 | 3);
    }

    #[test]
    fn test_parse_cards() {
        let cards = parse_cards("5s9sAhKhTc").unwrap();
        assert_eq!(cards.len(), 5);
        assert_eq!(cards[0].to_string(), "5s");
        assert_eq!(cards[4].to_string(), "Tc");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_cards("5s9"), Err(CardParseError::OddLength(3)));
        assert_eq!(parse_cards("1s"), Err(CardParseError::UnknownRank('1')));
        assert_eq!(parse_cards("5x"), Err(CardParseError::UnknownSuit('x')));
    }

    #[test]
    fn test_ordering_is_rank_major() {
        let five: Card = "5s".parse().unwrap();
        let nine: Card = "9c".parse().unwrap();
        let ace: Card = "As".parse().unwrap();
        assert!(five < nine);
        assert!(nine < ace);
    }
}
