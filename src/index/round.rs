use std::fmt::Write as _;

use crate::core::{parse_cards, Card, RANK_CHARS};

use super::indexer::{HandIndexer, IndexerError};
use super::tables::RANKS;

/// Cards dealt per round in the standard four-round game: two hole cards,
/// then a three-card board, then one board card in each later round.
pub const HOLDEM_SCHEDULE: [u8; 4] = [2, 3, 1, 1];

fn parse_or_panic(cards: &str) -> Vec<Card> {
    parse_cards(cards).unwrap_or_else(|e| panic!("invalid card string {cards:?}: {e}"))
}

/// Canonical indexer for hole cards only.
///
/// The two-card space collapses to 169 classes, small enough that the whole
/// mapping can be rendered as a rank-by-rank table for diagnostics.
#[derive(Debug, Clone)]
pub struct PreflopIndexer {
    indexer: HandIndexer,
}

impl PreflopIndexer {
    pub fn new() -> Result<Self, IndexerError> {
        Ok(PreflopIndexer {
            indexer: HandIndexer::new(&[2])?,
        })
    }

    /// Number of canonical hole-card classes.
    pub fn size(&self) -> u64 {
        self.indexer.size(0)
    }

    /// Canonical index of a two-card string such as `"AsKh"`.
    ///
    /// # Panics
    ///
    /// Panics when the string is not exactly two well-formed cards.
    pub fn index(&self, cards: &str) -> u64 {
        let cards = parse_or_panic(cards);
        self.indexer.index_last(&cards)
    }

    /// A representative hand for a canonical index.
    ///
    /// # Panics
    ///
    /// Panics when `index` is not below [`size`](Self::size).
    pub fn canonical_hand(&self, index: u64) -> String {
        self.indexer
            .unindex(0, index)
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// The full rank-by-rank index table as a printable string: rows and
    /// columns in descending rank order, suited combinations above the
    /// diagonal, offsuit at and below it.
    pub fn table_string(&self) -> String {
        let mut out = String::new();
        out.push(' ');
        for i in 0..RANKS {
            let _ = write!(out, "  {} ", RANK_CHARS[RANKS - 1 - i]);
        }
        out.push('\n');
        for i in 0..RANKS {
            out.push(RANK_CHARS[RANKS - 1 - i]);
            for j in 0..RANKS {
                let first = Card::new(0, (RANKS - 1 - j) as u8);
                let suit = u8::from(j <= i);
                let second = Card::new(suit, (RANKS - 1 - i) as u8);
                let index = self.indexer.index_last(&[first, second]);
                let _ = write!(out, " {index:3}");
            }
            out.push('\n');
        }
        out
    }
}

/// Canonical indexer over the standard schedule, configured for a final
/// round between 1 and 4. Round arguments to the accessors are 1-based, as
/// betting rounds are everywhere the indices are consumed.
///
/// # Example
///
/// ```
/// use abstracted_poker::index::GeneralIndexer;
///
/// let flop = GeneralIndexer::new(2).unwrap();
/// assert_eq!(flop.size(2), 1_286_792);
/// assert_eq!(flop.cards_num(2), 5);
/// let index = flop.index("5s9sAhKhTc");
/// assert_eq!(flop.index(&flop.canonical_hand(index)), index);
/// ```
#[derive(Debug, Clone)]
pub struct GeneralIndexer {
    indexer: HandIndexer,
}

impl GeneralIndexer {
    /// Build an indexer whose final round is `rounds` (1..=4).
    pub fn new(rounds: usize) -> Result<Self, IndexerError> {
        if !(1..=HOLDEM_SCHEDULE.len()).contains(&rounds) {
            return Err(IndexerError::InvalidRoundCount { actual: rounds });
        }
        Ok(GeneralIndexer {
            indexer: HandIndexer::new(&HOLDEM_SCHEDULE[..rounds])?,
        })
    }

    /// The configured final round (1-based).
    pub fn rounds(&self) -> usize {
        self.indexer.rounds()
    }

    /// Canonical index of a card string for the last round whose card-count
    /// boundary the string reaches.
    ///
    /// # Panics
    ///
    /// Panics when the string is malformed, exceeds the configured rounds,
    /// or does not end exactly on a round boundary.
    pub fn index(&self, cards: &str) -> u64 {
        let cards = parse_or_panic(cards);
        self.indexer.index_last(&cards)
    }

    /// A representative card string for an index of the configured final
    /// round.
    ///
    /// # Panics
    ///
    /// Panics when `index` is not below the final round's size.
    pub fn canonical_hand(&self, index: u64) -> String {
        self.indexer
            .unindex(self.indexer.rounds() - 1, index)
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    /// Number of canonical classes for `round` (1-based).
    pub fn size(&self, round: usize) -> u64 {
        assert!(
            (1..=self.rounds()).contains(&round),
            "round {round} outside configured range 1..={}",
            self.rounds()
        );
        self.indexer.size(round - 1)
    }

    /// Cards dealt through `round` (1-based).
    pub fn cards_num(&self, round: usize) -> usize {
        assert!(
            (1..=self.rounds()).contains(&round),
            "round {round} outside configured range 1..={}",
            self.rounds()
        );
        self.indexer.cards_through_round(round - 1)
    }
}
