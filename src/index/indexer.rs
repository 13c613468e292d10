use std::collections::HashMap;

use thiserror::Error;

use crate::core::Card;

use super::tables::{
    Tables, CARDS, MAX_ROUNDS, RANKS, ROUND_MASK, ROUND_SHIFT, SUITS, TABLES,
};

/// Errors that can occur when building a [`HandIndexer`].
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum IndexerError {
    #[error("round count must be between 1 and {max}, got {actual}", max = MAX_ROUNDS)]
    InvalidRoundCount { actual: usize },

    #[error("round {round} deals {actual} cards, at most {max} are supported", max = ROUND_MASK)]
    RoundTooLarge { round: usize, actual: u8 },

    #[error("schedule deals {actual} cards, the deck has {max}", max = CARDS)]
    TooManyCards { actual: usize },
}

/// One suit assignment pattern for a round: how many cards of each suit were
/// dealt in every round up to and including it, suits ordered so counts are
/// non-increasing. Interchangeable suits collapse onto the same
/// configuration, which is what removes the suit symmetry from the index
/// space.
#[derive(Debug, Clone)]
struct SuitConfiguration {
    /// Per-suit card counts, one nibble per round (round 0 highest).
    counts: [u32; SUITS],
    /// Number of distinct rank assignments for each suit across all rounds.
    suit_size: [u64; SUITS],
    /// First index of this configuration's block within the round.
    offset: u64,
    /// Bit `j` set when suit `j` carries the same counts as suit `j - 1`.
    equal: u8,
}

impl SuitConfiguration {
    fn build(round: usize, counts: &[u32; SUITS], t: &Tables) -> Self {
        let mut equal = 0u8;
        for j in 1..SUITS {
            if counts[j] == counts[j - 1] {
                equal |= 1 << j;
            }
        }

        let mut suit_size = [0u64; SUITS];
        let mut block_size = 1u64;
        let mut i = 0;
        while i < SUITS {
            let mut size = 1u64;
            let mut remaining = RANKS;
            for r in 0..=round {
                let dealt = nibble(counts[i], r) as usize;
                size *= t.rank_choose(remaining, dealt);
                remaining -= dealt;
            }

            let mut j = i + 1;
            while j < SUITS && counts[j] == counts[i] {
                j += 1;
            }
            for slot in suit_size.iter_mut().take(j).skip(i) {
                *slot = size;
            }
            // Interchangeable suits index as a multiset of per-suit indices.
            block_size *= t.group_choose(size as usize + (j - i) - 1, j - i);
            i = j;
        }

        SuitConfiguration {
            counts: *counts,
            suit_size,
            offset: block_size,
            equal,
        }
    }
}

#[derive(Debug, Clone)]
struct RoundLayout {
    /// Configurations sorted descending by counts; offsets are prefix sums.
    configurations: Vec<SuitConfiguration>,
    /// Raw per-suit count pattern -> configuration position.
    permutation_to_configuration: Vec<u32>,
    /// Raw per-suit count pattern -> suit permutation code.
    permutation_to_pi: Vec<u32>,
    /// Total isomorphism classes for the round.
    size: u64,
}

/// Running state while indexing a hand round by round.
#[derive(Debug, Clone)]
struct IndexerState {
    suit_index: [u64; SUITS],
    suit_multiplier: [u64; SUITS],
    round: usize,
    permutation_index: usize,
    permutation_multiplier: usize,
    used_ranks: [u32; SUITS],
}

impl IndexerState {
    fn new() -> Self {
        IndexerState {
            suit_index: [0; SUITS],
            suit_multiplier: [1; SUITS],
            round: 0,
            permutation_index: 0,
            permutation_multiplier: 1,
            used_ranks: [0; SUITS],
        }
    }
}

/// Canonical hand indexer for a fixed per-round card-count schedule.
///
/// For every round the indexer maps the cards dealt so far to a dense
/// canonical index in `[0, size(round))`. Two card tuples receive the same
/// index exactly when one can be produced from the other by a consistent
/// relabeling of suits that preserves which round each card was dealt in.
///
/// # Example
///
/// ```
/// use abstracted_poker::core::parse_cards;
/// use abstracted_poker::index::HandIndexer;
///
/// let indexer = HandIndexer::new(&[2]).unwrap();
/// assert_eq!(indexer.size(0), 169);
///
/// let a = indexer.index_last(&parse_cards("AsKs").unwrap());
/// let b = indexer.index_last(&parse_cards("AhKh").unwrap());
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct HandIndexer {
    cards_per_round: Vec<u8>,
    round_start: Vec<usize>,
    total_cards: usize,
    rounds_data: Vec<RoundLayout>,
}

impl HandIndexer {
    /// Build an indexer for the given schedule of cards dealt per round.
    pub fn new(cards_per_round: &[u8]) -> Result<Self, IndexerError> {
        let rounds = cards_per_round.len();
        if rounds == 0 || rounds > MAX_ROUNDS {
            return Err(IndexerError::InvalidRoundCount { actual: rounds });
        }
        let mut total_cards = 0usize;
        for (round, &dealt) in cards_per_round.iter().enumerate() {
            if dealt as u32 > ROUND_MASK {
                return Err(IndexerError::RoundTooLarge {
                    round,
                    actual: dealt,
                });
            }
            total_cards += dealt as usize;
        }
        if total_cards > CARDS {
            return Err(IndexerError::TooManyCards {
                actual: total_cards,
            });
        }

        let t = &*TABLES;

        let mut round_start = Vec::with_capacity(rounds);
        let mut start = 0usize;
        for &dealt in cards_per_round {
            round_start.push(start);
            start += dealt as usize;
        }

        // Enumerate the sorted suit configurations of every round.
        let mut counts_per_round: Vec<Vec<[u32; SUITS]>> = vec![Vec::new(); rounds];
        enumerate_configurations(cards_per_round, &mut |round, counts| {
            counts_per_round[round].push(*counts)
        });

        let mut rounds_data: Vec<RoundLayout> = Vec::with_capacity(rounds);
        let mut position_by_counts: Vec<HashMap<[u32; SUITS], u32>> = Vec::with_capacity(rounds);
        for (round, mut counts_list) in counts_per_round.into_iter().enumerate() {
            counts_list.sort_by(|a, b| b.cmp(a));

            let mut configurations = Vec::with_capacity(counts_list.len());
            for counts in &counts_list {
                configurations.push(SuitConfiguration::build(round, counts, t));
            }
            let mut accum = 0u64;
            for cfg in configurations.iter_mut() {
                let block = cfg.offset;
                cfg.offset = accum;
                accum += block;
            }

            position_by_counts.push(
                configurations
                    .iter()
                    .enumerate()
                    .map(|(i, cfg)| (cfg.counts, i as u32))
                    .collect(),
            );
            rounds_data.push(RoundLayout {
                configurations,
                permutation_to_configuration: Vec::new(),
                permutation_to_pi: Vec::new(),
                size: accum,
            });
        }

        // Enumerate every raw (unsorted) suit count pattern and point it at
        // its sorted configuration and the suit permutation that sorts it.
        let mut raw_per_round: Vec<Vec<[u32; SUITS]>> = vec![Vec::new(); rounds];
        enumerate_permutations(cards_per_round, &mut |round, counts| {
            raw_per_round[round].push(*counts)
        });

        for (round, raw_counts) in raw_per_round.into_iter().enumerate() {
            let mut entries = Vec::with_capacity(raw_counts.len());
            let mut table_len = 0usize;
            for counts in &raw_counts {
                let slot = permutation_index(cards_per_round, round, counts);
                let (pi_code, sorted) = sort_suit_counts(counts);
                let position = position_by_counts[round][&sorted];
                table_len = table_len.max(slot + 1);
                entries.push((slot, position, pi_code));
            }
            let layout = &mut rounds_data[round];
            layout.permutation_to_configuration = vec![u32::MAX; table_len];
            layout.permutation_to_pi = vec![u32::MAX; table_len];
            for (slot, position, pi_code) in entries {
                layout.permutation_to_configuration[slot] = position;
                layout.permutation_to_pi[slot] = pi_code;
            }
        }

        let indexer = HandIndexer {
            cards_per_round: cards_per_round.to_vec(),
            round_start,
            total_cards,
            rounds_data,
        };
        tracing::debug!(
            rounds,
            sizes = ?indexer.rounds_data.iter().map(|r| r.size).collect::<Vec<_>>(),
            "hand indexer initialized"
        );
        Ok(indexer)
    }

    /// Number of configured rounds.
    pub fn rounds(&self) -> usize {
        self.rounds_data.len()
    }

    /// Cards dealt in `round` (0-based).
    pub fn cards_per_round(&self, round: usize) -> usize {
        assert!(round < self.rounds(), "round {round} out of range");
        self.cards_per_round[round] as usize
    }

    /// Cards dealt in `round` (0-based) and every earlier round.
    pub fn cards_through_round(&self, round: usize) -> usize {
        assert!(round < self.rounds(), "round {round} out of range");
        self.round_start[round] + self.cards_per_round[round] as usize
    }

    /// Total cards the full schedule deals.
    pub fn total_cards(&self) -> usize {
        self.total_cards
    }

    /// Number of isomorphism classes for `round` (0-based).
    pub fn size(&self, round: usize) -> u64 {
        assert!(round < self.rounds(), "round {round} out of range");
        self.rounds_data[round].size
    }

    /// Index the hand for every round the card tuple covers.
    ///
    /// # Panics
    ///
    /// Panics when the tuple is empty, exceeds the schedule, does not end
    /// exactly on a round boundary, or contains a duplicate card.
    pub fn index_all(&self, cards: &[Card]) -> Vec<u64> {
        assert!(
            cards.len() <= self.total_cards,
            "card tuple of {} exceeds the schedule's {} cards",
            cards.len(),
            self.total_cards
        );
        let mut indices = Vec::with_capacity(self.rounds());
        let mut state = IndexerState::new();
        let mut consumed = 0usize;
        for round in 0..self.rounds() {
            let dealt = self.cards_per_round[round] as usize;
            if consumed + dealt > cards.len() {
                break;
            }
            indices.push(self.index_next_round(&cards[consumed..consumed + dealt], &mut state));
            consumed += dealt;
        }
        assert!(
            consumed == cards.len() && !indices.is_empty(),
            "card tuple of {} cards does not end on a round boundary",
            cards.len()
        );
        indices
    }

    /// Index for the last round the card tuple reaches.
    pub fn index_last(&self, cards: &[Card]) -> u64 {
        *self
            .index_all(cards)
            .last()
            .expect("index_all returns at least one round")
    }

    /// Reconstruct a representative card tuple for `index` at `round`
    /// (0-based). The representative is deterministic, and
    /// `index_last(unindex(round, i)) == i` for every valid `i`.
    ///
    /// # Panics
    ///
    /// Panics when `round` is out of range or `index >= size(round)`.
    pub fn unindex(&self, round: usize, index: u64) -> Vec<Card> {
        assert!(round < self.rounds(), "round {round} out of range");
        let layout = &self.rounds_data[round];
        assert!(
            index < layout.size,
            "index {index} out of range for round size {}",
            layout.size
        );
        let t = &*TABLES;

        let position = layout
            .configurations
            .partition_point(|cfg| cfg.offset <= index)
            - 1;
        let cfg = &layout.configurations[position];
        let mut remainder = index - cfg.offset;

        // Split the remainder into one index per suit, undoing the multiset
        // packing of interchangeable suit groups (largest member first).
        let mut suit_index = [0u64; SUITS];
        let mut i = 0;
        while i < SUITS {
            let mut j = i + 1;
            while j < SUITS && cfg.equal & (1 << j) != 0 {
                j += 1;
            }
            let group = j - i;
            let group_size = t.group_choose(cfg.suit_size[i] as usize + group - 1, group);
            let mut group_index = remainder % group_size;
            remainder /= group_size;

            let mut members = group;
            let mut slot = i;
            while members > 1 {
                let mut low = 0u64;
                let mut high = cfg.suit_size[i];
                let mut found = 0u64;
                while low < high {
                    let mid = (low + high) / 2;
                    if t.group_choose(mid as usize + members - 1, members) <= group_index {
                        found = mid;
                        low = mid + 1;
                    } else {
                        high = mid;
                    }
                }
                suit_index[slot] = found;
                group_index -= t.group_choose(found as usize + members - 1, members);
                slot += 1;
                members -= 1;
            }
            suit_index[slot] = group_index;
            i = j;
        }

        // Decode each suit's per-round rank sets, low rounds first.
        let total = self.cards_through_round(round);
        let mut cards = vec![Card::from_id(0); total];
        let mut location: Vec<usize> = self.round_start[..=round].to_vec();
        for suit in 0..SUITS {
            let mut used: u32 = 0;
            let mut digits = suit_index[suit];
            for (r, write_at) in location.iter_mut().enumerate() {
                let dealt = nibble(cfg.counts[suit], r) as usize;
                let taken = used.count_ones() as usize;
                let round_size = t.rank_choose(RANKS - taken, dealt);
                let round_index = digits % round_size;
                digits /= round_size;

                let mut shifted = t.index_to_rank_set(dealt, round_index);
                let mut dealt_set: u32 = 0;
                for _ in 0..dealt {
                    let low_bit = shifted & shifted.wrapping_neg();
                    shifted ^= low_bit;
                    let rank = t.nth_unset(used, low_bit.trailing_zeros() as usize);
                    dealt_set |= 1 << rank;
                    cards[*write_at] = Card::new(suit as u8, rank);
                    *write_at += 1;
                }
                used |= dealt_set;
            }
        }
        cards
    }

    fn index_next_round(&self, cards: &[Card], state: &mut IndexerState) -> u64 {
        let t = &*TABLES;
        let round = state.round;
        state.round += 1;

        let mut ranks = [0u32; SUITS];
        let mut shifted_ranks = [0u32; SUITS];
        for &card in cards {
            let rank = card.rank() as u32;
            let suit = card.suit() as usize;
            let rank_bit = 1u32 << rank;
            assert!(
                ranks[suit] & rank_bit == 0 && state.used_ranks[suit] & rank_bit == 0,
                "duplicate card {card} in hand"
            );
            ranks[suit] |= rank_bit;
            // Compress out the ranks this suit used in earlier rounds.
            let used_below = ((rank_bit - 1) & state.used_ranks[suit]).count_ones();
            shifted_ranks[suit] |= 1 << (rank - used_below);
        }

        for suit in 0..SUITS {
            let taken = state.used_ranks[suit].count_ones() as usize;
            let dealt = ranks[suit].count_ones() as usize;
            state.suit_index[suit] +=
                state.suit_multiplier[suit] * t.rank_set_to_index(shifted_ranks[suit]);
            state.suit_multiplier[suit] *= t.rank_choose(RANKS - taken, dealt);
            state.used_ranks[suit] |= ranks[suit];
        }

        let mut remaining = self.cards_per_round[round] as usize;
        for suit in 0..SUITS - 1 {
            let dealt = ranks[suit].count_ones() as usize;
            state.permutation_index += state.permutation_multiplier * dealt;
            state.permutation_multiplier *= remaining + 1;
            remaining -= dealt;
        }

        let layout = &self.rounds_data[round];
        let position = layout.permutation_to_configuration[state.permutation_index] as usize;
        let pi = t.suit_permutation(layout.permutation_to_pi[state.permutation_index] as usize);
        let cfg = &layout.configurations[position];

        let mut suit_index = [0u64; SUITS];
        let mut suit_multiplier = [0u64; SUITS];
        for slot in 0..SUITS {
            suit_index[slot] = state.suit_index[pi[slot] as usize];
            suit_multiplier[slot] = state.suit_multiplier[pi[slot] as usize];
        }

        // Combine per-suit indices; interchangeable groups pack as sorted
        // multisets.
        let mut index = cfg.offset;
        let mut multiplier = 1u64;
        let mut i = 0;
        while i < SUITS {
            let mut j = i + 1;
            while j < SUITS && cfg.equal & (1 << j) != 0 {
                j += 1;
            }
            let group = j - i;
            let (part, size) = if group == 1 {
                (suit_index[i], suit_multiplier[i])
            } else {
                suit_index[i..j].sort_unstable();
                let mut part = 0u64;
                for (k, &member) in suit_index[i..j].iter().enumerate() {
                    part += t.group_choose(member as usize + k, k + 1);
                }
                (
                    part,
                    t.group_choose(suit_multiplier[i] as usize + group - 1, group),
                )
            };
            index += multiplier * part;
            multiplier *= size;
            i = j;
        }
        index
    }
}

#[inline]
fn nibble(counts: u32, round: usize) -> u32 {
    (counts >> (ROUND_SHIFT * (MAX_ROUNDS - round - 1))) & ROUND_MASK
}

/// Stable sort of suits by descending counts. Returns the factorial code of
/// the sorting permutation and the sorted counts.
fn sort_suit_counts(counts: &[u32; SUITS]) -> (u32, [u32; SUITS]) {
    let mut pi = [0usize; SUITS];
    for (i, slot) in pi.iter_mut().enumerate() {
        *slot = i;
    }
    for i in 1..SUITS {
        let moving = pi[i];
        let mut j = i;
        while j > 0 && counts[moving] > counts[pi[j - 1]] {
            pi[j] = pi[j - 1];
            j -= 1;
        }
        pi[j] = moving;
    }

    let mut code = 0u32;
    let mut mult = 1u32;
    let mut used = 0u32;
    for (i, &suit) in pi.iter().enumerate() {
        let bit = 1u32 << suit;
        let smaller = ((bit - 1) & used).count_ones();
        code += (suit as u32 - smaller) * mult;
        mult *= (SUITS - i) as u32;
        used |= bit;
    }

    let mut sorted = [0u32; SUITS];
    for (slot, &suit) in pi.iter().enumerate() {
        sorted[slot] = counts[suit];
    }
    (code, sorted)
}

/// Mixed-radix slot of a raw per-suit count pattern through `round`.
fn permutation_index(schedule: &[u8], round: usize, counts: &[u32; SUITS]) -> usize {
    let mut slot = 0usize;
    let mut mult = 1usize;
    for (r, &dealt) in schedule.iter().enumerate().take(round + 1) {
        let mut remaining = dealt as usize;
        for suit in 0..SUITS - 1 {
            let size = nibble(counts[suit], r) as usize;
            slot += mult * size;
            mult *= remaining + 1;
            remaining -= size;
        }
    }
    slot
}

/// Visit the sorted (non-increasing) suit configurations of every round.
fn enumerate_configurations(schedule: &[u8], observe: &mut dyn FnMut(usize, &[u32; SUITS])) {
    let mut used = [0u32; SUITS];
    let mut configuration = [0u32; SUITS];
    enumerate_configurations_r(
        schedule,
        0,
        schedule[0] as u32,
        0,
        &mut used,
        &mut configuration,
        observe,
    );
}

#[allow(clippy::too_many_arguments)]
fn enumerate_configurations_r(
    schedule: &[u8],
    round: usize,
    remaining: u32,
    suit: usize,
    used: &mut [u32; SUITS],
    configuration: &mut [u32; SUITS],
    observe: &mut dyn FnMut(usize, &[u32; SUITS]),
) {
    if suit == SUITS {
        observe(round, configuration);
        if round + 1 < schedule.len() {
            enumerate_configurations_r(
                schedule,
                round + 1,
                schedule[round + 1] as u32,
                0,
                used,
                configuration,
                observe,
            );
        }
        return;
    }

    let shift = ROUND_SHIFT * (MAX_ROUNDS - round - 1);
    let min = if suit == SUITS - 1 { remaining } else { 0 };
    let mut max = RANKS as u32 - used[suit];
    if remaining < max {
        max = remaining;
    }
    // Suits are interchangeable, so only non-increasing assignments are
    // enumerated: while a suit's earlier rounds match its predecessor's, its
    // count this round may not exceed the predecessor's.
    if suit > 0 {
        let prefix = configuration[suit - 1] & !(ROUND_MASK << shift);
        if configuration[suit] == prefix {
            let prev = (configuration[suit - 1] >> shift) & ROUND_MASK;
            if prev < max {
                max = prev;
            }
        }
    }

    let old_used = used[suit];
    let old_configuration = configuration[suit];
    let mut dealt = min;
    while dealt <= max {
        configuration[suit] = old_configuration | (dealt << shift);
        used[suit] = old_used + dealt;
        enumerate_configurations_r(
            schedule,
            round,
            remaining - dealt,
            suit + 1,
            used,
            configuration,
            observe,
        );
        dealt += 1;
    }
    configuration[suit] = old_configuration;
    used[suit] = old_used;
}

/// Visit every raw per-suit count pattern of every round.
fn enumerate_permutations(schedule: &[u8], observe: &mut dyn FnMut(usize, &[u32; SUITS])) {
    let mut used = [0u32; SUITS];
    let mut counts = [0u32; SUITS];
    enumerate_permutations_r(
        schedule,
        0,
        schedule[0] as u32,
        0,
        &mut used,
        &mut counts,
        observe,
    );
}

#[allow(clippy::too_many_arguments)]
fn enumerate_permutations_r(
    schedule: &[u8],
    round: usize,
    remaining: u32,
    suit: usize,
    used: &mut [u32; SUITS],
    counts: &mut [u32; SUITS],
    observe: &mut dyn FnMut(usize, &[u32; SUITS]),
) {
    if suit == SUITS {
        observe(round, counts);
        if round + 1 < schedule.len() {
            enumerate_permutations_r(
                schedule,
                round + 1,
                schedule[round + 1] as u32,
                0,
                used,
                counts,
                observe,
            );
        }
        return;
    }

    let shift = ROUND_SHIFT * (MAX_ROUNDS - round - 1);
    let min = if suit == SUITS - 1 { remaining } else { 0 };
    let mut max = RANKS as u32 - used[suit];
    if remaining < max {
        max = remaining;
    }

    let old_used = used[suit];
    let old_counts = counts[suit];
    let mut dealt = min;
    while dealt <= max {
        counts[suit] = old_counts | (dealt << shift);
        used[suit] = old_used + dealt;
        enumerate_permutations_r(
            schedule,
            round,
            remaining - dealt,
            suit + 1,
            used,
            counts,
            observe,
        );
        dealt += 1;
    }
    counts[suit] = old_counts;
    used[suit] = old_used;
}
