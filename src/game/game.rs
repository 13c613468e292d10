use core::fmt;
use std::path::PathBuf;

use crate::abstraction::{ClusterTable, OffAbstractionTable};
use crate::index::{GeneralIndexer, PreflopIndexer};

use super::engine::{GameSpec, ProtocolEngine};
use super::errors::GameBuilderError;
use super::state::GameState;

/// Maximum number of players supported.
pub const MAX_PLAYERS: usize = 10;

/// Which abstract action menu decision nodes offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::upper_case_acronyms)]
pub enum BettingAbstraction {
    /// Fold and check/call only.
    FC,
    /// Fold, check/call, and the pot-relative raise menu.
    #[default]
    FCPA,
}

impl fmt::Display for BettingAbstraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BettingAbstraction::FC => write!(f, "BettingAbstraction: FC"),
            BettingAbstraction::FCPA => write!(f, "BettingAbstraction: FCPA"),
        }
    }
}

/// An abstracted poker game: the immutable context every state of a hand
/// shares.
///
/// Owns one canonical hand indexer per round, the cluster table mapping
/// canonical indices to abstraction buckets, the shared (pre-populated)
/// off-abstraction raise table, and the protocol-engine prototype cloned
/// into each new state. All of it is read-only once built, so a game can be
/// shared freely across concurrently explored states.
#[derive(Debug)]
pub struct Game<E: ProtocolEngine> {
    spec: GameSpec,
    engine: E,
    betting_abstraction: BettingAbstraction,
    preflop_indexer: PreflopIndexer,
    flop_indexer: GeneralIndexer,
    turn_indexer: GeneralIndexer,
    river_indexer: GeneralIndexer,
    clusters: ClusterTable,
    custom_raises: OffAbstractionTable,
    max_game_length: usize,
}

impl<E: ProtocolEngine> Game<E> {
    pub fn builder() -> GameBuilder<E> {
        GameBuilder::new()
    }

    /// A fresh state at the start of a hand, ready to deal.
    pub fn new_initial_state(&self) -> GameState<'_, E> {
        GameState::new(self, self.engine.clone())
    }

    pub fn spec(&self) -> &GameSpec {
        &self.spec
    }

    pub fn betting_abstraction(&self) -> BettingAbstraction {
        self.betting_abstraction
    }

    pub fn num_players(&self) -> usize {
        self.spec.num_players
    }

    /// Distinct decision-node action ids: fold/call/bet for limit games,
    /// the full abstract menu otherwise.
    pub fn num_distinct_actions(&self) -> usize {
        if self.spec.limit {
            3
        } else {
            7
        }
    }

    /// Distinct chance outcomes: one per card in the configured deck.
    pub fn max_chance_outcomes(&self) -> usize {
        self.spec.deck_size()
    }

    /// Upper bound on actions (deals included) in one hand.
    pub fn max_game_length(&self) -> usize {
        self.max_game_length
    }

    /// The most a player can lose: their starting stack.
    pub fn min_utility(&self) -> f64 {
        -f64::from(self.spec.stacks[0])
    }

    /// The most a player can win: a full stack from every opponent.
    pub fn max_utility(&self) -> f64 {
        f64::from(self.spec.stacks[0]) * (self.num_players() - 1) as f64
    }

    /// Shape of the information-state tensor: player one-hot, private and
    /// public card bits, and two bits per action-sequence entry.
    pub fn information_state_tensor_shape(&self) -> Vec<usize> {
        vec![self.num_players() + 2 * self.spec.deck_size() + 2 * self.max_game_length]
    }

    /// Shape of the observation tensor: player one-hot, private and public
    /// card bits, and each player's pot contribution.
    pub fn observation_tensor_shape(&self) -> Vec<usize> {
        vec![2 * (self.num_players() + self.spec.deck_size())]
    }

    /// Canonical index of a card string for `round` (1-based).
    ///
    /// # Panics
    ///
    /// Panics when `round` is outside `1..=4`.
    pub fn index_hand(&self, round: usize, cards: &str) -> u64 {
        match round {
            1 => self.preflop_indexer.index(cards),
            2 => self.flop_indexer.index(cards),
            3 => self.turn_indexer.index(cards),
            4 => self.river_indexer.index(cards),
            _ => panic!("round {round} not supported"),
        }
    }

    /// A representative card string for a canonical index of `round`
    /// (1-based).
    pub fn canonical_hand(&self, round: usize, index: u64) -> String {
        match round {
            1 => self.preflop_indexer.canonical_hand(index),
            2 => self.flop_indexer.canonical_hand(index),
            3 => self.turn_indexer.canonical_hand(index),
            4 => self.river_indexer.canonical_hand(index),
            _ => panic!("round {round} not supported"),
        }
    }

    /// Canonical classes for `round` (1-based).
    pub fn index_size(&self, round: usize) -> u64 {
        match round {
            1 => self.preflop_indexer.size(),
            2 => self.flop_indexer.size(2),
            3 => self.turn_indexer.size(3),
            4 => self.river_indexer.size(4),
            _ => panic!("round {round} not supported"),
        }
    }

    /// Cards a hand string must hold to index at `round` (1-based).
    pub fn index_cards_num(&self, round: usize) -> usize {
        match round {
            1 => 2,
            2 => self.flop_indexer.cards_num(2),
            3 => self.turn_indexer.cards_num(3),
            4 => self.river_indexer.cards_num(4),
            _ => panic!("round {round} not supported"),
        }
    }

    /// Whether `num_cards` lands on a round boundary of the round-`round`
    /// indexer (1-based), i.e. the card count identifies some round's full
    /// deal.
    pub fn is_index_boundary(&self, round: usize, num_cards: usize) -> bool {
        (1..=round.min(4)).any(|r| self.index_cards_num(r) == num_cards)
    }

    /// Abstraction bucket for a canonical index at `round` (1-based).
    pub fn cluster(&self, round: usize, index: u64) -> u32 {
        self.clusters.cluster(round, index)
    }

    /// The game-scope off-abstraction raise table.
    pub fn shared_custom_raises(&self) -> &OffAbstractionTable {
        &self.custom_raises
    }
}

/// Pot-sized raises at least double the committed money, which bounds how
/// many decisions a hand can see.
fn estimate_max_game_length(spec: &GameSpec) -> usize {
    // One terminal action.
    let mut length = 1usize;
    // Deal actions.
    length += spec.total_board_cards() + spec.num_hole_cards * spec.num_players;
    // Check actions.
    length += spec.num_players * spec.num_rounds();
    // Bet actions.
    let mut max_stack = spec.stacks.iter().copied().max().unwrap_or(0);
    let max_blind = spec.blinds.iter().copied().max().unwrap_or(0).max(1);
    while max_stack > max_blind {
        max_stack /= 2;
        length += spec.num_players;
    }
    length
}

/// Builder assembling a [`Game`] with validation.
///
/// # Example
///
/// ```no_run
/// # #[cfg(feature = "test-util")] {
/// use abstracted_poker::game::{Game, GameSpec};
/// use abstracted_poker::game::test_util::TestEngine;
///
/// let spec = GameSpec::holdem_no_limit(2, 1200, 100);
/// let game = Game::builder()
///     .engine(TestEngine::new(&spec))
///     .spec(spec)
///     .cluster_file(4, "clusters/river_cluster.bin")
///     .build()
///     .unwrap();
/// assert_eq!(game.num_players(), 2);
/// # }
/// ```
pub struct GameBuilder<E: ProtocolEngine> {
    spec: Option<GameSpec>,
    engine: Option<E>,
    betting_abstraction: BettingAbstraction,
    clusters: ClusterTable,
    cluster_files: Vec<(usize, PathBuf)>,
    custom_raises: OffAbstractionTable,
}

impl<E: ProtocolEngine> Default for GameBuilder<E> {
    fn default() -> Self {
        GameBuilder {
            spec: None,
            engine: None,
            betting_abstraction: BettingAbstraction::default(),
            clusters: ClusterTable::placeholder(),
            cluster_files: Vec::new(),
            custom_raises: OffAbstractionTable::new(),
        }
    }
}

impl<E: ProtocolEngine> GameBuilder<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the game spec. Required.
    pub fn spec(mut self, spec: GameSpec) -> Self {
        self.spec = Some(spec);
        self
    }

    /// Set the protocol-engine prototype cloned into each state. Required.
    pub fn engine(mut self, engine: E) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Set the betting abstraction. Defaults to [`BettingAbstraction::FCPA`].
    pub fn betting_abstraction(mut self, abstraction: BettingAbstraction) -> Self {
        self.betting_abstraction = abstraction;
        self
    }

    /// Inject a cluster table (in-memory buckets and/or fallback modulus).
    pub fn cluster_table(mut self, clusters: ClusterTable) -> Self {
        self.clusters = clusters;
        self
    }

    /// Load the cluster table for `round` (1-based) from a file at build
    /// time. A missing file degrades to placeholder bucketing.
    pub fn cluster_file(mut self, round: usize, path: impl Into<PathBuf>) -> Self {
        self.cluster_files.push((round, path.into()));
        self
    }

    /// Pre-populate the shared off-abstraction raise table.
    pub fn custom_raises(mut self, custom_raises: OffAbstractionTable) -> Self {
        self.custom_raises = custom_raises;
        self
    }

    /// Build the game, validating the spec and loading cluster files.
    pub fn build(self) -> Result<Game<E>, GameBuilderError> {
        let spec = self.spec.ok_or(GameBuilderError::MissingSpec)?;
        let engine = self.engine.ok_or(GameBuilderError::MissingEngine)?;

        if !(2..=MAX_PLAYERS).contains(&spec.num_players) {
            return Err(GameBuilderError::InvalidPlayerCount {
                actual: spec.num_players,
                max: MAX_PLAYERS,
            });
        }
        if spec.stacks.len() != spec.num_players {
            return Err(GameBuilderError::StackCountMismatch {
                stacks: spec.stacks.len(),
                num_players: spec.num_players,
            });
        }
        if spec.blinds.len() != spec.num_players {
            return Err(GameBuilderError::BlindCountMismatch {
                blinds: spec.blinds.len(),
                num_players: spec.num_players,
            });
        }
        if spec.num_board_cards.is_empty() {
            return Err(GameBuilderError::EmptySchedule);
        }
        if spec.num_rounds() > 4 {
            return Err(GameBuilderError::TooManyRounds {
                actual: spec.num_rounds(),
            });
        }
        let needed = spec.num_hole_cards * spec.num_players + spec.total_board_cards();
        if needed > spec.deck_size() {
            return Err(GameBuilderError::DeckTooSmall {
                needed,
                deck: spec.deck_size(),
            });
        }

        let preflop_indexer = PreflopIndexer::new()?;
        let flop_indexer = GeneralIndexer::new(2)?;
        let turn_indexer = GeneralIndexer::new(3)?;
        let river_indexer = GeneralIndexer::new(4)?;

        let mut clusters = self.clusters;
        for (round, path) in self.cluster_files {
            let expected = match round {
                1 => preflop_indexer.size(),
                2 => flop_indexer.size(2),
                3 => turn_indexer.size(3),
                4 => river_indexer.size(4),
                _ => panic!("round {round} not supported"),
            };
            clusters.load_round(round, path, expected)?;
        }

        let max_game_length = estimate_max_game_length(&spec);
        tracing::debug!(
            num_players = spec.num_players,
            limit = spec.limit,
            max_game_length,
            "abstracted game constructed"
        );

        Ok(Game {
            spec,
            engine,
            betting_abstraction: self.betting_abstraction,
            preflop_indexer,
            flop_indexer,
            turn_indexer,
            river_indexer,
            clusters,
            custom_raises: self.custom_raises,
            max_game_length,
        })
    }
}
