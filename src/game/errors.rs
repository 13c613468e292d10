use thiserror::Error;

use crate::abstraction::{ClusterTableError, OffAbstractionError};
use crate::index::IndexerError;

/// Errors that can occur when building a Game.
#[derive(Error, Debug)]
pub enum GameBuilderError {
    #[error("a game spec is required")]
    MissingSpec,

    #[error("a protocol engine is required")]
    MissingEngine,

    #[error("num_players must be between 2 and {max}, got {actual}")]
    InvalidPlayerCount { actual: usize, max: usize },

    #[error("stacks length {stacks} must equal num_players {num_players}")]
    StackCountMismatch { stacks: usize, num_players: usize },

    #[error("blinds length {blinds} must equal num_players {num_players}")]
    BlindCountMismatch { blinds: usize, num_players: usize },

    #[error("the board schedule must cover at least one round")]
    EmptySchedule,

    #[error("the abstraction indexers support at most 4 rounds, got {actual}")]
    TooManyRounds { actual: usize },

    #[error("the deal schedule needs {needed} cards but the deck has {deck}")]
    DeckTooSmall { needed: usize, deck: usize },

    #[error("failed to build hand indexers")]
    Indexer(#[from] IndexerError),

    #[error("failed to load cluster tables")]
    Cluster(#[from] ClusterTableError),
}

/// Errors from mutating a game state.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum StateError {
    #[error("off-abstraction raise rejected")]
    DuplicateCustomRaise(#[from] OffAbstractionError),
}
