//! The abstracted sequential poker game: chance/decision/terminal state
//! machine, pot-relative action abstraction, and information-state
//! construction, all built over an external betting protocol engine.

mod action;
pub use self::action::{AbstractAction, ActionSet, DEAL_CHAR};

mod engine;
pub use self::engine::{GameSpec, ProtocolAction, ProtocolEngine};

mod errors;
pub use self::errors::{GameBuilderError, StateError};

#[allow(clippy::module_inception)]
mod game;
pub use self::game::{BettingAbstraction, Game, GameBuilder, MAX_PLAYERS};

mod state;
pub use self::state::{GameState, NodeKind, CHANCE_PLAYER_ID, TERMINAL_PLAYER_ID};

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
