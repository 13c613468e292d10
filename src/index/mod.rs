//! Canonical hand indexing under suit isomorphism.
//!
//! Raw card combinations explode across betting rounds (billions by the
//! river); consistently relabeling suits leaves a hand strategically
//! unchanged, so collapsing each relabeling class onto one dense integer is
//! what makes per-round hand abstraction tractable. [`HandIndexer`] does the
//! collapse for an arbitrary per-round schedule; [`PreflopIndexer`] and
//! [`GeneralIndexer`] configure it for the standard game.

mod tables;

mod indexer;
pub use self::indexer::{HandIndexer, IndexerError};

mod round;
pub use self::round::{GeneralIndexer, PreflopIndexer, HOLDEM_SCHEDULE};
