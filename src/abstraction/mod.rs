//! Information abstraction: cluster bucketing of canonical hand indices and
//! the write-once table of custom off-abstraction raise sizes.

mod cluster;
pub use self::cluster::{ClusterTable, ClusterTableError};

mod off_abstraction;
pub use self::off_abstraction::{OffAbstractionError, OffAbstractionTable};
