use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use thiserror::Error;

/// Errors from loading cluster files.
#[derive(Error, Debug)]
pub enum ClusterTableError {
    #[error("cluster file for round {round} holds {actual} buckets, expected {expected}")]
    WrongLength {
        round: usize,
        expected: u64,
        actual: u64,
    },

    #[error("failed reading cluster file")]
    Io(#[from] std::io::Error),
}

/// Per-round mapping from canonical hand index to abstraction bucket.
///
/// A round either carries a loaded table (one unsigned byte per canonical
/// index, ascending) or falls back to placeholder bucketing
/// (`index % fallback_buckets`). The indirection lets the abstraction
/// granularity be swapped without touching the state machine.
///
/// # Example
///
/// ```
/// use abstracted_poker::abstraction::ClusterTable;
///
/// let table = ClusterTable::placeholder();
/// assert_eq!(table.cluster(2, 1_026_452), (1_026_452 % 200) as u32);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    rounds: [Option<Vec<u8>>; 4],
    fallback_buckets: u64,
}

impl ClusterTable {
    /// A table with no loaded rounds; every lookup uses the placeholder.
    pub fn placeholder() -> Self {
        Self::with_fallback_buckets(200)
    }

    /// Placeholder bucketing with a custom modulus.
    pub fn with_fallback_buckets(buckets: u64) -> Self {
        assert!(buckets > 0, "placeholder bucket count must be positive");
        ClusterTable {
            rounds: Default::default(),
            fallback_buckets: buckets,
        }
    }

    /// Install an in-memory bucket table for `round` (1-based).
    pub fn set_round(&mut self, round: usize, buckets: Vec<u8>) {
        assert!((1..=4).contains(&round), "round {round} outside 1..=4");
        self.rounds[round - 1] = Some(buckets);
    }

    /// Load the bucket table for `round` (1-based) from a flat binary file
    /// of exactly `expected_len` bytes.
    ///
    /// A missing file is not an error: the round keeps placeholder
    /// bucketing and `Ok(false)` is returned. A file of the wrong length is
    /// an error.
    pub fn load_round(
        &mut self,
        round: usize,
        path: impl AsRef<Path>,
        expected_len: u64,
    ) -> Result<bool, ClusterTableError> {
        assert!((1..=4).contains(&round), "round {round} outside 1..=4");
        let path = path.as_ref();
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    round,
                    path = %path.display(),
                    "cluster file missing, using placeholder bucketing"
                );
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        };

        let mut buckets = Vec::new();
        file.read_to_end(&mut buckets)?;
        if buckets.len() as u64 != expected_len {
            return Err(ClusterTableError::WrongLength {
                round,
                expected: expected_len,
                actual: buckets.len() as u64,
            });
        }
        self.rounds[round - 1] = Some(buckets);
        Ok(true)
    }

    /// Whether `round` (1-based) has a loaded table.
    pub fn is_loaded(&self, round: usize) -> bool {
        assert!((1..=4).contains(&round), "round {round} outside 1..=4");
        self.rounds[round - 1].is_some()
    }

    /// The bucket for a canonical index at `round` (1-based).
    pub fn cluster(&self, round: usize, index: u64) -> u32 {
        assert!((1..=4).contains(&round), "round {round} outside 1..=4");
        match &self.rounds[round - 1] {
            Some(buckets) => buckets[index as usize] as u32,
            None => (index % self.fallback_buckets) as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_placeholder_bucketing() {
        let table = ClusterTable::placeholder();
        assert_eq!(table.cluster(1, 168), 168);
        assert_eq!(table.cluster(2, 205), 5);
        assert_eq!(table.cluster(4, 2_428_287_419), (2_428_287_419_u64 % 200) as u32);
    }

    #[test]
    fn test_in_memory_table() {
        let mut table = ClusterTable::placeholder();
        table.set_round(1, (0..169).map(|i| (i % 7) as u8).collect());
        assert!(table.is_loaded(1));
        assert!(!table.is_loaded(2));
        assert_eq!(table.cluster(1, 10), 3);
        assert_eq!(table.cluster(2, 10), 10);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let mut table = ClusterTable::placeholder();
        let loaded = table
            .load_round(3, "/nonexistent/turn_cluster.bin", 10)
            .unwrap();
        assert!(!loaded);
        assert!(!table.is_loaded(3));
        assert_eq!(table.cluster(3, 421), 21);
    }

    #[test]
    fn test_load_checks_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flop_cluster.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(&[1u8, 2, 3, 4]).unwrap();
        drop(file);

        let mut table = ClusterTable::placeholder();
        let err = table.load_round(2, &path, 5).unwrap_err();
        assert!(matches!(
            err,
            ClusterTableError::WrongLength {
                round: 2,
                expected: 5,
                actual: 4
            }
        ));

        assert!(table.load_round(2, &path, 4).unwrap());
        assert_eq!(table.cluster(2, 2), 3);
    }
}
