use std::collections::BTreeMap;

use thiserror::Error;

/// Errors from registering off-abstraction raises.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum OffAbstractionError {
    #[error("a raise is already registered for information state {0:?}")]
    DuplicateRegistration(String),
}

/// Write-once mapping from information-state string to a custom raise
/// amount.
///
/// An information state may register exactly one raise for the table's
/// lifetime; re-registering fails and the first amount is retained. This
/// keeps an off-abstraction action from being silently redefined after it
/// has been offered.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OffAbstractionTable {
    raises: BTreeMap<String, i32>,
}

impl OffAbstractionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `info_state` has a registered raise.
    pub fn contains(&self, info_state: &str) -> bool {
        self.raises.contains_key(info_state)
    }

    /// The registered raise for `info_state`, if any.
    pub fn get(&self, info_state: &str) -> Option<i32> {
        self.raises.get(info_state).copied()
    }

    /// Register a raise. Fails on re-registration, keeping the first value.
    pub fn register(&mut self, info_state: String, raise: i32) -> Result<(), OffAbstractionError> {
        if self.raises.contains_key(&info_state) {
            return Err(OffAbstractionError::DuplicateRegistration(info_state));
        }
        self.raises.insert(info_state, raise);
        Ok(())
    }

    /// Number of registered raises.
    pub fn len(&self) -> usize {
        self.raises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raises.is_empty()
    }
}

impl FromIterator<(String, i32)> for OffAbstractionTable {
    /// Build a table from entries; later duplicates are dropped, keeping the
    /// first value.
    fn from_iter<I: IntoIterator<Item = (String, i32)>>(iter: I) -> Self {
        let mut table = OffAbstractionTable::new();
        for (info_state, raise) in iter {
            let _ = table.register(info_state, raise);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut table = OffAbstractionTable::new();
        assert!(!table.contains("state-a"));
        table.register("state-a".to_string(), 350).unwrap();
        assert!(table.contains("state-a"));
        assert_eq!(table.get("state-a"), Some(350));
        assert_eq!(table.get("state-b"), None);
    }

    #[test]
    fn test_write_once() {
        let mut table = OffAbstractionTable::new();
        table.register("state-a".to_string(), 350).unwrap();

        let err = table.register("state-a".to_string(), 500).unwrap_err();
        assert_eq!(
            err,
            OffAbstractionError::DuplicateRegistration("state-a".to_string())
        );
        // First registration is retained.
        assert_eq!(table.get("state-a"), Some(350));
    }

    #[test]
    fn test_from_iter_keeps_first() {
        let table: OffAbstractionTable = vec![
            ("a".to_string(), 100),
            ("b".to_string(), 200),
            ("a".to_string(), 300),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("a"), Some(100));
    }
}
