use core::fmt;

/// The abstract betting actions a decision node can offer.
///
/// Raise actions carry no amount; the state computes each action's amount
/// when it recomputes the legal set, and applying the action forwards that
/// amount to the protocol engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbstractAction {
    /// Fold the hand.
    Fold,
    /// Check or match the current bet.
    Call,
    /// Raise by the live pot, clamped into the legal raise interval.
    BetPot,
    /// Raise to the all-in amount.
    AllIn,
    /// Raise by half the live pot.
    BetHalfPot,
    /// Raise by twice the live pot.
    BetDoublePot,
    /// The custom raise registered for the acting player's information
    /// state.
    OffAbstraction,
}

/// Character appended to the action sequence for a card deal.
pub const DEAL_CHAR: char = 'd';

impl AbstractAction {
    /// Every abstract action, in action-id order.
    pub const ALL: [AbstractAction; 7] = [
        AbstractAction::Fold,
        AbstractAction::Call,
        AbstractAction::BetPot,
        AbstractAction::AllIn,
        AbstractAction::BetHalfPot,
        AbstractAction::BetDoublePot,
        AbstractAction::OffAbstraction,
    ];

    /// Stable small integer id.
    pub fn index(self) -> usize {
        match self {
            AbstractAction::Fold => 0,
            AbstractAction::Call => 1,
            AbstractAction::BetPot => 2,
            AbstractAction::AllIn => 3,
            AbstractAction::BetHalfPot => 4,
            AbstractAction::BetDoublePot => 5,
            AbstractAction::OffAbstraction => 6,
        }
    }

    /// One fixed character per action, appended to the persistent action
    /// sequence.
    pub fn sequence_char(self) -> char {
        match self {
            AbstractAction::Fold => 'f',
            AbstractAction::Call => 'c',
            AbstractAction::BetPot => 'p',
            AbstractAction::AllIn => 'a',
            AbstractAction::BetHalfPot => 'h',
            AbstractAction::BetDoublePot => 't',
            AbstractAction::OffAbstraction => 'b',
        }
    }

    /// Whether the action is a raise of some size.
    pub fn is_raise(self) -> bool {
        !matches!(self, AbstractAction::Fold | AbstractAction::Call)
    }
}

impl fmt::Display for AbstractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbstractAction::Fold => "Fold",
            AbstractAction::Call => "CheckCall",
            AbstractAction::BetPot => "BetPot",
            AbstractAction::AllIn => "AllIn",
            AbstractAction::BetHalfPot => "BetHalfPot",
            AbstractAction::BetDoublePot => "BetDoublePot",
            AbstractAction::OffAbstraction => "OffAbstraction",
        };
        write!(f, "{name}")
    }
}

/// A small fixed-capacity set of abstract actions.
///
/// A `u16` bit per action id: O(1) membership and union, no allocation, and
/// cheap to copy into every recomputation of the legal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionSet {
    bits: u16,
}

impl ActionSet {
    /// Creates a new empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an action. Returns `true` if it was newly inserted.
    pub fn insert(&mut self, action: AbstractAction) -> bool {
        let mask = 1u16 << action.index();
        let was_present = (self.bits & mask) != 0;
        self.bits |= mask;
        !was_present
    }

    /// Whether the set contains `action`.
    pub fn contains(&self, action: AbstractAction) -> bool {
        (self.bits & (1u16 << action.index())) != 0
    }

    /// The union of two sets.
    pub fn union(&self, other: &ActionSet) -> ActionSet {
        ActionSet {
            bits: self.bits | other.bits,
        }
    }

    /// Number of actions in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// The actions present, in action-id order.
    pub fn iter(&self) -> impl Iterator<Item = AbstractAction> + '_ {
        AbstractAction::ALL
            .into_iter()
            .filter(|action| self.contains(*action))
    }
}

impl FromIterator<AbstractAction> for ActionSet {
    fn from_iter<I: IntoIterator<Item = AbstractAction>>(iter: I) -> Self {
        let mut set = ActionSet::new();
        for action in iter {
            set.insert(action);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = ActionSet::new();
        assert!(set.insert(AbstractAction::Fold));
        assert!(set.insert(AbstractAction::BetPot));
        assert!(!set.insert(AbstractAction::Fold));

        assert!(set.contains(AbstractAction::Fold));
        assert!(set.contains(AbstractAction::BetPot));
        assert!(!set.contains(AbstractAction::AllIn));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_union() {
        let a: ActionSet = [AbstractAction::Fold, AbstractAction::Call]
            .into_iter()
            .collect();
        let b: ActionSet = [AbstractAction::Call, AbstractAction::AllIn]
            .into_iter()
            .collect();
        let both = a.union(&b);
        assert_eq!(both.len(), 3);
        assert!(both.contains(AbstractAction::AllIn));
    }

    #[test]
    fn test_iter_is_in_id_order() {
        let set: ActionSet = [AbstractAction::OffAbstraction, AbstractAction::Fold]
            .into_iter()
            .collect();
        let actions: Vec<_> = set.iter().collect();
        assert_eq!(
            actions,
            vec![AbstractAction::Fold, AbstractAction::OffAbstraction]
        );
    }

    #[test]
    fn test_sequence_chars_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for action in AbstractAction::ALL {
            assert!(seen.insert(action.sequence_char()));
        }
        assert!(!seen.contains(&DEAL_CHAR));
    }
}
