//! A small in-crate protocol engine for exercising the state machine.
//!
//! `TestEngine` implements enough of a betting protocol to drive every node
//! type: blinds, check/call/fold, raise-to semantics with a minimum-raise
//! rule, round advancement, all-in run-outs, and fold/showdown settlement
//! with a simple high-card ranking. It is a test double, not a rules
//! engine.

use crate::core::CardSet;

use super::engine::{GameSpec, ProtocolAction, ProtocolEngine};

#[derive(Debug, Clone)]
pub struct TestEngine {
    num_players: usize,
    num_rounds: usize,
    limit: bool,
    stacks: Vec<i32>,
    raise_size: i32,
    min_raise_base: i32,
    max_raises_per_round: u8,
    first_player: Vec<usize>,

    spent: Vec<i32>,
    folded: Vec<bool>,
    pending: Vec<bool>,
    round: usize,
    finished: bool,
    acting: usize,
    last_raise_delta: i32,
    raises_this_round: u8,
    sequences: Vec<String>,
}

impl TestEngine {
    /// An engine at the start of a hand, blinds posted.
    pub fn new(spec: &GameSpec) -> Self {
        let num_players = spec.num_players;
        let min_raise_base = spec.blinds.iter().copied().max().unwrap_or(0).max(1);
        let spent: Vec<i32> = (0..num_players)
            .map(|p| spec.blinds[p].min(spec.stacks[p]))
            .collect();
        let mut engine = TestEngine {
            num_players,
            num_rounds: spec.num_rounds(),
            limit: spec.limit,
            stacks: spec.stacks.clone(),
            raise_size: min_raise_base,
            min_raise_base,
            max_raises_per_round: u8::MAX,
            first_player: vec![0; spec.num_rounds()],
            spent,
            folded: vec![false; num_players],
            pending: vec![false; num_players],
            round: 0,
            finished: false,
            acting: 0,
            last_raise_delta: min_raise_base,
            raises_this_round: 0,
            sequences: vec![String::new(); spec.num_rounds()],
        };
        engine.reset_pending();
        engine.acting = engine.next_pending_from(engine.first_player[0]);
        engine
    }

    /// Override the first player to act per round.
    pub fn with_first_players(mut self, first_player: Vec<usize>) -> Self {
        assert_eq!(first_player.len(), self.num_rounds);
        self.first_player = first_player;
        self.acting = self.next_pending_from(self.first_player[0]);
        self
    }

    /// Cap the raises allowed per round.
    pub fn with_max_raises(mut self, max: u8) -> Self {
        self.max_raises_per_round = max;
        self
    }

    fn can_act(&self, player: usize) -> bool {
        !self.folded[player] && self.spent[player] < self.stacks[player]
    }

    fn reset_pending(&mut self) {
        for player in 0..self.num_players {
            self.pending[player] = self.can_act(player);
        }
    }

    fn next_pending_from(&self, start: usize) -> usize {
        (0..self.num_players)
            .map(|i| (start + i) % self.num_players)
            .find(|&p| self.pending[p])
            .unwrap_or(start)
    }

    fn advance(&mut self) {
        if self.folded.iter().filter(|&&f| !f).count() <= 1 {
            self.finished = true;
            return;
        }
        if self.pending.iter().any(|&p| p) {
            self.acting = self.next_pending_from((self.acting + 1) % self.num_players);
            return;
        }
        // Round closed; later rounds with no one able to act are skipped so
        // an all-in hand runs straight out to showdown.
        loop {
            if self.round + 1 >= self.num_rounds {
                self.finished = true;
                return;
            }
            self.round += 1;
            self.last_raise_delta = self.min_raise_base;
            self.raises_this_round = 0;
            self.reset_pending();
            if self.pending.iter().any(|&p| p) {
                self.acting = self.next_pending_from(self.first_player[self.round]);
                return;
            }
        }
    }

    /// Descending hole-plus-board ranks; lexicographic comparison gives a
    /// deterministic high-card ordering.
    fn showdown_score(hole: CardSet, board: CardSet) -> Vec<u8> {
        let mut ranks: Vec<u8> = hole.iter().chain(board.iter()).map(|c| c.rank()).collect();
        ranks.sort_unstable_by(|a, b| b.cmp(a));
        ranks
    }
}

impl ProtocolEngine for TestEngine {
    fn is_valid_action(&self, action: ProtocolAction) -> bool {
        if self.finished {
            return false;
        }
        match action {
            ProtocolAction::Fold => self.spent[self.acting] < self.max_spend(),
            ProtocolAction::Call => true,
            ProtocolAction::Raise(amount) => self
                .raise_bounds()
                .is_some_and(|(min, max)| amount >= min && amount <= max),
        }
    }

    fn raise_bounds(&self) -> Option<(i32, i32)> {
        if self.finished || self.raises_this_round >= self.max_raises_per_round {
            return None;
        }
        let max_spend = self.max_spend();
        let cap = self.stacks[self.acting];
        if cap <= max_spend {
            return None;
        }
        if self.limit {
            let target = (max_spend + self.raise_size).min(cap);
            Some((target, target))
        } else {
            let min = (max_spend + self.last_raise_delta).min(cap);
            Some((min, cap))
        }
    }

    fn apply_action(&mut self, action: ProtocolAction) {
        debug_assert!(!self.finished, "hand already finished");
        let max_spend = self.max_spend();
        match action {
            ProtocolAction::Fold => {
                self.sequences[self.round].push('f');
                self.folded[self.acting] = true;
                self.pending[self.acting] = false;
            }
            ProtocolAction::Call => {
                self.sequences[self.round].push('c');
                self.spent[self.acting] = max_spend.min(self.stacks[self.acting]);
                self.pending[self.acting] = false;
            }
            ProtocolAction::Raise(amount) => {
                let wanted = if self.limit {
                    max_spend + self.raise_size
                } else {
                    amount
                };
                let target = wanted.min(self.stacks[self.acting]);
                self.sequences[self.round].push('r');
                self.sequences[self.round].push_str(&target.to_string());
                let delta = target - max_spend;
                if delta > 0 {
                    self.last_raise_delta = delta;
                }
                self.spent[self.acting] = target;
                self.raises_this_round += 1;
                self.reset_pending();
                self.pending[self.acting] = false;
            }
        }
        self.advance();
    }

    fn current_player(&self) -> usize {
        self.acting
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn num_folded(&self) -> usize {
        self.folded.iter().filter(|&&f| f).count()
    }

    fn max_spend(&self) -> i32 {
        self.spent.iter().copied().max().unwrap_or(0)
    }

    fn money(&self, player: usize) -> i32 {
        self.stacks[player] - self.spent[player]
    }

    fn spent(&self, player: usize) -> i32 {
        self.spent[player]
    }

    fn round(&self) -> usize {
        self.round
    }

    fn betting_sequence(&self, round: usize) -> String {
        self.sequences[round].clone()
    }

    fn value_of_state(&self, hole_cards: &[CardSet], board: CardSet, player: usize) -> f64 {
        debug_assert!(self.finished, "hand not finished");
        let pot: i32 = self.spent.iter().sum();
        let live: Vec<usize> = (0..self.num_players).filter(|&p| !self.folded[p]).collect();

        let winners: Vec<usize> = if live.len() == 1 {
            live
        } else {
            let best = live
                .iter()
                .map(|&p| Self::showdown_score(hole_cards[p], board))
                .max()
                .expect("at least one live player");
            live.into_iter()
                .filter(|&p| Self::showdown_score(hole_cards[p], board) == best)
                .collect()
        };

        if winners.contains(&player) {
            f64::from(pot) / winners.len() as f64 - f64::from(self.spent[player])
        } else {
            -f64::from(self.spent[player])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heads_up() -> TestEngine {
        let mut spec = GameSpec::holdem_no_limit(2, 1200, 100);
        spec.blinds = vec![50, 100];
        TestEngine::new(&spec)
    }

    #[test]
    fn test_blinds_and_bounds() {
        let engine = heads_up();
        assert_eq!(engine.max_spend(), 100);
        assert_eq!(engine.money(0), 1150);
        assert_eq!(engine.money(1), 1100);
        assert_eq!(engine.current_player(), 0);
        assert!(engine.is_valid_action(ProtocolAction::Fold));
        assert_eq!(engine.raise_bounds(), Some((200, 1200)));
    }

    #[test]
    fn test_check_around_advances_round() {
        let mut engine = heads_up();
        engine.apply_action(ProtocolAction::Call);
        assert_eq!(engine.round(), 0);
        assert_eq!(engine.current_player(), 1);
        engine.apply_action(ProtocolAction::Call);
        assert_eq!(engine.round(), 1);
        assert!(!engine.is_finished());
        assert_eq!(engine.betting_sequence(0), "cc");
    }

    #[test]
    fn test_raise_reopens_action() {
        let mut engine = heads_up();
        engine.apply_action(ProtocolAction::Call);
        engine.apply_action(ProtocolAction::Raise(300));
        assert_eq!(engine.round(), 0);
        assert_eq!(engine.current_player(), 0);
        assert_eq!(engine.max_spend(), 300);
        // Minimum re-raise grew by the raise delta.
        assert_eq!(engine.raise_bounds(), Some((500, 1200)));
        assert_eq!(engine.betting_sequence(0), "ccr300");
    }

    #[test]
    fn test_fold_finishes_hand() {
        let mut engine = heads_up();
        engine.apply_action(ProtocolAction::Fold);
        assert!(engine.is_finished());
        assert_eq!(engine.num_folded(), 1);
        let hole = vec![CardSet::new(), CardSet::new()];
        assert_eq!(engine.value_of_state(&hole, CardSet::new(), 0), -50.0);
        assert_eq!(engine.value_of_state(&hole, CardSet::new(), 1), 50.0);
    }

    #[test]
    fn test_all_in_runs_out() {
        let mut engine = heads_up();
        engine.apply_action(ProtocolAction::Raise(1200));
        engine.apply_action(ProtocolAction::Call);
        assert!(engine.is_finished());
        // Round advanced to the final round so the board can run out.
        assert_eq!(engine.round(), 3);
    }

    #[test]
    fn test_showdown_split() {
        let mut engine = heads_up();
        // Check every street down.
        for _ in 0..4 {
            engine.apply_action(ProtocolAction::Call);
            engine.apply_action(ProtocolAction::Call);
        }
        assert!(engine.is_finished());
        let hole = vec!["9s5h".parse().unwrap(), "9c5d".parse().unwrap()];
        let board: CardSet = "2s3h7dJcQs".parse().unwrap();
        assert_eq!(engine.value_of_state(&hole, board, 0), 0.0);
        assert_eq!(engine.value_of_state(&hole, board, 1), 0.0);
    }
}
