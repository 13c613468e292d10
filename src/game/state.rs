use core::fmt;
use std::fmt::Write as _;

use rand::Rng;

use crate::abstraction::OffAbstractionTable;
use crate::core::{Card, CardSet};

use super::action::{AbstractAction, ActionSet, DEAL_CHAR};
use super::engine::{ProtocolAction, ProtocolEngine};
use super::errors::StateError;
use super::game::{BettingAbstraction, Game};

/// Numeric player id reported while cards remain to be dealt.
pub const CHANCE_PLAYER_ID: i32 = -1;
/// Numeric player id reported once the hand is over.
pub const TERMINAL_PLAYER_ID: i32 = -4;

/// What kind of node the state currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A card remains to be dealt.
    Chance,
    /// The player must act.
    Decision(usize),
    /// The hand is over: one player left, or showdown reached.
    Terminal,
}

/// Computed raise amounts for the currently enabled actions.
#[derive(Debug, Clone, Copy, Default)]
struct BetSizes {
    pot: i32,
    half_pot: i32,
    double_pot: i32,
    all_in: i32,
    off_abstraction: i32,
}

/// One state of an abstracted poker hand.
///
/// The state owns everything that changes during a hand (remaining deck,
/// hole and board card sets, the protocol engine, the action-sequence log,
/// and its private off-abstraction raise additions) and borrows its parent
/// [`Game`] for indexers and the shared tables, which it never mutates.
/// Cloning a state is cheap; parallel exploration clones before mutating.
#[derive(Clone)]
pub struct GameState<'a, E: ProtocolEngine> {
    game: &'a Game<E>,
    engine: E,
    deck: CardSet,
    hole_cards: Vec<CardSet>,
    board_cards: CardSet,
    node: NodeKind,
    possible: ActionSet,
    sizes: BetSizes,
    action_sequence: String,
    custom_raises: OffAbstractionTable,
}

impl<'a, E: ProtocolEngine> GameState<'a, E> {
    pub(super) fn new(game: &'a Game<E>, engine: E) -> Self {
        let spec = game.spec();
        let mut state = GameState {
            game,
            engine,
            deck: CardSet::deck(spec.num_suits, spec.num_ranks),
            hole_cards: vec![CardSet::new(); spec.num_players],
            board_cards: CardSet::new(),
            node: NodeKind::Chance,
            possible: ActionSet::new(),
            sizes: BetSizes::default(),
            action_sequence: String::new(),
            custom_raises: OffAbstractionTable::new(),
        };
        state.recompute();
        state
    }

    pub fn game(&self) -> &'a Game<E> {
        self.game
    }

    pub fn node(&self) -> NodeKind {
        self.node
    }

    pub fn is_terminal(&self) -> bool {
        self.node == NodeKind::Terminal
    }

    pub fn is_chance_node(&self) -> bool {
        self.node == NodeKind::Chance
    }

    /// The acting player, or [`CHANCE_PLAYER_ID`] / [`TERMINAL_PLAYER_ID`].
    pub fn current_player(&self) -> i32 {
        match self.node {
            NodeKind::Chance => CHANCE_PLAYER_ID,
            NodeKind::Terminal => TERMINAL_PLAYER_ID,
            NodeKind::Decision(player) => player as i32,
        }
    }

    /// The full action-sequence log, one character per deal or action.
    pub fn action_sequence(&self) -> &str {
        &self.action_sequence
    }

    /// The player's hole cards dealt so far.
    pub fn hole_cards(&self, player: usize) -> CardSet {
        self.hole_cards[player]
    }

    /// The board cards dealt so far.
    pub fn board_cards(&self) -> CardSet {
        self.board_cards
    }

    /// The cards not yet dealt.
    pub fn deck(&self) -> CardSet {
        self.deck
    }

    /// The currently enabled abstract actions.
    pub fn possible_actions(&self) -> ActionSet {
        self.possible
    }

    /// Enabled abstract actions in action-id order. Empty at chance and
    /// terminal nodes; deals are enumerated by
    /// [`chance_outcomes`](Self::chance_outcomes).
    pub fn legal_actions(&self) -> Vec<AbstractAction> {
        self.possible.iter().collect()
    }

    /// The raise amounts of the enabled raise actions, in action-id order.
    pub fn legal_raise_amounts(&self) -> Vec<i32> {
        self.possible
            .iter()
            .filter(|action| action.is_raise())
            .map(|action| self.raise_amount(action))
            .collect()
    }

    /// Every dealable card with its uniform probability.
    ///
    /// # Panics
    ///
    /// Panics unless the state is a chance node.
    pub fn chance_outcomes(&self) -> Vec<(Card, f64)> {
        assert!(self.is_chance_node(), "not a chance node");
        let p = 1.0 / self.deck.len() as f64;
        self.deck.iter().map(|card| (card, p)).collect()
    }

    /// Deal `card`: remove it from the deck and give it to the first player
    /// still missing hole cards, else to the board.
    ///
    /// # Panics
    ///
    /// Panics unless the state is a chance node holding `card`.
    pub fn apply_deal(&mut self, card: Card) {
        assert!(self.is_chance_node(), "not a chance node");
        assert!(self.deck.contains(card), "card {card} is not in the deck");
        self.deck.remove(card);
        self.action_sequence.push(DEAL_CHAR);

        let spec = self.game.spec();
        for hole in self.hole_cards.iter_mut() {
            if hole.len() < spec.num_hole_cards {
                hole.insert(card);
                self.recompute();
                return;
            }
        }
        debug_assert!(self.board_cards.len() < self.board_cards_required());
        self.board_cards.insert(card);
        self.recompute();
    }

    /// Deal a uniformly random card from the remaining deck.
    pub fn deal_random<R: Rng>(&mut self, rng: &mut R) -> Card {
        assert!(self.is_chance_node(), "not a chance node");
        let nth = rng.gen_range(0..self.deck.len());
        let card = self
            .deck
            .iter()
            .nth(nth)
            .expect("deck has at least one card");
        self.apply_deal(card);
        card
    }

    /// Apply an enabled abstract action: log its character, forward the
    /// monetary effect to the protocol engine, and recompute the node.
    ///
    /// # Panics
    ///
    /// Panics unless the state is a decision node with `action` enabled.
    pub fn apply_action(&mut self, action: AbstractAction) {
        assert!(
            matches!(self.node, NodeKind::Decision(_)),
            "not a decision node"
        );
        assert!(
            self.possible.contains(action),
            "action {action} is not currently enabled"
        );
        self.action_sequence.push(action.sequence_char());
        let raw = match action {
            AbstractAction::Fold => ProtocolAction::Fold,
            AbstractAction::Call => ProtocolAction::Call,
            _ => ProtocolAction::Raise(self.raise_amount(action)),
        };
        tracing::trace!(?raw, sequence = %self.action_sequence, "applying action");
        self.engine.apply_action(raw);
        self.recompute();
    }

    /// Net chips won or lost by each player; all zeros before the terminal
    /// node. Terminal returns always sum to zero.
    pub fn returns(&self) -> Vec<f64> {
        if !self.is_terminal() {
            return vec![0.0; self.game.num_players()];
        }
        (0..self.game.num_players())
            .map(|player| self.player_reward(player))
            .collect()
    }

    /// Net chips won or lost by `player` relative to their starting stack.
    pub fn player_reward(&self, player: usize) -> f64 {
        assert!(player < self.game.num_players(), "player {player} out of range");
        self.engine
            .value_of_state(&self.hole_cards, self.board_cards, player)
    }

    /// The abstracted information-state identity visible to `player`:
    /// round, player to act, pot, per-player money, the cluster bucket of
    /// the player's canonical hand, and the per-round betting sequences.
    ///
    /// The canonical hand index is computed only once the player's hole
    /// cards are complete and the board is empty or fully dealt for the
    /// round; otherwise bucket lookup sees index 0.
    pub fn information_state_string(&self, player: usize) -> String {
        assert!(player < self.game.num_players(), "player {player} out of range");
        let round = self.engine.round();
        let pot = self.pot();
        let money = (0..self.game.num_players())
            .map(|p| self.engine.money(p).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let sequences = (0..=round)
            .map(|r| self.engine.betting_sequence(r))
            .collect::<Vec<_>>()
            .join("|");

        let cluster = self.game.cluster(round + 1, self.cards_index(player));
        format!(
            "[Round {}][Player: {}][Pot: {}][Money: {}][InfoAbs: {}][Sequences: {}]",
            round,
            self.current_player(),
            pot,
            money,
            cluster,
            sequences
        )
    }

    /// The public observation visible to `player`: round, player to act,
    /// pot, per-player money, the player's private cards, and each player's
    /// pot contribution.
    pub fn observation_string(&self, player: usize) -> String {
        assert!(player < self.game.num_players(), "player {player} out of range");
        let mut result = format!(
            "[Round {}][Player: {}][Pot: {}][Money:",
            self.engine.round(),
            self.current_player(),
            self.pot()
        );
        for p in 0..self.game.num_players() {
            let _ = write!(result, " {}", self.engine.money(p));
        }
        let _ = write!(result, "[Private: {}]", self.hole_cards[player]);
        result.push_str("[Ante:");
        for p in 0..self.game.num_players() {
            let _ = write!(result, " {}", self.engine.spent(p));
        }
        result.push(']');
        result
    }

    /// The information-state tensor: player one-hot, private card bits,
    /// board card bits, then two bits per action-sequence character
    /// (deal `00`, call `10`, raise `01`, fold `11`).
    pub fn information_state_tensor(&self, player: usize) -> Vec<f64> {
        assert!(player < self.game.num_players(), "player {player} out of range");
        let spec = self.game.spec();
        let mut values = vec![0.0; self.game.information_state_tensor_shape()[0]];

        values[player] = 1.0;
        let mut offset = self.game.num_players();

        let full_deck = CardSet::deck(spec.num_suits, spec.num_ranks);
        for (i, card) in full_deck.iter().enumerate() {
            if self.hole_cards[player].contains(card) {
                values[offset + i] = 1.0;
            }
        }
        offset += full_deck.len();
        for (i, card) in full_deck.iter().enumerate() {
            if self.board_cards.contains(card) {
                values[offset + i] = 1.0;
            }
        }
        offset += full_deck.len();

        assert!(
            self.action_sequence.len() < self.game.max_game_length(),
            "action sequence exceeds the game-length bound"
        );
        for (i, ch) in self.action_sequence.chars().enumerate() {
            let (first, second) = match ch {
                'c' => (1.0, 0.0),
                'p' | 'a' | 'h' | 't' | 'b' => (0.0, 1.0),
                'f' => (1.0, 1.0),
                _ => (0.0, 0.0),
            };
            values[offset + 2 * i] = first;
            values[offset + 2 * i + 1] = second;
        }
        values
    }

    /// The observation tensor: player one-hot, private card bits, board
    /// card bits, then each player's pot contribution.
    pub fn observation_tensor(&self, player: usize) -> Vec<f64> {
        assert!(player < self.game.num_players(), "player {player} out of range");
        let spec = self.game.spec();
        let mut values = vec![0.0; self.game.observation_tensor_shape()[0]];

        values[player] = 1.0;
        let mut offset = self.game.num_players();

        let full_deck = CardSet::deck(spec.num_suits, spec.num_ranks);
        for (i, card) in full_deck.iter().enumerate() {
            if self.hole_cards[player].contains(card) {
                values[offset + i] = 1.0;
            }
        }
        offset += full_deck.len();
        for (i, card) in full_deck.iter().enumerate() {
            if self.board_cards.contains(card) {
                values[offset + i] = 1.0;
            }
        }
        offset += full_deck.len();

        for p in 0..self.game.num_players() {
            values[offset + p] = f64::from(self.engine.spent(p));
        }
        values
    }

    /// Human-readable rendering of one action.
    pub fn action_to_string(&self, action: AbstractAction) -> String {
        let player = self.current_player();
        match action {
            AbstractAction::Fold => format!("player={player} move=f"),
            AbstractAction::Call => format!("player={player} move=c"),
            _ => format!(
                "player={player} move=r money={}",
                self.raise_amount(action)
            ),
        }
    }

    /// Human-readable rendering of a deal.
    pub fn deal_to_string(&self, card: Card) -> String {
        format!("player=chance move=d card={card}")
    }

    /// Register a custom raise amount for an information-state string, to
    /// be offered as the off-abstraction action whenever that information
    /// state recurs with the amount inside the legal raise interval.
    ///
    /// Registration is write-once per state lifetime: a second registration
    /// for the same string fails and the first amount is retained.
    pub fn register_custom_raise(
        &mut self,
        info_state: impl Into<String>,
        amount: i32,
    ) -> Result<(), StateError> {
        self.custom_raises.register(info_state.into(), amount)?;
        // The acting player may have just gained an action.
        if matches!(self.node, NodeKind::Decision(_)) {
            self.recompute();
        }
        Ok(())
    }

    /// The custom raise registered for `info_state`, this state's private
    /// additions shadowing the game's shared table.
    pub fn custom_raise(&self, info_state: &str) -> Option<i32> {
        self.custom_raises
            .get(info_state)
            .or_else(|| self.game.shared_custom_raises().get(info_state))
    }

    /// The live pot: the largest spend so far from every non-folded player.
    pub fn pot(&self) -> i32 {
        self.engine.max_spend()
            * (self.game.num_players() - self.engine.num_folded()) as i32
    }

    fn raise_amount(&self, action: AbstractAction) -> i32 {
        match action {
            AbstractAction::BetPot => self.sizes.pot,
            AbstractAction::AllIn => self.sizes.all_in,
            AbstractAction::BetHalfPot => self.sizes.half_pot,
            AbstractAction::BetDoublePot => self.sizes.double_pot,
            AbstractAction::OffAbstraction => self.sizes.off_abstraction,
            _ => 0,
        }
    }

    fn board_cards_required(&self) -> usize {
        self.game.spec().board_cards_required(self.engine.round())
    }

    /// Canonical index of `player`'s hole+board cards, or the sentinel 0
    /// while the cards don't identify a full round.
    fn cards_index(&self, player: usize) -> u64 {
        let spec = self.game.spec();
        let hole = &self.hole_cards[player];
        let board_len = self.board_cards.len();
        let total = hole.len() + board_len;
        let round = self.engine.round();
        if hole.len() == spec.num_hole_cards
            && (board_len == 0 || board_len == self.board_cards_required())
            && self.game.is_index_boundary(round + 1, total)
        {
            let cards = format!("{}{}", hole, self.board_cards);
            self.game.index_hand(round + 1, &cards)
        } else {
            0
        }
    }

    /// Recompute the node type, the enabled action set, and every action's
    /// bet size. Run after every mutation.
    fn recompute(&mut self) {
        self.possible = ActionSet::new();
        self.sizes = BetSizes::default();
        let spec = self.game.spec();

        if self.engine.is_finished() {
            if self.engine.num_folded() >= spec.num_players - 1 {
                // All players except one have folded.
                self.node = NodeKind::Terminal;
            } else if self.board_cards.len() < self.board_cards_required() {
                // Betting is over but the board must still run out.
                self.node = NodeKind::Chance;
            } else {
                // Showdown.
                self.node = NodeKind::Terminal;
            }
            return;
        }

        // Players are dealt in order, so the last player's count is the
        // lowest.
        if self.hole_cards[spec.num_players - 1].len() < spec.num_hole_cards {
            self.node = NodeKind::Chance;
            return;
        }
        if self.board_cards.len() < self.board_cards_required() {
            self.node = NodeKind::Chance;
            return;
        }

        let player = self.engine.current_player();
        self.node = NodeKind::Decision(player);

        if self.engine.is_valid_action(ProtocolAction::Fold) {
            self.possible.insert(AbstractAction::Fold);
        }
        if self.engine.is_valid_action(ProtocolAction::Call) {
            self.possible.insert(AbstractAction::Call);
        }

        let bounds = self.engine.raise_bounds();
        if self.game.betting_abstraction() == BettingAbstraction::FC {
            return;
        }
        if let Some((min_bet, all_in)) = bounds {
            // A pot-sized bet, clamped into the legal interval, is always
            // available when raising is.
            self.possible.insert(AbstractAction::BetPot);
            self.sizes.all_in = all_in;
            if spec.limit {
                // The engine's raise schedule fixes the size.
                self.sizes.pot = 0;
            } else {
                let current_pot = self.pot();
                let pot = current_pot.max(min_bet).min(all_in);
                self.sizes.pot = pot;
                if all_in > pot {
                    self.possible.insert(AbstractAction::AllIn);
                }

                let half_pot = self.engine.max_spend() + current_pot / 2;
                self.sizes.half_pot = half_pot;
                if half_pot >= min_bet && half_pot < all_in {
                    self.possible.insert(AbstractAction::BetHalfPot);
                }

                let double_pot = self.engine.max_spend() + 2 * current_pot;
                self.sizes.double_pot = double_pot;
                if double_pot >= min_bet && double_pot < all_in {
                    self.possible.insert(AbstractAction::BetDoublePot);
                }

                let info_state = self.information_state_string(player);
                if let Some(raise) = self.custom_raise(&info_state) {
                    self.sizes.off_abstraction = raise;
                    if raise >= min_bet && raise < all_in {
                        self.possible.insert(AbstractAction::OffAbstraction);
                    }
                }
            }
        }
    }
}

impl<E: ProtocolEngine> fmt::Display for GameState<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.game.betting_abstraction())?;
        for (p, hole) in self.hole_cards.iter().enumerate() {
            writeln!(f, "P{p} Cards: {hole}")?;
        }
        writeln!(f, "BoardCards {}", self.board_cards)?;
        if self.is_chance_node() {
            writeln!(f, "PossibleCardsToDeal {}", self.deck)?;
        }
        if self.is_terminal() {
            for p in 0..self.game.num_players() {
                writeln!(f, "P{p} Reward: {}", self.player_reward(p))?;
            }
        }
        match self.node {
            NodeKind::Chance => writeln!(f, "Node type?: Chance node")?,
            NodeKind::Terminal => writeln!(f, "Node type?: Terminal Node!")?,
            NodeKind::Decision(p) => writeln!(f, "Node type?: Player node for player {p}")?,
        }
        write!(f, "PossibleActions ({}): [", self.possible.len())?;
        for action in self.possible.iter() {
            write!(f, " {action} ")?;
        }
        writeln!(f, "]")?;
        writeln!(f, "Round: {}", self.engine.round())?;
        writeln!(f, "Action Sequence: {}", self.action_sequence)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::abstraction::OffAbstractionTable;
    use crate::core::parse_cards;
    use crate::game::test_util::TestEngine;
    use crate::game::{Game, GameSpec};

    use super::*;

    fn heads_up_spec() -> GameSpec {
        let mut spec = GameSpec::holdem_no_limit(2, 1200, 100);
        spec.blinds = vec![50, 100];
        spec
    }

    fn game_for(spec: GameSpec) -> Game<TestEngine> {
        Game::builder()
            .engine(TestEngine::new(&spec))
            .spec(spec)
            .build()
            .unwrap()
    }

    fn heads_up_game() -> Game<TestEngine> {
        game_for(heads_up_spec())
    }

    fn deal(state: &mut GameState<'_, TestEngine>, cards: &str) {
        for card in parse_cards(cards).unwrap() {
            state.apply_deal(card);
        }
    }

    #[test]
    fn test_fresh_hand_is_chance() {
        let game = heads_up_game();
        let state = game.new_initial_state();
        assert!(state.is_chance_node());
        assert_eq!(state.current_player(), CHANCE_PLAYER_ID);
        assert!(state.legal_actions().is_empty());

        let outcomes = state.chance_outcomes();
        assert_eq!(outcomes.len(), 52);
        let total: f64 = outcomes.iter().map(|(_, p)| p).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hole_cards_deal_to_first_missing_player() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        assert_eq!(state.hole_cards(0).to_string(), "5s9s");
        assert_eq!(state.hole_cards(1).to_string(), "KhAh");
        assert_eq!(state.deck().len(), 48);
        assert_eq!(state.action_sequence(), "dddd");
    }

    #[test]
    fn test_action_menu_after_deal() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        assert_eq!(state.node(), NodeKind::Decision(0));
        assert_eq!(state.current_player(), 0);

        let legal = state.legal_actions();
        assert_eq!(
            legal,
            vec![
                AbstractAction::Fold,
                AbstractAction::Call,
                AbstractAction::BetPot,
                AbstractAction::AllIn,
                AbstractAction::BetHalfPot,
                AbstractAction::BetDoublePot,
            ]
        );
        // Pot bet 200, all-in 1200, half-pot 200, double-pot 500.
        assert_eq!(state.legal_raise_amounts(), vec![200, 1200, 200, 500]);
    }

    #[test]
    fn test_all_in_enabled_only_above_pot_bet() {
        // With stacks equal to the pot bet, the all-in amount does not
        // strictly exceed it and every other raise falls outside the
        // interval.
        let mut spec = heads_up_spec();
        spec.stacks = vec![200, 200];
        let game = game_for(spec);
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        let legal = state.legal_actions();
        assert!(legal.contains(&AbstractAction::BetPot));
        assert!(!legal.contains(&AbstractAction::AllIn));
        assert!(!legal.contains(&AbstractAction::BetHalfPot));
        assert!(!legal.contains(&AbstractAction::BetDoublePot));
        assert_eq!(state.legal_raise_amounts(), vec![200]);
    }

    #[test]
    fn test_fold_ends_hand_with_zero_sum_returns() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        state.apply_action(AbstractAction::Fold);

        assert!(state.is_terminal());
        assert_eq!(state.current_player(), TERMINAL_PLAYER_ID);
        let returns = state.returns();
        assert_eq!(returns, vec![-50.0, 50.0]);
        assert_abs_diff_eq!(returns.iter().sum::<f64>(), 0.0);
    }

    #[test_log::test]
    fn test_check_down_to_showdown_split() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9h5d9c");
        state.apply_action(AbstractAction::Call);
        state.apply_action(AbstractAction::Call);
        deal(&mut state, "2s3h7d");
        state.apply_action(AbstractAction::Call);
        state.apply_action(AbstractAction::Call);
        deal(&mut state, "Jc");
        state.apply_action(AbstractAction::Call);
        state.apply_action(AbstractAction::Call);
        deal(&mut state, "Qs");
        state.apply_action(AbstractAction::Call);
        state.apply_action(AbstractAction::Call);

        assert!(state.is_terminal());
        assert_eq!(state.returns(), vec![0.0, 0.0]);
        assert_eq!(state.action_sequence(), "ddddccdddccdccdcc");
    }

    #[test]
    fn test_showdown_winner_takes_pot() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "AsKs9c5d");
        for _ in 0..4 {
            state.apply_action(AbstractAction::Call);
            state.apply_action(AbstractAction::Call);
            if state.is_chance_node() {
                match state.board_cards().len() {
                    0 => deal(&mut state, "2s3h7d"),
                    3 => deal(&mut state, "Jc"),
                    _ => deal(&mut state, "Qs"),
                }
            }
        }
        assert!(state.is_terminal());
        assert_eq!(state.returns(), vec![100.0, -100.0]);
    }

    #[test_log::test]
    fn test_all_in_call_runs_out_the_board() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "AsKs9c5d");
        state.apply_action(AbstractAction::AllIn);
        assert_eq!(state.node(), NodeKind::Decision(1));
        // Facing an all-in there is nothing left to raise.
        assert_eq!(
            state.legal_actions(),
            vec![AbstractAction::Fold, AbstractAction::Call]
        );
        state.apply_action(AbstractAction::Call);

        // Betting is done but the board must still run out.
        assert!(state.is_chance_node());
        assert_eq!(state.chance_outcomes().len(), 48);
        deal(&mut state, "2s3h7dJcQs");

        assert!(state.is_terminal());
        assert_eq!(state.returns(), vec![1200.0, -1200.0]);
        assert_eq!(state.action_sequence(), "ddddacddddd");
    }

    #[test]
    fn test_custom_raise_registration_enables_action() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        let info = state.information_state_string(0);
        assert!(!state.legal_actions().contains(&AbstractAction::OffAbstraction));

        state.register_custom_raise(info.clone(), 300).unwrap();
        assert!(state.legal_actions().contains(&AbstractAction::OffAbstraction));
        assert_eq!(state.legal_raise_amounts(), vec![200, 1200, 200, 500, 300]);

        state.apply_action(AbstractAction::OffAbstraction);
        assert_eq!(state.pot(), 600);
        assert!(state.action_sequence().ends_with('b'));
    }

    #[test]
    fn test_custom_raise_is_write_once() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        let info = state.information_state_string(0);
        state.register_custom_raise(info.clone(), 300).unwrap();
        let err = state.register_custom_raise(info.clone(), 400).unwrap_err();
        assert!(matches!(err, StateError::DuplicateCustomRaise(_)));
        // First registration is retained.
        assert_eq!(state.custom_raise(&info), Some(300));
    }

    #[test]
    fn test_custom_raise_outside_interval_stays_disabled() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        let info = state.information_state_string(0);
        // Below the minimum raise of 200.
        state.register_custom_raise(info, 150).unwrap();
        assert!(!state.legal_actions().contains(&AbstractAction::OffAbstraction));
        assert_eq!(state.legal_raise_amounts(), vec![200, 1200, 200, 500]);
    }

    #[test]
    fn test_game_scope_custom_raises_are_shared() {
        let game = heads_up_game();
        let mut probe = game.new_initial_state();
        deal(&mut probe, "5s9sAhKh");
        let info = probe.information_state_string(0);

        let spec = heads_up_spec();
        let shared: OffAbstractionTable = vec![(info, 300)].into_iter().collect();
        let seeded = Game::builder()
            .engine(TestEngine::new(&spec))
            .spec(spec)
            .custom_raises(shared)
            .build()
            .unwrap();

        let mut state = seeded.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        assert!(state.legal_actions().contains(&AbstractAction::OffAbstraction));
    }

    #[test]
    fn test_information_state_string_format() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        let index = game.index_hand(1, "5s9s");
        let expected = format!(
            "[Round 0][Player: 0][Pot: 200][Money: 1150 1100][InfoAbs: {}][Sequences: ]",
            game.cluster(1, index)
        );
        assert_eq!(state.information_state_string(0), expected);
    }

    #[test]
    fn test_information_state_uses_sentinel_mid_deal() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9s");
        // Player 1 has no cards yet; the index sentinel is 0 and the node
        // is still chance.
        let info = state.information_state_string(1);
        assert!(info.starts_with("[Round 0][Player: -1]"), "{info}");
        assert!(info.contains("[InfoAbs: 0]"), "{info}");
    }

    #[test]
    fn test_observation_string_format() {
        let game = heads_up_game();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        assert_eq!(
            state.observation_string(0),
            "[Round 0][Player: 0][Pot: 200][Money: 1150 1100[Private: 5s9s][Ante: 50 100]"
        );
        assert_eq!(
            state.observation_string(1),
            "[Round 0][Player: 0][Pot: 200][Money: 1150 1100[Private: KhAh][Ante: 50 100]"
        );
    }

    #[test]
    fn test_fold_call_abstraction_offers_no_raises() {
        let spec = heads_up_spec();
        let game = Game::builder()
            .engine(TestEngine::new(&spec))
            .spec(spec)
            .betting_abstraction(BettingAbstraction::FC)
            .build()
            .unwrap();
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        assert_eq!(
            state.legal_actions(),
            vec![AbstractAction::Fold, AbstractAction::Call]
        );
    }

    #[test]
    fn test_limit_game_offers_plain_bet() {
        let mut spec = heads_up_spec();
        spec.limit = true;
        let game = game_for(spec);
        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");

        assert_eq!(
            state.legal_actions(),
            vec![
                AbstractAction::Fold,
                AbstractAction::Call,
                AbstractAction::BetPot
            ]
        );
        // The engine's raise schedule fixes the size.
        assert_eq!(state.legal_raise_amounts(), vec![0]);
        state.apply_action(AbstractAction::BetPot);
        assert_eq!(state.pot(), 400);
    }

    #[test]
    fn test_tensor_shapes_and_encoding() {
        let game = heads_up_game();
        assert_eq!(game.information_state_tensor_shape(), vec![2 + 104 + 52]);
        assert_eq!(game.observation_tensor_shape(), vec![108]);

        let mut state = game.new_initial_state();
        deal(&mut state, "5s9sAhKh");
        state.apply_action(AbstractAction::Call);

        let info = state.information_state_tensor(0);
        assert_eq!(info.len(), 158);
        assert_eq!(info[0], 1.0);
        assert_eq!(info[1], 0.0);
        // 5s has card id 12, 9s id 28.
        assert_eq!(info[2 + 12], 1.0);
        assert_eq!(info[2 + 28], 1.0);
        // Sequence "ddddc": four deals then a call encoded 10.
        let seq = 2 + 104;
        assert_eq!(&info[seq..seq + 10], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let obs = state.observation_tensor(1);
        assert_eq!(obs.len(), 108);
        assert_eq!(obs[1], 1.0);
        // Pot contributions close the tensor.
        assert_eq!(&obs[106..], &[100.0, 100.0]);
    }

    #[test_log::test]
    fn test_random_playthroughs_are_zero_sum() {
        let game = heads_up_game();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..25 {
            let mut state = game.new_initial_state();
            let mut guard = 0;
            while !state.is_terminal() {
                guard += 1;
                assert!(guard < 500, "playthrough did not terminate");
                if state.is_chance_node() {
                    state.deal_random(&mut rng);
                } else {
                    let legal = state.legal_actions();
                    state.apply_action(legal[rng.gen_range(0..legal.len())]);
                }
            }
            let returns = state.returns();
            assert_abs_diff_eq!(returns.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_display_smoke() {
        let game = heads_up_game();
        let state = game.new_initial_state();
        let rendered = state.to_string();
        assert!(rendered.contains("Node type?: Chance node"));
        assert!(rendered.contains("BettingAbstraction: FCPA"));
    }
}
