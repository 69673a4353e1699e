//! Epsilon-greedy Q-learning agent
//!
//! The agent canonicalizes the board it is shown, looks up (and lazily
//! initializes) the values of the candidate moves, picks one, and remembers
//! the `(state, action)` pair until a reward arrives for it. Choosing a move
//! also rewards the previous pair with `alive`, bootstrapping from the
//! position the agent now faces.

use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    config::{ALPHA_EPSILON, Outcome, PolicyConfig, SHARED_TRAINING_ALPHA},
    value_table::SharedTable,
};
use crate::{
    Error, Result,
    identifiers::{ActionKey, Coord, StateKey},
    persist::{PendingUpdate, UpdateQueue},
    tictactoe::{
        Board, GameSpec, Symbol,
        symmetry::{self, KnownStates},
    },
};

/// Lifecycle of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// Not bound to a game
    Idle,
    /// Bound, no decision waiting for a reward
    AwaitingTurn,
    /// A `(state, action)` pair is waiting for a reward
    PendingEvaluation,
}

/// Record of one applied value update
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    pub state: StateKey,
    pub action: ActionKey,
    pub outcome: Outcome,
    pub reward: f64,
    pub previous: f64,
    pub value: f64,
    /// Set on the update that pushed `alpha` below the completion threshold
    pub training_complete: bool,
}

#[derive(Debug, Clone)]
struct PendingChoice {
    state: StateKey,
    action: ActionKey,
}

#[derive(Debug, Clone)]
struct Candidate {
    canonical: Coord,
    key: ActionKey,
    value: f64,
}

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// Quantize to three decimals, truncating toward zero.
pub fn truncate_to_thousandths(value: f64) -> f64 {
    (value * 1000.0).trunc() / 1000.0
}

/// Q-learning policy over a (possibly shared) value table.
///
/// Greedy selection returns the first candidate, in the order the options
/// were given, that holds the maximum value. When every candidate has the
/// same value, or the exploration draw falls below `discover`, the move is
/// drawn uniformly at random.
#[derive(Debug)]
pub struct QAgent {
    config: PolicyConfig,
    alpha: f64,
    decay: Option<f64>,
    table: SharedTable,
    updates: Option<UpdateQueue>,
    name: Option<String>,
    symbol: Option<Symbol>,
    pending: Option<PendingChoice>,
    last_chosen_value: f64,
    training_complete: bool,
    rng: StdRng,
    rng_seed: Option<u64>,
}

impl QAgent {
    /// Create an agent over `table`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if the config fails validation.
    pub fn new(config: PolicyConfig, table: SharedTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            alpha: config.alpha,
            decay: config.decay,
            config,
            table,
            updates: None,
            name: None,
            symbol: None,
            pending: None,
            last_chosen_value: 0.0,
            training_complete: false,
            rng: build_rng(None),
            rng_seed: None,
        })
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.rng_seed = Some(seed);
        self
    }

    /// Record every update for the shared store
    pub fn with_update_queue(mut self, queue: UpdateQueue) -> Self {
        self.updates = Some(queue);
        self
    }

    /// Bind to a game and take a mark.
    ///
    /// Agents feeding the shared store train with a fixed, smaller step size.
    pub fn start(&mut self, game: &GameSpec, symbol: Symbol) {
        self.name = Some(game.table_name());
        self.symbol = Some(symbol);
        self.pending = None;
        if self.updates.is_some() {
            self.alpha = SHARED_TRAINING_ALPHA;
            self.decay = None;
        }
    }

    /// Change the exploration probability mid-training.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] unless `discover` is in
    /// `[0, 1]`; the current value is kept.
    pub fn set_discover(&mut self, discover: f64) -> Result<()> {
        let config = self.config.clone().with_discover(discover);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Unbind from the game, dropping any pending decision
    pub fn stop(&mut self) {
        self.name = None;
        self.pending = None;
    }

    pub fn phase(&self) -> AgentPhase {
        match (&self.name, &self.pending) {
            (None, _) => AgentPhase::Idle,
            (Some(_), None) => AgentPhase::AwaitingTurn,
            (Some(_), Some(_)) => AgentPhase::PendingEvaluation,
        }
    }

    /// Table namespace of the bound game
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn symbol(&self) -> Option<Symbol> {
        self.symbol
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    pub fn is_training_complete(&self) -> bool {
        self.training_complete
    }

    /// Canonical `(state, action)` waiting for a reward
    pub fn last_decision(&self) -> Option<(&StateKey, &ActionKey)> {
        self.pending.as_ref().map(|p| (&p.state, &p.action))
    }

    /// Pick one of `options` (real-board action keys) for `board`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyOptions`] if `options` is empty
    /// - [`Error::InvalidAction`] / [`Error::ActionOutOfBounds`] for bad keys
    /// - [`Error::NotStarted`] if the agent has no mark yet
    pub fn choose(&mut self, board: &Board, options: &[ActionKey]) -> Result<ActionKey> {
        if options.is_empty() {
            return Err(Error::EmptyOptions);
        }
        let symbol = self.symbol.ok_or(Error::NotStarted)?;
        let size = board.size();
        let real_actions = options
            .iter()
            .map(|option| option.coord().and_then(|coord| coord.within(size)))
            .collect::<Result<Vec<_>>>()?;

        let (mutation, candidates) = {
            let mut table = self.table.lock();
            let mutation = symmetry::locate(board, &*table, symbol);
            let state = table.state_mut(&mutation.key);
            let candidates: Vec<Candidate> = real_actions
                .iter()
                .map(|&real| {
                    let canonical = mutation.mutate_action(real, false);
                    let key = canonical.key();
                    let value = *state.entry(key.clone()).or_insert(0.0);
                    Candidate {
                        canonical,
                        key,
                        value,
                    }
                })
                .collect();
            (mutation, candidates)
        };

        let chosen = candidates[self.select(&candidates)].clone();
        self.last_chosen_value = chosen.value;
        self.evaluate_last(Outcome::Alive, Some(board));

        self.pending = Some(PendingChoice {
            state: mutation.key.clone(),
            action: chosen.key,
        });
        Ok(mutation.mutate_action(chosen.canonical, true).key())
    }

    fn select(&mut self, candidates: &[Candidate]) -> usize {
        let (min, max) = candidates
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c.value), hi.max(c.value))
            });

        if min == max || self.rng.random::<f64>() < self.config.discover {
            self.rng.random_range(0..candidates.len())
        } else {
            candidates
                .iter()
                .position(|c| c.value == max)
                .unwrap_or_default()
        }
    }

    /// Apply the reward for `outcome` to the pending decision.
    ///
    /// `board` is the position reached after the decision; in discount mode
    /// its best known value is bootstrapped into the update. Returns `None`
    /// when there was nothing to update.
    pub fn evaluate_last(
        &mut self,
        outcome: Outcome,
        board: Option<&Board>,
    ) -> Option<ValueUpdate> {
        let Some(pending) = self.pending.clone() else {
            debug!("no pending decision to reward with '{outcome}'");
            return None;
        };
        let reward = self.config.rewards.get(outcome);

        let applied = {
            let mut table = self.table.lock();
            if !table.contains_state(pending.state.as_str()) {
                warn!(
                    "state {} vanished from the table before it was rewarded",
                    pending.state
                );
                None
            } else {
                let previous = table.get_or_init(&pending.state, &pending.action);
                let raw = match self.config.discount {
                    Some(discount) => {
                        let best_next = match (board, self.symbol) {
                            (Some(board), Some(symbol)) => {
                                let key = symmetry::locate(board, &*table, symbol).key;
                                table.best_value(key.as_str())
                            }
                            _ => 0.0,
                        };
                        (1.0 - discount) * previous + self.alpha * (reward + discount * best_next)
                    }
                    None => previous + self.alpha * (reward + self.last_chosen_value - previous),
                };
                let value = truncate_to_thousandths(raw);
                if value.is_finite() {
                    table.set(&pending.state, &pending.action, value);
                    Some((previous, value))
                } else {
                    warn!(
                        "discarding non-finite value for {} / {}",
                        pending.state, pending.action
                    );
                    None
                }
            }
        };

        if outcome.is_terminal() {
            self.pending = None;
        }
        let (previous, value) = applied?;

        if let Some(queue) = &self.updates {
            queue.push(PendingUpdate {
                name: self.name.clone().unwrap_or_default(),
                state_hash: pending.state.clone(),
                action_hash: pending.action.clone(),
                val: value,
                reward,
            });
        }

        if let Some(decay) = self.decay {
            self.alpha *= decay;
        }
        let just_completed = !self.training_complete && self.alpha < ALPHA_EPSILON;
        if just_completed {
            self.training_complete = true;
            info!(
                "training complete for {}: learning rate fell to {:e}",
                self.name.as_deref().unwrap_or("unbound agent"),
                self.alpha
            );
        }

        Some(ValueUpdate {
            state: pending.state,
            action: pending.action,
            outcome,
            reward,
            previous,
            value,
            training_complete: just_completed,
        })
    }

    /// Forget everything learned: clears the (shared) table and restores the
    /// initial learning rate.
    pub fn reset(&mut self) {
        self.table.lock().clear();
        self.pending = None;
        self.last_chosen_value = 0.0;
        self.training_complete = false;
        if self.updates.is_some() && self.name.is_some() {
            self.alpha = SHARED_TRAINING_ALPHA;
        } else {
            self.alpha = self.config.alpha;
            self.decay = self.config.decay;
        }
        self.rng = build_rng(self.rng_seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        q_learning::{Rewards, ValueTable},
        tictactoe::symmetry::hash_board,
    };

    fn keys(raw: &[&str]) -> Vec<ActionKey> {
        raw.iter().map(|s| ActionKey::from(*s)).collect()
    }

    fn started(config: PolicyConfig, table: SharedTable, seed: u64) -> QAgent {
        let mut agent = QAgent::new(config, table).unwrap().with_seed(seed);
        agent.start(&GameSpec::default(), Symbol::X);
        agent
    }

    fn single_step() -> PolicyConfig {
        PolicyConfig::default().without_discount().without_decay()
    }

    #[test]
    fn test_truncation_is_toward_zero() {
        assert_eq!(truncate_to_thousandths(1.23456), 1.234);
        assert_eq!(truncate_to_thousandths(-1.23456), -1.234);
        assert_eq!(truncate_to_thousandths(0.0009), 0.0);
        assert_eq!(truncate_to_thousandths(10.0), 10.0);
    }

    #[test]
    fn test_phases() {
        let mut agent = QAgent::new(single_step(), SharedTable::default()).unwrap();
        assert_eq!(agent.phase(), AgentPhase::Idle);
        agent.start(&GameSpec::default(), Symbol::X);
        assert_eq!(agent.phase(), AgentPhase::AwaitingTurn);

        let board = Board::empty(3).unwrap();
        assert!(agent.last_decision().is_none());
        agent.choose(&board, &keys(&["0|0"])).unwrap();
        assert_eq!(agent.phase(), AgentPhase::PendingEvaluation);
        let (state, action) = agent.last_decision().unwrap();
        assert_eq!(*state, "000000000");
        assert_eq!(*action, "0|0");

        agent.evaluate_last(Outcome::Cat, None);
        assert_eq!(agent.phase(), AgentPhase::AwaitingTurn);
        assert!(agent.last_decision().is_none());
        agent.stop();
        assert_eq!(agent.phase(), AgentPhase::Idle);
    }

    #[test]
    fn test_set_discover_switches_to_exploration() {
        let mut values = ValueTable::new();
        let key = hash_board(&Board::empty(3).unwrap(), Symbol::X);
        values.set(&key, &ActionKey::from("0|0"), 5.0);
        let mut agent = started(single_step(), SharedTable::new(values), 4);
        let board = Board::empty(3).unwrap();
        let options = keys(&["0|0", "1|1", "2|2"]);

        assert_eq!(agent.choose(&board, &options).unwrap(), "0|0");

        agent.set_discover(1.0).unwrap();
        let mut picks = std::collections::HashSet::new();
        for _ in 0..100 {
            agent.stop();
            agent.start(&GameSpec::default(), Symbol::X);
            picks.insert(agent.choose(&board, &options).unwrap());
        }
        assert_eq!(picks.len(), 3);

        assert!(matches!(
            agent.set_discover(1.5),
            Err(Error::InvalidConfiguration { .. })
        ));
        assert!(agent.set_discover(f64::NAN).is_err());
        assert_eq!(agent.config().discover, 1.0);
    }

    #[test]
    fn test_choose_rejects_empty_options() {
        let mut agent = started(single_step(), SharedTable::default(), 1);
        let board = Board::empty(3).unwrap();
        assert!(matches!(agent.choose(&board, &[]), Err(Error::EmptyOptions)));
    }

    #[test]
    fn test_choose_rejects_bad_action_keys() {
        let mut agent = started(single_step(), SharedTable::default(), 1);
        let board = Board::empty(3).unwrap();
        assert!(matches!(
            agent.choose(&board, &keys(&["1-1"])),
            Err(Error::InvalidAction { .. })
        ));
        assert!(matches!(
            agent.choose(&board, &keys(&["3|0"])),
            Err(Error::ActionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_choose_before_start_is_state_error() {
        let mut agent = QAgent::new(single_step(), SharedTable::default()).unwrap();
        let board = Board::empty(3).unwrap();
        let err = agent.choose(&board, &keys(&["0|0"])).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::State);
    }

    #[test]
    fn test_evaluate_before_choose_is_noop() {
        let mut agent = started(single_step(), SharedTable::default(), 1);
        assert!(agent.evaluate_last(Outcome::Win, None).is_none());
        assert!(agent.table().lock().is_empty());
    }

    #[test]
    fn test_choose_initializes_candidate_values() {
        let table = SharedTable::default();
        let mut agent = started(single_step(), table.clone(), 3);
        let board = Board::empty(3).unwrap();
        agent.choose(&board, &keys(&["0|0", "1|1", "2|2"])).unwrap();

        let table = table.lock();
        let state = table.state("000000000").unwrap();
        assert_eq!(state.len(), 3);
        assert!(state.values().all(|&v| v == 0.0));
    }

    #[test]
    fn test_greedy_pick_of_prepopulated_value() {
        let mut values = ValueTable::new();
        let empty = Board::empty(3).unwrap();
        let key = hash_board(&empty, Symbol::X);
        values.set(&key, &ActionKey::from("0|0"), 5.0);
        values.set(&key, &ActionKey::from("1|1"), 0.0);
        values.set(&key, &ActionKey::from("2|2"), 0.0);
        let table = SharedTable::new(values);

        for seed in 0..20 {
            let mut agent = started(single_step(), table.clone(), seed);
            let choice = agent.choose(&empty, &keys(&["0|0", "1|1", "2|2"])).unwrap();
            assert_eq!(choice, "0|0");
        }
    }

    #[test]
    fn test_greedy_tie_takes_first_maximum_in_option_order() {
        let mut values = ValueTable::new();
        let board = Board::parse("o../.../...").unwrap();
        let key = hash_board(&board, Symbol::X);
        values.set(&key, &ActionKey::from("1|0"), -1.0);
        values.set(&key, &ActionKey::from("2|0"), 3.0);
        values.set(&key, &ActionKey::from("0|1"), 3.0);
        let table = SharedTable::new(values);

        let mut agent = started(single_step(), table.clone(), 9);
        let choice = agent.choose(&board, &keys(&["1|0", "0|1", "2|0"])).unwrap();
        assert_eq!(choice, "0|1");

        let mut agent = started(single_step(), table, 9);
        let choice = agent.choose(&board, &keys(&["1|0", "2|0", "0|1"])).unwrap();
        assert_eq!(choice, "2|0");
    }

    #[test]
    fn test_win_update_single_step() {
        let config = single_step().with_alpha(1.0);
        let mut agent = started(config, SharedTable::default(), 5);
        let board = Board::empty(3).unwrap();
        let choice = agent.choose(&board, &keys(&["1|1"])).unwrap();
        assert_eq!(choice, "1|1");

        let update = agent.evaluate_last(Outcome::Win, None).unwrap();
        assert_eq!(update.previous, 0.0);
        assert_eq!(update.value, 10.0);
        assert_eq!(agent.table().lock().get("000000000", "1|1"), Some(10.0));
        assert_eq!(agent.phase(), AgentPhase::AwaitingTurn);
    }

    #[test]
    fn test_discount_update_bootstraps_from_next_state() {
        let config = PolicyConfig::default()
            .with_alpha(0.5)
            .with_discount(0.5)
            .without_decay()
            .with_rewards(Rewards {
                alive: 1.0,
                win: 10.0,
                lose: -100.0,
                cat: 0.0,
            });
        let table = SharedTable::default();
        let mut agent = started(config, table.clone(), 5);

        let first = Board::empty(3).unwrap();
        agent.choose(&first, &keys(&["1|1"])).unwrap();

        // Successor position already has a known best value of 4
        let next = Board::parse("o../.x./...").unwrap();
        let next_key = hash_board(&next, Symbol::X);
        table.lock().set(&next_key, &ActionKey::from("2|2"), 4.0);

        let update = agent.evaluate_last(Outcome::Alive, Some(&next)).unwrap();
        // (1 - 0.5) * 0 + 0.5 * (1 + 0.5 * 4) = 1.5
        assert_eq!(update.value, 1.5);
        assert_eq!(agent.phase(), AgentPhase::PendingEvaluation);
    }

    #[test]
    fn test_discount_update_without_board_uses_zero_successor() {
        let config = PolicyConfig::default()
            .with_alpha(1.0)
            .with_discount(0.2)
            .without_decay();
        let mut agent = started(config, SharedTable::default(), 5);
        agent
            .choose(&Board::empty(3).unwrap(), &keys(&["0|0"]))
            .unwrap();
        let update = agent.evaluate_last(Outcome::Lose, None).unwrap();
        assert_eq!(update.value, -1000.0);
    }

    #[test]
    fn test_choose_rewards_previous_decision_with_alive() {
        let table = SharedTable::default();
        let mut agent = started(single_step().with_alpha(0.5), table.clone(), 11);

        agent
            .choose(&Board::empty(3).unwrap(), &keys(&["1|1"]))
            .unwrap();
        let second = Board::parse("o../.x./...").unwrap();
        agent.choose(&second, &keys(&["2|2"])).unwrap();

        // 0 + 0.5 * (alive 1 + chosen 0 - 0) = 0.5
        assert_eq!(table.lock().get("000000000", "1|1"), Some(0.5));
    }

    #[test]
    fn test_decay_and_training_complete() {
        let config = single_step().with_alpha(1e-5).with_decay(0.01);
        let mut agent = started(config, SharedTable::default(), 2);
        agent
            .choose(&Board::empty(3).unwrap(), &keys(&["0|0"]))
            .unwrap();
        let update = agent.evaluate_last(Outcome::Cat, None).unwrap();
        assert!(update.training_complete);
        assert!(agent.is_training_complete());
        assert!((agent.alpha() - 1e-7).abs() < 1e-12);
    }

    #[test]
    fn test_updates_are_queued_when_persisting() {
        let queue = UpdateQueue::default();
        let mut agent = QAgent::new(single_step(), SharedTable::default())
            .unwrap()
            .with_seed(4)
            .with_update_queue(queue.clone());
        agent.start(&GameSpec::default(), Symbol::O);
        assert_eq!(agent.alpha(), SHARED_TRAINING_ALPHA);

        agent
            .choose(&Board::empty(3).unwrap(), &keys(&["2|1"]))
            .unwrap();
        agent.evaluate_last(Outcome::Win, None).unwrap();

        let batch = queue.drain();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "q_3_3");
        assert_eq!(batch[0].reward, 10.0);
        assert_eq!(batch[0].val, 3.0);
    }

    #[test]
    fn test_rotated_position_reuses_canonical_entry() {
        let table = SharedTable::default();
        let mut agent = started(single_step(), table.clone(), 8);

        // Opponent in the top-left corner; learn that 1|0 is good here
        let board = Board::parse("o../.../...").unwrap();
        agent.choose(&board, &keys(&["1|0"])).unwrap();
        agent.evaluate_last(Outcome::Win, None).unwrap();

        // Same position rotated a quarter turn: the corner is now top-right,
        // and the square matching 1|0 is 2|1
        let rotated = Board::parse("..o/.../...").unwrap();
        let choice = agent.choose(&rotated, &keys(&["0|1", "2|1", "1|2"])).unwrap();
        assert_eq!(choice, "2|1");
        assert_eq!(table.lock().len(), 1);
    }

    #[test]
    fn test_reset_clears_shared_table() {
        let table = SharedTable::default();
        let mut agent = started(single_step(), table.clone(), 8);
        agent
            .choose(&Board::empty(3).unwrap(), &keys(&["0|0"]))
            .unwrap();
        agent.reset();
        assert!(table.lock().is_empty());
        assert_eq!(agent.phase(), AgentPhase::AwaitingTurn);
    }
}
