//! Game rules and the turn loop

use log::{debug, warn};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use super::{
    board::{Board, Cell, Symbol},
    lines::LineAnalyzer,
};
use crate::{Error, Result, identifiers::ActionKey, player::Player, q_learning::Outcome};

/// Grid size, winning streak length and gravity of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameSpec {
    pub grid: usize,
    pub streak: usize,
    /// Pieces fall to the lowest empty cell of their column
    pub gravity: bool,
}

impl Default for GameSpec {
    fn default() -> Self {
        Self {
            grid: 3,
            streak: 3,
            gravity: false,
        }
    }
}

impl GameSpec {
    /// # Errors
    ///
    /// Returns [`Error::InvalidGridSize`] or [`Error::InvalidStreak`].
    pub fn new(grid: usize, streak: usize) -> Result<Self> {
        let spec = Self {
            grid,
            streak,
            gravity: false,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn with_gravity(mut self, gravity: bool) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid < Board::MIN_SIZE {
            return Err(Error::InvalidGridSize { size: self.grid });
        }
        if self.streak < 2 || self.streak > self.grid {
            return Err(Error::InvalidStreak {
                streak: self.streak,
                grid: self.grid,
            });
        }
        Ok(())
    }

    /// Table namespace under the default `q` prefix
    pub fn table_name(&self) -> String {
        self.namespaced("q")
    }

    /// `"{prefix}_{grid}_{streak}"`
    pub fn namespaced(&self, prefix: &str) -> String {
        format!("{prefix}_{}_{}", self.grid, self.streak)
    }
}

/// Outcome of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameOutcome {
    Winner(Symbol),
    Cat,
}

impl GameOutcome {
    /// The outcome from the point of view of the player holding `symbol`
    pub fn outcome_for(self, symbol: Symbol) -> Outcome {
        match self {
            GameOutcome::Winner(winner) if winner == symbol => Outcome::Win,
            GameOutcome::Winner(_) => Outcome::Lose,
            GameOutcome::Cat => Outcome::Cat,
        }
    }
}

/// Evaluate a position: `Some` once the game is decided.
pub fn evaluate(board: &Board, streak: usize) -> Option<GameOutcome> {
    if let Some(winner) = LineAnalyzer::winner(board, streak) {
        Some(GameOutcome::Winner(winner))
    } else if board.is_full() {
        Some(GameOutcome::Cat)
    } else {
        None
    }
}

/// What a call to [`Game::turn`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    Moved(ActionKey),
    /// The current player is human; waiting for [`Game::select_square`]
    AwaitingHuman,
    Finished(GameOutcome),
}

/// Two players on one board.
///
/// Marks are dealt at random at every reset, and a random player opens.
#[derive(Debug)]
pub struct Game {
    spec: GameSpec,
    board: Board,
    players: [Player; 2],
    current: usize,
    outcome: Option<GameOutcome>,
    total_games: u64,
    rng: StdRng,
}

impl Game {
    /// # Errors
    ///
    /// Returns a configuration error if `spec` is invalid.
    pub fn new(spec: GameSpec, players: [Player; 2]) -> Result<Self> {
        spec.validate()?;
        let mut game = Self {
            board: Board::empty(spec.grid)?,
            spec,
            players,
            current: 0,
            outcome: None,
            total_games: 0,
            rng: StdRng::from_rng(&mut rand::rng()),
        };
        game.reset()?;
        Ok(game)
    }

    /// Reseed and redeal
    pub fn with_seed(mut self, seed: u64) -> Result<Self> {
        self.rng = StdRng::seed_from_u64(seed);
        self.reset()?;
        Ok(self)
    }

    /// Clear the board, deal marks and choose who opens.
    pub fn reset(&mut self) -> Result<()> {
        self.board = Board::empty(self.spec.grid)?;
        self.outcome = None;

        let first_is_x = self.rng.random_bool(0.5);
        let (a, b) = if first_is_x {
            (Symbol::X, Symbol::O)
        } else {
            (Symbol::O, Symbol::X)
        };
        self.players[0].start(&self.spec, a);
        self.players[1].start(&self.spec, b);
        self.current = self.rng.random_range(0..2);
        debug!(
            "new game: {} vs {}, {} opens",
            self.players[0], self.players[1], self.players[self.current]
        );
        Ok(())
    }

    pub fn spec(&self) -> &GameSpec {
        &self.spec
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player; 2] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player; 2] {
        &mut self.players
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Games finished since construction
    pub fn total_games(&self) -> u64 {
        self.total_games
    }

    /// Legal moves in the current position
    pub fn options(&self) -> Vec<ActionKey> {
        self.board.legal_actions(self.spec.gravity)
    }

    /// Let the current player move if it is a computer.
    pub fn turn(&mut self) -> Result<TurnResult> {
        if self.is_over() {
            return Err(Error::GameOver);
        }
        if self.players[self.current].is_human() {
            return Ok(TurnResult::AwaitingHuman);
        }

        let options = self.options();
        let player = &mut self.players[self.current];
        let action = match player.play(&self.board, &options, &mut self.rng)? {
            Some(action) => action,
            None => {
                warn!("{player} produced no move; playing a random option");
                options.choose(&mut self.rng).cloned().ok_or(Error::EmptyOptions)?
            }
        };
        self.apply(action)
    }

    /// Place the mark of the player at `seat` (0 or 1) on `action`.
    ///
    /// # Errors
    ///
    /// State errors when the game is over, it is not that player's turn, or
    /// the square is taken or not currently playable.
    pub fn select_square(&mut self, seat: usize, action: &ActionKey) -> Result<TurnResult> {
        if self.is_over() {
            return Err(Error::GameOver);
        }
        if seat != self.current {
            let player = self
                .players
                .get(seat)
                .map(|p| p.id().to_string())
                .unwrap_or_else(|| format!("seat {seat}"));
            return Err(Error::NotCurrentPlayer { player });
        }
        let coord = action.coord()?.within(self.spec.grid)?;
        if self.board.get(coord) != Some(Cell::Empty) {
            return Err(Error::SquareTaken {
                action: action.to_string(),
            });
        }
        if !self.options().contains(action) {
            return Err(Error::NotAnOption {
                action: action.to_string(),
            });
        }
        self.apply(action.clone())
    }

    fn apply(&mut self, action: ActionKey) -> Result<TurnResult> {
        let symbol = self.players[self.current]
            .symbol()
            .ok_or(Error::NotStarted)?;
        self.board.place(action.coord()?, symbol)?;

        if let Some(outcome) = evaluate(&self.board, self.spec.streak) {
            self.finish(outcome);
            return Ok(TurnResult::Finished(outcome));
        }
        self.current = 1 - self.current;
        Ok(TurnResult::Moved(action))
    }

    fn finish(&mut self, outcome: GameOutcome) {
        self.outcome = Some(outcome);
        self.total_games += 1;
        for player in &mut self.players {
            if let Some(symbol) = player.symbol() {
                player.on_game_over(outcome.outcome_for(symbol));
            }
        }
        debug!("game {} finished: {outcome:?} on {}", self.total_games, self.board);
    }

    /// Reset and play one game to the end without a human.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AwaitingHuman`] if a human seat comes up.
    pub fn play_episode(&mut self) -> Result<GameOutcome> {
        self.reset()?;
        loop {
            match self.turn()? {
                TurnResult::Moved(_) => {}
                TurnResult::Finished(outcome) => return Ok(outcome),
                TurnResult::AwaitingHuman => {
                    return Err(Error::AwaitingHuman {
                        player: self.current_player().id().to_string(),
                    });
                }
            }
        }
    }

    /// Unbind every agent
    pub fn stop(&mut self) {
        for player in &mut self.players {
            player.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn randoms() -> [Player; 2] {
        [Player::random(1), Player::random(2)]
    }

    fn current_seat(game: &Game) -> usize {
        let current = game.current_player().id();
        game.players().iter().position(|p| p.id() == current).unwrap()
    }

    #[test]
    fn test_spec_validation() {
        assert!(GameSpec::new(3, 3).is_ok());
        assert!(GameSpec::new(5, 4).is_ok());
        assert!(matches!(GameSpec::new(1, 1), Err(Error::InvalidGridSize { .. })));
        assert!(matches!(GameSpec::new(3, 4), Err(Error::InvalidStreak { .. })));
        assert!(matches!(GameSpec::new(3, 1), Err(Error::InvalidStreak { .. })));
    }

    #[test]
    fn test_table_name() {
        let spec = GameSpec::new(4, 3).unwrap();
        assert_eq!(spec.table_name(), "q_4_3");
        assert_eq!(spec.namespaced("local"), "local_4_3");
    }

    #[test]
    fn test_outcome_perspective() {
        let outcome = GameOutcome::Winner(Symbol::O);
        assert_eq!(outcome.outcome_for(Symbol::O), Outcome::Win);
        assert_eq!(outcome.outcome_for(Symbol::X), Outcome::Lose);
        assert_eq!(GameOutcome::Cat.outcome_for(Symbol::X), Outcome::Cat);
    }

    #[test]
    fn test_evaluate() {
        let won = Board::parse("xxx/oo./...").unwrap();
        assert_eq!(evaluate(&won, 3), Some(GameOutcome::Winner(Symbol::X)));
        let full = Board::parse("xox/xoo/oxx").unwrap();
        assert_eq!(evaluate(&full, 3), Some(GameOutcome::Cat));
        assert_eq!(evaluate(&Board::parse("x../.o./...").unwrap(), 3), None);
    }

    #[test]
    fn test_reset_deals_both_marks() {
        let game = Game::new(GameSpec::default(), randoms())
            .unwrap()
            .with_seed(3)
            .unwrap();
        let [a, b] = game.players();
        assert!(a.symbol().is_some());
        assert_ne!(a.symbol(), b.symbol());
    }

    #[test]
    fn test_random_episode_finishes_and_scores() {
        let mut game = Game::new(GameSpec::default(), randoms())
            .unwrap()
            .with_seed(7)
            .unwrap();
        for _ in 0..20 {
            let outcome = game.play_episode().unwrap();
            assert_eq!(game.outcome(), Some(outcome));
        }
        assert_eq!(game.total_games(), 20);
        let [a, b] = game.players();
        assert_eq!(a.total(), 20);
        assert_eq!(b.total(), 20);
        assert!(a.wins() + b.wins() <= 20);
    }

    #[test]
    fn test_human_seat_blocks_unattended_play() {
        let mut game =
            Game::new(GameSpec::default(), [Player::human(1), Player::human(2)]).unwrap();
        assert!(matches!(game.play_episode(), Err(Error::AwaitingHuman { .. })));
    }

    #[test]
    fn test_toggled_seats_play_unattended() {
        let mut game = Game::new(GameSpec::default(), [Player::human(1), Player::human(2)])
            .unwrap()
            .with_seed(4)
            .unwrap();
        for player in game.players_mut() {
            player.toggle_computer();
        }
        assert!(game.players().iter().all(|p| !p.is_human()));
        assert!(game.play_episode().is_ok());
    }

    #[test]
    fn test_select_square_validation() {
        let mut game = Game::new(GameSpec::default(), [Player::human(1), Player::human(2)])
            .unwrap()
            .with_seed(1)
            .unwrap();
        let seat = current_seat(&game);
        let other = 1 - seat;

        assert!(matches!(
            game.select_square(other, &ActionKey::from("0|0")),
            Err(Error::NotCurrentPlayer { .. })
        ));
        assert_eq!(
            game.select_square(seat, &ActionKey::from("0|0")).unwrap(),
            TurnResult::Moved(ActionKey::from("0|0"))
        );
        assert!(matches!(
            game.select_square(other, &ActionKey::from("0|0")),
            Err(Error::SquareTaken { .. })
        ));
        assert!(matches!(
            game.select_square(other, &ActionKey::from("5|0")),
            Err(Error::ActionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_gravity_rejects_floating_squares() {
        let spec = GameSpec::new(4, 3).unwrap().with_gravity(true);
        let mut game = Game::new(spec, [Player::human(1), Player::human(2)])
            .unwrap()
            .with_seed(2)
            .unwrap();
        let seat = current_seat(&game);
        assert!(matches!(
            game.select_square(seat, &ActionKey::from("0|0")),
            Err(Error::NotAnOption { .. })
        ));
        assert!(game.select_square(seat, &ActionKey::from("0|3")).is_ok());
    }

    #[test]
    fn test_turn_after_game_over() {
        let mut game = Game::new(GameSpec::default(), randoms())
            .unwrap()
            .with_seed(5)
            .unwrap();
        game.play_episode().unwrap();
        assert!(matches!(game.turn(), Err(Error::GameOver)));
    }
}
