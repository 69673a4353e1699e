//! Observer port - abstraction for training observation
//!
//! Observers are notified by the training pipeline so progress reporting
//! and metrics collection stay decoupled from the game loop.

use crate::{Result, tictactoe::GameOutcome};

/// Everything an observer learns about one finished game
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// Index of the game (0-based)
    pub game_num: usize,
    pub outcome: GameOutcome,
    /// Id of the winning player, `None` on a cat game
    pub winner: Option<String>,
    /// Squares filled when the game ended
    pub moves: usize,
}

/// Observer trait for monitoring training
///
/// # Event Sequence
///
/// 1. `on_training_start(total_games)` - once
/// 2. `on_game_end(summary)` - after every game
/// 3. `on_training_end()` - once, also after an early stop
///
/// # Examples
///
/// ```
/// use qtoe::ports::{Observer, observer::GameSummary};
///
/// struct CatCounter(usize);
///
/// impl Observer for CatCounter {
///     fn on_game_end(&mut self, summary: &GameSummary) -> qtoe::Result<()> {
///         if summary.winner.is_none() {
///             self.0 += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first game.
    fn on_training_start(&mut self, _total_games: usize) -> Result<()> {
        Ok(())
    }

    /// Called after each game reaches a terminal position.
    fn on_game_end(&mut self, _summary: &GameSummary) -> Result<()> {
        Ok(())
    }

    /// Called when training stops.
    fn on_training_end(&mut self) -> Result<()> {
        Ok(())
    }
}
