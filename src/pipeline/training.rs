//! Training session: unattended self-play with persistence

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    persist::{CancelToken, PersistenceBridge, QStore},
    ports::{Observer, observer::GameSummary},
    tictactoe::{Game, GameOutcome},
};

/// Result of a training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    /// Games played (may be fewer than requested after an early stop)
    pub total_games: usize,
    /// Wins keyed by player id
    pub wins_per_player: BTreeMap<String, usize>,
    pub cats: usize,
    /// Whether every learning agent finished before the game budget ran out
    pub stopped_early: bool,
}

impl TrainingResult {
    /// Save result to JSON file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }
}

/// Runs games between the two players of a [`Game`], polling every
/// persistence bridge after each game.
pub struct TrainingSession {
    game: Game,
    bridges: Vec<PersistenceBridge>,
    store: Option<Arc<Mutex<QStore>>>,
    observers: Vec<Box<dyn Observer>>,
    cancel: CancelToken,
}

impl TrainingSession {
    /// `cancel` must be the token the bridges were built with.
    pub fn new(game: Game, cancel: CancelToken) -> Self {
        Self {
            game,
            bridges: Vec::new(),
            store: None,
            observers: Vec::new(),
            cancel,
        }
    }

    pub fn with_bridge(mut self, bridge: PersistenceBridge) -> Self {
        self.bridges.push(bridge);
        self
    }

    /// Back up this store on its own schedule while training
    pub fn with_store(mut self, store: Arc<Mutex<QStore>>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Load or fetch every table. Unreachable stores are retried on the
    /// next poll.
    pub fn open(&mut self) {
        for bridge in &mut self.bridges {
            if let Err(err) = bridge.open() {
                warn!("{err}; continuing with the local table");
            }
        }
    }

    /// Play up to `games` games.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors and if a human seat comes up.
    pub fn run(&mut self, games: usize) -> Result<TrainingResult> {
        let outcome = self.play(games);
        self.finish();
        let result = outcome?;
        for observer in &mut self.observers {
            observer.on_training_end()?;
        }
        info!(
            "training finished after {} games ({} cats)",
            result.total_games, result.cats
        );
        Ok(result)
    }

    fn play(&mut self, games: usize) -> Result<TrainingResult> {
        for observer in &mut self.observers {
            observer.on_training_start(games)?;
        }

        let mut result = TrainingResult::default();
        for game_num in 0..games {
            let outcome = self.game.play_episode()?;
            let winner = match outcome {
                GameOutcome::Winner(symbol) => self
                    .game
                    .players()
                    .iter()
                    .find(|p| p.symbol() == Some(symbol))
                    .map(|p| p.id().to_string()),
                GameOutcome::Cat => None,
            };
            match &winner {
                Some(id) => *result.wins_per_player.entry(id.clone()).or_default() += 1,
                None => result.cats += 1,
            }
            result.total_games += 1;

            let summary = GameSummary {
                game_num,
                outcome,
                winner,
                moves: self.game.board().occupied_count(),
            };
            for observer in &mut self.observers {
                observer.on_game_end(&summary)?;
            }

            self.poll(Instant::now());

            if self.all_agents_trained() {
                info!("every agent finished training after {} games", game_num + 1);
                result.stopped_early = game_num + 1 < games;
                break;
            }
        }
        Ok(result)
    }

    /// Drive every timer once
    pub fn poll(&mut self, now: Instant) {
        for bridge in &mut self.bridges {
            bridge.poll(now);
        }
        if let Some(store) = &self.store {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = store.poll(now) {
                warn!("store backup failed: {err}");
            }
        }
    }

    fn all_agents_trained(&self) -> bool {
        let mut agents = self.game.players().iter().filter_map(|p| p.agent()).peekable();
        agents.peek().is_some() && agents.all(|agent| agent.is_training_complete())
    }

    fn finish(&mut self) {
        for bridge in &mut self.bridges {
            bridge.finish();
        }
        if let Some(store) = &self.store {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(err) = store.backup() {
                warn!("final store backup failed: {err}");
            }
        }
        self.game.stop();
        self.cancel.cancel();
    }
}

impl Drop for TrainingSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        player::Player,
        q_learning::{PolicyConfig, QAgent, SharedTable},
        tictactoe::GameSpec,
    };

    #[test]
    fn test_random_session_tallies_every_game() {
        let game = Game::new(GameSpec::default(), [Player::random(1), Player::random(2)])
            .unwrap()
            .with_seed(11)
            .unwrap();
        let mut session = TrainingSession::new(game, CancelToken::new());
        let result = session.run(50).unwrap();

        assert_eq!(result.total_games, 50);
        let wins: usize = result.wins_per_player.values().sum();
        assert_eq!(wins + result.cats, 50);
        assert!(!result.stopped_early);
        assert!(session.cancel_token().is_cancelled());
    }

    #[test]
    fn test_stops_when_agents_finish_training() {
        let config = PolicyConfig::default().with_alpha(2e-6).with_decay(0.1);
        let agent = QAgent::new(config, SharedTable::default()).unwrap().with_seed(1);
        let game = Game::new(GameSpec::default(), [Player::smart(1, agent), Player::random(2)])
            .unwrap()
            .with_seed(3)
            .unwrap();
        let mut session = TrainingSession::new(game, CancelToken::new());
        let result = session.run(100).unwrap();
        assert!(result.stopped_early);
        assert!(result.total_games < 100);
    }
}
