//! Dependency injection container for a training run.
//!
//! The container owns infrastructure choices (table store, shared store)
//! and wires them into the domain objects of one [`TrainingSession`].

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use super::config::{AppConfig, PersistenceConfig, PlayerConfig, PlayerKind};
use crate::{
    Result,
    adapters::{JsonFileStore, LoopbackTransport},
    persist::{CancelToken, LocalBridge, NetworkBridge, PersistenceBridge, QStore, UpdateQueue},
    pipeline::TrainingSession,
    player::Player,
    ports::TableStore,
    q_learning::{QAgent, SharedTable},
    tictactoe::Game,
};

/// Application with dependency injection.
///
/// All smart players of one app train a single [`SharedTable`].
///
/// # Examples
///
/// ```
/// use qtoe::app::{App, AppConfig};
/// use qtoe::adapters::InMemoryStore;
/// use qtoe::app::PersistenceConfig;
///
/// let config = AppConfig::default()
///     .with_persistence(PersistenceConfig::local("unused"))
///     .with_seed(42);
/// let app = App::builder(config).with_table_store(InMemoryStore::new()).build();
/// let mut session = app.into_session()?;
/// let result = session.run(10)?;
/// assert!(result.total_games > 0);
/// # Ok::<(), qtoe::Error>(())
/// ```
pub struct App {
    config: AppConfig,
    table_store: Option<Box<dyn TableStore>>,
    shared_store: Option<Arc<Mutex<QStore>>>,
    table: SharedTable,
}

impl App {
    /// App with production adapters
    pub fn new(config: AppConfig) -> Self {
        AppBuilder::new(config).build()
    }

    /// Builder for injecting custom adapters
    pub fn builder(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Table every smart player of this app reads and writes
    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    fn create_player(
        &self,
        n: usize,
        config: &PlayerConfig,
        queue: Option<&UpdateQueue>,
    ) -> Result<Player> {
        let player = match config.kind {
            PlayerKind::Human => Player::human(n),
            PlayerKind::Random => Player::random(n),
            PlayerKind::Smart => {
                let policy = config.policy.clone().unwrap_or_default();
                let mut agent = QAgent::new(policy, self.table.clone())?;
                if let Some(seed) = self.config.seed {
                    agent = agent.with_seed(seed.wrapping_add(n as u64));
                }
                if let Some(queue) = queue {
                    agent = agent.with_update_queue(queue.clone());
                }
                Player::smart(n, agent)
            }
        };
        Ok(match &config.id {
            Some(id) => player.with_id(id.clone()),
            None => player,
        })
    }

    /// Wire players, game and persistence into a session and bring the
    /// shared table up to date.
    ///
    /// # Errors
    ///
    /// Configuration errors from the game or any policy.
    pub fn into_session(mut self) -> Result<TrainingSession> {
        self.config.validate()?;
        let spec = self.config.game;
        let cancel = CancelToken::new();

        let mut queue = None;
        let mut bridge = None;
        let mut store = None;
        match self.config.persistence.clone() {
            PersistenceConfig::None => {}
            PersistenceConfig::Local {
                dir,
                interval_ms,
                name_prefix,
            } => {
                let table_store = self
                    .table_store
                    .take()
                    .unwrap_or_else(|| Box::new(JsonFileStore::new(dir)) as Box<dyn TableStore>);
                bridge = Some(PersistenceBridge::Local(
                    LocalBridge::new(
                        table_store,
                        spec.namespaced(&name_prefix),
                        self.table.clone(),
                        cancel.clone(),
                    )
                    .with_interval(Duration::from_millis(interval_ms)),
                ));
            }
            PersistenceConfig::Distributed {
                store_path,
                interval_ms,
                backup_interval_ms,
            } => {
                let shared = self.shared_store.take().unwrap_or_else(|| {
                    Arc::new(Mutex::new(
                        QStore::open(store_path)
                            .with_backup_interval(Duration::from_millis(backup_interval_ms)),
                    ))
                });
                let updates = UpdateQueue::default();
                bridge = Some(PersistenceBridge::Network(
                    NetworkBridge::new(
                        Box::new(LoopbackTransport::new(shared.clone())),
                        spec.table_name(),
                        self.table.clone(),
                        updates.clone(),
                        cancel.clone(),
                    )
                    .with_interval(Duration::from_millis(interval_ms)),
                ));
                queue = Some(updates);
                store = Some(shared);
            }
        }

        let [first, second] = &self.config.players;
        let players = [
            self.create_player(1, first, queue.as_ref())?,
            self.create_player(2, second, queue.as_ref())?,
        ];
        let mut game = Game::new(spec, players)?;
        if let Some(seed) = self.config.seed {
            game = game.with_seed(seed)?;
        }

        let mut session = TrainingSession::new(game, cancel);
        if let Some(bridge) = bridge {
            session = session.with_bridge(bridge);
        }
        if let Some(store) = store {
            session = session.with_store(store);
        }
        session.open();
        Ok(session)
    }
}

/// Builder for constructing an app with custom adapters.
pub struct AppBuilder {
    config: AppConfig,
    table_store: Option<Box<dyn TableStore>>,
    shared_store: Option<Arc<Mutex<QStore>>>,
    table: Option<SharedTable>,
}

impl AppBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            table_store: None,
            shared_store: None,
            table: None,
        }
    }

    /// Store used by local persistence in place of JSON files
    pub fn with_table_store<S: TableStore + 'static>(mut self, store: S) -> Self {
        self.table_store = Some(Box::new(store));
        self
    }

    /// Shared store used by distributed persistence in place of opening
    /// the configured path
    pub fn with_shared_store(mut self, store: Arc<Mutex<QStore>>) -> Self {
        self.shared_store = Some(store);
        self
    }

    /// Start from an existing table handle
    pub fn with_table(mut self, table: SharedTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn build(self) -> App {
        App {
            config: self.config,
            table_store: self.table_store,
            shared_store: self.shared_store,
            table: self.table.unwrap_or_default(),
        }
    }
}
