//! Application configuration, loadable from a JSON file.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    persist::{DEFAULT_BACKUP_INTERVAL, DEFAULT_FLUSH_INTERVAL, DEFAULT_SAVE_INTERVAL},
    q_learning::PolicyConfig,
    tictactoe::GameSpec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Random,
    Smart,
}

/// One seat at the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Defaults to `p{n}` / `smart{n}`
    #[serde(default)]
    pub id: Option<String>,
    pub kind: PlayerKind,
    /// Learning parameters, smart players only
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

impl PlayerConfig {
    pub fn new(kind: PlayerKind) -> Self {
        Self {
            id: None,
            kind,
            policy: None,
        }
    }

    pub fn smart(policy: PolicyConfig) -> Self {
        Self {
            id: None,
            kind: PlayerKind::Smart,
            policy: Some(policy),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

fn default_prefix() -> String {
    "q".to_string()
}

fn default_save_ms() -> u64 {
    DEFAULT_SAVE_INTERVAL.as_millis() as u64
}

fn default_flush_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL.as_millis() as u64
}

fn default_backup_ms() -> u64 {
    DEFAULT_BACKUP_INTERVAL.as_millis() as u64
}

/// Where learned values go between sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum PersistenceConfig {
    /// Tables live only as long as the process
    #[default]
    None,
    /// One JSON file per table under `dir`
    Local {
        dir: PathBuf,
        #[serde(default = "default_save_ms")]
        interval_ms: u64,
        #[serde(default = "default_prefix")]
        name_prefix: String,
    },
    /// Updates stream to a shared store file
    Distributed {
        store_path: PathBuf,
        #[serde(default = "default_flush_ms")]
        interval_ms: u64,
        #[serde(default = "default_backup_ms")]
        backup_interval_ms: u64,
    },
}

impl PersistenceConfig {
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        PersistenceConfig::Local {
            dir: dir.into(),
            interval_ms: default_save_ms(),
            name_prefix: default_prefix(),
        }
    }

    pub fn distributed(store_path: impl Into<PathBuf>) -> Self {
        PersistenceConfig::Distributed {
            store_path: store_path.into(),
            interval_ms: default_flush_ms(),
            backup_interval_ms: default_backup_ms(),
        }
    }

    /// Timer period of the bridge, if there is one
    pub fn interval(&self) -> Option<Duration> {
        match self {
            PersistenceConfig::None => None,
            PersistenceConfig::Local { interval_ms, .. }
            | PersistenceConfig::Distributed { interval_ms, .. } => {
                Some(Duration::from_millis(*interval_ms))
            }
        }
    }
}

fn default_players() -> [PlayerConfig; 2] {
    [
        PlayerConfig::smart(PolicyConfig::default()),
        PlayerConfig::smart(PolicyConfig::default()),
    ]
}

/// Top-level configuration of a training run.
///
/// # Examples
///
/// ```
/// use qtoe::app::{AppConfig, PersistenceConfig};
///
/// let config: AppConfig = serde_json::from_str(r#"{
///     "game": {"grid": 4, "streak": 3},
///     "players": [{"kind": "smart"}, {"kind": "random"}],
///     "persistence": {"mode": "local", "dir": "tables"}
/// }"#)?;
/// assert!(config.validate().is_ok());
/// assert!(matches!(config.persistence, PersistenceConfig::Local { .. }));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameSpec,
    #[serde(default = "default_players")]
    pub players: [PlayerConfig; 2],
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameSpec::default(),
            players: default_players(),
            persistence: PersistenceConfig::default(),
            seed: None,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file.
    ///
    /// # Errors
    ///
    /// Storage errors for unreadable files, configuration errors for
    /// malformed or out-of-range contents.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open config file {path:?}"),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::InvalidConfiguration {
                message: format!("{path:?}: {e}"),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_game(mut self, game: GameSpec) -> Self {
        self.game = game;
        self
    }

    pub fn with_players(mut self, players: [PlayerConfig; 2]) -> Self {
        self.players = players;
        self
    }

    pub fn with_persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.game.validate()?;
        for player in &self.players {
            match (&player.kind, &player.policy) {
                (PlayerKind::Smart, Some(policy)) => policy.validate()?,
                (PlayerKind::Smart, None) => {}
                (kind, Some(_)) => {
                    return Err(Error::InvalidConfiguration {
                        message: format!("{kind:?} players take no policy"),
                    });
                }
                (_, None) => {}
            }
        }
        Ok(())
    }
}
