//! Authoritative store merging updates from every training client.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use log::{debug, info, warn};

use super::{
    schedule::Schedule,
    wire::{PendingUpdate, SyncPayload, SyncRequest, SyncResponse},
};
use crate::{Error, Result, q_learning::ValueTable};

/// How often a dirty store is written back to its file
pub const DEFAULT_BACKUP_INTERVAL: Duration = Duration::from_secs(15);

type Tables = BTreeMap<String, ValueTable>;

/// `agent name -> ValueTable`, backed by one JSON file.
///
/// Updates are last-writer-wins per `(name, state, action)`.
#[derive(Debug)]
pub struct QStore {
    path: PathBuf,
    tables: Tables,
    dirty: bool,
    schedule: Schedule,
}

impl QStore {
    /// Open the store at `path`. A missing or unreadable file starts an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tables = match read_tables(&path) {
            Ok(tables) => {
                info!("loaded {} tables from {}", tables.len(), path.display());
                tables
            }
            Err(err) => {
                warn!("starting with an empty store: {err}");
                Tables::new()
            }
        };
        Self {
            path,
            tables,
            dirty: false,
            schedule: Schedule::new(DEFAULT_BACKUP_INTERVAL),
        }
    }

    pub fn with_backup_interval(mut self, interval: Duration) -> Self {
        self.schedule = Schedule::new(interval);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn table(&self, name: &str) -> Option<&ValueTable> {
        self.tables.get(name)
    }

    /// Record one update
    pub fn save(&mut self, update: &PendingUpdate) {
        self.tables
            .entry(update.name.clone())
            .or_default()
            .set(&update.state_hash, &update.action_hash, update.val);
        self.dirty = true;
    }

    pub fn snapshot(&self) -> SyncResponse {
        SyncResponse {
            q: self.tables.clone(),
        }
    }

    /// Serve one POST: apply the batch (or reset) and answer with the
    /// full snapshot.
    pub fn handle(&mut self, request: &SyncRequest) -> Result<SyncResponse> {
        match &request.qs {
            SyncPayload::Updates(updates) => {
                for update in updates {
                    self.save(update);
                }
                debug!("applied {} updates", updates.len());
            }
            SyncPayload::Reset(flag) if flag.reset => {
                self.reset()?;
            }
            SyncPayload::Reset(_) => {}
        }
        Ok(self.snapshot())
    }

    /// Move the current contents to `{path}_{unix_millis}` and start over.
    ///
    /// Returns the backup path.
    pub fn reset(&mut self) -> Result<PathBuf> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let backup = PathBuf::from(format!("{}_{millis}", self.path.display()));
        write_tables(&backup, &self.tables)?;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(source) if source.kind() == IoErrorKind::NotFound => {}
            Err(source) => {
                return Err(Error::Io {
                    operation: format!("remove store file {}", self.path.display()),
                    source,
                });
            }
        }
        self.tables = read_tables(&self.path)?;
        self.dirty = false;
        info!(
            "store reset; previous contents saved to {}",
            backup.display()
        );
        Ok(backup)
    }

    /// Write to the primary file if anything changed since the last write.
    pub fn backup(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_tables(&self.path, &self.tables)?;
        self.dirty = false;
        info!(
            "backed up {} tables to {}",
            self.tables.len(),
            self.path.display()
        );
        Ok(true)
    }

    /// [`QStore::backup`] when the backup timer is due
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        if self.schedule.due(now) {
            self.backup()
        } else {
            Ok(false)
        }
    }
}

fn read_tables(path: &Path) -> Result<Tables> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(source) if source.kind() == IoErrorKind::NotFound => return Ok(Tables::new()),
        Err(source) => {
            return Err(Error::Io {
                operation: format!("open store file {}", path.display()),
                source,
            });
        }
    };
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::SerializationContext {
        operation: format!("parse store file {}", path.display()),
        message: e.to_string(),
    })
}

fn write_tables(path: &Path, tables: &Tables) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::Io {
            operation: format!("create directory {}", parent.display()),
            source,
        })?;
    }
    let file = File::create(path).map_err(|source| Error::Io {
        operation: format!("create store file {}", path.display()),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, tables).map_err(|e| Error::SerializationContext {
        operation: format!("write store file {}", path.display()),
        message: e.to_string(),
    })?;
    writer.flush().map_err(|source| Error::Io {
        operation: format!("flush store file {}", path.display()),
        source,
    })
}
