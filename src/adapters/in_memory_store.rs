//! In-memory table store for testing.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{Result, error::Error, ports::TableStore, q_learning::ValueTable};

/// Keeps serialized tables in a shared map instead of on disk.
///
/// Tables are stored as JSON text so a round trip exercises the same
/// encoding as the file store. All clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.storage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored tables
    pub fn count(&self) -> usize {
        self.storage().len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.storage().contains_key(key)
    }

    /// Store raw text under `key`, bypassing serialization
    pub fn insert_raw(&self, key: &str, raw: impl Into<String>) {
        self.storage().insert(key.to_string(), raw.into());
    }

    pub fn clear(&self) {
        self.storage().clear();
    }
}

impl TableStore for InMemoryStore {
    fn load(&self, key: &str) -> Result<Option<ValueTable>> {
        let storage = self.storage();
        let Some(raw) = storage.get(key) else {
            return Ok(None);
        };
        let table = serde_json::from_str(raw).map_err(|e| Error::SerializationContext {
            operation: format!("parse in-memory table '{key}'"),
            message: e.to_string(),
        })?;
        Ok(Some(table))
    }

    fn save(&self, key: &str, table: &ValueTable) -> Result<()> {
        let raw = serde_json::to_string(table).map_err(|e| Error::SerializationContext {
            operation: format!("serialize table '{key}' for in-memory storage"),
            message: e.to_string(),
        })?;
        self.storage().insert(key.to_string(), raw);
        Ok(())
    }
}
