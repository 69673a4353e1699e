//! Durable key-value storage of value tables.

use crate::{Result, q_learning::ValueTable};

/// Port for persisting [`ValueTable`]s under a namespace key such as `q_3_3`.
///
/// # Examples
///
/// ```
/// use qtoe::adapters::InMemoryStore;
/// use qtoe::ports::TableStore;
/// use qtoe::q_learning::ValueTable;
///
/// let store = InMemoryStore::new();
/// assert!(store.load("q_3_3")?.is_none());
/// store.save("q_3_3", &ValueTable::new())?;
/// assert!(store.load("q_3_3")?.is_some());
/// # Ok::<(), qtoe::Error>(())
/// ```
pub trait TableStore: Send + Sync {
    /// Load the table stored under `key`, `None` if nothing was stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the stored data cannot be read or parsed.
    fn load(&self, key: &str) -> Result<Option<ValueTable>>;

    /// Store `table` under `key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns a storage error if serialization or the write fails.
    fn save(&self, key: &str, table: &ValueTable) -> Result<()>;
}
