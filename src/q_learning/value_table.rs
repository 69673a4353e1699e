//! Value table for the Q-learning policy

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    identifiers::{ActionKey, StateKey},
    tictactoe::symmetry::KnownStates,
};

/// Values of the actions available in one state
pub type ActionValues = HashMap<ActionKey, f64>;

/// Nested mapping `StateKey -> (ActionKey -> value)`.
///
/// Entries are created lazily with a value of `0`. Serializes as a plain
/// JSON object of objects of numbers, which is both the on-disk and the
/// wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable {
    states: HashMap<StateKey, ActionValues>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the action values for a state, creating an empty entry if needed
    pub fn state_mut(&mut self, key: &StateKey) -> &mut ActionValues {
        self.states.entry(key.clone()).or_default()
    }

    /// Action values for a state, if it has been seen
    pub fn state(&self, key: &str) -> Option<&ActionValues> {
        self.states.get(key)
    }

    /// Get a value, initializing it to `0` on first access
    pub fn get_or_init(&mut self, state: &StateKey, action: &ActionKey) -> f64 {
        *self
            .state_mut(state)
            .entry(action.clone())
            .or_insert(0.0)
    }

    /// Point lookup without creating entries
    pub fn get(&self, state: &str, action: &str) -> Option<f64> {
        self.states.get(state)?.get(action).copied()
    }

    /// Store a value
    pub fn set(&mut self, state: &StateKey, action: &ActionKey, value: f64) {
        self.state_mut(state).insert(action.clone(), value);
    }

    /// Highest action value of a state, `0` when the state is unseen or empty
    pub fn best_value(&self, state: &str) -> f64 {
        self.states
            .get(state)
            .and_then(|actions| actions.values().copied().reduce(f64::max))
            .unwrap_or(0.0)
    }

    /// Swap in a whole table, discarding every local entry.
    ///
    /// This is the merge policy for tables received from the shared store:
    /// last writer wins, per agent-name namespace.
    pub fn replace_all(&mut self, table: ValueTable) {
        *self = table;
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of (state, action) entries
    pub fn entry_count(&self) -> usize {
        self.states.values().map(HashMap::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &ActionValues)> {
        self.states.iter()
    }
}

impl KnownStates for ValueTable {
    fn contains_state(&self, key: &str) -> bool {
        self.states.contains_key(key)
    }
}

/// Reference-counted handle to a [`ValueTable`].
///
/// Agents that train as one policy hold clones of the same handle, so an
/// update made by one is visible to the other on its next lookup. Every
/// access goes through the mutex; callers hold the guard only for the
/// duration of a single lookup or update.
#[derive(Debug, Clone, Default)]
pub struct SharedTable {
    inner: Arc<Mutex<ValueTable>>,
}

impl SharedTable {
    pub fn new(table: ValueTable) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    /// Lock the table. A poisoned lock is recovered since every write is a
    /// single store that leaves the table consistent.
    pub fn lock(&self) -> MutexGuard<'_, ValueTable> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the contents for every holder of this handle
    pub fn replace_all(&self, table: ValueTable) {
        self.lock().replace_all(table);
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> ValueTable {
        self.lock().clone()
    }

    /// Whether two handles point at the same table
    pub fn ptr_eq(&self, other: &SharedTable) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StateKey {
        StateKey::new(s)
    }

    fn action(s: &str) -> ActionKey {
        ActionKey::new(s)
    }

    #[test]
    fn test_get_or_init_defaults_to_zero() {
        let mut table = ValueTable::new();
        assert_eq!(table.get_or_init(&key("000"), &action("0|0")), 0.0);
        assert_eq!(table.get("000", "0|0"), Some(0.0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_does_not_create_entries() {
        let table = ValueTable::new();
        assert_eq!(table.get("000", "0|0"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_state_mut_creates_empty_state() {
        let mut table = ValueTable::new();
        assert!(table.state_mut(&key("a00")).is_empty());
        assert!(table.contains_state("a00"));
        assert_eq!(table.entry_count(), 0);
    }

    #[test]
    fn test_set_overwrites() {
        let mut table = ValueTable::new();
        table.set(&key("s"), &action("1|1"), 1.5);
        table.set(&key("s"), &action("1|1"), -2.0);
        assert_eq!(table.get("s", "1|1"), Some(-2.0));
    }

    #[test]
    fn test_best_value() {
        let mut table = ValueTable::new();
        assert_eq!(table.best_value("s"), 0.0);
        table.state_mut(&key("s"));
        assert_eq!(table.best_value("s"), 0.0);
        table.set(&key("s"), &action("0|0"), -5.0);
        table.set(&key("s"), &action("0|1"), -3.0);
        assert_eq!(table.best_value("s"), -3.0);
    }

    #[test]
    fn test_replace_all_discards_local_entries() {
        let mut table = ValueTable::new();
        table.set(&key("local"), &action("0|0"), 1.0);
        let mut remote = ValueTable::new();
        remote.set(&key("remote"), &action("1|1"), 2.0);
        table.replace_all(remote);
        assert!(!table.contains_state("local"));
        assert_eq!(table.get("remote", "1|1"), Some(2.0));
    }

    #[test]
    fn test_json_shape_is_plain_nested_object() {
        let mut table = ValueTable::new();
        table.set(&key("a00"), &action("1|0"), 10.0);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json, serde_json::json!({ "a00": { "1|0": 10.0 } }));

        let parsed: ValueTable =
            serde_json::from_str(r#"{"b0a": {"0|0": -1.5, "2|1": 3}}"#).unwrap();
        assert_eq!(parsed.get("b0a", "2|1"), Some(3.0));
    }

    #[test]
    fn test_shared_handles_see_each_others_writes() {
        let first = SharedTable::default();
        let second = first.clone();
        first.lock().set(&key("s"), &action("0|0"), 4.0);
        assert_eq!(second.lock().get("s", "0|0"), Some(4.0));
        assert!(first.ptr_eq(&second));

        second.replace_all(ValueTable::new());
        assert!(first.lock().is_empty());
    }
}
