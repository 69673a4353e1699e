//! Wire format of the shared-store sync protocol.
//!
//! ```text
//! POST {"qs": [{"name", "stateHash", "actionHash", "val", "reward"}, ...]}
//! POST {"qs": {"reset": true}}
//! GET
//!   -> {"q": {"<agent name>": {"<state>": {"<action>": value}}}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    identifiers::{ActionKey, StateKey},
    q_learning::ValueTable,
};

/// One value update waiting to be sent to the shared store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpdate {
    /// Table namespace, `"{prefix}_{grid}_{streak}"`
    pub name: String,
    pub state_hash: StateKey,
    pub action_hash: ActionKey,
    /// Value after the update
    pub val: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetFlag {
    pub reset: bool,
}

/// Body of a POST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncPayload {
    Updates(Vec<PendingUpdate>),
    Reset(ResetFlag),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub qs: SyncPayload,
}

impl SyncRequest {
    pub fn updates(qs: Vec<PendingUpdate>) -> Self {
        Self {
            qs: SyncPayload::Updates(qs),
        }
    }

    pub fn reset() -> Self {
        Self {
            qs: SyncPayload::Reset(ResetFlag { reset: true }),
        }
    }
}

/// Reply to both GET and POST: the full authoritative snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub q: BTreeMap<String, ValueTable>,
}

impl SyncResponse {
    /// Take the table for one agent namespace, empty if the store has none
    pub fn take_table(&mut self, name: &str) -> ValueTable {
        self.q.remove(name).unwrap_or_default()
    }
}
