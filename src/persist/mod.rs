//! Persistence of learned values
//!
//! Two paths keep an agent's table alive across sessions:
//!
//! - **local**: the table is saved to a [`crate::ports::TableStore`] on a
//!   timer and loaded at startup ([`LocalBridge`]);
//! - **distributed**: every update is queued and streamed to a shared
//!   [`QStore`], whose snapshot replaces the local table after each
//!   exchange ([`NetworkBridge`]).

pub mod bridge;
pub mod queue;
pub mod schedule;
pub mod store;
pub mod wire;

pub use bridge::{
    DEFAULT_FLUSH_INTERVAL, DEFAULT_SAVE_INTERVAL, LocalBridge, NetworkBridge, PersistenceBridge,
};
pub use queue::{DEFAULT_QUEUE_CAPACITY, UpdateQueue};
pub use schedule::{CancelToken, Schedule};
pub use store::{DEFAULT_BACKUP_INTERVAL, QStore};
pub use wire::{PendingUpdate, ResetFlag, SyncPayload, SyncRequest, SyncResponse};
