//! Ports (trait boundaries) for external dependencies.
//!
//! The domain owns these traits; `adapters` implements them.

pub mod observer;
pub mod storage;
pub mod transport;

pub use observer::Observer;
pub use storage::TableStore;
pub use transport::SyncTransport;
