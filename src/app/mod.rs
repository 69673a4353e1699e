//! Application layer with dependency injection container.
//!
//! ```text
//! AppConfig ──> App ──> TrainingSession
//!                │         ├─ Game (two Players, smart ones share a SharedTable)
//!                │         └─ PersistenceBridge
//!                │               ├─ Local:   TableStore (JsonFileStore / InMemoryStore)
//!                │               └─ Network: SyncTransport (LoopbackTransport) -> QStore
//!                └─ adapters chosen here, overridable through AppBuilder
//! ```

pub mod config;
pub mod container;

pub use config::{AppConfig, PersistenceConfig, PlayerConfig, PlayerKind};
pub use container::{App, AppBuilder};
