//! Adapters implementing domain ports.

pub mod in_memory_store;
pub mod json_file_store;
pub mod loopback_transport;

pub use in_memory_store::InMemoryStore;
pub use json_file_store::JsonFileStore;
pub use loopback_transport::LoopbackTransport;
