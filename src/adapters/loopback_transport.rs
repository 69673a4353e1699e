//! In-process transport to a [`QStore`].
//!
//! Requests and responses are encoded to JSON text and decoded on the other
//! side, so the exchange goes through the same wire format an HTTP client
//! would see.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Result,
    error::Error,
    persist::{QStore, SyncRequest, SyncResponse},
    ports::SyncTransport,
};

/// Handle to a store shared by any number of clients.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    store: Arc<Mutex<QStore>>,
    offline: Arc<AtomicBool>,
}

impl LoopbackTransport {
    pub fn new(store: Arc<Mutex<QStore>>) -> Self {
        Self {
            store,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Simulate the store going away (or coming back). Shared by clones.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn store(&self) -> MutexGuard<'_, QStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_link(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(Error::Network {
                message: "store unreachable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn over_wire<T: Serialize, U: DeserializeOwned>(value: &T, what: &str) -> Result<U> {
    let text = serde_json::to_string(value).map_err(|e| Error::Network {
        message: format!("encode {what}: {e}"),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Network {
        message: format!("decode {what}: {e}"),
    })
}

impl SyncTransport for LoopbackTransport {
    fn fetch(&mut self) -> Result<SyncResponse> {
        self.check_link()?;
        let snapshot = self.store().snapshot();
        over_wire(&snapshot, "response")
    }

    fn push(&mut self, request: &SyncRequest) -> Result<SyncResponse> {
        self.check_link()?;
        let received: SyncRequest = over_wire(request, "request")?;
        let response = self.store().handle(&received)?;
        over_wire(&response, "response")
    }
}
