//! Bridges between an agent's in-memory table and durable or shared storage.

use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{
    queue::UpdateQueue,
    schedule::{CancelToken, Schedule},
    wire::{SyncPayload, SyncRequest, SyncResponse},
};
use crate::{
    Error, Result,
    ports::{SyncTransport, TableStore},
    q_learning::{SharedTable, ValueTable},
};

/// Default save interval of a [`LocalBridge`]
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(5);

/// Default flush interval of a [`NetworkBridge`]
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Keeps one table in sync with a [`TableStore`] key.
pub struct LocalBridge {
    store: Box<dyn TableStore>,
    key: String,
    table: SharedTable,
    schedule: Schedule,
    cancel: CancelToken,
}

impl LocalBridge {
    pub fn new(
        store: Box<dyn TableStore>,
        key: impl Into<String>,
        table: SharedTable,
        cancel: CancelToken,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            table,
            schedule: Schedule::new(DEFAULT_SAVE_INTERVAL),
            cancel,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.schedule = Schedule::new(interval);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace the table with what the store holds. Storage errors leave
    /// the table empty.
    pub fn load(&self) {
        match self.store.load(&self.key) {
            Ok(Some(table)) => {
                info!("loaded table {} ({} states)", self.key, table.len());
                self.table.replace_all(table);
            }
            Ok(None) => {
                info!("no stored table {}; starting empty", self.key);
                self.table.replace_all(ValueTable::new());
            }
            Err(err) => {
                warn!("could not load table {}: {err}; starting empty", self.key);
                self.table.replace_all(ValueTable::new());
            }
        }
    }

    /// Save when the timer is due. Failures are logged.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.cancel.is_cancelled() || !self.schedule.due(now) {
            return false;
        }
        match self.save() {
            Ok(()) => true,
            Err(err) => {
                warn!("could not save table {}: {err}", self.key);
                false
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let snapshot = self.table.snapshot();
        self.store.save(&self.key, &snapshot)?;
        debug!("saved table {} ({} states)", self.key, snapshot.len());
        Ok(())
    }

    /// Clear the table and persist the empty state
    pub fn reset(&self) -> Result<()> {
        self.table.lock().clear();
        self.save()?;
        info!("reset table {}", self.key);
        Ok(())
    }
}

/// Streams queued updates to the shared store and adopts its snapshot.
///
/// Every successful exchange replaces the local table with the store's
/// table for this agent name.
pub struct NetworkBridge {
    transport: Box<dyn SyncTransport>,
    name: String,
    table: SharedTable,
    queue: UpdateQueue,
    schedule: Schedule,
    cancel: CancelToken,
    connected: bool,
}

impl NetworkBridge {
    pub fn new(
        transport: Box<dyn SyncTransport>,
        name: impl Into<String>,
        table: SharedTable,
        queue: UpdateQueue,
        cancel: CancelToken,
    ) -> Self {
        Self {
            transport,
            name: name.into(),
            table,
            queue,
            schedule: Schedule::new(DEFAULT_FLUSH_INTERVAL),
            cancel,
            connected: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.schedule = Schedule::new(interval);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether at least one exchange has succeeded
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn queue(&self) -> &UpdateQueue {
        &self.queue
    }

    fn merge(&self, mut response: SyncResponse) {
        let table = response.take_table(&self.name);
        debug!("adopting shared table {} ({} states)", self.name, table.len());
        self.table.replace_all(table);
    }

    /// Initial fetch of the shared table.
    pub fn connect(&mut self) -> Result<()> {
        let response = self.transport.fetch().map_err(as_network)?;
        self.merge(response);
        self.connected = true;
        info!("connected to shared store as {}", self.name);
        Ok(())
    }

    /// Flush when the timer is due.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        if self.cancel.is_cancelled() || !self.schedule.due(now) {
            return Ok(false);
        }
        self.flush()
    }

    /// Send everything queued. A failed batch goes back to the front of
    /// the queue.
    ///
    /// Returns whether an exchange took place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] when the exchange fails.
    pub fn flush(&mut self) -> Result<bool> {
        if self.connected && self.queue.is_empty() {
            debug!("nothing to flush for {}", self.name);
            return Ok(false);
        }

        let request = SyncRequest::updates(self.queue.drain());
        match self.transport.push(&request) {
            Ok(response) => {
                self.merge(response);
                self.connected = true;
                Ok(true)
            }
            Err(err) => {
                if let SyncPayload::Updates(batch) = request.qs {
                    warn!(
                        "flush for {} failed, requeued {} updates: {err}",
                        self.name,
                        batch.len()
                    );
                    self.queue.requeue(batch);
                }
                Err(as_network(err))
            }
        }
    }

    /// Ask the store to start over and adopt its empty snapshot.
    pub fn request_reset(&mut self) -> Result<()> {
        let discarded = self.queue.drain().len();
        if discarded > 0 {
            debug!("discarding {discarded} queued updates before reset");
        }
        let response = self.transport.push(&SyncRequest::reset()).map_err(as_network)?;
        self.merge(response);
        info!("shared store reset by {}", self.name);
        Ok(())
    }
}

fn as_network(err: Error) -> Error {
    match err {
        err @ Error::Network { .. } => err,
        other => Error::Network {
            message: other.to_string(),
        },
    }
}

/// Either persistence path, driven the same way by the training loop.
pub enum PersistenceBridge {
    Local(LocalBridge),
    Network(NetworkBridge),
}

impl PersistenceBridge {
    /// Bring the table up to date before the first game
    pub fn open(&mut self) -> Result<()> {
        match self {
            PersistenceBridge::Local(bridge) => {
                bridge.load();
                Ok(())
            }
            PersistenceBridge::Network(bridge) => bridge.connect(),
        }
    }

    /// Run the bridge's timer. Errors are logged; the next tick retries.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self {
            PersistenceBridge::Local(bridge) => bridge.poll(now),
            PersistenceBridge::Network(bridge) => match bridge.poll(now) {
                Ok(sent) => sent,
                Err(err) => {
                    warn!("{err}");
                    false
                }
            },
        }
    }

    /// Final save or flush, best-effort
    pub fn finish(&mut self) {
        let result = match self {
            PersistenceBridge::Local(bridge) => bridge.save(),
            PersistenceBridge::Network(bridge) => bridge.flush().map(|_| ()),
        };
        if let Err(err) = result {
            warn!("final sync failed: {err}");
        }
    }

    /// Clear learned values locally and at the backing store
    pub fn reset(&mut self) -> Result<()> {
        match self {
            PersistenceBridge::Local(bridge) => bridge.reset(),
            PersistenceBridge::Network(bridge) => bridge.request_reset(),
        }
    }

    pub fn stop(&self) {
        match self {
            PersistenceBridge::Local(bridge) => bridge.cancel.cancel(),
            PersistenceBridge::Network(bridge) => bridge.cancel.cancel(),
        }
    }
}
