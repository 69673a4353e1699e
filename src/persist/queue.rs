//! Bounded queue of updates awaiting a flush.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::warn;

use super::wire::PendingUpdate;

/// Default number of updates held before the oldest are dropped
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

#[derive(Debug)]
struct Inner {
    items: VecDeque<PendingUpdate>,
    capacity: usize,
    dropped: u64,
}

/// FIFO shared between the agents producing updates and the bridge
/// flushing them. When full, the oldest update is discarded.
#[derive(Debug, Clone)]
pub struct UpdateQueue {
    inner: Arc<Mutex<Inner>>,
}

impl UpdateQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                items: VecDeque::new(),
                capacity: capacity.max(1),
                dropped: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, update: PendingUpdate) {
        let mut inner = self.lock();
        if inner.items.len() >= inner.capacity {
            inner.items.pop_front();
            inner.dropped += 1;
            if inner.dropped.is_power_of_two() {
                warn!(
                    "update queue full ({} items); {} oldest updates dropped so far",
                    inner.capacity, inner.dropped
                );
            }
        }
        inner.items.push_back(update);
    }

    /// Take everything queued
    pub fn drain(&self) -> Vec<PendingUpdate> {
        self.lock().items.drain(..).collect()
    }

    /// Put a batch that failed to send back at the front, keeping order.
    /// Anything beyond capacity is dropped from the oldest end.
    pub fn requeue(&self, batch: Vec<PendingUpdate>) {
        let mut inner = self.lock();
        for update in batch.into_iter().rev() {
            inner.items.push_front(update);
        }
        while inner.items.len() > inner.capacity {
            inner.items.pop_front();
            inner.dropped += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Updates discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }
}

impl Default for UpdateQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
