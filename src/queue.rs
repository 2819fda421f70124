//! Per-key mutual exclusion.
//!
//! Every read-modify-write of a session runs through [`KeyedQueue::run_exclusive`]
//! under the session ID, so two transitions of one game never interleave
//! between load and save. Different games never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, trace};

type Slots = HashMap<String, (Arc<AsyncMutex<()>>, usize)>;

/// FIFO exclusion per key.
///
/// Admission order within a key is arrival order, inherited from tokio's
/// fair mutex. A key's entry lives only while some task holds or awaits it.
#[derive(Debug, Clone, Default)]
pub struct KeyedQueue {
    slots: Arc<Mutex<Slots>>,
}

/// Registration of one task against a key; dropping it releases the entry.
struct Ticket {
    slots: Arc<Mutex<Slots>>,
    key: String,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, count)) = slots.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                slots.remove(&self.key);
                trace!(key = %self.key, "Queue slot reclaimed");
            }
        }
    }
}

impl KeyedQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&self, key: &str) -> (Ticket, Arc<AsyncMutex<()>>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let (lock, count) = slots
            .entry(key.to_string())
            .or_insert_with(|| (Arc::new(AsyncMutex::new(())), 0));
        *count += 1;
        let ticket = Ticket {
            slots: Arc::clone(&self.slots),
            key: key.to_string(),
        };
        (ticket, Arc::clone(lock))
    }

    /// Runs `work` once every earlier task for `key` has finished.
    ///
    /// The slot is released when `work` completes, fails or panics, and when
    /// the returned future is dropped before completion.
    #[instrument(skip(self, work))]
    pub async fn run_exclusive<F, T>(&self, key: &str, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let (_ticket, lock) = self.enter(key);
        let _guard = lock.lock_owned().await;
        debug!("Queue slot acquired");
        work.await
    }

    /// Number of keys with a holder or waiter.
    pub fn active_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
