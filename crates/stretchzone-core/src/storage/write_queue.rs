//! Serialized, coalescing persistence writes.
//!
//! Each key has one pending slot holding only its newest value, so a burst
//! of mutations collapses into a single write. A background task drains the
//! slots; every drain (background or `flush`) holds the I/O lock, so an older
//! value can never land after a newer one for the same key.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::KeyValueStore;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingOp {
    Set(Vec<u8>),
    Remove,
}

struct Shared {
    store: Arc<dyn KeyValueStore>,
    slots: Mutex<BTreeMap<String, PendingOp>>,
    io: tokio::sync::Mutex<()>,
    wake: Notify,
}

impl Shared {
    fn slots(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, PendingOp>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write out everything pending. On failure the unwritten ops go back
    /// into their slots unless a newer value arrived meanwhile.
    async fn drain(&self) -> Result<()> {
        let _io = self.io.lock().await;
        loop {
            let batch = std::mem::take(&mut *self.slots());
            if batch.is_empty() {
                return Ok(());
            }

            let mut ops = batch.into_iter();
            while let Some((key, op)) = ops.next() {
                let outcome = match &op {
                    PendingOp::Set(bytes) => self.store.set(&key, bytes).await,
                    PendingOp::Remove => self.store.remove(&key).await,
                };
                if let Err(e) = outcome {
                    let err = CoreError::PersistenceWriteFailure {
                        key: key.clone(),
                        message: e.to_string(),
                    };
                    let mut slots = self.slots();
                    for (k, op) in std::iter::once((key, op)).chain(ops) {
                        slots.entry(k).or_insert(op);
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// Queue in front of a [`KeyValueStore`].
pub struct WriteQueue {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl WriteQueue {
    /// Start the background writer. Must be called inside a tokio runtime.
    ///
    /// `debounce` is how long the writer waits after a wake-up before
    /// draining, letting closely spaced mutations share one write.
    pub fn spawn(store: Arc<dyn KeyValueStore>, debounce: Duration) -> Self {
        let shared = Arc::new(Shared {
            store,
            slots: Mutex::new(BTreeMap::new()),
            io: tokio::sync::Mutex::new(()),
            wake: Notify::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = tokio::spawn(async move {
            loop {
                worker_shared.wake.notified().await;
                if !debounce.is_zero() {
                    tokio::time::sleep(debounce).await;
                }
                if let Err(e) = worker_shared.drain().await {
                    tracing::warn!(error = %e, "persistence write failed, will retry on next change");
                }
            }
        });

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Schedule `bytes` to be stored at `key`, replacing any pending value.
    pub fn enqueue(&self, key: &str, bytes: Vec<u8>) {
        self.shared
            .slots()
            .insert(key.to_string(), PendingOp::Set(bytes));
        self.shared.wake.notify_one();
    }

    /// Schedule removal of `key`, replacing any pending value.
    pub fn enqueue_remove(&self, key: &str) {
        self.shared.slots().insert(key.to_string(), PendingOp::Remove);
        self.shared.wake.notify_one();
    }

    /// Nudge the writer to retry anything left over from a failed write.
    pub fn resume(&self) {
        self.shared.wake.notify_one();
    }

    /// Keys with a write still outstanding.
    pub fn pending_keys(&self) -> Vec<String> {
        self.shared.slots().keys().cloned().collect()
    }

    /// Drain now and wait for it.
    pub async fn flush(&self) -> Result<()> {
        self.shared.drain().await
    }

    /// Flush and stop the background writer.
    pub async fn shutdown(mut self) -> Result<()> {
        let result = self.shared.drain().await;
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        result
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}
