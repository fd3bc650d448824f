//! Min-heap store with a timer-driven expiry scheduler.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tokio::time;
use tracing::error;

use crate::core::{Error, Fader, Result, VERY_LONG_WAIT};

use super::item::Item;

/// The in-memory expiring store.
///
/// A cheaply cloneable handle; clones share one heap and one expiry
/// scheduler. Items are evicted once `expires_in` has elapsed past their
/// timestamp. All operations are safe to call from any task.
#[derive(Clone)]
pub struct Memory {
    shared: Arc<Shared>,
    item_stored: mpsc::Sender<()>,
    close: mpsc::Sender<()>,
}

struct Shared {
    expires_in: Duration,
    items: RwLock<BinaryHeap<Reverse<Item>>>,
}

impl Memory {
    /// Creates a store whose items expire `expires_in` after their
    /// timestamp.
    ///
    /// Spawns the expiry scheduler, so this must be called within a tokio
    /// runtime.
    pub fn new(expires_in: Duration) -> Self {
        let shared = Arc::new(Shared {
            expires_in,
            items: RwLock::new(BinaryHeap::new()),
        });

        // Capacity 1: a put rendezvouses with the scheduler instead of
        // queueing notifications unboundedly.
        let (item_stored, item_rx) = mpsc::channel(1);
        let (close, close_rx) = mpsc::channel(1);

        let scheduler = tokio::spawn(expiry_loop(Arc::clone(&shared), item_rx, close_rx));
        tokio::spawn(async move {
            if let Err(err) = scheduler.await {
                if err.is_panic() {
                    error!("expiry scheduler panicked: {err}");
                }
            }
        });

        Self {
            shared,
            item_stored,
            close,
        }
    }
}

#[async_trait]
impl Fader for Memory {
    async fn put(&self, key: &[u8], time: SystemTime, value: &[u8]) -> Result<()> {
        self.shared
            .items
            .write()
            .await
            .push(Reverse(Item::new(key, time, value)));

        // Signalled outside the critical section, after the push. The send
        // completes once the scheduler has room for the notification, so
        // by the time put returns the scheduler re-arms on or before its
        // next loop iteration.
        self.item_stored.send(()).await.map_err(|_| Error::Closed)
    }

    async fn get(&self, key: &[u8]) -> Option<(SystemTime, Vec<u8>)> {
        self.shared
            .items
            .read()
            .await
            .iter()
            .find(|Reverse(item)| item.key() == key)
            .map(|Reverse(item)| (item.time(), item.value().to_vec()))
    }

    async fn earliest(&self) -> Option<Item> {
        self.shared
            .items
            .read()
            .await
            .peek()
            .map(|Reverse(item)| item.clone())
    }

    async fn select(&self, key: &[u8]) -> Vec<(SystemTime, Vec<u8>)> {
        self.shared
            .items
            .read()
            .await
            .iter()
            .filter(|Reverse(item)| item.key() == key)
            .map(|Reverse(item)| (item.time(), item.value().to_vec()))
            .collect()
    }

    async fn size(&self) -> usize {
        self.shared.items.read().await.len()
    }

    async fn close(&self) -> Result<()> {
        self.close.send(()).await.map_err(|_| Error::Closed)
    }
}

/// Runs until a close signal arrives or every store handle is dropped.
///
/// On every stored item the wait until the next expiry is recomputed even
/// when the root did not change: time has advanced, so the duration to
/// the root's expiry has shrunk.
async fn expiry_loop(
    shared: Arc<Shared>,
    mut item_stored: mpsc::Receiver<()>,
    mut close: mpsc::Receiver<()>,
) {
    let mut next_wait = VERY_LONG_WAIT;

    loop {
        tokio::select! {
            signal = item_stored.recv() => {
                if signal.is_none() {
                    break;
                }
                next_wait = next_expiry_wait(&shared).await;
            }
            _ = time::sleep(next_wait) => {
                remove_expired_root(&shared).await;
                next_wait = next_expiry_wait(&shared).await;
            }
            _ = close.recv() => break,
        }
    }
}

/// Pops the heap root if its lifetime has actually elapsed.
///
/// The timer can in principle fire early; re-checking the deadline keeps
/// a live item from being dropped.
async fn remove_expired_root(shared: &Shared) {
    let deadline = SystemTime::now() - shared.expires_in;
    let mut items = shared.items.write().await;
    if let Some(Reverse(root)) = items.peek() {
        if root.time() <= deadline {
            items.pop();
        }
    }
}

/// Duration until the current root expires.
///
/// Roots that have already expired are popped on the way; once the heap is
/// empty, [`VERY_LONG_WAIT`] puts the scheduler back to its idle state.
async fn next_expiry_wait(shared: &Shared) -> Duration {
    let mut items = shared.items.write().await;
    loop {
        let Some(Reverse(root)) = items.peek() else {
            return VERY_LONG_WAIT;
        };
        match (root.time() + shared.expires_in).duration_since(SystemTime::now()) {
            Ok(wait) if !wait.is_zero() => return wait,
            _ => {
                items.pop();
            }
        }
    }
}
