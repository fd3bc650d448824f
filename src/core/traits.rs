//! The store capability shared by all variants.

use std::time::SystemTime;

use async_trait::async_trait;

use super::Result;
use crate::store::Item;

/// A store of timestamped items that fade out after a fixed lifetime.
///
/// The capability is deliberately small so that store variants compose:
/// a replicated store holds its parent as a `Fader` and delegates reads to
/// it, which allows chaining (for example several replication layers over
/// one memory store).
///
/// Duplicate keys are permitted; the store is a multiset ordered by
/// timestamp. Lookups scan in heap order, which beyond the root is not
/// sorted order.
#[async_trait]
pub trait Fader: Send + Sync {
    /// Places an item with the provided key, timestamp and value in the
    /// store.
    async fn put(&self, key: &[u8], time: SystemTime, value: &[u8]) -> Result<()>;

    /// Returns timestamp and value of the first item in heap order whose
    /// key equals `key`, or `None` if no such item exists.
    async fn get(&self, key: &[u8]) -> Option<(SystemTime, Vec<u8>)>;

    /// Returns the item with the earliest timestamp without removing it.
    async fn earliest(&self) -> Option<Item>;

    /// Returns timestamps and values of all items with the provided key,
    /// in heap order.
    async fn select(&self, key: &[u8]) -> Vec<(SystemTime, Vec<u8>)>;

    /// Returns the number of items in the store.
    async fn size(&self) -> usize;

    /// Tears the store down. Closing a store twice is an error.
    async fn close(&self) -> Result<()>;
}
