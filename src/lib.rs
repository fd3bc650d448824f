//! # fadecast
//!
//! An in-memory key/value store whose items fade out after a fixed
//! lifetime, with an optional replicated variant that mirrors every write
//! across a process group via AES-GCM encrypted UDP multicast.
//!
//! Every stored item carries a caller-supplied timestamp; once the
//! configured lifetime has elapsed past that timestamp, a background
//! scheduler evicts the item. Stores implement the [`Fader`] capability:
//!
//! - [`Memory`]: the plain expiring store, a timestamp-ordered min-heap
//!   with a single expiry scheduler task.
//! - [`Multicast`]: wraps any parent [`Fader`] and publishes each `put` to
//!   a multicast group as one authenticated-encrypted datagram, while a
//!   receive task applies datagrams from other group members to the
//!   parent. Replication is best-effort and eventually consistent.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::{Duration, SystemTime};
//!
//! use fadecast::{Fader, Memory, Multicast};
//!
//! # async fn example() -> Result<(), fadecast::Error> {
//! let memory = Memory::new(Duration::from_secs(2));
//! memory.put(b"key", SystemTime::now(), b"value").await?;
//! assert_eq!(memory.size().await, 1);
//!
//! // Mirror writes across a multicast group. Peers constructed with the
//! // same group address and key converge on the same data.
//! let key = [0u8; 16];
//! let store = Multicast::new(memory, "224.0.0.1:1888", &key, None, None).await?;
//! store.put(b"key", SystemTime::now(), b"value").await?;
//! store.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Security model
//!
//! Datagrams are sealed with AES-GCM (128/192/256 according to key length)
//! under a per-sender strictly monotonic nonce. Receivers drop their own
//! loopback traffic by sender id and drop any datagram whose nonce does
//! not exceed the highest one accepted from that sender, so replayed
//! datagrams are discarded. Possession of the shared key is the only
//! authorization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core;
pub mod crypt;
pub mod multicast;
pub mod store;

pub use crate::core::{Error, Fader, Result, DEFAULT_KEY};
pub use crate::multicast::{Multicast, PeerId, ReceiveFilter};
pub use crate::store::{Item, Memory};
