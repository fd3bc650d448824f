//! Replication of store operations across a UDP multicast group.
//!
//! Every `put` becomes one encrypted datagram: a [`Packet`] carrying the
//! item, prefixed with the sender's [`PeerId`] and sealed by the frame
//! codec. A receive task applies datagrams of other group members to the
//! parent store. Replication is best-effort eventual: no retransmission,
//! no ordering across senders, replayed datagrams dropped.

mod packet;
mod socket;
mod store;
mod transmitter;

pub use packet::Packet;
pub use store::{Multicast, ReceiveFilter};
pub use transmitter::PeerId;
