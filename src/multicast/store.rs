//! The replicated store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::core::{CryptError, Error, Fader, Result, RECEIVE_BUFFER_SIZE};
use crate::crypt::{Decrypter, Encrypter};
use crate::store::Item;

use super::packet::Packet;
use super::socket::{self, DatagramReader, DatagramWriter};
use super::transmitter::{self, PeerId, Receiver, Sender};

/// Predicate consulted for every received item before it is applied to
/// the parent store; return `false` to drop the item.
pub type ReceiveFilter = Arc<dyn Fn(&[u8], SystemTime, &[u8]) -> bool + Send + Sync>;

/// A store that mirrors writes across a UDP multicast group.
///
/// Wraps a parent [`Fader`] and delegates all reads to it. A `put` is
/// published to the group as one encrypted datagram before it is applied
/// to the parent; a background task applies datagrams of other group
/// members to the parent. Members sharing a group address and key thereby
/// converge on the same data.
///
/// Replication is best-effort eventual: there is no retransmission, no
/// ordering across senders and no durability. Per sender, receivers
/// observe puts in the order they were issued; out-of-order datagrams are
/// dropped rather than reordered.
pub struct Multicast<F> {
    parent: Arc<F>,
    /// Taken (and the outbound socket with it dropped) on close.
    sender: Mutex<Option<Sender<DatagramWriter>>>,
    id: PeerId,
    close: mpsc::Sender<()>,
}

impl<F: Fader + 'static> Multicast<F> {
    /// Creates a replicated store over `parent`.
    ///
    /// `address` names an IPv4 multicast group as `a.b.c.d:port`; all
    /// group members must use the same address and the same `key` (16, 24
    /// or 32 bytes, selecting AES-128/192/256). `id` is this member's
    /// 10-byte identity; pass `None` for a random one. `filter`, if
    /// provided, admits or drops every received item.
    pub async fn new(
        parent: F,
        address: &str,
        key: &[u8],
        id: Option<&[u8]>,
        filter: Option<ReceiveFilter>,
    ) -> Result<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(CryptError::InvalidKeyLength(key.len()).into());
        }

        let group = lookup_host(address)
            .await
            .ok()
            .and_then(|mut addresses| {
                addresses.find_map(|address| match address {
                    SocketAddr::V4(v4) => Some(v4),
                    SocketAddr::V6(_) => None,
                })
            })
            .ok_or_else(|| Error::AddressResolution(address.to_string()))?;

        let incoming = socket::listen(group)?;
        let outgoing = socket::dial(group)?;

        let decrypter = Decrypter::new(DatagramReader::new(incoming), key)?;
        let encrypter = Encrypter::new(DatagramWriter::new(outgoing), key)?;
        let (sender, receiver) = transmitter::pair(encrypter, decrypter, id);
        let id = sender.id();

        let parent = Arc::new(parent);
        let (close, close_rx) = mpsc::channel(1);
        tokio::spawn(receive_loop(
            receiver,
            Arc::clone(&parent),
            filter,
            close_rx,
        ));

        info!(%group, %id, "joined multicast group");

        Ok(Self {
            parent,
            sender: Mutex::new(Some(sender)),
            id,
            close,
        })
    }

    /// This member's identity on the group.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// The parent store reads are delegated to.
    ///
    /// The parent's lifecycle stays with the caller; closing the
    /// replicated store does not close the parent.
    pub fn parent(&self) -> &F {
        &self.parent
    }
}

#[async_trait]
impl<F: Fader + 'static> Fader for Multicast<F> {
    /// Publishes the item to the group, then stores it in the parent.
    ///
    /// If the send fails, the error is returned and the parent is left
    /// untouched. The send and the local application are not atomic: a
    /// crash between the two leaves the group with a copy this node lacks,
    /// which non-durable semantics tolerate.
    async fn put(&self, key: &[u8], time: SystemTime, value: &[u8]) -> Result<()> {
        let packet = Packet {
            key: key.to_vec(),
            time,
            value: value.to_vec(),
        }
        .marshal()?;

        {
            let mut guard = self.sender.lock().await;
            let sender = guard.as_mut().ok_or(Error::Closed)?;
            sender.write(&packet);
            if let Err(err) = sender.flush().await {
                sender.clear();
                return Err(err.into());
            }
        }

        self.parent.put(key, time, value).await
    }

    async fn get(&self, key: &[u8]) -> Option<(SystemTime, Vec<u8>)> {
        self.parent.get(key).await
    }

    async fn earliest(&self) -> Option<Item> {
        self.parent.earliest().await
    }

    async fn select(&self, key: &[u8]) -> Vec<(SystemTime, Vec<u8>)> {
        self.parent.select(key).await
    }

    async fn size(&self) -> usize {
        self.parent.size().await
    }

    /// Closes both sockets and refuses further puts: the send half is
    /// dropped here, releasing the outbound socket, and the signalled
    /// receive task drops the inbound socket on exit. The parent store is
    /// not closed.
    async fn close(&self) -> Result<()> {
        match self.sender.lock().await.take() {
            Some(sender) => drop(sender),
            None => return Err(Error::Closed),
        }
        // A receiver that already terminated on its own is fine.
        let _ = self.close.send(()).await;
        Ok(())
    }
}

/// Applies datagrams from other group members to the parent store.
///
/// Transient read and decode failures are logged and the loop continues;
/// an attacker or corruption cannot take the node down. A parent `put`
/// failure is unrecoverable for this store and terminates the receiver.
async fn receive_loop<F: Fader>(
    mut receiver: Receiver<DatagramReader>,
    parent: Arc<F>,
    filter: Option<ReceiveFilter>,
    mut close: mpsc::Receiver<()>,
) {
    let mut buffer = vec![0u8; RECEIVE_BUFFER_SIZE];
    loop {
        let n = tokio::select! {
            _ = close.recv() => return,
            result = receiver.read(&mut buffer) => match result {
                Ok(n) => n,
                Err(err) => {
                    debug!("dropping undecryptable datagram: {err}");
                    continue;
                }
            },
        };

        let packet = match Packet::unmarshal(&buffer[..n]) {
            Ok(packet) => packet,
            Err(err) => {
                warn!("dropping undecodable packet: {err}");
                continue;
            }
        };

        if let Some(filter) = &filter {
            if !filter(&packet.key, packet.time, &packet.value) {
                debug!("receive filter dropped an item");
                continue;
            }
        }

        if let Err(err) = parent.put(&packet.key, packet.time, &packet.value).await {
            error!("failed to apply a received item, stopping receiver: {err}");
            return;
        }
    }
}
