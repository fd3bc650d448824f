//! Per-sender framing: identity, nonce discipline, self-echo and replay
//! filtering.
//!
//! The transmitter sits between the packet codec and the frame codec. It
//! is constructed as a pair of halves so the two flows the store runs —
//! one writer flow in `put`, one reader task — each own their state
//! outright: the [`Sender`] holds the write accumulator and the send
//! nonce, the [`Receiver`] holds the peer-nonce table.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use crate::core::{CryptError, ID_SIZE, MAX_WRITE_BUFFER_SIZE};
use crate::crypt::{Decrypter, Encrypter};

/// The 10-byte sender identity heading every datagram payload.
///
/// Receivers use it to ignore their own multicast loopback traffic and to
/// key the replay-defense nonce table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PeerId([u8; ID_SIZE]);

impl PeerId {
    /// Generates a cryptographically random identity.
    pub fn random() -> Self {
        let mut id = [0u8; ID_SIZE];
        OsRng.fill_bytes(&mut id);
        Self(id)
    }

    /// Uses `id` if it is exactly 10 bytes long, otherwise generates a
    /// random identity.
    pub fn from_optional(id: Option<&[u8]>) -> Self {
        match id {
            Some(bytes) if bytes.len() == ID_SIZE => {
                let mut id = [0u8; ID_SIZE];
                id.copy_from_slice(bytes);
                Self(id)
            }
            _ => Self::random(),
        }
    }

    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }

    fn from_wire(bytes: &[u8]) -> Self {
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&bytes[..ID_SIZE]);
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Creates the two transmitter halves sharing the identity `id` (random
/// if absent or not 10 bytes long).
pub fn pair<W, R>(
    writer: Encrypter<W>,
    reader: Decrypter<R>,
    id: Option<&[u8]>,
) -> (Sender<W>, Receiver<R>) {
    let id = PeerId::from_optional(id);
    (
        Sender {
            writer,
            write_buffer: Vec::new(),
            id,
            nonce: 0,
        },
        Receiver {
            reader,
            id,
            peer_nonces: HashMap::new(),
        },
    )
}

/// Sending half: accumulates payload bytes and flushes them as one
/// identity-prefixed, sealed datagram under a monotonic nonce.
pub struct Sender<W> {
    writer: Encrypter<W>,
    write_buffer: Vec<u8>,
    id: PeerId,
    nonce: u128,
}

impl<W: AsyncWrite + Unpin> Sender<W> {
    /// This sender's identity.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// The next nonce to be consumed; equals the number of flush attempts
    /// so far.
    pub fn nonce(&self) -> u128 {
        self.nonce
    }

    /// Appends `payload` to the write accumulator. Nothing is sent until
    /// [`flush`](Sender::flush).
    pub fn write(&mut self, payload: &[u8]) {
        self.write_buffer.extend_from_slice(payload);
    }

    /// Discards any accumulated payload.
    pub fn clear(&mut self) {
        self.write_buffer.clear();
    }

    /// Sends the accumulated payload as one datagram.
    ///
    /// The nonce slot is consumed by the cipher before the socket write,
    /// so the counter advances even when the write fails; receivers never
    /// see a nonce reused. The accumulator is cleared only on success.
    pub async fn flush(&mut self) -> Result<(), CryptError> {
        if self.write_buffer.len() > MAX_WRITE_BUFFER_SIZE {
            warn!(
                size = self.write_buffer.len(),
                limit = MAX_WRITE_BUFFER_SIZE,
                "sending an oversized multicast datagram"
            );
        }

        let mut payload = Vec::with_capacity(ID_SIZE + self.write_buffer.len());
        payload.extend_from_slice(self.id.as_bytes());
        payload.extend_from_slice(&self.write_buffer);

        let result = self.writer.write(self.nonce, &payload).await;
        self.nonce += 1;
        result?;

        self.write_buffer.clear();
        Ok(())
    }
}

/// Receiving half: filters out this sender's own loopback datagrams and
/// replays, then hands payloads up.
pub struct Receiver<R> {
    reader: Decrypter<R>,
    id: PeerId,
    peer_nonces: HashMap<PeerId, u128>,
}

impl<R: AsyncRead + Unpin> Receiver<R> {
    /// This receiver's identity (shared with its sender half).
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Reads the next admissible payload into `buf`, returning its length.
    ///
    /// Datagrams bearing this transmitter's own identity and datagrams
    /// whose nonce does not exceed the highest one accepted from their
    /// sender are dropped silently and the read continues. Frame-level
    /// errors surface to the caller.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, CryptError> {
        let mut frame = vec![0u8; ID_SIZE + buf.len()];
        loop {
            let (nonce, n) = self.reader.read(&mut frame).await?;
            if n < ID_SIZE {
                debug!(size = n, "dropping runt datagram");
                continue;
            }

            let peer = PeerId::from_wire(&frame[..ID_SIZE]);
            if peer == self.id {
                // Own multicast loopback.
                continue;
            }
            if let Err(CryptError::InvalidNonce) = self.accept_nonce(peer, nonce) {
                debug!(%peer, nonce, "dropping replayed datagram");
                continue;
            }

            let payload = &frame[ID_SIZE..n];
            let len = payload.len().min(buf.len());
            buf[..len].copy_from_slice(&payload[..len]);
            return Ok(len);
        }
    }

    /// Accepts `nonce` iff it is strictly greater than the highest nonce
    /// recorded for `peer`; the first nonce of an unknown peer is always
    /// accepted.
    fn accept_nonce(&mut self, peer: PeerId, nonce: u128) -> Result<(), CryptError> {
        match self.peer_nonces.entry(peer) {
            Entry::Occupied(mut entry) => {
                if nonce > *entry.get() {
                    entry.insert(nonce);
                    Ok(())
                } else {
                    Err(CryptError::InvalidNonce)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(nonce);
                Ok(())
            }
        }
    }
}
