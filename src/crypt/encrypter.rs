//! Sealing side of the frame codec.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::core::{CryptError, LENGTH_PREFIX_SIZE, NONCE_SIZE, TAG_SIZE};

use super::cipher::{nonce_block, GcmCipher};

/// Seals plaintext records into AES-GCM frames on an underlying writer.
///
/// Each call to [`write`](Encrypter::write) emits one complete frame with
/// a single write, so that over a datagram transport one frame lands in
/// exactly one datagram.
pub struct Encrypter<W> {
    parent: W,
    cipher: GcmCipher,
}

impl<W: AsyncWrite + Unpin> Encrypter<W> {
    /// Creates an encrypter that writes frames to `parent`.
    ///
    /// The key must be 16, 24 or 32 bytes long, selecting AES-128, AES-192
    /// or AES-256.
    pub fn new(parent: W, key: &[u8]) -> Result<Self, CryptError> {
        Ok(Self {
            parent,
            cipher: GcmCipher::new(key)?,
        })
    }

    /// Seals `plaintext` under `nonce` and writes the frame.
    ///
    /// The caller owns nonce discipline; the codec never increments or
    /// reuses nonces itself. Returns the plaintext length. If the
    /// underlying writer fails partway, written bytes are not undone.
    pub async fn write(&mut self, nonce: u128, plaintext: &[u8]) -> Result<usize, CryptError> {
        if plaintext.len() + TAG_SIZE > u16::MAX as usize {
            return Err(CryptError::PayloadTooLarge(plaintext.len()));
        }

        let nonce_bytes = nonce_block(nonce);
        let ciphertext = self.cipher.seal(&nonce_bytes, plaintext)?;

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + NONCE_SIZE + ciphertext.len());
        frame.extend_from_slice(&(ciphertext.len() as u16).to_be_bytes());
        frame.extend_from_slice(&nonce_bytes);
        frame.extend_from_slice(&ciphertext);

        self.parent.write_all(&frame).await?;
        self.parent.flush().await?;

        Ok(plaintext.len())
    }

    /// Consumes the encrypter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.parent
    }
}
