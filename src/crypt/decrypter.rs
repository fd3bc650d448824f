//! Opening side of the frame codec.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::core::{CryptError, LENGTH_PREFIX_SIZE, NONCE_SIZE};

use super::cipher::{nonce_from_block, GcmCipher};

/// Opens AES-GCM frames from an underlying reader.
pub struct Decrypter<R> {
    parent: R,
    cipher: GcmCipher,
}

impl<R: AsyncRead + Unpin> Decrypter<R> {
    /// Creates a decrypter that reads frames from `parent`.
    ///
    /// The key must be 16, 24 or 32 bytes long, selecting AES-128, AES-192
    /// or AES-256.
    pub fn new(parent: R, key: &[u8]) -> Result<Self, CryptError> {
        Ok(Self {
            parent,
            cipher: GcmCipher::new(key)?,
        })
    }

    /// Reads exactly one frame and opens it.
    ///
    /// Returns the frame's nonce and the number of plaintext bytes copied
    /// into `buf` (at most `buf.len()`). A tag mismatch surfaces as
    /// [`CryptError::Decrypt`], a short read as the underlying I/O error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<(u128, usize), CryptError> {
        let mut length = [0u8; LENGTH_PREFIX_SIZE];
        self.parent.read_exact(&mut length).await?;
        let length = u16::from_be_bytes(length) as usize;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.parent.read_exact(&mut nonce_bytes).await?;

        let mut ciphertext = vec![0u8; length];
        self.parent.read_exact(&mut ciphertext).await?;

        let plaintext = self.cipher.open(&nonce_bytes, &ciphertext)?;
        let n = plaintext.len().min(buf.len());
        buf[..n].copy_from_slice(&plaintext[..n]);

        Ok((nonce_from_block(&nonce_bytes), n))
    }
}
