//! Error types.

use thiserror::Error;

/// Convenience alias for results carrying the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors of the encrypted frame layer and the transmitter on top of it.
#[derive(Debug, Error)]
pub enum CryptError {
    /// The key is not 16, 24 or 32 bytes long.
    #[error("invalid key length {0}, expected 16, 24 or 32 bytes")]
    InvalidKeyLength(usize),

    /// A datagram carried a nonce at or below the highest one accepted
    /// from its sender.
    #[error("tried to decrypt with a previously used nonce")]
    InvalidNonce,

    /// AEAD sealing failed.
    #[error("encryption failed")]
    Encrypt,

    /// AEAD opening failed (tag mismatch or corrupted frame).
    #[error("decryption failed")]
    Decrypt,

    /// The plaintext does not fit the 16-bit ciphertext-length prefix.
    #[error("payload of {0} bytes exceeds the frame size limit")]
    PayloadTooLarge(usize),

    /// I/O error from the underlying reader or writer.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors of the binary packet codec.
#[derive(Debug, Error)]
pub enum PacketError {
    /// The buffer ends before the length fields say it should.
    #[error("packet truncated: need {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the length fields read so far.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// A key or value is too long for its 16-bit length field.
    #[error("{field} of {len} bytes exceeds the 16-bit length field")]
    Oversize {
        /// Which field overflowed.
        field: &'static str,
        /// Its actual length.
        len: usize,
    },

    /// The timestamp field uses an encoding version this peer does not know.
    #[error("unsupported timestamp encoding version {0}")]
    UnsupportedTimestampVersion(u8),

    /// The timestamp field does not describe a representable instant.
    #[error("timestamp is not representable")]
    InvalidTimestamp,
}

/// Top-level errors reported at the store boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// Frame layer error.
    #[error("crypt error: {0}")]
    Crypt(#[from] CryptError),

    /// Packet codec error.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// The multicast group address did not resolve.
    #[error("failed to resolve multicast address {0:?}")]
    AddressResolution(String),

    /// Operation on a store that has already been closed.
    #[error("store is closed")]
    Closed,

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
