//! Length-prefixed AES-GCM record framing.
//!
//! A frame on the wire:
//!
//! ```text
//!  0           2                14                      14+L
//! +-----------+----------------+-----------------------+
//! | length    | nonce (12 B)   | ciphertext (L bytes)  |
//! | (2 B BE)  | big-endian pad | AES-GCM(payload,tag)  |
//! +-----------+----------------+-----------------------+
//! ```
//!
//! The length field counts the ciphertext including its 16-byte
//! authentication tag. Additional authenticated data is empty. The codec
//! is stateless apart from the nonce passed per call; nonce monotonicity
//! is owned by the caller.

mod cipher;
mod decrypter;
mod encrypter;

pub use decrypter::Decrypter;
pub use encrypter::Encrypter;
