//! AES-GCM cipher selection and nonce-block handling.

use aes_gcm::{
    aead::{consts::U12, Aead},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Key, KeyInit, Nonce,
};
use zeroize::Zeroize;

use crate::core::{CryptError, NONCE_SIZE};

/// AES-192-GCM, for which the crate ships no alias of its own.
type Aes192Gcm = AesGcm<Aes192, U12>;

/// Owned key material, scrubbed on drop.
struct SecretKey(Vec<u8>);

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// AES-GCM whose strength follows the key length.
///
/// Holds the only owned copy of the key material; cipher instances are
/// built per operation and dropped immediately.
pub(super) struct GcmCipher {
    key: SecretKey,
}

impl GcmCipher {
    /// Accepts a 16, 24 or 32 byte key, selecting AES-128, AES-192 or
    /// AES-256 respectively.
    pub(super) fn new(key: &[u8]) -> Result<Self, CryptError> {
        match key.len() {
            16 | 24 | 32 => Ok(Self {
                key: SecretKey(key.to_vec()),
            }),
            len => Err(CryptError::InvalidKeyLength(len)),
        }
    }

    /// Seals `plaintext` with empty additional authenticated data.
    pub(super) fn seal(
        &self,
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        let key = &self.key.0;
        let nonce = Nonce::<U12>::from_slice(nonce);
        match key.len() {
            16 => Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key)).encrypt(nonce, plaintext),
            24 => Aes192Gcm::new(Key::<Aes192Gcm>::from_slice(key)).encrypt(nonce, plaintext),
            // Length was validated at construction.
            _ => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)).encrypt(nonce, plaintext),
        }
        .map_err(|_| CryptError::Encrypt)
    }

    /// Opens `ciphertext` (which includes the tag), verifying authenticity.
    pub(super) fn open(
        &self,
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptError> {
        let key = &self.key.0;
        let nonce = Nonce::<U12>::from_slice(nonce);
        match key.len() {
            16 => Aes128Gcm::new(Key::<Aes128Gcm>::from_slice(key)).decrypt(nonce, ciphertext),
            24 => Aes192Gcm::new(Key::<Aes192Gcm>::from_slice(key)).decrypt(nonce, ciphertext),
            // Length was validated at construction.
            _ => Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)).decrypt(nonce, ciphertext),
        }
        .map_err(|_| CryptError::Decrypt)
    }
}

/// Spreads a counter nonce into the GCM nonce width, big-endian with
/// leading zero padding.
pub(super) fn nonce_block(nonce: u128) -> [u8; NONCE_SIZE] {
    let bytes = nonce.to_be_bytes();
    let mut block = [0u8; NONCE_SIZE];
    block.copy_from_slice(&bytes[bytes.len() - NONCE_SIZE..]);
    block
}

/// Reads a counter nonce back out of its 12-byte wire form.
pub(super) fn nonce_from_block(block: &[u8; NONCE_SIZE]) -> u128 {
    let mut bytes = [0u8; 16];
    bytes[16 - NONCE_SIZE..].copy_from_slice(block);
    u128::from_be_bytes(bytes)
}
