//! Protocol constants.
//!
//! Wire-format values are fixed by the datagram layout and MUST NOT be
//! changed; peers that disagree on them cannot decode each other.

use std::time::Duration;

// =============================================================================
// WIRE FORMAT
// =============================================================================

/// Size of the sender identity prefixed to every datagram payload.
pub const ID_SIZE: usize = 10;

/// AES-GCM nonce size.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const TAG_SIZE: usize = 16;

/// Size of the big-endian ciphertext-length prefix of a frame.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Size of the fixed binary timestamp inside a packet.
pub const TIMESTAMP_SIZE: usize = 15;

// =============================================================================
// BUFFERS
// =============================================================================

/// Soft limit on the accumulated payload of a single datagram.
///
/// Exceeding it logs a warning but the datagram is still sent.
pub const MAX_WRITE_BUFFER_SIZE: usize = 512;

/// Receive buffer size of the multicast receive task.
pub const RECEIVE_BUFFER_SIZE: usize = 2048;

// =============================================================================
// EXPIRY SCHEDULER
// =============================================================================

/// Wait used by the expiry scheduler while the store is empty.
pub const VERY_LONG_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

// =============================================================================
// KEYS
// =============================================================================

/// All-zero AES-128 key for setups that do not care about confidentiality.
pub const DEFAULT_KEY: [u8; 16] = [0; 16];
