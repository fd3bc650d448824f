//! Binary layout for replicated items.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::core::{PacketError, TIMESTAMP_SIZE};

/// Version tag of the timestamp encoding; peers with a different version
/// fail to decode and drop the packet.
const TIMESTAMP_VERSION: u8 = 1;

/// One replicated store operation in fixed binary form.
///
/// ```text
/// offset  length      field
/// 0       2 (BE u16)  key length K
/// 2       K           key bytes
/// 2+K     15          timestamp
/// 17+K    2 (BE u16)  value length V
/// 19+K    V           value bytes
/// ```
///
/// The timestamp is 15 bytes: a version tag, seconds since the Unix epoch
/// (i64, big-endian), nanoseconds (u32, big-endian) and a zone offset in
/// minutes (i16, big-endian, always zero — instants travel as UTC). The
/// encoding round-trips a [`SystemTime`] exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Item key.
    pub key: Vec<u8>,
    /// Item timestamp.
    pub time: SystemTime,
    /// Item value.
    pub value: Vec<u8>,
}

impl Packet {
    /// Serializes the packet.
    ///
    /// Fails only on keys or values longer than the 16-bit length fields
    /// can express.
    pub fn marshal(&self) -> Result<Vec<u8>, PacketError> {
        let key_len = u16::try_from(self.key.len()).map_err(|_| PacketError::Oversize {
            field: "key",
            len: self.key.len(),
        })?;
        let value_len = u16::try_from(self.value.len()).map_err(|_| PacketError::Oversize {
            field: "value",
            len: self.value.len(),
        })?;

        let mut buffer = Vec::with_capacity(
            2 + self.key.len() + TIMESTAMP_SIZE + 2 + self.value.len(),
        );
        buffer.extend_from_slice(&key_len.to_be_bytes());
        buffer.extend_from_slice(&self.key);
        buffer.extend_from_slice(&encode_timestamp(self.time));
        buffer.extend_from_slice(&value_len.to_be_bytes());
        buffer.extend_from_slice(&self.value);

        Ok(buffer)
    }

    /// Deserializes a packet, ignoring any trailing bytes.
    pub fn unmarshal(buffer: &[u8]) -> Result<Self, PacketError> {
        if buffer.len() < 2 {
            return Err(PacketError::Truncated {
                expected: 2,
                actual: buffer.len(),
            });
        }
        let key_len = u16::from_be_bytes([buffer[0], buffer[1]]) as usize;

        let value_len_end = 2 + key_len + TIMESTAMP_SIZE + 2;
        if buffer.len() < value_len_end {
            return Err(PacketError::Truncated {
                expected: value_len_end,
                actual: buffer.len(),
            });
        }
        let key = buffer[2..2 + key_len].to_vec();
        let time = decode_timestamp(&buffer[2 + key_len..2 + key_len + TIMESTAMP_SIZE])?;
        let value_len =
            u16::from_be_bytes([buffer[value_len_end - 2], buffer[value_len_end - 1]]) as usize;

        if buffer.len() < value_len_end + value_len {
            return Err(PacketError::Truncated {
                expected: value_len_end + value_len,
                actual: buffer.len(),
            });
        }
        let value = buffer[value_len_end..value_len_end + value_len].to_vec();

        Ok(Self { key, time, value })
    }
}

fn encode_timestamp(time: SystemTime) -> [u8; TIMESTAMP_SIZE] {
    // Normalized so nanoseconds stay in [0, 1e9) even before the epoch.
    let (seconds, nanoseconds) = match time.duration_since(UNIX_EPOCH) {
        Ok(since) => (since.as_secs() as i64, since.subsec_nanos()),
        Err(err) => {
            let until = err.duration();
            if until.subsec_nanos() == 0 {
                (-(until.as_secs() as i64), 0)
            } else {
                (
                    -(until.as_secs() as i64) - 1,
                    1_000_000_000 - until.subsec_nanos(),
                )
            }
        }
    };

    let mut buffer = [0u8; TIMESTAMP_SIZE];
    buffer[0] = TIMESTAMP_VERSION;
    buffer[1..9].copy_from_slice(&seconds.to_be_bytes());
    buffer[9..13].copy_from_slice(&nanoseconds.to_be_bytes());
    buffer[13..15].copy_from_slice(&0i16.to_be_bytes());
    buffer
}

fn decode_timestamp(buffer: &[u8]) -> Result<SystemTime, PacketError> {
    if buffer[0] != TIMESTAMP_VERSION {
        return Err(PacketError::UnsupportedTimestampVersion(buffer[0]));
    }

    let seconds = i64::from_be_bytes(buffer[1..9].try_into().expect("slice of 8 bytes"));
    let nanoseconds = u32::from_be_bytes(buffer[9..13].try_into().expect("slice of 4 bytes"));
    if nanoseconds >= 1_000_000_000 {
        return Err(PacketError::InvalidTimestamp);
    }

    let time = if seconds >= 0 {
        UNIX_EPOCH.checked_add(Duration::new(seconds as u64, nanoseconds))
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(seconds.unsigned_abs()))
            .and_then(|t| t.checked_add(Duration::new(0, nanoseconds)))
    };

    time.ok_or(PacketError::InvalidTimestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_layout() {
        let packet = Packet {
            key: b"key".to_vec(),
            time: UNIX_EPOCH + Duration::new(1_400_000_000, 500),
            value: b"value".to_vec(),
        };

        let buffer = packet.marshal().unwrap();

        assert_eq!(buffer.len(), 2 + 3 + 15 + 2 + 5);
        assert_eq!(&buffer[..2], &3u16.to_be_bytes());
        assert_eq!(&buffer[2..5], b"key");
        assert_eq!(buffer[5], 1); // timestamp version
        assert_eq!(&buffer[20..22], &5u16.to_be_bytes());
        assert_eq!(&buffer[22..], b"value");
    }

    #[test]
    fn test_roundtrip() {
        let packet = Packet {
            key: b"some key".to_vec(),
            time: SystemTime::now(),
            value: vec![0xab; 300],
        };

        let decoded = Packet::unmarshal(&packet.marshal().unwrap()).unwrap();

        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_roundtrip_empty_key_and_value() {
        let packet = Packet {
            key: Vec::new(),
            time: SystemTime::now(),
            value: Vec::new(),
        };

        let decoded = Packet::unmarshal(&packet.marshal().unwrap()).unwrap();

        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_roundtrip_before_epoch() {
        let packet = Packet {
            key: b"key".to_vec(),
            time: UNIX_EPOCH - Duration::new(86_400, 250),
            value: b"value".to_vec(),
        };

        let decoded = Packet::unmarshal(&packet.marshal().unwrap()).unwrap();

        assert_eq!(decoded.time, packet.time);
    }

    #[test]
    fn test_unmarshal_ignores_trailing_bytes() {
        let packet = Packet {
            key: b"key".to_vec(),
            time: SystemTime::now(),
            value: b"value".to_vec(),
        };

        let mut buffer = packet.marshal().unwrap();
        buffer.extend_from_slice(&[0xff; 16]);

        assert_eq!(Packet::unmarshal(&buffer).unwrap(), packet);
    }

    #[test]
    fn test_unmarshal_truncated() {
        let packet = Packet {
            key: b"key".to_vec(),
            time: SystemTime::now(),
            value: b"value".to_vec(),
        };
        let buffer = packet.marshal().unwrap();

        for len in 0..buffer.len() {
            assert!(matches!(
                Packet::unmarshal(&buffer[..len]),
                Err(PacketError::Truncated { .. })
            ));
        }
    }

    #[test]
    fn test_unmarshal_unknown_timestamp_version() {
        let packet = Packet {
            key: b"key".to_vec(),
            time: SystemTime::now(),
            value: b"value".to_vec(),
        };
        let mut buffer = packet.marshal().unwrap();
        buffer[5] = 9;

        assert!(matches!(
            Packet::unmarshal(&buffer),
            Err(PacketError::UnsupportedTimestampVersion(9))
        ));
    }

    #[test]
    fn test_marshal_oversized_key() {
        let packet = Packet {
            key: vec![0; u16::MAX as usize + 1],
            time: SystemTime::now(),
            value: Vec::new(),
        };

        assert!(matches!(
            packet.marshal(),
            Err(PacketError::Oversize { field: "key", .. })
        ));
    }
}
