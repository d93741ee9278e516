//! Message codec shared by all three cryptosystems
//!
//! Converts byte strings to integers and back, and splits messages into
//! ordered chunks small enough to be encrypted under a given modulus.
//!
//! # Integer encoding
//! A `0x01` sentinel byte is prepended before the big-endian conversion, so
//! leading zero bytes and the empty string survive the round trip exactly:
//! ```text
//! ""        -> 0x01
//! "\0A"     -> 0x010041
//! ```
//! The capacity of a chunk therefore counts the sentinel: a payload of
//! `len` bytes encodes to an integer below `2^(8·(len + 1))`.

use crate::error::{CryptoError, Result};
use num_bigint::{BigInt, Sign};
use num_traits::Signed;

const SENTINEL: u8 = 0x01;

/// Where a chunk may end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Anywhere; chunks are runs of exactly `capacity` bytes except the last.
    Byte,
    /// Only between UTF-8 characters; a character is never split.
    Character,
}

/// Sentinel-prefixed big-endian integer of `bytes`.
pub fn bytes_to_integer(bytes: &[u8]) -> BigInt {
    let mut framed = Vec::with_capacity(bytes.len() + 1);
    framed.push(SENTINEL);
    framed.extend_from_slice(bytes);
    BigInt::from_bytes_be(Sign::Plus, &framed)
}

/// Inverse of [`bytes_to_integer`]
///
/// # Errors
/// `InvalidFormat` if the value is negative or lacks the sentinel byte,
/// which is what a wrong key or a tampered ciphertext produces.
pub fn integer_to_bytes(value: &BigInt) -> Result<Vec<u8>> {
    if value.is_negative() {
        return Err(CryptoError::InvalidFormat("negative message integer".into()));
    }
    let (_, bytes) = value.to_bytes_be();
    match bytes.split_first() {
        Some((&SENTINEL, payload)) => Ok(payload.to_vec()),
        _ => Err(CryptoError::InvalidFormat("message integer is missing its framing byte".into())),
    }
}

/// Largest payload length whose encoding is always below `modulus`
///
/// For a `b`-bit modulus the encoded integer must stay under `2^(b-1)`,
/// which leaves `(b - 1) / 8` bytes including the sentinel.
pub fn capacity_for_modulus(modulus: &BigInt) -> usize {
    let bits = modulus.bits() as usize;
    (bits.saturating_sub(1) / 8).saturating_sub(1)
}

/// Splits `message` into ordered chunks of at most `capacity` bytes
///
/// Always returns at least one chunk; the empty message yields one empty
/// chunk. Concatenating the chunks reproduces the message byte for byte.
///
/// # Errors
/// `UnsplittableUnit` if one character (for [`Boundary::Character`]) or any
/// byte (for a zero capacity) cannot fit in a chunk.
pub fn chunk(message: &str, capacity: usize, boundary: Boundary) -> Result<Vec<&[u8]>> {
    let bytes = message.as_bytes();
    if bytes.is_empty() {
        return Ok(vec![bytes]);
    }
    if capacity == 0 {
        return Err(CryptoError::UnsplittableUnit {
            unit_len: 1,
            capacity,
        });
    }

    match boundary {
        Boundary::Byte => Ok(bytes.chunks(capacity).collect()),
        Boundary::Character => {
            let mut chunks = Vec::new();
            let mut start = 0;
            let mut end = 0;

            for ch in message.chars() {
                let unit_len = ch.len_utf8();
                if unit_len > capacity {
                    return Err(CryptoError::UnsplittableUnit { unit_len, capacity });
                }
                if end + unit_len - start > capacity {
                    chunks.push(&bytes[start..end]);
                    start = end;
                }
                end += unit_len;
            }
            chunks.push(&bytes[start..end]);

            Ok(chunks)
        }
    }
}

/// Fails with `MessageTooLarge` unless `value < modulus`.
pub fn ensure_below(value: &BigInt, modulus: &BigInt, payload_len: usize) -> Result<()> {
    if value >= modulus {
        return Err(CryptoError::MessageTooLarge {
            len: payload_len,
            capacity: capacity_for_modulus(modulus),
        });
    }
    Ok(())
}

/// Reassembled plaintext bytes as a string.
pub fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::InvalidFormat(format!("plaintext is not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_round_trip_preserves_zeros() {
        let cases: [&[u8]; 5] = [b"", b"\0", b"\0\0A", b"Hello", &[0xFF, 0x00, 0x01]];
        for bytes in cases {
            let n = bytes_to_integer(bytes);
            assert_eq!(integer_to_bytes(&n).unwrap(), bytes);
        }
    }

    #[test]
    fn test_integer_encoding_layout() {
        assert_eq!(bytes_to_integer(b""), BigInt::from(1));
        assert_eq!(bytes_to_integer(b"\0A"), BigInt::from(0x010041));
    }

    #[test]
    fn test_integer_without_sentinel_rejected() {
        assert!(integer_to_bytes(&BigInt::from(0x0241)).is_err());
        assert!(integer_to_bytes(&BigInt::from(0)).is_err());
        assert!(integer_to_bytes(&BigInt::from(-5)).is_err());
    }

    #[test]
    fn test_capacity_for_modulus() {
        let p512 = (BigInt::from(1) << 511) + 1;
        assert_eq!(capacity_for_modulus(&p512), 62);
        let m521 = (BigInt::from(1) << 521) - 1;
        assert_eq!(capacity_for_modulus(&m521), 64);
        assert_eq!(capacity_for_modulus(&BigInt::from(97)), 0);

        // The largest payload still encodes below the modulus
        let payload = vec![0xFFu8; capacity_for_modulus(&p512)];
        assert!(bytes_to_integer(&payload) < p512);
    }

    #[test]
    fn test_empty_message_is_one_chunk() {
        let chunks = chunk("", 4, Boundary::Character).unwrap();
        assert_eq!(chunks, vec![&b""[..]]);
        let chunks = chunk("", 0, Boundary::Byte).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_byte_chunks() {
        let chunks = chunk("abcdefg", 3, Boundary::Byte).unwrap();
        assert_eq!(chunks, vec![&b"abc"[..], &b"def"[..], &b"g"[..]]);
    }

    #[test]
    fn test_character_chunks_never_split_a_character() {
        let message = "aé€😀b€";
        let chunks = chunk(message, 4, Boundary::Character).unwrap();
        for c in &chunks {
            assert!(c.len() <= 4);
            assert!(std::str::from_utf8(c).is_ok());
        }
        assert_eq!(chunks.concat(), message.as_bytes());
        assert_eq!(
            chunks,
            vec!["aé".as_bytes(), "€".as_bytes(), "😀".as_bytes(), "b€".as_bytes()]
        );
    }

    #[test]
    fn test_unsplittable_character() {
        let err = chunk("ab€", 2, Boundary::Character).unwrap_err();
        assert_eq!(err, CryptoError::UnsplittableUnit { unit_len: 3, capacity: 2 });
        assert!(chunk("a", 0, Boundary::Byte).is_err());
    }

    #[test]
    fn test_ensure_below() {
        let m = BigInt::from(1000);
        assert!(ensure_below(&BigInt::from(999), &m, 1).is_ok());
        assert!(matches!(
            ensure_below(&BigInt::from(1000), &m, 1),
            Err(CryptoError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_utf8(b"ok".to_vec()).unwrap(), "ok");
        assert!(decode_utf8(vec![0xC3]).is_err());
    }
}
