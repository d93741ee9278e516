//! Error taxonomy shared by every engine.
//!
//! Each variant maps to one externally observable failure through
//! [`CryptoError::kind`], so an outer request layer can report errors
//! without matching on display strings.

use thiserror::Error;

/// Errors produced by arithmetic, encoding and the cryptosystems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Malformed ciphertext or signature record: wrong field count,
    /// unparsable number, bad base64/JSON, or non-UTF-8 plaintext.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A single-block payload does not fit under the modulus.
    #[error("message too large: {len} bytes exceeds capacity of {capacity} bytes")]
    MessageTooLarge { len: usize, capacity: usize },

    /// One indivisible unit (a character or a byte block) alone exceeds the
    /// chunk capacity.
    #[error("unsplittable unit: {unit_len} bytes cannot fit in a {capacity}-byte chunk")]
    UnsplittableUnit { unit_len: usize, capacity: usize },

    /// A prime or coprimality search ran out of attempts or time.
    #[error("key generation failed: {0}")]
    KeyGenerationFailure(String),

    /// Modular inverse requested for an element sharing a factor with the modulus.
    #[error("element is not invertible modulo the given modulus")]
    NotInvertible,

    /// An operation with no defined result (zero modulus, empty range, singular curve).
    #[error("arithmetic undefined: {0}")]
    ArithmeticUndefined(String),

    /// Coordinates that do not satisfy the curve equation.
    #[error("point is not on the curve")]
    InvalidPoint,

    /// Padding or integrity check failed while decrypting.
    #[error("decryption failed: {0}")]
    DecryptionFailure(String),

    /// Algorithm selector not recognised.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Configuration could not be loaded or is out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CryptoError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CryptoError::InvalidFormat(_) => "invalid_format",
            CryptoError::MessageTooLarge { .. } => "message_too_large",
            CryptoError::UnsplittableUnit { .. } => "unsplittable_unit",
            CryptoError::KeyGenerationFailure(_) => "key_generation_failure",
            CryptoError::NotInvertible => "not_invertible",
            CryptoError::ArithmeticUndefined(_) => "arithmetic_undefined",
            CryptoError::InvalidPoint => "invalid_point",
            CryptoError::DecryptionFailure(_) => "decryption_failure",
            CryptoError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            CryptoError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct() {
        let errors = [
            CryptoError::InvalidFormat(String::new()),
            CryptoError::MessageTooLarge { len: 1, capacity: 0 },
            CryptoError::UnsplittableUnit { unit_len: 1, capacity: 0 },
            CryptoError::KeyGenerationFailure(String::new()),
            CryptoError::NotInvertible,
            CryptoError::ArithmeticUndefined(String::new()),
            CryptoError::InvalidPoint,
            CryptoError::DecryptionFailure(String::new()),
            CryptoError::UnsupportedAlgorithm(String::new()),
            CryptoError::Config(String::new()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(CryptoError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn display_includes_sizes() {
        let err = CryptoError::UnsplittableUnit { unit_len: 4, capacity: 3 };
        assert_eq!(
            err.to_string(),
            "unsplittable unit: 4 bytes cannot fit in a 3-byte chunk"
        );
    }
}
