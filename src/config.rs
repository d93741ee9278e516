//! Runtime configuration
//!
//! Key sizes and search limits for the three cryptosystems. Values can be
//! loaded from a JSON file; any field left out falls back to its default.

use crate::error::{CryptoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};

/// Smallest Miller-Rabin round count accepted (false positive ≤ 4^-20).
pub const MIN_MILLER_RABIN_ROUNDS: usize = 20;

/// Smallest RSA modulus that still leaves room for one OAEP-SHA256 payload byte.
pub const MIN_RSA_BITS: usize = 544;

/// Smallest ElGamal prime giving a non-zero chunk capacity.
pub const MIN_ELGAMAL_BITS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Bit length of the RSA modulus n = p·q
    pub rsa_bits: usize,
    /// Bit length of the ElGamal prime p
    pub elgamal_bits: usize,
    /// Miller-Rabin rounds per candidate
    pub miller_rabin_rounds: usize,
    /// Candidates tried by one prime or point search before giving up
    pub keygen_max_attempts: usize,
    /// Wall-clock limit for one key generation, if any
    pub keygen_timeout_secs: Option<u64>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            rsa_bits: 2048,
            elgamal_bits: 512,
            miller_rabin_rounds: MIN_MILLER_RABIN_ROUNDS,
            keygen_max_attempts: 20_000,
            keygen_timeout_secs: None,
        }
    }
}

impl CryptoConfig {
    /// Reads a configuration from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CryptoError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| CryptoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rsa_bits < MIN_RSA_BITS || self.rsa_bits % 2 != 0 {
            return Err(CryptoError::Config(format!(
                "rsa_bits must be even and at least {}, got {}",
                MIN_RSA_BITS, self.rsa_bits
            )));
        }
        if self.elgamal_bits < MIN_ELGAMAL_BITS {
            return Err(CryptoError::Config(format!(
                "elgamal_bits must be at least {}, got {}",
                MIN_ELGAMAL_BITS, self.elgamal_bits
            )));
        }
        if self.miller_rabin_rounds < MIN_MILLER_RABIN_ROUNDS {
            return Err(CryptoError::Config(format!(
                "miller_rabin_rounds must be at least {}, got {}",
                MIN_MILLER_RABIN_ROUNDS, self.miller_rabin_rounds
            )));
        }
        if self.keygen_max_attempts == 0 {
            return Err(CryptoError::Config("keygen_max_attempts must be positive".into()));
        }
        Ok(())
    }

    /// Fresh budget for one key generation, starting the clock now.
    pub fn keygen_budget(&self) -> KeygenBudget {
        let budget = KeygenBudget::new(self.keygen_max_attempts);
        match self.keygen_timeout_secs {
            Some(secs) => budget.with_timeout(Duration::from_secs(secs)),
            None => budget,
        }
    }
}

/// Retry cap and optional deadline for the prime and point search loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeygenBudget {
    pub max_attempts: usize,
    pub deadline: Option<Instant>,
}

impl KeygenBudget {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..self
        }
    }

    /// Fails once `attempt` (zero-based) reaches the cap or the deadline has passed.
    pub fn check(&self, attempt: usize, what: &str) -> Result<()> {
        if attempt >= self.max_attempts {
            return Err(CryptoError::KeyGenerationFailure(format!(
                "{} not found after {} attempts",
                what, self.max_attempts
            )));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CryptoError::KeyGenerationFailure(format!(
                    "{} search timed out after {} attempts",
                    what, attempt
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CryptoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rsa_bits, 2048);
        assert_eq!(config.elgamal_bits, 512);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CryptoConfig::from_json_str(r#"{"rsa_bits": 1024}"#).unwrap();
        assert_eq!(config.rsa_bits, 1024);
        assert_eq!(config.elgamal_bits, 512);
        assert_eq!(config.miller_rabin_rounds, 20);
    }

    #[test]
    fn test_rejects_weak_settings() {
        assert!(CryptoConfig::from_json_str(r#"{"miller_rabin_rounds": 5}"#).is_err());
        assert!(CryptoConfig::from_json_str(r#"{"rsa_bits": 256}"#).is_err());
        assert!(CryptoConfig::from_json_str(r#"{"rsa_bits": 1025}"#).is_err());
        assert!(CryptoConfig::from_json_str(r#"{"keygen_max_attempts": 0}"#).is_err());
        assert!(CryptoConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_budget_attempt_cap() {
        let budget = KeygenBudget::new(3);
        assert!(budget.check(2, "prime").is_ok());
        assert!(matches!(
            budget.check(3, "prime"),
            Err(CryptoError::KeyGenerationFailure(_))
        ));
    }

    #[test]
    fn test_budget_expired_deadline() {
        let budget = KeygenBudget::new(10).with_timeout(Duration::ZERO);
        assert!(matches!(
            budget.check(0, "prime"),
            Err(CryptoError::KeyGenerationFailure(_))
        ));
    }
}
