//! ElGamal encryption and textbook ElGamal signatures over Z_p*
//!
//! # Wire format
//! - Ciphertext: chunks joined by `|`, each chunk `c1_hex,c2_hex`
//! - Signature: `r_hex,s_hex`
//!
//! Messages are chunked at UTF-8 character boundaries so that each chunk's
//! encoding stays below p.
//!
//! # Security
//! The signature uses the raw integer of the message bytes as H(m), not a
//! cryptographic digest. Messages with equal integers modulo the order of g
//! share signatures, and existential forgeries are easy. Kept for
//! compatibility with existing signatures.

use crate::bigint::{
    from_be_bytes, gcd, mod_floor, mod_inverse, mod_pow, parse_hex, random_in_range,
    random_prime, to_hex,
};
use crate::codec::{self, Boundary};
use crate::config::{CryptoConfig, KeygenBudget};
use crate::error::{CryptoError, Result};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use tracing::{debug, info, instrument, warn};

/// Generator used for every key
pub const GENERATOR: u32 = 2;

const CHUNK_SEPARATOR: &str = "|";
const FIELD_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElGamalPublicKey {
    pub p: BigInt,
    pub g: BigInt,
    pub y: BigInt,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ElGamalKeyPair {
    pub public: ElGamalPublicKey,
    x: BigInt,
}

impl std::fmt::Debug for ElGamalKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElGamalKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl ElGamalKeyPair {
    /// Random `bits`-bit prime p, g = 2, private x in [1, p - 1)
    ///
    /// A private key giving `y = 1` is redrawn.
    #[instrument(level = "info", skip(budget))]
    pub fn generate(bits: usize, rounds: usize, budget: &KeygenBudget) -> Result<Self> {
        let p = random_prime(bits as u64, rounds, budget)?;
        let g = BigInt::from(GENERATOR);
        let one = BigInt::one();
        let p_minus_1 = &p - &one;

        let mut attempt = 0usize;
        loop {
            budget.check(attempt, "ElGamal private key")?;
            attempt += 1;

            let x = random_in_range(&one, &p_minus_1)?;
            let y = mod_pow(&g, &x, &p)?;
            if y.is_one() {
                warn!("private key yields a trivial public key, resampling");
                continue;
            }

            info!(bits = p.bits(), "generated ElGamal key pair");
            return Ok(Self {
                public: ElGamalPublicKey { p, g, y },
                x,
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct ElGamalEngine {
    keys: ElGamalKeyPair,
    max_attempts: usize,
}

impl ElGamalEngine {
    pub fn new(keys: ElGamalKeyPair) -> Self {
        Self {
            keys,
            max_attempts: CryptoConfig::default().keygen_max_attempts,
        }
    }

    /// Caps the ephemeral-key draws of one signature
    pub fn with_max_attempts(self, max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    pub fn generate(config: &CryptoConfig) -> Result<Self> {
        let keys = ElGamalKeyPair::generate(
            config.elgamal_bits,
            config.miller_rabin_rounds,
            &config.keygen_budget(),
        )?;
        Ok(Self::new(keys).with_max_attempts(config.keygen_max_attempts))
    }

    pub fn public_key(&self) -> &ElGamalPublicKey {
        &self.keys.public
    }

    /// Largest chunk in bytes: `(bits(p) - 1) / 8 - 1`
    pub fn chunk_capacity(&self) -> usize {
        codec::capacity_for_modulus(&self.keys.public.p)
    }

    fn ephemeral(&self) -> Result<BigInt> {
        let p_minus_1 = &self.keys.public.p - 1u32;
        random_in_range(&BigInt::one(), &p_minus_1)
    }

    #[instrument(level = "debug", skip_all)]
    pub fn encrypt(&self, message: &str) -> Result<String> {
        let ElGamalPublicKey { p, g, y } = &self.keys.public;
        let chunks = codec::chunk(message, self.chunk_capacity(), Boundary::Character)?;

        let mut encrypted = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let m = codec::bytes_to_integer(chunk);
            codec::ensure_below(&m, p, chunk.len())?;

            let k = self.ephemeral()?;
            let c1 = mod_pow(g, &k, p)?;
            let c2 = (m * mod_pow(y, &k, p)?) % p;
            encrypted.push(format!("{}{}{}", to_hex(&c1), FIELD_SEPARATOR, to_hex(&c2)));
        }

        debug!(chunks = encrypted.len(), "encrypted ElGamal message");
        Ok(encrypted.join(CHUNK_SEPARATOR))
    }

    #[instrument(level = "debug", skip_all)]
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let p = &self.keys.public.p;

        let mut plaintext = Vec::new();
        for chunk in ciphertext.trim().split(CHUNK_SEPARATOR) {
            let (c1, c2) = parse_pair(chunk, "ciphertext chunk")?;
            if c1.is_zero() || &c1 >= p || &c2 >= p {
                return Err(CryptoError::InvalidFormat("ciphertext value out of range".into()));
            }

            let s = mod_pow(&c1, &self.keys.x, p)?;
            let m = (c2 * mod_inverse(&s, p)?) % p;
            plaintext.extend(codec::integer_to_bytes(&m)?);
        }

        codec::decode_utf8(plaintext)
    }

    /// `r = g^k`, `s = k^(-1)·(H(m) - x·r) mod (p - 1)` with gcd(k, p - 1) = 1
    #[instrument(level = "debug", skip_all)]
    pub fn sign(&self, message: &str) -> Result<String> {
        let ElGamalPublicKey { p, g, .. } = &self.keys.public;
        let p_minus_1 = p - 1u32;
        let h = from_be_bytes(message.as_bytes());
        let budget = KeygenBudget::new(self.max_attempts);

        let mut attempt = 0usize;
        loop {
            budget.check(attempt, "ElGamal signing nonce")?;
            attempt += 1;

            let k = self.ephemeral()?;
            if !gcd(&k, &p_minus_1).is_one() {
                continue;
            }

            let r = mod_pow(g, &k, p)?;
            let k_inv = mod_inverse(&k, &p_minus_1)?;
            let s = mod_floor(&(k_inv * (&h - &self.keys.x * &r)), &p_minus_1)?;
            if s.is_zero() {
                continue;
            }

            return Ok(format!("{}{}{}", to_hex(&r), FIELD_SEPARATOR, to_hex(&s)));
        }
    }

    /// Checks `g^H(m) ≡ y^r · r^s (mod p)`
    ///
    /// Out-of-range `r` or `s` verify as `false`.
    ///
    /// # Errors
    /// `InvalidFormat` unless `signature` is two comma-separated hex fields.
    #[instrument(level = "debug", skip_all)]
    pub fn verify(&self, message: &str, signature: &str) -> Result<bool> {
        let ElGamalPublicKey { p, g, y } = &self.keys.public;
        let (r, s) = parse_pair(signature.trim(), "signature")?;

        let p_minus_1 = p - 1u32;
        if r.is_zero() || &r >= p || s.is_zero() || s >= p_minus_1 {
            return Ok(false);
        }

        let h = from_be_bytes(message.as_bytes());
        let lhs = mod_pow(g, &h, p)?;
        let rhs = (mod_pow(y, &r, p)? * mod_pow(&r, &s, p)?) % p;
        Ok(lhs == rhs)
    }
}

fn parse_pair(text: &str, what: &str) -> Result<(BigInt, BigInt)> {
    let mut fields = text.split(FIELD_SEPARATOR);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(a), Some(b), None) => Ok((parse_hex(a)?, parse_hex(b)?)),
        _ => Err(CryptoError::InvalidFormat(format!(
            "{} must be two comma-separated hex fields",
            what
        ))),
    }
}
