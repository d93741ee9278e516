//! RSA with OAEP-SHA256 encryption and PKCS#1 v1.5 SHA-256 signatures
//!
//! # Wire format
//! - Ciphertext: `base64(JSON array of base64(k-byte block))`, one block per
//!   chunk of at most `k - 66` message bytes
//! - Signature: `base64(k-byte signature)`
//!
//! `k` is the modulus length in bytes. Decryption and signing use the CRT
//! form of the private key.

pub mod padding;
pub mod textbook;

use crate::bigint::{
    from_be_bytes, gcd, mod_floor, mod_inverse, mod_pow, random_prime, to_be_bytes_padded,
};
use crate::codec::{self, Boundary};
use crate::config::{CryptoConfig, KeygenBudget};
use crate::error::{CryptoError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use num_bigint::BigInt;
use num_traits::{One, Signed};
use padding::{OAEP_OVERHEAD, oaep_decode, oaep_encode, pkcs1_v15_encode};
use tracing::{debug, info, instrument, warn};

/// Fixed public exponent F4
pub const PUBLIC_EXPONENT: u32 = 65537;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub n: BigInt,
    pub e: BigInt,
}

impl RsaPublicKey {
    /// Modulus length in bytes
    pub fn size(&self) -> usize {
        self.n.bits().div_ceil(8) as usize
    }

    /// `m^e mod n`
    fn encrypt_raw(&self, m: &BigInt) -> Result<BigInt> {
        if m.is_negative() || m >= &self.n {
            return Err(CryptoError::MessageTooLarge {
                len: self.size(),
                capacity: self.size(),
            });
        }
        mod_pow(m, &self.e, &self.n)
    }
}

/// Private exponent with its CRT components; never leaves the engine.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    n: BigInt,
    d: BigInt,
    p: BigInt,
    q: BigInt,
    dp: BigInt,
    dq: BigInt,
    qinv: BigInt,
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.n.bits())
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    /// `c^d mod n` via the Chinese remainder theorem
    fn decrypt_raw(&self, c: &BigInt) -> Result<BigInt> {
        let m1 = mod_pow(c, &self.dp, &self.p)?;
        let m2 = mod_pow(c, &self.dq, &self.q)?;
        let h = mod_floor(&(&self.qinv * (m1 - &m2)), &self.p)?;
        Ok(m2 + h * &self.q)
    }

    pub fn d(&self) -> &BigInt {
        &self.d
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl RsaKeyPair {
    /// Generates a key pair whose modulus has exactly `bits` bits
    ///
    /// Draws two distinct `bits / 2`-bit primes and resamples both whenever
    /// `gcd(e, phi) != 1`.
    ///
    /// # Errors
    /// `KeyGenerationFailure` once `budget` is exhausted.
    #[instrument(level = "info", skip(budget))]
    pub fn generate(bits: usize, rounds: usize, budget: &KeygenBudget) -> Result<Self> {
        let half = (bits / 2) as u64;
        let e = BigInt::from(PUBLIC_EXPONENT);
        let one = BigInt::one();

        let mut attempt = 0usize;
        loop {
            budget.check(attempt, "RSA key pair")?;
            attempt += 1;

            let p = random_prime(half, rounds, budget)?;
            let q = random_prime(half, rounds, budget)?;
            if p == q {
                warn!("drew the same prime twice, resampling");
                continue;
            }

            let phi = (&p - &one) * (&q - &one);
            if !gcd(&e, &phi).is_one() {
                warn!("public exponent shares a factor with phi, resampling");
                continue;
            }

            let key = Self::from_primes(p, q, &e, &phi)?;
            info!(bits = key.public.n.bits(), attempts = attempt, "generated RSA key pair");
            return Ok(key);
        }
    }

    fn from_primes(p: BigInt, q: BigInt, e: &BigInt, phi: &BigInt) -> Result<Self> {
        let one = BigInt::one();
        let n = &p * &q;
        let d = mod_inverse(e, phi)?;
        let dp = &d % (&p - &one);
        let dq = &d % (&q - &one);
        let qinv = mod_inverse(&q, &p)?;

        Ok(Self {
            public: RsaPublicKey {
                n: n.clone(),
                e: e.clone(),
            },
            private: RsaPrivateKey {
                n,
                d,
                p,
                q,
                dp,
                dq,
                qinv,
            },
        })
    }

    /// phi(n) = (p - 1)(q - 1)
    pub fn phi(&self) -> BigInt {
        let one = BigInt::one();
        (&self.private.p - &one) * (&self.private.q - &one)
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }
}

/// RSA encryption and signing over one key pair.
#[derive(Debug, Clone)]
pub struct RsaEngine {
    keys: RsaKeyPair,
}

impl RsaEngine {
    pub fn new(keys: RsaKeyPair) -> Self {
        Self { keys }
    }

    pub fn generate(config: &CryptoConfig) -> Result<Self> {
        let keys = RsaKeyPair::generate(
            config.rsa_bits,
            config.miller_rabin_rounds,
            &config.keygen_budget(),
        )?;
        Ok(Self::new(keys))
    }

    pub fn keys(&self) -> &RsaKeyPair {
        &self.keys
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.keys.public
    }

    /// Message bytes carried by one OAEP block: `k - 2·32 - 2`
    pub fn block_size(&self) -> usize {
        self.keys.public.size().saturating_sub(OAEP_OVERHEAD)
    }

    #[instrument(level = "debug", skip_all)]
    pub fn encrypt(&self, message: &str) -> Result<String> {
        let k = self.keys.public.size();
        let chunks = codec::chunk(message, self.block_size(), Boundary::Byte)?;

        let blocks = chunks
            .iter()
            .map(|chunk| {
                let em = oaep_encode(chunk, k)?;
                let c = self.keys.public.encrypt_raw(&from_be_bytes(&em))?;
                Ok(STANDARD.encode(to_be_bytes_padded(&c, k)?))
            })
            .collect::<Result<Vec<String>>>()?;

        debug!(blocks = blocks.len(), "encrypted RSA message");
        let array = serde_json::to_string(&blocks)
            .map_err(|e| CryptoError::InvalidFormat(e.to_string()))?;
        Ok(STANDARD.encode(array))
    }

    #[instrument(level = "debug", skip_all)]
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let k = self.keys.public.size();
        let array = decode_base64(ciphertext.trim(), "ciphertext")?;
        let blocks: Vec<String> = serde_json::from_slice(&array).map_err(|e| {
            CryptoError::InvalidFormat(format!("ciphertext is not a JSON array of strings: {}", e))
        })?;
        if blocks.is_empty() {
            return Err(CryptoError::InvalidFormat("ciphertext contains no blocks".into()));
        }

        let mut plaintext = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let bytes = decode_base64(block, "ciphertext block")?;
            if bytes.len() != k {
                return Err(CryptoError::InvalidFormat(format!(
                    "block {} has {} bytes, expected {}",
                    index,
                    bytes.len(),
                    k
                )));
            }
            let c = from_be_bytes(&bytes);
            if c >= self.keys.public.n {
                return Err(CryptoError::InvalidFormat(format!(
                    "block {} is not below the modulus",
                    index
                )));
            }

            let m = self.keys.private.decrypt_raw(&c)?;
            let em = to_be_bytes_padded(&m, k)?;
            plaintext.extend(oaep_decode(&em, k)?);
        }

        debug!(blocks = blocks.len(), "decrypted RSA message");
        codec::decode_utf8(plaintext)
    }

    #[instrument(level = "debug", skip_all)]
    pub fn sign(&self, message: &str) -> Result<String> {
        let k = self.keys.public.size();
        let em = pkcs1_v15_encode(message.as_bytes(), k)?;
        let s = self.keys.private.decrypt_raw(&from_be_bytes(&em))?;
        Ok(STANDARD.encode(to_be_bytes_padded(&s, k)?))
    }

    /// `Ok(false)` for any well-formed signature that does not match.
    ///
    /// # Errors
    /// `InvalidFormat` if `signature` is not base64.
    #[instrument(level = "debug", skip_all)]
    pub fn verify(&self, message: &str, signature: &str) -> Result<bool> {
        let k = self.keys.public.size();
        let bytes = decode_base64(signature.trim(), "signature")?;
        if bytes.len() != k {
            return Ok(false);
        }
        let s = from_be_bytes(&bytes);
        if s >= self.keys.public.n {
            return Ok(false);
        }

        let m = mod_pow(&s, &self.keys.public.e, &self.keys.public.n)?;
        let expected = pkcs1_v15_encode(message.as_bytes(), k)?;
        Ok(to_be_bytes_padded(&m, k)? == expected)
    }
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(text)
        .map_err(|e| CryptoError::InvalidFormat(format!("{} is not valid base64: {}", what, e)))
}
