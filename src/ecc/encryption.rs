//! Hash-masked EC-ElGamal over the custom curve y^2 = x^3 + 2x + 3 mod 2^521 - 1
//!
//! Per chunk m, with ephemeral k and shared point S = k·Q = (sx, sy):
//! ```text
//! C1  = k·G
//! C2x = (m + mask(S)) mod p
//! C2y = tag(S, m)
//! ```
//! `mask` expands SHA-512 over S to 1024 bits and reduces them mod p; `tag`
//! is a SHA-256 commitment to S and m that decryption checks. The chunk is
//! written as four decimal fields `C1x|C1y|C2x|C2y`, and chunks are joined by
//! the same `|`.

use super::{BLOCK_SIZE, FIELD_SEPARATOR};
use crate::bigint::{from_be_bytes, mod_floor, parse_decimal, random_in_range, to_be_bytes_padded};
use crate::codec::{self, Boundary};
use crate::config::{CryptoConfig, KeygenBudget};
use crate::elliptic_curve::{CurveDomain, Point};
use crate::error::{CryptoError, Result};
use num_bigint::BigInt;
use num_traits::One;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info, instrument};

const MASK_LABEL: &[u8] = b"asymcrypt-ec-mask";
const TAG_LABEL: &[u8] = b"asymcrypt-ec-tag";

/// Fields per encrypted chunk
const CHUNK_FIELDS: usize = 4;

pub struct EcEncryptionEngine {
    domain: CurveDomain,
    private: BigInt,
    public: Point,
    max_attempts: usize,
}

impl std::fmt::Debug for EcEncryptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcEncryptionEngine")
            .field("curve", &self.domain.name)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl EcEncryptionEngine {
    /// Engine over `domain` with a caller-chosen private scalar in `[1, p)`.
    pub fn new(domain: CurveDomain, private: BigInt) -> Result<Self> {
        if private < BigInt::one() || &private >= domain.curve.modulus() {
            return Err(CryptoError::KeyGenerationFailure(
                "private scalar must lie in [1, p)".into(),
            ));
        }
        let public = domain.curve.scalar_mul(&private, &domain.generator)?;
        if public.is_infinity() {
            return Err(CryptoError::KeyGenerationFailure(
                "private scalar maps the generator to the identity".into(),
            ));
        }
        Ok(Self {
            domain,
            private,
            public,
            max_attempts: CryptoConfig::default().keygen_max_attempts,
        })
    }

    #[instrument(level = "info", skip_all)]
    pub fn generate(config: &CryptoConfig) -> Result<Self> {
        let domain = CurveDomain::custom_m521()?;
        let budget = config.keygen_budget();
        let p = domain.curve.modulus().clone();

        let mut attempt = 0usize;
        loop {
            budget.check(attempt, "EC private scalar")?;
            attempt += 1;

            let private = random_in_range(&BigInt::one(), &p)?;
            match Self::new(domain.clone(), private) {
                Ok(engine) => {
                    info!(curve = domain.name, "generated EC encryption key");
                    return Ok(Self {
                        max_attempts: config.keygen_max_attempts,
                        ..engine
                    });
                }
                Err(CryptoError::KeyGenerationFailure(_)) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn public_key(&self) -> &Point {
        &self.public
    }

    pub fn domain(&self) -> &CurveDomain {
        &self.domain
    }

    fn field_len(&self) -> usize {
        self.domain.curve.modulus().bits().div_ceil(8) as usize
    }

    fn shared_bytes(&self, shared: &Point) -> Result<(Vec<u8>, Vec<u8>)> {
        let (sx, sy) = shared.coordinates().ok_or_else(|| {
            CryptoError::DecryptionFailure("shared point is the identity".into())
        })?;
        let len = self.field_len();
        Ok((to_be_bytes_padded(sx, len)?, to_be_bytes_padded(sy, len)?))
    }

    fn mask(&self, sx: &[u8], sy: &[u8]) -> Result<BigInt> {
        let mut wide = Vec::with_capacity(128);
        for counter in [0u8, 1u8] {
            let mut hasher = Sha512::new();
            hasher.update(MASK_LABEL);
            hasher.update(sx);
            hasher.update(sy);
            hasher.update([counter]);
            wide.extend_from_slice(&hasher.finalize());
        }
        mod_floor(&from_be_bytes(&wide), self.domain.curve.modulus())
    }

    fn tag(&self, sx: &[u8], sy: &[u8], m: &BigInt) -> Result<BigInt> {
        let mut hasher = Sha256::new();
        hasher.update(TAG_LABEL);
        hasher.update(sx);
        hasher.update(sy);
        hasher.update(to_be_bytes_padded(m, self.field_len())?);
        Ok(from_be_bytes(&hasher.finalize()))
    }

    fn encrypt_chunk(&self, chunk: &[u8]) -> Result<[BigInt; CHUNK_FIELDS]> {
        let curve = &self.domain.curve;
        let p = curve.modulus();
        let m = codec::bytes_to_integer(chunk);
        codec::ensure_below(&m, p, chunk.len())?;

        let budget = KeygenBudget::new(self.max_attempts);
        let mut attempt = 0usize;
        let (c1, shared) = loop {
            budget.check(attempt, "EC ephemeral scalar")?;
            attempt += 1;

            let k = random_in_range(&BigInt::one(), p)?;
            let shared = curve.scalar_mul(&k, &self.public)?;
            if !shared.is_infinity() {
                break (curve.scalar_mul(&k, &self.domain.generator)?, shared);
            }
        };

        let (sx, sy) = self.shared_bytes(&shared)?;
        let c2x = mod_floor(&(&m + self.mask(&sx, &sy)?), p)?;
        let c2y = self.tag(&sx, &sy, &m)?;

        let (c1x, c1y) = c1.coordinates().ok_or_else(|| {
            CryptoError::ArithmeticUndefined("ephemeral point is the identity".into())
        })?;
        Ok([c1x.clone(), c1y.clone(), c2x, c2y])
    }

    fn decrypt_chunk(&self, fields: &[&str]) -> Result<Vec<u8>> {
        let curve = &self.domain.curve;
        let p = curve.modulus();
        let [c1x, c1y, c2x, c2y] = fields else {
            return Err(CryptoError::InvalidFormat(format!(
                "expected {} fields per chunk",
                CHUNK_FIELDS
            )));
        };

        let c1 = curve.point(parse_decimal(c1x)?, parse_decimal(c1y)?)?;
        let c2x = parse_decimal(c2x)?;
        let c2y = parse_decimal(c2y)?;
        if &c2x >= p {
            return Err(CryptoError::InvalidFormat(
                "masked value is not below the field modulus".into(),
            ));
        }

        let shared = curve.scalar_mul(&self.private, &c1)?;
        let (sx, sy) = self.shared_bytes(&shared)?;
        let m = mod_floor(&(c2x - self.mask(&sx, &sy)?), p)?;
        if self.tag(&sx, &sy, &m)? != c2y {
            return Err(CryptoError::DecryptionFailure("chunk integrity tag mismatch".into()));
        }

        codec::integer_to_bytes(&m)
    }

    #[instrument(level = "debug", skip_all)]
    pub fn encrypt(&self, message: &str) -> Result<String> {
        let chunks = codec::chunk(message, BLOCK_SIZE, Boundary::Byte)?;

        let mut fields = Vec::with_capacity(chunks.len() * CHUNK_FIELDS);
        for chunk in &chunks {
            fields.extend(self.encrypt_chunk(chunk)?.iter().map(|v| v.to_str_radix(10)));
        }

        debug!(chunks = chunks.len(), "encrypted EC message");
        Ok(fields.join(FIELD_SEPARATOR))
    }

    #[instrument(level = "debug", skip_all)]
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let fields: Vec<&str> = ciphertext.trim().split(FIELD_SEPARATOR).collect();
        if fields.len() % CHUNK_FIELDS != 0 {
            return Err(CryptoError::InvalidFormat(format!(
                "ciphertext has {} fields, expected a multiple of {}",
                fields.len(),
                CHUNK_FIELDS
            )));
        }

        let mut plaintext = Vec::new();
        for group in fields.chunks(CHUNK_FIELDS) {
            plaintext.extend(self.decrypt_chunk(group)?);
        }

        debug!(chunks = fields.len() / CHUNK_FIELDS, "decrypted EC message");
        codec::decode_utf8(plaintext)
    }
}
