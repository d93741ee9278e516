//! ECDSA over NIST P-256 with SHA-256
//!
//! Signatures travel as `r_hex|s_hex`. The key material is independent of
//! the encryption engine and lives on a different curve.

use super::FIELD_SEPARATOR;
use crate::bigint::{from_be_bytes, mod_floor, mod_inverse, parse_hex, random_in_range, to_hex};
use crate::config::{CryptoConfig, KeygenBudget};
use crate::elliptic_curve::{CurveDomain, Point};
use crate::error::{CryptoError, Result};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

pub struct EcSignatureEngine {
    domain: CurveDomain,
    order: BigInt,
    private: BigInt,
    public: Point,
    max_attempts: usize,
}

impl std::fmt::Debug for EcSignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcSignatureEngine")
            .field("curve", &self.domain.name)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl EcSignatureEngine {
    /// Engine over `domain` with a private scalar in `[1, n)`
    ///
    /// # Errors
    /// `ArithmeticUndefined` if the domain has no known order;
    /// `KeyGenerationFailure` if the scalar is out of range.
    pub fn new(domain: CurveDomain, private: BigInt) -> Result<Self> {
        let order = domain.order.clone().ok_or_else(|| {
            CryptoError::ArithmeticUndefined(format!("{} has no known group order", domain.name))
        })?;
        if private < BigInt::one() || private >= order {
            return Err(CryptoError::KeyGenerationFailure(
                "private scalar must lie in [1, n)".into(),
            ));
        }
        let public = domain.curve.scalar_mul(&private, &domain.generator)?;
        Ok(Self {
            domain,
            order,
            private,
            public,
            max_attempts: CryptoConfig::default().keygen_max_attempts,
        })
    }

    #[instrument(level = "info", skip_all)]
    pub fn generate(config: &CryptoConfig) -> Result<Self> {
        let domain = CurveDomain::p256()?;
        let order = domain.order.clone().ok_or_else(|| {
            CryptoError::ArithmeticUndefined("P-256 order missing".into())
        })?;
        let private = random_in_range(&BigInt::one(), &order)?;
        let engine = Self::new(domain, private)?;
        info!(curve = engine.domain.name, "generated ECDSA key");
        Ok(Self {
            max_attempts: config.keygen_max_attempts,
            ..engine
        })
    }

    pub fn public_key(&self) -> &Point {
        &self.public
    }

    pub fn domain(&self) -> &CurveDomain {
        &self.domain
    }

    /// SHA-256 digest as an integer; n is 256 bits so no truncation applies.
    fn digest(message: &str) -> BigInt {
        from_be_bytes(&Sha256::digest(message.as_bytes()))
    }

    /// x-coordinate of `point` reduced mod n
    fn reduce_x(&self, point: &Point) -> Result<Option<BigInt>> {
        match point.coordinates() {
            Some((x, _)) => Ok(Some(mod_floor(x, &self.order)?)),
            None => Ok(None),
        }
    }

    #[instrument(level = "debug", skip_all)]
    pub fn sign(&self, message: &str) -> Result<String> {
        let n = &self.order;
        let z = Self::digest(message);
        let budget = KeygenBudget::new(self.max_attempts);

        let mut attempt = 0usize;
        loop {
            budget.check(attempt, "ECDSA nonce")?;
            attempt += 1;

            let k = random_in_range(&BigInt::one(), n)?;
            let point = self.domain.curve.scalar_mul(&k, &self.domain.generator)?;
            let r = match self.reduce_x(&point)? {
                Some(r) if !r.is_zero() => r,
                _ => continue,
            };

            let s = mod_floor(&(mod_inverse(&k, n)? * (&z + &r * &self.private)), n)?;
            if s.is_zero() {
                continue;
            }

            return Ok(format!("{}{}{}", to_hex(&r), FIELD_SEPARATOR, to_hex(&s)));
        }
    }

    /// `Ok(false)` when `r` or `s` is outside `[1, n)` or the check fails.
    ///
    /// # Errors
    /// `InvalidFormat` unless `signature` is two `|`-separated hex fields.
    #[instrument(level = "debug", skip_all)]
    pub fn verify(&self, message: &str, signature: &str) -> Result<bool> {
        let n = &self.order;
        let mut fields = signature.trim().split(FIELD_SEPARATOR);
        let (r, s) = match (fields.next(), fields.next(), fields.next()) {
            (Some(r), Some(s), None) => (parse_hex(r)?, parse_hex(s)?),
            _ => {
                return Err(CryptoError::InvalidFormat(
                    "signature must be two |-separated hex fields".into(),
                ));
            }
        };

        let in_range = |v: &BigInt| !v.is_zero() && v < n;
        if !in_range(&r) || !in_range(&s) {
            return Ok(false);
        }

        let curve = &self.domain.curve;
        let w = mod_inverse(&s, n)?;
        let u1 = mod_floor(&(Self::digest(message) * &w), n)?;
        let u2 = mod_floor(&(&r * &w), n)?;
        let point = curve.add(
            &curve.scalar_mul(&u1, &self.domain.generator)?,
            &curve.scalar_mul(&u2, &self.public)?,
        )?;

        Ok(self.reduce_x(&point)? == Some(r))
    }
}
