//! Teaching-only RSA signatures
//!
//! The "hash" packs the upper-cased message as base-26 digits (`'A'` = 0)
//! and the signature is the bare value `h^d mod n` printed in decimal. There
//! is no padding and the packing is trivially invertible, so signatures are
//! malleable and forgeable. This engine is kept apart from [`super::RsaEngine`]
//! and is not reachable through the dispatcher.

use super::RsaKeyPair;
use crate::bigint::{mod_floor, mod_pow, parse_decimal};
use crate::error::Result;
use num_bigint::BigInt;

/// Base-26 letter packing: `h = h·26 + (c - 'A')` over the upper-cased text
///
/// Characters outside `A..=Z` contribute their (possibly negative) offset
/// from `'A'` unchanged.
pub fn letter_hash(message: &str) -> BigInt {
    let base = BigInt::from(26u32);
    message.to_uppercase().chars().fold(BigInt::from(0u32), |acc, c| {
        acc * &base + BigInt::from(c as i64 - 'A' as i64)
    })
}

#[derive(Debug, Clone)]
pub struct TextbookRsa {
    keys: RsaKeyPair,
}

impl TextbookRsa {
    pub fn new(keys: RsaKeyPair) -> Self {
        Self { keys }
    }

    /// Decimal `letter_hash(m)^d mod n`
    pub fn sign(&self, message: &str) -> Result<String> {
        let n = &self.keys.public.n;
        let h = mod_floor(&letter_hash(message), n)?;
        let s = mod_pow(&h, self.keys.private().d(), n)?;
        Ok(s.to_str_radix(10))
    }

    /// Compares `s^e mod n` against the packed message reduced mod n
    pub fn verify(&self, message: &str, signature: &str) -> Result<bool> {
        let n = &self.keys.public.n;
        let s = parse_decimal(signature.trim())?;
        if &s >= n {
            return Ok(false);
        }
        let recovered = mod_pow(&s, &self.keys.public.e, n)?;
        Ok(recovered == mod_floor(&letter_hash(message), n)?)
    }
}
