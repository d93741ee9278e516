//! Arbitrary-precision arithmetic primitives
//!
//! Limb-level arithmetic (add, sub, mul, div) comes from [`num_bigint::BigInt`].
//! This module builds the number theory the cryptosystems need on top of it:
//! - square-and-multiply modular exponentiation
//! - iterative extended Euclid, gcd and modular inverse
//! - Miller-Rabin probabilistic primality testing
//! - uniform sampling by rejection, and random prime generation
//!
//! All modular results are normalised into `[0, m)`, including for negative
//! inputs.

use crate::config::KeygenBudget;
use crate::error::{CryptoError, Result};
use num_bigint::{BigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand::RngCore;
use tracing::{debug, instrument, trace};

/// Primes below 256, used for trial division before Miller-Rabin.
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// `a mod m` in `[0, m)` for any sign of `a`
///
/// # Errors
/// `ArithmeticUndefined` if `m <= 0`.
pub fn mod_floor(a: &BigInt, m: &BigInt) -> Result<BigInt> {
    if !m.is_positive() {
        return Err(CryptoError::ArithmeticUndefined("modulus must be positive".into()));
    }
    Ok(a.mod_floor(m))
}

/// Modular exponentiation: `base^exp mod modulus` using square-and-multiply
///
/// Scans the exponent from least to most significant bit, so the cost is
/// `O(log exp)` modular multiplications. A negative exponent raises the
/// modular inverse of `base`.
///
/// # Errors
/// - `ArithmeticUndefined` if `modulus <= 0`
/// - `NotInvertible` for a negative exponent when `base` has no inverse
pub fn mod_pow(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> Result<BigInt> {
    if !modulus.is_positive() {
        return Err(CryptoError::ArithmeticUndefined("modulus must be positive".into()));
    }
    if exp.is_negative() {
        let inverse = mod_inverse(base, modulus)?;
        return Ok(square_and_multiply(&inverse, &-exp, modulus));
    }
    Ok(square_and_multiply(base, exp, modulus))
}

/// Requires `modulus > 0` and `exp >= 0`.
fn square_and_multiply(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> BigInt {
    if modulus.is_one() {
        return BigInt::zero();
    }

    let mut result = BigInt::one();
    let mut base = base.mod_floor(modulus);
    let exp = exp.magnitude();

    for i in 0..exp.bits() {
        if exp.bit(i) {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
    }

    result
}

/// Extended Euclidean algorithm: returns `(g, x, y)` with `a·x + b·y = g`
///
/// Iterative, so operand size never affects stack depth. `g` is always
/// non-negative; `gcd(0, 0)` is 0.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_x = &old_x - &q * &x;
        old_x = std::mem::replace(&mut x, next_x);

        let next_y = &old_y - &q * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }

    if old_r.is_negative() {
        (-old_r, -old_x, -old_y)
    } else {
        (old_r, old_x, old_y)
    }
}

/// Greatest common divisor, always non-negative
pub fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
    let mut a = a.abs();
    let mut b = b.abs();
    while !b.is_zero() {
        let r = &a % &b;
        a = std::mem::replace(&mut b, r);
    }
    a
}

/// Modular inverse: `a^(-1) mod m`
///
/// # Errors
/// - `NotInvertible` if `gcd(a, m) != 1`
/// - `ArithmeticUndefined` if `m <= 0`
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Result<BigInt> {
    let reduced = mod_floor(a, m)?;
    let (g, x, _) = extended_gcd(&reduced, m);
    if !g.is_one() {
        return Err(CryptoError::NotInvertible);
    }
    Ok(x.mod_floor(m))
}

/// Uniform integer in `[0, bound)` by rejection sampling
///
/// Draws `bits(bound)` random bits and retries while the candidate is out of
/// range; every try succeeds with probability above one half. Returns zero
/// when `bound <= 1`.
pub fn random_below(bound: &BigInt) -> BigInt {
    if bound <= &BigInt::one() {
        return BigInt::zero();
    }

    let mut rng = rand::rng();
    let bit_len = bound.bits();
    let byte_len = bit_len.div_ceil(8) as usize;
    let top_bits = bit_len % 8;
    let top_mask: u8 = if top_bits == 0 {
        0xFF
    } else {
        (1u8 << top_bits) - 1
    };

    let mut bytes = vec![0u8; byte_len];
    loop {
        rng.fill_bytes(&mut bytes);
        bytes[0] &= top_mask;

        let candidate = BigInt::from_bytes_be(Sign::Plus, &bytes);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Cryptographically secure uniform integer in `[low, high)`
///
/// # Errors
/// `ArithmeticUndefined` if the range is empty.
pub fn random_in_range(low: &BigInt, high: &BigInt) -> Result<BigInt> {
    if high <= low {
        return Err(CryptoError::ArithmeticUndefined(format!(
            "empty sampling range [{}, {})",
            low, high
        )));
    }
    let width = high - low;
    Ok(low + random_below(&width))
}

/// `bits` uniformly random bits (the top bit is not forced).
pub fn random_bits(bits: u64) -> BigInt {
    if bits == 0 {
        return BigInt::zero();
    }
    let mut rng = rand::rng();
    let byte_len = bits.div_ceil(8) as usize;
    let mut bytes = vec![0u8; byte_len];
    rng.fill_bytes(&mut bytes);

    let excess = (byte_len as u64) * 8 - bits;
    bytes[0] &= 0xFF >> excess;
    BigInt::from_bytes_be(Sign::Plus, &bytes)
}

/// Miller-Rabin probabilistic primality test
///
/// Small candidates are settled by trial division against the primes below
/// 256. Otherwise every round draws a fresh witness uniformly from
/// `[2, n - 1)`; a composite survives one round with probability at most 1/4,
/// so the false-positive rate is bounded by `4^-rounds`.
pub fn is_probable_prime(n: &BigInt, rounds: usize) -> bool {
    if n < &BigInt::from(2u32) {
        return false;
    }

    for &p in SMALL_PRIMES.iter() {
        let p = BigInt::from(p);
        if n == &p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let one = BigInt::one();
    let n_minus_1 = n - &one;
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    let two = BigInt::from(2u32);
    let witness_width = &n_minus_1 - &two;

    'witness: for _ in 0..rounds {
        let a = &two + random_below(&witness_width);
        let mut x = square_and_multiply(&a, &d, n);

        if x.is_one() || x == n_minus_1 {
            continue;
        }

        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Random probable prime of exactly `bits` bits
///
/// The two most significant bits are forced to one, so the product of two
/// such primes has exactly `2 * bits` bits; the low bit is forced to one to
/// skip even candidates.
///
/// # Errors
/// - `KeyGenerationFailure` when the budget is exhausted
/// - `ArithmeticUndefined` for `bits < 2`
#[instrument(level = "debug", skip(budget))]
pub fn random_prime(bits: u64, rounds: usize, budget: &KeygenBudget) -> Result<BigInt> {
    if bits < 2 {
        return Err(CryptoError::ArithmeticUndefined(format!(
            "cannot generate a {}-bit prime",
            bits
        )));
    }

    let top = (BigInt::from(3u32)) << (bits - 2);
    let mut attempt = 0usize;
    loop {
        budget.check(attempt, "prime")?;

        let candidate = random_bits(bits) | &top | BigInt::one();
        if is_probable_prime(&candidate, rounds) {
            debug!(attempts = attempt + 1, "found probable prime");
            return Ok(candidate);
        }

        trace!(attempt, "rejected prime candidate");
        attempt += 1;
    }
}

/// Big-endian bytes of a non-negative integer, left-padded to `len`
///
/// # Errors
/// `MessageTooLarge` if the value needs more than `len` bytes.
pub fn to_be_bytes_padded(n: &BigInt, len: usize) -> Result<Vec<u8>> {
    let (_, bytes) = n.to_bytes_be();
    let bytes = if n.is_zero() { Vec::new() } else { bytes };
    if bytes.len() > len {
        return Err(CryptoError::MessageTooLarge {
            len: bytes.len(),
            capacity: len,
        });
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(&bytes);
    Ok(out)
}

/// Non-negative integer from big-endian bytes.
pub fn from_be_bytes(bytes: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, bytes)
}

/// Lowercase hexadecimal without prefix.
pub fn to_hex(n: &BigInt) -> String {
    n.to_str_radix(16)
}

/// Parses unsigned hexadecimal (either case, no prefix)
///
/// # Errors
/// `InvalidFormat` on an empty string or any non-hex character.
pub fn parse_hex(s: &str) -> Result<BigInt> {
    parse_radix(s, 16, |c| c.is_ascii_hexdigit())
}

/// Parses an unsigned decimal integer
///
/// # Errors
/// `InvalidFormat` on an empty string or any non-digit character.
pub fn parse_decimal(s: &str) -> Result<BigInt> {
    parse_radix(s, 10, |c| c.is_ascii_digit())
}

fn parse_radix(s: &str, radix: u32, valid: impl Fn(char) -> bool) -> Result<BigInt> {
    if s.is_empty() || !s.chars().all(valid) {
        return Err(CryptoError::InvalidFormat(format!(
            "not a base-{} integer: {:?}",
            radix, s
        )));
    }
    BigInt::parse_bytes(s.as_bytes(), radix).ok_or_else(|| {
        CryptoError::InvalidFormat(format!("not a base-{} integer: {:?}", radix, s))
    })
}
