use crate::bigint::mod_inverse;
use crate::error::{CryptoError, Result};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use std::fmt;
use std::sync::Arc;

/// Trait for field operations
pub trait Field: Sized + Clone + PartialEq {
    /// Addition
    fn add(&self, other: &Self) -> Self;

    /// Negation
    fn neg(&self) -> Self;

    /// Subtraction (a - b = a + (-b))
    fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }

    /// Multiplication
    fn mul(&self, other: &Self) -> Self;

    /// Multiplicative inverse, `NotInvertible` for zero
    fn inv(&self) -> Result<Self>;

    /// Division (a / b = a * b^(-1))
    fn div(&self, other: &Self) -> Result<Self> {
        other.inv().map(|inv| self.mul(&inv))
    }

    /// Multiplicative identity of the field `self` belongs to
    fn one(&self) -> Self;

    fn is_zero(&self) -> bool;

    /// Exponentiation by square-and-multiply over the bits of `exp`
    ///
    /// Only the magnitude of `exp` is used.
    fn pow(&self, exp: &BigInt) -> Self {
        let mut result = self.one();
        let mut base = self.clone();
        let exp = exp.magnitude();

        for i in 0..exp.bits() {
            if exp.bit(i) {
                result = result.mul(&base);
            }
            base = base.mul(&base);
        }

        result
    }
}

/// Element of the prime field Fp
///
/// The modulus is shared behind an [`Arc`], so every element of one curve
/// points at the same allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldElement {
    value: BigInt,
    modulus: Arc<BigInt>,
}

impl FieldElement {
    /// Reduces `value` into `[0, p)`; `modulus` must be positive.
    pub fn new(value: impl Into<BigInt>, modulus: &Arc<BigInt>) -> Self {
        FieldElement {
            value: value.into().mod_floor(modulus.as_ref()),
            modulus: Arc::clone(modulus),
        }
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    fn with_value(&self, value: BigInt) -> Self {
        FieldElement {
            value,
            modulus: Arc::clone(&self.modulus),
        }
    }

    /// Euler's criterion: zero or `v^((p-1)/2) == 1`
    pub fn is_square(&self) -> bool {
        if self.is_zero() || self.modulus.as_ref() == &BigInt::from(2u32) {
            return true;
        }
        let exp: BigInt = (self.modulus.as_ref() - 1u32) >> 1;
        self.pow(&exp) == self.one()
    }

    /// A square root of `self`, or `None` for a non-residue
    ///
    /// Uses the closed form `v^((p+1)/4)` when `p ≡ 3 (mod 4)` and
    /// Tonelli-Shanks otherwise. The modulus must be prime.
    pub fn sqrt(&self) -> Option<Self> {
        if !self.is_square() {
            return None;
        }
        if self.is_zero() || self.modulus.as_ref() == &BigInt::from(2u32) {
            return Some(self.clone());
        }

        let p = self.modulus.as_ref();
        if (p % 4u32) == BigInt::from(3u32) {
            let exp: BigInt = (p + 1u32) >> 2;
            return Some(self.pow(&exp));
        }
        self.tonelli_shanks()
    }

    fn tonelli_shanks(&self) -> Option<Self> {
        let p = self.modulus.as_ref();
        let one = self.one();

        // p - 1 = q * 2^s with q odd
        let p_minus_1: BigInt = p - 1u32;
        let s = p_minus_1.trailing_zeros()?;
        let q = &p_minus_1 >> s;

        let mut z = self.with_value(BigInt::from(2u32));
        while z.is_square() {
            z = z.add(&one);
            if z.is_zero() {
                return None;
            }
        }

        let mut m = s;
        let mut c = z.pow(&q);
        let mut t = self.pow(&q);
        let mut r = self.pow(&((&q + 1u32) >> 1));

        while t != one {
            // least i in (0, m) with t^(2^i) == 1
            let mut i = 0;
            let mut t2i = t.clone();
            while t2i != one {
                t2i = t2i.mul(&t2i);
                i += 1;
                if i == m {
                    return None;
                }
            }

            let mut b = c.clone();
            for _ in 0..(m - i - 1) {
                b = b.mul(&b);
            }
            m = i;
            c = b.mul(&b);
            t = t.mul(&c);
            r = r.mul(&b);
        }

        Some(r)
    }
}

impl Field for FieldElement {
    fn add(&self, other: &Self) -> Self {
        debug_assert_eq!(self.modulus, other.modulus);
        let mut value = &self.value + &other.value;
        if &value >= self.modulus.as_ref() {
            value -= self.modulus.as_ref();
        }
        self.with_value(value)
    }

    fn neg(&self) -> Self {
        if self.value.is_zero() {
            return self.clone();
        }
        self.with_value(self.modulus.as_ref() - &self.value)
    }

    fn mul(&self, other: &Self) -> Self {
        debug_assert_eq!(self.modulus, other.modulus);
        self.with_value((&self.value * &other.value) % self.modulus.as_ref())
    }

    fn inv(&self) -> Result<Self> {
        if self.value.is_zero() {
            return Err(CryptoError::NotInvertible);
        }
        mod_inverse(&self.value, &self.modulus).map(|inv| self.with_value(inv))
    }

    fn one(&self) -> Self {
        self.with_value(BigInt::one() % self.modulus.as_ref())
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl std::ops::Add for &FieldElement {
    type Output = FieldElement;

    fn add(self, other: &FieldElement) -> FieldElement {
        Field::add(self, other)
    }
}

impl std::ops::Sub for &FieldElement {
    type Output = FieldElement;

    fn sub(self, other: &FieldElement) -> FieldElement {
        Field::sub(self, other)
    }
}

impl std::ops::Mul for &FieldElement {
    type Output = FieldElement;

    fn mul(self, other: &FieldElement) -> FieldElement {
        Field::mul(self, other)
    }
}

impl std::ops::Neg for &FieldElement {
    type Output = FieldElement;

    fn neg(self) -> FieldElement {
        Field::neg(self)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (mod {})", self.value, self.modulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fe(v: i64, p: &Arc<BigInt>) -> FieldElement {
        FieldElement::new(v, p)
    }

    #[test]
    fn test_field_arithmetic() {
        // Work in F_7
        let p = Arc::new(BigInt::from(7));

        let a = fe(3, &p);
        let b = fe(5, &p);

        // 3 + 5 = 8 ≡ 1 (mod 7)
        assert_eq!((&a + &b).value(), &BigInt::from(1));
        // 3 - 5 = -2 ≡ 5 (mod 7)
        assert_eq!((&a - &b).value(), &BigInt::from(5));
        // 3 * 5 = 15 ≡ 1 (mod 7)
        assert_eq!((&a * &b).value(), &BigInt::from(1));
        // 3^(-1) ≡ 5 (mod 7)
        assert_eq!(a.inv().unwrap().value(), &BigInt::from(5));
        // 3 / 5 = 3 * 3 = 9 ≡ 2 (mod 7)
        assert_eq!(a.div(&b).unwrap().value(), &BigInt::from(2));
        assert_eq!((-&a).value(), &BigInt::from(4));
    }

    #[test]
    fn test_new_reduces_negative_values() {
        let p = Arc::new(BigInt::from(97));
        assert_eq!(fe(-1, &p).value(), &BigInt::from(96));
        assert_eq!(fe(200, &p).value(), &BigInt::from(6));
    }

    #[test]
    fn test_zero_has_no_inverse() {
        let p = Arc::new(BigInt::from(11));
        let zero = fe(0, &p);
        assert_eq!(zero.inv(), Err(CryptoError::NotInvertible));
        assert!(fe(4, &p).div(&zero).is_err());
    }

    #[test]
    fn test_exponentiation() {
        // Work in F_11
        let p = Arc::new(BigInt::from(11));
        let a = fe(2, &p);

        // 2^10 ≡ 1 (mod 11) by Fermat's Little Theorem
        assert_eq!(a.pow(&BigInt::from(10)).value(), &BigInt::from(1));
        // 2^5 = 32 ≡ 10 (mod 11)
        assert_eq!(a.pow(&BigInt::from(5)).value(), &BigInt::from(10));
        assert_eq!(a.pow(&BigInt::zero()), a.one());
    }

    #[test]
    fn test_sqrt_of_every_square() {
        // 97 ≡ 1 (mod 4) goes through Tonelli-Shanks, 103 ≡ 3 (mod 4) does not
        for modulus in [97, 103] {
            let p = Arc::new(BigInt::from(modulus));
            for v in 0..modulus {
                let x = fe(v, &p);
                let square = &x * &x;
                let root = square.sqrt().expect("squares have roots");
                assert_eq!(&root * &root, square);
            }
        }
    }

    #[test]
    fn test_non_residue_has_no_root() {
        // squares mod 7 are {0, 1, 2, 4}
        let p = Arc::new(BigInt::from(7));
        for v in [3, 5, 6] {
            assert!(!fe(v, &p).is_square());
            assert!(fe(v, &p).sqrt().is_none());
        }
        assert!(fe(2, &p).is_square());
    }

    #[test]
    fn test_sqrt_with_high_two_adicity() {
        // 257 - 1 = 2^8
        let p = Arc::new(BigInt::from(257));
        let x = fe(123, &p);
        let square = &x * &x;
        let root = square.sqrt().unwrap();
        assert!(root == x || root == -&x);
    }
}
