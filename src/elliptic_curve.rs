//! Elliptic curves in short Weierstrass form over a prime field
//!
//! Implements the Chord-Tangent Law for group operations:
//! - For distinct points P, Q: the line through P and Q intersects the curve at -R, so P + Q = R
//! - For P = Q: the tangent line at P intersects the curve at -R, so 2P = R
//! - The point at infinity O is the identity element
//!
//! A vertical chord or tangent (antipodal points, or doubling a point with
//! y = 0) yields O explicitly instead of dividing by zero.

use crate::error::{CryptoError, Result};
use crate::field::{Field, FieldElement};
use num_bigint::BigInt;
use num_traits::Signed;
use std::sync::Arc;
use tracing::debug;

/// A point on an elliptic curve
///
/// The identity is its own variant, so it never collides with an affine
/// point such as (0, 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Point {
    /// Point at infinity (identity element)
    Infinity,
    /// Affine point (x, y) on the curve
    Affine { x: FieldElement, y: FieldElement },
}

impl Point {
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// Integer coordinates of an affine point
    pub fn coordinates(&self) -> Option<(&BigInt, &BigInt)> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, y } => Some((x.value(), y.value())),
        }
    }
}

/// Curve y^2 = x^3 + ax + b over F_p
#[derive(Debug, Clone)]
pub struct EllipticCurve {
    a: FieldElement,
    b: FieldElement,
    modulus: Arc<BigInt>,
}

impl EllipticCurve {
    /// # Errors
    /// `ArithmeticUndefined` if `p <= 3` or the curve is singular
    /// (`4a^3 + 27b^2 ≡ 0 mod p`).
    pub fn new(a: BigInt, b: BigInt, p: BigInt) -> Result<Self> {
        if p <= BigInt::from(3u32) {
            return Err(CryptoError::ArithmeticUndefined(
                "short Weierstrass form requires characteristic > 3".into(),
            ));
        }
        let modulus = Arc::new(p);
        let a = FieldElement::new(a, &modulus);
        let b = FieldElement::new(b, &modulus);

        let four = FieldElement::new(4u32, &modulus);
        let twenty_seven = FieldElement::new(27u32, &modulus);
        let discriminant = &(&four * &(&(&a * &a) * &a)) + &(&twenty_seven * &(&b * &b));
        if discriminant.is_zero() {
            return Err(CryptoError::ArithmeticUndefined(
                "curve is singular (discriminant is zero)".into(),
            ));
        }

        Ok(Self { a, b, modulus })
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    /// Field element of this curve's base field
    pub fn element(&self, value: impl Into<BigInt>) -> FieldElement {
        FieldElement::new(value, &self.modulus)
    }

    /// x^3 + ax + b
    fn rhs(&self, x: &FieldElement) -> FieldElement {
        let x_cubed = &(x * x) * x;
        &(&x_cubed + &(&self.a * x)) + &self.b
    }

    /// Check if a point satisfies the curve equation y^2 = x^3 + ax + b
    pub fn is_on_curve(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                x.modulus() == self.modulus() && &(y * y) == &self.rhs(x)
            }
        }
    }

    /// Affine point from integer coordinates
    ///
    /// # Errors
    /// `InvalidPoint` if a coordinate is outside `[0, p)` or the pair is not
    /// on the curve.
    pub fn point(&self, x: BigInt, y: BigInt) -> Result<Point> {
        let in_field = |v: &BigInt| !v.is_negative() && v < self.modulus();
        if !in_field(&x) || !in_field(&y) {
            return Err(CryptoError::InvalidPoint);
        }
        let point = Point::Affine {
            x: self.element(x),
            y: self.element(y),
        };
        if !self.is_on_curve(&point) {
            return Err(CryptoError::InvalidPoint);
        }
        Ok(point)
    }

    pub fn infinity(&self) -> Point {
        Point::Infinity
    }

    /// For P = (x, y), -P = (x, -y)
    pub fn negate(&self, p: &Point) -> Point {
        match p {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x: x.clone(),
                y: -y,
            },
        }
    }

    /// Add two points using the Chord-Tangent Law
    ///
    /// For distinct points P and Q:
    /// - m = (y2 - y1) / (x2 - x1)
    /// - x3 = m^2 - x1 - x2
    /// - y3 = m(x1 - x3) - y1
    ///
    /// P == Q is delegated to [`EllipticCurve::double`].
    pub fn add(&self, p: &Point, q: &Point) -> Result<Point> {
        match (p, q) {
            (Point::Infinity, _) => Ok(q.clone()),
            (_, Point::Infinity) => Ok(p.clone()),

            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                if x1 == x2 {
                    // Same x: either P = Q or P = -Q (vertical chord)
                    if y1 == y2 {
                        return self.double(p);
                    }
                    return Ok(Point::Infinity);
                }

                let m = (y2 - y1).div(&(x2 - x1))?;
                let x3 = &(&(&m * &m) - x1) - x2;
                let y3 = &(&m * &(x1 - &x3)) - y1;

                Ok(Point::Affine { x: x3, y: y3 })
            }
        }
    }

    /// Double a point using the Tangent Law
    ///
    /// For P = (x1, y1):
    /// - m = (3x1^2 + a) / (2y1)
    /// - x3 = m^2 - 2x1
    /// - y3 = m(x1 - x3) - y1
    pub fn double(&self, p: &Point) -> Result<Point> {
        match p {
            Point::Infinity => Ok(Point::Infinity),
            Point::Affine { x, y } => {
                // Vertical tangent
                if y.is_zero() {
                    return Ok(Point::Infinity);
                }

                let three = self.element(3u32);
                let numerator = &(&three * &(x * x)) + &self.a;
                let denominator = y + y;
                let m = numerator.div(&denominator)?;

                let x3 = &(&m * &m) - &(x + x);
                let y3 = &(&m * &(x - &x3)) - y;

                Ok(Point::Affine { x: x3, y: y3 })
            }
        }
    }

    /// Scalar multiplication k·P by double-and-add
    ///
    /// Scans the bits of `|k|` from least significant upwards, so the cost is
    /// O(log k) point operations. A negative `k` multiplies `-P`.
    pub fn scalar_mul(&self, k: &BigInt, p: &Point) -> Result<Point> {
        let mut base = if k.is_negative() {
            self.negate(p)
        } else {
            p.clone()
        };
        let scalar = k.magnitude();

        let mut result = Point::Infinity;
        for i in 0..scalar.bits() {
            if scalar.bit(i) {
                result = self.add(&result, &base)?;
            }
            base = self.double(&base)?;
        }

        Ok(result)
    }

    /// Deterministic search for a point: the first x = 0, 1, 2, ... whose
    /// right-hand side is a non-zero square
    ///
    /// Of the two roots the smaller y is returned. At most `max_candidates`
    /// x values are tried.
    ///
    /// # Errors
    /// `KeyGenerationFailure` if no candidate qualifies.
    pub fn find_base_point(&self, max_candidates: usize) -> Result<Point> {
        for candidate in 0..max_candidates {
            let x = self.element(candidate);
            let rhs = self.rhs(&x);
            if rhs.is_zero() {
                continue;
            }
            if let Some(root) = rhs.sqrt() {
                let other = -&root;
                let y = if root.value() <= other.value() { root } else { other };
                debug!(x = candidate, "found base point");
                return Ok(Point::Affine { x, y });
            }
        }

        Err(CryptoError::KeyGenerationFailure(format!(
            "no base point among the first {} x coordinates",
            max_candidates
        )))
    }
}

/// A curve with a fixed generator and, when known, its order.
#[derive(Debug, Clone)]
pub struct CurveDomain {
    pub name: &'static str,
    pub curve: EllipticCurve,
    pub generator: Point,
    pub order: Option<BigInt>,
}

impl CurveDomain {
    /// y^2 = x^3 + 2x + 3 over the Mersenne prime 2^521 - 1
    ///
    /// Not a vetted named curve; its group order is unknown. The generator is
    /// the point `find_base_point` lands on, (3, 6).
    pub fn custom_m521() -> Result<Self> {
        let p = (BigInt::from(1u32) << 521u32) - 1u32;
        let curve = EllipticCurve::new(BigInt::from(2u32), BigInt::from(3u32), p)?;
        let generator = curve.point(BigInt::from(3u32), BigInt::from(6u32))?;
        Ok(Self {
            name: "custom-m521",
            curve,
            generator,
            order: None,
        })
    }

    /// NIST P-256 (secp256r1)
    pub fn p256() -> Result<Self> {
        let hex = |s: &str| crate::bigint::parse_hex(s);

        let p = hex("ffffffff00000001000000000000000000000000ffffffffffffffffffffffff")?;
        let b = hex("5ac635d8aa3a93e7b3ebbd55769886bc651d06b0cc53b0f63bce3c3e27d2604b")?;
        let gx = hex("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296")?;
        let gy = hex("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5")?;
        let n = hex("ffffffff00000000ffffffffffffffffbce6faada7179e84f3b9cac2fc632551")?;

        let a = &p - 3u32;
        let curve = EllipticCurve::new(a, b, p)?;
        let generator = curve.point(gx, gy)?;
        Ok(Self {
            name: "P-256",
            curve,
            generator,
            order: Some(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y^2 = x^3 + 2x + 3 over F_97; (3, 6) has order 5
    fn f97() -> EllipticCurve {
        EllipticCurve::new(BigInt::from(2), BigInt::from(3), BigInt::from(97)).unwrap()
    }

    fn pt(curve: &EllipticCurve, x: i64, y: i64) -> Point {
        curve.point(BigInt::from(x), BigInt::from(y)).unwrap()
    }

    #[test]
    fn test_point_on_curve() {
        let curve = f97();
        // 6^2 = 36 = 27 + 6 + 3
        assert!(curve.is_on_curve(&pt(&curve, 3, 6)));
        assert!(curve.is_on_curve(&curve.infinity()));
        assert_eq!(
            curve.point(BigInt::from(3), BigInt::from(7)),
            Err(CryptoError::InvalidPoint)
        );
        assert_eq!(
            curve.point(BigInt::from(100), BigInt::from(6)),
            Err(CryptoError::InvalidPoint)
        );
    }

    #[test]
    fn test_singular_curve_rejected() {
        // 4·0 + 27·0 = 0
        assert!(EllipticCurve::new(BigInt::from(0), BigInt::from(0), BigInt::from(97)).is_err());
        assert!(EllipticCurve::new(BigInt::from(1), BigInt::from(1), BigInt::from(3)).is_err());
    }

    #[test]
    fn test_identity_element() {
        let curve = f97();
        let point = pt(&curve, 3, 6);
        let inf = curve.infinity();

        // P + O = P
        assert_eq!(curve.add(&point, &inf).unwrap(), point);
        // O + P = P
        assert_eq!(curve.add(&inf, &point).unwrap(), point);
        assert_eq!(curve.add(&inf, &inf).unwrap(), inf);
    }

    #[test]
    fn test_point_doubling() {
        let curve = f97();
        let point = pt(&curve, 3, 6);

        let doubled = curve.double(&point).unwrap();
        // m = 29 / 12 ≡ 59, x3 = 59^2 - 6 ≡ 80, y3 = 59(3 - 80) - 6 ≡ 10
        assert_eq!(doubled, pt(&curve, 80, 10));
        assert_eq!(curve.add(&point, &point).unwrap(), doubled);
    }

    #[test]
    fn test_point_addition() {
        let curve = f97();
        let point = pt(&curve, 3, 6);
        let doubled = pt(&curve, 80, 10);

        let tripled = curve.add(&doubled, &point).unwrap();
        assert!(curve.is_on_curve(&tripled));
        // The group has order 5, so 3P = -2P
        assert_eq!(tripled, pt(&curve, 80, 87));
    }

    #[test]
    fn test_inverse_element() {
        let curve = f97();
        let point = pt(&curve, 3, 6);
        let neg_point = curve.negate(&point);

        assert!(curve.is_on_curve(&neg_point));
        assert!(curve.add(&point, &neg_point).unwrap().is_infinity());
    }

    #[test]
    fn test_vertical_tangent_doubles_to_infinity() {
        // y^2 = x^3 + 1 over F_97 contains (-1, 0)
        let curve =
            EllipticCurve::new(BigInt::from(0), BigInt::from(1), BigInt::from(97)).unwrap();
        let point = pt(&curve, 96, 0);
        assert!(curve.double(&point).unwrap().is_infinity());
        assert!(curve.add(&point, &point).unwrap().is_infinity());
    }

    #[test]
    fn test_composite_modulus_surfaces_not_invertible() {
        // y^2 = x^3 + x + 1 over Z/35; (0, 1) and (7, 1) differ in x by 7
        let curve =
            EllipticCurve::new(BigInt::from(1), BigInt::from(1), BigInt::from(35)).unwrap();
        let p = pt(&curve, 0, 1);
        let q = pt(&curve, 7, 1);
        assert_eq!(curve.add(&p, &q), Err(CryptoError::NotInvertible));
        assert_eq!(curve.add(&q, &p), Err(CryptoError::NotInvertible));
    }

    #[test]
    fn test_scalar_multiplication() {
        let curve = f97();
        let point = pt(&curve, 3, 6);

        assert!(curve.scalar_mul(&BigInt::from(0), &point).unwrap().is_infinity());
        assert_eq!(curve.scalar_mul(&BigInt::from(1), &point).unwrap(), point);

        let expected = curve.add(&point, &point).unwrap();
        assert_eq!(curve.scalar_mul(&BigInt::from(2), &point).unwrap(), expected);

        let expected = curve.add(&expected, &point).unwrap();
        assert_eq!(curve.scalar_mul(&BigInt::from(3), &point).unwrap(), expected);

        assert!(curve.scalar_mul(&BigInt::from(5), &point).unwrap().is_infinity());
        assert_eq!(curve.scalar_mul(&BigInt::from(6), &point).unwrap(), point);
        assert_eq!(
            curve.scalar_mul(&BigInt::from(-1), &point).unwrap(),
            curve.negate(&point)
        );
    }

    #[test]
    fn test_associativity() {
        let curve = f97();
        let p1 = pt(&curve, 3, 6);
        let p2 = curve.double(&p1).unwrap();
        let p3 = curve.negate(&p1);

        let left = curve.add(&curve.add(&p1, &p2).unwrap(), &p3).unwrap();
        let right = curve.add(&p1, &curve.add(&p2, &p3).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_find_base_point() {
        let curve = f97();
        let base = curve.find_base_point(97).unwrap();
        assert!(curve.is_on_curve(&base));

        let domain = CurveDomain::custom_m521().unwrap();
        let found = domain.curve.find_base_point(16).unwrap();
        assert_eq!(found, domain.generator);
        assert!(domain.curve.find_base_point(3).is_err());
    }

    #[test]
    fn test_p256_generator_has_order_n() {
        let domain = CurveDomain::p256().unwrap();
        let n = domain.order.clone().unwrap();
        assert!(domain.curve.is_on_curve(&domain.generator));
        assert!(domain.curve.scalar_mul(&n, &domain.generator).unwrap().is_infinity());

        let n_minus_1 = &n - 1u32;
        assert_eq!(
            domain.curve.scalar_mul(&n_minus_1, &domain.generator).unwrap(),
            domain.curve.negate(&domain.generator)
        );
    }
}
