//! # asymcrypt
//!
//! RSA, ElGamal and elliptic-curve encryption and signatures over
//! arbitrary-length UTF-8 text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use asymcrypt::{Algorithm, CryptoConfig, Dispatcher};
//!
//! let dispatcher = Dispatcher::generate(&CryptoConfig::default())?;
//!
//! let ciphertext = dispatcher.encrypt(Algorithm::ElGamal, "Hello, ElGamal!")?;
//! assert_eq!(dispatcher.decrypt(Algorithm::ElGamal, &ciphertext)?, "Hello, ElGamal!");
//!
//! let signature = dispatcher.sign(Algorithm::Rsa, "Hello, RSA!")?;
//! assert!(dispatcher.verify(Algorithm::Rsa, "Hello, RSA!", &signature)?);
//! # Ok::<(), asymcrypt::CryptoError>(())
//! ```
//!
//! ## Module Overview
//!
//! - [`bigint`] - Modular exponentiation, inverses, primality and secure sampling
//! - [`codec`] - Byte/integer encoding and capacity-bounded chunking
//! - [`field`] - Prime field arithmetic (𝔽_p)
//! - [`elliptic_curve`] - Short Weierstrass curves over 𝔽_p and named domains
//! - [`rsa`] - RSA-OAEP encryption and PKCS#1 v1.5 signatures
//! - [`elgamal`] - ElGamal encryption and signatures
//! - [`ecc`] - EC-ElGamal encryption and ECDSA signatures
//! - [`dispatcher`] - Algorithm selection and the request/response contract

pub mod bigint;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod ecc;
pub mod elgamal;
pub mod elliptic_curve;
pub mod error;
pub mod field;
pub mod rsa;

pub use config::{CryptoConfig, KeygenBudget};
pub use dispatcher::{Algorithm, Dispatcher, Request, Response};
pub use elliptic_curve::{CurveDomain, EllipticCurve, Point};
pub use error::{CryptoError, Result};
pub use field::{Field, FieldElement};
