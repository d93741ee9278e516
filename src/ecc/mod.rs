//! Elliptic-curve cryptosystem
//!
//! Two engines with separate key material:
//! - [`EcEncryptionEngine`]: hash-masked EC-ElGamal on the custom 521-bit curve
//! - [`EcSignatureEngine`]: ECDSA on P-256
//!
//! Both wire formats use `|` between fields.

pub mod encryption;
pub mod signature;

pub use encryption::EcEncryptionEngine;
pub use signature::EcSignatureEngine;

/// Plaintext bytes per encrypted chunk
pub const BLOCK_SIZE: usize = 60;

pub(crate) const FIELD_SEPARATOR: &str = "|";
