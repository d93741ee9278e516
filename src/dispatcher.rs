//! Algorithm selection and the request contract
//!
//! [`Dispatcher`] owns one engine per scheme and routes the four operations
//! by [`Algorithm`]. It holds no interior mutability, so a single instance
//! can be shared across threads behind a reference or an `Arc`.

use crate::config::CryptoConfig;
use crate::ecc::{EcEncryptionEngine, EcSignatureEngine};
use crate::elgamal::ElGamalEngine;
use crate::error::{CryptoError, Result};
use crate::rsa::RsaEngine;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Algorithm {
    Rsa,
    ElGamal,
    Ecc,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Rsa, Algorithm::ElGamal, Algorithm::Ecc];
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Rsa => write!(f, "RSA"),
            Algorithm::ElGamal => write!(f, "ELGAMAL"),
            Algorithm::Ecc => write!(f, "ECC"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    /// Case-insensitive: `rsa`, `ElGamal` and `ECC` are all accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RSA" => Ok(Algorithm::Rsa),
            "ELGAMAL" => Ok(Algorithm::ElGamal),
            "ECC" => Ok(Algorithm::Ecc),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    rsa: RsaEngine,
    elgamal: ElGamalEngine,
    ec_encryption: EcEncryptionEngine,
    ec_signature: EcSignatureEngine,
}

impl Dispatcher {
    pub fn new(
        rsa: RsaEngine,
        elgamal: ElGamalEngine,
        ec_encryption: EcEncryptionEngine,
        ec_signature: EcSignatureEngine,
    ) -> Self {
        Self {
            rsa,
            elgamal,
            ec_encryption,
            ec_signature,
        }
    }

    /// Generates fresh key material for every engine
    #[instrument(
        level = "info",
        skip_all,
        fields(rsa_bits = config.rsa_bits, elgamal_bits = config.elgamal_bits)
    )]
    pub fn generate(config: &CryptoConfig) -> Result<Self> {
        config.validate()?;
        let dispatcher = Self::new(
            RsaEngine::generate(config)?,
            ElGamalEngine::generate(config)?,
            EcEncryptionEngine::generate(config)?,
            EcSignatureEngine::generate(config)?,
        );
        info!("all engines ready");
        Ok(dispatcher)
    }

    pub fn rsa(&self) -> &RsaEngine {
        &self.rsa
    }

    pub fn elgamal(&self) -> &ElGamalEngine {
        &self.elgamal
    }

    pub fn ec_encryption(&self) -> &EcEncryptionEngine {
        &self.ec_encryption
    }

    pub fn ec_signature(&self) -> &EcSignatureEngine {
        &self.ec_signature
    }

    #[instrument(level = "info", skip(self, message))]
    pub fn encrypt(&self, algorithm: Algorithm, message: &str) -> Result<String> {
        match algorithm {
            Algorithm::Rsa => self.rsa.encrypt(message),
            Algorithm::ElGamal => self.elgamal.encrypt(message),
            Algorithm::Ecc => self.ec_encryption.encrypt(message),
        }
    }

    #[instrument(level = "info", skip(self, ciphertext))]
    pub fn decrypt(&self, algorithm: Algorithm, ciphertext: &str) -> Result<String> {
        match algorithm {
            Algorithm::Rsa => self.rsa.decrypt(ciphertext),
            Algorithm::ElGamal => self.elgamal.decrypt(ciphertext),
            Algorithm::Ecc => self.ec_encryption.decrypt(ciphertext),
        }
    }

    #[instrument(level = "info", skip(self, message))]
    pub fn sign(&self, algorithm: Algorithm, message: &str) -> Result<String> {
        match algorithm {
            Algorithm::Rsa => self.rsa.sign(message),
            Algorithm::ElGamal => self.elgamal.sign(message),
            Algorithm::Ecc => self.ec_signature.sign(message),
        }
    }

    #[instrument(level = "info", skip(self, message, signature))]
    pub fn verify(&self, algorithm: Algorithm, message: &str, signature: &str) -> Result<bool> {
        match algorithm {
            Algorithm::Rsa => self.rsa.verify(message, signature),
            Algorithm::ElGamal => self.elgamal.verify(message, signature),
            Algorithm::Ecc => self.ec_signature.verify(message, signature),
        }
    }

    /// Runs one request; failures become an error response, never a panic.
    pub fn handle(&self, request: &Request) -> Response {
        let outcome = match request {
            Request::Encrypt { algorithm, message } => algorithm
                .parse::<Algorithm>()
                .and_then(|alg| self.encrypt(alg, message))
                .map(serde_json::Value::from),
            Request::Decrypt {
                algorithm,
                ciphertext,
            } => algorithm
                .parse::<Algorithm>()
                .and_then(|alg| self.decrypt(alg, ciphertext))
                .map(serde_json::Value::from),
            Request::Sign { algorithm, message } => algorithm
                .parse::<Algorithm>()
                .and_then(|alg| self.sign(alg, message))
                .map(serde_json::Value::from),
            Request::Verify {
                algorithm,
                message,
                signature,
            } => algorithm
                .parse::<Algorithm>()
                .and_then(|alg| self.verify(alg, message, signature))
                .map(serde_json::Value::from),
        };

        match outcome {
            Ok(value) => Response::success(value),
            Err(e) => Response::failure(&e),
        }
    }
}

/// One line of the `serve` protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Encrypt {
        algorithm: String,
        message: String,
    },
    Decrypt {
        algorithm: String,
        ciphertext: String,
    },
    Sign {
        algorithm: String,
        message: String,
    },
    Verify {
        algorithm: String,
        message: String,
        signature: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            detail: None,
        }
    }

    pub fn failure(error: &CryptoError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.kind().to_string()),
            detail: Some(error.to_string()),
        }
    }

    /// A request line that could not be parsed at all
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some("invalid_request".to_string()),
            detail: Some(detail.into()),
        }
    }
}
