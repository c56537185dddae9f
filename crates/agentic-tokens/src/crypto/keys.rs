//! Key pairs, public keys, and the injected signing capability.
//!
//! Ed25519 is bundled (via `ed25519-dalek`); SECP256R1 is carried as an
//! algorithm tag whose implementation arrives through the [`Signer`] and
//! [`SignatureVerifier`] strategy traits. There is no process-wide key
//! factory: anything that needs to sign or verify receives its capability
//! explicitly at construction.

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::FormatError;

/// Signature algorithm tag carried alongside every public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Ed25519,
    Secp256r1,
}

impl Algorithm {
    /// Stable wire id, little-endian encoded into signature payloads.
    pub fn tag(&self) -> u32 {
        match self {
            Algorithm::Ed25519 => 0,
            Algorithm::Secp256r1 => 1,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Ed25519 => write!(f, "ed25519"),
            Algorithm::Secp256r1 => write!(f, "secp256r1"),
        }
    }
}

/// A public key with its algorithm tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    algorithm: Algorithm,
    bytes: Vec<u8>,
}

impl PublicKey {
    pub fn new(algorithm: Algorithm, bytes: Vec<u8>) -> Result<Self, FormatError> {
        if algorithm == Algorithm::Ed25519 && bytes.len() != 32 {
            return Err(FormatError::InvalidKey(format!(
                "ed25519 public keys are 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }

    pub fn from_ed25519(key: &VerifyingKey) -> Self {
        Self {
            algorithm: Algorithm::Ed25519,
            bytes: key.to_bytes().to_vec(),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.algorithm, self.to_hex())
    }
}

/// Signs block payloads. Implemented by the bundled [`KeyPair`]; external
/// signers (KMS, HSM) implement this to keep private keys out of process.
pub trait Signer {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, FormatError>;

    fn public_key(&self) -> PublicKey;
}

/// Verifies signatures for the algorithms it supports.
pub trait SignatureVerifier {
    fn verify(
        &self,
        key: &PublicKey,
        payload: &[u8],
        signature: &[u8],
    ) -> Result<(), FormatError>;
}

/// The bundled verifier: Ed25519 in process, SECP256R1 refused — inject a
/// provider that understands it instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVerifier;

impl SignatureVerifier for DefaultVerifier {
    fn verify(
        &self,
        key: &PublicKey,
        payload: &[u8],
        signature: &[u8],
    ) -> Result<(), FormatError> {
        match key.algorithm() {
            Algorithm::Ed25519 => {
                let key_bytes: [u8; 32] = key
                    .to_bytes()
                    .try_into()
                    .map_err(|_| FormatError::InvalidKey("ed25519 key must be 32 bytes".into()))?;
                let verifying_key = VerifyingKey::from_bytes(&key_bytes)
                    .map_err(|e| FormatError::InvalidKey(format!("invalid ed25519 key: {e}")))?;
                let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| {
                    FormatError::Signature("ed25519 signatures must be 64 bytes".into())
                })?;
                verifying_key
                    .verify(payload, &Signature::from_bytes(&sig_bytes))
                    .map_err(|_| {
                        FormatError::Signature(
                            "verification equation was not satisfied".to_string(),
                        )
                    })
            }
            Algorithm::Secp256r1 => Err(FormatError::UnsupportedAlgorithm(
                "secp256r1 verification requires an injected verifier".to_string(),
            )),
        }
    }
}

/// Chooses the root public key used to verify a token, optionally driven
/// by the `root_key_id` hint in the container.
pub trait RootKeyProvider {
    fn choose(&self, key_id: Option<u32>) -> Result<PublicKey, FormatError>;
}

impl RootKeyProvider for PublicKey {
    fn choose(&self, _key_id: Option<u32>) -> Result<PublicKey, FormatError> {
        Ok(self.clone())
    }
}

/// An Ed25519 key pair.
///
/// The signing key is zeroized on drop to prevent private key leakage.
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    /// Generate a new random Ed25519 key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let key_bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FormatError::InvalidKey("ed25519 private keys are 32 bytes".into()))?;
        let signing_key = SigningKey::from_bytes(&key_bytes);
        let verifying_key = signing_key.verifying_key();
        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Return the private key bytes. Caller must zeroize after use.
    pub fn to_private_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Signer for KeyPair {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, FormatError> {
        Ok(self.signing_key.sign(payload).to_bytes().to_vec())
    }

    fn public_key(&self) -> PublicKey {
        PublicKey::from_ed25519(&self.verifying_key)
    }
}

impl Clone for KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
            verifying_key: self.verifying_key,
        }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print private key material
        f.debug_struct("KeyPair")
            .field("public", &self.public_key())
            .finish()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}
