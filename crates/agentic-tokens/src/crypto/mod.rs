//! Cryptographic primitives for the block signature chain.
//!
//! Signing and verification are injected capabilities: the bundled
//! [`KeyPair`] covers Ed25519, and the [`Signer`] / [`SignatureVerifier`]
//! traits let embedders bring their own implementation (KMS signers,
//! SECP256R1 verifiers) without any global registry.

pub mod keys;
pub mod signature;

pub use keys::{
    Algorithm, DefaultVerifier, KeyPair, PublicKey, RootKeyProvider, SignatureVerifier, Signer,
};
pub use signature::{block_payload, external_payload, sealed_payload};
