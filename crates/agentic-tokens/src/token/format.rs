//! The signed container: block bytes, link keys, signatures, proof.
//!
//! The chain construction follows one invariant: block 0 is signed by the
//! root key, and every block `i` is signed by the key declared as "next" in
//! block `i-1`. Verification folds over the blocks recomputing each payload
//! and advancing the current key; the token is valid iff every signature
//! verifies and the chain's final next-key matches the proof.

use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::{
    block_payload, external_payload, sealed_payload, KeyPair, PublicKey, SignatureVerifier, Signer,
};
use crate::error::{FormatError, TokenError};

const BASE64: base64::engine::general_purpose::GeneralPurpose =
    base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// A third-party signature carried beside a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSignature {
    pub public_key: PublicKey,
    pub signature: Vec<u8>,
}

/// One link of the chain: serialized block body, the next public key, and
/// the signature binding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBlock {
    pub data: Vec<u8>,
    pub next_key: PublicKey,
    pub signature: Vec<u8>,
    pub external_signature: Option<ExternalSignature>,
}

/// What the holder retains to extend or terminate the chain.
///
/// `NextSecret` carries the private key matching the last block's declared
/// next-key; `FinalSignature` seals the token instead, so no usable next
/// key remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Proof {
    NextSecret(Vec<u8>),
    FinalSignature(Vec<u8>),
}

/// The externally visible artifact: the ordered signed blocks plus the
/// holder's proof and an optional root key id hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedToken {
    pub root_key_id: Option<u32>,
    pub blocks: Vec<SignedBlock>,
    pub proof: Proof,
}

impl SerializedToken {
    /// Sign an authority block with the root signer, handing the chain to
    /// `next`.
    pub fn new(
        root: &dyn Signer,
        root_key_id: Option<u32>,
        authority_data: Vec<u8>,
        next: &KeyPair,
    ) -> Result<Self, TokenError> {
        let next_public = next.public_key();
        let payload = block_payload(&authority_data, None, &next_public);
        let signature = root.sign(&payload).map_err(TokenError::Format)?;
        Ok(Self {
            root_key_id,
            blocks: vec![SignedBlock {
                data: authority_data,
                next_key: next_public,
                signature,
                external_signature: None,
            }],
            proof: Proof::NextSecret(next.to_private_bytes().to_vec()),
        })
    }

    /// Append a block signed with the current holder key, handing the
    /// chain to `next`. Fails with [`FormatError::SealedToken`] once the
    /// chain is terminated.
    pub fn append(
        &self,
        next: &KeyPair,
        data: Vec<u8>,
        external_signature: Option<ExternalSignature>,
    ) -> Result<Self, TokenError> {
        let current = self.next_keypair()?;
        let next_public = next.public_key();
        let payload = block_payload(
            &data,
            external_signature.as_ref().map(|e| e.signature.as_slice()),
            &next_public,
        );
        let signature = current.sign(&payload).map_err(TokenError::Format)?;

        let mut blocks = self.blocks.clone();
        blocks.push(SignedBlock {
            data,
            next_key: next_public,
            signature,
            external_signature,
        });
        Ok(Self {
            root_key_id: self.root_key_id,
            blocks,
            proof: Proof::NextSecret(next.to_private_bytes().to_vec()),
        })
    }

    /// Terminate the chain: replace the next secret with a final signature
    /// over the last block, so the token cannot be attenuated further.
    pub fn seal(&self) -> Result<Self, TokenError> {
        let current = self.next_keypair()?;
        let last = self.blocks.last().ok_or(FormatError::EmptyToken)?;
        let payload = sealed_payload(&last.data, &last.next_key, &last.signature);
        let signature = current.sign(&payload).map_err(TokenError::Format)?;
        Ok(Self {
            root_key_id: self.root_key_id,
            blocks: self.blocks.clone(),
            proof: Proof::FinalSignature(signature),
        })
    }

    /// Verify the whole chain against the root public key.
    pub fn verify(
        &self,
        root: &PublicKey,
        verifier: &dyn SignatureVerifier,
    ) -> Result<(), TokenError> {
        if self.blocks.is_empty() {
            return Err(FormatError::EmptyToken.into());
        }

        let mut current_key = root.clone();
        let mut previous_signature: Option<&[u8]> = None;
        for block in &self.blocks {
            let payload = block_payload(
                &block.data,
                block
                    .external_signature
                    .as_ref()
                    .map(|e| e.signature.as_slice()),
                &block.next_key,
            );
            verifier
                .verify(&current_key, &payload, &block.signature)
                .map_err(|e| {
                    log::debug!("block signature rejected: {e}");
                    TokenError::Format(e)
                })?;

            if let Some(external) = &block.external_signature {
                let previous = previous_signature.ok_or_else(|| {
                    FormatError::Signature(
                        "the authority block cannot carry an external signature".to_string(),
                    )
                })?;
                let payload = external_payload(&block.data, previous);
                verifier
                    .verify(&external.public_key, &payload, &external.signature)
                    .map_err(TokenError::Format)?;
            }

            previous_signature = Some(&block.signature);
            current_key = block.next_key.clone();
        }

        match &self.proof {
            Proof::NextSecret(secret) => {
                let keypair = KeyPair::from_bytes(secret).map_err(TokenError::Format)?;
                if keypair.public_key() == current_key {
                    Ok(())
                } else {
                    Err(FormatError::Signature(
                        "the next keypair does not match the chain".to_string(),
                    )
                    .into())
                }
            }
            Proof::FinalSignature(signature) => {
                // unwrap-free: emptiness was rejected above
                let last = self.blocks.last().ok_or(FormatError::EmptyToken)?;
                let payload = sealed_payload(&last.data, &last.next_key, &last.signature);
                verifier
                    .verify(&current_key, &payload, signature)
                    .map_err(TokenError::Format)
            }
        }
    }

    /// The holder keypair able to extend the chain.
    pub fn next_keypair(&self) -> Result<KeyPair, TokenError> {
        match &self.proof {
            Proof::NextSecret(secret) => {
                KeyPair::from_bytes(secret).map_err(TokenError::Format)
            }
            Proof::FinalSignature(_) => Err(FormatError::SealedToken.into()),
        }
    }

    /// One revocation identifier per block: the SHA-256 of its signature.
    pub fn revocation_ids(&self) -> Vec<Vec<u8>> {
        self.blocks
            .iter()
            .map(|b| Sha256::digest(&b.signature).to_vec())
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        bincode::serialize(self).map_err(|e| FormatError::Serialization(e.to_string()).into())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, TokenError> {
        bincode::deserialize(data)
            .map_err(|e| FormatError::Deserialization(e.to_string()).into())
    }

    pub fn to_base64(&self) -> Result<String, TokenError> {
        Ok(BASE64.encode(self.to_bytes()?))
    }

    pub fn from_base64(data: &str) -> Result<Self, TokenError> {
        let bytes = BASE64
            .decode(data)
            .map_err(|e| FormatError::Deserialization(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::DefaultVerifier;

    fn chain() -> (KeyPair, SerializedToken) {
        let root = KeyPair::generate();
        let first = KeyPair::generate();
        let token = SerializedToken::new(&root, None, b"authority".to_vec(), &first).unwrap();
        let second = KeyPair::generate();
        let token = token.append(&second, b"restriction".to_vec(), None).unwrap();
        (root, token)
    }

    #[test]
    fn test_chain_verifies() {
        let (root, token) = chain();
        assert!(token.verify(&root.public_key(), &DefaultVerifier).is_ok());
    }

    #[test]
    fn test_wrong_root_fails() {
        let (_root, token) = chain();
        let other = KeyPair::generate();
        assert!(token.verify(&other.public_key(), &DefaultVerifier).is_err());
    }

    #[test]
    fn test_any_flipped_byte_fails() {
        let (root, token) = chain();
        let root_key = root.public_key();

        for block_index in 0..token.blocks.len() {
            let mut tampered = token.clone();
            tampered.blocks[block_index].data.push(0xde);
            assert!(
                tampered.verify(&root_key, &DefaultVerifier).is_err(),
                "tampered data in block {block_index} must not verify"
            );

            let mut tampered = token.clone();
            tampered.blocks[block_index].signature[0] ^= 0x01;
            assert!(
                tampered.verify(&root_key, &DefaultVerifier).is_err(),
                "tampered signature in block {block_index} must not verify"
            );
        }
    }

    #[test]
    fn test_sealed_token_verifies_and_refuses_append() {
        let (root, token) = chain();
        let sealed = token.seal().unwrap();
        assert!(sealed.verify(&root.public_key(), &DefaultVerifier).is_ok());

        let next = KeyPair::generate();
        assert!(matches!(
            sealed.append(&next, b"more".to_vec(), None),
            Err(TokenError::Format(FormatError::SealedToken))
        ));
        assert!(matches!(
            sealed.seal(),
            Err(TokenError::Format(FormatError::SealedToken))
        ));
    }

    #[test]
    fn test_sealed_final_signature_is_checked() {
        let (root, token) = chain();
        let mut sealed = token.seal().unwrap();
        if let Proof::FinalSignature(sig) = &mut sealed.proof {
            sig[0] ^= 0x01;
        }
        assert!(sealed.verify(&root.public_key(), &DefaultVerifier).is_err());
    }

    #[test]
    fn test_container_round_trip() {
        let (_root, token) = chain();
        let encoded = token.to_base64().unwrap();
        assert_eq!(SerializedToken::from_base64(&encoded).unwrap(), token);
    }

    #[test]
    fn test_truncated_container_is_rejected() {
        let (_root, token) = chain();
        let mut bytes = token.to_bytes().unwrap();
        bytes.truncate(bytes.len() - 5);
        assert!(SerializedToken::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_revocation_ids_are_per_block() {
        let (_root, token) = chain();
        let ids = token.revocation_ids();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[0].len(), 32);
    }
}
