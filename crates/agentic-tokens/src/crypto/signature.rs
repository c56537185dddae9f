//! Signature payload construction for the block chain.
//!
//! Every block's signature covers the serialized block body, the external
//! signature when one is present, and the next public key with its
//! algorithm tag encoded as a little-endian u32. Sealing signs the final
//! block again with its own signature appended, so no usable next key
//! remains.

use super::keys::PublicKey;

/// Payload signed for a regular (attenuable) block.
pub fn block_payload(
    data: &[u8],
    external_signature: Option<&[u8]>,
    next_key: &PublicKey,
) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(
        data.len() + external_signature.map_or(0, |s| s.len()) + 4 + next_key.to_bytes().len(),
    );
    buffer.extend_from_slice(data);
    if let Some(signature) = external_signature {
        buffer.extend_from_slice(signature);
    }
    buffer.extend_from_slice(&next_key.algorithm().tag().to_le_bytes());
    buffer.extend_from_slice(next_key.to_bytes());
    buffer
}

/// Payload signed when sealing a token: the last block plus its own
/// signature.
pub fn sealed_payload(data: &[u8], next_key: &PublicKey, block_signature: &[u8]) -> Vec<u8> {
    let mut buffer =
        Vec::with_capacity(data.len() + 4 + next_key.to_bytes().len() + block_signature.len());
    buffer.extend_from_slice(data);
    buffer.extend_from_slice(&next_key.algorithm().tag().to_le_bytes());
    buffer.extend_from_slice(next_key.to_bytes());
    buffer.extend_from_slice(block_signature);
    buffer
}

/// Payload signed by a third-party (external) signer: the block body tied
/// to the previous block's signature, so the external signature cannot be
/// replayed onto another chain.
pub fn external_payload(data: &[u8], previous_signature: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(data.len() + previous_signature.len());
    buffer.extend_from_slice(data);
    buffer.extend_from_slice(previous_signature);
    buffer
}
