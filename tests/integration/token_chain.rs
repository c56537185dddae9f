//! Integration test: signature chain construction and verification.
//!
//! 1. Mint, attenuate, serialize, reparse
//! 2. Tampering with any byte breaks verification
//! 3. Sealing terminates the chain
//! 4. Root key selection through a provider

use agentic_tokens::builder::{check_if, fact, pred, string, BlockBuilder};
use agentic_tokens::{
    FormatError, KeyPair, PublicKey, RootKeyProvider, Signer, Token, TokenError,
};

fn sample_token(root: &KeyPair) -> Token {
    Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .fact(fact("right", &[string("file2"), string("read")]))
        .context("issued by the api gateway")
        .build(root)
        .unwrap()
        .append(BlockBuilder::new().check(check_if(&[pred("resource", &[string("file1")])])))
        .unwrap()
}

#[test]
fn serialized_token_round_trips() {
    let root = KeyPair::generate();
    let token = sample_token(&root);

    let base64 = token.to_base64().unwrap();
    let parsed = Token::from_base64(&base64, &root.public_key()).unwrap();
    assert_eq!(parsed.block_count(), 2);
    assert_eq!(parsed.contexts()[0], Some("issued by the api gateway"));
    assert_eq!(parsed.revocation_ids(), token.revocation_ids());
}

#[test]
fn verification_rejects_the_wrong_root() {
    let root = KeyPair::generate();
    let impostor = KeyPair::generate();
    let token = sample_token(&root);

    let err = Token::from_bytes(&token.to_bytes().unwrap(), &impostor.public_key());
    assert!(matches!(
        err,
        Err(TokenError::Format(FormatError::Signature(_)))
    ));
}

#[test]
fn bit_flips_anywhere_break_verification() {
    let root = KeyPair::generate();
    let token = sample_token(&root);
    let bytes = token.to_bytes().unwrap();

    // flip one byte at a spread of offsets; every position must fail either
    // deserialization or signature verification
    let step = (bytes.len() / 16).max(1);
    for offset in (0..bytes.len()).step_by(step) {
        let mut tampered = bytes.clone();
        tampered[offset] ^= 0x01;
        assert!(
            Token::from_bytes(&tampered, &root.public_key()).is_err(),
            "flipping byte {offset} must not produce a valid token"
        );
    }
}

#[test]
fn sealed_token_still_verifies_but_cannot_grow() {
    let root = KeyPair::generate();
    let sealed = sample_token(&root).seal().unwrap();

    let parsed = Token::from_bytes(&sealed.to_bytes().unwrap(), &root.public_key()).unwrap();
    assert_eq!(parsed.block_count(), 2);

    let result = parsed.append(
        BlockBuilder::new().check(check_if(&[pred("operation", &[string("read")])])),
    );
    assert!(matches!(
        result,
        Err(TokenError::Format(FormatError::SealedToken))
    ));
}

/// A provider holding several root keys, selected by the container hint.
struct KeyRing {
    keys: Vec<PublicKey>,
}

impl RootKeyProvider for KeyRing {
    fn choose(&self, key_id: Option<u32>) -> Result<PublicKey, FormatError> {
        let index = key_id.unwrap_or(0) as usize;
        self.keys
            .get(index)
            .cloned()
            .ok_or(FormatError::UnknownRootKeyId(key_id))
    }
}

#[test]
fn root_key_provider_selects_by_hint() {
    let old_root = KeyPair::generate();
    let new_root = KeyPair::generate();
    let ring = KeyRing {
        keys: vec![old_root.public_key(), new_root.public_key()],
    };

    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .root_key_id(1)
        .build(&new_root)
        .unwrap();

    assert!(Token::from_bytes(&token.to_bytes().unwrap(), &ring).is_ok());

    let unknown = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .root_key_id(7)
        .build(&new_root)
        .unwrap();
    assert!(matches!(
        Token::from_bytes(&unknown.to_bytes().unwrap(), &ring),
        Err(TokenError::Format(FormatError::UnknownRootKeyId(Some(7))))
    ));
}

#[test]
fn overlapping_symbol_tables_are_rejected() {
    use agentic_tokens::SerializedToken;

    let root = KeyPair::generate();
    let token = sample_token(&root);

    // splice the authority block's bytes in as a second block: its symbol
    // table repeats the authority's strings
    let mut container = SerializedToken::from_bytes(&token.to_bytes().unwrap()).unwrap();
    let next = KeyPair::generate();
    let duplicated = container.blocks[0].data.clone();
    container = container.append(&next, duplicated, None).unwrap();

    let err = Token::from_bytes(&container.to_bytes().unwrap(), &root.public_key());
    assert!(matches!(
        err,
        Err(TokenError::Format(FormatError::SymbolTableOverlap))
    ));
}
