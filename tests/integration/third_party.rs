//! Integration test: third-party blocks and public-key trust scopes.
//!
//! A block signed by an external key contributes facts that no rule trusts
//! by default; only a rule or check that names the signer's public key in a
//! `trusting` scope can read them.

use agentic_tokens::builder::{allow_if, fact, pred, string, var, BlockBuilder, Check, Rule, Scope};
use agentic_tokens::datalog::CheckKind;
use agentic_tokens::{
    FailedCheck, KeyPair, LogicError, PublicKey, Signer, Token, TokenError,
};

fn vetted_token(root: &KeyPair, external: &KeyPair) -> Token {
    Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(root)
        .unwrap()
        .append_third_party(
            external,
            BlockBuilder::new().fact(fact("vetted", &[string("file1")])),
        )
        .unwrap()
}

fn vetted_check(scopes: Vec<Scope>) -> Check {
    Check::new(
        CheckKind::One,
        vec![Rule::new(
            pred("query", &[]),
            vec![pred("vetted", &[var("f")])],
            vec![],
            scopes,
        )],
    )
}

#[test]
fn external_facts_are_untrusted_by_default() {
    let root = KeyPair::generate();
    let external = KeyPair::generate();
    let token = vetted_token(&root, &external);

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_check(vetted_check(vec![]));
    authorizer.add_policy(allow_if(&[], &[]));

    match authorizer.authorize() {
        Err(TokenError::FailedLogic(LogicError::Unauthorized { checks, .. })) => {
            assert!(matches!(checks[0], FailedCheck::Authorizer { .. }));
        }
        other => panic!("expected the unscoped check to fail, got {other:?}"),
    }
}

#[test]
fn public_key_scope_trusts_the_signer() {
    let root = KeyPair::generate();
    let external = KeyPair::generate();
    let token = vetted_token(&root, &external);

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_check(vetted_check(vec![Scope::PublicKey(external.public_key())]));
    authorizer.add_policy(allow_if(&[], &[]));

    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn wrong_public_key_scope_trusts_nothing() {
    let root = KeyPair::generate();
    let external = KeyPair::generate();
    let unrelated: PublicKey = KeyPair::generate().public_key();
    let token = vetted_token(&root, &external);

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_check(vetted_check(vec![Scope::PublicKey(unrelated)]));
    authorizer.add_policy(allow_if(&[], &[]));

    assert!(matches!(
        authorizer.authorize(),
        Err(TokenError::FailedLogic(LogicError::Unauthorized { .. }))
    ));
}

#[test]
fn tampered_external_signature_fails_verification() {
    let root = KeyPair::generate();
    let external = KeyPair::generate();
    let token = vetted_token(&root, &external);

    let mut container =
        agentic_tokens::SerializedToken::from_bytes(&token.to_bytes().unwrap()).unwrap();
    if let Some(ext) = &mut container.blocks[1].external_signature {
        ext.signature[0] ^= 0x01;
    }
    assert!(Token::from_bytes(&container.to_bytes().unwrap(), &root.public_key()).is_err());
}
