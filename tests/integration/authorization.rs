//! Integration test: the full authorization lifecycle.
//!
//! Covers the canonical flow:
//! 1. Mint a token granting `right("file1", "read")`
//! 2. Attenuate it with a resource/operation check
//! 3. Authorize with matching caller context → allow
//! 4. Authorize with mismatched context → the attenuation check fails
//! 5. Trust scoping between blocks
//! 6. Deadline enforcement

use std::time::Duration;

use agentic_tokens::builder::{
    allow_if, check_if, constrained_check_if, fact, pred, string, var, BlockBuilder,
};
use agentic_tokens::{
    Authorizer, FailedCheck, KeyPair, LogicError, MatchedPolicy, RunLimits, Signer, Token,
    TokenError,
};

fn read_token(root: &KeyPair) -> Token {
    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(root)
        .expect("the authority block should build");

    token
        .append(BlockBuilder::new().check(check_if(&[
            pred("resource", &[var("r")]),
            pred("operation", &[string("read")]),
            pred("right", &[var("r"), string("read")]),
        ])))
        .expect("attenuation should succeed")
}

#[test]
fn attenuated_token_allows_matching_request() {
    let root = KeyPair::generate();
    let token = read_token(&root);

    // ── Verify offline and authorize ────────────────────────────────────
    let parsed = Token::from_bytes(&token.to_bytes().unwrap(), &root.public_key())
        .expect("the token should verify against the root key");

    let mut authorizer = parsed.authorizer().unwrap();
    authorizer.add_fact(fact("resource", &[string("file1")])).unwrap();
    authorizer.add_fact(fact("operation", &[string("read")])).unwrap();
    authorizer.add_policy(allow_if(&[], &[]));

    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn attenuated_token_refuses_mismatched_request() {
    let root = KeyPair::generate();
    let token = read_token(&root);

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_fact(fact("resource", &[string("file2")])).unwrap();
    authorizer.add_fact(fact("operation", &[string("write")])).unwrap();
    authorizer.add_policy(allow_if(&[], &[]));

    // the allow policy matches, but the attenuation block's check fails
    match authorizer.authorize() {
        Err(TokenError::FailedLogic(LogicError::Unauthorized { policy, checks })) => {
            assert_eq!(policy, MatchedPolicy::Allow(0));
            assert_eq!(checks.len(), 1);
            assert!(matches!(
                checks[0],
                FailedCheck::Block {
                    block_id: 1,
                    check_id: 0,
                    ..
                }
            ));
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[test]
fn check_failures_accumulate() {
    let root = KeyPair::generate();
    let token = Token::builder()
        .check(check_if(&[pred("resource", &[string("a")])]))
        .check(check_if(&[pred("resource", &[string("b")])]))
        .build(&root)
        .unwrap();

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_policy(allow_if(&[], &[]));

    // both failing checks are reported, not just the first
    match authorizer.authorize() {
        Err(TokenError::FailedLogic(LogicError::Unauthorized { checks, .. })) => {
            assert_eq!(checks.len(), 2);
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[test]
fn earlier_blocks_never_see_later_facts() {
    let root = KeyPair::generate();

    // block 1 checks for a fact that only block 2 asserts
    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(&root)
        .unwrap()
        .append(BlockBuilder::new().check(check_if(&[pred("endorsed", &[var("x")])])))
        .unwrap()
        .append(BlockBuilder::new().fact(fact("endorsed", &[string("file1")])))
        .unwrap();

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_policy(allow_if(&[], &[]));

    match authorizer.authorize() {
        Err(TokenError::FailedLogic(LogicError::Unauthorized { checks, .. })) => {
            assert!(matches!(
                checks[0],
                FailedCheck::Block { block_id: 1, .. }
            ));
        }
        other => panic!("expected the block 1 check to fail, got {other:?}"),
    }
}

#[test]
fn previous_scope_reaches_earlier_blocks() {
    use agentic_tokens::builder::{Check, Rule, Scope};
    use agentic_tokens::datalog::CheckKind;

    let root = KeyPair::generate();

    // block 1 asserts a fact; block 2's check trusts `previous` explicitly
    let scoped_check = Check::new(
        CheckKind::One,
        vec![Rule::new(
            pred("query", &[]),
            vec![pred("endorsed", &[var("x")])],
            vec![],
            vec![Scope::Previous],
        )],
    );

    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(&root)
        .unwrap()
        .append(BlockBuilder::new().fact(fact("endorsed", &[string("file1")])))
        .unwrap()
        .append(BlockBuilder::new().check(scoped_check))
        .unwrap();

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_policy(allow_if(&[], &[]));
    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn unauthenticated_authorizer_applies_policies() {
    let mut authorizer = Authorizer::new();
    authorizer.add_fact(fact("role", &[string("admin")])).unwrap();
    authorizer.add_policy(allow_if(&[pred("role", &[string("admin")])], &[]));
    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn expression_guards_gate_checks() {
    use agentic_tokens::builder::Expression;
    use agentic_tokens::datalog::BinaryOp;

    let root = KeyPair::generate();
    let token = Token::builder()
        .fact(fact("quota", &[]))
        .build(&root)
        .unwrap();

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_fact(fact("request_size", &[agentic_tokens::builder::int(512)])).unwrap();
    authorizer.add_check(constrained_check_if(
        &[pred("request_size", &[var("n")])],
        &[Expression::Binary(
            BinaryOp::LessOrEqual,
            Box::new(Expression::Value(var("n"))),
            Box::new(Expression::Value(agentic_tokens::builder::int(1024))),
        )],
    ));
    authorizer.add_policy(allow_if(&[], &[]));
    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn zero_deadline_times_out() {
    let root = KeyPair::generate();
    let token = read_token(&root);

    let mut authorizer = token.authorizer().unwrap();
    authorizer.add_check(check_if(&[pred("resource", &[string("file1")])]));
    authorizer.add_policy(allow_if(&[], &[]));

    let limits = RunLimits {
        max_time: Duration::ZERO,
        ..RunLimits::default()
    };
    assert!(matches!(
        authorizer.authorize_with_limits(&limits),
        Err(TokenError::Timeout) | Err(TokenError::RunLimit(_))
    ));
}
