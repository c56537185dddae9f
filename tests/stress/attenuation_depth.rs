//! Stress test: deep attenuation chains.
//!
//! Every append adds a signature link and a block-local symbol slice; the
//! whole chain must keep verifying and authorizing as it grows.

use agentic_tokens::builder::{allow_if, check_if, fact, pred, string, BlockBuilder};
use agentic_tokens::{KeyPair, Signer, Token};

const DEPTH: usize = 24;

#[test]
fn deep_chain_verifies_and_authorizes() {
    let root = KeyPair::generate();
    let mut token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(&root)
        .unwrap();

    for i in 0..DEPTH {
        let marker = format!("stage-{i}");
        token = token
            .append(
                BlockBuilder::new()
                    .fact(fact("stage", &[string(&marker)]))
                    .check(check_if(&[pred("right", &[string("file1"), string("read")])])),
            )
            .unwrap();
    }
    assert_eq!(token.block_count(), DEPTH + 1);

    // round-trip through bytes re-verifies every link
    let parsed = Token::from_bytes(&token.to_bytes().unwrap(), &root.public_key()).unwrap();
    assert_eq!(parsed.block_count(), DEPTH + 1);
    assert_eq!(parsed.revocation_ids().len(), DEPTH + 1);

    // every block's check looks at the authority fact, which all blocks
    // trust by default
    let mut authorizer = parsed.authorizer().unwrap();
    authorizer.add_policy(allow_if(&[], &[]));
    assert_eq!(authorizer.authorize().unwrap(), 0);
}

#[test]
fn deep_chain_symbol_tables_stay_disjoint() {
    let root = KeyPair::generate();
    let mut token = Token::builder()
        .fact(fact("right", &[string("shared"), string("read")]))
        .build(&root)
        .unwrap();

    // every block reuses the shared string and introduces one of its own;
    // the shared one must never be re-interned ("resource" is a default
    // symbol and stays out of block tables entirely)
    for i in 0..DEPTH {
        token = token
            .append(
                BlockBuilder::new()
                    .fact(fact("resource", &[string("shared"), string(&format!("own-{i}"))])),
            )
            .unwrap();
    }

    let parsed = Token::from_bytes(&token.to_bytes().unwrap(), &root.public_key()).unwrap();
    for (i, block) in parsed.blocks().iter().enumerate() {
        assert_eq!(block.symbols, vec![format!("own-{i}")]);
    }
}
