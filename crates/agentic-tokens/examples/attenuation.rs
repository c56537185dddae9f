//! Attenuation — narrow a token offline, then watch the narrowed copy
//! refuse what the original allowed.
//!
//! Run with:
//!   cargo run --example attenuation -p agentic-tokens

use agentic_tokens::builder::{allow_if, check_if, fact, pred, string, var, BlockBuilder};
use agentic_tokens::{KeyPair, Token, TokenError};

fn main() -> agentic_tokens::Result<()> {
    let root = KeyPair::generate();

    // the service mints a broad token: read and write on every file
    let broad = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .fact(fact("right", &[string("file1"), string("write")]))
        .build(&root)?;

    // the holder forwards a narrowed copy to a subcontractor: read only.
    // No round-trip to the issuer — the holder signs the new block with
    // the chain's own next key.
    let narrowed = broad.append(BlockBuilder::new().check(check_if(&[
        pred("operation", &[string("read")]),
        pred("right", &[var("r"), string("read")]),
    ])))?;

    for (label, operation) in [("read", "read"), ("write", "write")] {
        let mut authorizer = narrowed.authorizer()?;
        authorizer.add_fact(fact("resource", &[string("file1")]))?;
        authorizer.add_fact(fact("operation", &[string(operation)]))?;
        authorizer.add_policy(allow_if(&[], &[]));

        match authorizer.authorize() {
            Ok(policy) => println!("{label}: allowed by policy {policy}"),
            Err(TokenError::FailedLogic(err)) => println!("{label}: refused ({err})"),
            Err(err) => return Err(err),
        }
    }

    // sealing terminates the chain: nobody can narrow (or extend) further
    let sealed = narrowed.seal()?;
    match sealed.append(BlockBuilder::new().check(check_if(&[pred(
        "operation",
        &[string("read")],
    )]))) {
        Err(TokenError::Format(err)) => println!("sealed: append refused ({err})"),
        other => panic!("sealed tokens must refuse attenuation, got {other:?}"),
    }
    Ok(())
}
