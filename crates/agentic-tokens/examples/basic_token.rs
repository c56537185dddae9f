//! Basic Token — mint a token, verify it offline, authorize a request.
//!
//! Run with:
//!   cargo run --example basic_token -p agentic-tokens

use agentic_tokens::builder::{allow_if, check_if, fact, pred, string};
use agentic_tokens::{KeyPair, Signer, Token};

fn main() -> agentic_tokens::Result<()> {
    // ── 1. Mint a token with the root key ───────────────────────────────────
    //
    // The authority block carries the facts the root is willing to vouch
    // for. Everything else — context facts, policies — is supplied by the
    // verifier at authorization time.
    let root = KeyPair::generate();
    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .fact(fact("right", &[string("file2"), string("read")]))
        .context("issued for demo purposes")
        .build(&root)?;

    println!("Token minted");
    println!("  Blocks:  {}", token.block_count());
    println!("  Encoded: {}...", &token.to_base64()?[..48]);
    println!();

    // ── 2. Verify offline against the root public key ───────────────────────
    //
    // The wire form is self-contained: any holder of the root public key
    // can check the signature chain without contacting the issuer.
    let bytes = token.to_bytes()?;
    let parsed = Token::from_bytes(&bytes, &root.public_key())?;
    println!("Signature chain verified");
    println!("{}", parsed.print());
    println!();

    // ── 3. Authorize a request ──────────────────────────────────────────────
    let mut authorizer = parsed.authorizer()?;
    authorizer.add_fact(fact("resource", &[string("file1")]))?;
    authorizer.add_fact(fact("operation", &[string("read")]))?;
    authorizer.add_check(check_if(&[
        pred("resource", &[string("file1")]),
        pred("right", &[string("file1"), string("read")]),
    ]));
    authorizer.add_policy(allow_if(&[], &[]));

    let policy = authorizer.authorize()?;
    println!("Authorized by policy {policy}");
    Ok(())
}
