use agentic_tokens::builder::{allow_if, check_if, fact, pred, string, var, BlockBuilder};
use agentic_tokens::{KeyPair, Signer, Token};
use criterion::{criterion_group, criterion_main, Criterion};

fn token_benchmarks(c: &mut Criterion) {
    // 1. Key generation
    c.bench_function("ed25519_keypair_generation", |b| {
        b.iter(|| {
            KeyPair::generate();
        });
    });

    // 2. Token minting (authority block build + sign)
    let root = KeyPair::generate();
    c.bench_function("token_mint", |b| {
        b.iter(|| {
            Token::builder()
                .fact(fact("right", &[string("file1"), string("read")]))
                .build(&root)
                .unwrap()
        });
    });

    // 3. Attenuation (append one check block)
    let token = Token::builder()
        .fact(fact("right", &[string("file1"), string("read")]))
        .build(&root)
        .unwrap();
    c.bench_function("token_append", |b| {
        b.iter(|| {
            token
                .append(BlockBuilder::new().check(check_if(&[
                    pred("resource", &[var("r")]),
                    pred("right", &[var("r"), string("read")]),
                ])))
                .unwrap()
        });
    });

    // 4. Verification + parse from bytes
    let attenuated = token
        .append(BlockBuilder::new().check(check_if(&[
            pred("resource", &[var("r")]),
            pred("right", &[var("r"), string("read")]),
        ])))
        .unwrap();
    let bytes = attenuated.to_bytes().unwrap();
    let root_key = root.public_key();
    c.bench_function("token_verify_parse", |b| {
        b.iter(|| Token::from_bytes(&bytes, &root_key).unwrap());
    });

    // 5. Full authorization (fixpoint + checks + policies)
    c.bench_function("token_authorize", |b| {
        b.iter(|| {
            let mut authorizer = attenuated.authorizer().unwrap();
            authorizer
                .add_fact(fact("resource", &[string("file1")]))
                .unwrap();
            authorizer.add_policy(allow_if(&[], &[]));
            authorizer.authorize().unwrap()
        });
    });

    // 6. Cloned baseline authorization (per-request reuse pattern)
    let mut baseline = attenuated.authorizer().unwrap();
    baseline
        .add_fact(fact("resource", &[string("file1")]))
        .unwrap();
    baseline.add_policy(allow_if(&[], &[]));
    c.bench_function("token_authorize_cloned_baseline", |b| {
        b.iter(|| {
            let mut authorizer = baseline.clone();
            authorizer.authorize().unwrap()
        });
    });
}

criterion_group!(benches, token_benchmarks);
criterion_main!(benches);
