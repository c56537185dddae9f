//! Stress test: resource limits against expansive rule sets.
//!
//! A rule set whose closure far exceeds the budget must terminate the
//! evaluation with a RunLimit error instead of exhausting memory or time.

use std::time::Duration;

use agentic_tokens::builder::{allow_if, fact, int, pred, rule, var};
use agentic_tokens::{Authorizer, RunLimitError, RunLimits, TokenError};

fn chain_authorizer(links: i64) -> Authorizer {
    let mut authorizer = Authorizer::new();
    for i in 0..links {
        authorizer
            .add_fact(fact("link", &[int(i), int(i + 1)]))
            .unwrap();
    }
    authorizer
        .add_rule(rule(
            "reach",
            &[var("x"), var("y")],
            &[pred("link", &[var("x"), var("y")])],
        ))
        .unwrap();
    authorizer
        .add_rule(rule(
            "reach",
            &[var("x"), var("z")],
            &[
                pred("reach", &[var("x"), var("y")]),
                pred("link", &[var("y"), var("z")]),
            ],
        ))
        .unwrap();
    authorizer
}

#[test]
fn fact_budget_stops_the_closure() {
    let mut authorizer = chain_authorizer(40);
    authorizer.add_policy(allow_if(&[], &[]));

    let limits = RunLimits {
        max_facts: 100,
        max_iterations: 10_000,
        max_time: Duration::from_secs(5),
    };
    assert!(matches!(
        authorizer.authorize_with_limits(&limits),
        Err(TokenError::RunLimit(RunLimitError::TooManyFacts))
    ));
}

#[test]
fn iteration_budget_stops_the_closure() {
    let mut authorizer = chain_authorizer(40);
    authorizer.add_policy(allow_if(&[], &[]));

    let limits = RunLimits {
        max_facts: 1_000_000,
        max_iterations: 3,
        max_time: Duration::from_secs(5),
    };
    assert!(matches!(
        authorizer.authorize_with_limits(&limits),
        Err(TokenError::RunLimit(RunLimitError::TooManyIterations))
    ));
}

#[test]
fn generous_budget_reaches_fixpoint() {
    let mut authorizer = chain_authorizer(12);
    authorizer.add_policy(allow_if(&[pred("reach", &[int(0), int(12)])], &[]));

    let limits = RunLimits {
        max_facts: 10_000,
        max_iterations: 1_000,
        max_time: Duration::from_secs(5),
    };
    assert_eq!(authorizer.authorize_with_limits(&limits).unwrap(), 0);
}
