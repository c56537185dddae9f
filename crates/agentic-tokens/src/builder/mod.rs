//! Human-readable Datalog AST.
//!
//! The builder module mirrors the interned engine AST with strings held
//! inline, and is the input surface of the crate: a textual Datalog parser
//! would produce these types. Conversion to and from the interned
//! representation goes through a [`SymbolTable`](crate::datalog::SymbolTable).
//!
//! The free functions below are shorthand constructors:
//!
//! ```
//! use agentic_tokens::builder::{fact, pred, rule, string, var};
//!
//! let f = fact("right", &[string("file1"), string("read")]);
//! let r = rule(
//!     "can_read",
//!     &[var("file")],
//!     &[pred("right", &[var("file"), string("read")])],
//! );
//! ```

pub mod block;
pub mod check;
pub mod expression;
pub mod policy;
pub mod predicate;
pub mod rule;
pub mod scope;
pub mod term;

pub use block::{BlockBuilder, TokenBuilder};
pub use check::Check;
pub use expression::Expression;
pub use policy::{Policy, PolicyKind};
pub use predicate::{Fact, Predicate};
pub use rule::Rule;
pub use scope::Scope;
pub use term::Term;

use crate::datalog::CheckKind;

/// A variable term, e.g. `var("resource")` renders as `$resource`.
pub fn var(name: &str) -> Term {
    Term::Variable(name.to_string())
}

/// A string term.
pub fn string(value: &str) -> Term {
    Term::Str(value.to_string())
}

/// An integer term.
pub fn int(value: i64) -> Term {
    Term::Integer(value)
}

/// A boolean term.
pub fn boolean(value: bool) -> Term {
    Term::Bool(value)
}

/// A date term from epoch seconds.
pub fn date(epoch_secs: u64) -> Term {
    Term::Date(epoch_secs)
}

/// A byte-string term.
pub fn bytes(value: Vec<u8>) -> Term {
    Term::Bytes(value)
}

/// A set term. Members must not be variables or nested sets; conversion
/// rejects such sets.
pub fn set(members: impl IntoIterator<Item = Term>) -> Term {
    Term::Set(members.into_iter().collect())
}

/// A predicate, e.g. `pred("right", &[string("file1")])`.
pub fn pred(name: &str, terms: &[Term]) -> Predicate {
    Predicate::new(name, terms.to_vec())
}

/// A ground fact.
pub fn fact(name: &str, terms: &[Term]) -> Fact {
    Fact::new(name, terms.to_vec())
}

/// A rule without guard expressions.
pub fn rule(head_name: &str, head_terms: &[Term], body: &[Predicate]) -> Rule {
    Rule::new(
        Predicate::new(head_name, head_terms.to_vec()),
        body.to_vec(),
        vec![],
        vec![],
    )
}

/// A rule with guard expressions.
pub fn constrained_rule(
    head_name: &str,
    head_terms: &[Term],
    body: &[Predicate],
    expressions: &[Expression],
) -> Rule {
    Rule::new(
        Predicate::new(head_name, head_terms.to_vec()),
        body.to_vec(),
        expressions.to_vec(),
        vec![],
    )
}

/// A kind-ONE check over one query.
pub fn check_if(body: &[Predicate]) -> Check {
    Check::new(CheckKind::One, vec![query_rule(body, &[])])
}

/// A kind-ONE check with guard expressions.
pub fn constrained_check_if(body: &[Predicate], expressions: &[Expression]) -> Check {
    Check::new(CheckKind::One, vec![query_rule(body, expressions)])
}

/// A kind-ALL check over one query.
pub fn check_all(body: &[Predicate], expressions: &[Expression]) -> Check {
    Check::new(CheckKind::All, vec![query_rule(body, expressions)])
}

/// An `allow if` policy over one query.
pub fn allow_if(body: &[Predicate], expressions: &[Expression]) -> Policy {
    Policy::new(PolicyKind::Allow, vec![query_rule(body, expressions)])
}

/// A `deny if` policy over one query.
pub fn deny_if(body: &[Predicate], expressions: &[Expression]) -> Policy {
    Policy::new(PolicyKind::Deny, vec![query_rule(body, expressions)])
}

/// Check and policy queries share a synthetic head.
fn query_rule(body: &[Predicate], expressions: &[Expression]) -> Rule {
    Rule::new(
        Predicate::new("query", vec![]),
        body.to_vec(),
        expressions.to_vec(),
        vec![],
    )
}
