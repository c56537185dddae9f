//! Checks: disjunctive queries a block or authorizer requires to hold.

use serde::{Deserialize, Serialize};

use super::rule::Rule;

/// Existential vs universal query semantics.
///
/// `One` succeeds if some binding satisfies a query; `All` succeeds if no
/// binding violates the query's guards (trivially, when nothing matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckKind {
    One,
    All,
}

/// One or more rule queries; the check succeeds if any query satisfies the
/// kind's semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Check {
    kind: CheckKind,
    queries: Vec<Rule>,
}

impl Check {
    pub fn new(kind: CheckKind, queries: Vec<Rule>) -> Self {
        Self { kind, queries }
    }

    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    pub fn queries(&self) -> &[Rule] {
        &self.queries
    }
}
