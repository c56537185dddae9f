//! Human-readable checks.

use std::fmt;

use crate::datalog;
use crate::datalog::{CheckKind, SymbolTable};
use crate::error::TokenError;

use super::rule::Rule;

/// A disjunctive check: succeeds when any query satisfies the kind's
/// semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub kind: CheckKind,
    pub queries: Vec<Rule>,
}

impl Check {
    pub fn new(kind: CheckKind, queries: Vec<Rule>) -> Self {
        Self { kind, queries }
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Check, TokenError> {
        let queries = self
            .queries
            .iter()
            .map(|q| q.convert(symbols))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(datalog::Check::new(self.kind, queries))
    }

    pub fn convert_from(check: &datalog::Check, symbols: &SymbolTable) -> Result<Self, TokenError> {
        Ok(Self {
            kind: check.kind(),
            queries: check
                .queries()
                .iter()
                .map(|q| Rule::convert_from(q, symbols))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            CheckKind::One => "check if",
            CheckKind::All => "check all",
        };
        let queries: Vec<String> = self.queries.iter().map(|q| q.body_to_string()).collect();
        write!(f, "{} {}", prefix, queries.join(" or "))
    }
}
