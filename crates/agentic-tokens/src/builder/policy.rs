//! Authorizer policies: the first-match allow/deny decision rules.

use std::fmt;

use super::rule::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Allow,
    Deny,
}

/// One or more queries; the policy matches when any query matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub kind: PolicyKind,
    pub queries: Vec<Rule>,
}

impl Policy {
    pub fn new(kind: PolicyKind, queries: Vec<Rule>) -> Self {
        Self { kind, queries }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            PolicyKind::Allow => "allow if",
            PolicyKind::Deny => "deny if",
        };
        let queries: Vec<String> = self.queries.iter().map(|q| q.body_to_string()).collect();
        write!(f, "{} {}", prefix, queries.join(" or "))
    }
}
