//! Schema version gating for serialized blocks.
//!
//! Newer Datalog features require a newer block format version; a block
//! that declares them under an older version is rejected when it is built
//! and again when it is parsed.

use crate::error::FormatError;

use super::check::{Check, CheckKind};
use super::expression::{Expression, Op};
use super::predicate::Fact;
use super::rule::Rule;
use super::scope::Scope;

/// Oldest block format this implementation accepts.
pub const MIN_SCHEMA_VERSION: u32 = 3;
/// Newest block format this implementation produces.
pub const MAX_SCHEMA_VERSION: u32 = 4;

/// Feature fingerprint of one block's Datalog content.
#[derive(Debug, Clone, Copy)]
pub struct SchemaVersion {
    contains_scopes: bool,
    contains_check_all: bool,
    contains_v4_ops: bool,
}

impl SchemaVersion {
    pub fn new(_facts: &[Fact], rules: &[Rule], checks: &[Check], scopes: &[Scope]) -> Self {
        let contains_scopes = !scopes.is_empty()
            || rules.iter().any(|r| !r.scopes().is_empty())
            || checks
                .iter()
                .flat_map(|c| c.queries())
                .any(|q| !q.scopes().is_empty());

        let contains_check_all = checks.iter().any(|c| c.kind() == CheckKind::All);

        let contains_v4_ops = rules
            .iter()
            .flat_map(|r| r.expressions())
            .chain(checks.iter().flat_map(|c| c.queries()).flat_map(|q| q.expressions()))
            .any(contains_v4_op);

        Self {
            contains_scopes,
            contains_check_all,
            contains_v4_ops,
        }
    }

    /// The minimum version able to carry this block.
    pub fn version(&self) -> u32 {
        if self.contains_scopes || self.contains_check_all || self.contains_v4_ops {
            4
        } else {
            MIN_SCHEMA_VERSION
        }
    }

    /// Reject a declared version too old for the features in use.
    pub fn check_compatibility(&self, version: u32) -> Result<(), FormatError> {
        if version < 4 {
            if self.contains_scopes {
                return Err(FormatError::Deserialization(
                    "v3 blocks must not have scopes".to_string(),
                ));
            }
            if self.contains_v4_ops {
                return Err(FormatError::Deserialization(
                    "v3 blocks must not have v4 operators (bitwise or !=)".to_string(),
                ));
            }
            if self.contains_check_all {
                return Err(FormatError::Deserialization(
                    "v3 blocks must not use check all".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn contains_v4_op(expression: &Expression) -> bool {
    expression.ops().iter().any(|op| match op {
        Op::Binary(binary) => binary.requires_v4(),
        _ => false,
    })
}
