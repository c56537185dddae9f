//! Interned Datalog terms.
//!
//! Strings and variable names are represented by their symbol-table ids, so
//! term comparison is integer comparison and facts can be hashed cheaply.
//! The human-readable mirror of this type lives in [`crate::builder::Term`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Index into a [`super::SymbolTable`].
pub type SymbolIndex = u64;

/// One Datalog value.
///
/// `Set` members are a uniform type and never contain nested sets or
/// variables; the builder conversion enforces this before a set reaches the
/// interned representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Variable(u32),
    Integer(i64),
    Str(SymbolIndex),
    Date(u64),
    Bytes(Vec<u8>),
    Bool(bool),
    Set(BTreeSet<Term>),
}

impl Term {
    /// True for every variant except `Variable`.
    pub fn is_ground(&self) -> bool {
        !matches!(self, Term::Variable(_))
    }
}
