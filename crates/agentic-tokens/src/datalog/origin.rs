//! Fact provenance and trust scoping.
//!
//! Every fact carries an [`Origin`]: the set of block ids that jointly
//! produced it. Every rule is resolved once to a [`TrustedOrigins`]: the set
//! of origins it is permitted to read facts from. A fact is visible to a
//! rule iff its origin is a subset of the rule's trusted origins — every
//! block that contributed to the fact must be trusted.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::scope::Scope;

/// Synthetic block id for facts and rules added by the authorizer itself.
pub const AUTHORIZER_ORIGIN: u64 = u64::MAX;

/// The set of block ids that produced a fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin(BTreeSet<u64>);

impl Origin {
    pub fn new(block_id: u64) -> Self {
        let mut ids = BTreeSet::new();
        ids.insert(block_id);
        Self(ids)
    }

    /// The authority block's origin.
    pub fn authority() -> Self {
        Self::new(0)
    }

    /// The authorizer's own synthetic origin.
    pub fn authorizer() -> Self {
        Self::new(AUTHORIZER_ORIGIN)
    }

    pub fn insert(&mut self, block_id: u64) {
        self.0.insert(block_id);
    }

    pub fn union(&self, other: &Origin) -> Origin {
        Origin(self.0.union(&other.0).copied().collect())
    }

    pub fn block_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().copied()
    }

    pub(crate) fn is_subset_of(&self, ids: &BTreeSet<u64>) -> bool {
        self.0.is_subset(ids)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .0
            .iter()
            .map(|id| {
                if *id == AUTHORIZER_ORIGIN {
                    "authorizer".to_string()
                } else {
                    id.to_string()
                }
            })
            .collect();
        write!(f, "{{{}}}", ids.join(", "))
    }
}

/// The origins one rule may read from, resolved once from its scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TrustedOrigins(BTreeSet<u64>);

impl TrustedOrigins {
    /// The default trust context before any block is considered: the
    /// authority block and the authorizer itself.
    pub fn root() -> Self {
        Self([0, AUTHORIZER_ORIGIN].into())
    }

    /// Build a trusted set from explicit block ids (test and query helper).
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Resolve a rule's declared scopes against the block it lives in.
    ///
    /// With no declared scope the rule inherits `default_origins` plus its
    /// own block. Declaring any scope discards the default: the trusted set
    /// is rebuilt from the current block and the authorizer, then each scope
    /// is unioned in — `Authority` adds block 0, `Previous` adds every
    /// earlier block, `PublicKey` adds the blocks recorded as signed by that
    /// interned key.
    pub fn from_scopes(
        rule_scopes: &[Scope],
        default_origins: &TrustedOrigins,
        current_block: u64,
        public_key_to_block_id: &HashMap<u64, Vec<u64>>,
    ) -> Self {
        if rule_scopes.is_empty() {
            let mut origins = default_origins.clone();
            origins.0.insert(current_block);
            return origins;
        }

        let mut origins = TrustedOrigins::default();
        origins.0.insert(current_block);
        origins.0.insert(AUTHORIZER_ORIGIN);
        for scope in rule_scopes {
            match scope {
                Scope::Authority => {
                    origins.0.insert(0);
                }
                Scope::Previous => {
                    if current_block != AUTHORIZER_ORIGIN {
                        origins.0.extend(0..=current_block);
                    }
                }
                Scope::PublicKey(key_id) => {
                    if let Some(block_ids) = public_key_to_block_id.get(key_id) {
                        origins.0.extend(block_ids.iter().copied());
                    }
                }
            }
        }
        origins
    }

    /// Whether a fact with the given origin is visible under this trust set.
    pub fn contains(&self, origin: &Origin) -> bool {
        origin.is_subset_of(&self.0)
    }
}
