//! Predicates and ground facts.

use serde::{Deserialize, Serialize};

use super::term::{SymbolIndex, Term};

/// A named tuple of terms, e.g. `right("file1", "read")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    name: SymbolIndex,
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new(name: SymbolIndex, terms: Vec<Term>) -> Self {
        Self { name, terms }
    }

    pub fn name(&self) -> SymbolIndex {
        self.name
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Whether a ground predicate can match this pattern: same name, same
    /// arity. Term-level unification happens during the join.
    pub fn match_shape(&self, other: &Predicate) -> bool {
        self.name == other.name && self.terms.len() == other.terms.len()
    }
}

/// A ground predicate. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    predicate: Predicate,
}

impl Fact {
    pub fn new(name: SymbolIndex, terms: Vec<Term>) -> Self {
        Self {
            predicate: Predicate::new(name, terms),
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl From<Predicate> for Fact {
    fn from(predicate: Predicate) -> Self {
        Self { predicate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_shape() {
        let pattern = Predicate::new(4, vec![Term::Variable(0), Term::Variable(1)]);
        let ground = Predicate::new(4, vec![Term::Str(1024), Term::Str(1025)]);
        assert!(pattern.match_shape(&ground));

        let other_name = Predicate::new(5, vec![Term::Str(1024), Term::Str(1025)]);
        assert!(!pattern.match_shape(&other_name));

        let other_arity = Predicate::new(4, vec![Term::Str(1024)]);
        assert!(!pattern.match_shape(&other_arity));
    }

    #[test]
    fn test_fact_equality_is_structural() {
        let a = Fact::new(4, vec![Term::Integer(1)]);
        let b = Fact::new(4, vec![Term::Integer(1)]);
        assert_eq!(a, b);
    }
}
