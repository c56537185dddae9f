//! Human-readable predicates and facts.

use std::fmt;

use crate::datalog;
use crate::datalog::SymbolTable;
use crate::error::{LanguageError, TokenError};

use super::term::Term;

/// A named tuple of builder terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predicate {
    pub name: String,
    pub terms: Vec<Term>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            terms,
        }
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Predicate, TokenError> {
        let name = symbols.insert(&self.name);
        let terms = self
            .terms
            .iter()
            .map(|t| t.convert(symbols))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(datalog::Predicate::new(name, terms))
    }

    pub fn convert_from(
        predicate: &datalog::Predicate,
        symbols: &SymbolTable,
    ) -> Result<Self, TokenError> {
        Ok(Self {
            name: symbols.format_symbol(predicate.name()),
            terms: predicate
                .terms()
                .iter()
                .map(|t| Term::convert_from(t, symbols))
                .collect::<Result<_, _>>()?,
        })
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|t| match t {
            Term::Variable(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(Term::to_string).collect();
        write!(f, "{}({})", self.name, terms.join(", "))
    }
}

/// A ground predicate asserted as true.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fact {
    pub predicate: Predicate,
}

impl Fact {
    pub fn new(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self {
            predicate: Predicate::new(name, terms),
        }
    }

    /// Facts must be ground: a variable anywhere is a language error.
    pub fn validate(&self) -> Result<(), LanguageError> {
        let variables: Vec<String> = self
            .predicate
            .variables()
            .map(str::to_string)
            .collect();
        if variables.is_empty() {
            Ok(())
        } else {
            Err(LanguageError::VariablesInFact(variables))
        }
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Fact, TokenError> {
        self.validate().map_err(TokenError::Language)?;
        Ok(self.predicate.convert(symbols)?.into())
    }

    pub fn convert_from(fact: &datalog::Fact, symbols: &SymbolTable) -> Result<Self, TokenError> {
        Ok(Self {
            predicate: Predicate::convert_from(fact.predicate(), symbols)?,
        })
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_with_variable_is_rejected() {
        let fact = Fact::new("resource", vec![Term::Variable("r".to_string())]);
        assert!(matches!(
            fact.validate(),
            Err(LanguageError::VariablesInFact(_))
        ));
        let mut symbols = SymbolTable::new();
        assert!(fact.convert(&mut symbols).is_err());
    }

    #[test]
    fn test_fact_round_trip() {
        let mut symbols = SymbolTable::new();
        let fact = Fact::new("right", vec![Term::from("file1"), Term::from("read")]);
        let interned = fact.convert(&mut symbols).unwrap();
        let back = Fact::convert_from(&interned, &symbols).unwrap();
        assert_eq!(back, fact);
        assert_eq!(back.to_string(), "right(\"file1\", \"read\")");
    }
}
