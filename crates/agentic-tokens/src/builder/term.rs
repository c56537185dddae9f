//! Human-readable terms, converted to interned terms through a symbol
//! table.

use std::collections::BTreeSet;
use std::fmt;

use crate::datalog;
use crate::datalog::SymbolTable;
use crate::error::{FormatError, LanguageError, TokenError};
use crate::time::secs_to_rfc3339;

/// One Datalog value, carrying its strings inline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Variable(String),
    Integer(i64),
    Str(String),
    Date(u64),
    Bytes(Vec<u8>),
    Bool(bool),
    Set(BTreeSet<Term>),
}

impl Term {
    /// Intern this term. Set members may not be variables or nested sets.
    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Term, TokenError> {
        Ok(match self {
            Term::Variable(name) => datalog::Term::Variable(symbols.insert(name) as u32),
            Term::Integer(i) => datalog::Term::Integer(*i),
            Term::Str(s) => datalog::Term::Str(symbols.insert(s)),
            Term::Date(secs) => datalog::Term::Date(*secs),
            Term::Bytes(bytes) => datalog::Term::Bytes(bytes.clone()),
            Term::Bool(b) => datalog::Term::Bool(*b),
            Term::Set(terms) => {
                let mut converted = BTreeSet::new();
                for term in terms {
                    if matches!(term, Term::Variable(_) | Term::Set(_)) {
                        return Err(LanguageError::InvalidSetMember.into());
                    }
                    converted.insert(term.convert(symbols)?);
                }
                datalog::Term::Set(converted)
            }
        })
    }

    /// Resolve an interned term back to its readable form.
    pub fn convert_from(term: &datalog::Term, symbols: &SymbolTable) -> Result<Self, TokenError> {
        Ok(match term {
            datalog::Term::Variable(id) => Term::Variable(resolve(symbols, *id as u64)?),
            datalog::Term::Integer(i) => Term::Integer(*i),
            datalog::Term::Str(id) => Term::Str(resolve(symbols, *id)?),
            datalog::Term::Date(secs) => Term::Date(*secs),
            datalog::Term::Bytes(bytes) => Term::Bytes(bytes.clone()),
            datalog::Term::Bool(b) => Term::Bool(*b),
            datalog::Term::Set(terms) => Term::Set(
                terms
                    .iter()
                    .map(|t| Term::convert_from(t, symbols))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

fn resolve(symbols: &SymbolTable, id: u64) -> Result<String, TokenError> {
    symbols
        .get_symbol(id)
        .map(str::to_string)
        .ok_or_else(|| FormatError::Deserialization(format!("unknown symbol id {id}")).into())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "${name}"),
            Term::Integer(i) => write!(f, "{i}"),
            Term::Str(s) => write!(f, "\"{s}\""),
            Term::Date(secs) => write!(f, "{}", secs_to_rfc3339(*secs)),
            Term::Bytes(bytes) => write!(f, "hex:{}", hex::encode(bytes)),
            Term::Bool(b) => write!(f, "{b}"),
            Term::Set(terms) => {
                let rendered: Vec<String> = terms.iter().map(Term::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<i64> for Term {
    fn from(i: i64) -> Self {
        Term::Integer(i)
    }
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Str(s.to_string())
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::Str(s)
    }
}

impl From<bool> for Term {
    fn from(b: bool) -> Self {
        Term::Bool(b)
    }
}

impl From<Vec<u8>> for Term {
    fn from(bytes: Vec<u8>) -> Self {
        Term::Bytes(bytes)
    }
}
