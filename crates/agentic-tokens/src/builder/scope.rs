//! Human-readable trust scopes.

use std::fmt;

use crate::crypto::PublicKey;
use crate::datalog;
use crate::datalog::SymbolTable;
use crate::error::{FormatError, TokenError};

/// Declares which blocks' facts a rule may read, carrying the actual
/// public key rather than an interned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Authority,
    Previous,
    PublicKey(PublicKey),
}

impl Scope {
    pub fn convert(&self, symbols: &mut SymbolTable) -> datalog::Scope {
        match self {
            Scope::Authority => datalog::Scope::Authority,
            Scope::Previous => datalog::Scope::Previous,
            Scope::PublicKey(key) => {
                datalog::Scope::PublicKey(symbols.insert_public_key(key.clone()))
            }
        }
    }

    pub fn convert_from(scope: &datalog::Scope, symbols: &SymbolTable) -> Result<Self, TokenError> {
        Ok(match scope {
            datalog::Scope::Authority => Scope::Authority,
            datalog::Scope::Previous => Scope::Previous,
            datalog::Scope::PublicKey(id) => Scope::PublicKey(
                symbols
                    .get_public_key(*id)
                    .cloned()
                    .ok_or_else(|| {
                        TokenError::Format(FormatError::Deserialization(format!(
                            "unknown public key id {id}"
                        )))
                    })?,
            ),
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Authority => write!(f, "authority"),
            Scope::Previous => write!(f, "previous"),
            Scope::PublicKey(key) => write!(f, "{key}"),
        }
    }
}
