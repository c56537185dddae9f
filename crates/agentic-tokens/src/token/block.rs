//! One signed unit of a token.

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::datalog::{
    Check, Fact, Rule, SchemaVersion, Scope, SymbolTable, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION,
};
use crate::error::{FormatError, TokenError};

/// A block's Datalog content plus its slice of the symbol table.
///
/// `symbols` holds only the strings this block introduced; for blocks
/// signed by the token holder they extend the token-level table, while
/// externally signed blocks keep a fully independent table. Immutable
/// after signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub symbols: Vec<String>,
    pub context: Option<String>,
    pub facts: Vec<Fact>,
    pub rules: Vec<Rule>,
    pub checks: Vec<Check>,
    pub scopes: Vec<Scope>,
    pub public_keys: Vec<PublicKey>,
    pub external_key: Option<PublicKey>,
    pub version: u32,
}

impl Block {
    /// Serialize the block body, enforcing the schema version gate.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TokenError> {
        self.check_schema()?;
        bincode::serialize(self)
            .map_err(|e| FormatError::Serialization(e.to_string()).into())
    }

    /// Parse a block body, enforcing the schema version gate.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TokenError> {
        let block: Block = bincode::deserialize(data)
            .map_err(|e| FormatError::Deserialization(e.to_string()))?;
        block.check_schema()?;
        Ok(block)
    }

    fn check_schema(&self) -> Result<(), TokenError> {
        if self.version < MIN_SCHEMA_VERSION || self.version > MAX_SCHEMA_VERSION {
            return Err(FormatError::Version {
                minimum: MIN_SCHEMA_VERSION,
                maximum: MAX_SCHEMA_VERSION,
                actual: self.version,
            }
            .into());
        }
        SchemaVersion::new(&self.facts, &self.rules, &self.checks, &self.scopes)
            .check_compatibility(self.version)
            .map_err(TokenError::Format)
    }

    /// The standalone symbol table of an externally signed block.
    pub fn local_symbol_table(&self) -> SymbolTable {
        SymbolTable::from_parts(self.symbols.clone(), self.public_keys.clone())
    }
}
