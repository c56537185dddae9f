//! Rule and block trust scopes.

use serde::{Deserialize, Serialize};

/// Declares which blocks' facts a rule may read.
///
/// `PublicKey` holds the id of a key interned in the symbol table's key
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Authority,
    Previous,
    PublicKey(u64),
}
