//! Two-tier symbol interning.
//!
//! Symbol ids below [`DEFAULT_SYMBOLS_OFFSET`] are reserved for a fixed
//! default list shared by every table; ids from the offset up index the
//! table's own strings. Public keys are interned in a separate namespace
//! starting at 0. Ids are stable for the lifetime of a table and tables are
//! value-copied, never shared mutably.

use crate::crypto::PublicKey;
use crate::time::secs_to_rfc3339;

use super::check::{Check, CheckKind};
use super::expression::Expression;
use super::predicate::{Fact, Predicate};
use super::rule::Rule;
use super::scope::Scope;
use super::term::Term;
use super::world::World;

/// First id available to dynamically interned symbols.
pub const DEFAULT_SYMBOLS_OFFSET: u64 = 1024;

/// Symbols every table knows without storing them, in id order.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "read",
    "write",
    "resource",
    "operation",
    "right",
    "time",
    "role",
    "owner",
    "tenant",
    "namespace",
    "user",
    "team",
    "service",
    "admin",
    "email",
    "group",
    "member",
    "ip_address",
    "client",
    "client_ip",
    "domain",
    "path",
    "version",
    "cluster",
    "node",
    "hostname",
    "nonce",
    "query",
];

/// Interns strings and public keys to stable integer ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: Vec<String>,
    public_keys: Vec<PublicKey>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from pre-interned strings and keys, e.g. a block's
    /// local table.
    pub fn from_parts(symbols: Vec<String>, public_keys: Vec<PublicKey>) -> Self {
        Self {
            symbols,
            public_keys,
        }
    }

    /// Intern a string. Idempotent: an already known symbol returns its
    /// existing id.
    pub fn insert(&mut self, symbol: &str) -> u64 {
        if let Some(index) = DEFAULT_SYMBOLS.iter().position(|s| *s == symbol) {
            return index as u64;
        }
        match self.symbols.iter().position(|s| s == symbol) {
            Some(index) => index as u64 + DEFAULT_SYMBOLS_OFFSET,
            None => {
                self.symbols.push(symbol.to_string());
                self.symbols.len() as u64 - 1 + DEFAULT_SYMBOLS_OFFSET
            }
        }
    }

    /// Look up a string without interning it.
    pub fn get(&self, symbol: &str) -> Option<u64> {
        if let Some(index) = DEFAULT_SYMBOLS.iter().position(|s| *s == symbol) {
            return Some(index as u64);
        }
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|index| index as u64 + DEFAULT_SYMBOLS_OFFSET)
    }

    /// Resolve an id back to its string.
    pub fn get_symbol(&self, id: u64) -> Option<&str> {
        if id < DEFAULT_SYMBOLS_OFFSET {
            DEFAULT_SYMBOLS.get(id as usize).copied()
        } else {
            self.symbols
                .get((id - DEFAULT_SYMBOLS_OFFSET) as usize)
                .map(String::as_str)
        }
    }

    /// Intern a public key in its own namespace. Idempotent.
    pub fn insert_public_key(&mut self, key: PublicKey) -> u64 {
        match self.public_keys.iter().position(|k| *k == key) {
            Some(index) => index as u64,
            None => {
                self.public_keys.push(key);
                self.public_keys.len() as u64 - 1
            }
        }
    }

    pub fn get_public_key(&self, id: u64) -> Option<&PublicKey> {
        self.public_keys.get(id as usize)
    }

    /// Number of dynamically interned strings.
    pub fn current_offset(&self) -> usize {
        self.symbols.len()
    }

    pub fn current_public_key_offset(&self) -> usize {
        self.public_keys.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn public_keys(&self) -> &[PublicKey] {
        &self.public_keys
    }

    /// Append pre-validated strings, preserving their order.
    pub fn extend(&mut self, symbols: &[String]) {
        self.symbols.extend(symbols.iter().cloned());
    }

    /// True if no dynamic string is shared with `other`. Appended token
    /// blocks must keep their tables disjoint.
    pub fn disjoint(&self, other: &[String]) -> bool {
        !other.iter().any(|s| self.symbols.contains(s))
    }

    // ── Rendering ────────────────────────────────────────────────────────────

    pub fn format_symbol(&self, id: u64) -> String {
        self.get_symbol(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{id}?>"))
    }

    pub fn format_term(&self, term: &Term) -> String {
        match term {
            Term::Variable(id) => format!("${}", self.format_symbol(*id as u64)),
            Term::Integer(i) => i.to_string(),
            Term::Str(id) => format!("\"{}\"", self.format_symbol(*id)),
            Term::Date(secs) => secs_to_rfc3339(*secs),
            Term::Bytes(bytes) => format!("hex:{}", hex::encode(bytes)),
            Term::Bool(b) => b.to_string(),
            Term::Set(terms) => {
                let values: Vec<String> = terms.iter().map(|t| self.format_term(t)).collect();
                format!("[{}]", values.join(", "))
            }
        }
    }

    pub fn format_predicate(&self, predicate: &Predicate) -> String {
        let terms: Vec<String> = predicate
            .terms()
            .iter()
            .map(|t| self.format_term(t))
            .collect();
        format!("{}({})", self.format_symbol(predicate.name()), terms.join(", "))
    }

    pub fn format_fact(&self, fact: &Fact) -> String {
        self.format_predicate(fact.predicate())
    }

    pub fn format_expression(&self, expression: &Expression) -> String {
        expression
            .print(self)
            .unwrap_or_else(|| "<invalid expression>".to_string())
    }

    pub fn format_scope(&self, scope: &Scope) -> String {
        match scope {
            Scope::Authority => "authority".to_string(),
            Scope::Previous => "previous".to_string(),
            Scope::PublicKey(id) => match self.get_public_key(*id) {
                Some(key) => key.to_string(),
                None => format!("<{id}?>"),
            },
        }
    }

    pub fn format_rule_body(&self, rule: &Rule) -> String {
        let mut parts: Vec<String> = rule
            .body()
            .iter()
            .map(|p| self.format_predicate(p))
            .collect();
        parts.extend(rule.expressions().iter().map(|e| self.format_expression(e)));
        let mut rendered = parts.join(", ");
        if !rule.scopes().is_empty() {
            let scopes: Vec<String> = rule.scopes().iter().map(|s| self.format_scope(s)).collect();
            rendered.push_str(" trusting ");
            rendered.push_str(&scopes.join(", "));
        }
        rendered
    }

    pub fn format_rule(&self, rule: &Rule) -> String {
        format!(
            "{} <- {}",
            self.format_predicate(rule.head()),
            self.format_rule_body(rule)
        )
    }

    pub fn format_check(&self, check: &Check) -> String {
        let prefix = match check.kind() {
            CheckKind::One => "check if ",
            CheckKind::All => "check all ",
        };
        let queries: Vec<String> = check
            .queries()
            .iter()
            .map(|q| self.format_rule_body(q))
            .collect();
        format!("{}{}", prefix, queries.join(" or "))
    }

    pub fn format_world(&self, world: &World) -> String {
        let facts: Vec<String> = world
            .facts()
            .iter_all()
            .map(|(origin, fact)| format!("{origin}: {}", self.format_fact(fact)))
            .collect();
        let rules: Vec<String> = world.rules().iter().map(|r| self.format_rule(r)).collect();
        format!(
            "World {{\n\tfacts: [\n\t\t{}\n\t],\n\trules: [\n\t\t{}\n\t]\n}}",
            facts.join(",\n\t\t"),
            rules.join(",\n\t\t")
        )
    }
}

/// Scratch symbol space for a single evaluation pass.
///
/// Strings created during evaluation (e.g. by string concatenation) are
/// interned above the base table's current size and are never merged back
/// or serialized.
pub struct TemporarySymbolTable<'a> {
    base: &'a SymbolTable,
    offset: u64,
    symbols: Vec<String>,
}

impl<'a> TemporarySymbolTable<'a> {
    pub fn new(base: &'a SymbolTable) -> Self {
        Self {
            base,
            offset: DEFAULT_SYMBOLS_OFFSET + base.current_offset() as u64,
            symbols: Vec::new(),
        }
    }

    pub fn get_symbol(&self, id: u64) -> Option<&str> {
        if id >= self.offset {
            self.symbols
                .get((id - self.offset) as usize)
                .map(String::as_str)
        } else {
            self.base.get_symbol(id)
        }
    }

    pub fn insert(&mut self, symbol: &str) -> u64 {
        if let Some(id) = self.base.get(symbol) {
            return id;
        }
        match self.symbols.iter().position(|s| s == symbol) {
            Some(index) => self.offset + index as u64,
            None => {
                self.symbols.push(symbol.to_string());
                self.offset + self.symbols.len() as u64 - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_symbols_stay_below_offset() {
        let mut table = SymbolTable::new();
        let id = table.insert("read");
        assert_eq!(id, 0);
        assert_eq!(table.insert("query"), 27);
        assert_eq!(table.current_offset(), 0);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut table = SymbolTable::new();
        let a = table.insert("file1");
        let b = table.insert("file1");
        assert_eq!(a, b);
        assert_eq!(a, DEFAULT_SYMBOLS_OFFSET);
        assert_eq!(table.current_offset(), 1);
    }

    #[test]
    fn test_get_symbol_round_trip() {
        let mut table = SymbolTable::new();
        let id = table.insert("deployment");
        assert_eq!(table.get_symbol(id), Some("deployment"));
        assert_eq!(table.get("deployment"), Some(id));
        assert_eq!(table.get_symbol(9999), None);
    }

    #[test]
    fn test_temporary_symbols_do_not_touch_base() {
        let mut base = SymbolTable::new();
        base.insert("file1");
        let mut temp = TemporarySymbolTable::new(&base);

        let scratch = temp.insert("file1file2");
        assert_eq!(scratch, DEFAULT_SYMBOLS_OFFSET + 1);
        assert_eq!(temp.get_symbol(scratch), Some("file1file2"));

        // base resolution still goes through
        assert_eq!(temp.insert("file1"), DEFAULT_SYMBOLS_OFFSET);
        assert_eq!(base.get("file1file2"), None);
    }

    #[test]
    fn test_disjoint() {
        let mut table = SymbolTable::new();
        table.insert("alpha");
        assert!(table.disjoint(&["beta".to_string()]));
        assert!(!table.disjoint(&["alpha".to_string()]));
        // default symbols never conflict
        assert!(table.disjoint(&["read".to_string()]));
    }

    #[test]
    fn test_format_term_variants() {
        let mut table = SymbolTable::new();
        let id = table.insert("file1");
        assert_eq!(table.format_term(&Term::Str(id)), "\"file1\"");
        assert_eq!(table.format_term(&Term::Integer(-3)), "-3");
        assert_eq!(
            table.format_term(&Term::Bytes(vec![0xab, 0x01])),
            "hex:ab01"
        );
        assert_eq!(table.format_term(&Term::Date(0)), "1970-01-01T00:00:00Z");
    }
}
