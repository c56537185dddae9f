//! Builders for token blocks.
//!
//! [`TokenBuilder`] assembles the authority block and signs it with the
//! root key; [`BlockBuilder`] assembles an attenuation block appended via
//! [`Token::append`](crate::token::Token::append). Both collect builder-level
//! facts, rules, checks, and scopes, validate them, and convert them to the
//! interned representation when the block is built.

use crate::crypto::Signer;
use crate::datalog::{SchemaVersion, SymbolTable};
use crate::error::{Result, TokenError};
use crate::token::{Block, Token};

use super::check::Check;
use super::predicate::Fact;
use super::rule::Rule;
use super::scope::Scope;

/// Accumulates the Datalog content of one block.
#[derive(Debug, Clone, Default)]
pub struct BlockBuilder {
    facts: Vec<Fact>,
    rules: Vec<Rule>,
    checks: Vec<Check>,
    scopes: Vec<Scope>,
    context: Option<String>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ground fact.
    pub fn fact(mut self, fact: Fact) -> Self {
        self.facts.push(fact);
        self
    }

    /// Add a rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a check.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Add a block-level trust scope, the default for this block's rules.
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Attach a free-form context string.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
            && self.rules.is_empty()
            && self.checks.is_empty()
            && self.scopes.is_empty()
    }

    /// Validate and intern the collected content against `symbols`,
    /// producing a block holding only the symbols it introduced.
    pub(crate) fn build(self, symbols: &mut SymbolTable) -> Result<Block> {
        let initial_offset = symbols.current_offset();
        let initial_key_offset = symbols.current_public_key_offset();

        let mut facts = Vec::with_capacity(self.facts.len());
        for fact in &self.facts {
            facts.push(fact.convert(symbols)?);
        }
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            rule.validate_variables().map_err(TokenError::Language)?;
            rules.push(rule.convert(symbols)?);
        }
        let mut checks = Vec::with_capacity(self.checks.len());
        for check in &self.checks {
            for query in &check.queries {
                query.validate_variables().map_err(TokenError::Language)?;
            }
            checks.push(check.convert(symbols)?);
        }
        let scopes: Vec<_> = self.scopes.iter().map(|s| s.convert(symbols)).collect();

        let version = SchemaVersion::new(&facts, &rules, &checks, &scopes).version();

        Ok(Block {
            symbols: symbols.symbols()[initial_offset..].to_vec(),
            context: self.context,
            facts,
            rules,
            checks,
            scopes,
            public_keys: symbols.public_keys()[initial_key_offset..].to_vec(),
            external_key: None,
            version,
        })
    }
}

/// Builds and signs the authority block of a new token.
#[derive(Debug, Clone, Default)]
pub struct TokenBuilder {
    block: BlockBuilder,
    root_key_id: Option<u32>,
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fact(mut self, fact: Fact) -> Self {
        self.block = self.block.fact(fact);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.block = self.block.rule(rule);
        self
    }

    pub fn check(mut self, check: Check) -> Self {
        self.block = self.block.check(check);
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.block = self.block.scope(scope);
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.block = self.block.context(context);
        self
    }

    /// Hint which root key the verifier should use.
    pub fn root_key_id(mut self, id: u32) -> Self {
        self.root_key_id = Some(id);
        self
    }

    /// Sign the authority block with the root signer and mint the token.
    pub fn build(self, root: &dyn Signer) -> Result<Token> {
        Token::mint(root, self.root_key_id, self.block)
    }
}
