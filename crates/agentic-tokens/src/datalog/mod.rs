//! Interned Datalog engine.
//!
//! The datalog module provides:
//! - Two-tier symbol interning for strings and public keys
//! - The integer-keyed AST: terms, predicates, facts, rules, checks, scopes
//! - A stack-machine evaluator for inline guard expressions
//! - Origin tracking and per-rule trusted-origin resolution
//! - The fact/rule store and naive-fixpoint solver with resource limits

pub mod check;
pub mod expression;
pub mod origin;
pub mod predicate;
pub mod rule;
pub mod schema;
pub mod scope;
pub mod symbols;
pub mod term;
pub mod world;

pub use check::{Check, CheckKind};
pub use expression::{BinaryOp, Expression, Op, UnaryOp};
pub use origin::{Origin, TrustedOrigins, AUTHORIZER_ORIGIN};
pub use predicate::{Fact, Predicate};
pub use rule::Rule;
pub use schema::{SchemaVersion, MAX_SCHEMA_VERSION, MIN_SCHEMA_VERSION};
pub use scope::Scope;
pub use symbols::{SymbolTable, TemporarySymbolTable, DEFAULT_SYMBOLS, DEFAULT_SYMBOLS_OFFSET};
pub use term::{SymbolIndex, Term};
pub use world::{FactSet, RuleSet, RunLimits, World};
