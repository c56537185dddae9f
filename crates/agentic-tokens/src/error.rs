//! Error types for agentic-tokens.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.
//!
//! The taxonomy separates four failure families:
//! - [`FormatError`] — malformed or forged input (bad signature, bad key,
//!   schema violation). These abort immediately and are never retried.
//! - [`ExecutionError`] — a Datalog expression failed to evaluate.
//! - [`LogicError`] — the evaluation completed and the decision is a
//!   refusal; failed checks are accumulated, not fail-fast.
//! - [`RunLimitError`] — the fixpoint engine exceeded its resource budget.

use serde::Serialize;

/// Top-level error type covering all token operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum TokenError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("expression execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("{0}")]
    FailedLogic(#[from] LogicError),

    #[error("evaluation exceeded limits: {0}")]
    RunLimit(#[from] RunLimitError),

    #[error("deadline exceeded during authorization")]
    Timeout,

    #[error("invalid builder input: {0}")]
    Language(#[from] LanguageError),
}

/// Errors raised while parsing, serializing, or verifying token material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum FormatError {
    #[error("signature verification failed: {0}")]
    Signature(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unsupported schema version: block is version {actual}, supported range is {minimum}..={maximum}")]
    Version {
        minimum: u32,
        maximum: u32,
        actual: u32,
    },

    #[error("token is sealed and cannot be attenuated")]
    SealedToken,

    #[error("appended block symbol table overlaps an earlier block")]
    SymbolTableOverlap,

    #[error("empty token container")]
    EmptyToken,

    #[error("unknown root key id {0:?}")]
    UnknownRootKeyId(Option<u32>),
}

/// Errors raised by the expression virtual machine.
///
/// Wrong operand types are an explicit [`ExecutionError::InvalidType`]
/// rather than a silent stack imbalance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum ExecutionError {
    #[error("no value bound for variable {0}")]
    UnboundVariable(u32),

    #[error("symbol id {0} not found in the symbol table")]
    UnknownSymbol(u64),

    #[error("invalid operand types")]
    InvalidType,

    #[error("integer overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),

    #[error("expression stack did not reduce to a single value")]
    StackImbalance,
}

/// Errors raised by the fixpoint engine when a resource budget is exceeded.
///
/// All three limits are enforced so evaluation terminates against
/// adversarial or buggy rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum RunLimitError {
    #[error("too many facts generated")]
    TooManyFacts,

    #[error("too many iterations")]
    TooManyIterations,

    #[error("evaluation deadline exceeded")]
    Timeout,
}

/// A completed evaluation that refuses authorization, or a structurally
/// invalid logic element found at import time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum LogicError {
    #[error("invalid rule in block {0}: variables in the head or expressions must appear in the body ({1})")]
    InvalidBlockRule(u64, String),

    #[error("authorization refused: matched policy {policy}, {count} failed check(s)", count = checks.len())]
    Unauthorized {
        policy: MatchedPolicy,
        checks: Vec<FailedCheck>,
    },

    #[error("no policy matched, {count} failed check(s)", count = checks.len())]
    NoMatchingPolicy { checks: Vec<FailedCheck> },

    #[error("authorizer is already bound to a token")]
    AuthorizerNotEmpty,
}

/// Which policy ended the policy scan, by kind and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchedPolicy {
    Allow(usize),
    Deny(usize),
}

impl std::fmt::Display for MatchedPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedPolicy::Allow(i) => write!(f, "allow({i})"),
            MatchedPolicy::Deny(i) => write!(f, "deny({i})"),
        }
    }
}

/// A single check that did not hold, with its rendered source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum FailedCheck {
    #[error("check {check_id} in block {block_id} failed: {rule}")]
    Block {
        block_id: u64,
        check_id: u64,
        rule: String,
    },

    #[error("authorizer check {check_id} failed: {rule}")]
    Authorizer { check_id: u64, rule: String },
}

/// Structural errors in builder-level input, before conversion to the
/// interned representation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum LanguageError {
    #[error("variables used in the head or expressions but missing from the body: {0:?}")]
    InvalidVariables(Vec<String>),

    #[error("facts cannot contain variables: {0:?}")]
    VariablesInFact(Vec<String>),

    #[error("set terms cannot contain variables or nested sets")]
    InvalidSetMember,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, TokenError>;
