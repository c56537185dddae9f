//! AgenticTokens — attenuable authorization tokens for AI agents.
//!
//! A token is a root-signed chain of blocks, each carrying Datalog facts,
//! rules, and checks. Any holder can narrow a token offline by appending a
//! block; no holder can widen it, because facts are only trusted under the
//! origin of the block that asserted them. Verification needs only the
//! root public key, and authorization evaluates the token's checks and the
//! verifier's policies against caller-supplied context — in memory, per
//! request, under an explicit resource budget.
//!
//! ```
//! use agentic_tokens::builder::{allow_if, check_if, fact, pred, string};
//! use agentic_tokens::{KeyPair, Token};
//!
//! # fn main() -> agentic_tokens::Result<()> {
//! let root = KeyPair::generate();
//! let token = Token::builder()
//!     .fact(fact("right", &[string("file1"), string("read")]))
//!     .build(&root)?;
//!
//! let mut authorizer = token.authorizer()?;
//! authorizer.add_fact(fact("resource", &[string("file1")]))?;
//! authorizer.add_check(check_if(&[
//!     pred("resource", &[string("file1")]),
//!     pred("right", &[string("file1"), string("read")]),
//! ]));
//! authorizer.add_policy(allow_if(&[], &[]));
//! assert_eq!(authorizer.authorize()?, 0);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod crypto;
pub mod datalog;
pub mod error;
pub mod time;
pub mod token;

// Re-export primary types
pub use crypto::{
    Algorithm, DefaultVerifier, KeyPair, PublicKey, RootKeyProvider, SignatureVerifier, Signer,
};
pub use datalog::{RunLimits, SymbolTable, World};
pub use error::{
    ExecutionError, FailedCheck, FormatError, LanguageError, LogicError, MatchedPolicy, Result,
    RunLimitError, TokenError,
};
pub use token::{Authorizer, Block, SerializedToken, Token};

// Re-export builder entry points
pub use builder::{BlockBuilder, TokenBuilder};
