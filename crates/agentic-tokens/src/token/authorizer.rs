//! The authorization decision engine.
//!
//! An authorizer owns a [`World`], a unified symbol table, and local
//! checks, policies, and scopes, optionally bound to one verified
//! [`Token`]. `authorize` runs the world to fixpoint, evaluates every
//! check (accumulating failures rather than stopping at the first), scans
//! policies in declaration order until one matches, and folds the results
//! into a single decision — all under a wall-clock deadline checked
//! between evaluations.
//!
//! A baseline authorizer can be prepared once (facts, rules, policies
//! preloaded) and cloned per request: clones share no mutable state.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use crate::builder;
use crate::datalog::{
    CheckKind, Origin, RunLimits, Scope, SymbolTable, TrustedOrigins, World, AUTHORIZER_ORIGIN,
};
use crate::error::{FailedCheck, LogicError, MatchedPolicy, Result, TokenError};

use super::Token;

/// Verifies a token's checks against caller-supplied context and decides.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    token: Option<Token>,
    checks: Vec<builder::Check>,
    policies: Vec<builder::Policy>,
    scopes: Vec<Scope>,
    public_key_to_block_id: HashMap<u64, Vec<u64>>,
    world: World,
    symbols: SymbolTable,
}

impl Authorizer {
    /// An empty authorizer: used to apply policies when unauthenticated,
    /// and to preload a baseline that is cloned per request.
    pub fn new() -> Self {
        Self::default()
    }

    /// An authorizer bound to a verified token.
    pub fn for_token(token: Token) -> Result<Self> {
        let mut authorizer = Self::new();
        authorizer.add_token(token)?;
        Ok(authorizer)
    }

    /// Bind a verified token. Fails with
    /// [`LogicError::AuthorizerNotEmpty`] if one is already bound.
    pub fn add_token(&mut self, token: Token) -> Result<()> {
        if self.token.is_some() {
            return Err(LogicError::AuthorizerNotEmpty.into());
        }
        self.symbols = token.symbols.clone();
        self.token = Some(token);
        self.update_on_token()
    }

    /// Import the bound token's facts and rules into the world, each block
    /// under its own origin and trusted-origin set.
    fn update_on_token(&mut self) -> Result<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        // record which blocks each external signer key vouches for; scope
        // resolution consults this map
        for (i, block) in token.blocks.iter().enumerate() {
            if let Some(external_key) = &block.external_key {
                let key_id = self.symbols.insert_public_key(external_key.clone());
                self.public_key_to_block_id
                    .entry(key_id)
                    .or_default()
                    .push(i as u64 + 1);
            }
        }

        // seed revocation identifiers as authorizer facts
        for (i, id) in token.revocation_ids().into_iter().enumerate() {
            let fact = builder::fact(
                "revocation_id",
                &[builder::int(i as i64), builder::bytes(id)],
            );
            let converted = fact.convert(&mut self.symbols)?;
            self.world.add_fact(&Origin::authorizer(), converted);
        }

        // authority block: origin 0
        let authority_trusted = TrustedOrigins::from_scopes(
            &token.authority.scopes,
            &TrustedOrigins::root(),
            0,
            &self.public_key_to_block_id,
        );
        for fact in &token.authority.facts {
            let converted = builder::Fact::convert_from(fact, &token.symbols)?
                .convert(&mut self.symbols)?;
            self.world.add_fact(&Origin::authority(), converted);
        }
        for rule in &token.authority.rules {
            self.import_rule(rule, &token.symbols, 0, &authority_trusted)?;
        }

        // later blocks: origin i + 1, each under its own declared scopes
        for (i, block) in token.blocks.iter().enumerate() {
            let block_id = i as u64 + 1;
            let block_trusted = TrustedOrigins::from_scopes(
                &block.scopes,
                &TrustedOrigins::root(),
                block_id,
                &self.public_key_to_block_id,
            );
            let local_table;
            let block_symbols = if block.external_key.is_some() {
                local_table = block.local_symbol_table();
                &local_table
            } else {
                &token.symbols
            };

            for fact in &block.facts {
                let converted =
                    builder::Fact::convert_from(fact, block_symbols)?.convert(&mut self.symbols)?;
                self.world.add_fact(&Origin::new(block_id), converted);
            }
            for rule in &block.rules {
                self.import_rule(rule, block_symbols, block_id, &block_trusted)?;
            }
        }

        self.token = Some(token);
        Ok(())
    }

    /// Re-intern one token rule into the unified table, validating
    /// variable safety on the way in.
    fn import_rule(
        &mut self,
        rule: &crate::datalog::Rule,
        block_symbols: &SymbolTable,
        block_id: u64,
        block_trusted: &TrustedOrigins,
    ) -> Result<()> {
        let bridged = builder::Rule::convert_from(rule, block_symbols)?;
        let converted = bridged.convert(&mut self.symbols)?;
        if bridged.validate_variables().is_err() {
            return Err(LogicError::InvalidBlockRule(
                block_id,
                self.symbols.format_rule(&converted),
            )
            .into());
        }
        let rule_trusted = TrustedOrigins::from_scopes(
            converted.scopes(),
            block_trusted,
            block_id,
            &self.public_key_to_block_id,
        );
        self.world.add_rule(block_id, &rule_trusted, converted);
        Ok(())
    }

    /// Add a ground fact under the authorizer's own origin.
    pub fn add_fact(&mut self, fact: builder::Fact) -> Result<()> {
        let converted = fact.convert(&mut self.symbols)?;
        self.world.add_fact(&Origin::authorizer(), converted);
        Ok(())
    }

    /// Add a rule under the authorizer's own origin.
    pub fn add_rule(&mut self, rule: builder::Rule) -> Result<()> {
        rule.validate_variables().map_err(TokenError::Language)?;
        let converted = rule.convert(&mut self.symbols)?;
        let trusted = TrustedOrigins::from_scopes(
            converted.scopes(),
            &self.authorizer_trusted_origins(),
            AUTHORIZER_ORIGIN,
            &self.public_key_to_block_id,
        );
        self.world.add_rule(AUTHORIZER_ORIGIN, &trusted, converted);
        Ok(())
    }

    /// Add a check evaluated on `authorize`.
    pub fn add_check(&mut self, check: builder::Check) {
        self.checks.push(check);
    }

    /// Add a policy evaluated on `authorize`, after every check.
    pub fn add_policy(&mut self, policy: builder::Policy) {
        self.policies.push(policy);
    }

    /// Add a default trust scope for authorizer rules and policies.
    pub fn add_scope(&mut self, scope: builder::Scope) {
        let converted = scope.convert(&mut self.symbols);
        self.scopes.push(converted);
    }

    /// Shorthand for the `allow if true` policy.
    pub fn allow(&mut self) {
        self.policies.push(builder::allow_if(
            &[],
            &[builder::Expression::Value(builder::boolean(true))],
        ));
    }

    /// Shorthand for the `deny if true` policy.
    pub fn deny(&mut self) {
        self.policies.push(builder::deny_if(
            &[],
            &[builder::Expression::Value(builder::boolean(true))],
        ));
    }

    /// Inject the current wall-clock time as a `time(<now>)` fact.
    pub fn set_time(&mut self) -> Result<()> {
        self.add_fact(builder::fact(
            "time",
            &[builder::date(crate::time::now_secs())],
        ))
    }

    /// The trust context of the authorizer's own rules and policies.
    pub fn authorizer_trusted_origins(&self) -> TrustedOrigins {
        TrustedOrigins::from_scopes(
            &self.scopes,
            &TrustedOrigins::root(),
            AUTHORIZER_ORIGIN,
            &self.public_key_to_block_id,
        )
    }

    /// Run the decision algorithm under the default limits.
    pub fn authorize(&mut self) -> Result<usize> {
        self.authorize_with_limits(&RunLimits::default())
    }

    /// Run the decision algorithm.
    ///
    /// Checks are evaluated in declaration order — authorizer checks, then
    /// the authority block's, then each later block's — and every failure
    /// is accumulated. Policies are scanned in declaration order and the
    /// first match wins. The deadline is checked after every query.
    pub fn authorize_with_limits(&mut self, limits: &RunLimits) -> Result<usize> {
        let deadline = Instant::now() + limits.max_time;
        let mut errors: Vec<FailedCheck> = Vec::new();

        let authorizer_trusted = self.authorizer_trusted_origins();
        self.world.run(limits, &self.symbols)?;

        // authorizer checks
        let checks = self.checks.clone();
        for (i, check) in checks.iter().enumerate() {
            let converted = check.convert(&mut self.symbols)?;
            let mut successful = false;
            for query in converted.queries() {
                let trusted = TrustedOrigins::from_scopes(
                    query.scopes(),
                    &authorizer_trusted,
                    AUTHORIZER_ORIGIN,
                    &self.public_key_to_block_id,
                );
                let matched = match converted.kind() {
                    CheckKind::One => self.world.query_match(query, &trusted, &self.symbols)?,
                    CheckKind::All => {
                        self.world.query_match_all(query, &trusted, &self.symbols)?
                    }
                };
                if Instant::now() >= deadline {
                    return Err(TokenError::Timeout);
                }
                if matched {
                    successful = true;
                    break;
                }
            }
            if !successful {
                errors.push(FailedCheck::Authorizer {
                    check_id: i as u64,
                    rule: self.symbols.format_check(&converted),
                });
            }
        }

        // token checks, block by block
        if let Some(token) = self.token.take() {
            let result = self.token_checks(&token, deadline, &mut errors);
            self.token = Some(token);
            result?;
        }

        // policies: first match wins
        let mut policy_result: Option<MatchedPolicy> = None;
        let policies = self.policies.clone();
        'policies: for (i, policy) in policies.iter().enumerate() {
            for query in &policy.queries {
                let converted = query.convert(&mut self.symbols)?;
                let trusted = TrustedOrigins::from_scopes(
                    converted.scopes(),
                    &authorizer_trusted,
                    AUTHORIZER_ORIGIN,
                    &self.public_key_to_block_id,
                );
                let matched = self
                    .world
                    .query_match(&converted, &trusted, &self.symbols)?;
                if Instant::now() >= deadline {
                    return Err(TokenError::Timeout);
                }
                if matched {
                    policy_result = Some(match policy.kind {
                        builder::PolicyKind::Allow => MatchedPolicy::Allow(i),
                        builder::PolicyKind::Deny => MatchedPolicy::Deny(i),
                    });
                    break 'policies;
                }
            }
        }

        log::debug!(
            "authorization decided: policy {policy_result:?}, {} failed check(s)",
            errors.len()
        );
        match policy_result {
            Some(MatchedPolicy::Allow(i)) if errors.is_empty() => Ok(i),
            Some(policy) => Err(LogicError::Unauthorized {
                policy,
                checks: errors,
            }
            .into()),
            None => Err(LogicError::NoMatchingPolicy { checks: errors }.into()),
        }
    }

    /// Evaluate the authority block's checks and then every later block's,
    /// each under its own trusted-origin context.
    fn token_checks(
        &mut self,
        token: &Token,
        deadline: Instant,
        errors: &mut Vec<FailedCheck>,
    ) -> Result<()> {
        let authority_trusted = TrustedOrigins::from_scopes(
            &token.authority.scopes,
            &TrustedOrigins::root(),
            0,
            &self.public_key_to_block_id,
        );
        self.block_checks(
            &token.authority.checks,
            &token.symbols,
            0,
            &authority_trusted,
            deadline,
            errors,
        )?;

        for (i, block) in token.blocks.iter().enumerate() {
            let block_id = i as u64 + 1;
            let block_trusted = TrustedOrigins::from_scopes(
                &block.scopes,
                &TrustedOrigins::root(),
                block_id,
                &self.public_key_to_block_id,
            );
            let local_table;
            let block_symbols = if block.external_key.is_some() {
                local_table = block.local_symbol_table();
                &local_table
            } else {
                &token.symbols
            };
            self.block_checks(
                &block.checks,
                block_symbols,
                block_id,
                &block_trusted,
                deadline,
                errors,
            )?;
        }
        Ok(())
    }

    fn block_checks(
        &mut self,
        checks: &[crate::datalog::Check],
        block_symbols: &SymbolTable,
        block_id: u64,
        block_trusted: &TrustedOrigins,
        deadline: Instant,
        errors: &mut Vec<FailedCheck>,
    ) -> Result<()> {
        for (j, check) in checks.iter().enumerate() {
            let bridged = builder::Check::convert_from(check, block_symbols)?;
            let converted = bridged.convert(&mut self.symbols)?;
            let mut successful = false;
            for query in converted.queries() {
                let trusted = TrustedOrigins::from_scopes(
                    query.scopes(),
                    block_trusted,
                    block_id,
                    &self.public_key_to_block_id,
                );
                let matched = match converted.kind() {
                    CheckKind::One => self.world.query_match(query, &trusted, &self.symbols)?,
                    CheckKind::All => {
                        self.world.query_match_all(query, &trusted, &self.symbols)?
                    }
                };
                if Instant::now() >= deadline {
                    return Err(TokenError::Timeout);
                }
                if matched {
                    successful = true;
                    break;
                }
            }
            if !successful {
                errors.push(FailedCheck::Block {
                    block_id,
                    check_id: j as u64,
                    rule: self.symbols.format_check(&converted),
                });
            }
        }
        Ok(())
    }

    /// Run the world and evaluate an ad-hoc query under the default
    /// limits.
    pub fn query(&mut self, rule: builder::Rule) -> Result<Vec<builder::Fact>> {
        self.query_with_limits(rule, &RunLimits::default())
    }

    /// Run the world and evaluate an ad-hoc query.
    pub fn query_with_limits(
        &mut self,
        rule: builder::Rule,
        limits: &RunLimits,
    ) -> Result<Vec<builder::Fact>> {
        self.world.run(limits, &self.symbols)?;
        let converted = rule.convert(&mut self.symbols)?;
        let trusted = TrustedOrigins::from_scopes(
            converted.scopes(),
            &TrustedOrigins::root(),
            AUTHORIZER_ORIGIN,
            &self.public_key_to_block_id,
        );
        let facts = self
            .world
            .query_rule(&converted, AUTHORIZER_ORIGIN, &trusted, &self.symbols)
            .map_err(TokenError::Execution)?;

        let mut results = BTreeSet::new();
        for (_origin, fact) in facts.iter_all() {
            results.insert(builder::Fact::convert_from(fact, &self.symbols)?);
        }
        Ok(results.into_iter().collect())
    }

    /// Revocation identifiers of the bound token, in block order, hex
    /// encoded.
    pub fn revocation_ids(&mut self) -> Result<Vec<String>> {
        let query = builder::rule(
            "revocation_id",
            &[builder::var("index"), builder::var("id")],
            &[builder::pred(
                "revocation_id",
                &[builder::var("index"), builder::var("id")],
            )],
        );
        let mut ids: Vec<(i64, String)> = Vec::new();
        for fact in self.query(query)? {
            if let [builder::Term::Integer(index), builder::Term::Bytes(bytes)] =
                &fact.predicate.terms[..]
            {
                ids.push((*index, hex::encode(bytes)));
            }
        }
        ids.sort();
        Ok(ids.into_iter().map(|(_, id)| id).collect())
    }

    /// Render the world, checks, and policies for inspection.
    pub fn format_world(&self) -> String {
        let mut checks: Vec<String> = self
            .checks
            .iter()
            .enumerate()
            .map(|(i, c)| format!("Authorizer[{i}]: {c}"))
            .collect();
        if let Some(token) = &self.token {
            for (j, check) in token.authority.checks.iter().enumerate() {
                checks.push(format!(
                    "Block[0][{j}]: {}",
                    token.symbols.format_check(check)
                ));
            }
            for (i, block) in token.blocks.iter().enumerate() {
                let local_table;
                let block_symbols = if block.external_key.is_some() {
                    local_table = block.local_symbol_table();
                    &local_table
                } else {
                    &token.symbols
                };
                for (j, check) in block.checks.iter().enumerate() {
                    checks.push(format!(
                        "Block[{}][{j}]: {}",
                        i + 1,
                        block_symbols.format_check(check)
                    ));
                }
            }
        }
        let policies: Vec<String> = self.policies.iter().map(|p| p.to_string()).collect();
        format!(
            "{}\nchecks: [\n\t{}\n]\npolicies: [\n\t{}\n]",
            self.symbols.format_world(&self.world),
            checks.join(",\n\t"),
            policies.join(",\n\t")
        )
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
