//! The live Datalog database for one authorization attempt.
//!
//! Facts are partitioned by [`Origin`], rules by the [`TrustedOrigins`] they
//! resolved to. `run` drives a naive bottom-up fixpoint under a hard
//! resource budget; `query_rule` and friends do one-shot joins without
//! mutating the store. A `World` is created per authorizer, populated from
//! the token's blocks plus local additions, and discarded after the
//! decision.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use crate::error::{ExecutionError, RunLimitError, TokenError};

use super::origin::{Origin, TrustedOrigins};
use super::predicate::Fact;
use super::rule::Rule;
use super::symbols::SymbolTable;

/// Facts keyed by the origin that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactSet(HashMap<Origin, HashSet<Fact>>);

impl FactSet {
    pub fn insert(&mut self, origin: &Origin, fact: Fact) {
        self.0.entry(origin.clone()).or_default().insert(fact);
    }

    /// Total fact count across all origins.
    pub fn len(&self) -> usize {
        self.0.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn merge(&mut self, other: FactSet) {
        for (origin, facts) in other.0 {
            self.0.entry(origin).or_default().extend(facts);
        }
    }

    /// Every fact, regardless of trust.
    pub fn iter_all(&self) -> impl Iterator<Item = (&Origin, &Fact)> {
        self.0
            .iter()
            .flat_map(|(origin, facts)| facts.iter().map(move |f| (origin, f)))
    }

    /// Facts visible under `trusted`: only origins that are a subset of the
    /// trusted set are yielded.
    pub fn iterator<'a>(
        &'a self,
        trusted: &'a TrustedOrigins,
    ) -> impl Iterator<Item = (&'a Origin, &'a Fact)> {
        self.0
            .iter()
            .filter(|(origin, _)| trusted.contains(origin))
            .flat_map(|(origin, facts)| facts.iter().map(move |f| (origin, f)))
    }

    pub fn contains(&self, origin: &Origin, fact: &Fact) -> bool {
        self.0
            .get(origin)
            .map(|facts| facts.contains(fact))
            .unwrap_or(false)
    }
}

/// Rules grouped by their resolved trusted origins, each remembering the
/// block that defined it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet(HashMap<TrustedOrigins, Vec<(u64, Rule)>>);

impl RuleSet {
    pub fn insert(&mut self, defining_origin: u64, trusted: &TrustedOrigins, rule: Rule) {
        self.0
            .entry(trusted.clone())
            .or_default()
            .push((defining_origin, rule));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.0.values().flatten().map(|(_, rule)| rule)
    }

    pub fn iter_grouped(&self) -> impl Iterator<Item = (&TrustedOrigins, &[(u64, Rule)])> {
        self.0.iter().map(|(trusted, rules)| (trusted, rules.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resource budget for one evaluation.
///
/// All three limits are enforced: evaluation terminates against adversarial
/// or buggy rule sets instead of hanging or growing unbounded.
#[derive(Debug, Clone)]
pub struct RunLimits {
    /// Maximum number of facts the world may hold.
    pub max_facts: u64,
    /// Maximum number of fixpoint iterations.
    pub max_iterations: u64,
    /// Wall-clock budget for the whole evaluation.
    pub max_time: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_facts: 1000,
            max_iterations: 100,
            max_time: Duration::from_millis(5),
        }
    }
}

/// Fact and rule store plus the fixpoint solver.
#[derive(Debug, Clone, Default)]
pub struct World {
    facts: FactSet,
    rules: RuleSet,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fact(&mut self, origin: &Origin, fact: Fact) {
        self.facts.insert(origin, fact);
    }

    pub fn add_rule(&mut self, defining_origin: u64, trusted: &TrustedOrigins, rule: Rule) {
        self.rules.insert(defining_origin, trusted, rule);
    }

    pub fn facts(&self) -> &FactSet {
        &self.facts
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run every rule against the visible facts until an iteration adds
    /// nothing new, or a limit trips.
    pub fn run(&mut self, limits: &RunLimits, symbols: &SymbolTable) -> Result<(), TokenError> {
        let deadline = Instant::now() + limits.max_time;
        let mut iterations: u64 = 0;
        loop {
            let mut new_facts = FactSet::default();
            for (trusted, rules) in self.rules.iter_grouped() {
                for (defining_origin, rule) in rules {
                    rule.apply(&self.facts, *defining_origin, trusted, symbols, &mut new_facts)?;
                }
            }

            let before = self.facts.len();
            self.facts.merge(new_facts);
            if self.facts.len() == before {
                log::trace!("fixpoint reached after {iterations} iteration(s), {before} fact(s)");
                return Ok(());
            }

            if self.facts.len() as u64 > limits.max_facts {
                return Err(RunLimitError::TooManyFacts.into());
            }
            iterations += 1;
            if iterations >= limits.max_iterations {
                return Err(RunLimitError::TooManyIterations.into());
            }
            if Instant::now() >= deadline {
                return Err(RunLimitError::Timeout.into());
            }
        }
    }

    /// One-shot join: apply `rule` against the current facts without
    /// inserting the results into the world.
    pub fn query_rule(
        &self,
        rule: &Rule,
        origin_id: u64,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<FactSet, ExecutionError> {
        let mut output = FactSet::default();
        rule.apply(&self.facts, origin_id, trusted, symbols, &mut output)?;
        Ok(output)
    }

    /// Check kind ONE: at least one fact satisfies the query.
    pub fn query_match(
        &self,
        rule: &Rule,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        rule.find_match(&self.facts, trusted, symbols)
    }

    /// Check kind ALL: no binding of the query's body violates its guards.
    pub fn query_match_all(
        &self,
        rule: &Rule,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        rule.check_match_all(&self.facts, trusted, symbols)
    }
}
