//! Rules and the body-matching join.
//!
//! A rule joins its body predicates against the visible facts, evaluates
//! its guard expressions for each complete variable binding, and produces
//! one new fact per satisfying binding. The origin of a produced fact is
//! the union of the origins of every fact used in the join plus the rule's
//! own defining origin.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

use super::expression::{Expression, Op};
use super::origin::{Origin, TrustedOrigins};
use super::predicate::{Fact, Predicate};
use super::scope::Scope;
use super::symbols::{SymbolTable, TemporarySymbolTable};
use super::term::Term;
use super::world::FactSet;

/// A Datalog rule: head, body predicates, guard expressions, trust scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    head: Predicate,
    body: Vec<Predicate>,
    expressions: Vec<Expression>,
    scopes: Vec<Scope>,
}

impl Rule {
    pub fn new(
        head: Predicate,
        body: Vec<Predicate>,
        expressions: Vec<Expression>,
        scopes: Vec<Scope>,
    ) -> Self {
        Self {
            head,
            body,
            expressions,
            scopes,
        }
    }

    pub fn head(&self) -> &Predicate {
        &self.head
    }

    pub fn body(&self) -> &[Predicate] {
        &self.body
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.expressions
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// A rule is well-formed only if every variable in the head or in a
    /// guard expression also appears in some body predicate.
    pub fn validate_variables(&self) -> bool {
        let mut body_variables: HashSet<u32> = HashSet::new();
        for predicate in &self.body {
            for term in predicate.terms() {
                if let Term::Variable(id) = term {
                    body_variables.insert(*id);
                }
            }
        }
        for term in self.head.terms() {
            if let Term::Variable(id) = term {
                if !body_variables.contains(id) {
                    return false;
                }
            }
        }
        for expression in &self.expressions {
            for op in expression.ops() {
                if let Op::Value(Term::Variable(id)) = op {
                    if !body_variables.contains(id) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Join the body against `facts`, evaluate the guards, and insert every
    /// produced fact into `output` with the accumulated origin.
    pub fn apply(
        &self,
        facts: &FactSet,
        rule_origin: u64,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
        output: &mut FactSet,
    ) -> Result<(), ExecutionError> {
        for (mut origin, bindings) in self.matched_bindings(facts, trusted) {
            if !self.guards_hold(&bindings, symbols)? {
                continue;
            }
            if let Some(fact) = self.instantiate_head(&bindings) {
                origin.insert(rule_origin);
                output.insert(&origin, fact);
            }
        }
        Ok(())
    }

    /// True iff at least one binding satisfies the body and the guards and
    /// grounds the head (check kind ONE).
    pub fn find_match(
        &self,
        facts: &FactSet,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        for (_origin, bindings) in self.matched_bindings(facts, trusted) {
            if self.guards_hold(&bindings, symbols)? && self.instantiate_head(&bindings).is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True iff every binding of the body satisfies the guards — no
    /// counterexample exists (check kind ALL). An empty candidate set
    /// trivially succeeds.
    pub fn check_match_all(
        &self,
        facts: &FactSet,
        trusted: &TrustedOrigins,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        for (_origin, bindings) in self.matched_bindings(facts, trusted) {
            if !self.guards_hold(&bindings, symbols)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Every complete variable binding of the body against the visible
    /// facts, with the origin accumulated along the join.
    fn matched_bindings(
        &self,
        facts: &FactSet,
        trusted: &TrustedOrigins,
    ) -> Vec<(Origin, HashMap<u32, Term>)> {
        let mut matches = Vec::new();
        match_body(
            &self.body,
            facts,
            trusted,
            Origin::default(),
            HashMap::new(),
            &mut matches,
        );
        matches
    }

    fn guards_hold(
        &self,
        bindings: &HashMap<u32, Term>,
        symbols: &SymbolTable,
    ) -> Result<bool, ExecutionError> {
        let mut temp = TemporarySymbolTable::new(symbols);
        for expression in &self.expressions {
            match expression.evaluate(bindings, &mut temp)? {
                Term::Bool(true) => {}
                Term::Bool(false) => return Ok(false),
                _ => return Err(ExecutionError::InvalidType),
            }
        }
        Ok(true)
    }

    /// Substitute bindings into the head; `None` if a head variable is
    /// unbound (rejected at import time, defended against here anyway).
    fn instantiate_head(&self, bindings: &HashMap<u32, Term>) -> Option<Fact> {
        let mut terms = Vec::with_capacity(self.head.terms().len());
        for term in self.head.terms() {
            match term {
                Term::Variable(id) => terms.push(bindings.get(id)?.clone()),
                other => terms.push(other.clone()),
            }
        }
        Some(Fact::new(self.head.name(), terms))
    }
}

fn match_body(
    body: &[Predicate],
    facts: &FactSet,
    trusted: &TrustedOrigins,
    origin: Origin,
    bindings: HashMap<u32, Term>,
    out: &mut Vec<(Origin, HashMap<u32, Term>)>,
) {
    let Some((pattern, rest)) = body.split_first() else {
        out.push((origin, bindings));
        return;
    };
    for (fact_origin, fact) in facts.iterator(trusted) {
        if !pattern.match_shape(fact.predicate()) {
            continue;
        }
        let mut extended = bindings.clone();
        if !unify(pattern.terms(), fact.predicate().terms(), &mut extended) {
            continue;
        }
        match_body(
            rest,
            facts,
            trusted,
            origin.union(fact_origin),
            extended,
            out,
        );
    }
}

/// Match a rule-pattern term list against a ground term list, extending
/// `bindings`. A variable binds on first sight and must agree afterwards;
/// ground terms must be structurally equal.
fn unify(pattern: &[Term], ground: &[Term], bindings: &mut HashMap<u32, Term>) -> bool {
    for (p, g) in pattern.iter().zip(ground) {
        match p {
            Term::Variable(id) => match bindings.get(id) {
                Some(bound) => {
                    if bound != g {
                        return false;
                    }
                }
                None => {
                    bindings.insert(*id, g.clone());
                }
            },
            _ => {
                if p != g {
                    return false;
                }
            }
        }
    }
    true
}
