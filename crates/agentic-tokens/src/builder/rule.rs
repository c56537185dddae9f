//! Human-readable rules.

use std::collections::HashSet;
use std::fmt;

use crate::datalog;
use crate::datalog::SymbolTable;
use crate::error::{LanguageError, TokenError};

use super::expression::Expression;
use super::predicate::Predicate;
use super::scope::Scope;
use super::term::Term;

/// A rule: head, body, guard expressions, and trust scopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub head: Predicate,
    pub body: Vec<Predicate>,
    pub expressions: Vec<Expression>,
    pub scopes: Vec<Scope>,
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

    /// Every variable in the head or guards must appear in the body.
    pub fn validate_variables(&self) -> Result<(), LanguageError> {
        let body_variables: HashSet<&str> = self
            .body
            .iter()
            .flat_map(|p| p.terms.iter())
            .filter_map(|t| match t {
                Term::Variable(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();

        let mut invalid: Vec<String> = Vec::new();
        for term in &self.head.terms {
            if let Term::Variable(name) = term {
                if !body_variables.contains(name.as_str()) {
                    invalid.push(name.clone());
                }
            }
        }
        let mut expression_variables = Vec::new();
        for expression in &self.expressions {
            expression.variables(&mut expression_variables);
        }
        for name in expression_variables {
            if !body_variables.contains(name) && !invalid.iter().any(|n| n == name) {
                invalid.push(name.to_string());
            }
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(LanguageError::InvalidVariables(invalid))
        }
    }

    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Rule, TokenError> {
        let head = self.head.convert(symbols)?;
        let body = self
            .body
            .iter()
            .map(|p| p.convert(symbols))
            .collect::<Result<Vec<_>, _>>()?;
        let expressions = self
            .expressions
            .iter()
            .map(|e| e.convert(symbols))
            .collect::<Result<Vec<_>, _>>()?;
        let scopes = self.scopes.iter().map(|s| s.convert(symbols)).collect();
        Ok(datalog::Rule::new(head, body, expressions, scopes))
    }

    pub fn convert_from(rule: &datalog::Rule, symbols: &SymbolTable) -> Result<Self, TokenError> {
        Ok(Self {
            head: Predicate::convert_from(rule.head(), symbols)?,
            body: rule
                .body()
                .iter()
                .map(|p| Predicate::convert_from(p, symbols))
                .collect::<Result<_, _>>()?,
            expressions: rule
                .expressions()
                .iter()
                .map(|e| Expression::convert_from(e, symbols))
                .collect::<Result<_, _>>()?,
            scopes: rule
                .scopes()
                .iter()
                .map(|s| Scope::convert_from(s, symbols))
                .collect::<Result<_, _>>()?,
        })
    }

    pub(crate) fn body_to_string(&self) -> String {
        let mut parts: Vec<String> = self.body.iter().map(Predicate::to_string).collect();
        parts.extend(self.expressions.iter().map(Expression::to_string));
        let mut rendered = parts.join(", ");
        if !self.scopes.is_empty() {
            let scopes: Vec<String> = self.scopes.iter().map(Scope::to_string).collect();
            rendered.push_str(" trusting ");
            rendered.push_str(&scopes.join(", "));
        }
        rendered
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.head, self.body_to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::BinaryOp;

    fn sample_rule() -> Rule {
        Rule::new(
            Predicate::new("grandparent", vec![Term::Variable("a".into()), Term::Variable("c".into())]),
            vec![
                Predicate::new("parent", vec![Term::Variable("a".into()), Term::Variable("b".into())]),
                Predicate::new("parent", vec![Term::Variable("b".into()), Term::Variable("c".into())]),
            ],
            vec![],
            vec![],
        )
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample_rule().validate_variables().is_ok());
    }

    #[test]
    fn test_validate_reports_names() {
        let rule = Rule::new(
            Predicate::new("out", vec![Term::Variable("missing".into())]),
            vec![Predicate::new("in", vec![Term::Variable("x".into())])],
            vec![Expression::Binary(
                BinaryOp::LessThan,
                Box::new(Expression::Value(Term::Variable("also_missing".into()))),
                Box::new(Expression::Value(Term::Integer(1))),
            )],
            vec![],
        );
        match rule.validate_variables() {
            Err(LanguageError::InvalidVariables(names)) => {
                assert_eq!(names, vec!["missing".to_string(), "also_missing".to_string()]);
            }
            other => panic!("expected InvalidVariables, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_preserves_meaning() {
        let mut symbols = SymbolTable::new();
        let rule = sample_rule();
        let interned = rule.convert(&mut symbols).unwrap();
        let back = Rule::convert_from(&interned, &symbols).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample_rule().to_string(),
            "grandparent($a, $c) <- parent($a, $b), parent($b, $c)"
        );
    }
}
