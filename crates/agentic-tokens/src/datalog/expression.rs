//! Stack-based virtual machine for inline rule guards.
//!
//! An [`Expression`] is a list of [`Op`]s executed against an operand stack
//! and a variable-binding map. Operand types must match per operator — there
//! is no implicit coercion, and a disallowed combination is a typed
//! [`ExecutionError::InvalidType`]. `print` mirrors the same stack machine
//! to produce the rendering used in diagnostics and must stay structurally
//! in sync with `evaluate`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ExecutionError;

use super::symbols::{SymbolTable, TemporarySymbolTable};
use super::term::Term;

/// One instruction of the expression machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Value(Term),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Parens,
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Contains,
    Prefix,
    Suffix,
    Regex,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Intersection,
    Union,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
}

impl UnaryOp {
    fn evaluate(
        &self,
        value: Term,
        symbols: &TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        match (self, value) {
            (UnaryOp::Negate, Term::Bool(b)) => Ok(Term::Bool(!b)),
            (UnaryOp::Parens, value) => Ok(value),
            (UnaryOp::Length, Term::Str(id)) => {
                let s = symbols
                    .get_symbol(id)
                    .ok_or(ExecutionError::UnknownSymbol(id))?;
                Ok(Term::Integer(s.len() as i64))
            }
            (UnaryOp::Length, Term::Bytes(bytes)) => Ok(Term::Integer(bytes.len() as i64)),
            (UnaryOp::Length, Term::Set(set)) => Ok(Term::Integer(set.len() as i64)),
            _ => Err(ExecutionError::InvalidType),
        }
    }

    fn print(&self, operand: String) -> String {
        match self {
            UnaryOp::Negate => format!("!{operand}"),
            UnaryOp::Parens => format!("({operand})"),
            UnaryOp::Length => format!("{operand}.length()"),
        }
    }
}

impl BinaryOp {
    fn evaluate(
        &self,
        left: Term,
        right: Term,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        match (self, left, right) {
            // comparisons on integers and dates
            (BinaryOp::LessThan, Term::Integer(i), Term::Integer(j)) => Ok(Term::Bool(i < j)),
            (BinaryOp::LessThan, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i < j)),
            (BinaryOp::GreaterThan, Term::Integer(i), Term::Integer(j)) => Ok(Term::Bool(i > j)),
            (BinaryOp::GreaterThan, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i > j)),
            (BinaryOp::LessOrEqual, Term::Integer(i), Term::Integer(j)) => Ok(Term::Bool(i <= j)),
            (BinaryOp::LessOrEqual, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i <= j)),
            (BinaryOp::GreaterOrEqual, Term::Integer(i), Term::Integer(j)) => {
                Ok(Term::Bool(i >= j))
            }
            (BinaryOp::GreaterOrEqual, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i >= j)),

            // equality, any matching ground type
            (BinaryOp::Equal, Term::Integer(i), Term::Integer(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::Equal, Term::Bool(i), Term::Bool(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::Equal, Term::Str(i), Term::Str(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::Equal, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::Equal, Term::Bytes(i), Term::Bytes(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::Equal, Term::Set(i), Term::Set(j)) => Ok(Term::Bool(i == j)),
            (BinaryOp::NotEqual, Term::Integer(i), Term::Integer(j)) => Ok(Term::Bool(i != j)),
            (BinaryOp::NotEqual, Term::Bool(i), Term::Bool(j)) => Ok(Term::Bool(i != j)),
            (BinaryOp::NotEqual, Term::Str(i), Term::Str(j)) => Ok(Term::Bool(i != j)),
            (BinaryOp::NotEqual, Term::Date(i), Term::Date(j)) => Ok(Term::Bool(i != j)),
            (BinaryOp::NotEqual, Term::Bytes(i), Term::Bytes(j)) => Ok(Term::Bool(i != j)),
            (BinaryOp::NotEqual, Term::Set(i), Term::Set(j)) => Ok(Term::Bool(i != j)),

            // set and string membership
            (BinaryOp::Contains, Term::Set(set), Term::Set(sub)) => {
                Ok(Term::Bool(sub.is_subset(&set)))
            }
            (BinaryOp::Contains, Term::Set(set), element @ (Term::Integer(_)
            | Term::Str(_)
            | Term::Bytes(_)
            | Term::Date(_)
            | Term::Bool(_))) => Ok(Term::Bool(set.contains(&element))),
            (BinaryOp::Contains, Term::Str(i), Term::Str(j)) => {
                let (left, right) = resolve_pair(symbols, i, j)?;
                Ok(Term::Bool(left.contains(&right)))
            }
            (BinaryOp::Prefix, Term::Str(i), Term::Str(j)) => {
                let (left, right) = resolve_pair(symbols, i, j)?;
                Ok(Term::Bool(left.starts_with(&right)))
            }
            (BinaryOp::Suffix, Term::Str(i), Term::Str(j)) => {
                let (left, right) = resolve_pair(symbols, i, j)?;
                Ok(Term::Bool(left.ends_with(&right)))
            }
            (BinaryOp::Regex, Term::Str(i), Term::Str(j)) => {
                let (left, right) = resolve_pair(symbols, i, j)?;
                let pattern = regex::Regex::new(&right)
                    .map_err(|e| ExecutionError::InvalidRegex(e.to_string()))?;
                Ok(Term::Bool(pattern.is_match(&left)))
            }

            // checked arithmetic; Add doubles as string concatenation
            (BinaryOp::Add, Term::Integer(i), Term::Integer(j)) => i
                .checked_add(j)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (BinaryOp::Add, Term::Str(i), Term::Str(j)) => {
                let (left, right) = resolve_pair(symbols, i, j)?;
                let id = symbols.insert(&format!("{left}{right}"));
                Ok(Term::Str(id))
            }
            (BinaryOp::Sub, Term::Integer(i), Term::Integer(j)) => i
                .checked_sub(j)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (BinaryOp::Mul, Term::Integer(i), Term::Integer(j)) => i
                .checked_mul(j)
                .map(Term::Integer)
                .ok_or(ExecutionError::Overflow),
            (BinaryOp::Div, Term::Integer(i), Term::Integer(j)) => {
                if j == 0 {
                    Err(ExecutionError::DivisionByZero)
                } else {
                    i.checked_div(j)
                        .map(Term::Integer)
                        .ok_or(ExecutionError::Overflow)
                }
            }

            // boolean connectives
            (BinaryOp::And, Term::Bool(i), Term::Bool(j)) => Ok(Term::Bool(i && j)),
            (BinaryOp::Or, Term::Bool(i), Term::Bool(j)) => Ok(Term::Bool(i || j)),

            // set algebra
            (BinaryOp::Intersection, Term::Set(i), Term::Set(j)) => {
                Ok(Term::Set(i.intersection(&j).cloned().collect()))
            }
            (BinaryOp::Union, Term::Set(i), Term::Set(j)) => {
                Ok(Term::Set(i.union(&j).cloned().collect()))
            }

            // bitwise, integers only
            (BinaryOp::BitwiseAnd, Term::Integer(i), Term::Integer(j)) => Ok(Term::Integer(i & j)),
            (BinaryOp::BitwiseOr, Term::Integer(i), Term::Integer(j)) => Ok(Term::Integer(i | j)),
            (BinaryOp::BitwiseXor, Term::Integer(i), Term::Integer(j)) => Ok(Term::Integer(i ^ j)),

            _ => Err(ExecutionError::InvalidType),
        }
    }

    fn print(&self, left: String, right: String) -> String {
        match self {
            BinaryOp::LessThan => format!("{left} < {right}"),
            BinaryOp::GreaterThan => format!("{left} > {right}"),
            BinaryOp::LessOrEqual => format!("{left} <= {right}"),
            BinaryOp::GreaterOrEqual => format!("{left} >= {right}"),
            BinaryOp::Equal => format!("{left} == {right}"),
            BinaryOp::NotEqual => format!("{left} != {right}"),
            BinaryOp::Contains => format!("{left}.contains({right})"),
            BinaryOp::Prefix => format!("{left}.starts_with({right})"),
            BinaryOp::Suffix => format!("{left}.ends_with({right})"),
            BinaryOp::Regex => format!("{left}.matches({right})"),
            BinaryOp::Add => format!("{left} + {right}"),
            BinaryOp::Sub => format!("{left} - {right}"),
            BinaryOp::Mul => format!("{left} * {right}"),
            BinaryOp::Div => format!("{left} / {right}"),
            BinaryOp::And => format!("{left} && {right}"),
            BinaryOp::Or => format!("{left} || {right}"),
            BinaryOp::Intersection => format!("{left}.intersection({right})"),
            BinaryOp::Union => format!("{left}.union({right})"),
            BinaryOp::BitwiseAnd => format!("{left} & {right}"),
            BinaryOp::BitwiseOr => format!("{left} | {right}"),
            BinaryOp::BitwiseXor => format!("{left} ^ {right}"),
        }
    }

    /// Operators that require schema version 4.
    pub fn requires_v4(&self) -> bool {
        matches!(
            self,
            BinaryOp::NotEqual | BinaryOp::BitwiseAnd | BinaryOp::BitwiseOr | BinaryOp::BitwiseXor
        )
    }
}

fn resolve_pair(
    symbols: &TemporarySymbolTable<'_>,
    left: u64,
    right: u64,
) -> Result<(String, String), ExecutionError> {
    let l = symbols
        .get_symbol(left)
        .ok_or(ExecutionError::UnknownSymbol(left))?
        .to_string();
    let r = symbols
        .get_symbol(right)
        .ok_or(ExecutionError::UnknownSymbol(right))?
        .to_string();
    Ok((l, r))
}

/// An operator sequence in reverse Polish order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    ops: Vec<Op>,
}

impl Expression {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Run the machine to a single value. Variables resolve through
    /// `values`; exactly one operand must remain at the end.
    pub fn evaluate(
        &self,
        values: &HashMap<u32, Term>,
        symbols: &mut TemporarySymbolTable<'_>,
    ) -> Result<Term, ExecutionError> {
        let mut stack: Vec<Term> = Vec::with_capacity(16);
        for op in &self.ops {
            match op {
                Op::Value(Term::Variable(id)) => match values.get(id) {
                    Some(term) => stack.push(term.clone()),
                    None => return Err(ExecutionError::UnboundVariable(*id)),
                },
                Op::Value(term) => stack.push(term.clone()),
                Op::Unary(op) => {
                    let value = stack.pop().ok_or(ExecutionError::StackImbalance)?;
                    stack.push(op.evaluate(value, symbols)?);
                }
                Op::Binary(op) => {
                    let right = stack.pop().ok_or(ExecutionError::StackImbalance)?;
                    let left = stack.pop().ok_or(ExecutionError::StackImbalance)?;
                    stack.push(op.evaluate(left, right, symbols)?);
                }
            }
        }
        if stack.len() == 1 {
            Ok(stack.remove(0))
        } else {
            Err(ExecutionError::StackImbalance)
        }
    }

    /// Render the expression, mirroring `evaluate`'s stack discipline.
    pub fn print(&self, symbols: &SymbolTable) -> Option<String> {
        let mut stack: Vec<String> = Vec::new();
        for op in &self.ops {
            match op {
                Op::Value(term) => stack.push(symbols.format_term(term)),
                Op::Unary(op) => {
                    let operand = stack.pop()?;
                    stack.push(op.print(operand));
                }
                Op::Binary(op) => {
                    let right = stack.pop()?;
                    let left = stack.pop()?;
                    stack.push(op.print(left, right));
                }
            }
        }
        if stack.len() == 1 {
            stack.pop()
        } else {
            None
        }
    }
}
