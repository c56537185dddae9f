//! Human-readable expression trees.
//!
//! The builder expression is a tree; conversion emits the post-order
//! opcode sequence the stack machine executes, and decoding replays the
//! opcodes against a stack of subtrees.

use std::fmt;

use crate::datalog;
use crate::datalog::{BinaryOp, Op, SymbolTable, UnaryOp};
use crate::error::{FormatError, TokenError};

use super::term::Term;

/// An expression over terms, unary, and binary operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Value(Term),
    Unary(UnaryOp, Box<Expression>),
    Binary(BinaryOp, Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn convert(&self, symbols: &mut SymbolTable) -> Result<datalog::Expression, TokenError> {
        let mut ops = Vec::new();
        self.emit(symbols, &mut ops)?;
        Ok(datalog::Expression::new(ops))
    }

    fn emit(&self, symbols: &mut SymbolTable, ops: &mut Vec<Op>) -> Result<(), TokenError> {
        match self {
            Expression::Value(term) => ops.push(Op::Value(term.convert(symbols)?)),
            Expression::Unary(op, inner) => {
                inner.emit(symbols, ops)?;
                ops.push(Op::Unary(*op));
            }
            Expression::Binary(op, left, right) => {
                left.emit(symbols, ops)?;
                right.emit(symbols, ops)?;
                ops.push(Op::Binary(*op));
            }
        }
        Ok(())
    }

    pub fn convert_from(
        expression: &datalog::Expression,
        symbols: &SymbolTable,
    ) -> Result<Self, TokenError> {
        let mut stack: Vec<Expression> = Vec::new();
        for op in expression.ops() {
            match op {
                Op::Value(term) => stack.push(Expression::Value(Term::convert_from(term, symbols)?)),
                Op::Unary(unary) => {
                    let inner = stack.pop().ok_or_else(malformed)?;
                    stack.push(Expression::Unary(*unary, Box::new(inner)));
                }
                Op::Binary(binary) => {
                    let right = stack.pop().ok_or_else(malformed)?;
                    let left = stack.pop().ok_or_else(malformed)?;
                    stack.push(Expression::Binary(*binary, Box::new(left), Box::new(right)));
                }
            }
        }
        if stack.len() == 1 {
            Ok(stack.remove(0))
        } else {
            Err(malformed())
        }
    }

    /// Variable names appearing anywhere in the tree.
    pub fn variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Value(Term::Variable(name)) => out.push(name),
            Expression::Value(_) => {}
            Expression::Unary(_, inner) => inner.variables(out),
            Expression::Binary(_, left, right) => {
                left.variables(out);
                right.variables(out);
            }
        }
    }
}

fn malformed() -> TokenError {
    FormatError::Deserialization("malformed expression opcode sequence".to_string()).into()
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(term) => write!(f, "{term}"),
            Expression::Unary(UnaryOp::Negate, inner) => write!(f, "!{inner}"),
            Expression::Unary(UnaryOp::Parens, inner) => write!(f, "({inner})"),
            Expression::Unary(UnaryOp::Length, inner) => write!(f, "{inner}.length()"),
            Expression::Binary(op, left, right) => {
                let infix = match op {
                    BinaryOp::LessThan => "<",
                    BinaryOp::GreaterThan => ">",
                    BinaryOp::LessOrEqual => "<=",
                    BinaryOp::GreaterOrEqual => ">=",
                    BinaryOp::Equal => "==",
                    BinaryOp::NotEqual => "!=",
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::And => "&&",
                    BinaryOp::Or => "||",
                    BinaryOp::BitwiseAnd => "&",
                    BinaryOp::BitwiseOr => "|",
                    BinaryOp::BitwiseXor => "^",
                    BinaryOp::Contains => return write!(f, "{left}.contains({right})"),
                    BinaryOp::Prefix => return write!(f, "{left}.starts_with({right})"),
                    BinaryOp::Suffix => return write!(f, "{left}.ends_with({right})"),
                    BinaryOp::Regex => return write!(f, "{left}.matches({right})"),
                    BinaryOp::Intersection => {
                        return write!(f, "{left}.intersection({right})")
                    }
                    BinaryOp::Union => return write!(f, "{left}.union({right})"),
                };
                write!(f, "{left} {infix} {right}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn less_than(name: &str, bound: i64) -> Expression {
        Expression::Binary(
            BinaryOp::LessThan,
            Box::new(Expression::Value(Term::Variable(name.to_string()))),
            Box::new(Expression::Value(Term::Integer(bound))),
        )
    }

    #[test]
    fn test_convert_round_trip() {
        let mut symbols = SymbolTable::new();
        let expr = Expression::Unary(UnaryOp::Parens, Box::new(less_than("x", 5)));
        let interned = expr.convert(&mut symbols).unwrap();
        assert_eq!(interned.ops().len(), 4);
        let back = Expression::convert_from(&interned, &symbols).unwrap();
        assert_eq!(back, expr);
    }

    #[test]
    fn test_display_matches_interned_print() {
        let mut symbols = SymbolTable::new();
        let expr = less_than("x", 5);
        let interned = expr.convert(&mut symbols).unwrap();
        assert_eq!(expr.to_string(), interned.print(&symbols).unwrap());
    }

    #[test]
    fn test_variable_collection() {
        let expr = Expression::Binary(
            BinaryOp::And,
            Box::new(less_than("a", 1)),
            Box::new(less_than("b", 2)),
        );
        let mut vars = Vec::new();
        expr.variables(&mut vars);
        assert_eq!(vars, vec!["a", "b"]);
    }
}
