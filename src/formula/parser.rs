//! Recursive-descent parser producing the formula AST
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | IDENT | '(' expr ')'
//! ```
//!
//! Nesting is limited to [`MAX_DEPTH`] levels and input to [`MAX_TOKENS`]
//! tokens, so neither parsing nor evaluation can exhaust the stack.

use super::lexer::{tokenize, Token};
use crate::error::{MetricsError, Result};
use std::fmt;

/// Arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Apply the operator; `None` for a zero or non-finite divisor and for
    /// any non-finite result
    pub fn apply(&self, lhs: f64, rhs: f64) -> Option<f64> {
        let value = match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => {
                if rhs == 0.0 || !rhs.is_finite() {
                    return None;
                }
                lhs / rhs
            }
        };
        value.is_finite().then_some(value)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Formula expression tree over named metric leaves
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Evaluate with `resolve` supplying variable values.
    ///
    /// Any unresolved or non-finite variable, zero divisor or non-finite
    /// intermediate makes the whole expression unavailable.
    pub fn evaluate<F>(&self, resolve: &F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        match self {
            Expr::Number(n) => n.is_finite().then_some(*n),
            Expr::Variable(name) => resolve(name).filter(|v| v.is_finite()),
            Expr::Neg(inner) => inner.evaluate(resolve).map(|v| -v),
            Expr::Binary { op, lhs, rhs } => {
                let left = lhs.evaluate(resolve)?;
                let right = rhs.evaluate(resolve)?;
                op.apply(left, right)
            }
        }
    }

    /// Collect variable names in order of first appearance
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Expr::Neg(inner) => inner.collect_variables(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Variable(name) => write!(f, "{}", name),
            Expr::Neg(inner) => write!(f, "-({})", inner),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
        }
    }
}

/// Deepest nesting of parentheses and unary signs
pub const MAX_DEPTH: usize = 64;

/// Longest accepted formula; also bounds the depth of operator chains
pub const MAX_TOKENS: usize = 512;

/// Parse formula text into an expression tree
pub fn parse(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(MetricsError::FormulaParse("Empty formula".to_string()));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(MetricsError::FormulaParse(format!(
            "Formula too long ({} tokens, at most {})",
            tokens.len(),
            MAX_TOKENS
        )));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    if let Some(token) = parser.peek() {
        return Err(MetricsError::FormulaParse(format!(
            "Unexpected token '{}' in '{}'",
            token, input
        )));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(MetricsError::FormulaParse(
                "Formula nested too deeply".to_string(),
            ));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ident(name)) => Ok(Expr::Variable(name)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(MetricsError::FormulaParse(format!(
                        "Expected ')', found '{}'",
                        other
                    ))),
                    None => Err(MetricsError::FormulaParse(
                        "Unclosed parenthesis".to_string(),
                    )),
                }
            }
            Some(other) => Err(MetricsError::FormulaParse(format!(
                "Expected a metric id, number or '(', found '{}'",
                other
            ))),
            None => Err(MetricsError::FormulaParse(
                "Unexpected end of formula".to_string(),
            )),
        }
    }
}
