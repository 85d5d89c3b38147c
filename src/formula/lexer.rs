//! Formula tokenizer

use crate::error::{MetricsError, Result};
use std::fmt;

/// Lexical token of a metric formula
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Metric id (`[A-Za-z_][A-Za-z0-9_]*`)
    Ident(String),
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "{}", name),
            Token::Number(n) => write!(f, "{}", n),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// Split a formula into tokens
///
/// Identifiers are always read greedily, so `eps` and `ttm_eps` are distinct
/// tokens no matter where they appear.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = pos;
            let mut seen_dot = false;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                if chars[pos] == '.' {
                    if seen_dot {
                        break;
                    }
                    seen_dot = true;
                }
                pos += 1;
            }
            let literal: String = chars[start..pos].iter().collect();
            let value = literal.parse::<f64>().map_err(|_| {
                MetricsError::FormulaParse(format!(
                    "Invalid number '{}' at position {}",
                    literal, start
                ))
            })?;
            tokens.push(Token::Number(value));
            continue;
        }

        return Err(MetricsError::FormulaParse(format!(
            "Unexpected character '{}' at position {}",
            c, pos
        )));
    }

    Ok(tokens)
}
