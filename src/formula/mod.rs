//! Formula evaluator for derived metrics
//!
//! Formulas are small arithmetic expressions over metric ids:
//! `+ - * /`, unary minus, numeric literals and parentheses. They are parsed
//! once into an [`Expr`] tree and evaluated per date against aligned series.
//!
//! # Example
//!
//! ```rust
//! use rusty_metrics::formula::Formula;
//!
//! let formula = Formula::parse("price / ttm_eps").unwrap();
//! assert_eq!(formula.variables(), vec!["price", "ttm_eps"]);
//!
//! let value = formula.evaluate(|id| match id {
//!     "price" => Some(150.0),
//!     "ttm_eps" => Some(6.0),
//!     _ => None,
//! });
//! assert_eq!(value, Some(25.0));
//! ```

pub mod lexer;
pub mod parser;

pub use lexer::{tokenize, Token};
pub use parser::{parse, BinaryOp, Expr};

use crate::error::Result;
use crate::types::{Series, SeriesMap, SeriesPoint};
use chrono::NaiveDate;
use hashbrown::HashMap;
use std::fmt;

/// A parsed metric formula
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parse formula text
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Referenced metric ids, in order of first appearance
    pub fn variables(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        self.expr.collect_variables(&mut vars);
        vars
    }

    /// `Some((op, a, b))` when the formula is exactly `a <op> b` over two ids
    pub fn as_binary_operands(&self) -> Option<(BinaryOp, &str, &str)> {
        match &self.expr {
            Expr::Binary { op, lhs, rhs } => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Variable(a), Expr::Variable(b)) => Some((*op, a.as_str(), b.as_str())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Evaluate with a value resolver
    pub fn evaluate<F>(&self, resolve: F) -> Option<f64>
    where
        F: Fn(&str) -> Option<f64>,
    {
        self.expr.evaluate(&resolve)
    }

    /// Evaluate on every target date.
    ///
    /// A referenced id missing from `data` makes every date `null`.
    pub fn evaluate_series(&self, data: &SeriesMap, dates: &[NaiveDate]) -> Series {
        let variables = self.variables();

        let mut lookups: HashMap<&str, HashMap<NaiveDate, Option<f64>>> = HashMap::new();
        for var in &variables {
            match data.get(*var) {
                Some(series) => {
                    lookups.insert(*var, series.lookup());
                }
                None => {
                    log::debug!(
                        "Formula '{}' references '{}' which has no data",
                        self.source,
                        var
                    );
                    return null_series(dates);
                }
            }
        }

        dates
            .iter()
            .map(|&date| {
                let value = self.evaluate(|id| {
                    lookups
                        .get(id)
                        .and_then(|values| values.get(&date).copied().flatten())
                });
                SeriesPoint::new(date, value)
            })
            .collect()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Evaluate `formula` over `data` on each of `dates`.
///
/// Never fails: an unparsable formula yields `null` on every date, as does
/// any date where a variable is unavailable or a divisor is zero.
pub fn evaluate_formula(formula: &str, data: &SeriesMap, dates: &[NaiveDate]) -> Series {
    match Formula::parse(formula) {
        Ok(parsed) => parsed.evaluate_series(data, dates),
        Err(e) => {
            log::warn!("Cannot evaluate formula '{}': {}", formula, e);
            null_series(dates)
        }
    }
}

fn null_series(dates: &[NaiveDate]) -> Series {
    dates.iter().map(|&date| SeriesPoint::null(date)).collect()
}
