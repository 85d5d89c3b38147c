//! Error types for rusty_metrics

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for rusty_metrics
///
/// Per-point and per-metric problems (missing payloads, malformed values,
/// zero denominators) never surface here; they degrade to empty series or
/// `null` values. Only conditions that make a whole run meaningless do.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("No price data for '{metric}' between {start} and {end}")]
    NoPriceData {
        metric: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("FX rate must be positive and finite, got: {0}")]
    InvalidFxRate(f64),

    #[error("Invalid date window: start {start} is after end {end}")]
    InvalidDateWindow { start: NaiveDate, end: NaiveDate },

    #[error("Formula parse error: {0}")]
    FormulaParse(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Result type alias for rusty_metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;
