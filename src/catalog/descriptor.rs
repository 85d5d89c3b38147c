//! Metric descriptors - declarative description of a single metric

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a metric is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    /// Date-keyed mapping read straight from a payload (e.g. monthly prices)
    RawTimeSeries,
    /// Array of dated reports read from a payload (e.g. annual statements)
    RawFundamental,
    /// Trailing-twelve-month sum of another metric
    DerivedTtm,
    /// Formula over metrics aligned to the price calendar
    DerivedRatio,
    /// Year-matched difference or quotient of two metrics
    DerivedCustom,
}

impl MetricKind {
    pub fn is_raw(&self) -> bool {
        matches!(self, MetricKind::RawTimeSeries | MetricKind::RawFundamental)
    }

    pub fn is_derived(&self) -> bool {
        !self.is_raw()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::RawTimeSeries => "RAW_TIME_SERIES",
            MetricKind::RawFundamental => "RAW_FUNDAMENTAL",
            MetricKind::DerivedTtm => "DERIVED_TTM",
            MetricKind::DerivedRatio => "DERIVED_RATIO",
            MetricKind::DerivedCustom => "DERIVED_CUSTOM",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Candidate date field(s) on a fundamental record, tried in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateKeys {
    Single(String),
    Many(Vec<String>),
}

impl DateKeys {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            DateKeys::Single(key) => vec![key.as_str()],
            DateKeys::Many(keys) => keys.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DateKeys::Single(key) => key.trim().is_empty(),
            DateKeys::Many(keys) => keys.iter().all(|k| k.trim().is_empty()),
        }
    }
}

impl From<&str> for DateKeys {
    fn from(key: &str) -> Self {
        DateKeys::Single(key.to_string())
    }
}

impl From<Vec<&str>> for DateKeys {
    fn from(keys: Vec<&str>) -> Self {
        DateKeys::Many(keys.into_iter().map(str::to_string).collect())
    }
}

/// Declarative description of one supported metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub id: String,
    pub label: String,
    pub kind: MetricKind,
    /// Payload function name this metric is read from (raw metrics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_function: Option<String>,
    /// Container key followed by the field path inside each record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_keys: Option<DateKeys>,
    /// Metric a TTM series is aggregated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_formula: Option<String>,
    #[serde(default)]
    pub is_time_series: bool,
    /// Aligned to the price dates in the output; `true` when omitted
    #[serde(default = "default_plottable")]
    pub is_plottable: bool,
    #[serde(default)]
    pub fx_adjust: bool,
}

fn default_plottable() -> bool {
    true
}

impl MetricDescriptor {
    fn base(id: &str, label: &str, kind: MetricKind) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            source_function: None,
            source_path: Vec::new(),
            date_keys: None,
            calculation_basis: None,
            calculation_formula: None,
            is_time_series: false,
            is_plottable: true,
            fx_adjust: false,
        }
    }

    /// Date-keyed series such as `{"2024-01-31": {"5. adjusted close": "..."}}`
    pub fn time_series(id: &str, label: &str, function: &str, path: &[&str]) -> Self {
        Self {
            source_function: Some(function.to_string()),
            source_path: path.iter().map(|s| s.to_string()).collect(),
            is_time_series: true,
            ..Self::base(id, label, MetricKind::RawTimeSeries)
        }
    }

    /// Array of dated reports such as `{"annualReports": [{...}, ...]}`
    pub fn fundamental(
        id: &str,
        label: &str,
        function: &str,
        path: &[&str],
        date_keys: impl Into<DateKeys>,
    ) -> Self {
        Self {
            source_function: Some(function.to_string()),
            source_path: path.iter().map(|s| s.to_string()).collect(),
            date_keys: Some(date_keys.into()),
            ..Self::base(id, label, MetricKind::RawFundamental)
        }
    }

    pub fn ttm(id: &str, label: &str, basis: &str) -> Self {
        Self {
            calculation_basis: Some(basis.to_string()),
            ..Self::base(id, label, MetricKind::DerivedTtm)
        }
    }

    pub fn ratio(id: &str, label: &str, formula: &str) -> Self {
        Self {
            calculation_formula: Some(formula.to_string()),
            ..Self::base(id, label, MetricKind::DerivedRatio)
        }
    }

    pub fn custom(id: &str, label: &str, formula: &str) -> Self {
        Self {
            calculation_formula: Some(formula.to_string()),
            ..Self::base(id, label, MetricKind::DerivedCustom)
        }
    }

    /// Convert values with the run's FX rate
    pub fn fx_adjusted(mut self) -> Self {
        self.fx_adjust = true;
        self
    }

    /// Keep native dates in the output instead of aligning to the price calendar
    pub fn hidden(mut self) -> Self {
        self.is_plottable = false;
        self
    }

    /// Field path inside each record (everything after the container key)
    pub fn field_path(&self) -> &[String] {
        self.source_path.get(1..).unwrap_or(&[])
    }

    /// Container key (first element of the source path)
    pub fn container_key(&self) -> Option<&str> {
        self.source_path.first().map(String::as_str)
    }
}
