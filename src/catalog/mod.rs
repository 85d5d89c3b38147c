//! Metric catalog - the declarative list of supported metrics
//!
//! A catalog is plain data: it can be loaded from JSON and validated without
//! running the pipeline, and it is shared read-only by every run.
//!
//! # Components
//!
//! - **descriptor**: `MetricDescriptor`, `MetricKind` and `DateKeys`
//! - **validate**: reference and stage-order checks
//! - **defaults**: built-in catalog for Alpha Vantage payloads
//!
//! # Example
//!
//! ```rust
//! use rusty_metrics::catalog::{MetricCatalog, MetricKind};
//!
//! let catalog = MetricCatalog::alpha_vantage();
//! assert!(catalog.validate().is_ok());
//! assert_eq!(catalog.price_metric().kind, MetricKind::RawTimeSeries);
//! ```

pub mod defaults;
pub mod descriptor;
pub mod validate;

pub use defaults::{
    BALANCE_SHEET, CASH_FLOW, EARNINGS, INCOME_STATEMENT, PRICE_METRIC,
    TIME_SERIES_MONTHLY_ADJUSTED,
};
pub use descriptor::{DateKeys, MetricDescriptor, MetricKind};
pub use validate::validate_metrics;

use crate::error::Result;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk catalog layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    price_metric: String,
    metrics: Vec<MetricDescriptor>,
}

/// Validated, immutable set of metric descriptors
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    metrics: Vec<MetricDescriptor>,
    price_metric: String,
    index: HashMap<String, usize>,
}

impl MetricCatalog {
    /// Build and validate a catalog
    pub fn new(metrics: Vec<MetricDescriptor>, price_metric: impl Into<String>) -> Result<Self> {
        let price_metric = price_metric.into();
        validate_metrics(&metrics, &price_metric)?;
        Ok(Self::assemble(metrics, price_metric))
    }

    /// Built-in catalog for Alpha Vantage style payloads
    pub fn alpha_vantage() -> Self {
        Self::assemble(defaults::alpha_vantage_metrics(), PRICE_METRIC.to_string())
    }

    fn assemble(metrics: Vec<MetricDescriptor>, price_metric: String) -> Self {
        let index = metrics
            .iter()
            .enumerate()
            .map(|(idx, m)| (m.id.clone(), idx))
            .collect();
        Self {
            metrics,
            price_metric,
            index,
        }
    }

    /// Parse and validate a JSON catalog (`{"priceMetric": ..., "metrics": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.metrics, file.price_metric)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json(&contents)?;
        log::debug!(
            "Loaded catalog with {} metrics from {}",
            catalog.len(),
            path.as_ref().display()
        );
        Ok(catalog)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let file = CatalogFile {
            price_metric: self.price_metric.clone(),
            metrics: self.metrics.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Re-run validation
    pub fn validate(&self) -> Result<()> {
        validate_metrics(&self.metrics, &self.price_metric)
    }

    pub fn get(&self, id: &str) -> Option<&MetricDescriptor> {
        self.index.get(id).map(|&idx| &self.metrics[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn price_metric_id(&self) -> &str {
        &self.price_metric
    }

    /// The designated price series descriptor
    pub fn price_metric(&self) -> &MetricDescriptor {
        // assemble() is only reached with a validated list or the built-in one
        &self.metrics[self.index[self.price_metric.as_str()]]
    }

    pub fn metrics(&self) -> &[MetricDescriptor] {
        &self.metrics
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricDescriptor> {
        self.metrics.iter()
    }

    /// Metrics of one kind, in catalog order
    pub fn of_kind(&self, kind: MetricKind) -> impl Iterator<Item = &MetricDescriptor> {
        self.metrics.iter().filter(move |m| m.kind == kind)
    }

    /// Raw metrics, in catalog order
    pub fn raw_metrics(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.metrics.iter().filter(|m| m.kind.is_raw())
    }

    /// Distinct payload functions the raw metrics read from
    pub fn source_functions(&self) -> Vec<&str> {
        let mut functions: Vec<&str> = Vec::new();
        for function in self.metrics.iter().filter_map(|m| m.source_function.as_deref()) {
            if !functions.contains(&function) {
                functions.push(function);
            }
        }
        functions
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::alpha_vantage()
    }
}
