//! # Rusty-Metrics
//!
//! Date-aligned fundamental metric series from loosely structured financial
//! API payloads.
//!
//! A data source supplies raw JSON documents per API function (prices,
//! earnings, statements) and one FX rate. The pipeline extracts every raw
//! metric the catalog declares, builds trailing-twelve-month and custom
//! metrics, forward-fills everything onto the price calendar and evaluates
//! ratio formulas such as P/E or P/B. The result is a map of metric id to
//! ordered `{date, value}` series ready for charting.
//!
//! ## Example
//!
//! ```rust
//! use rusty_metrics::prelude::*;
//! use serde_json::json;
//!
//! let mut payloads = RawPayloads::new();
//! payloads.insert(
//!     "TIME_SERIES_MONTHLY_ADJUSTED",
//!     json!({"Monthly Adjusted Time Series": {
//!         "2023-12-29": {"5. adjusted close": "150.0"}
//!     }}),
//! );
//!
//! let catalog = MetricCatalog::alpha_vantage();
//! let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
//! let results = process(&payloads, &FxRate::default(), &window, &catalog).unwrap();
//!
//! assert_eq!(results.get("price").unwrap().len(), 1);
//! assert!(results.contains("pe_ratio"));
//! ```

pub mod catalog;
pub mod error;
pub mod extract;
pub mod formula;
pub mod fx;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod types;

pub mod prelude {
    //! Commonly used types and functions
    pub use crate::catalog::{MetricCatalog, MetricDescriptor, MetricKind};
    pub use crate::error::{MetricsError, Result};
    pub use crate::formula::{evaluate_formula, Formula};
    pub use crate::fx::{Currency, FxRate};
    pub use crate::pipeline::{process, MetricPipeline, PipelineStage};
    pub use crate::source::RawPayloads;
    pub use crate::types::*;
}
