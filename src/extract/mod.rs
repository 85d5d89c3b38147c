//! Extraction of raw metric values from provider payloads
//!
//! - **path**: nested field access, date-key resolution and lenient number parsing
//! - **raw**: the raw extraction stage driven by the catalog

pub mod path;
pub mod raw;

pub use path::{find_valid_date, get_nested_value, parse_numeric};
pub use raw::{extract_metric, extract_raw_metrics};
