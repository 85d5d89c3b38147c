//! Series transforms applied between extraction and output
//!
//! - **ttm**: trailing-twelve-month rolling sums
//! - **combine**: calendar-year matched combination for custom metrics
//! - **interpolate**: forward-fill onto the price axis
//! - **ratio**: guarded division of aligned series

pub mod combine;
pub mod interpolate;
pub mod ratio;
pub mod ttm;

pub use combine::{combine_by_year, combine_custom};
pub use interpolate::forward_fill;
pub use ratio::ratio;
pub use ttm::{trailing_twelve_months, TTM_WINDOW};
