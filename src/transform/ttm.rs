//! Trailing-twelve-month aggregation

use crate::types::{Series, SeriesPoint};

/// Number of consecutive periods summed per output point (four quarters)
pub const TTM_WINDOW: usize = 4;

/// Rolling four-period sums.
///
/// The input is sorted by date first. Output point `i` is dated at input
/// point `i + 3` and holds the sum of that point and the three before it, so
/// fewer than four points yield an empty series. The window counts periods,
/// not calendar months: quarterly input is assumed. A null anywhere in a
/// window makes that sum null.
pub fn trailing_twelve_months(series: &Series) -> Series {
    if series.len() < TTM_WINDOW {
        return Series::new();
    }

    let mut points = series.points().to_vec();
    points.sort_by_key(|p| p.date);

    points
        .windows(TTM_WINDOW)
        .map(|window| {
            let sum = window
                .iter()
                .map(|p| p.value)
                .sum::<Option<f64>>();
            SeriesPoint::new(window[TTM_WINDOW - 1].date, sum)
        })
        .collect()
}
