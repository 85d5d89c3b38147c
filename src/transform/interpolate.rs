//! Forward-fill alignment onto a target date axis

use crate::types::{Series, SeriesPoint};
use chrono::NaiveDate;

/// Align `source` to `target_dates` by carrying the last known value forward.
///
/// Each target date takes the value of the latest source point dated on or
/// before it, or `null` before the first source point. `target_dates` must
/// be ascending; `source` may be in any order. Runs in O(n + m).
pub fn forward_fill(source: &Series, target_dates: &[NaiveDate]) -> Series {
    if target_dates.is_empty() {
        return Series::new();
    }

    let sorted;
    let points = if source.is_sorted() {
        source.points()
    } else {
        sorted = {
            let mut points = source.points().to_vec();
            points.sort_by_key(|p| p.date);
            points
        };
        &sorted[..]
    };

    let mut cursor = 0;
    let mut last_value: Option<f64> = None;
    let mut aligned = Vec::with_capacity(target_dates.len());

    for &date in target_dates {
        while cursor < points.len() && points[cursor].date <= date {
            last_value = points[cursor].value;
            cursor += 1;
        }
        aligned.push(SeriesPoint::new(date, last_value));
    }

    Series::from_points(aligned)
}
