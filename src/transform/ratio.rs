//! Guarded pointwise division of two aligned series

use crate::formula::BinaryOp;
use crate::types::{Series, SeriesPoint};
use chrono::NaiveDate;

/// `numerator / denominator` on each date of `dates`.
///
/// A date is `null` unless both inputs carry a finite value there and the
/// denominator is non-zero.
pub fn ratio(numerator: &Series, denominator: &Series, dates: &[NaiveDate]) -> Series {
    let num = numerator.lookup();
    let den = denominator.lookup();

    dates
        .iter()
        .map(|&date| {
            let n = num.get(&date).copied().flatten();
            let d = den.get(&date).copied().flatten();
            let value = match (n, d) {
                (Some(n), Some(d)) if n.is_finite() => BinaryOp::Div.apply(n, d),
                _ => None,
            };
            SeriesPoint::new(date, value)
        })
        .collect()
}
