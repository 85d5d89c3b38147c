//! Year-matched combination of two series
//!
//! Custom metrics such as free cash flow or book value per share pair
//! values reported on different schedules. Points are matched on calendar
//! year rather than exact date so an annual figure can meet a share count
//! dated a few weeks later.

use crate::formula::{BinaryOp, Formula};
use crate::types::{Series, SeriesMap, SeriesPoint};
use chrono::Datelike;
use hashbrown::HashMap;

/// Combine `first <op> second` by calendar year.
///
/// Every valued point of `first` whose year has a valued point in `second`
/// yields one output point on `first`'s date. When `second` has several
/// points in a year the chronologically latest wins. Points whose result is
/// undefined (zero divisor, non-finite) are dropped rather than nulled.
pub fn combine_by_year(first: &Series, second: &Series, op: BinaryOp) -> Series {
    let mut sorted = second.points().to_vec();
    sorted.sort_by_key(|p| p.date);

    let mut by_year: HashMap<i32, f64> = HashMap::with_capacity(sorted.len());
    for point in &sorted {
        if let Some(value) = point.value {
            by_year.insert(point.date.year(), value);
        }
    }

    first
        .iter()
        .filter_map(|point| {
            let lhs = point.value?;
            let rhs = *by_year.get(&point.date.year())?;
            let value = op.apply(lhs, rhs)?;
            Some(SeriesPoint::with_value(point.date, value))
        })
        .collect()
}

/// Evaluate a custom-metric formula (`a <op> b`) over the working set.
///
/// Returns an empty series when the formula is not a single binary
/// operation over two ids or when an operand has no series.
pub fn combine_custom(formula: &Formula, data: &SeriesMap) -> Series {
    let Some((op, lhs, rhs)) = formula.as_binary_operands() else {
        log::warn!("Custom formula '{}' is not a binary operation", formula);
        return Series::new();
    };

    match (data.get(lhs), data.get(rhs)) {
        (Some(first), Some(second)) => combine_by_year(first, second, op),
        _ => {
            log::debug!("Custom formula '{}' is missing an operand", formula);
            Series::new()
        }
    }
}
