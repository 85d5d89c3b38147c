//! Raw extraction stage: payloads -> one series per raw metric

use super::path::{find_valid_date, get_nested_value, parse_numeric};
use crate::catalog::{MetricCatalog, MetricDescriptor};
use crate::fx::FxRate;
use crate::source::RawPayloads;
use crate::types::{parse_date, DateWindow, Series, SeriesMap, SeriesPoint};
use serde_json::Value;

/// Extract every raw metric in the catalog.
///
/// Every raw metric gets an entry; unavailable sources give an empty series.
pub fn extract_raw_metrics(
    payloads: &RawPayloads,
    fx: &FxRate,
    window: &DateWindow,
    catalog: &MetricCatalog,
) -> SeriesMap {
    let price_id = catalog.price_metric_id();

    catalog
        .raw_metrics()
        .map(|descriptor| {
            let is_price = descriptor.id == price_id;
            let series = extract_metric(descriptor, payloads, fx, window, is_price);
            log::debug!("Extracted {} points for '{}'", series.len(), descriptor.id);
            (descriptor.id.clone(), series)
        })
        .collect()
}

/// Extract a single raw metric.
///
/// `is_price` exempts the designated price series from FX conversion.
pub fn extract_metric(
    descriptor: &MetricDescriptor,
    payloads: &RawPayloads,
    fx: &FxRate,
    window: &DateWindow,
    is_price: bool,
) -> Series {
    let Some(function) = descriptor.source_function.as_deref() else {
        return Series::new();
    };

    let Some(payload) = payloads.get(function) else {
        match payloads.error(function) {
            Some(message) => log::warn!(
                "Source {} unavailable for '{}': {}",
                function,
                descriptor.id,
                message
            ),
            None => log::debug!("No {} payload for '{}'", function, descriptor.id),
        }
        return Series::new();
    };

    let Some(container) = descriptor
        .container_key()
        .and_then(|key| get_nested_value(payload, &[key]))
    else {
        log::debug!(
            "{} has no {:?} container for '{}'",
            function,
            descriptor.container_key(),
            descriptor.id
        );
        return Series::new();
    };

    // FX only touches record-based fundamentals; time series are taken as reported
    let points = if descriptor.is_time_series {
        extract_time_series(descriptor, container, window)
    } else {
        let apply_fx = descriptor.fx_adjust && !is_price;
        extract_records(descriptor, container, window)
            .into_iter()
            .map(|(date, value)| (date, if apply_fx { fx.convert(value) } else { value }))
            .collect()
    };

    points
        .into_iter()
        .map(|(date, value)| SeriesPoint::with_value(date, value))
        .collect()
}

/// `{"YYYY-MM-DD": {field: value, ...}, ...}`
fn extract_time_series(
    descriptor: &MetricDescriptor,
    container: &Value,
    window: &DateWindow,
) -> Vec<(chrono::NaiveDate, f64)> {
    let Some(entries) = container.as_object() else {
        log::debug!("Container for '{}' is not an object", descriptor.id);
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|(key, record)| {
            let date = parse_date(key).filter(|d| window.contains(*d))?;
            let value = get_nested_value(record, descriptor.field_path()).and_then(parse_numeric)?;
            Some((date, value))
        })
        .collect()
}

/// `[{dateKey: "YYYY-MM-DD", field: value, ...}, ...]`
fn extract_records(
    descriptor: &MetricDescriptor,
    container: &Value,
    window: &DateWindow,
) -> Vec<(chrono::NaiveDate, f64)> {
    let (Some(records), Some(date_keys)) = (container.as_array(), descriptor.date_keys.as_ref())
    else {
        log::debug!("Container for '{}' is not a record list", descriptor.id);
        return Vec::new();
    };

    records
        .iter()
        .filter_map(|record| {
            let date = find_valid_date(record, date_keys).filter(|d| window.contains(*d))?;
            let value = get_nested_value(record, descriptor.field_path()).and_then(parse_numeric)?;
            Some((date, value))
        })
        .collect()
}
