//! Catalog validation
//!
//! The pipeline runs its stages in a fixed order (raw, TTM, custom, then
//! ratios), so a reference is only valid when the referenced metric is
//! produced by an earlier stage, or earlier in catalog order within the same
//! stage.

use super::descriptor::{MetricDescriptor, MetricKind};
use crate::error::{MetricsError, Result};
use crate::formula::Formula;
use hashbrown::{HashMap, HashSet};

fn invalid(msg: String) -> MetricsError {
    MetricsError::InvalidCatalog(msg)
}

/// Validate a metric list against the designated price metric
pub fn validate_metrics(metrics: &[MetricDescriptor], price_metric: &str) -> Result<()> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, metric) in metrics.iter().enumerate() {
        if metric.id.trim().is_empty() {
            return Err(invalid(format!("Metric at position {} has an empty id", idx)));
        }
        if positions.insert(metric.id.as_str(), idx).is_some() {
            return Err(invalid(format!("Duplicate metric id '{}'", metric.id)));
        }
    }

    match positions.get(price_metric) {
        None => {
            return Err(invalid(format!(
                "Price metric '{}' is not defined",
                price_metric
            )))
        }
        Some(&idx) if metrics[idx].kind != MetricKind::RawTimeSeries => {
            return Err(invalid(format!(
                "Price metric '{}' must be RAW_TIME_SERIES, found {}",
                price_metric, metrics[idx].kind
            )))
        }
        Some(_) => {}
    }

    for (idx, metric) in metrics.iter().enumerate() {
        match metric.kind {
            MetricKind::RawTimeSeries | MetricKind::RawFundamental => validate_raw(metric)?,
            MetricKind::DerivedTtm => validate_ttm(metric, metrics, &positions)?,
            MetricKind::DerivedCustom => validate_custom(idx, metric, metrics, &positions)?,
            MetricKind::DerivedRatio => validate_ratio(idx, metric, metrics, &positions)?,
        }
    }

    Ok(())
}

fn validate_raw(metric: &MetricDescriptor) -> Result<()> {
    let has_function = metric
        .source_function
        .as_deref()
        .is_some_and(|f| !f.trim().is_empty());
    if !has_function {
        return Err(invalid(format!(
            "Raw metric '{}' has no sourceFunction",
            metric.id
        )));
    }

    if metric.source_path.is_empty() {
        return Err(invalid(format!(
            "Raw metric '{}' has an empty sourcePath",
            metric.id
        )));
    }

    if !metric.is_time_series && metric.date_keys.as_ref().map_or(true, |k| k.is_empty()) {
        return Err(invalid(format!(
            "Metric '{}' reads dated records but declares no dateKeys",
            metric.id
        )));
    }

    Ok(())
}

fn validate_ttm(
    metric: &MetricDescriptor,
    metrics: &[MetricDescriptor],
    positions: &HashMap<&str, usize>,
) -> Result<()> {
    let basis = metric.calculation_basis.as_deref().ok_or_else(|| {
        invalid(format!("TTM metric '{}' has no calculationBasis", metric.id))
    })?;

    let basis_idx = positions.get(basis).ok_or_else(|| {
        invalid(format!(
            "TTM metric '{}' references unknown metric '{}'",
            metric.id, basis
        ))
    })?;

    if !metrics[*basis_idx].kind.is_raw() {
        return Err(invalid(format!(
            "TTM metric '{}' must be based on a raw metric, '{}' is {}",
            metric.id, basis, metrics[*basis_idx].kind
        )));
    }

    Ok(())
}

fn parse_formula(metric: &MetricDescriptor) -> Result<Formula> {
    let source = metric.calculation_formula.as_deref().ok_or_else(|| {
        invalid(format!(
            "{} metric '{}' has no calculationFormula",
            metric.kind, metric.id
        ))
    })?;

    Formula::parse(source).map_err(|e| {
        invalid(format!(
            "Metric '{}' has an invalid formula '{}': {}",
            metric.id, source, e
        ))
    })
}

/// Check that every formula operand exists and is produced before `idx` runs
fn check_references<'a>(
    idx: usize,
    metric: &MetricDescriptor,
    operands: impl IntoIterator<Item = &'a str>,
    metrics: &[MetricDescriptor],
    positions: &HashMap<&str, usize>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for operand in operands {
        if !seen.insert(operand) {
            continue;
        }

        let op_idx = *positions.get(operand).ok_or_else(|| {
            invalid(format!(
                "Metric '{}' references unknown metric '{}'",
                metric.id, operand
            ))
        })?;

        if op_idx == idx {
            return Err(invalid(format!("Metric '{}' references itself", metric.id)));
        }

        let operand_kind = metrics[op_idx].kind;
        let resolved = match (metric.kind, operand_kind) {
            (_, k) if k.is_raw() => true,
            (MetricKind::DerivedCustom, MetricKind::DerivedTtm) => true,
            (MetricKind::DerivedCustom, MetricKind::DerivedCustom) => op_idx < idx,
            (MetricKind::DerivedCustom, _) => false,
            (MetricKind::DerivedRatio, MetricKind::DerivedRatio) => op_idx < idx,
            (MetricKind::DerivedRatio, _) => true,
            _ => false,
        };

        if !resolved {
            return Err(invalid(format!(
                "Metric '{}' ({}) uses '{}' ({}) before it is computed",
                metric.id, metric.kind, operand, operand_kind
            )));
        }
    }

    Ok(())
}

fn validate_custom(
    idx: usize,
    metric: &MetricDescriptor,
    metrics: &[MetricDescriptor],
    positions: &HashMap<&str, usize>,
) -> Result<()> {
    let formula = parse_formula(metric)?;
    let (_, first, second) = formula.as_binary_operands().ok_or_else(|| {
        invalid(format!(
            "Custom metric '{}' needs a formula of the form 'A - B' or 'A / B', got '{}'",
            metric.id, formula
        ))
    })?;

    check_references(idx, metric, [first, second], metrics, positions)
}

fn validate_ratio(
    idx: usize,
    metric: &MetricDescriptor,
    metrics: &[MetricDescriptor],
    positions: &HashMap<&str, usize>,
) -> Result<()> {
    let formula = parse_formula(metric)?;
    let variables = formula.variables();
    if variables.is_empty() {
        return Err(invalid(format!(
            "Ratio metric '{}' does not reference any metric",
            metric.id
        )));
    }

    check_references(idx, metric, variables, metrics, positions)
}
