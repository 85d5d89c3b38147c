//! Metric-processing pipeline
//!
//! Runs a fixed sequence of stages over one set of payloads:
//!
//! ```text
//! INIT -> EXTRACT_RAW -> AGGREGATE_TTM -> COMBINE_CUSTOM
//!      -> INTERPOLATE -> EVALUATE_RATIOS -> DONE
//! ```
//!
//! All working state lives inside a single [`MetricPipeline::process`] call,
//! so a pipeline can be shared and re-run freely.

use crate::catalog::{MetricCatalog, MetricDescriptor, MetricKind};
use crate::error::{MetricsError, Result};
use crate::extract::extract_raw_metrics;
use crate::formula::{BinaryOp, Formula};
use crate::fx::FxRate;
use crate::source::RawPayloads;
use crate::transform::{combine_custom, forward_fill, ratio, trailing_twelve_months};
use crate::types::{DateWindow, MetricResultMap, Series, SeriesMap, SeriesPoint};
use chrono::NaiveDate;
use std::fmt;

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Init,
    ExtractRaw,
    AggregateTtm,
    CombineCustom,
    Interpolate,
    EvaluateRatios,
    Done,
}

impl PipelineStage {
    /// Stage that follows this one; `Done` is terminal
    pub fn next(self) -> Self {
        match self {
            PipelineStage::Init => PipelineStage::ExtractRaw,
            PipelineStage::ExtractRaw => PipelineStage::AggregateTtm,
            PipelineStage::AggregateTtm => PipelineStage::CombineCustom,
            PipelineStage::CombineCustom => PipelineStage::Interpolate,
            PipelineStage::Interpolate => PipelineStage::EvaluateRatios,
            PipelineStage::EvaluateRatios => PipelineStage::Done,
            PipelineStage::Done => PipelineStage::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Init => "INIT",
            PipelineStage::ExtractRaw => "EXTRACT_RAW",
            PipelineStage::AggregateTtm => "AGGREGATE_TTM",
            PipelineStage::CombineCustom => "COMBINE_CUSTOM",
            PipelineStage::Interpolate => "INTERPOLATE",
            PipelineStage::EvaluateRatios => "EVALUATE_RATIOS",
            PipelineStage::Done => "DONE",
        }
    }

    fn advance(&mut self) {
        let next = self.next();
        log::debug!("Pipeline stage {} -> {}", self, next);
        *self = next;
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline bound to a metric catalog
#[derive(Debug, Clone, Copy)]
pub struct MetricPipeline<'a> {
    catalog: &'a MetricCatalog,
}

impl<'a> MetricPipeline<'a> {
    pub fn new(catalog: &'a MetricCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        self.catalog
    }

    /// Turn raw payloads into the final metric map.
    ///
    /// Fails only when the price series is empty after extraction; every
    /// other problem degrades to empty series or `null` values. Each catalog
    /// metric has an entry in the result. Plottable metrics and ratios are
    /// aligned to the price dates, the rest keep their own dates.
    pub fn process(
        &self,
        payloads: &RawPayloads,
        fx: &FxRate,
        window: &DateWindow,
    ) -> Result<MetricResultMap> {
        let catalog = self.catalog;
        let mut stage = PipelineStage::Init;
        log::info!(
            "Processing {} metrics over {} (fx: {})",
            catalog.len(),
            window,
            fx
        );

        stage.advance();
        let mut working = extract_raw_metrics(payloads, fx, window, catalog);

        let price_id = catalog.price_metric_id();
        let axis: Vec<NaiveDate> = match working.get(price_id) {
            Some(price) if !price.is_empty() => price.dates(),
            _ => {
                log::warn!("No price data for '{}' in {}", price_id, window);
                return Err(MetricsError::NoPriceData {
                    metric: price_id.to_string(),
                    start: window.start(),
                    end: window.end(),
                });
            }
        };
        log::debug!("Target axis: {} dates", axis.len());

        stage.advance();
        for descriptor in catalog.of_kind(MetricKind::DerivedTtm) {
            let series = aggregate_ttm(descriptor, &working);
            working.insert(descriptor.id.clone(), series);
        }

        stage.advance();
        for descriptor in catalog.of_kind(MetricKind::DerivedCustom) {
            let series = match parse_formula(descriptor) {
                Some(formula) => combine_custom(&formula, &working),
                None => Series::new(),
            };
            log::debug!("Combined {} points for '{}'", series.len(), descriptor.id);
            working.insert(descriptor.id.clone(), series);
        }

        stage.advance();
        let mut aligned: SeriesMap = working
            .iter()
            .map(|(id, series)| (id.clone(), forward_fill(series, &axis)))
            .collect();

        stage.advance();
        for descriptor in catalog.of_kind(MetricKind::DerivedRatio) {
            let series = evaluate_ratio(descriptor, &aligned, &axis);
            log::debug!(
                "Ratio '{}' has {} of {} values",
                descriptor.id,
                series.count_values(),
                series.len()
            );
            aligned.insert(descriptor.id.clone(), series);
        }

        let mut results = MetricResultMap::new();
        for descriptor in catalog.iter() {
            let source = if descriptor.kind == MetricKind::DerivedRatio || descriptor.is_plottable {
                aligned.remove(&descriptor.id)
            } else {
                working.remove(&descriptor.id)
            };
            results.insert(descriptor.id.clone(), source.unwrap_or_default());
        }

        stage.advance();
        log::info!(
            "Pipeline {}: {} metrics, {} with data",
            stage,
            results.len(),
            results.iter().filter(|(_, s)| s.count_values() > 0).count()
        );
        Ok(results)
    }
}

/// Run the pipeline once with `catalog`
pub fn process(
    payloads: &RawPayloads,
    fx: &FxRate,
    window: &DateWindow,
    catalog: &MetricCatalog,
) -> Result<MetricResultMap> {
    MetricPipeline::new(catalog).process(payloads, fx, window)
}

fn aggregate_ttm(descriptor: &MetricDescriptor, working: &SeriesMap) -> Series {
    let basis = descriptor
        .calculation_basis
        .as_deref()
        .and_then(|id| working.get(id));

    match basis {
        Some(series) => trailing_twelve_months(series),
        None => {
            log::debug!("No basis series for TTM metric '{}'", descriptor.id);
            Series::new()
        }
    }
}

fn parse_formula(descriptor: &MetricDescriptor) -> Option<Formula> {
    let text = descriptor.calculation_formula.as_deref()?;
    match Formula::parse(text) {
        Ok(formula) => Some(formula),
        Err(e) => {
            log::warn!("Skipping '{}': {}", descriptor.id, e);
            None
        }
    }
}

/// `A / B` goes through the guarded ratio evaluator; any other formula is
/// evaluated per date over the aligned series.
fn evaluate_ratio(descriptor: &MetricDescriptor, aligned: &SeriesMap, axis: &[NaiveDate]) -> Series {
    let Some(formula) = parse_formula(descriptor) else {
        return axis.iter().map(|&date| SeriesPoint::null(date)).collect();
    };

    match formula.as_binary_operands() {
        Some((BinaryOp::Div, numerator, denominator)) => {
            let empty = Series::new();
            ratio(
                aligned.get(numerator).unwrap_or(&empty),
                aligned.get(denominator).unwrap_or(&empty),
                axis,
            )
        }
        _ => formula.evaluate_series(aligned, axis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::Currency;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn small_catalog() -> MetricCatalog {
        MetricCatalog::new(
            vec![
                MetricDescriptor::time_series(
                    "price",
                    "Price",
                    "PRICES",
                    &["series", "close"],
                ),
                MetricDescriptor::fundamental(
                    "eps",
                    "EPS",
                    "EARNINGS",
                    &["quarterly", "eps"],
                    "date",
                )
                .hidden(),
                MetricDescriptor::ttm("eps_ttm", "TTM EPS", "eps"),
                MetricDescriptor::ratio("pe", "P/E", "price / eps_ttm"),
                MetricDescriptor::ratio("earnings_yield", "Earnings Yield", "eps_ttm / price * 100"),
            ],
            "price",
        )
        .unwrap()
    }

    fn payloads() -> RawPayloads {
        let mut payloads = RawPayloads::new();
        payloads.insert(
            "PRICES",
            json!({"series": {
                "2023-10-31": {"close": "46"},
                "2023-11-30": {"close": "50"},
                "2023-12-29": {"close": "55"}
            }}),
        );
        payloads.insert(
            "EARNINGS",
            json!({"quarterly": [
                {"date": "2023-02-15", "eps": "1.0"},
                {"date": "2023-05-15", "eps": "1.1"},
                {"date": "2023-08-15", "eps": "1.2"},
                {"date": "2023-11-15", "eps": "1.3"}
            ]}),
        );
        payloads
    }

    #[test]
    fn test_stage_order() {
        let mut stage = PipelineStage::Init;
        let mut seen = vec![stage];
        while stage != PipelineStage::Done {
            stage.advance();
            seen.push(stage);
        }
        assert_eq!(seen.len(), 7);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(PipelineStage::Done.next(), PipelineStage::Done);
        assert_eq!(PipelineStage::EvaluateRatios.to_string(), "EVALUATE_RATIOS");
    }

    #[test]
    fn test_process_small_catalog() {
        let catalog = small_catalog();
        let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
        let results = process(&payloads(), &FxRate::default(), &window, &catalog).unwrap();

        assert_eq!(results.len(), 5);

        // hidden metric keeps its native quarterly dates
        assert_eq!(results.get("eps").unwrap().len(), 4);

        let axis = vec![d("2023-10-31"), d("2023-11-30"), d("2023-12-29")];
        let pe = results.get("pe").unwrap();
        assert_eq!(pe.dates(), axis);
        assert_eq!(pe.points()[0].value, None);
        assert_relative_eq!(pe.points()[1].value.unwrap(), 50.0 / 4.6, epsilon = 1e-9);
        assert_relative_eq!(pe.points()[2].value.unwrap(), 55.0 / 4.6, epsilon = 1e-9);

        let yield_pct = results.get("earnings_yield").unwrap();
        assert_relative_eq!(yield_pct.points()[1].value.unwrap(), 4.6 / 50.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_price_data_is_fatal() {
        let catalog = small_catalog();
        let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
        let mut payloads = payloads();
        payloads.insert_error("PRICES", "HTTP 500");

        let err = process(&payloads, &FxRate::default(), &window, &catalog).unwrap_err();
        assert!(matches!(err, MetricsError::NoPriceData { ref metric, .. } if metric == "price"));
    }

    #[test]
    fn test_process_is_repeatable() {
        let catalog = small_catalog();
        let pipeline = MetricPipeline::new(&catalog);
        let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
        let fx = FxRate::new(Currency::EUR, Currency::USD, 1.1).unwrap();

        let first = pipeline.process(&payloads(), &fx, &window).unwrap();
        let second = pipeline.process(&payloads(), &fx, &window).unwrap();
        assert_eq!(first, second);
    }
}
