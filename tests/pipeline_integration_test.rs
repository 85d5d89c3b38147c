//! End-to-end tests for the metric pipeline with the built-in catalog

use approx::assert_relative_eq;
use chrono::NaiveDate;
use rusty_metrics::catalog::{
    MetricCatalog, BALANCE_SHEET, CASH_FLOW, EARNINGS, INCOME_STATEMENT,
    TIME_SERIES_MONTHLY_ADJUSTED,
};
use rusty_metrics::error::MetricsError;
use rusty_metrics::fx::{detect_reported_currency, Currency, FxRate};
use rusty_metrics::pipeline::{process, MetricPipeline};
use rusty_metrics::source::RawPayloads;
use rusty_metrics::types::{DateWindow, MetricResultMap, Series};
use serde_json::{json, Value};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn window() -> DateWindow {
    DateWindow::parse("2023-01-01", "2024-02-29").unwrap()
}

fn price_axis() -> Vec<NaiveDate> {
    vec![
        d("2023-06-30"),
        d("2023-09-29"),
        d("2023-12-29"),
        d("2024-01-31"),
        d("2024-02-29"),
    ]
}

fn payloads() -> RawPayloads {
    let mut payloads = RawPayloads::new();
    payloads.insert(
        TIME_SERIES_MONTHLY_ADJUSTED,
        json!({
            "Meta Data": {"2. Symbol": "TEST"},
            "Monthly Adjusted Time Series": {
                "2022-12-30": {"5. adjusted close": "95.0"},
                "2023-06-30": {"5. adjusted close": "100.0"},
                "2023-09-29": {"5. adjusted close": "110.0"},
                "2023-12-29": {"5. adjusted close": "120.0"},
                "2024-01-31": {"5. adjusted close": "130.0"},
                "2024-02-29": {"5. adjusted close": "140.0"}
            }
        }),
    );
    payloads.insert(
        EARNINGS,
        json!({
            "symbol": "TEST",
            "quarterlyEarnings": [
                {"fiscalDateEnding": "2023-12-31", "reportedDate": "2024-01-25", "reportedEPS": "1.4"},
                {"fiscalDateEnding": "2023-09-30", "reportedDate": "2023-10-25", "reportedEPS": "1.3"},
                {"fiscalDateEnding": "2023-06-30", "reportedDate": "2023-07-25", "reportedEPS": "1.2"},
                {"fiscalDateEnding": "2023-03-31", "reportedDate": "2023-04-25", "reportedEPS": "1.1"},
                {"fiscalDateEnding": "2022-12-31", "reportedDate": "2023-01-25", "reportedEPS": "1.0"},
                {"fiscalDateEnding": "2022-09-30", "reportedDate": "2022-10-25", "reportedEPS": "0.9"}
            ]
        }),
    );
    payloads.insert(
        INCOME_STATEMENT,
        json!({
            "symbol": "TEST",
            "annualReports": [
                {"fiscalDateEnding": "2023-12-31", "reportedCurrency": "EUR", "totalRevenue": "1000", "netIncome": "100"},
                {"fiscalDateEnding": "2022-12-31", "reportedCurrency": "EUR", "totalRevenue": "900", "netIncome": "80"}
            ],
            "quarterlyReports": []
        }),
    );
    payloads.insert(
        BALANCE_SHEET,
        json!({
            "annualReports": [
                {"fiscalDateEnding": "2023-12-31", "totalShareholderEquity": "2000", "commonStockSharesOutstanding": "100"}
            ]
        }),
    );
    payloads.insert(
        CASH_FLOW,
        json!({
            "annualReports": [
                {"fiscalDateEnding": "2023-12-31", "operatingCashflow": "500", "capitalExpenditures": "100"}
            ]
        }),
    );
    payloads
}

fn run(payloads: &RawPayloads, fx: &FxRate) -> MetricResultMap {
    let catalog = MetricCatalog::alpha_vantage();
    process(payloads, fx, &window(), &catalog).unwrap()
}

fn values(series: &Series) -> Vec<Option<f64>> {
    series.iter().map(|p| p.value).collect()
}

#[test]
fn test_every_catalog_metric_in_output() {
    let catalog = MetricCatalog::alpha_vantage();
    let results = run(&payloads(), &FxRate::default());

    assert_eq!(results.len(), catalog.len());
    for metric in catalog.iter() {
        assert!(results.contains(&metric.id), "missing {}", metric.id);
    }
}

#[test]
fn test_price_defines_the_axis() {
    let results = run(&payloads(), &FxRate::default());

    let price = results.get("price").unwrap();
    assert_eq!(price.dates(), price_axis());
    assert_eq!(price.value_on(d("2023-06-30")), Some(100.0));

    for id in ["revenue", "pe_ratio", "pb_ratio", "free_cash_flow", "revenue_ttm"] {
        assert_eq!(results.get(id).unwrap().dates(), price_axis(), "{}", id);
    }
}

#[test]
fn test_hidden_metrics_keep_native_dates() {
    let results = run(&payloads(), &FxRate::default());

    let eps = results.get("eps_quarterly").unwrap();
    assert_eq!(
        eps.dates(),
        vec![
            d("2023-01-25"),
            d("2023-04-25"),
            d("2023-07-25"),
            d("2023-10-25"),
            d("2024-01-25"),
        ]
    );

    // no quarterly reports in the income statement
    assert!(results.get("revenue_quarterly").unwrap().is_empty());
    assert_eq!(results.get("revenue_ttm").unwrap().count_values(), 0);
}

#[test]
fn test_pe_ratio_from_ttm_eps() {
    let results = run(&payloads(), &FxRate::default());

    let pe = values(results.get("pe_ratio").unwrap());
    assert_eq!(pe[0], None);
    assert_eq!(pe[1], None);
    assert_relative_eq!(pe[2].unwrap(), 120.0 / 4.6, epsilon = 1e-9);
    assert_relative_eq!(pe[3].unwrap(), 26.0, epsilon = 1e-9);
    assert_relative_eq!(pe[4].unwrap(), 28.0, epsilon = 1e-9);
}

#[test]
fn test_custom_metrics_and_dependent_ratios() {
    let results = run(&payloads(), &FxRate::default());

    let bvps = values(results.get("book_value_per_share").unwrap());
    assert_eq!(&bvps[..3], &[None, None, None]);
    assert_eq!(bvps[3], Some(20.0));

    let fcf = results.get("free_cash_flow").unwrap();
    assert_eq!(fcf.value_on(d("2024-02-29")), Some(400.0));

    let pb = values(results.get("pb_ratio").unwrap());
    assert_relative_eq!(pb[3].unwrap(), 6.5, epsilon = 1e-9);
    assert_relative_eq!(pb[4].unwrap(), 7.0, epsilon = 1e-9);

    let ps = results.get("ps_ratio").unwrap();
    assert_relative_eq!(ps.value_on(d("2024-01-31")).unwrap(), 13.0, epsilon = 1e-9);

    let margin = values(results.get("net_margin").unwrap());
    assert_eq!(margin[2], None);
    assert_relative_eq!(margin[3].unwrap(), 10.0, epsilon = 1e-9);

    let fcf_yield = results.get("fcf_yield").unwrap();
    assert_relative_eq!(
        fcf_yield.value_on(d("2024-01-31")).unwrap(),
        400.0 / 100.0 / 130.0 * 100.0,
        epsilon = 1e-9
    );
}

#[test]
fn test_fx_applies_to_fundamentals_only() {
    let payloads = payloads();
    assert_eq!(detect_reported_currency(&payloads), Some(Currency::EUR));

    let fx = FxRate::new(Currency::EUR, Currency::USD, 1.2).unwrap();
    let results = run(&payloads, &fx);

    assert_eq!(results.get("price").unwrap().value_on(d("2024-01-31")), Some(130.0));
    assert_relative_eq!(
        results.get("revenue").unwrap().value_on(d("2024-01-31")).unwrap(),
        1200.0,
        epsilon = 1e-9
    );
    // share counts are not a currency amount
    assert_eq!(
        results.get("shares_outstanding").unwrap().value_on(d("2024-01-31")),
        Some(100.0)
    );
    assert_relative_eq!(
        results.get("eps_quarterly").unwrap().value_on(d("2023-10-25")).unwrap(),
        1.56,
        epsilon = 1e-9
    );
    // ratios of two converted amounts are unaffected
    assert_relative_eq!(
        results.get("net_margin").unwrap().value_on(d("2024-01-31")).unwrap(),
        10.0,
        epsilon = 1e-9
    );
}

#[test]
fn test_failed_sources_degrade() {
    let mut payloads = payloads();
    payloads.insert_error(INCOME_STATEMENT, "HTTP 503");
    payloads.insert_response(CASH_FLOW, json!({"Note": "API call frequency exceeded"}));

    let results = run(&payloads, &FxRate::default());

    assert_eq!(results.get("revenue").unwrap().count_values(), 0);
    assert_eq!(results.get("net_margin").unwrap().count_values(), 0);
    assert_eq!(results.get("free_cash_flow").unwrap().count_values(), 0);
    assert!(results.get("pe_ratio").unwrap().count_values() > 0);
}

#[test]
fn test_missing_price_is_fatal() {
    let catalog = MetricCatalog::alpha_vantage();
    let mut payloads = payloads();
    payloads.insert_error(TIME_SERIES_MONTHLY_ADJUSTED, "invalid symbol");

    let err = process(&payloads, &FxRate::default(), &window(), &catalog).unwrap_err();
    match err {
        MetricsError::NoPriceData { metric, start, end } => {
            assert_eq!(metric, "price");
            assert_eq!(start, d("2023-01-01"));
            assert_eq!(end, d("2024-02-29"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_price_outside_window_is_fatal() {
    let catalog = MetricCatalog::alpha_vantage();
    let early = DateWindow::parse("2010-01-01", "2010-12-31").unwrap();

    let result = process(&payloads(), &FxRate::default(), &early, &catalog);
    assert!(matches!(result, Err(MetricsError::NoPriceData { .. })));
}

#[test]
fn test_output_json_shape() {
    let results = run(&payloads(), &FxRate::default());
    let json: Value = serde_json::from_str(&results.to_json_pretty().unwrap()).unwrap();

    let pe = json["pe_ratio"].as_array().unwrap();
    assert_eq!(pe.len(), 5);
    assert_eq!(pe[0], json!({"date": "2023-06-30", "value": null}));
    assert_eq!(pe[3], json!({"date": "2024-01-31", "value": 26.0}));
}

#[test]
fn test_pipeline_shared_across_threads() {
    let catalog = MetricCatalog::alpha_vantage();
    let expected = run(&payloads(), &FxRate::default());

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    MetricPipeline::new(&catalog)
                        .process(&payloads(), &FxRate::default(), &window())
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
