//! Built-in catalog for Alpha Vantage style payloads

use super::descriptor::MetricDescriptor;

/// Monthly adjusted price series function
pub const TIME_SERIES_MONTHLY_ADJUSTED: &str = "TIME_SERIES_MONTHLY_ADJUSTED";
pub const INCOME_STATEMENT: &str = "INCOME_STATEMENT";
pub const BALANCE_SHEET: &str = "BALANCE_SHEET";
pub const CASH_FLOW: &str = "CASH_FLOW";
pub const EARNINGS: &str = "EARNINGS";

/// Id of the price series every plottable metric is aligned to
pub const PRICE_METRIC: &str = "price";

const FISCAL_DATE: &str = "fiscalDateEnding";

pub(crate) fn alpha_vantage_metrics() -> Vec<MetricDescriptor> {
    vec![
        MetricDescriptor::time_series(
            PRICE_METRIC,
            "Share Price (Adjusted Close)",
            TIME_SERIES_MONTHLY_ADJUSTED,
            &["Monthly Adjusted Time Series", "5. adjusted close"],
        ),
        // Earnings
        MetricDescriptor::fundamental(
            "eps_quarterly",
            "Reported EPS (Quarterly)",
            EARNINGS,
            &["quarterlyEarnings", "reportedEPS"],
            vec!["reportedDate", FISCAL_DATE],
        )
        .fx_adjusted()
        .hidden(),
        MetricDescriptor::ttm("eps_ttm", "EPS (TTM)", "eps_quarterly"),
        // Income statement
        MetricDescriptor::fundamental(
            "revenue",
            "Revenue (Annual)",
            INCOME_STATEMENT,
            &["annualReports", "totalRevenue"],
            FISCAL_DATE,
        )
        .fx_adjusted(),
        MetricDescriptor::fundamental(
            "revenue_quarterly",
            "Revenue (Quarterly)",
            INCOME_STATEMENT,
            &["quarterlyReports", "totalRevenue"],
            FISCAL_DATE,
        )
        .fx_adjusted()
        .hidden(),
        MetricDescriptor::ttm("revenue_ttm", "Revenue (TTM)", "revenue_quarterly"),
        MetricDescriptor::fundamental(
            "net_income",
            "Net Income (Annual)",
            INCOME_STATEMENT,
            &["annualReports", "netIncome"],
            FISCAL_DATE,
        )
        .fx_adjusted(),
        // Balance sheet
        MetricDescriptor::fundamental(
            "total_equity",
            "Total Shareholder Equity",
            BALANCE_SHEET,
            &["annualReports", "totalShareholderEquity"],
            FISCAL_DATE,
        )
        .fx_adjusted(),
        MetricDescriptor::fundamental(
            "shares_outstanding",
            "Shares Outstanding",
            BALANCE_SHEET,
            &["annualReports", "commonStockSharesOutstanding"],
            FISCAL_DATE,
        ),
        // Cash flow
        MetricDescriptor::fundamental(
            "operating_cashflow",
            "Operating Cash Flow",
            CASH_FLOW,
            &["annualReports", "operatingCashflow"],
            FISCAL_DATE,
        )
        .fx_adjusted(),
        MetricDescriptor::fundamental(
            "capital_expenditures",
            "Capital Expenditures",
            CASH_FLOW,
            &["annualReports", "capitalExpenditures"],
            FISCAL_DATE,
        )
        .fx_adjusted(),
        // Year-matched combinations
        MetricDescriptor::custom(
            "free_cash_flow",
            "Free Cash Flow",
            "operating_cashflow - capital_expenditures",
        ),
        MetricDescriptor::custom(
            "book_value_per_share",
            "Book Value per Share",
            "total_equity / shares_outstanding",
        ),
        MetricDescriptor::custom(
            "sales_per_share",
            "Sales per Share",
            "revenue / shares_outstanding",
        ),
        // Ratios on the price calendar
        MetricDescriptor::ratio("pe_ratio", "P/E Ratio (TTM)", "price / eps_ttm"),
        MetricDescriptor::ratio("pb_ratio", "P/B Ratio", "price / book_value_per_share"),
        MetricDescriptor::ratio("ps_ratio", "P/S Ratio", "price / sales_per_share"),
        MetricDescriptor::ratio("net_margin", "Net Margin (%)", "net_income / revenue * 100"),
        MetricDescriptor::ratio(
            "fcf_yield",
            "Free Cash Flow Yield (%)",
            "free_cash_flow / shares_outstanding / price * 100",
        ),
    ]
}
