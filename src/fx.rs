//! Currency normalization
//!
//! Fundamentals are often reported in a home currency while the price series
//! is quoted in another. The data source detects the reporting currency,
//! obtains one conversion rate per run and hands it to the pipeline as an
//! [`FxRate`]; every record-based `fxAdjust` metric is multiplied by that single
//! scalar. Time series are taken as reported.
//!
//! # Example
//!
//! ```rust
//! use rusty_metrics::fx::{Currency, FxRate};
//!
//! // 1 EUR = 1.20 USD
//! let fx = FxRate::new(Currency::EUR, Currency::USD, 1.20).unwrap();
//! assert_eq!(fx.convert(200.0), 240.0);
//! assert!(FxRate::new(Currency::EUR, Currency::USD, 0.0).is_err());
//! ```

use crate::catalog::{BALANCE_SHEET, CASH_FLOW, INCOME_STATEMENT};
use crate::error::{MetricsError, Result};
use crate::extract::path::get_nested_value;
use crate::source::RawPayloads;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD, // US Dollar
    EUR, // Euro
    GBP, // British Pound
    JPY, // Japanese Yen
    CHF, // Swiss Franc
    CAD, // Canadian Dollar
    AUD, // Australian Dollar
    NZD, // New Zealand Dollar
    CNY, // Chinese Yuan
    HKD, // Hong Kong Dollar
    SGD, // Singapore Dollar
    KRW, // South Korean Won
    INR, // Indian Rupee
    BRL, // Brazilian Real
    MXN, // Mexican Peso
    ZAR, // South African Rand
    SEK, // Swedish Krona
    DKK, // Danish Krone
    NOK, // Norwegian Krone
    TWD, // New Taiwan Dollar
}

impl Currency {
    /// Get currency code as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CHF => "CHF",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::NZD => "NZD",
            Currency::CNY => "CNY",
            Currency::HKD => "HKD",
            Currency::SGD => "SGD",
            Currency::KRW => "KRW",
            Currency::INR => "INR",
            Currency::BRL => "BRL",
            Currency::MXN => "MXN",
            Currency::ZAR => "ZAR",
            Currency::SEK => "SEK",
            Currency::DKK => "DKK",
            Currency::NOK => "NOK",
            Currency::TWD => "TWD",
        }
    }

    /// All supported currencies
    pub fn all() -> &'static [Currency] {
        &[
            Currency::USD,
            Currency::EUR,
            Currency::GBP,
            Currency::JPY,
            Currency::CHF,
            Currency::CAD,
            Currency::AUD,
            Currency::NZD,
            Currency::CNY,
            Currency::HKD,
            Currency::SGD,
            Currency::KRW,
            Currency::INR,
            Currency::BRL,
            Currency::MXN,
            Currency::ZAR,
            Currency::SEK,
            Currency::DKK,
            Currency::NOK,
            Currency::TWD,
        ]
    }
}

impl FromStr for Currency {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        Currency::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == code)
            .ok_or_else(|| MetricsError::ParseError(format!("Unknown currency: {}", s)))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One conversion rate for a pipeline run: `to_amount = from_amount * rate`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxRate {
    from: Currency,
    to: Currency,
    rate: f64,
}

impl FxRate {
    /// Create a rate; it must be positive and finite
    pub fn new(from: Currency, to: Currency, rate: f64) -> Result<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(MetricsError::InvalidFxRate(rate));
        }
        Ok(Self { from, to, rate })
    }

    /// No conversion
    pub fn identity(currency: Currency) -> Self {
        Self {
            from: currency,
            to: currency,
            rate: 1.0,
        }
    }

    pub fn from(&self) -> Currency {
        self.from
    }

    pub fn to(&self) -> Currency {
        self.to
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_identity(&self) -> bool {
        self.rate == 1.0
    }

    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.rate
    }
}

impl Default for FxRate {
    fn default() -> Self {
        Self::identity(Currency::USD)
    }
}

impl fmt::Display for FxRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "1 {} = {} {}", self.from, self.rate, self.to)
    }
}

/// Reporting currency declared by the fundamentals payloads.
///
/// Reads `reportedCurrency` from the first annual report of the income
/// statement, balance sheet or cash flow payload, in that order.
pub fn detect_reported_currency(payloads: &RawPayloads) -> Option<Currency> {
    for function in [INCOME_STATEMENT, BALANCE_SHEET, CASH_FLOW] {
        let Some(payload) = payloads.get(function) else {
            continue;
        };

        let declared = get_nested_value(payload, &["annualReports", "0", "reportedCurrency"])
            .and_then(|v| v.as_str());

        if let Some(code) = declared {
            match code.parse::<Currency>() {
                Ok(currency) => return Some(currency),
                Err(e) => log::warn!("{} declares {}", function, e),
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_currency_from_str() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::USD);
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::EUR);
        assert_eq!(" gbp ".parse::<Currency>().unwrap(), Currency::GBP);
        assert!("XXX".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_display() {
        assert_eq!(Currency::USD.to_string(), "USD");
        assert_eq!(Currency::TWD.as_str(), "TWD");
    }

    #[test]
    fn test_fx_rate_validation() {
        assert!(FxRate::new(Currency::EUR, Currency::USD, 1.2).is_ok());
        assert!(FxRate::new(Currency::EUR, Currency::USD, 0.0).is_err());
        assert!(FxRate::new(Currency::EUR, Currency::USD, -1.0).is_err());
        assert!(FxRate::new(Currency::EUR, Currency::USD, f64::NAN).is_err());
        assert!(FxRate::new(Currency::EUR, Currency::USD, f64::INFINITY).is_err());
    }

    #[test]
    fn test_fx_conversion() {
        let fx = FxRate::new(Currency::EUR, Currency::USD, 1.2).unwrap();
        assert_eq!(fx.convert(200.0), 240.0);
        assert_eq!(fx.to_string(), "1 EUR = 1.2 USD");
        assert!(!fx.is_identity());

        let same = FxRate::identity(Currency::JPY);
        assert_eq!(same.convert(200.0), 200.0);
        assert!(same.is_identity());
    }

    #[test]
    fn test_detect_reported_currency() {
        let mut payloads = RawPayloads::new();
        payloads.insert_error(INCOME_STATEMENT, "rate limited");
        payloads.insert(
            BALANCE_SHEET,
            json!({"annualReports": [{"fiscalDateEnding": "2023-12-31", "reportedCurrency": "EUR"}]}),
        );

        assert_eq!(detect_reported_currency(&payloads), Some(Currency::EUR));
    }

    #[test]
    fn test_detect_unknown_currency() {
        let mut payloads = RawPayloads::new();
        payloads.insert(
            INCOME_STATEMENT,
            json!({"annualReports": [{"reportedCurrency": "ZZZ"}]}),
        );
        assert_eq!(detect_reported_currency(&payloads), None);
        assert_eq!(detect_reported_currency(&RawPayloads::new()), None);
    }
}
