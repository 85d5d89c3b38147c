//! Nested field access and date resolution over arbitrary JSON shapes

use crate::catalog::DateKeys;
use crate::types::parse_date;
use chrono::NaiveDate;
use serde_json::Value;

/// Walk `root` along `path`.
///
/// Object segments are looked up by key; array segments must be a decimal
/// index. Returns `None` as soon as a segment is absent or `root` is null.
pub fn get_nested_value<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    if root.is_null() {
        return None;
    }

    let mut current = root;
    for segment in path {
        let key = segment.as_ref();
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// First candidate key on `item` holding a usable calendar date.
///
/// Empty strings and the provider's `"None"` placeholder are skipped; key
/// order decides ties.
pub fn find_valid_date(item: &Value, keys: &DateKeys) -> Option<NaiveDate> {
    keys.keys().into_iter().find_map(|key| {
        let raw = item.get(key)?.as_str()?.trim();
        if raw.is_empty() || raw == "None" {
            return None;
        }
        parse_date(raw)
    })
}

/// Numeric reading of a payload field with `parseFloat` semantics.
///
/// Strings contribute their longest leading decimal literal (`"12.5B"` is
/// 12.5); anything without one, or that is not finite, is `None`.
pub fn parse_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => parse_float_prefix(s)?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn parse_float_prefix(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested_value() {
        let doc = json!({
            "annualReports": [
                {"fiscalDateEnding": "2023-12-31", "totalRevenue": "1000"}
            ],
            "meta": {"symbol": "IBM"}
        });

        assert_eq!(
            get_nested_value(&doc, &["meta", "symbol"]),
            Some(&json!("IBM"))
        );
        assert_eq!(
            get_nested_value(&doc, &["annualReports", "0", "totalRevenue"]),
            Some(&json!("1000"))
        );
        assert_eq!(get_nested_value(&doc, &["annualReports", "1"]), None);
        assert_eq!(get_nested_value(&doc, &["annualReports", "x"]), None);
        assert_eq!(get_nested_value(&doc, &["meta", "symbol", "deeper"]), None);
        assert_eq!(get_nested_value(&doc, &["missing", "symbol"]), None);

        let empty: [&str; 0] = [];
        assert_eq!(get_nested_value(&doc, &empty), Some(&doc));
        assert_eq!(get_nested_value(&Value::Null, &empty), None);
    }

    #[test]
    fn test_find_valid_date_order_and_placeholders() {
        let keys = DateKeys::from(vec!["reportedDate", "fiscalDateEnding"]);

        let item = json!({"reportedDate": "2024-01-25", "fiscalDateEnding": "2023-12-31"});
        assert_eq!(find_valid_date(&item, &keys), NaiveDate::from_ymd_opt(2024, 1, 25));

        let placeholder = json!({"reportedDate": "None", "fiscalDateEnding": "2023-12-31"});
        assert_eq!(
            find_valid_date(&placeholder, &keys),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );

        let blank = json!({"reportedDate": "  ", "fiscalDateEnding": "garbage"});
        assert_eq!(find_valid_date(&blank, &keys), None);

        let not_string = json!({"reportedDate": 20240125});
        assert_eq!(find_valid_date(&not_string, &keys), None);
    }

    #[test]
    fn test_parse_numeric_like_parse_float() {
        assert_eq!(parse_numeric(&json!("200")), Some(200.0));
        assert_eq!(parse_numeric(&json!(" -1.5e3")), Some(-1500.0));
        assert_eq!(parse_numeric(&json!("12.5B")), Some(12.5));
        assert_eq!(parse_numeric(&json!(".5")), Some(0.5));
        assert_eq!(parse_numeric(&json!("7.")), Some(7.0));
        assert_eq!(parse_numeric(&json!("3e")), Some(3.0));
        assert_eq!(parse_numeric(&json!(42)), Some(42.0));

        assert_eq!(parse_numeric(&json!("None")), None);
        assert_eq!(parse_numeric(&json!("")), None);
        assert_eq!(parse_numeric(&json!("-")), None);
        assert_eq!(parse_numeric(&json!(".")), None);
        assert_eq!(parse_numeric(&json!("1e999")), None);
        assert_eq!(parse_numeric(&Value::Null), None);
        assert_eq!(parse_numeric(&json!(true)), None);
        assert_eq!(parse_numeric(&json!({"v": 1})), None);
    }
}
