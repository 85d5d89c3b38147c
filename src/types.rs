//! Core types: series, date windows and the pipeline result map

use crate::error::{MetricsError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metric identifier as declared in the catalog
pub type MetricId = String;

/// Working set of series keyed by metric id
pub type SeriesMap = HashMap<MetricId, Series>;

/// Canonical serialized date format (`YYYY-MM-DD`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar date from a provider string.
///
/// Accepts plain `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DD HH:MM:SS`.
/// Surrounding whitespace is ignored.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

/// A single dated observation; `None` marks an unavailable value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }

    /// Point carrying a known value
    pub fn with_value(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value: Some(value),
        }
    }

    /// Point with no value for its date
    pub fn null(date: NaiveDate) -> Self {
        Self { date, value: None }
    }
}

/// Date-ordered sequence of points with unique dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    /// Create an empty series
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Build a series from points in any order; the result is sorted by date
    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        let mut series = Self { points };
        series.sort_by_date();
        series
    }

    /// Build from `(date, value)` pairs
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::from_points(
            values
                .into_iter()
                .map(|(date, value)| SeriesPoint::with_value(date, value))
                .collect(),
        )
    }

    /// Append a point; callers appending out of order must re-sort
    pub fn push(&mut self, point: SeriesPoint) {
        self.points.push(point);
    }

    /// Stable ascending sort by date
    pub fn sort_by_date(&mut self) {
        self.points.sort_by_key(|p| p.date);
    }

    pub fn is_sorted(&self) -> bool {
        self.points.windows(2).all(|w| w[0].date <= w[1].date)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SeriesPoint> {
        self.points.iter()
    }

    pub fn into_points(self) -> Vec<SeriesPoint> {
        self.points
    }

    /// All dates, in series order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Value recorded for exactly `date`, if any.
    ///
    /// Series built with [`Series::push`] may be out of order; those are
    /// scanned instead of bisected.
    pub fn value_on(&self, date: NaiveDate) -> Option<f64> {
        if !self.is_sorted() {
            return self.points.iter().find(|p| p.date == date).and_then(|p| p.value);
        }
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .and_then(|idx| self.points[idx].value)
    }

    /// Date -> value lookup table
    pub fn lookup(&self) -> HashMap<NaiveDate, Option<f64>> {
        self.points.iter().map(|p| (p.date, p.value)).collect()
    }

    /// Number of points carrying a value
    pub fn count_values(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }
}

impl FromIterator<SeriesPoint> for Series {
    fn from_iter<T: IntoIterator<Item = SeriesPoint>>(iter: T) -> Self {
        Self::from_points(iter.into_iter().collect())
    }
}

impl IntoIterator for Series {
    type Item = SeriesPoint;
    type IntoIter = std::vec::IntoIter<SeriesPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a SeriesPoint;
    type IntoIter = std::slice::Iter<'a, SeriesPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Inclusive date window for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(MetricsError::InvalidDateWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
                .map_err(|e| MetricsError::ParseError(format!("Invalid date '{}': {}", s, e)))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Final pipeline output: metric id -> series
///
/// Ordered by id so serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricResultMap {
    series: BTreeMap<MetricId, Series>,
}

impl MetricResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<MetricId>, series: Series) -> Option<Series> {
        self.series.insert(id.into(), series)
    }

    pub fn get(&self, id: &str) -> Option<&Series> {
        self.series.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.series.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Series)> {
        self.series.iter().map(|(id, s)| (id.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<MetricId, Series> {
        self.series
    }

    /// Pretty JSON for the presentation layer
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2023-12-31"), Some(d("2023-12-31")));
        assert_eq!(parse_date("  2023-12-31 "), Some(d("2023-12-31")));
        assert_eq!(parse_date("2023-12-31T10:00:00Z"), Some(d("2023-12-31")));
        assert_eq!(parse_date("2023-12-31 16:00:00"), Some(d("2023-12-31")));
        assert_eq!(parse_date("None"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2023-02-30"), None);
    }

    #[test]
    fn test_series_sorted_on_construction() {
        let series = Series::from_values(vec![
            (d("2023-03-31"), 3.0),
            (d("2023-01-31"), 1.0),
            (d("2023-02-28"), 2.0),
        ]);

        assert!(series.is_sorted());
        assert_eq!(series.first_date(), Some(d("2023-01-31")));
        assert_eq!(series.last_date(), Some(d("2023-03-31")));
        assert_eq!(series.value_on(d("2023-02-28")), Some(2.0));
        assert_eq!(series.value_on(d("2023-02-27")), None);
    }

    #[test]
    fn test_value_on_pushed_out_of_order() {
        let mut series = Series::new();
        series.push(SeriesPoint::with_value(d("2023-03-31"), 3.0));
        series.push(SeriesPoint::with_value(d("2023-01-31"), 1.0));
        series.push(SeriesPoint::null(d("2023-04-28")));
        series.push(SeriesPoint::with_value(d("2023-02-28"), 2.0));

        assert!(!series.is_sorted());
        assert_eq!(series.value_on(d("2023-01-31")), Some(1.0));
        assert_eq!(series.value_on(d("2023-02-28")), Some(2.0));
        assert_eq!(series.value_on(d("2023-03-31")), Some(3.0));
        assert_eq!(series.value_on(d("2023-04-28")), None);
        assert_eq!(series.value_on(d("2023-05-31")), None);
    }

    #[test]
    fn test_series_serializes_as_point_list() {
        let series = Series::from_points(vec![
            SeriesPoint::with_value(d("2024-01-31"), 1.5),
            SeriesPoint::null(d("2024-02-29")),
        ]);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(
            json,
            r#"[{"date":"2024-01-31","value":1.5},{"date":"2024-02-29","value":null}]"#
        );
    }

    #[test]
    fn test_date_window() {
        let window = DateWindow::parse("2020-01-01", "2020-12-31").unwrap();
        assert!(window.contains(d("2020-01-01")));
        assert!(window.contains(d("2020-12-31")));
        assert!(!window.contains(d("2021-01-01")));

        assert!(DateWindow::parse("2021-01-01", "2020-01-01").is_err());
        assert!(DateWindow::parse("2021-13-01", "2022-01-01").is_err());
    }

    #[test]
    fn test_result_map_ordering() {
        let mut map = MetricResultMap::new();
        map.insert("price", Series::new());
        map.insert("eps", Series::new());

        let ids: Vec<&str> = map.ids().collect();
        assert_eq!(ids, vec!["eps", "price"]);
        assert!(map.to_json_pretty().unwrap().contains("\"eps\""));
    }
}
