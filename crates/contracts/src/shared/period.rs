use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Шаг агрегации временного ряда (`agg` в query)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Aggregation {
    #[default]
    Day,
    Month,
    Quarter,
    Year,
}

impl Aggregation {
    pub fn code(&self) -> &'static str {
        match self {
            Aggregation::Day => "DAY",
            Aggregation::Month => "MONTH",
            Aggregation::Quarter => "QUARTER",
            Aggregation::Year => "YEAR",
        }
    }

    pub fn all() -> Vec<Aggregation> {
        vec![
            Aggregation::Day,
            Aggregation::Month,
            Aggregation::Quarter,
            Aggregation::Year,
        ]
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "DAY" => Some(Aggregation::Day),
            "MONTH" => Some(Aggregation::Month),
            "QUARTER" => Some(Aggregation::Quarter),
            "YEAR" => Some(Aggregation::Year),
            _ => None,
        }
    }

    /// First day of the bucket `date` falls into
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        let (year, month, day) = match self {
            Aggregation::Day => return date,
            Aggregation::Month => (date.year(), date.month(), 1),
            Aggregation::Quarter => (date.year(), (date.month() - 1) / 3 * 3 + 1, 1),
            Aggregation::Year => (date.year(), 1, 1),
        };
        // day 1 of an existing month always exists
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
    }
}

/// Parse an ISO date "YYYY-MM-DD"
pub fn parse_iso_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

/// Query для временного ряда: `start`, `end` (включительно), `agg`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesRequest {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub agg: Aggregation,
}

/// Точка временного ряда; `period` = начало интервала "YYYY-MM-DD"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartResponse {
    #[serde(default)]
    pub points: Vec<TimeSeriesPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_bucket_start() {
        let d = date("2024-05-17");
        assert_eq!(Aggregation::Day.bucket_start(d), d);
        assert_eq!(Aggregation::Month.bucket_start(d), date("2024-05-01"));
        assert_eq!(Aggregation::Quarter.bucket_start(d), date("2024-04-01"));
        assert_eq!(Aggregation::Year.bucket_start(d), date("2024-01-01"));
        assert_eq!(Aggregation::Quarter.bucket_start(date("2024-12-31")), date("2024-10-01"));
        assert_eq!(Aggregation::Quarter.bucket_start(date("2024-03-01")), date("2024-01-01"));
    }

    #[test]
    fn test_agg_wire_format() {
        let req: TimeSeriesRequest =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-12-31","agg":"QUARTER"}"#)
                .unwrap();
        assert_eq!(req.agg, Aggregation::Quarter);
        assert_eq!(Aggregation::from_code("month"), Some(Aggregation::Month));
        assert_eq!(Aggregation::from_code("WEEK"), None);
    }

    #[test]
    fn test_parse_iso_date_rejects_other_formats() {
        assert!(parse_iso_date("15.03.2024").is_err());
        assert!(parse_iso_date("2024-02-30").is_err());
        assert!(parse_iso_date(" 2024-02-29 ").is_ok());
    }
}
