//! Parameter coercion shared by the built-in evaluators.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;

use crate::error::{FlagError, Result};
use crate::model::{fold_case, ParamValue};

/// Coerces a rollout percentage to a signed integer.
///
/// Integers pass through, floats round half to even, strings are parsed as an
/// integer or else a float. Anything else is a configuration error.
pub fn coerce_percentage(value: &ParamValue) -> Result<i64> {
    match value {
        ParamValue::Int(i) => Ok(*i),
        ParamValue::Float(f) => round_float(*f),
        ParamValue::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(i);
            }
            match trimmed.parse::<f64>() {
                Ok(f) => round_float(f),
                Err(_) => Err(FlagError::invalid_parameter(format!(
                    "Percentage '{}' is not numeric",
                    s
                ))),
            }
        }
        other => Err(FlagError::invalid_parameter(format!(
            "Percentage must be a number or numeric string, found {}",
            other.kind()
        ))),
    }
}

fn round_float(f: f64) -> Result<i64> {
    if !f.is_finite() {
        return Err(FlagError::invalid_parameter(format!(
            "Percentage {} is not a finite number",
            f
        )));
    }
    // saturating cast
    Ok(f.round_ties_even() as i64)
}

/// Parses a schedule bound.
pub fn parse_timestamp(value: &ParamValue) -> Result<DateTime<Utc>> {
    match value {
        ParamValue::String(s) => parse_iso8601(s),
        other => Err(FlagError::parse_error(format!(
            "Timestamp must be an ISO-8601 string, found {}",
            other.kind()
        ))),
    }
}

/// Parses an ISO-8601 timestamp.
///
/// Accepts RFC 3339 with an offset, a date-time without offset (read as UTC),
/// or a bare date (midnight UTC).
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(FlagError::parse_error(format!(
        "'{}' is not a valid ISO-8601 timestamp",
        s
    )))
}

/// Builds a case-folded set from the string forms of a list's elements.
///
/// Nulls and objects are skipped.
pub fn case_insensitive_set(items: &[ParamValue]) -> HashSet<String> {
    items
        .iter()
        .filter(|item| !item.is_null() && item.as_object().is_none())
        .map(|item| fold_case(&item.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_coerce_integer_and_float() {
        assert_eq!(coerce_percentage(&ParamValue::Int(30)).unwrap(), 30);
        assert_eq!(coerce_percentage(&ParamValue::Float(49.6)).unwrap(), 50);
        assert_eq!(coerce_percentage(&ParamValue::Float(12.5)).unwrap(), 12);
        assert_eq!(coerce_percentage(&ParamValue::Float(13.5)).unwrap(), 14);
        assert_eq!(coerce_percentage(&ParamValue::Int(-5)).unwrap(), -5);
    }

    #[test]
    fn test_coerce_numeric_strings() {
        assert_eq!(coerce_percentage(&ParamValue::from("25")).unwrap(), 25);
        assert_eq!(coerce_percentage(&ParamValue::from(" 40 ")).unwrap(), 40);
        assert_eq!(coerce_percentage(&ParamValue::from("33.3")).unwrap(), 33);
    }

    #[test]
    fn test_coerce_rejects_non_numeric() {
        assert!(coerce_percentage(&ParamValue::from("half")).is_err());
        assert!(coerce_percentage(&ParamValue::Bool(true)).is_err());
        assert!(coerce_percentage(&ParamValue::from(vec![10])).is_err());
        assert!(coerce_percentage(&ParamValue::Float(f64::NAN)).is_err());
        assert!(coerce_percentage(&ParamValue::from("inf")).is_err());
        let object = serde_json::from_str::<ParamValue>(r#"{"value":10}"#).unwrap();
        assert!(coerce_percentage(&object).is_err());
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let parsed = parse_iso8601("2025-03-01T10:00:00+01:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        let zulu = parse_iso8601("2025-03-01T10:00:00.250Z").unwrap();
        assert_eq!(zulu.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_without_offset_is_utc() {
        let parsed = parse_iso8601("2025-03-01T10:00:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        let spaced = parse_iso8601("2025-03-01 10:00:00").unwrap();
        assert_eq!(spaced, parsed);
    }

    #[test]
    fn test_parse_bare_date() {
        let parsed = parse_iso8601("2025-12-24").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 12, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_iso8601("next tuesday").unwrap_err();
        assert_eq!(err.error_type, crate::error::ErrorType::ParseError);
        assert!(parse_timestamp(&ParamValue::Null).is_err());
        assert!(parse_timestamp(&ParamValue::Int(1_700_000_000)).is_err());
    }

    #[test]
    fn test_case_insensitive_set() {
        let set = case_insensitive_set(&[
            ParamValue::from("Alice"),
            ParamValue::from(42),
            ParamValue::Null,
            serde_json::from_str::<ParamValue>(r#"{"id":"alice"}"#).unwrap(),
        ]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("alice"));
        assert!(set.contains("42"));
    }
}
