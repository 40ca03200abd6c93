//! Coercion and validation of primitive TOSCA values.
//!
//! Each rule returns the coerced value or the issue describing why the value
//! is not of the requested kind. Callers decide where the issue goes.

use crate::issues::{IssueCode, ValidationIssue};
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Literal marking an open end of a range.
pub const UNBOUNDED: &str = "UNBOUNDED";

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:(?:[Tt]|[ \t]+)(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d*))?(?:[ \t]*(Z|z|[-+]\d{1,2}(?::?\d{2})?))?)?$",
    )
    .expect("BUG: timestamp regex must compile")
});

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+(\.[0-9]+(\.[0-9A-Za-z]+(-[0-9]+)?)?)?)?$")
        .expect("BUG: version regex must compile")
});

fn invalid(code: IssueCode, value: &Value, what: &str) -> ValidationIssue {
    ValidationIssue::new(code, format!("\"{}\" is not {}.", value, what))
}

/// String-to-double coercion used for numeric comparisons.
pub fn str_to_num(value: &Value) -> Option<f64> {
    match value {
        Value::Int(_) | Value::Float(_) => value.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn validate_numeric(value: &Value) -> Result<f64, ValidationIssue> {
    value
        .as_f64()
        .ok_or_else(|| invalid(IssueCode::InvalidValue, value, "a numeric"))
}

/// Integers, and strings holding an integer literal.
pub fn validate_integer(value: &Value) -> Result<i64, ValidationIssue> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(IssueCode::InvalidValue, value, "an integer")),
        _ => Err(invalid(IssueCode::InvalidValue, value, "an integer")),
    }
}

/// Floats; integers are widened.
pub fn validate_float(value: &Value) -> Result<f64, ValidationIssue> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        _ => Err(invalid(IssueCode::InvalidValue, value, "a float")),
    }
}

pub fn validate_string(value: &Value) -> Result<&str, ValidationIssue> {
    value
        .as_str()
        .ok_or_else(|| invalid(IssueCode::InvalidValue, value, "a string"))
}

pub fn validate_list(value: &Value) -> Result<&[Value], ValidationIssue> {
    value
        .as_list()
        .ok_or_else(|| invalid(IssueCode::InvalidValue, value, "a list"))
}

pub fn validate_map(value: &Value) -> Result<&BTreeMap<String, Value>, ValidationIssue> {
    value
        .as_map()
        .ok_or_else(|| invalid(IssueCode::InvalidValue, value, "a map"))
}

/// Booleans, and the strings `true`/`false` in any case.
pub fn validate_boolean(value: &Value) -> Result<bool, ValidationIssue> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(invalid(IssueCode::InvalidValue, value, "a boolean")),
    }
}

/// Parses YAML 1.1 timestamps: a bare date, or date and time with optional
/// fraction and offset. Missing offsets mean UTC.
pub fn validate_timestamp(value: &Value) -> Result<DateTime<FixedOffset>, ValidationIssue> {
    let err = || invalid(IssueCode::InvalidTimestamp, value, "a valid timestamp");
    let text = value.as_str().ok_or_else(err)?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt);
    }
    let caps = TIMESTAMP_RE.captures(text).ok_or_else(err)?;
    let num = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };

    let year: i32 = caps[1].parse().map_err(|_| err())?;
    let date = NaiveDate::from_ymd_opt(year, num(2).ok_or_else(err)?, num(3).ok_or_else(err)?)
        .ok_or_else(err)?;
    let time = match caps.get(4) {
        None => NaiveTime::from_hms_opt(0, 0, 0).ok_or_else(err)?,
        Some(_) => {
            let nanos = caps
                .get(7)
                .map(|m| fraction_to_nanos(m.as_str()))
                .unwrap_or(0);
            NaiveTime::from_hms_nano_opt(
                num(4).ok_or_else(err)?,
                num(5).ok_or_else(err)?,
                num(6).ok_or_else(err)?,
                nanos,
            )
            .ok_or_else(err)?
        }
    };
    let offset = match caps.get(8) {
        None => 0,
        Some(m) => parse_offset(m.as_str()).ok_or_else(err)?,
    };
    let tz = FixedOffset::east_opt(offset).ok_or_else(err)?;
    tz.from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .ok_or_else(err)
}

fn fraction_to_nanos(digits: &str) -> u32 {
    let mut padded: String = digits.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded.parse().unwrap_or(0)
}

/// Offset in seconds east of UTC for `Z`, `+5`, `-05:30`, `+0530`.
fn parse_offset(text: &str) -> Option<i32> {
    if text.eq_ignore_ascii_case("z") {
        return Some(0);
    }
    let sign = if text.starts_with('-') { -1 } else { 1 };
    let digits = text[1..].replace(':', "");
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        3 | 4 => {
            let split = digits.len() - 2;
            (digits[..split].parse().ok()?, digits[split..].parse().ok()?)
        }
        _ => return None,
    };
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Validates a TOSCA `range`: two integers, the upper one optionally
/// `UNBOUNDED`, with min <= max. Returns `(min, max)` where `None` is unbounded.
pub fn validate_range(value: &Value) -> Result<(i64, Option<i64>), ValidationIssue> {
    let err = |reason: &str| {
        ValidationIssue::new(
            IssueCode::InvalidRange,
            format!("\"{}\" is not a valid range: {}.", value, reason),
        )
    };
    let items = value.as_list().ok_or_else(|| err("expected a list of two items"))?;
    if items.len() != 2 {
        return Err(err("expected a list of two items"));
    }
    let min = items[0]
        .as_i64()
        .ok_or_else(|| err("the lower bound must be an integer"))?;
    let max = match &items[1] {
        Value::Int(i) => Some(*i),
        Value::String(s) if s == UNBOUNDED => None,
        _ => return Err(err("the upper bound must be an integer or \"UNBOUNDED\"")),
    };
    if let Some(max) = max {
        if min > max {
            return Err(err("the lower bound is greater than the upper bound"));
        }
    }
    Ok((min, max))
}

/// TOSCA version strings: `major[.minor[.fix[.qualifier[-build]]]]`.
pub fn validate_version(value: &Value) -> Result<String, ValidationIssue> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Int(_) | Value::Float(_) => value.to_string(),
        _ => return Err(invalid(IssueCode::InvalidVersion, value, "a valid version")),
    };
    if VERSION_RE.is_match(&text) {
        Ok(text)
    } else {
        Err(invalid(IssueCode::InvalidVersion, value, "a valid version"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use rstest::rstest;

    #[rstest]
    #[case(Value::Int(3), Some(3))]
    #[case(Value::from(" 42 "), Some(42))]
    #[case(Value::Float(1.5), None)]
    #[case(Value::from("4x"), None)]
    fn test_integer(#[case] value: Value, #[case] expected: Option<i64>) {
        assert_eq!(validate_integer(&value).ok(), expected);
    }

    #[rstest]
    #[case(Value::Bool(true), Some(true))]
    #[case(Value::from("False"), Some(false))]
    #[case(Value::from("yes"), None)]
    #[case(Value::Int(1), None)]
    fn test_boolean(#[case] value: Value, #[case] expected: Option<bool>) {
        assert_eq!(validate_boolean(&value).ok(), expected);
    }

    #[test]
    fn test_float_widens_integers() {
        assert_eq!(validate_float(&Value::Int(2)).unwrap(), 2.0);
        assert!(validate_float(&Value::from("2.0")).is_err());
    }

    #[rstest]
    #[case("2001-12-14", 2001, 12, 14, 0, 0)]
    #[case("2001-12-14t21:59:43.10-05:00", 2001, 12, 14, 21, -5 * 3600)]
    #[case("2001-12-14 21:59:43.10 -5", 2001, 12, 14, 21, -5 * 3600)]
    #[case("2001-12-15T02:59:43.1Z", 2001, 12, 15, 2, 0)]
    #[case("2001-12-14 21:59:43 +05:30", 2001, 12, 14, 21, 5 * 3600 + 30 * 60)]
    fn test_timestamps(
        #[case] text: &str,
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] hour: u32,
        #[case] offset: i32,
    ) {
        let dt = validate_timestamp(&Value::from(text)).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (year, month, day, hour));
        assert_eq!(dt.offset().local_minus_utc(), offset);
    }

    #[rstest]
    #[case("2001-13-01")]
    #[case("yesterday")]
    #[case("2001-12-14 25:00:00")]
    fn test_invalid_timestamps(#[case] text: &str) {
        let err = validate_timestamp(&Value::from(text)).unwrap_err();
        assert_eq!(err.code, IssueCode::InvalidTimestamp);
    }

    #[test]
    fn test_range() {
        let yaml = |t: &str| Value::from_yaml(&serde_yaml::from_str(t).unwrap());
        assert_eq!(validate_range(&yaml("[1, 5]")).unwrap(), (1, Some(5)));
        assert_eq!(validate_range(&yaml("[1, UNBOUNDED]")).unwrap(), (1, None));
        assert!(validate_range(&yaml("[5, 1]")).is_err());
        assert!(validate_range(&yaml("[1]")).is_err());
        assert!(validate_range(&yaml("[UNBOUNDED, 1]")).is_err());
    }

    #[rstest]
    #[case("1.0", true)]
    #[case("18.0.3.beta-1", true)]
    #[case("2", true)]
    #[case("1.x", false)]
    fn test_version(#[case] text: &str, #[case] ok: bool) {
        assert_eq!(validate_version(&Value::from(text)).is_ok(), ok);
    }
}
