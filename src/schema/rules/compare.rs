//! Ordering rules shared by the comparison and `in_range` constraints.
use crate::datatypes::primitives::{str_to_num, validate_timestamp, UNBOUNDED};
use crate::datatypes::scalar_unit::{self, ScalarUnitKind};
use crate::value::Value;
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::fmt;

/// A value reduced to something orderable.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparable {
    Number(f64),
    Date(DateTime<FixedOffset>),
}

impl Comparable {
    /// Dates only order against dates and numbers against numbers.
    pub fn compare(&self, other: &Comparable) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Date(a), Comparable::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Comparable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparable::Number(n) => write!(f, "{}", n),
            Comparable::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}

/// One end of an `in_range` constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Unbounded,
    At(Comparable),
}

/// Reduces `value` to a [`Comparable`] according to the declared property type.
///
/// Scalar-unit types normalise into their base unit and `timestamp` parses a
/// date. Anything else is compared numerically via string-to-double coercion,
/// falling back to a date when the text is a timestamp.
pub fn coerce(value: &Value, property_type: &str) -> Option<Comparable> {
    if let Some(kind) = ScalarUnitKind::from_type_name(property_type) {
        return scalar_unit::normalize(kind, value).ok().map(Comparable::Number);
    }
    if property_type == "timestamp" {
        return validate_timestamp(value).ok().map(Comparable::Date);
    }
    if let Some(n) = str_to_num(value) {
        return Some(Comparable::Number(n));
    }
    validate_timestamp(value).ok().map(Comparable::Date)
}

/// Parses a range end: the `UNBOUNDED` literal or a comparable value.
pub fn coerce_bound(value: &Value, property_type: &str) -> Option<Bound> {
    match value {
        Value::String(s) if s == UNBOUNDED => Some(Bound::Unbounded),
        other => coerce(other, property_type).map(Bound::At),
    }
}

/// Inclusive range check. Returns `None` when a bound is of another kind.
pub fn within(value: &Comparable, min: &Bound, max: &Bound) -> Option<bool> {
    let above_min = match min {
        Bound::Unbounded => true,
        Bound::At(m) => value.compare(m)? != Ordering::Less,
    };
    let below_max = match max {
        Bound::Unbounded => true,
        Bound::At(m) => value.compare(m)? != Ordering::Greater,
    };
    Some(above_min && below_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_by_type() {
        assert_eq!(coerce(&Value::from("7"), "integer"), Some(Comparable::Number(7.0)));
        assert_eq!(
            coerce(&Value::from("1 kB"), "scalar-unit.size"),
            Some(Comparable::Number(1000.0))
        );
        assert!(matches!(
            coerce(&Value::from("2020-01-01"), "timestamp"),
            Some(Comparable::Date(_))
        ));
        assert!(matches!(
            coerce(&Value::from("2020-01-01"), "string"),
            Some(Comparable::Date(_))
        ));
        assert_eq!(coerce(&Value::from("abc"), "integer"), None);
    }

    #[test]
    fn test_mixed_kinds_do_not_order() {
        let date = coerce(&Value::from("2020-01-01"), "timestamp").unwrap();
        assert_eq!(date.compare(&Comparable::Number(1.0)), None);
        assert_eq!(within(&date, &Bound::At(Comparable::Number(0.0)), &Bound::Unbounded), None);
    }
}
