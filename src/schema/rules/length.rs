//! Length measurement for `length`, `min_length` and `max_length`.
use crate::value::Value;

/// Character count of a string, or entry count of a map when `maps` is set.
pub fn measure(value: &Value, maps: bool) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Map(m) if maps => Some(m.len()),
        _ => None,
    }
}
