//! Equality and membership rules for `equal` and `valid_values`.
use crate::value::Value;

/// Loose equality: numbers compare numerically, everything else structurally.
fn same(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// True if `value` is one of `allowed`; for a list value every element must be.
pub fn contains(allowed: &[Value], value: &Value) -> bool {
    match value {
        Value::List(items) => items.iter().all(|item| allowed.iter().any(|a| same(a, item))),
        other => allowed.iter().any(|a| same(a, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_membership() {
        let allowed = vec![Value::from("a"), Value::Int(1)];
        assert!(contains(&allowed, &Value::from("a")));
        assert!(contains(&allowed, &Value::Float(1.0)));
        assert!(!contains(&allowed, &Value::from("b")));
    }

    #[test]
    fn test_list_requires_every_element() {
        let allowed = vec![Value::from("a"), Value::from("b")];
        assert!(contains(&allowed, &Value::List(vec!["a".into(), "b".into()])));
        assert!(!contains(&allowed, &Value::List(vec!["a".into(), "c".into()])));
        assert!(contains(&allowed, &Value::List(vec![])));
    }
}
