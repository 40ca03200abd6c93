//! Property constraints: construction from schema clauses and value checks.
//!
//! A constraint is built once from its schema clause. Building validates the
//! operand against the constraint kind and the property type; an operand that
//! cannot be used leaves the constraint *degraded*, which records the problem
//! once and then accepts every value.

use super::rules::compare::{self, Bound, Comparable};
use super::rules::{length, membership, pattern};
use crate::datatypes::scalar_unit::{self, ScalarUnitKind};
use crate::issues::{IssueCode, IssueCollector, ValidationIssue};
use crate::functions;
use crate::value::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

const ORDERED_TYPES: &[&str] = &[
    "integer",
    "float",
    "timestamp",
    "scalar-unit.size",
    "scalar-unit.time",
    "scalar-unit.frequency",
    "scalar-unit.bitrate",
];

const RANGE_TYPES: &[&str] = &[
    "integer",
    "float",
    "timestamp",
    "scalar-unit.size",
    "scalar-unit.time",
    "scalar-unit.frequency",
    "scalar-unit.bitrate",
    "range",
];

/// The closed set of constraint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKey {
    Equal,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    InRange,
    ValidValues,
    Length,
    MinLength,
    MaxLength,
    Pattern,
}

impl ConstraintKey {
    pub const ALL: [ConstraintKey; 11] = [
        ConstraintKey::Equal,
        ConstraintKey::GreaterThan,
        ConstraintKey::GreaterOrEqual,
        ConstraintKey::LessThan,
        ConstraintKey::LessOrEqual,
        ConstraintKey::InRange,
        ConstraintKey::ValidValues,
        ConstraintKey::Length,
        ConstraintKey::MinLength,
        ConstraintKey::MaxLength,
        ConstraintKey::Pattern,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKey::Equal => "equal",
            ConstraintKey::GreaterThan => "greater_than",
            ConstraintKey::GreaterOrEqual => "greater_or_equal",
            ConstraintKey::LessThan => "less_than",
            ConstraintKey::LessOrEqual => "less_or_equal",
            ConstraintKey::InRange => "in_range",
            ConstraintKey::ValidValues => "valid_values",
            ConstraintKey::Length => "length",
            ConstraintKey::MinLength => "min_length",
            ConstraintKey::MaxLength => "max_length",
            ConstraintKey::Pattern => "pattern",
        }
    }

    /// Property types the constraint may be declared on. `None` means any type.
    pub fn valid_prop_types(self) -> Option<&'static [&'static str]> {
        match self {
            ConstraintKey::Equal | ConstraintKey::ValidValues => None,
            ConstraintKey::GreaterThan
            | ConstraintKey::GreaterOrEqual
            | ConstraintKey::LessThan
            | ConstraintKey::LessOrEqual => Some(ORDERED_TYPES),
            ConstraintKey::InRange => Some(RANGE_TYPES),
            ConstraintKey::Length | ConstraintKey::Pattern => Some(&["string"]),
            ConstraintKey::MinLength | ConstraintKey::MaxLength => Some(&["string", "map"]),
        }
    }

    fn applies_to(self, property_type: &str) -> bool {
        self.valid_prop_types()
            .map_or(true, |types| types.contains(&property_type))
    }

    fn violation_code(self) -> IssueCode {
        match self {
            ConstraintKey::Equal => IssueCode::EqualViolation,
            ConstraintKey::GreaterThan => IssueCode::GreaterThanViolation,
            ConstraintKey::GreaterOrEqual => IssueCode::GreaterOrEqualViolation,
            ConstraintKey::LessThan => IssueCode::LessThanViolation,
            ConstraintKey::LessOrEqual => IssueCode::LessOrEqualViolation,
            ConstraintKey::InRange => IssueCode::InRangeViolation,
            ConstraintKey::ValidValues => IssueCode::ValidValuesViolation,
            ConstraintKey::Length => IssueCode::LengthViolation,
            ConstraintKey::MinLength => IssueCode::MinLengthViolation,
            ConstraintKey::MaxLength => IssueCode::MaxLengthViolation,
            ConstraintKey::Pattern => IssueCode::PatternViolation,
        }
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operand after it has been checked and converted for its constraint kind.
#[derive(Debug, Clone)]
enum Operand {
    /// `equal` compares canonical string forms.
    Text(String),
    Single(Comparable),
    Range(Bound, Bound),
    Members(Vec<Value>),
    Length(usize),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
pub struct Constraint {
    key: ConstraintKey,
    property_name: String,
    property_type: String,
    declared: Value,
    operand: Option<Operand>,
}

impl Constraint {
    /// Builds a constraint from a schema clause such as `{in_range: [1, 10]}`.
    ///
    /// A clause that is not a single-key map cannot be interpreted at all and
    /// is returned as an error. Operand problems are pushed to `issues` and the
    /// constraint comes back degraded.
    pub fn from_schema(
        property_name: &str,
        property_type: &str,
        clause: &Value,
        issues: &mut IssueCollector,
    ) -> Result<Self, ValidationIssue> {
        let entry = clause
            .as_map()
            .filter(|m| m.len() == 1)
            .and_then(|m| m.iter().next());
        let Some((name, operand)) = entry else {
            return Err(ValidationIssue::new(
                IssueCode::InvalidSchema,
                format!(
                    "Invalid constraint schema \"{}\" of property \"{}\".",
                    clause, property_name
                ),
            ));
        };
        Self::factory(name, property_name, property_type, operand, issues)
    }

    /// Builds the constraint named `name`. Unknown names are an error.
    pub fn factory(
        name: &str,
        property_name: &str,
        property_type: &str,
        operand: &Value,
        issues: &mut IssueCollector,
    ) -> Result<Self, ValidationIssue> {
        let key = ConstraintKey::from_name(name).ok_or_else(|| {
            ValidationIssue::new(
                IssueCode::UnknownConstraint,
                format!(
                    "Constraint \"{}\" of property \"{}\" is not supported.",
                    name, property_name
                ),
            )
        })?;
        let mut constraint = Constraint {
            key,
            property_name: property_name.to_string(),
            property_type: property_type.to_string(),
            declared: operand.clone(),
            operand: None,
        };
        if !key.applies_to(property_type) {
            issues.push(
                IssueCode::InapplicableConstraint,
                format!(
                    "Property \"{}\" is of type \"{}\" but constraint \"{}\" applies only to {}.",
                    property_name,
                    property_type,
                    key,
                    key.valid_prop_types().unwrap_or_default().join(", ")
                ),
            );
            return Ok(constraint);
        }
        match constraint.build_operand() {
            Ok(op) => constraint.operand = Some(op),
            Err(issue) => {
                issues.add(issue);
            }
        }
        Ok(constraint)
    }

    pub fn key(&self) -> ConstraintKey {
        self.key
    }

    pub fn property_name(&self) -> &str {
        &self.property_name
    }

    pub fn property_type(&self) -> &str {
        &self.property_type
    }

    /// The operand as written in the template.
    pub fn declared(&self) -> &Value {
        &self.declared
    }

    /// True when the operand was rejected at construction.
    pub fn is_degraded(&self) -> bool {
        self.operand.is_none()
    }

    fn bad_operand(&self, expected: &str) -> ValidationIssue {
        ValidationIssue::new(
            IssueCode::InvalidConstraintOperand,
            format!(
                "The operand \"{}\" of constraint \"{}\" of property \"{}\" must be {}.",
                self.declared, self.key, self.property_name, expected
            ),
        )
    }

    fn build_operand(&self) -> Result<Operand, ValidationIssue> {
        let operand = &self.declared;
        match self.key {
            ConstraintKey::Equal => self
                .canonical(operand)
                .map(Operand::Text)
                .ok_or_else(|| self.bad_operand("a value of the property type")),
            ConstraintKey::GreaterThan
            | ConstraintKey::GreaterOrEqual
            | ConstraintKey::LessThan
            | ConstraintKey::LessOrEqual => {
                if operand.as_list().is_some() || operand.as_map().is_some() {
                    return Err(self.bad_operand("a comparable value"));
                }
                compare::coerce(operand, &self.property_type)
                    .map(Operand::Single)
                    .ok_or_else(|| self.bad_operand("a comparable value"))
            }
            ConstraintKey::InRange => {
                let bounds = operand
                    .as_list()
                    .filter(|items| items.len() == 2)
                    .ok_or_else(|| self.bad_operand("a list of two items"))?;
                let min = compare::coerce_bound(&bounds[0], &self.property_type)
                    .ok_or_else(|| self.bad_operand("a list of two comparable values"))?;
                let max = compare::coerce_bound(&bounds[1], &self.property_type)
                    .ok_or_else(|| self.bad_operand("a list of two comparable values"))?;
                Ok(Operand::Range(min, max))
            }
            ConstraintKey::ValidValues => operand
                .as_list()
                .map(|items| Operand::Members(items.to_vec()))
                .ok_or_else(|| self.bad_operand("a list")),
            ConstraintKey::Length | ConstraintKey::MinLength | ConstraintKey::MaxLength => {
                match operand {
                    Value::Int(n) if *n >= 0 => Ok(Operand::Length(*n as usize)),
                    _ => Err(self.bad_operand("a non-negative integer")),
                }
            }
            ConstraintKey::Pattern => {
                let text = operand
                    .as_str()
                    .ok_or_else(|| self.bad_operand("a string"))?;
                pattern::compile(text).map(Operand::Pattern).map_err(|e| {
                    ValidationIssue::new(
                        IssueCode::InvalidPattern,
                        format!(
                            "The pattern \"{}\" of property \"{}\" is invalid: {}.",
                            text, self.property_name, e
                        ),
                    )
                })
            }
        }
    }

    /// String form used by `equal`. Scalar units compare in their base unit.
    fn canonical(&self, value: &Value) -> Option<String> {
        match ScalarUnitKind::from_type_name(&self.property_type) {
            Some(kind) => scalar_unit::normalize(kind, value).ok().map(|n| n.to_string()),
            None => Some(value.to_string()),
        }
    }

    fn violation(&self, value: &Value, explanation: String) -> ValidationIssue {
        ValidationIssue::new(
            self.key.violation_code(),
            format!(
                "The value \"{}\" of property \"{}\" {}.",
                value, self.property_name, explanation
            ),
        )
    }

    /// Checks `value` against the constraint without recording anything.
    ///
    /// Function values and degraded constraints always pass.
    pub fn check(&self, value: &Value) -> Result<(), ValidationIssue> {
        let Some(operand) = &self.operand else {
            return Ok(());
        };
        if functions::is_function(value) {
            return Ok(());
        }
        let declared = &self.declared;
        match operand {
            Operand::Text(expected) => match self.canonical(value) {
                Some(actual) if actual == *expected => Ok(()),
                _ => Err(self.violation(value, format!("is not equal to \"{}\"", declared))),
            },
            Operand::Single(bound) => {
                let ordering = compare::coerce(value, &self.property_type)
                    .and_then(|v| v.compare(bound))
                    .ok_or_else(|| {
                        self.violation(value, format!("cannot be compared to \"{}\"", declared))
                    })?;
                let (ok, phrase) = match self.key {
                    ConstraintKey::GreaterThan => (ordering == Ordering::Greater, "greater than"),
                    ConstraintKey::GreaterOrEqual => {
                        (ordering != Ordering::Less, "greater than or equal to")
                    }
                    ConstraintKey::LessThan => (ordering == Ordering::Less, "less than"),
                    _ => (ordering != Ordering::Greater, "less than or equal to"),
                };
                if ok {
                    Ok(())
                } else {
                    Err(self.violation(value, format!("must be {} \"{}\"", phrase, declared)))
                }
            }
            Operand::Range(min, max) => {
                let fits = |v: &Value| {
                    compare::coerce(v, &self.property_type)
                        .and_then(|c| compare::within(&c, min, max))
                        == Some(true)
                };
                // A range value must lie within the bounds at both ends.
                let inside = match value.as_list() {
                    Some(ends) if self.property_type == "range" => ends.iter().all(|e| fits(e)),
                    _ => fits(value),
                };
                if inside {
                    return Ok(());
                }
                let (lo, hi) = match declared.as_list() {
                    Some([lo, hi]) => (lo.to_string(), hi.to_string()),
                    _ => (String::new(), String::new()),
                };
                Err(self.violation(value, format!("is out of range \"(min:{}, max:{})\"", lo, hi)))
            }
            Operand::Members(allowed) => {
                if membership::contains(allowed, value) {
                    Ok(())
                } else {
                    Err(self.violation(
                        value,
                        format!("is not valid. Expected a value from \"{}\"", declared),
                    ))
                }
            }
            Operand::Length(n) => {
                let measured = length::measure(value, self.key != ConstraintKey::Length);
                let ok = match (self.key, measured) {
                    (_, None) => false,
                    (ConstraintKey::Length, Some(len)) => len == *n,
                    (ConstraintKey::MinLength, Some(len)) => len >= *n,
                    (_, Some(len)) => len <= *n,
                };
                if ok {
                    return Ok(());
                }
                let phrase = match self.key {
                    ConstraintKey::Length => "must be equal to",
                    ConstraintKey::MinLength => "must be at least",
                    _ => "must be no greater than",
                };
                Err(ValidationIssue::new(
                    self.key.violation_code(),
                    format!(
                        "Length of value \"{}\" of property \"{}\" {} \"{}\".",
                        value, self.property_name, phrase, n
                    ),
                ))
            }
            Operand::Pattern(re) => match value.as_str() {
                Some(text) if re.is_match(text) => Ok(()),
                _ => Err(self.violation(
                    value,
                    format!("does not match pattern \"{}\"", declared),
                )),
            },
        }
    }

    /// Checks `value` and records a violation. Returns whether the value passed.
    pub fn validate(&self, value: &Value, issues: &mut IssueCollector) -> bool {
        match self.check(value) {
            Ok(()) => true,
            Err(issue) => {
                issues.add(issue);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Context, Function, GetInput};
    use rstest::rstest;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    fn build(clause: &str, prop_type: &str) -> (Constraint, IssueCollector) {
        let mut issues = IssueCollector::new();
        let c = Constraint::from_schema("prop", prop_type, &yaml(clause), &mut issues).unwrap();
        (c, issues)
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn test_in_range_is_inclusive(#[case] value: i64, #[case] ok: bool) {
        let (c, issues) = build("{in_range: [1, 10]}", "integer");
        assert!(issues.is_empty());
        assert_eq!(c.check(&Value::Int(value)).is_ok(), ok);
    }

    #[test]
    fn test_in_range_unbounded() {
        let (c, _) = build("{in_range: [1, UNBOUNDED]}", "integer");
        assert!(c.check(&Value::Int(1_000_000)).is_ok());
        let err = c.check(&Value::Int(0)).unwrap_err();
        assert_eq!(err.code, IssueCode::InRangeViolation);
        assert_eq!(
            err.message,
            "The value \"0\" of property \"prop\" is out of range \"(min:1, max:UNBOUNDED)\"."
        );
    }

    #[rstest]
    #[case(Value::Int(i64::MIN))]
    #[case(Value::Int(0))]
    #[case(Value::Int(i64::MAX))]
    fn test_in_range_fully_unbounded(#[case] value: Value) {
        let (c, issues) = build("{in_range: [UNBOUNDED, UNBOUNDED]}", "integer");
        assert!(issues.is_empty());
        assert!(c.check(&value).is_ok());
    }

    #[rstest]
    #[case("2019-12-31", false)]
    #[case("2020-01-01", true)]
    #[case("2020-12-31", true)]
    #[case("2021-01-01", false)]
    fn test_in_range_on_dates(#[case] value: &str, #[case] ok: bool) {
        let (c, issues) = build("{in_range: ['2020-01-01', '2020-12-31']}", "timestamp");
        assert!(issues.is_empty());
        assert_eq!(c.check(&Value::from(value)).is_ok(), ok);
    }

    #[test]
    fn test_pattern_must_match_whole_value() {
        let (c, _) = build("{pattern: abc}", "string");
        assert!(c.check(&Value::from("abc")).is_ok());
        let err = c.check(&Value::from("abcd")).unwrap_err();
        assert_eq!(err.code, IssueCode::PatternViolation);
    }

    #[test]
    fn test_valid_values_on_list_value() {
        let (c, _) = build("{valid_values: [a, b, c]}", "list");
        assert!(c.check(&yaml("[a, c]")).is_ok());
        let err = c.check(&yaml("[a, z]")).unwrap_err();
        assert_eq!(err.code, IssueCode::ValidValuesViolation);
    }

    #[test]
    fn test_equal_compares_string_forms() {
        let (c, _) = build("{equal: \"5\"}", "integer");
        assert!(c.check(&Value::Int(5)).is_ok());
        assert!(c.check(&Value::Int(6)).is_err());
    }

    #[test]
    fn test_equal_on_scalar_units_normalises() {
        let (c, _) = build("{equal: 1 GB}", "scalar-unit.size");
        assert!(c.check(&Value::from("1000 MB")).is_ok());
    }

    #[rstest]
    #[case("{greater_than: 5}", 6, true)]
    #[case("{greater_than: 5}", 5, false)]
    #[case("{greater_or_equal: 5}", 5, true)]
    #[case("{less_than: 5}", 5, false)]
    #[case("{less_or_equal: 5}", 5, true)]
    #[case("{less_or_equal: 5}", 6, false)]
    fn test_comparisons(#[case] clause: &str, #[case] value: i64, #[case] ok: bool) {
        let (c, _) = build(clause, "integer");
        assert_eq!(c.check(&Value::Int(value)).is_ok(), ok);
    }

    #[test]
    fn test_scalar_comparison_normalises_both_sides() {
        let (c, _) = build("{greater_or_equal: 1 GB}", "scalar-unit.size");
        assert!(c.check(&Value::from("2000 MB")).is_ok());
        assert!(c.check(&Value::from("512 MB")).is_err());
    }

    #[test]
    fn test_timestamp_comparison() {
        let (c, _) = build("{less_than: 2020-01-01}", "timestamp");
        assert!(c.check(&Value::from("2019-06-01")).is_ok());
        assert!(c.check(&Value::from("2021-06-01")).is_err());
    }

    #[rstest]
    #[case("{length: 3}", "abc", true)]
    #[case("{length: 3}", "ab", false)]
    #[case("{min_length: 2}", "ab", true)]
    #[case("{min_length: 2}", "a", false)]
    #[case("{max_length: 2}", "abc", false)]
    fn test_lengths(#[case] clause: &str, #[case] value: &str, #[case] ok: bool) {
        let (c, _) = build(clause, "string");
        assert_eq!(c.check(&Value::from(value)).is_ok(), ok);
    }

    #[test]
    fn test_min_length_counts_map_entries() {
        let (c, _) = build("{min_length: 2}", "map");
        assert!(c.check(&yaml("{a: 1, b: 2}")).is_ok());
        assert!(c.check(&yaml("{a: 1}")).is_err());
    }

    #[test]
    fn test_inapplicable_constraint_degrades() {
        let (c, issues) = build("{pattern: abc}", "integer");
        assert!(c.is_degraded());
        assert!(issues.has_code(IssueCode::InapplicableConstraint));
        assert!(c.check(&Value::Int(1)).is_ok());
    }

    #[test]
    fn test_bad_operand_degrades() {
        let (c, issues) = build("{in_range: [1]}", "integer");
        assert!(c.is_degraded());
        assert!(issues.has_code(IssueCode::InvalidConstraintOperand));

        let (c, issues) = build("{pattern: \"([a-z]\"}", "string");
        assert!(c.is_degraded());
        assert!(issues.has_code(IssueCode::InvalidPattern));
    }

    #[test]
    fn test_unknown_constraint_is_an_error() {
        let mut issues = IssueCollector::new();
        let err = Constraint::from_schema("prop", "string", &yaml("{between: [1, 2]}"), &mut issues)
            .unwrap_err();
        assert_eq!(err.code, IssueCode::UnknownConstraint);
    }

    #[test]
    fn test_multi_key_clause_is_invalid() {
        let mut issues = IssueCollector::new();
        let err = Constraint::from_schema(
            "prop",
            "integer",
            &yaml("{greater_than: 1, less_than: 5}"),
            &mut issues,
        )
        .unwrap_err();
        assert_eq!(err.code, IssueCode::InvalidSchema);
    }

    #[test]
    fn test_function_values_pass() {
        let (c, _) = build("{in_range: [1, 10]}", "integer");
        let f = Function::GetInput(GetInput::new(
            Context::Topology,
            smallvec::smallvec![Value::from("port")],
        ));
        assert!(c.check(&Value::from(f)).is_ok());
    }
}
