//! Validation of a value against a declared TOSCA type.
//!
//! Primitive types go through the coercion rules in [`super::primitives`],
//! scalar units through [`super::scalar_unit`]. Data types from the registry
//! either derive from a primitive (validated as that primitive plus their own
//! constraints) or are complex maps of named properties, validated field by
//! field.

use super::primitives::{
    validate_boolean, validate_float, validate_integer, validate_list, validate_map,
    validate_numeric, validate_range, validate_string, validate_timestamp, validate_version,
};
use super::scalar_unit::{self, ScalarUnitKind};
use crate::issues::{IssueCode, IssueCollector, ValidationIssue};
use crate::schema::{Constraint, Schema};
use crate::types::TypeRegistry;
use crate::functions;
use crate::value::Value;

/// Type names handled without a registry lookup.
pub const PRIMITIVE_TYPES: &[&str] = &[
    "string",
    "integer",
    "float",
    "number",
    "boolean",
    "timestamp",
    "version",
    "range",
    "list",
    "map",
    "scalar-unit.size",
    "scalar-unit.time",
    "scalar-unit.frequency",
    "scalar-unit.bitrate",
];

pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&type_name)
}

/// Validates `value` against the schema's type and then its constraints.
///
/// Constraints run only when the value is of the declared type.
pub fn validate_property(
    schema: &Schema,
    value: &Value,
    registry: &TypeRegistry,
    issues: &mut IssueCollector,
) -> bool {
    let typed = check(
        schema.type_name(),
        value,
        schema.entry_schema(),
        schema.key_schema(),
        registry,
        schema.name(),
        issues,
    );
    typed && schema.validate_constraints(value, issues)
}

/// Validates `value` against `type_name`. Unresolved functions always pass.
pub fn validate_datatype(
    type_name: &str,
    value: &Value,
    entry_schema: Option<&Schema>,
    registry: &TypeRegistry,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    check(type_name, value, entry_schema, None, registry, prop_name, issues)
}

fn in_property(prop_name: &str, issue: ValidationIssue) -> ValidationIssue {
    ValidationIssue::new(
        issue.code,
        format!("Property \"{}\": {}", prop_name, issue.message),
    )
}

fn report(
    result: Result<(), ValidationIssue>,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    match result {
        Ok(()) => true,
        Err(issue) => {
            issues.add(in_property(prop_name, issue));
            false
        }
    }
}

fn check(
    type_name: &str,
    value: &Value,
    entry_schema: Option<&Schema>,
    key_schema: Option<&Schema>,
    registry: &TypeRegistry,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    if functions::is_function(value) {
        return true;
    }
    let result = match type_name {
        "string" => validate_string(value).map(drop),
        "integer" => validate_integer(value).map(drop),
        "float" => validate_float(value).map(drop),
        "number" => validate_numeric(value).map(drop),
        "boolean" => validate_boolean(value).map(drop),
        "timestamp" => validate_timestamp(value).map(drop),
        "version" => validate_version(value).map(drop),
        "range" => validate_range(value).map(drop),
        "list" => {
            return match validate_list(value) {
                Ok(items) => check_entries(items.iter(), entry_schema, registry, prop_name, issues),
                Err(issue) => report(Err(issue), prop_name, issues),
            }
        }
        "map" => {
            return match validate_map(value) {
                Ok(map) => {
                    let mut ok = true;
                    if let Some(key_schema) = key_schema {
                        for key in map.keys() {
                            let key = Value::String(key.clone());
                            ok &= check_one(key_schema, &key, registry, prop_name, issues);
                        }
                    }
                    ok & check_entries(map.values(), entry_schema, registry, prop_name, issues)
                }
                Err(issue) => report(Err(issue), prop_name, issues),
            }
        }
        other => match ScalarUnitKind::from_type_name(other) {
            Some(kind) => scalar_unit::normalize(kind, value).map(drop),
            None => return check_data_type(other, value, entry_schema, registry, prop_name, issues),
        },
    };
    report(result, prop_name, issues)
}

fn check_one(
    schema: &Schema,
    value: &Value,
    registry: &TypeRegistry,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    let typed = check(
        schema.type_name(),
        value,
        schema.entry_schema(),
        schema.key_schema(),
        registry,
        prop_name,
        issues,
    );
    typed && schema.validate_constraints(value, issues)
}

fn check_entries<'v>(
    entries: impl Iterator<Item = &'v Value>,
    entry_schema: Option<&Schema>,
    registry: &TypeRegistry,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    let Some(entry_schema) = entry_schema else {
        return true;
    };
    let mut ok = true;
    for entry in entries {
        ok &= check_one(entry_schema, entry, registry, prop_name, issues);
    }
    ok
}

fn check_data_type(
    type_name: &str,
    value: &Value,
    entry_schema: Option<&Schema>,
    registry: &TypeRegistry,
    prop_name: &str,
    issues: &mut IssueCollector,
) -> bool {
    let Some(data_type) = registry.data_type(type_name) else {
        issues.push(
            IssueCode::UnknownType,
            format!(
                "Type \"{}\" of property \"{}\" is not defined.",
                type_name, prop_name
            ),
        );
        return false;
    };

    if let Some(base) = registry.primitive_base(&data_type.name) {
        if !check(base, value, entry_schema, None, registry, prop_name, issues) {
            return false;
        }
        let mut ok = true;
        for clause in registry.data_type_constraints(&data_type.name) {
            match Constraint::from_schema(prop_name, base, clause, issues) {
                Ok(c) => ok &= c.validate(value, issues),
                Err(issue) => {
                    issues.add(issue);
                }
            }
        }
        return ok;
    }

    let map = match validate_map(value) {
        Ok(map) => map,
        Err(issue) => return report(Err(issue), prop_name, issues),
    };
    let fields = registry.data_type_properties(&data_type.name);
    let mut ok = true;
    for key in map.keys() {
        if !fields.contains_key(key.as_str()) {
            issues.push(
                IssueCode::UnknownField,
                format!(
                    "Data value of type \"{}\" in property \"{}\" contains unknown field \"{}\".",
                    data_type.name,
                    prop_name,
                    key
                ),
            );
            ok = false;
        }
    }
    for (field, schema) in fields {
        match map.get(field) {
            Some(v) => ok &= check_one(schema, v, registry, prop_name, issues),
            None if schema.required() && schema.default().is_none() => {
                issues.push(
                    IssueCode::MissingRequiredField,
                    format!(
                        "Data value of type \"{}\" in property \"{}\" is missing required field \"{}\".",
                        data_type.name,
                        prop_name,
                        field
                    ),
                );
                ok = false;
            }
            None => {}
        }
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Context, Function, GetInput};
    use rstest::rstest;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    fn validate(type_name: &str, value: &str) -> (bool, IssueCollector) {
        let registry = TypeRegistry::normative();
        let mut issues = IssueCollector::new();
        let ok = validate_datatype(type_name, &yaml(value), None, &registry, "p", &mut issues);
        (ok, issues)
    }

    #[rstest]
    #[case("string", "hello", true)]
    #[case("string", "5", false)]
    #[case("integer", "5", true)]
    #[case("integer", "5.5", false)]
    #[case("float", "5", true)]
    #[case("number", "5.5", true)]
    #[case("boolean", "true", true)]
    #[case("timestamp", "2020-01-01", true)]
    #[case("version", "1.0.0", true)]
    #[case("range", "[1, UNBOUNDED]", true)]
    #[case("list", "[1, 2]", true)]
    #[case("map", "{a: 1}", true)]
    #[case("map", "[1]", false)]
    #[case("scalar-unit.size", "10 GB", true)]
    #[case("scalar-unit.time", "10 parsecs", false)]
    fn test_primitives(#[case] type_name: &str, #[case] value: &str, #[case] ok: bool) {
        assert_eq!(validate(type_name, value).0, ok);
    }

    #[test]
    fn test_issue_names_the_property() {
        let (_, issues) = validate("integer", "abc");
        assert_eq!(
            issues.issues()[0].message,
            "Property \"p\": \"abc\" is not an integer."
        );
    }

    #[test]
    fn test_entry_schema_applies_to_each_item() {
        let registry = TypeRegistry::normative();
        let schema =
            Schema::new("ports", &yaml("{type: list, entry_schema: {type: integer, constraints: [{less_than: 10}]}}"))
                .unwrap();
        let mut issues = IssueCollector::new();
        assert!(validate_property(&schema, &yaml("[1, 2]"), &registry, &mut issues));
        assert!(!validate_property(&schema, &yaml("[1, x, 20]"), &registry, &mut issues));
        assert!(issues.has_code(IssueCode::InvalidValue));
        assert!(issues.has_code(IssueCode::LessThanViolation));
    }

    #[test]
    fn test_port_def_range() {
        assert!(validate("PortDef", "8080").0);
        let (ok, issues) = validate("tosca.datatypes.network.PortDef", "70000");
        assert!(!ok);
        assert!(issues.has_code(IssueCode::InRangeViolation));
    }

    #[test]
    fn test_complex_data_type() {
        let (ok, issues) = validate("tosca.datatypes.Credential", "{token: secret}");
        assert!(ok, "{:?}", issues.report());

        let (ok, issues) = validate("tosca.datatypes.Credential", "{user: bob}");
        assert!(!ok);
        assert!(issues.has_code(IssueCode::MissingRequiredField));

        let (ok, issues) = validate("tosca.datatypes.Credential", "{token: s, colour: red}");
        assert!(!ok);
        assert!(issues.has_code(IssueCode::UnknownField));
    }

    #[test]
    fn test_unknown_type() {
        let (ok, issues) = validate("tosca.datatypes.Nope", "1");
        assert!(!ok);
        assert!(issues.has_code(IssueCode::UnknownType));
    }

    #[test]
    fn test_function_values_pass() {
        let registry = TypeRegistry::normative();
        let f = Function::GetInput(GetInput::new(
            Context::Topology,
            smallvec::smallvec![Value::from("port")],
        ));
        let mut issues = IssueCollector::new();
        assert!(validate_datatype("integer", &Value::from(f), None, &registry, "p", &mut issues));
        assert!(validate_datatype("integer", &yaml("{get_input: port}"), None, &registry, "p", &mut issues));
        assert!(issues.is_empty());
    }
}
