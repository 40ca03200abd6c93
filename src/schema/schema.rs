use super::constraint::Constraint;
use crate::datatypes::primitives::validate_boolean;
use crate::issues::{IssueCode, IssueCollector, ValidationIssue};
use crate::value::Value;
use once_cell::sync::OnceCell;

/// Keys recognised in a property schema definition.
pub const SCHEMA_KEYS: &[&str] = &[
    "type",
    "required",
    "description",
    "default",
    "constraints",
    "entry_schema",
    "key_schema",
    "status",
    "metadata",
];

/// A property, attribute or input definition.
///
/// Constraints are built the first time they are asked for and reused
/// afterwards, so construction issues are reported once per schema.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    type_name: String,
    required: bool,
    description: Option<String>,
    default: Option<Value>,
    status: Option<String>,
    raw_constraints: Vec<Value>,
    entry_schema: Option<Box<Schema>>,
    key_schema: Option<Box<Schema>>,
    constraints: OnceCell<Vec<Constraint>>,
}

impl Schema {
    /// Parses a schema definition map.
    ///
    /// `entry_schema` and `key_schema` may be given as a bare type name.
    pub fn new(name: &str, definition: &Value) -> Result<Self, ValidationIssue> {
        let map = definition.as_map().ok_or_else(|| {
            ValidationIssue::new(
                IssueCode::InvalidSchema,
                format!("Schema definition of \"{}\" must be a map.", name),
            )
        })?;
        let type_name = map.get("type").and_then(Value::as_str).ok_or_else(|| {
            ValidationIssue::new(
                IssueCode::InvalidSchema,
                format!(
                    "Schema definition of \"{}\" must have a \"type\" attribute.",
                    name
                ),
            )
        })?;

        let required = match map.get("required") {
            None => true,
            Some(v) => validate_boolean(v).map_err(|_| {
                ValidationIssue::new(
                    IssueCode::InvalidSchema,
                    format!(
                        "Schema definition of \"{}\" has a non-boolean \"required\" value \"{}\".",
                        name, v
                    ),
                )
            })?,
        };

        let raw_constraints = match map.get("constraints") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::List(items)) => items.clone(),
            Some(other) => {
                return Err(ValidationIssue::new(
                    IssueCode::InvalidSchema,
                    format!(
                        "Constraints of \"{}\" must be a list, got \"{}\".",
                        name, other
                    ),
                ))
            }
        };

        Ok(Schema {
            name: name.to_string(),
            type_name: type_name.to_string(),
            required,
            description: map
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            default: map.get("default").cloned(),
            status: map.get("status").and_then(Value::as_str).map(str::to_string),
            raw_constraints,
            entry_schema: Self::nested(name, map.get("entry_schema"))?,
            key_schema: Self::nested(name, map.get("key_schema"))?,
            constraints: OnceCell::new(),
        })
    }

    /// A bare schema of the given type with no constraints.
    pub fn of_type(name: &str, type_name: &str) -> Self {
        Schema {
            name: name.to_string(),
            type_name: type_name.to_string(),
            required: true,
            description: None,
            default: None,
            status: None,
            raw_constraints: Vec::new(),
            entry_schema: None,
            key_schema: None,
            constraints: OnceCell::new(),
        }
    }

    fn nested(name: &str, raw: Option<&Value>) -> Result<Option<Box<Schema>>, ValidationIssue> {
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(type_name)) => Ok(Some(Box::new(Schema::of_type(name, type_name)))),
            Some(definition) => Schema::new(name, definition).map(|s| Some(Box::new(s))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn entry_schema(&self) -> Option<&Schema> {
        self.entry_schema.as_deref()
    }

    pub fn key_schema(&self) -> Option<&Schema> {
        self.key_schema.as_deref()
    }

    /// The constraints declared on this schema.
    ///
    /// The first call builds them; clauses that cannot be built are reported
    /// to `issues` and left out.
    pub fn constraints(&self, issues: &mut IssueCollector) -> &[Constraint] {
        self.constraints.get_or_init(|| {
            let mut built = Vec::with_capacity(self.raw_constraints.len());
            for clause in &self.raw_constraints {
                match Constraint::from_schema(&self.name, &self.type_name, clause, issues) {
                    Ok(c) => built.push(c),
                    Err(issue) => {
                        issues.add(issue);
                    }
                }
            }
            built
        })
    }

    /// Runs every constraint against `value`. Returns whether all passed.
    pub fn validate_constraints(&self, value: &Value, issues: &mut IssueCollector) -> bool {
        let constraints = self.constraints(issues);
        let mut ok = true;
        for c in constraints {
            ok &= c.validate(value, issues);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    #[test]
    fn test_defaults() {
        let s = Schema::new("port", &yaml("{type: integer}")).unwrap();
        assert_eq!(s.type_name(), "integer");
        assert!(s.required());
        assert!(s.default().is_none());
    }

    #[test]
    fn test_entry_schema_shorthand() {
        let s = Schema::new("ports", &yaml("{type: list, entry_schema: integer}")).unwrap();
        assert_eq!(s.entry_schema().unwrap().type_name(), "integer");

        let s = Schema::new(
            "ports",
            &yaml("{type: list, entry_schema: {type: integer, constraints: [{less_than: 5}]}}"),
        )
        .unwrap();
        let mut issues = IssueCollector::new();
        let entry = s.entry_schema().unwrap();
        assert!(!entry.validate_constraints(&Value::Int(7), &mut issues));
    }

    #[test]
    fn test_missing_type_is_invalid() {
        let err = Schema::new("p", &yaml("{required: false}")).unwrap_err();
        assert_eq!(err.code, IssueCode::InvalidSchema);
        let err = Schema::new("p", &yaml("integer")).unwrap_err();
        assert_eq!(err.code, IssueCode::InvalidSchema);
    }

    #[test]
    fn test_constraints_build_once() {
        let s = Schema::new(
            "p",
            &yaml("{type: integer, constraints: [{pattern: x}, {in_range: [1, 10]}]}"),
        )
        .unwrap();
        let mut issues = IssueCollector::new();
        assert_eq!(s.constraints(&mut issues).len(), 2);
        assert_eq!(issues.count_code(IssueCode::InapplicableConstraint), 1);

        let mut again = IssueCollector::new();
        assert!(s.validate_constraints(&Value::Int(5), &mut again));
        assert!(again.is_empty());
        assert!(!s.validate_constraints(&Value::Int(50), &mut again));
        assert!(again.has_code(IssueCode::InRangeViolation));
    }

    #[test]
    fn test_unknown_constraint_is_skipped() {
        let s = Schema::new("p", &yaml("{type: string, constraints: [{foo: 1}, {min_length: 2}]}"))
            .unwrap();
        let mut issues = IssueCollector::new();
        assert_eq!(s.constraints(&mut issues).len(), 1);
        assert!(issues.has_code(IssueCode::UnknownConstraint));
    }
}
