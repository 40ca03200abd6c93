//! Inputs, outputs, policies and substitution mappings of a topology.
use crate::datatypes::validate_property;
use crate::issues::{IssueCode, IssueCollector};
use crate::schema::{Schema, SCHEMA_KEYS};
use crate::types::TypeRegistry;
use crate::value::Value;
use std::collections::BTreeMap;

const OUTPUT_KEYS: &[&str] = &["description", "value"];
const POLICY_KEYS: &[&str] = &["type", "description", "metadata", "properties", "targets", "triggers"];
const SUBSTITUTION_KEYS: &[&str] = &[
    "node_type",
    "requirements",
    "capabilities",
    "properties",
    "attributes",
    "substitution_filter",
];

fn unknown_fields(owner: &str, map: &BTreeMap<String, Value>, allowed: &[&str], issues: &mut IssueCollector) {
    for key in map.keys().filter(|k| !allowed.contains(&k.as_str())) {
        issues.push(
            IssueCode::UnknownField,
            format!("{} contains unknown field \"{}\".", owner, key),
        );
    }
}

/// A declared input parameter.
#[derive(Debug, Clone)]
pub struct Input {
    pub schema: Schema,
}

impl Input {
    /// Parses the definition and validates its default and, when present,
    /// the value supplied for it.
    pub fn parse(
        name: &str,
        raw: &Value,
        supplied: Option<&Value>,
        registry: &TypeRegistry,
        issues: &mut IssueCollector,
    ) -> Option<Self> {
        let owner = format!("Input \"{}\"", name);
        if let Some(map) = raw.as_map() {
            unknown_fields(&owner, map, SCHEMA_KEYS, issues);
        }
        let schema = match Schema::new(name, raw) {
            Ok(schema) => schema,
            Err(issue) => {
                issues.add(issue);
                return None;
            }
        };
        if let Some(default) = schema.default() {
            validate_property(&schema, default, registry, issues);
        }
        if let Some(value) = supplied {
            validate_property(&schema, value, registry, issues);
        }
        Some(Input { schema })
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn default(&self) -> Option<&Value> {
        self.schema.default()
    }
}

#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    pub description: Option<String>,
    pub value: Value,
}

impl Output {
    pub fn parse(name: &str, raw: &Value, issues: &mut IssueCollector) -> Option<Self> {
        let owner = format!("Output \"{}\"", name);
        let Some(map) = raw.as_map() else {
            issues.push(IssueCode::InvalidSchema, format!("{} must be a map.", owner));
            return None;
        };
        unknown_fields(&owner, map, OUTPUT_KEYS, issues);
        let Some(value) = map.get("value") else {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("{} is missing required field \"value\".", owner),
            );
            return None;
        };
        Some(Output {
            name: name.to_string(),
            description: map.get("description").and_then(Value::as_str).map(str::to_string),
            value: value.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub name: String,
    pub type_name: String,
    pub targets: Vec<String>,
    pub properties: BTreeMap<String, Value>,
}

impl Policy {
    /// Parses a policy. Target existence is checked once the node templates
    /// are known, through [`Policy::check_targets`].
    pub fn parse(
        name: &str,
        raw: &Value,
        registry: &TypeRegistry,
        issues: &mut IssueCollector,
    ) -> Option<Self> {
        let owner = format!("Policy \"{}\"", name);
        let Some(map) = raw.as_map() else {
            issues.push(IssueCode::InvalidSchema, format!("{} must be a map.", owner));
            return None;
        };
        unknown_fields(&owner, map, POLICY_KEYS, issues);
        let Some(declared) = map.get("type").and_then(Value::as_str) else {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("{} is missing required field \"type\".", owner),
            );
            return None;
        };
        let type_name = match registry.policy_type(declared) {
            Some(def) => def.name.clone(),
            None => {
                issues.push(
                    IssueCode::UnknownType,
                    format!("{} has unknown type \"{}\".", owner, declared),
                );
                declared.to_string()
            }
        };
        let targets = map
            .get("targets")
            .and_then(Value::as_list)
            .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        Some(Policy {
            name: name.to_string(),
            type_name,
            targets,
            properties: map.get("properties").and_then(Value::as_map).cloned().unwrap_or_default(),
        })
    }

    pub fn check_targets(&self, exists: impl Fn(&str) -> bool, issues: &mut IssueCollector) {
        for target in self.targets.iter().filter(|t| !exists(t.as_str())) {
            issues.push(
                IssueCode::NodeTemplateNotFound,
                format!(
                    "Policy \"{}\" targets node template \"{}\" which was not found.",
                    self.name, target
                ),
            );
        }
    }
}

/// How a topology exposes itself as an implementation of a node type.
#[derive(Debug, Clone)]
pub struct SubstitutionMappings {
    pub node_type: String,
    pub requirements: BTreeMap<String, Value>,
    pub capabilities: BTreeMap<String, Value>,
}

impl SubstitutionMappings {
    pub fn parse(raw: &Value, registry: &TypeRegistry, issues: &mut IssueCollector) -> Option<Self> {
        let owner = "Substitution mappings";
        let Some(map) = raw.as_map() else {
            issues.push(IssueCode::InvalidSchema, format!("{} must be a map.", owner));
            return None;
        };
        unknown_fields(owner, map, SUBSTITUTION_KEYS, issues);
        let Some(declared) = map.get("node_type").and_then(Value::as_str) else {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("{} is missing required field \"node_type\".", owner),
            );
            return None;
        };
        let node_type = match registry.node_type(declared) {
            Some(def) => def.name.clone(),
            None => {
                issues.push(
                    IssueCode::UnknownType,
                    format!("{} refer to unknown node type \"{}\".", owner, declared),
                );
                declared.to_string()
            }
        };
        let section = |key: &str| map.get(key).and_then(Value::as_map).cloned().unwrap_or_default();
        Some(SubstitutionMappings {
            node_type,
            requirements: section("requirements"),
            capabilities: section("capabilities"),
        })
    }
}
