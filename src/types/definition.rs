//! Type definitions as they appear under `node_types`, `data_types` and friends.
use crate::issues::{IssueCode, IssueCollector};
use crate::schema::Schema;
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Which section of a template a type definition lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    Node,
    Capability,
    Relationship,
    Data,
    Policy,
}

impl TypeKind {
    pub const ALL: [TypeKind; 5] = [
        TypeKind::Node,
        TypeKind::Capability,
        TypeKind::Relationship,
        TypeKind::Data,
        TypeKind::Policy,
    ];

    /// Top-level template section holding definitions of this kind.
    pub fn section(self) -> &'static str {
        match self {
            TypeKind::Node => "node_types",
            TypeKind::Capability => "capability_types",
            TypeKind::Relationship => "relationship_types",
            TypeKind::Data => "data_types",
            TypeKind::Policy => "policy_types",
        }
    }

    fn allowed_keys(self) -> &'static [&'static str] {
        match self {
            TypeKind::Node => &["requirements", "capabilities", "interfaces", "artifacts"],
            TypeKind::Capability => &["valid_source_types"],
            TypeKind::Relationship => &["valid_target_types", "interfaces"],
            TypeKind::Data => &["constraints"],
            TypeKind::Policy => &["targets", "triggers"],
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Node => "node type",
            TypeKind::Capability => "capability type",
            TypeKind::Relationship => "relationship type",
            TypeKind::Data => "data type",
            TypeKind::Policy => "policy type",
        };
        f.write_str(name)
    }
}

const COMMON_KEYS: &[&str] = &[
    "derived_from",
    "description",
    "version",
    "metadata",
    "properties",
    "attributes",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityDefinition {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementDefinition {
    pub name: String,
    pub capability: Option<String>,
    pub node: Option<String>,
    pub relationship: Option<String>,
}

/// One type definition. Fields that do not apply to its kind stay empty.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    pub derived_from: Option<String>,
    pub description: Option<String>,
    pub properties: BTreeMap<String, Schema>,
    pub attributes: BTreeMap<String, Schema>,
    pub capabilities: BTreeMap<String, CapabilityDefinition>,
    pub requirements: Vec<RequirementDefinition>,
    /// Interface name to interface type.
    pub interfaces: BTreeMap<String, String>,
    pub valid_target_types: Vec<String>,
    /// Raw constraint clauses of a data type derived from a primitive.
    pub constraints: Vec<Value>,
}

impl TypeDef {
    pub fn empty(kind: TypeKind, name: &str) -> Self {
        TypeDef {
            name: name.to_string(),
            kind,
            derived_from: None,
            description: None,
            properties: BTreeMap::new(),
            attributes: BTreeMap::new(),
            capabilities: BTreeMap::new(),
            requirements: Vec::new(),
            interfaces: BTreeMap::new(),
            valid_target_types: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Parses a definition body. Problems are reported and the offending
    /// part is left out; a body that is not a map yields `None`.
    pub fn parse(
        kind: TypeKind,
        name: &str,
        raw: &Value,
        issues: &mut IssueCollector,
    ) -> Option<Self> {
        let mut def = TypeDef::empty(kind, name);
        let map = match raw {
            Value::Null => return Some(def),
            Value::Map(map) => map,
            other => {
                issues.push(
                    IssueCode::InvalidSchema,
                    format!("Definition of {} \"{}\" must be a map, got \"{}\".", kind, name, other),
                );
                return None;
            }
        };

        for key in map.keys() {
            if !COMMON_KEYS.contains(&key.as_str()) && !kind.allowed_keys().contains(&key.as_str()) {
                issues.push(
                    IssueCode::UnknownField,
                    format!("{} \"{}\" contains unknown field \"{}\".", capitalise(kind), name, key),
                );
            }
        }

        def.derived_from = map.get("derived_from").and_then(Value::as_str).map(str::to_string);
        def.description = map.get("description").and_then(Value::as_str).map(str::to_string);
        def.properties = parse_schemas(map.get("properties"), issues);
        def.attributes = parse_schemas(map.get("attributes"), issues);

        if let Some(Value::Map(caps)) = map.get("capabilities") {
            for (cap_name, body) in caps {
                let type_name = match body {
                    Value::String(t) => Some(t.as_str()),
                    other => other.get("type").and_then(Value::as_str),
                };
                match type_name {
                    Some(t) => {
                        def.capabilities.insert(
                            cap_name.clone(),
                            CapabilityDefinition { name: cap_name.clone(), type_name: t.to_string() },
                        );
                    }
                    None => {
                        issues.push(
                            IssueCode::MissingRequiredField,
                            format!(
                                "Capability definition \"{}\" of \"{}\" is missing required field \"type\".",
                                cap_name, name
                            ),
                        );
                    }
                }
            }
        }

        if let Some(Value::List(reqs)) = map.get("requirements") {
            for entry in reqs {
                match entry.as_map().filter(|m| m.len() == 1).and_then(|m| m.iter().next()) {
                    Some((req_name, body)) => def.requirements.push(parse_requirement(req_name, body)),
                    None => {
                        issues.push(
                            IssueCode::InvalidSchema,
                            format!("Requirement definition \"{}\" of \"{}\" is invalid.", entry, name),
                        );
                    }
                }
            }
        }

        if let Some(Value::Map(ifaces)) = map.get("interfaces") {
            for (iface_name, body) in ifaces {
                let type_name = body.get("type").and_then(Value::as_str).unwrap_or(iface_name);
                def.interfaces.insert(iface_name.clone(), type_name.to_string());
            }
        }

        if let Some(Value::List(targets)) = map.get("valid_target_types") {
            def.valid_target_types = targets.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }

        match map.get("constraints") {
            None | Some(Value::Null) => {}
            Some(Value::List(clauses)) => def.constraints = clauses.clone(),
            Some(other) => {
                issues.push(
                    IssueCode::InvalidSchema,
                    format!("Constraints of \"{}\" must be a list, got \"{}\".", name, other),
                );
            }
        }

        Some(def)
    }

    pub fn requirement(&self, name: &str) -> Option<&RequirementDefinition> {
        self.requirements.iter().find(|r| r.name == name)
    }
}

fn capitalise(kind: TypeKind) -> String {
    let text = kind.to_string();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => text,
    }
}

fn parse_requirement(name: &str, body: &Value) -> RequirementDefinition {
    let field = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
    match body {
        Value::String(capability) => RequirementDefinition {
            name: name.to_string(),
            capability: Some(capability.clone()),
            node: None,
            relationship: None,
        },
        _ => RequirementDefinition {
            name: name.to_string(),
            capability: field("capability"),
            node: field("node"),
            relationship: body
                .get("relationship")
                .and_then(|r| r.as_str().or_else(|| r.get("type").and_then(Value::as_str)))
                .map(str::to_string),
        },
    }
}

/// Parses a `properties`/`attributes` section into schemas.
pub fn parse_schemas(section: Option<&Value>, issues: &mut IssueCollector) -> BTreeMap<String, Schema> {
    let mut schemas = BTreeMap::new();
    if let Some(Value::Map(defs)) = section {
        for (name, body) in defs {
            match Schema::new(name, body) {
                Ok(schema) => {
                    schemas.insert(name.clone(), schema);
                }
                Err(issue) => {
                    issues.add(issue);
                }
            }
        }
    }
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    #[test]
    fn test_parse_node_type() {
        let mut issues = IssueCollector::new();
        let def = TypeDef::parse(
            TypeKind::Node,
            "my.App",
            &yaml(
                r#"
derived_from: tosca.nodes.Root
properties:
  port: {type: integer}
capabilities:
  api: tosca.capabilities.Endpoint
requirements:
  - host:
      capability: tosca.capabilities.Container
      relationship: tosca.relationships.HostedOn
  - db: tosca.capabilities.Endpoint.Database
interfaces:
  Standard:
    type: tosca.interfaces.node.lifecycle.Standard
"#,
            ),
            &mut issues,
        )
        .unwrap();
        assert!(issues.is_empty(), "{:?}", issues.report());
        assert_eq!(def.derived_from.as_deref(), Some("tosca.nodes.Root"));
        assert_eq!(def.properties["port"].type_name(), "integer");
        assert_eq!(def.capabilities["api"].type_name, "tosca.capabilities.Endpoint");
        assert_eq!(
            def.requirement("host").unwrap().relationship.as_deref(),
            Some("tosca.relationships.HostedOn")
        );
        assert_eq!(
            def.requirement("db").unwrap().capability.as_deref(),
            Some("tosca.capabilities.Endpoint.Database")
        );
        assert_eq!(def.interfaces["Standard"], "tosca.interfaces.node.lifecycle.Standard");
    }

    #[test]
    fn test_unknown_fields_are_reported() {
        let mut issues = IssueCollector::new();
        TypeDef::parse(TypeKind::Data, "my.Data", &yaml("{derived_from: integer, colour: red}"), &mut issues);
        assert!(issues.has_code(IssueCode::UnknownField));
        assert_eq!(
            issues.issues()[0].message,
            "Data type \"my.Data\" contains unknown field \"colour\"."
        );
    }

    #[test]
    fn test_non_map_body() {
        let mut issues = IssueCollector::new();
        assert!(TypeDef::parse(TypeKind::Node, "x", &yaml("[1]"), &mut issues).is_none());
        assert!(issues.has_code(IssueCode::InvalidSchema));
    }
}
