//! Node templates, their requirement and capability assignments, and
//! relationship templates.
use super::template::TopologyTemplate;
use crate::datatypes::validate_property;
use crate::issues::{IssueCode, IssueCollector};
use crate::schema::Schema;
use crate::types::{TypeKind, TypeRegistry};
use crate::value::Value;
use std::collections::BTreeMap;

const NODE_TEMPLATE_KEYS: &[&str] = &[
    "type",
    "description",
    "metadata",
    "directives",
    "properties",
    "attributes",
    "requirements",
    "capabilities",
    "interfaces",
    "artifacts",
    "node_filter",
    "copy",
];

const RELATIONSHIP_TEMPLATE_KEYS: &[&str] = &[
    "type",
    "description",
    "metadata",
    "properties",
    "attributes",
    "interfaces",
    "copy",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RequirementAssignment {
    pub name: String,
    /// Name of the target node template.
    pub node: String,
    pub capability: Option<String>,
    /// A relationship template name or a relationship type.
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityAssignment {
    pub name: String,
    pub type_name: String,
    pub properties: BTreeMap<String, Value>,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub properties: BTreeMap<String, Value>,
    pub attributes: BTreeMap<String, Value>,
    pub requirements: Vec<RequirementAssignment>,
    pub capabilities: BTreeMap<String, CapabilityAssignment>,
    pub interfaces: BTreeMap<String, Value>,
    /// The nested topology that implements this node, when one was supplied.
    pub sub_mapping: Option<Box<TopologyTemplate>>,
}

fn string_field(map: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn map_field(map: &BTreeMap<String, Value>, key: &str) -> BTreeMap<String, Value> {
    map.get(key)
        .and_then(Value::as_map)
        .cloned()
        .unwrap_or_default()
}

fn check_keys(
    owner: &str,
    map: &BTreeMap<String, Value>,
    allowed: &[&str],
    issues: &mut IssueCollector,
) {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            issues.push(
                IssueCode::UnknownField,
                format!("{} contains unknown field \"{}\".", owner, key),
            );
        }
    }
}

/// Reports interfaces the type does not declare. They are kept so their
/// operation inputs still get converted.
fn check_interfaces(
    owner: &str,
    given: BTreeMap<String, Value>,
    declared: &BTreeMap<&str, &str>,
    issues: &mut IssueCollector,
) -> BTreeMap<String, Value> {
    for name in given.keys().filter(|k| !declared.contains_key(k.as_str())) {
        issues.push(
            IssueCode::UnknownField,
            format!("{} contains unknown interface \"{}\".", owner, name),
        );
    }
    given
}

/// Fills defaults into `given`, reports undeclared and missing required
/// entries, and validates every value against its schema.
fn assign_properties(
    owner: &str,
    given: BTreeMap<String, Value>,
    declared: &BTreeMap<&str, &Schema>,
    registry: &TypeRegistry,
    check_required: bool,
    issues: &mut IssueCollector,
) -> BTreeMap<String, Value> {
    let mut assigned = BTreeMap::new();
    for (name, value) in given {
        if declared.contains_key(name.as_str()) {
            assigned.insert(name, value);
        } else {
            issues.push(
                IssueCode::UnknownField,
                format!("{} contains unknown property \"{}\".", owner, name),
            );
        }
    }
    for (name, schema) in declared {
        if assigned.contains_key(*name) {
            continue;
        }
        match schema.default() {
            Some(default) => {
                assigned.insert(name.to_string(), default.clone());
            }
            None if check_required && schema.required() => {
                issues.push(
                    IssueCode::MissingRequiredField,
                    format!("{} is missing required property \"{}\".", owner, name),
                );
            }
            None => {}
        }
    }
    for (name, value) in &assigned {
        if let Some(schema) = declared.get(name.as_str()) {
            validate_property(schema, value, registry, issues);
        }
    }
    assigned
}

impl RequirementAssignment {
    fn parse(owner: &str, name: &str, raw: &Value, issues: &mut IssueCollector) -> Option<Self> {
        match raw {
            Value::String(node) => Some(RequirementAssignment {
                name: name.to_string(),
                node: node.clone(),
                capability: None,
                relationship: None,
            }),
            Value::Map(map) => {
                let Some(node) = string_field(map, "node") else {
                    issues.push(
                        IssueCode::MissingRequiredField,
                        format!(
                            "Requirement \"{}\" of node template \"{}\" has no target \"node\".",
                            name, owner
                        ),
                    );
                    return None;
                };
                let relationship = match map.get("relationship") {
                    Some(Value::String(r)) => Some(r.clone()),
                    Some(other) => other.get("type").and_then(Value::as_str).map(str::to_string),
                    None => None,
                };
                Some(RequirementAssignment {
                    name: name.to_string(),
                    node,
                    capability: string_field(map, "capability"),
                    relationship,
                })
            }
            other => {
                issues.push(
                    IssueCode::InvalidSchema,
                    format!(
                        "Requirement \"{}\" of node template \"{}\" is invalid: \"{}\".",
                        name, owner, other
                    ),
                );
                None
            }
        }
    }
}

impl NodeTemplate {
    /// Parses a node template. Returns `None` when it has no usable type.
    pub fn parse(
        name: &str,
        raw: &Value,
        registry: &TypeRegistry,
        issues: &mut IssueCollector,
    ) -> Option<Self> {
        let owner = format!("Node template \"{}\"", name);
        let Some(map) = raw.as_map() else {
            issues.push(IssueCode::InvalidSchema, format!("{} must be a map.", owner));
            return None;
        };
        check_keys(&owner, map, NODE_TEMPLATE_KEYS, issues);

        let Some(declared_type) = string_field(map, "type") else {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("{} is missing required field \"type\".", owner),
            );
            return None;
        };
        let Some(node_type) = registry.node_type(&declared_type) else {
            issues.push(
                IssueCode::UnknownType,
                format!("{} has unknown type \"{}\".", owner, declared_type),
            );
            return None;
        };
        let type_name = node_type.name.clone();

        let properties = assign_properties(
            &owner,
            map_field(map, "properties"),
            &registry.properties(TypeKind::Node, &type_name),
            registry,
            true,
            issues,
        );

        let mut requirements = Vec::new();
        let declared_reqs = registry.requirements(&type_name);
        if let Some(entries) = map.get("requirements").and_then(Value::as_list) {
            for entry in entries {
                let Some((req_name, body)) =
                    entry.as_map().filter(|m| m.len() == 1).and_then(|m| m.iter().next())
                else {
                    issues.push(
                        IssueCode::InvalidSchema,
                        format!("{} has an invalid requirement \"{}\".", owner, entry),
                    );
                    continue;
                };
                if !declared_reqs.contains_key(req_name.as_str()) {
                    issues.push(
                        IssueCode::UnknownField,
                        format!("{} contains unknown requirement \"{}\".", owner, req_name),
                    );
                    continue;
                }
                if let Some(req) = RequirementAssignment::parse(name, req_name, body, issues) {
                    requirements.push(req);
                }
            }
        }

        let given_caps = map_field(map, "capabilities");
        let declared_caps = registry.capabilities(&type_name);
        for cap_name in given_caps.keys() {
            if !declared_caps.contains_key(cap_name.as_str()) {
                issues.push(
                    IssueCode::UnknownField,
                    format!("{} contains unknown capability \"{}\".", owner, cap_name),
                );
            }
        }
        let mut capabilities = BTreeMap::new();
        for (cap_name, def) in declared_caps {
            let given = given_caps.get(cap_name).and_then(Value::as_map);
            let cap_owner = format!("Capability \"{}\" of node template \"{}\"", cap_name, name);
            let properties = assign_properties(
                &cap_owner,
                given.map(|g| map_field(g, "properties")).unwrap_or_default(),
                &registry.properties(TypeKind::Capability, &def.type_name),
                registry,
                given.is_some(),
                issues,
            );
            capabilities.insert(
                cap_name.to_string(),
                CapabilityAssignment {
                    name: cap_name.to_string(),
                    type_name: def.type_name.clone(),
                    properties,
                    attributes: given.map(|g| map_field(g, "attributes")).unwrap_or_default(),
                },
            );
        }

        let interfaces = check_interfaces(
            &owner,
            map_field(map, "interfaces"),
            &registry.interfaces(TypeKind::Node, &type_name),
            issues,
        );
        Some(NodeTemplate {
            name: name.to_string(),
            type_name,
            description: string_field(map, "description"),
            properties,
            attributes: map_field(map, "attributes"),
            requirements,
            capabilities,
            interfaces,
            sub_mapping: None,
        })
    }

    pub fn requirement(&self, name: &str) -> Option<&RequirementAssignment> {
        self.requirements.iter().find(|r| r.name == name)
    }

    pub fn capability(&self, name: &str) -> Option<&CapabilityAssignment> {
        self.capabilities.get(name)
    }
}

#[derive(Debug, Clone)]
pub struct RelationshipTemplate {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub properties: BTreeMap<String, Value>,
    pub attributes: BTreeMap<String, Value>,
    pub interfaces: BTreeMap<String, Value>,
    /// Node template whose requirement uses this relationship.
    pub source: Option<String>,
    /// Node template that requirement points at.
    pub target: Option<String>,
}

impl RelationshipTemplate {
    pub fn parse(
        name: &str,
        raw: &Value,
        registry: &TypeRegistry,
        issues: &mut IssueCollector,
    ) -> Option<Self> {
        let owner = format!("Relationship template \"{}\"", name);
        let Some(map) = raw.as_map() else {
            issues.push(IssueCode::InvalidSchema, format!("{} must be a map.", owner));
            return None;
        };
        check_keys(&owner, map, RELATIONSHIP_TEMPLATE_KEYS, issues);

        let Some(declared_type) = string_field(map, "type") else {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("{} is missing required field \"type\".", owner),
            );
            return None;
        };
        let Some(rel_type) = registry.relationship_type(&declared_type) else {
            issues.push(
                IssueCode::UnknownType,
                format!("{} has unknown type \"{}\".", owner, declared_type),
            );
            return None;
        };
        let type_name = rel_type.name.clone();
        let properties = assign_properties(
            &owner,
            map_field(map, "properties"),
            &registry.properties(TypeKind::Relationship, &type_name),
            registry,
            true,
            issues,
        );

        let interfaces = check_interfaces(
            &owner,
            map_field(map, "interfaces"),
            &registry.interfaces(TypeKind::Relationship, &type_name),
            issues,
        );
        Some(RelationshipTemplate {
            name: name.to_string(),
            type_name,
            description: string_field(map, "description"),
            properties,
            attributes: map_field(map, "attributes"),
            interfaces,
            source: None,
            target: None,
        })
    }
}
