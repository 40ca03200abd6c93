use super::host::{find_entity, Entity};
use super::{arity, bad_argument, Args, Context, GET_ATTRIBUTE};
use crate::datatypes::is_primitive;
use crate::issues::{IssueCode, IssueCollector};
use crate::schema::Schema;
use crate::topology::{NodeTemplate, TopologyTemplate};
use crate::types::{TypeKind, TypeRegistry};
use crate::value::Value;

/// `get_attribute: [node | SELF | HOST | SOURCE | TARGET, (req_or_cap), attribute, (path...)]`.
///
/// Attribute values only exist at runtime, so resolution yields the function
/// itself. Validation checks the attribute is declared (properties count as
/// implicit attributes) and that any trailing path fits its schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAttribute {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

/// Attribute schema of a type, falling back to its property schema.
fn lookup<'r>(registry: &'r TypeRegistry, kind: TypeKind, type_name: &str, name: &str) -> Option<&'r Schema> {
    registry
        .attributes(kind, type_name)
        .get(name)
        .copied()
        .or_else(|| registry.properties(kind, type_name).get(name).copied())
}

fn declares_attribute(tpl: &TopologyTemplate, node: &NodeTemplate, name: &str) -> bool {
    node.attributes.contains_key(name)
        || node.capabilities.values().any(|c| c.attributes.contains_key(name))
        || lookup(tpl.registry(), TypeKind::Node, &node.type_name, name).is_some()
}

impl GetAttribute {
    pub fn new(context: Context, args: Args) -> Self {
        GetAttribute { context, args }
    }

    fn text_arg(&self, index: usize, what: &str, issues: &mut IssueCollector) -> Option<&str> {
        let arg = self.args.get(index)?;
        let text = arg.as_str();
        if text.is_none() {
            bad_argument(GET_ATTRIBUTE, what, "a string", arg, issues);
        }
        text
    }

    fn not_found(&self, owner: &str, attribute: &str, issues: &mut IssueCollector) {
        issues.push(
            IssueCode::AttributeNotFound,
            format!(
                "{}: attribute \"{}\" was not found in {}.",
                GET_ATTRIBUTE, attribute, owner
            ),
        );
    }

    pub(crate) fn validate(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) {
        if self.args.len() < 2 {
            arity(
                GET_ATTRIBUTE,
                "at least 2 arguments: \"node_template_name\", \"req_or_cap\" (optional), \"attribute_name\"",
                self.args.len(),
                issues,
            );
            return;
        }
        let Some(reference) = self.text_arg(0, "the node template name", issues) else {
            return;
        };
        let Some(second) = self.text_arg(1, "the attribute or requirement name", issues) else {
            return;
        };
        let registry = tpl.registry();

        let wants = |n: &NodeTemplate| {
            declares_attribute(tpl, n, second)
                || (self.args.len() > 2 && (n.requirement(second).is_some() || n.capability(second).is_some()))
        };
        let Some(entity) = find_entity(tpl, &self.context, reference, GET_ATTRIBUTE, second, &wants, issues) else {
            return;
        };

        let node = match entity {
            Entity::Relationship(r) => {
                match lookup(registry, TypeKind::Relationship, &r.type_name, second) {
                    Some(schema) => self.check_path(schema, &self.args[2..], registry, issues),
                    None if r.attributes.contains_key(second) => {}
                    None => self.not_found(&format!("relationship template \"{}\"", r.name), second, issues),
                }
                return;
            }
            Entity::Node(n) => n,
        };

        if self.args.len() > 2 {
            if let Some(req) = node.requirement(second) {
                let Some(attribute) = self.text_arg(2, "the attribute name", issues) else {
                    return;
                };
                let Some(target) = tpl.node_template(&req.node) else {
                    issues.push(
                        IssueCode::NodeTemplateNotFound,
                        format!(
                            "{}: node template \"{}\" of requirement \"{}\" was not found.",
                            GET_ATTRIBUTE, req.node, req.name
                        ),
                    );
                    return;
                };
                match lookup(registry, TypeKind::Node, &target.type_name, attribute) {
                    Some(schema) => self.check_path(schema, &self.args[3..], registry, issues),
                    None if target.attributes.contains_key(attribute) => {}
                    None => self.not_found(&format!("node template \"{}\"", target.name), attribute, issues),
                }
                return;
            }
            if let Some(cap) = node.capability(second) {
                let Some(attribute) = self.text_arg(2, "the attribute name", issues) else {
                    return;
                };
                match lookup(registry, TypeKind::Capability, &cap.type_name, attribute) {
                    Some(schema) => self.check_path(schema, &self.args[3..], registry, issues),
                    None if cap.attributes.contains_key(attribute) => {}
                    None => self.not_found(
                        &format!("capability \"{}\" of node template \"{}\"", cap.name, node.name),
                        attribute,
                        issues,
                    ),
                }
                return;
            }
        }

        match lookup(registry, TypeKind::Node, &node.type_name, second) {
            Some(schema) => self.check_path(schema, &self.args[2..], registry, issues),
            None if node.attributes.contains_key(second) => {}
            None if node.capabilities.values().any(|c| c.attributes.contains_key(second)) => {}
            None if self.args.len() > 2 => {
                issues.push(
                    IssueCode::RequirementOrCapabilityNotFound,
                    format!(
                        "{}: requirement or capability \"{}\" was not found in node template \"{}\".",
                        GET_ATTRIBUTE, second, node.name
                    ),
                );
            }
            None => self.not_found(&format!("node template \"{}\"", node.name), second, issues),
        }
    }

    /// Checks trailing index and key segments against nested list, map and
    /// complex data type schemas.
    fn check_path(&self, schema: &Schema, path: &[Value], registry: &TypeRegistry, issues: &mut IssueCollector) {
        let mut current = schema;
        for segment in path {
            let type_name = current.type_name();
            let next = match (type_name, segment) {
                ("list", Value::Int(_)) => current.entry_schema(),
                ("list", _) => {
                    self.mismatch(IssueCode::IndexMismatch, segment, type_name, issues);
                    return;
                }
                ("map", Value::String(_)) => current.entry_schema(),
                ("map", _) => {
                    self.mismatch(IssueCode::KeyMismatch, segment, type_name, issues);
                    return;
                }
                (other, Value::String(field)) if !is_primitive(other) => {
                    let fields = registry.data_type_properties(other);
                    match fields.get(field.as_str()) {
                        Some(schema) => Some(*schema),
                        None => {
                            self.mismatch(IssueCode::KeyMismatch, segment, type_name, issues);
                            return;
                        }
                    }
                }
                (_, Value::Int(_)) => {
                    self.mismatch(IssueCode::IndexMismatch, segment, type_name, issues);
                    return;
                }
                _ => {
                    self.mismatch(IssueCode::KeyMismatch, segment, type_name, issues);
                    return;
                }
            };
            // without an entry schema the rest of the path cannot be checked
            let Some(next) = next else {
                return;
            };
            current = next;
        }
    }

    fn mismatch(&self, code: IssueCode, segment: &Value, type_name: &str, issues: &mut IssueCollector) {
        issues.push(
            code,
            format!(
                "{}: \"{}\" cannot be applied to a value of type \"{}\" in {}.",
                GET_ATTRIBUTE,
                segment,
                type_name,
                Value::List(self.args.to_vec())
            ),
        );
    }
}
