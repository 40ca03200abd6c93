use super::host::{find_entity, Entity};
use super::{arity, bad_argument, walk_path, Args, Context, GET_PROPERTY};
use crate::issues::{IssueCode, IssueCollector};
use crate::topology::{NodeTemplate, TopologyTemplate};
use crate::types::TypeKind;
use crate::value::Value;
use std::collections::BTreeMap;

/// `get_property: [node | SELF | HOST | SOURCE | TARGET, (req_or_cap), property, (path...)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GetProperty {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

/// Where a property value was found.
struct Located<'a> {
    values: &'a BTreeMap<String, Value>,
    /// Context of the template owning `values`.
    context: Context,
    property: &'a str,
    path: &'a [Value],
}

/// Whether `node`, its type or one of its capability assignments carries
/// property `name`.
fn declares_property(tpl: &TopologyTemplate, node: &NodeTemplate, name: &str) -> bool {
    node.properties.contains_key(name)
        || node.capabilities.values().any(|c| c.properties.contains_key(name))
        || tpl
            .registry()
            .properties(TypeKind::Node, &node.type_name)
            .contains_key(name)
}

fn not_found(owner: &str, property: &str, issues: &mut IssueCollector) {
    issues.push(
        IssueCode::PropertyNotFound,
        format!(
            "{}: property \"{}\" was not found in {}.",
            GET_PROPERTY, property, owner
        ),
    );
}

impl GetProperty {
    pub fn new(context: Context, args: Args) -> Self {
        GetProperty { context, args }
    }

    fn text_arg(&self, index: usize, what: &str, issues: &mut IssueCollector) -> Option<&str> {
        let arg = self.args.get(index)?;
        let text = arg.as_str();
        if text.is_none() {
            bad_argument(GET_PROPERTY, what, "a string", arg, issues);
        }
        text
    }

    pub(crate) fn validate(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) {
        self.locate(tpl, issues);
    }

    /// Finds the property the arguments point at.
    ///
    /// With two arguments the second is the property. With more, the second
    /// names a requirement (checked first) or capability holding the property,
    /// or else is itself the property and the rest is a path into its value.
    fn locate<'a>(&'a self, tpl: &'a TopologyTemplate, issues: &mut IssueCollector) -> Option<Located<'a>> {
        if self.args.len() < 2 {
            arity(
                GET_PROPERTY,
                "at least 2 arguments: \"node_template_name\", \"req_or_cap\" (optional), \"property_name\"",
                self.args.len(),
                issues,
            );
            return None;
        }
        let reference = self.text_arg(0, "the node template name", issues)?;
        let second = self.text_arg(1, "the property or requirement name", issues)?;

        if self.args.len() == 2 {
            let wants = |n: &NodeTemplate| declares_property(tpl, n, second);
            let entity = find_entity(tpl, &self.context, reference, GET_PROPERTY, second, &wants, issues)?;
            return match entity {
                Entity::Relationship(r) if r.properties.contains_key(second) => Some(Located {
                    values: &r.properties,
                    context: entity.context(),
                    property: second,
                    path: &[],
                }),
                Entity::Relationship(r) => {
                    not_found(&format!("relationship template \"{}\"", r.name), second, issues);
                    None
                }
                Entity::Node(n) => {
                    if n.properties.contains_key(second) {
                        return Some(Located {
                            values: &n.properties,
                            context: entity.context(),
                            property: second,
                            path: &[],
                        });
                    }
                    // fall back to capability properties
                    match n.capabilities.values().find(|c| c.properties.contains_key(second)) {
                        Some(cap) => Some(Located {
                            values: &cap.properties,
                            context: entity.context(),
                            property: second,
                            path: &[],
                        }),
                        None => {
                            not_found(&format!("node template \"{}\"", n.name), second, issues);
                            None
                        }
                    }
                }
            };
        }

        let wants = |n: &NodeTemplate| {
            n.requirement(second).is_some()
                || n.capability(second).is_some()
                || declares_property(tpl, n, second)
        };
        let entity = find_entity(tpl, &self.context, reference, GET_PROPERTY, second, &wants, issues)?;
        let node = match entity {
            Entity::Relationship(r) => {
                if r.properties.contains_key(second) {
                    return Some(Located {
                        values: &r.properties,
                        context: entity.context(),
                        property: second,
                        path: &self.args[2..],
                    });
                }
                not_found(&format!("relationship template \"{}\"", r.name), second, issues);
                return None;
            }
            Entity::Node(n) => n,
        };

        if let Some(req) = node.requirement(second) {
            let property = self.text_arg(2, "the property name", issues)?;
            let Some(target) = tpl.node_template(&req.node) else {
                issues.push(
                    IssueCode::NodeTemplateNotFound,
                    format!(
                        "{}: node template \"{}\" of requirement \"{}\" was not found.",
                        GET_PROPERTY, req.node, req.name
                    ),
                );
                return None;
            };
            let context = Context::NodeTemplate(target.name.clone());
            let path = &self.args[3..];
            if target.properties.contains_key(property) {
                return Some(Located { values: &target.properties, context, property, path });
            }
            if let Some(cap) = req.capability.as_deref().and_then(|c| target.capability(c)) {
                if cap.properties.contains_key(property) {
                    return Some(Located { values: &cap.properties, context, property, path });
                }
            }
            not_found(&format!("node template \"{}\"", target.name), property, issues);
            return None;
        }

        if let Some(cap) = node.capability(second) {
            let property = self.text_arg(2, "the property name", issues)?;
            if cap.properties.contains_key(property) {
                return Some(Located {
                    values: &cap.properties,
                    context: entity.context(),
                    property,
                    path: &self.args[3..],
                });
            }
            not_found(
                &format!("capability \"{}\" of node template \"{}\"", cap.name, node.name),
                property,
                issues,
            );
            return None;
        }

        if node.properties.contains_key(second) {
            return Some(Located {
                values: &node.properties,
                context: entity.context(),
                property: second,
                path: &self.args[2..],
            });
        }

        issues.push(
            IssueCode::RequirementOrCapabilityNotFound,
            format!(
                "{}: requirement or capability \"{}\" was not found in node template \"{}\".",
                GET_PROPERTY, second, node.name
            ),
        );
        None
    }

    pub(crate) fn resolve(
        &self,
        tpl: &TopologyTemplate,
        depth: usize,
        issues: &mut IssueCollector,
    ) -> Option<Value> {
        let located = self.locate(tpl, issues)?;
        let value = located.values.get(located.property)?;
        walk_path(GET_PROPERTY, value, located.path, tpl, &located.context, depth, issues)
    }
}
