//! Resolution of the node reference every graph function starts from.
use super::{Context, HOST, SELF, SOURCE, TARGET};
use crate::issues::{IssueCode, IssueCollector};
use crate::topology::{NodeTemplate, RelationshipTemplate, TopologyTemplate};
use crate::types::HOSTED_ON;
use std::collections::HashSet;

/// The template a function argument refers to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Entity<'t> {
    Node(&'t NodeTemplate),
    Relationship(&'t RelationshipTemplate),
}

impl<'t> Entity<'t> {
    pub fn context(&self) -> Context {
        match self {
            Entity::Node(n) => Context::NodeTemplate(n.name.clone()),
            Entity::Relationship(r) => Context::RelationshipTemplate(r.name.clone()),
        }
    }
}

fn invalid_context(fname: &str, keyword: &str, context: &Context, issues: &mut IssueCollector) {
    issues.push(
        IssueCode::InvalidContext,
        format!(
            "{}: keyword \"{}\" cannot be used in {}.",
            fname, keyword, context
        ),
    );
}

fn node<'t>(
    tpl: &'t TopologyTemplate,
    fname: &str,
    name: &str,
    issues: &mut IssueCollector,
) -> Option<&'t NodeTemplate> {
    let found = tpl.node_template(name);
    if found.is_none() {
        issues.push(
            IssueCode::NodeTemplateNotFound,
            format!("{}: node template \"{}\" was not found.", fname, name),
        );
    }
    found
}

/// Resolves `reference` (a template name or `SELF`, `HOST`, `SOURCE`,
/// `TARGET`) in `context`.
///
/// `HOST` walks the hosting chain until `wants` accepts a node; `sought`
/// names what was looked for in the report when nothing does.
pub(crate) fn find_entity<'t>(
    tpl: &'t TopologyTemplate,
    context: &Context,
    reference: &str,
    fname: &str,
    sought: &str,
    wants: &dyn Fn(&NodeTemplate) -> bool,
    issues: &mut IssueCollector,
) -> Option<Entity<'t>> {
    match reference {
        SELF => match context {
            Context::NodeTemplate(name) => node(tpl, fname, name, issues).map(Entity::Node),
            Context::RelationshipTemplate(name) => {
                tpl.relationship_template(name).map(Entity::Relationship)
            }
            other => {
                invalid_context(fname, SELF, other, issues);
                None
            }
        },
        HOST => match context {
            Context::NodeTemplate(name) => {
                let start = node(tpl, fname, name, issues)?;
                find_host(tpl, start, fname, sought, wants, issues).map(Entity::Node)
            }
            other => {
                invalid_context(fname, HOST, other, issues);
                None
            }
        },
        SOURCE | TARGET => match context {
            Context::RelationshipTemplate(name) => {
                let rel = tpl.relationship_template(name)?;
                let end = if reference == SOURCE { &rel.source } else { &rel.target };
                match end {
                    Some(node_name) => node(tpl, fname, node_name, issues).map(Entity::Node),
                    None => {
                        issues.push(
                            IssueCode::NodeTemplateNotFound,
                            format!(
                                "{}: relationship template \"{}\" has no {} node template.",
                                fname,
                                name,
                                reference.to_lowercase()
                            ),
                        );
                        None
                    }
                }
            }
            other => {
                invalid_context(fname, reference, other, issues);
                None
            }
        },
        name => node(tpl, fname, name, issues).map(Entity::Node),
    }
}

/// Walks the hosting chain up from `start` and returns the first host that
/// `wants` accepts.
///
/// At each node the hosts are tried in requirement order; when none is
/// accepted the walk continues from the first one.
pub(crate) fn find_host<'t>(
    tpl: &'t TopologyTemplate,
    start: &'t NodeTemplate,
    fname: &str,
    sought: &str,
    wants: &dyn Fn(&NodeTemplate) -> bool,
    issues: &mut IssueCollector,
) -> Option<&'t NodeTemplate> {
    let max_hops = tpl.limits().max_host_chain;
    let mut visited = HashSet::from([start.name.as_str()]);
    let mut current = start;
    let mut hops = 0;
    loop {
        let mut next = None;
        for host in tpl.hosting().hosts_of(&current.name) {
            let Some(candidate) = tpl.node_template(host) else {
                continue;
            };
            if wants(candidate) {
                log::trace!("{}: {} is hosted on {}", fname, start.name, candidate.name);
                return Some(candidate);
            }
            next = next.or(Some(candidate));
        }
        let Some(next) = next else {
            break;
        };
        hops += 1;
        if hops >= max_hops {
            issues.push(
                IssueCode::DepthExceeded,
                format!(
                    "{}: relationship chain \"{}\" from node template \"{}\" is longer than {} hops.",
                    fname, HOSTED_ON, start.name, max_hops
                ),
            );
            return None;
        }
        if !visited.insert(next.name.as_str()) {
            issues.push(
                IssueCode::CycleDetected,
                format!(
                    "{}: relationship chain \"{}\" from node template \"{}\" loops back to \"{}\".",
                    fname, HOSTED_ON, start.name, next.name
                ),
            );
            return None;
        }
        current = next;
    }
    issues.push(
        IssueCode::HostNotFound,
        format!(
            "{}: \"{}\" of node template \"{}\" was not found in relationship chain \"{}\".",
            fname, sought, start.name, HOSTED_ON
        ),
    );
    None
}
