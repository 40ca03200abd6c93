//! The hosting graph: which node templates a node is hosted on.
use super::node::{NodeTemplate, RequirementAssignment};
use crate::issues::{IssueCode, IssueCollector};
use crate::types::TypeRegistry;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::prelude::StableDiGraph;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};

/// Edges run from a node template to the templates its requirements point at
/// through a hosting capability. Edge weights are requirement names.
#[derive(Debug, Clone, Default)]
pub struct HostingGraph {
    graph: StableDiGraph<String, String>,
    index: HashMap<String, NodeIndex>,
}

/// True if the requirement lands on a capability that can host a node.
///
/// The capability named on the assignment wins, then the one declared on the
/// requirement definition; with neither, any hosting capability of the target
/// will do.
pub fn is_hosting_requirement(
    req: &RequirementAssignment,
    source: &NodeTemplate,
    target: &NodeTemplate,
    registry: &TypeRegistry,
) -> bool {
    let target_caps = registry.capabilities(&target.type_name);
    let declared = registry
        .requirements(&source.type_name)
        .get(req.name.as_str())
        .and_then(|d| d.capability.clone());
    match req.capability.clone().or(declared) {
        Some(cap) => {
            let cap_type = target_caps
                .get(cap.as_str())
                .map(|c| c.type_name.as_str())
                .unwrap_or(cap.as_str());
            registry.is_hosting_capability(cap_type)
        }
        None => target_caps
            .values()
            .any(|c| registry.is_hosting_capability(&c.type_name)),
    }
}

impl HostingGraph {
    pub fn build(nodes: &BTreeMap<String, NodeTemplate>, registry: &TypeRegistry) -> Self {
        let mut hosting = HostingGraph::default();
        for name in nodes.keys() {
            let idx = hosting.graph.add_node(name.clone());
            hosting.index.insert(name.clone(), idx);
        }
        for (name, node) in nodes {
            for req in &node.requirements {
                let Some(target) = nodes.get(&req.node) else {
                    continue;
                };
                if is_hosting_requirement(req, node, target, registry) {
                    hosting
                        .graph
                        .add_edge(hosting.index[name], hosting.index[&req.node], req.name.clone());
                }
            }
        }
        log::trace!("hosting graph has {} edges", hosting.graph.edge_count());
        hosting
    }

    /// Templates `name` is directly hosted on, in requirement order.
    pub fn hosts_of(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges(idx).collect();
        edges.sort_by_key(|e| e.id().index());
        edges
            .into_iter()
            .filter_map(|e| self.graph.node_weight(e.target()).map(String::as_str))
            .collect()
    }

    /// Groups of templates that host each other in a loop.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut names: Vec<String> = scc
                    .iter()
                    .filter_map(|&i| self.graph.node_weight(i).cloned())
                    .collect();
                names.sort();
                names
            })
            .collect()
    }

    pub fn report_cycles(&self, issues: &mut IssueCollector) {
        for cycle in self.cycles() {
            issues.push(
                IssueCode::CycleDetected,
                format!(
                    "Node templates \"{}\" are hosted on each other.",
                    cycle.join("\", \"")
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn nodes(text: &str) -> (BTreeMap<String, NodeTemplate>, TypeRegistry) {
        let registry = TypeRegistry::normative();
        let mut issues = IssueCollector::new();
        let raw = Value::from_yaml(&serde_yaml::from_str(text).unwrap());
        let nodes = raw
            .as_map()
            .unwrap()
            .iter()
            .filter_map(|(n, body)| NodeTemplate::parse(n, body, &registry, &mut issues).map(|t| (n.clone(), t)))
            .collect();
        (nodes, registry)
    }

    #[test]
    fn test_hosting_edges() {
        let (nodes, registry) = nodes(
            r#"
server: {type: Compute}
dbms:
  type: DBMS
  requirements:
    - host: server
db:
  type: Database
  properties: {name: shop}
  requirements:
    - host: dbms
    - dependency: server
"#,
        );
        let graph = HostingGraph::build(&nodes, &registry);
        assert_eq!(graph.hosts_of("db"), vec!["dbms"]);
        assert_eq!(graph.hosts_of("dbms"), vec!["server"]);
        assert!(graph.hosts_of("server").is_empty());
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_hosting_cycle() {
        let (nodes, registry) = nodes(
            r#"
a: {type: DBMS, requirements: [{host: b}]}
b: {type: DBMS, requirements: [{host: {node: a, capability: host}}]}
"#,
        );
        let graph = HostingGraph::build(&nodes, &registry);
        assert_eq!(graph.cycles(), vec![vec!["a".to_string(), "b".to_string()]]);
        let mut issues = IssueCollector::new();
        graph.report_cycles(&mut issues);
        assert!(issues.has_code(IssueCode::CycleDetected));
    }
}
