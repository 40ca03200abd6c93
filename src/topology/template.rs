//! The topology template: every node, relationship, input, output and policy
//! of one service template, with functions converted and the hosting graph
//! built.
use super::graph::HostingGraph;
use super::inputs::{Input, Output, Policy, SubstitutionMappings};
use super::node::{NodeTemplate, RelationshipTemplate};
use crate::config::{Limits, ParserConfig};
use crate::functions::{convert_all, get_function, Context};
use crate::issues::{IssueCode, IssueCollector};
use crate::types::TypeRegistry;
use crate::value::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

const TOPOLOGY_KEYS: &[&str] = &[
    "description",
    "inputs",
    "node_templates",
    "relationship_templates",
    "outputs",
    "groups",
    "policies",
    "substitution_mappings",
    "workflows",
];

#[derive(Debug, Clone)]
pub struct TopologyTemplate {
    registry: Arc<TypeRegistry>,
    limits: Limits,
    resolve_get_input: bool,
    /// Nesting level; the main template is 0.
    depth: usize,
    pub description: Option<String>,
    pub inputs: BTreeMap<String, Input>,
    pub node_templates: BTreeMap<String, NodeTemplate>,
    pub relationship_templates: BTreeMap<String, RelationshipTemplate>,
    pub outputs: BTreeMap<String, Output>,
    pub policies: BTreeMap<String, Policy>,
    pub substitution_mappings: Option<SubstitutionMappings>,
    parsed_params: BTreeMap<String, Value>,
    hosting: HostingGraph,
}

/// Named entries of a section given either as a map or as a list of
/// single-key maps.
fn named_entries(owner: &str, section: Option<&Value>, issues: &mut IssueCollector) -> Vec<(String, Value)> {
    match section {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Map(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Some(Value::List(items)) => items
            .iter()
            .filter_map(|item| match item.as_map().filter(|m| m.len() == 1) {
                Some(m) => m.iter().next().map(|(k, v)| (k.clone(), v.clone())),
                None => {
                    issues.push(
                        IssueCode::InvalidSchema,
                        format!("{} entry \"{}\" must be a single-key map.", owner, item),
                    );
                    None
                }
            })
            .collect(),
        Some(other) => {
            issues.push(
                IssueCode::InvalidSchema,
                format!("{} must be a map, got \"{}\".", owner, other),
            );
            Vec::new()
        }
    }
}

impl TopologyTemplate {
    /// Builds the topology from the `topology_template` section.
    ///
    /// `params` are the values supplied for the inputs; when given, required
    /// inputs without a default must be among them.
    pub fn new(
        raw: &Value,
        registry: Arc<TypeRegistry>,
        config: &ParserConfig,
        params: Option<&BTreeMap<String, Value>>,
        depth: usize,
        issues: &mut IssueCollector,
    ) -> Self {
        let empty = BTreeMap::new();
        let map = match raw {
            Value::Map(map) => map,
            Value::Null => &empty,
            other => {
                issues.push(
                    IssueCode::InvalidSchema,
                    format!("Topology template must be a map, got \"{}\".", other),
                );
                &empty
            }
        };
        for key in map.keys().filter(|k| !TOPOLOGY_KEYS.contains(&k.as_str())) {
            issues.push(
                IssueCode::UnknownField,
                format!("Topology template contains unknown field \"{}\".", key),
            );
        }

        let mut tpl = TopologyTemplate {
            registry,
            limits: config.limits(),
            resolve_get_input: config.resolve_get_input,
            depth,
            description: map.get("description").and_then(Value::as_str).map(str::to_string),
            inputs: BTreeMap::new(),
            node_templates: BTreeMap::new(),
            relationship_templates: BTreeMap::new(),
            outputs: BTreeMap::new(),
            policies: BTreeMap::new(),
            substitution_mappings: None,
            parsed_params: params.cloned().unwrap_or_default(),
            hosting: HostingGraph::default(),
        };
        log::debug!("building topology template at depth {}", depth);

        tpl.parse_inputs(map.get("inputs"), params.is_some(), issues);
        tpl.parse_templates(map, issues);
        tpl.check_requirements(issues);
        tpl.link_relationships();
        tpl.hosting = HostingGraph::build(&tpl.node_templates, &tpl.registry);
        tpl.hosting.report_cycles(issues);

        for (name, raw) in named_entries("Outputs", map.get("outputs"), issues) {
            if let Some(output) = Output::parse(&name, &raw, issues) {
                tpl.outputs.insert(name, output);
            }
        }
        for (name, raw) in named_entries("Policies", map.get("policies"), issues) {
            if let Some(policy) = Policy::parse(&name, &raw, &tpl.registry, issues) {
                policy.check_targets(|t| tpl.node_templates.contains_key(t), issues);
                tpl.policies.insert(name, policy);
            }
        }
        if let Some(raw) = map.get("substitution_mappings") {
            tpl.substitution_mappings = SubstitutionMappings::parse(raw, &tpl.registry, issues);
        }

        tpl.convert_functions(issues);
        log::debug!(
            "topology template at depth {}: {} node template(s), {} issue(s) so far",
            depth,
            tpl.node_templates.len(),
            issues.len()
        );
        tpl
    }

    fn parse_inputs(&mut self, section: Option<&Value>, params_supplied: bool, issues: &mut IssueCollector) {
        for (name, raw) in named_entries("Inputs", section, issues) {
            let supplied = self.parsed_params.get(&name);
            let Some(input) = Input::parse(&name, &raw, supplied, &self.registry, issues) else {
                continue;
            };
            if params_supplied && supplied.is_none() && input.default().is_none() && input.schema.required() {
                issues.push(
                    IssueCode::MissingRequiredField,
                    format!("Input \"{}\" is required but no value was supplied.", name),
                );
            }
            self.inputs.insert(name, input);
        }
    }

    fn parse_templates(&mut self, map: &BTreeMap<String, Value>, issues: &mut IssueCollector) {
        let registry = Arc::clone(&self.registry);
        for (name, raw) in named_entries("Relationship templates", map.get("relationship_templates"), issues) {
            if let Some(rel) = RelationshipTemplate::parse(&name, &raw, &registry, issues) {
                self.relationship_templates.insert(name, rel);
            }
        }
        for (name, raw) in named_entries("Node templates", map.get("node_templates"), issues) {
            if let Some(node) = NodeTemplate::parse(&name, &raw, &registry, issues) {
                self.node_templates.insert(name, node);
            }
        }
    }

    /// Requirement targets must be node templates of this topology, and named
    /// relationships must be templates or known types.
    fn check_requirements(&self, issues: &mut IssueCollector) {
        for node in self.node_templates.values() {
            for req in &node.requirements {
                if !self.node_templates.contains_key(&req.node) {
                    issues.push(
                        IssueCode::NodeTemplateNotFound,
                        format!(
                            "Requirement \"{}\" of node template \"{}\" targets node template \"{}\" which was not found.",
                            req.name, node.name, req.node
                        ),
                    );
                }
                if let Some(rel) = &req.relationship {
                    if !self.relationship_templates.contains_key(rel)
                        && self.registry.relationship_type(rel).is_none()
                    {
                        issues.push(
                            IssueCode::UnknownType,
                            format!(
                                "Requirement \"{}\" of node template \"{}\" uses unknown relationship \"{}\".",
                                req.name, node.name, rel
                            ),
                        );
                    }
                }
            }
        }
    }

    /// Gives relationship templates the source and target of the first
    /// requirement that uses them.
    fn link_relationships(&mut self) {
        for node in self.node_templates.values() {
            for req in &node.requirements {
                let Some(rel) = req
                    .relationship
                    .as_ref()
                    .and_then(|r| self.relationship_templates.get_mut(r))
                else {
                    continue;
                };
                if rel.source.is_some() {
                    log::debug!(
                        "relationship template {} already linked, ignoring use by {}",
                        rel.name,
                        node.name
                    );
                    continue;
                }
                rel.source = Some(node.name.clone());
                rel.target = Some(req.node.clone());
            }
        }
    }

    /// Replaces function-shaped maps with functions everywhere values can
    /// hold them. Values are converted against the unconverted topology
    /// first and written back afterwards.
    fn convert_functions(&mut self, issues: &mut IssueCollector) {
        let this: &Self = self;
        let resolve = this.resolve_get_input;

        let mut nodes = Vec::new();
        for (name, node) in &this.node_templates {
            let ctx = Context::NodeTemplate(name.clone());
            let own = (
                convert_all(this, &ctx, &node.properties, resolve, issues),
                convert_all(this, &ctx, &node.attributes, resolve, issues),
                convert_all(this, &ctx, &node.interfaces, resolve, issues),
            );
            let mut caps = Vec::new();
            for (cap_name, cap) in &node.capabilities {
                caps.push((
                    cap_name.clone(),
                    convert_all(this, &ctx, &cap.properties, resolve, issues),
                    convert_all(this, &ctx, &cap.attributes, resolve, issues),
                ));
            }
            nodes.push((name.clone(), own, caps));
        }

        let mut rels = Vec::new();
        for (name, rel) in &this.relationship_templates {
            let ctx = Context::RelationshipTemplate(name.clone());
            rels.push((
                name.clone(),
                (
                    convert_all(this, &ctx, &rel.properties, resolve, issues),
                    convert_all(this, &ctx, &rel.attributes, resolve, issues),
                    convert_all(this, &ctx, &rel.interfaces, resolve, issues),
                ),
            ));
        }

        let mut outputs = Vec::new();
        for (name, out) in &this.outputs {
            outputs.push((name.clone(), get_function(this, &Context::Outputs, &out.value, resolve, issues)));
        }
        let mut policies = Vec::new();
        for (name, policy) in &this.policies {
            policies.push((
                name.clone(),
                convert_all(this, &Context::Topology, &policy.properties, resolve, issues),
            ));
        }

        for (name, (properties, attributes, interfaces), caps) in nodes {
            let Some(node) = self.node_templates.get_mut(&name) else {
                continue;
            };
            node.properties = properties;
            node.attributes = attributes;
            node.interfaces = interfaces;
            for (cap_name, properties, attributes) in caps {
                if let Some(cap) = node.capabilities.get_mut(&cap_name) {
                    cap.properties = properties;
                    cap.attributes = attributes;
                }
            }
        }
        for (name, (properties, attributes, interfaces)) in rels {
            if let Some(rel) = self.relationship_templates.get_mut(&name) {
                rel.properties = properties;
                rel.attributes = attributes;
                rel.interfaces = interfaces;
            }
        }
        for (name, value) in outputs {
            if let Some(out) = self.outputs.get_mut(&name) {
                out.value = value;
            }
        }
        for (name, properties) in policies {
            if let Some(policy) = self.policies.get_mut(&name) {
                policy.properties = properties;
            }
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub(crate) fn shared_registry(&self) -> Arc<TypeRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn hosting(&self) -> &HostingGraph {
        &self.hosting
    }

    pub fn node_template(&self, name: &str) -> Option<&NodeTemplate> {
        self.node_templates.get(name)
    }

    pub(crate) fn node_template_mut(&mut self, name: &str) -> Option<&mut NodeTemplate> {
        self.node_templates.get_mut(name)
    }

    pub fn relationship_template(&self, name: &str) -> Option<&RelationshipTemplate> {
        self.relationship_templates.get(name)
    }

    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    pub fn parsed_param(&self, name: &str) -> Option<&Value> {
        self.parsed_params.get(name)
    }

    /// Property values of a node template with every resolvable function
    /// replaced by its result, at any depth. Deferred functions stay in place
    /// and properties whose lookup fails are left out.
    pub fn resolved_properties(&self, node_name: &str, issues: &mut IssueCollector) -> BTreeMap<String, Value> {
        let Some(node) = self.node_template(node_name) else {
            return BTreeMap::new();
        };
        node.properties
            .iter()
            .filter_map(|(name, value)| Some((name.clone(), self.resolve_value(value, issues)?)))
            .collect()
    }

    /// Output values with every resolvable function replaced by its result.
    pub fn output_values(&self, issues: &mut IssueCollector) -> BTreeMap<String, Value> {
        self.outputs
            .iter()
            .filter_map(|(name, out)| Some((name.clone(), self.resolve_value(&out.value, issues)?)))
            .collect()
    }

    /// Resolves every function inside `value`. Fails if any lookup does.
    fn resolve_value(&self, value: &Value, issues: &mut IssueCollector) -> Option<Value> {
        match value {
            Value::Function(f) => f.result(self, issues),
            Value::List(items) if value.contains_function() => items
                .iter()
                .map(|item| self.resolve_value(item, issues))
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            Value::Map(map) if value.contains_function() => map
                .iter()
                .map(|(k, v)| Some((k.clone(), self.resolve_value(v, issues)?)))
                .collect::<Option<BTreeMap<_, _>>>()
                .map(Value::Map),
            other => Some(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{is_function, Function};
    use rstest::rstest;

    const APP_TYPES: &str = r#"
node_types:
  my.nodes.Server:
    derived_from: tosca.nodes.Compute
    properties:
      db_port: {type: integer, required: false}
      region: {type: string, required: false}
  my.nodes.App:
    derived_from: tosca.nodes.SoftwareComponent
    properties:
      port: {type: integer, required: false}
      endpoint: {type: string, required: false}
      label: {type: string, required: false}
      tags: {type: list, required: false, entry_schema: string}
"#;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    fn registry() -> Arc<TypeRegistry> {
        let mut registry = TypeRegistry::normative();
        let mut issues = IssueCollector::new();
        registry.load_definitions(yaml(APP_TYPES).as_map().unwrap(), &mut issues);
        assert!(issues.is_empty(), "{:?}", issues.report());
        Arc::new(registry)
    }

    fn build_with(text: &str, params: Option<&BTreeMap<String, Value>>) -> (TopologyTemplate, IssueCollector) {
        let mut issues = IssueCollector::new();
        let tpl = TopologyTemplate::new(&yaml(text), registry(), &ParserConfig::default(), params, 0, &mut issues);
        (tpl, issues)
    }

    fn build(text: &str) -> (TopologyTemplate, IssueCollector) {
        build_with(text, None)
    }

    fn property(tpl: &TopologyTemplate, node: &str, name: &str, issues: &mut IssueCollector) -> Option<Value> {
        match &tpl.node_template(node).unwrap().properties[name] {
            Value::Function(f) => f.result(tpl, issues),
            other => Some(other.clone()),
        }
    }

    const HOSTED: &str = r#"
inputs:
  web_port: {type: integer, default: 8080}
node_templates:
  server:
    type: my.nodes.Server
    properties:
      db_port: 5432
  app:
    type: my.nodes.App
    properties:
      port: {get_input: web_port}
      endpoint: {get_property: [SELF, port]}
      label: {get_property: [HOST, db_port]}
    requirements:
      - host: server
"#;

    #[test]
    fn test_self_and_host_lookups() {
        let (tpl, mut issues) = build(HOSTED);
        assert!(issues.is_empty(), "{:?}", issues.report());
        assert_eq!(property(&tpl, "app", "endpoint", &mut issues), Some(Value::Int(8080)));
        assert_eq!(property(&tpl, "app", "label", &mut issues), Some(Value::Int(5432)));
        assert_eq!(tpl.hosting().hosts_of("app"), vec!["server"]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_host_without_property() {
        let (_, issues) = build(
            r#"
node_templates:
  server:
    type: my.nodes.Server
  app:
    type: my.nodes.App
    properties:
      label: {get_property: [HOST, missing]}
    requirements:
      - host: server
"#,
        );
        assert_eq!(issues.count_code(IssueCode::HostNotFound), 1);
        assert!(issues.report()[0].contains("tosca.relationships.HostedOn"), "{:?}", issues.report());
    }

    #[test]
    fn test_host_capability_values_satisfy_the_walk() {
        let (tpl, mut issues) = build(
            r#"
node_templates:
  server:
    type: tosca.nodes.Compute
    capabilities:
      host:
        properties:
          num_cpus: 2
        attributes:
          load: 0.5
  app:
    type: my.nodes.App
    properties:
      port: {get_property: [HOST, num_cpus]}
      label: {get_attribute: [HOST, load]}
    requirements:
      - host: server
"#,
        );
        assert!(issues.is_empty(), "{:?}", issues.report());
        assert_eq!(property(&tpl, "app", "port", &mut issues), Some(Value::Int(2)));
        assert!(!issues.has_code(IssueCode::HostNotFound), "{:?}", issues.report());
    }

    #[test]
    fn test_unknown_input_is_reported_at_conversion() {
        let (tpl, issues) = build(
            r#"
node_templates:
  server:
    type: my.nodes.Server
    properties:
      region: {get_input: region}
"#,
        );
        assert!(issues.has_code(IssueCode::UnknownInput));
        assert!(tpl.node_template("server").unwrap().properties["region"].is_function());
    }

    #[rstest]
    #[case("{concat: [a, b]}")]
    #[case("{get_operation_output: [SELF, Standard, create, out]}")]
    #[case("{get_attribute: [SELF, tosca_id]}")]
    fn test_deferred_functions_return_themselves(#[case] function: &str) {
        let text = format!(
            "node_templates:\n  app:\n    type: my.nodes.App\n    properties:\n      label: {}\n",
            function
        );
        let (tpl, mut issues) = build(&text);
        assert!(issues.is_empty(), "{:?}", issues.report());
        let value = tpl.node_template("app").unwrap().properties["label"].clone();
        let Value::Function(f) = &value else {
            panic!("expected a function, got {}", value);
        };
        assert!(f.is_deferred());
        assert_eq!(f.result(&tpl, &mut issues), Some(value.clone()));
    }

    #[test]
    fn test_get_function_is_idempotent() {
        let (tpl, mut issues) = build(HOSTED);
        let ctx = Context::NodeTemplate("app".into());
        let raw = yaml("{a: [{get_property: [SELF, port]}, 3], b: {concat: [x, {get_input: web_port}]}}");
        let once = get_function(&tpl, &ctx, &raw, false, &mut issues);
        let twice = get_function(&tpl, &ctx, &once, false, &mut issues);
        assert_eq!(once, twice);
        assert!(is_function(&once.get("a").unwrap().as_list().unwrap()[0]));
        assert!(issues.is_empty(), "{:?}", issues.report());
    }

    #[test]
    fn test_resolve_get_input_inlines_known_values() {
        let mut issues = IssueCollector::new();
        let config = ParserConfig { resolve_get_input: true, ..ParserConfig::default() };
        let tpl = TopologyTemplate::new(&yaml(HOSTED), registry(), &config, None, 0, &mut issues);
        assert_eq!(tpl.node_template("app").unwrap().properties["port"], Value::Int(8080));
    }

    #[test]
    fn test_supplied_params_win_over_defaults() {
        let params = BTreeMap::from([("web_port".to_string(), Value::Int(9000))]);
        let (tpl, mut issues) = build_with(HOSTED, Some(&params));
        assert_eq!(property(&tpl, "app", "endpoint", &mut issues), Some(Value::Int(9000)));
    }

    #[test]
    fn test_missing_required_input() {
        let params = BTreeMap::new();
        let (_, issues) = build_with("inputs:\n  region: {type: string}\n", Some(&params));
        assert!(issues.has_code(IssueCode::MissingRequiredField));
        let (_, issues) = build("inputs:\n  region: {type: string}\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_get_input_index_and_path() {
        let (tpl, mut issues) = build(
            r#"
inputs:
  zones: {type: list, entry_schema: string, default: [eu, us]}
node_templates:
  app:
    type: my.nodes.App
    properties:
      tags: [{get_input: [zones, 1]}]
      label: {get_input: [zones, 5]}
      endpoint: {get_property: [SELF, tags, 0]}
"#,
        );
        assert_eq!(property(&tpl, "app", "label", &mut issues), None);
        assert!(issues.has_code(IssueCode::IndexMismatch));
        assert_eq!(property(&tpl, "app", "endpoint", &mut issues), Some(Value::from("us")));
        let resolved = tpl.resolved_properties("app", &mut issues);
        assert_eq!(resolved["tags"], Value::List(vec![Value::from("us")]));
        assert!(!resolved.contains_key("label"));
    }

    #[test]
    fn test_requirement_and_capability_lookups() {
        let (tpl, mut issues) = build(
            r#"
node_templates:
  server:
    type: my.nodes.Server
    properties:
      region: eu-west
    capabilities:
      host:
        properties:
          num_cpus: 4
  app:
    type: my.nodes.App
    properties:
      label: {get_property: [SELF, host, region]}
      endpoint: {get_property: [server, host, num_cpus]}
      tags: [{get_property: [SELF, nope, x]}]
    requirements:
      - host: server
"#,
        );
        assert_eq!(property(&tpl, "app", "label", &mut issues), Some(Value::from("eu-west")));
        assert_eq!(property(&tpl, "app", "endpoint", &mut issues), Some(Value::Int(4)));
        assert!(issues.has_code(IssueCode::RequirementOrCapabilityNotFound));
    }

    #[rstest]
    #[case("{get_property: [SOURCE, port]}", IssueCode::InvalidContext)]
    #[case("{get_property: [ghost, port]}", IssueCode::NodeTemplateNotFound)]
    #[case("{get_property: [SELF, nope]}", IssueCode::PropertyNotFound)]
    #[case("{get_property: [SELF]}", IssueCode::FunctionArity)]
    #[case("{get_attribute: [SELF, nope]}", IssueCode::AttributeNotFound)]
    #[case("{get_attribute: [SELF, tags, key]}", IssueCode::IndexMismatch)]
    #[case("{get_operation_output: [SELF, Maintenance, create, out]}", IssueCode::UnknownInterface)]
    #[case("{get_operation_output: [SELF, Standard, restart, out]}", IssueCode::UnknownOperation)]
    #[case("{get_operation_output: [SELF, Standard, create]}", IssueCode::FunctionArity)]
    #[case("{get_operation_output: [HOST, Standard, create, out]}", IssueCode::InvalidContext)]
    #[case("{token: [a.b, '..', 1]}", IssueCode::FunctionArgument)]
    #[case("{token: [a.b, '.']}", IssueCode::FunctionArity)]
    #[case("{get_input: [a, b, c]}", IssueCode::FunctionArity)]
    fn test_argument_problems(#[case] function: &str, #[case] code: IssueCode) {
        let text = format!(
            "node_templates:\n  app:\n    type: my.nodes.App\n    properties:\n      label: {}\n",
            function
        );
        let (_, issues) = build(&text);
        assert!(issues.has_code(code), "{:?}", issues.report());
    }

    #[test]
    fn test_relationship_templates_are_linked() {
        let (tpl, mut issues) = build(
            r#"
relationship_templates:
  attach:
    type: tosca.relationships.AttachesTo
    properties:
      location: /mnt
      device: {get_property: [TARGET, volume_id]}
node_templates:
  disk:
    type: tosca.nodes.BlockStorage
    properties:
      size: 10 GB
      volume_id: vol-1
  server:
    type: my.nodes.Server
    requirements:
      - local_storage: {node: disk, relationship: attach}
"#,
        );
        assert!(issues.is_empty(), "{:?}", issues.report());
        let rel = tpl.relationship_template("attach").unwrap();
        assert_eq!(rel.source.as_deref(), Some("server"));
        assert_eq!(rel.target.as_deref(), Some("disk"));
        let Value::Function(f) = &rel.properties["device"] else {
            panic!("device must be a function");
        };
        assert_eq!(f.result(&tpl, &mut issues), Some(Value::from("vol-1")));
    }

    #[test]
    fn test_hosting_cycle_and_missing_target() {
        let (_, issues) = build(
            r#"
node_templates:
  a:
    type: tosca.nodes.WebServer
    requirements:
      - host: {node: b, capability: host}
  b:
    type: tosca.nodes.WebServer
    requirements:
      - host: {node: a, capability: host}
  c:
    type: my.nodes.App
    requirements:
      - host: nowhere
"#,
        );
        assert_eq!(issues.count_code(IssueCode::CycleDetected), 1);
        assert!(issues.has_code(IssueCode::NodeTemplateNotFound));
    }

    #[test]
    fn test_host_walk_stops_on_cycles() {
        let (_, issues) = build(
            r#"
node_templates:
  a:
    type: tosca.nodes.WebServer
    requirements:
      - host: {node: b, capability: host}
  b:
    type: tosca.nodes.WebServer
    requirements:
      - host: {node: a, capability: host}
  app:
    type: tosca.nodes.WebApplication
    properties:
      context_root: {get_property: [HOST, nowhere]}
    requirements:
      - host: a
"#,
        );
        assert!(issues.has_code(IssueCode::CycleDetected));
        assert!(!issues.has_code(IssueCode::HostNotFound));
    }

    #[test]
    fn test_outputs_and_policies() {
        let (tpl, mut issues) = build(
            r#"
node_templates:
  server:
    type: my.nodes.Server
    properties:
      region: eu
outputs:
  where: {value: {get_property: [server, region]}}
  own: {value: {get_property: [SELF, region]}}
policies:
  - spread:
      type: tosca.policies.Placement
      targets: [server, ghost]
"#,
        );
        assert!(issues.has_code(IssueCode::InvalidContext));
        assert!(issues.has_code(IssueCode::NodeTemplateNotFound));
        let values = tpl.output_values(&mut issues);
        assert_eq!(values["where"], Value::from("eu"));
        assert!(!values.contains_key("own"));
        assert_eq!(tpl.policies["spread"].targets, vec!["server", "ghost"]);
    }

    #[test]
    fn test_nested_function_depth_is_bounded() {
        let mut issues = IssueCollector::new();
        let config = ParserConfig { max_function_depth: 2, ..ParserConfig::default() };
        let text = r#"
node_templates:
  app:
    type: my.nodes.App
    properties:
      label: {get_property: [SELF, endpoint]}
      endpoint: {get_property: [SELF, label]}
"#;
        let tpl = TopologyTemplate::new(&yaml(text), registry(), &config, None, 0, &mut issues);
        let Value::Function(f) = &tpl.node_template("app").unwrap().properties["label"] else {
            panic!("label must be a function");
        };
        assert!(matches!(**f, Function::GetProperty(_)));
        assert_eq!(f.result(&tpl, &mut issues), None);
        assert!(issues.has_code(IssueCode::DepthExceeded));
    }
}
