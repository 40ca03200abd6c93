//! Entry point: turns service template YAML into a validated [`ToscaTemplate`].
//!
//! ```no_run
//! use tosca_parser_core::ToscaTemplate;
//!
//! let template = ToscaTemplate::builder(std::fs::read_to_string("service.yaml")?)
//!     .nested("db", std::fs::read_to_string("db.yaml")?)
//!     .parse()?;
//! println!("{} node templates", template.topology().node_templates.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
use crate::config::ParserConfig;
use crate::error::ToscaError;
use crate::issues::{ClassifiedReport, IssueCode, IssueCollector};
use crate::topology::TopologyTemplate;
use crate::types::TypeRegistry;
use crate::value::Value;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const TOSCA_VERSIONS: [&str; 4] = [
    "tosca_simple_yaml_1_0",
    "tosca_simple_yaml_1_1",
    "tosca_simple_yaml_1_2",
    "tosca_simple_yaml_1_3",
];

const SECTIONS: &[&str] = &[
    "tosca_definitions_version",
    "tosca_default_namespace",
    "template_name",
    "template_author",
    "template_version",
    "description",
    "metadata",
    "imports",
    "repositories",
    "dsl_definitions",
    "node_types",
    "capability_types",
    "relationship_types",
    "data_types",
    "interface_types",
    "artifact_types",
    "group_types",
    "policy_types",
    "relationship_templates",
    "topology_template",
];

type Document = BTreeMap<String, Value>;

fn load_document(label: &str, text: &str) -> Result<Document, ToscaError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ToscaError::MalformedTemplate(format!("{}: {}", label, e)))?;
    match Value::from_yaml(&yaml) {
        Value::Map(map) => Ok(map),
        other => Err(ToscaError::MalformedTemplate(format!(
            "{}: the root must be a mapping, got {}",
            label,
            other.kind()
        ))),
    }
}

fn check_header(label: &str, doc: &Document, issues: &mut IssueCollector) {
    match doc.get("tosca_definitions_version").and_then(Value::as_str) {
        None => {
            issues.push(
                IssueCode::MissingRequiredField,
                format!("Template \"{}\" is missing required field \"tosca_definitions_version\".", label),
            );
        }
        Some(version) if !TOSCA_VERSIONS.contains(&version) => {
            issues.push(
                IssueCode::InvalidVersion,
                format!(
                    "Template \"{}\" has unsupported tosca_definitions_version \"{}\"; expected one of \"{}\".",
                    label,
                    version,
                    TOSCA_VERSIONS.join("\", \"")
                ),
            );
        }
        Some(_) => {}
    }
    for key in doc.keys().filter(|k| !SECTIONS.contains(&k.as_str())) {
        issues.push(
            IssueCode::UnknownField,
            format!("Template \"{}\" contains unknown section \"{}\".", label, key),
        );
    }
}

/// A caller-supplied template that implements a node type through its
/// substitution mappings.
struct Nested {
    name: String,
    doc: Document,
}

impl Nested {
    fn topology(&self) -> &Value {
        self.doc.get("topology_template").unwrap_or(&Value::Null)
    }

    fn node_type<'r>(&self, registry: &'r TypeRegistry) -> Option<&'r str> {
        let declared = self
            .topology()
            .get("substitution_mappings")?
            .get("node_type")?
            .as_str()?;
        registry.node_type(declared).map(|d| d.name.as_str())
    }
}

/// Builds the sub-mapped topology of every node template whose type a nested
/// template implements, recursively.
fn attach_nested(tpl: &mut TopologyTemplate, nested: &[Nested], config: &ParserConfig, issues: &mut IssueCollector) {
    let depth = tpl.depth() + 1;
    let mut built = Vec::new();
    for node in tpl.node_templates.values() {
        let Some(sub) = nested
            .iter()
            .find(|n| n.node_type(tpl.registry()) == Some(node.type_name.as_str()))
        else {
            continue;
        };
        if depth > config.max_nested_depth {
            issues.push(
                IssueCode::DepthExceeded,
                format!(
                    "Nested template \"{}\" for node template \"{}\" exceeds the nesting limit of {}.",
                    sub.name, node.name, config.max_nested_depth
                ),
            );
            continue;
        }
        log::debug!("descending into {} for node template {} at depth {}", sub.name, node.name, depth);
        let params = tpl.resolved_properties(&node.name, issues);
        let mut child = TopologyTemplate::new(sub.topology(), tpl.shared_registry(), config, Some(&params), depth, issues);
        attach_nested(&mut child, nested, config, issues);
        built.push((node.name.clone(), child));
    }
    for (name, child) in built {
        if let Some(node) = tpl.node_template_mut(&name) {
            node.sub_mapping = Some(Box::new(child));
        }
    }
}

/// A parsed service template with every issue found along the way.
#[derive(Debug, Clone)]
pub struct ToscaTemplate {
    version: Option<String>,
    description: Option<String>,
    topology: TopologyTemplate,
    issues: IssueCollector,
    report: ClassifiedReport,
}

impl ToscaTemplate {
    pub fn builder(source: impl Into<String>) -> ToscaTemplateBuilder {
        ToscaTemplateBuilder {
            source: source.into(),
            nested: Vec::new(),
            params: None,
            config: ParserConfig::default(),
        }
    }

    /// Reads and parses a template file with the given configuration.
    pub fn from_path(path: impl AsRef<Path>, config: ParserConfig) -> Result<Self, ToscaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ToscaError::TemplateNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        Self::builder(source).config(config).parse()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn topology(&self) -> &TopologyTemplate {
        &self.topology
    }

    pub fn issues(&self) -> &IssueCollector {
        &self.issues
    }

    pub fn report(&self) -> &ClassifiedReport {
        &self.report
    }
}

pub struct ToscaTemplateBuilder {
    source: String,
    nested: Vec<(String, String)>,
    params: Option<BTreeMap<String, Value>>,
    config: ParserConfig,
}

impl ToscaTemplateBuilder {
    /// Adds a template that can implement a node type of the main one.
    pub fn nested(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.nested.push((name.into(), source.into()));
        self
    }

    /// Values for the main template's inputs.
    pub fn params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = Some(params);
        self
    }

    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses the template and fails if any critical issue was found.
    pub fn parse(self) -> Result<ToscaTemplate, ToscaError> {
        let template = self.parse_lenient()?;
        if template.report.has_critical() {
            return Err(ToscaError::ValidationFailed {
                issues: template.issues.report(),
            });
        }
        Ok(template)
    }

    /// Parses the template, keeping whatever issues were found. Fails only
    /// on structural errors.
    pub fn parse_lenient(self) -> Result<ToscaTemplate, ToscaError> {
        let ToscaTemplateBuilder { source, nested, params, config } = self;
        let mut issues = if config.capture_backtraces {
            IssueCollector::with_backtraces()
        } else {
            IssueCollector::new()
        };

        let doc = load_document("main", &source)?;
        check_header("main", &doc, &mut issues);
        let nested = nested
            .into_iter()
            .map(|(name, text)| {
                let doc = load_document(&name, &text)?;
                check_header(&name, &doc, &mut issues);
                Ok(Nested { name, doc })
            })
            .collect::<Result<Vec<_>, ToscaError>>()?;

        let mut registry = TypeRegistry::normative();
        registry.load_definitions(&doc, &mut issues);
        for sub in &nested {
            registry.load_definitions(&sub.doc, &mut issues);
        }
        let registry = Arc::new(registry);

        let raw_topology = doc.get("topology_template").unwrap_or(&Value::Null);
        let mut topology =
            TopologyTemplate::new(raw_topology, registry, &config, params.as_ref(), 0, &mut issues);
        attach_nested(&mut topology, &nested, &config, &mut issues);

        let report = ClassifiedReport::classify(&issues, &config.issue_policy());
        log::info!(
            "parsed template: {} issue(s), {} critical, {} warning(s)",
            issues.len(),
            report.critical.len(),
            report.warnings.len()
        );
        Ok(ToscaTemplate {
            version: doc.get("tosca_definitions_version").and_then(Value::as_str).map(str::to_string),
            description: doc.get("description").and_then(Value::as_str).map(str::to_string),
            topology,
            issues,
            report,
        })
    }
}

/// Parses independent templates in parallel, one result per source.
pub fn parse_all(sources: &[String], config: &ParserConfig) -> Vec<Result<ToscaTemplate, ToscaError>> {
    sources
        .par_iter()
        .map(|source| ToscaTemplate::builder(source.as_str()).config(config.clone()).parse())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::Severity;
    use rstest::rstest;
    use std::io::Write;

    const SERVICE: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
description: web service
node_types:
  my.nodes.App:
    derived_from: tosca.nodes.SoftwareComponent
    properties:
      port: {type: integer}
topology_template:
  inputs:
    app_port: {type: integer, default: 5, constraints: [{in_range: [1, 10]}]}
  node_templates:
    server:
      type: Compute
    app:
      type: my.nodes.App
      properties:
        port: {get_input: app_port}
      requirements:
        - host: server
"#;

    #[test]
    fn test_parse_service() {
        let template = ToscaTemplate::builder(SERVICE).parse().unwrap();
        assert_eq!(template.version(), Some("tosca_simple_yaml_1_3"));
        assert_eq!(template.description(), Some("web service"));
        assert!(template.issues().is_empty(), "{:?}", template.issues().report());
        assert_eq!(template.topology().hosting().hosts_of("app"), vec!["server"]);
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(10, true)]
    #[case(11, false)]
    fn test_in_range_through_params(#[case] port: i64, #[case] ok: bool) {
        let params = BTreeMap::from([("app_port".to_string(), Value::Int(port))]);
        let result = ToscaTemplate::builder(SERVICE).params(params).parse_lenient().unwrap();
        assert_eq!(result.issues().is_empty(), ok, "{:?}", result.issues().report());
        if !ok {
            assert_eq!(result.issues().count_code(IssueCode::InRangeViolation), 1);
        }
    }

    #[test]
    fn test_critical_issues_fail_the_parse() {
        let source = SERVICE.replace("type: Compute", "type: Mainframe");
        let err = ToscaTemplate::builder(source.as_str()).parse().unwrap_err();
        assert_eq!(err.code(), "TE100");
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("TS008"), "{}", err);

        let lenient = ToscaTemplate::builder(source).parse_lenient().unwrap();
        assert!(lenient.report().has_critical());
    }

    #[test]
    fn test_warnings_do_not_fail() {
        let source = format!("{}\nextra_section: 1\n", SERVICE);
        let template = ToscaTemplate::builder(source).parse().unwrap();
        assert_eq!(template.report().warnings.len(), 1);
        assert!(template.issues().has_code(IssueCode::UnknownField));
    }

    #[test]
    fn test_issue_level_overrides() {
        let source = format!("{}\nextra_section: 1\n", SERVICE);
        let mut config = ParserConfig::default();
        config.issue_levels.insert("TS002".into(), Severity::Critical);
        assert!(ToscaTemplate::builder(source).config(config).parse().is_err());
    }

    #[rstest]
    #[case("just text", "TE002")]
    #[case("a: [b", "TE002")]
    fn test_malformed_documents(#[case] source: &str, #[case] code: &str) {
        let err = ToscaTemplate::builder(source).parse_lenient().unwrap_err();
        assert_eq!(err.code(), code);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_header_checks() {
        let template = ToscaTemplate::builder("tosca_definitions_version: tosca_simple_yaml_9\n")
            .parse_lenient()
            .unwrap();
        assert!(template.issues().has_code(IssueCode::InvalidVersion));
        let template = ToscaTemplate::builder("description: no version\n")
            .parse_lenient()
            .unwrap();
        assert!(template.issues().has_code(IssueCode::MissingRequiredField));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", SERVICE).unwrap();
        let template = ToscaTemplate::from_path(file.path(), ParserConfig::default()).unwrap();
        assert_eq!(template.topology().node_templates.len(), 2);

        let err = ToscaTemplate::from_path("/no/such/service.yaml", ParserConfig::default()).unwrap_err();
        assert_eq!(err.code(), "TE001");
    }

    const MAIN: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
node_types:
  my.nodes.Database:
    derived_from: tosca.nodes.Root
    properties:
      db_name: {type: string}
topology_template:
  inputs:
    name: {type: string, default: orders}
  node_templates:
    db:
      type: my.nodes.Database
      properties:
        db_name: {get_input: name}
"#;

    const DB_IMPL: &str = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
topology_template:
  substitution_mappings:
    node_type: my.nodes.Database
  inputs:
    db_name: {type: string}
  node_templates:
    store:
      type: tosca.nodes.Database
      properties:
        name: {get_input: db_name}
"#;

    #[test]
    fn test_nested_template_gets_node_properties() {
        let template = ToscaTemplate::builder(MAIN).nested("db_impl", DB_IMPL).parse().unwrap();
        let db = template.topology().node_template("db").unwrap();
        let sub = db.sub_mapping.as_deref().expect("db must be sub-mapped");
        assert_eq!(sub.depth(), 1);
        assert_eq!(sub.parsed_param("db_name"), Some(&Value::from("orders")));
        let mut issues = IssueCollector::new();
        assert_eq!(
            sub.resolved_properties("store", &mut issues)["name"],
            Value::from("orders")
        );
    }

    #[test]
    fn test_nesting_is_bounded() {
        // the nested template implements a type it also uses
        let recursive = r#"
tosca_definitions_version: tosca_simple_yaml_1_3
topology_template:
  substitution_mappings:
    node_type: my.nodes.Database
  node_templates:
    inner:
      type: my.nodes.Database
      properties:
        db_name: inner
"#;
        let config = ParserConfig { max_nested_depth: 3, ..ParserConfig::default() };
        let template = ToscaTemplate::builder(MAIN)
            .nested("loop", recursive)
            .config(config)
            .parse_lenient()
            .unwrap();
        assert!(template.issues().has_code(IssueCode::DepthExceeded));
        let mut depth = 0;
        let mut current = template.topology();
        while let Some(sub) = current.node_templates.values().find_map(|n| n.sub_mapping.as_deref()) {
            depth += 1;
            current = sub;
        }
        assert_eq!(depth, 3);
    }

    #[test]
    fn test_parse_all_keeps_results_apart() {
        let sources = vec![SERVICE.to_string(), SERVICE.replace("type: Compute", "type: Mainframe")];
        let results = parse_all(&sources, &ParserConfig::default());
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(ToscaError::ValidationFailed { .. })));
    }
}
