//! The normative TOSCA Simple Profile types every template can use.
use super::registry::TypeRegistry;
use crate::issues::IssueCollector;
use crate::value::Value;

const NORMATIVE_TYPES: &str = r#"
node_types:
  tosca.nodes.Root:
    attributes:
      tosca_id: {type: string}
      tosca_name: {type: string}
      state: {type: string}
    capabilities:
      feature: {type: tosca.capabilities.Node}
    requirements:
      - dependency:
          capability: tosca.capabilities.Node
          node: tosca.nodes.Root
          relationship: tosca.relationships.DependsOn
          occurrences: [0, UNBOUNDED]
    interfaces:
      Standard: {type: tosca.interfaces.node.lifecycle.Standard}
  tosca.nodes.Compute:
    derived_from: tosca.nodes.Root
    attributes:
      private_address: {type: string}
      public_address: {type: string}
      networks:
        type: map
        entry_schema: {type: tosca.datatypes.network.NetworkInfo}
      ports:
        type: map
        entry_schema: {type: tosca.datatypes.network.PortInfo}
    requirements:
      - local_storage:
          capability: tosca.capabilities.Attachment
          node: tosca.nodes.BlockStorage
          relationship: tosca.relationships.AttachesTo
          occurrences: [0, UNBOUNDED]
    capabilities:
      host: {type: tosca.capabilities.Compute, valid_source_types: [tosca.nodes.SoftwareComponent]}
      endpoint: {type: tosca.capabilities.Endpoint.Admin}
      os: {type: tosca.capabilities.OperatingSystem}
      scalable: {type: tosca.capabilities.Scalable}
      binding: {type: tosca.capabilities.network.Bindable}
  tosca.nodes.SoftwareComponent:
    derived_from: tosca.nodes.Root
    properties:
      component_version: {type: version, required: false}
      admin_credential: {type: tosca.datatypes.Credential, required: false}
    requirements:
      - host:
          capability: tosca.capabilities.Compute
          node: tosca.nodes.Compute
          relationship: tosca.relationships.HostedOn
  tosca.nodes.WebServer:
    derived_from: tosca.nodes.SoftwareComponent
    capabilities:
      data_endpoint: {type: tosca.capabilities.Endpoint}
      admin_endpoint: {type: tosca.capabilities.Endpoint.Admin}
      host: {type: tosca.capabilities.Container, valid_source_types: [tosca.nodes.WebApplication]}
  tosca.nodes.WebApplication:
    derived_from: tosca.nodes.Root
    properties:
      context_root: {type: string, required: false}
    capabilities:
      app_endpoint: {type: tosca.capabilities.Endpoint}
    requirements:
      - host:
          capability: tosca.capabilities.Container
          node: tosca.nodes.WebServer
          relationship: tosca.relationships.HostedOn
  tosca.nodes.DBMS:
    derived_from: tosca.nodes.SoftwareComponent
    properties:
      root_password: {type: string, required: false}
      port: {type: integer, required: false}
    capabilities:
      host: {type: tosca.capabilities.Container, valid_source_types: [tosca.nodes.Database]}
  tosca.nodes.Database:
    derived_from: tosca.nodes.Root
    properties:
      name: {type: string}
      port: {type: integer, required: false}
      user: {type: string, required: false}
      password: {type: string, required: false}
    requirements:
      - host:
          capability: tosca.capabilities.Container
          node: tosca.nodes.DBMS
          relationship: tosca.relationships.HostedOn
    capabilities:
      database_endpoint: {type: tosca.capabilities.Endpoint.Database}
  tosca.nodes.BlockStorage:
    derived_from: tosca.nodes.Root
    properties:
      size: {type: scalar-unit.size, constraints: [{greater_or_equal: 1 MB}]}
      volume_id: {type: string, required: false}
      snapshot_id: {type: string, required: false}
    capabilities:
      attachment: {type: tosca.capabilities.Attachment}

capability_types:
  tosca.capabilities.Root: {}
  tosca.capabilities.Node:
    derived_from: tosca.capabilities.Root
  tosca.capabilities.Container:
    derived_from: tosca.capabilities.Root
  tosca.capabilities.Compute:
    derived_from: tosca.capabilities.Container
    properties:
      name: {type: string, required: false}
      num_cpus: {type: integer, required: false, constraints: [{greater_or_equal: 1}]}
      cpu_frequency: {type: scalar-unit.frequency, required: false, constraints: [{greater_or_equal: 0.1 GHz}]}
      disk_size: {type: scalar-unit.size, required: false, constraints: [{greater_or_equal: 0 MB}]}
      mem_size: {type: scalar-unit.size, required: false, constraints: [{greater_or_equal: 0 MB}]}
  tosca.capabilities.Endpoint:
    derived_from: tosca.capabilities.Root
    properties:
      protocol: {type: string, default: tcp}
      port: {type: tosca.datatypes.network.PortDef, required: false}
      secure: {type: boolean, default: false}
      url_path: {type: string, required: false}
      port_name: {type: string, required: false}
      network_name: {type: string, required: false, default: PRIVATE}
      initiator: {type: string, default: source, constraints: [{valid_values: [source, target, peer]}]}
    attributes:
      ip_address: {type: string}
  tosca.capabilities.Endpoint.Admin:
    derived_from: tosca.capabilities.Endpoint
    properties:
      secure: {type: boolean, default: true, constraints: [{equal: true}]}
  tosca.capabilities.Endpoint.Database:
    derived_from: tosca.capabilities.Endpoint
  tosca.capabilities.Attachment:
    derived_from: tosca.capabilities.Root
  tosca.capabilities.OperatingSystem:
    derived_from: tosca.capabilities.Root
    properties:
      architecture: {type: string, required: false}
      type: {type: string, required: false}
      distribution: {type: string, required: false}
      version: {type: version, required: false}
  tosca.capabilities.Scalable:
    derived_from: tosca.capabilities.Root
    properties:
      min_instances: {type: integer, default: 1}
      max_instances: {type: integer, default: 1}
      default_instances: {type: integer, required: false}
  tosca.capabilities.network.Bindable:
    derived_from: tosca.capabilities.Node

relationship_types:
  tosca.relationships.Root:
    attributes:
      tosca_id: {type: string}
      tosca_name: {type: string}
      state: {type: string}
    interfaces:
      Configure: {type: tosca.interfaces.relationship.Configure}
  tosca.relationships.DependsOn:
    derived_from: tosca.relationships.Root
    valid_target_types: [tosca.capabilities.Node]
  tosca.relationships.HostedOn:
    derived_from: tosca.relationships.Root
    valid_target_types: [tosca.capabilities.Container]
  tosca.relationships.ConnectsTo:
    derived_from: tosca.relationships.Root
    valid_target_types: [tosca.capabilities.Endpoint]
    properties:
      credential: {type: tosca.datatypes.Credential, required: false}
  tosca.relationships.AttachesTo:
    derived_from: tosca.relationships.Root
    valid_target_types: [tosca.capabilities.Attachment]
    properties:
      location: {type: string, constraints: [{min_length: 1}]}
      device: {type: string, required: false}

data_types:
  tosca.datatypes.Root: {}
  tosca.datatypes.Credential:
    derived_from: tosca.datatypes.Root
    properties:
      protocol: {type: string, required: false}
      token_type: {type: string, default: password}
      token: {type: string}
      keys: {type: map, required: false, entry_schema: string}
      user: {type: string, required: false}
  tosca.datatypes.network.PortDef:
    derived_from: integer
    constraints:
      - in_range: [1, 65535]
  tosca.datatypes.network.NetworkInfo:
    derived_from: tosca.datatypes.Root
    properties:
      network_name: {type: string, required: false}
      network_id: {type: string, required: false}
      addresses: {type: list, required: false, entry_schema: string}
  tosca.datatypes.network.PortInfo:
    derived_from: tosca.datatypes.Root
    properties:
      port_name: {type: string, required: false}
      port_id: {type: string, required: false}
      network_id: {type: string, required: false}
      mac_address: {type: string, required: false}
      addresses: {type: list, required: false, entry_schema: string}

policy_types:
  tosca.policies.Root: {}
  tosca.policies.Placement:
    derived_from: tosca.policies.Root
  tosca.policies.Scaling:
    derived_from: tosca.policies.Root
  tosca.policies.Update:
    derived_from: tosca.policies.Root
  tosca.policies.Performance:
    derived_from: tosca.policies.Root
"#;

impl TypeRegistry {
    /// A registry holding the normative types.
    pub fn normative() -> Self {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(NORMATIVE_TYPES).expect("BUG: normative types must be valid YAML");
        let root = Value::from_yaml(&yaml);
        let mut issues = IssueCollector::new();
        let mut registry = TypeRegistry::new();
        registry.load_definitions(
            root.as_map().expect("BUG: normative types must be a mapping"),
            &mut issues,
        );
        debug_assert!(issues.is_empty(), "BUG: normative types: {:?}", issues.report());
        registry
    }
}
