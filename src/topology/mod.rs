//! The in-memory model of a topology template.
pub mod graph;
pub mod inputs;
pub mod node;
mod template;

pub use graph::{is_hosting_requirement, HostingGraph};
pub use inputs::{Input, Output, Policy, SubstitutionMappings};
pub use node::{CapabilityAssignment, NodeTemplate, RelationshipTemplate, RequirementAssignment};
pub use template::TopologyTemplate;
