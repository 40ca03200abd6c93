//! TOSCA type definitions and the registry they are looked up in.
pub mod definition;
mod normative;
pub mod registry;

pub use definition::{CapabilityDefinition, RequirementDefinition, TypeDef, TypeKind};
pub use registry::{TypeRegistry, HOSTED_ON};
