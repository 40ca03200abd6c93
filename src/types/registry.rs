//! The set of known type definitions and inheritance-aware lookups over it.
use super::definition::{CapabilityDefinition, RequirementDefinition, TypeDef, TypeKind};
use crate::datatypes::is_primitive;
use crate::issues::{IssueCode, IssueCollector};
use crate::schema::Schema;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const HOSTED_ON: &str = "tosca.relationships.HostedOn";

/// Type definitions keyed by kind and fully qualified name.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeKind, BTreeMap<String, TypeDef>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: TypeDef) {
        self.types.entry(def.kind).or_default().insert(def.name.clone(), def);
    }

    pub fn count(&self) -> usize {
        self.types.values().map(BTreeMap::len).sum()
    }

    /// Loads every type section of a template root, then checks that each
    /// newly loaded type derives from something known without looping.
    pub fn load_definitions(&mut self, root: &BTreeMap<String, Value>, issues: &mut IssueCollector) {
        let mut loaded = Vec::new();
        for kind in TypeKind::ALL {
            let Some(section) = root.get(kind.section()) else {
                continue;
            };
            let Some(defs) = section.as_map() else {
                if !section.is_null() {
                    issues.push(
                        IssueCode::InvalidSchema,
                        format!("Section \"{}\" must be a map.", kind.section()),
                    );
                }
                continue;
            };
            for (name, body) in defs {
                if let Some(def) = TypeDef::parse(kind, name, body, issues) {
                    loaded.push((kind, name.clone()));
                    self.insert(def);
                }
            }
        }
        for (kind, name) in loaded {
            self.check_hierarchy(kind, &name, issues);
        }
        log::debug!("type registry holds {} definitions", self.count());
    }

    fn check_hierarchy(&self, kind: TypeKind, name: &str, issues: &mut IssueCollector) {
        let mut seen = HashSet::new();
        let mut current = name.to_string();
        loop {
            if !seen.insert(current.clone()) {
                issues.push(
                    IssueCode::CycleDetected,
                    format!("{} \"{}\" has a cyclic \"derived_from\" chain.", kind, name),
                );
                return;
            }
            let Some(def) = self.resolve(kind, &current) else {
                return;
            };
            let Some(parent) = &def.derived_from else {
                return;
            };
            if kind == TypeKind::Data && is_primitive(parent) {
                return;
            }
            if self.resolve(kind, parent).is_none() {
                issues.push(
                    IssueCode::UnknownType,
                    format!("{} \"{}\" derives from undefined type \"{}\".", kind, def.name, parent),
                );
                return;
            }
            current = parent.clone();
        }
    }

    /// Looks a type up by its full name, or by a short name such as
    /// `Compute` or `Endpoint.Admin` when exactly one `tosca.` type ends with it.
    pub fn resolve(&self, kind: TypeKind, name: &str) -> Option<&TypeDef> {
        let defs = self.types.get(&kind)?;
        if let Some(def) = defs.get(name) {
            return Some(def);
        }
        let suffix = format!(".{}", name);
        let mut hits = defs
            .values()
            .filter(|d| d.name.starts_with("tosca.") && d.name.ends_with(&suffix));
        match (hits.next(), hits.next()) {
            (Some(def), None) => Some(def),
            _ => None,
        }
    }

    pub fn node_type(&self, name: &str) -> Option<&TypeDef> {
        self.resolve(TypeKind::Node, name)
    }

    pub fn capability_type(&self, name: &str) -> Option<&TypeDef> {
        self.resolve(TypeKind::Capability, name)
    }

    pub fn relationship_type(&self, name: &str) -> Option<&TypeDef> {
        self.resolve(TypeKind::Relationship, name)
    }

    pub fn data_type(&self, name: &str) -> Option<&TypeDef> {
        self.resolve(TypeKind::Data, name)
    }

    pub fn policy_type(&self, name: &str) -> Option<&TypeDef> {
        self.resolve(TypeKind::Policy, name)
    }

    /// The type followed by its ancestors, nearest first. Stops at the first
    /// unknown parent or repeated name.
    pub fn ancestry(&self, kind: TypeKind, name: &str) -> Vec<&TypeDef> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = self.resolve(kind, name);
        while let Some(def) = next {
            if !seen.insert(def.name.as_str()) {
                break;
            }
            chain.push(def);
            next = def.derived_from.as_deref().and_then(|p| self.resolve(kind, p));
        }
        chain
    }

    /// True if `name` is `ancestor` or derives from it.
    pub fn derives_from(&self, kind: TypeKind, name: &str, ancestor: &str) -> bool {
        let Some(target) = self.resolve(kind, ancestor) else {
            return false;
        };
        self.ancestry(kind, name).iter().any(|d| d.name == target.name)
    }

    /// Walks the ancestry root first so nearer definitions override.
    fn merged<'a, T: ?Sized>(
        &'a self,
        kind: TypeKind,
        name: &str,
        section: impl Fn(&'a TypeDef) -> Vec<(&'a str, &'a T)>,
    ) -> BTreeMap<&'a str, &'a T> {
        let mut merged = BTreeMap::new();
        for def in self.ancestry(kind, name).into_iter().rev() {
            merged.extend(section(def));
        }
        merged
    }

    pub fn properties(&self, kind: TypeKind, name: &str) -> BTreeMap<&str, &Schema> {
        self.merged(kind, name, |d| d.properties.iter().map(|(k, v)| (k.as_str(), v)).collect())
    }

    pub fn attributes(&self, kind: TypeKind, name: &str) -> BTreeMap<&str, &Schema> {
        self.merged(kind, name, |d| d.attributes.iter().map(|(k, v)| (k.as_str(), v)).collect())
    }

    pub fn capabilities(&self, node_type: &str) -> BTreeMap<&str, &CapabilityDefinition> {
        self.merged(TypeKind::Node, node_type, |d| {
            d.capabilities.iter().map(|(k, v)| (k.as_str(), v)).collect()
        })
    }

    pub fn requirements(&self, node_type: &str) -> BTreeMap<&str, &RequirementDefinition> {
        self.merged(TypeKind::Node, node_type, |d| {
            d.requirements.iter().map(|r| (r.name.as_str(), r)).collect()
        })
    }

    /// Interface name to interface type, for node or relationship types.
    pub fn interfaces(&self, kind: TypeKind, name: &str) -> BTreeMap<&str, &str> {
        self.merged(kind, name, |d| {
            d.interfaces.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
        })
    }

    pub fn data_type_properties(&self, name: &str) -> BTreeMap<&str, &Schema> {
        self.properties(TypeKind::Data, name)
    }

    /// Constraint clauses of a data type and all its ancestors.
    pub fn data_type_constraints(&self, name: &str) -> Vec<&Value> {
        self.ancestry(TypeKind::Data, name)
            .into_iter()
            .flat_map(|d| d.constraints.iter())
            .collect()
    }

    /// The primitive a data type ultimately derives from, if any.
    pub fn primitive_base(&self, name: &str) -> Option<&str> {
        self.ancestry(TypeKind::Data, name)
            .into_iter()
            .find_map(|d| d.derived_from.as_deref().filter(|p| is_primitive(p)))
    }

    /// True if a capability of this type can host a node: it derives from one
    /// of the valid target types of `tosca.relationships.HostedOn`.
    pub fn is_hosting_capability(&self, capability_type: &str) -> bool {
        self.ancestry(TypeKind::Relationship, HOSTED_ON)
            .iter()
            .flat_map(|d| d.valid_target_types.iter())
            .any(|target| self.derives_from(TypeKind::Capability, capability_type, target))
    }
}
