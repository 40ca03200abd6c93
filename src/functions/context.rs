use std::fmt;

/// Where a function appears in the template. Keywords such as `SELF` and
/// `SOURCE` are resolved against it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Context {
    NodeTemplate(String),
    RelationshipTemplate(String),
    Outputs,
    /// Inputs, policies and other top-level sections.
    Topology,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::NodeTemplate(name) => write!(f, "node template \"{}\"", name),
            Context::RelationshipTemplate(name) => write!(f, "relationship template \"{}\"", name),
            Context::Outputs => f.write_str("outputs"),
            Context::Topology => f.write_str("topology template"),
        }
    }
}
