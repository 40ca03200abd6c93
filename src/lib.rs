//! TOSCA service template validation and intrinsic-function resolution.
//!
//! A template is parsed into a [`TopologyTemplate`]: every property and input
//! value is checked against its schema and constraints, and function-shaped
//! values (`get_input`, `get_property`, `get_attribute`,
//! `get_operation_output`, `concat`, `token`) become [`Function`] values that
//! resolve against the topology. Problems are collected rather than raised;
//! only structural errors stop a parse.

// --- Value model and diagnostics ---
pub mod error;
pub mod issues;
pub mod value;

// --- Validation ---
pub mod config;
pub mod datatypes;
pub mod schema;
pub mod types;

// --- Topology and functions ---
pub mod functions;
pub mod topology;
pub mod tosca;

pub use config::{Limits, ParserConfig};
pub use error::ToscaError;
pub use functions::{get_function, is_function, Context, Function};
pub use issues::{ClassifiedReport, IssueCode, IssueCollector, IssuePolicy, Severity, ValidationIssue};
pub use schema::{Constraint, ConstraintKey, Schema};
pub use topology::TopologyTemplate;
pub use tosca::{parse_all, ToscaTemplate, ToscaTemplateBuilder};
pub use types::TypeRegistry;
pub use value::Value;
