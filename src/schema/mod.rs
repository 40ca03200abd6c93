//! Property schemas and the constraints declared on them.
pub mod constraint;
pub mod rules;
#[allow(clippy::module_inception)]
mod schema;

pub use constraint::{Constraint, ConstraintKey};
pub use schema::{Schema, SCHEMA_KEYS};
