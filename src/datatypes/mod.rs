//! Value coercion and type-directed validation.
pub mod entity;
pub mod primitives;
pub mod scalar_unit;

pub use entity::{is_primitive, validate_datatype, validate_property};
pub use scalar_unit::{ScalarUnit, ScalarUnitKind};
