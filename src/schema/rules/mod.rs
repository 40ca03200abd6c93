//! Per-kind checking rules used by [`super::Constraint`].
pub mod compare;
pub mod length;
pub mod membership;
pub mod pattern;
