//! Defines the issue codes and the issue record produced by validation.
use serde::{Serialize, Serializer};
use std::fmt;

/// The specific category of a validation issue.
///
// Codes are stable short identifiers so calling systems can filter issues
// programmatically instead of matching on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueCode {
    // --- schema shape ---
    InvalidSchema,
    UnknownField,
    MissingRequiredField,
    InvalidConstraintOperand,
    InapplicableConstraint,
    InvalidPattern,
    UnknownConstraint,
    UnknownType,
    // --- constraint violations ---
    EqualViolation,
    GreaterThanViolation,
    GreaterOrEqualViolation,
    LessThanViolation,
    LessOrEqualViolation,
    InRangeViolation,
    ValidValuesViolation,
    LengthViolation,
    MinLengthViolation,
    MaxLengthViolation,
    PatternViolation,
    // --- value coercion ---
    InvalidValue,
    InvalidScalarUnit,
    InvalidTimestamp,
    InvalidRange,
    InvalidVersion,
    // --- function arguments ---
    FunctionArity,
    FunctionArgument,
    UnknownInput,
    UnknownInterface,
    UnknownOperation,
    // --- graph resolution ---
    NodeTemplateNotFound,
    PropertyNotFound,
    AttributeNotFound,
    RequirementOrCapabilityNotFound,
    HostNotFound,
    InvalidContext,
    IndexMismatch,
    KeyMismatch,
    // --- limits ---
    DepthExceeded,
    CycleDetected,
}

impl IssueCode {
    pub const ALL: [IssueCode; 39] = [
        IssueCode::InvalidSchema,
        IssueCode::UnknownField,
        IssueCode::MissingRequiredField,
        IssueCode::InvalidConstraintOperand,
        IssueCode::InapplicableConstraint,
        IssueCode::InvalidPattern,
        IssueCode::UnknownConstraint,
        IssueCode::UnknownType,
        IssueCode::EqualViolation,
        IssueCode::GreaterThanViolation,
        IssueCode::GreaterOrEqualViolation,
        IssueCode::LessThanViolation,
        IssueCode::LessOrEqualViolation,
        IssueCode::InRangeViolation,
        IssueCode::ValidValuesViolation,
        IssueCode::LengthViolation,
        IssueCode::MinLengthViolation,
        IssueCode::MaxLengthViolation,
        IssueCode::PatternViolation,
        IssueCode::InvalidValue,
        IssueCode::InvalidScalarUnit,
        IssueCode::InvalidTimestamp,
        IssueCode::InvalidRange,
        IssueCode::InvalidVersion,
        IssueCode::FunctionArity,
        IssueCode::FunctionArgument,
        IssueCode::UnknownInput,
        IssueCode::UnknownInterface,
        IssueCode::UnknownOperation,
        IssueCode::NodeTemplateNotFound,
        IssueCode::PropertyNotFound,
        IssueCode::AttributeNotFound,
        IssueCode::RequirementOrCapabilityNotFound,
        IssueCode::HostNotFound,
        IssueCode::InvalidContext,
        IssueCode::IndexMismatch,
        IssueCode::KeyMismatch,
        IssueCode::DepthExceeded,
        IssueCode::CycleDetected,
    ];

    /// The stable short identifier of this code.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::InvalidSchema => "TS001",
            IssueCode::UnknownField => "TS002",
            IssueCode::MissingRequiredField => "TS003",
            IssueCode::InvalidConstraintOperand => "TS004",
            IssueCode::InapplicableConstraint => "TS005",
            IssueCode::InvalidPattern => "TS006",
            IssueCode::UnknownConstraint => "TS007",
            IssueCode::UnknownType => "TS008",
            IssueCode::EqualViolation => "TC001",
            IssueCode::GreaterThanViolation => "TC002",
            IssueCode::GreaterOrEqualViolation => "TC003",
            IssueCode::LessThanViolation => "TC004",
            IssueCode::LessOrEqualViolation => "TC005",
            IssueCode::InRangeViolation => "TC006",
            IssueCode::ValidValuesViolation => "TC007",
            IssueCode::LengthViolation => "TC008",
            IssueCode::MinLengthViolation => "TC009",
            IssueCode::MaxLengthViolation => "TC010",
            IssueCode::PatternViolation => "TC011",
            IssueCode::InvalidValue => "TV001",
            IssueCode::InvalidScalarUnit => "TV002",
            IssueCode::InvalidTimestamp => "TV003",
            IssueCode::InvalidRange => "TV004",
            IssueCode::InvalidVersion => "TV005",
            IssueCode::FunctionArity => "TF001",
            IssueCode::FunctionArgument => "TF002",
            IssueCode::UnknownInput => "TF003",
            IssueCode::UnknownInterface => "TF004",
            IssueCode::UnknownOperation => "TF005",
            IssueCode::NodeTemplateNotFound => "TR001",
            IssueCode::PropertyNotFound => "TR002",
            IssueCode::AttributeNotFound => "TR003",
            IssueCode::RequirementOrCapabilityNotFound => "TR004",
            IssueCode::HostNotFound => "TR005",
            IssueCode::InvalidContext => "TR006",
            IssueCode::IndexMismatch => "TR007",
            IssueCode::KeyMismatch => "TR008",
            IssueCode::DepthExceeded => "TL001",
            IssueCode::CycleDetected => "TL002",
        }
    }

    /// Reverse lookup of [`IssueCode::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IssueCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single non-fatal problem found while validating or resolving a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationIssue {
    /// The category of the issue.
    pub code: IssueCode,
    /// A human-readable message explaining the issue.
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_round_trip() {
        let codes: HashSet<&str> = IssueCode::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes.len(), IssueCode::ALL.len());
        for code in IssueCode::ALL {
            assert_eq!(IssueCode::from_code(code.as_str()), Some(code));
        }
        assert_eq!(IssueCode::from_code("XX999"), None);
    }

    #[test]
    fn test_display_format() {
        let issue = ValidationIssue::new(IssueCode::UnknownInput, "Unknown input \"region\".");
        assert_eq!(issue.to_string(), "[TF003]: Unknown input \"region\".");
    }
}
