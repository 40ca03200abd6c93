//! Fatal errors that end a parse early, plus the aggregate validation failure.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToscaError {
    #[error("Template file '{}' could not be read: {source}", .path.display())]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Template is not a valid YAML mapping: {0}")]
    MalformedTemplate(String),
    #[error("Invalid parser configuration: {0}")]
    Config(String),
    #[error("Template validation failed with {} issue(s):\n{}", .issues.len(), .issues.join("\n"))]
    ValidationFailed { issues: Vec<String> },
}

impl ToscaError {
    /// Stable code for programmatic filtering.
    pub fn code(&self) -> &'static str {
        match self {
            ToscaError::TemplateNotFound { .. } => "TE001",
            ToscaError::MalformedTemplate(_) => "TE002",
            ToscaError::Config(_) => "TE003",
            ToscaError::ValidationFailed { .. } => "TE100",
        }
    }

    /// True for errors raised before the template could be walked at all.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ToscaError::ValidationFailed { .. })
    }
}
