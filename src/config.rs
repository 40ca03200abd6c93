//! Parser configuration: recursion bounds, get_input handling and issue severities.
use crate::error::ToscaError;
use crate::issues::{IssueCode, IssuePolicy, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Recursion bounds carried by every topology template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting of sub-mapped topology templates.
    pub max_nested_depth: usize,
    /// Maximum number of hops in a HostedOn chain walk.
    pub max_host_chain: usize,
    /// Maximum depth of nested function resolution.
    pub max_function_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nested_depth: 10,
            max_host_chain: 16,
            max_function_depth: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    pub max_nested_depth: usize,
    pub max_host_chain: usize,
    pub max_function_depth: usize,
    /// Replace `get_input` calls with their literal value during conversion
    /// whenever that value is known.
    pub resolve_get_input: bool,
    pub capture_backtraces: bool,
    /// Start from the built-in severity table before applying `issue_levels`.
    pub use_default_levels: bool,
    /// Per-code severity overrides, keyed by issue code (e.g. `TS002`).
    pub issue_levels: BTreeMap<String, Severity>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            max_nested_depth: limits.max_nested_depth,
            max_host_chain: limits.max_host_chain,
            max_function_depth: limits.max_function_depth,
            resolve_get_input: false,
            capture_backtraces: false,
            use_default_levels: true,
            issue_levels: BTreeMap::new(),
        }
    }
}

impl ParserConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ToscaError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| ToscaError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ToscaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ToscaError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    fn check(&self) -> Result<(), ToscaError> {
        if let Some(unknown) = self
            .issue_levels
            .keys()
            .find(|code| IssueCode::from_code(code).is_none())
        {
            return Err(ToscaError::Config(format!("unknown issue code '{}'", unknown)));
        }
        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_nested_depth: self.max_nested_depth,
            max_host_chain: self.max_host_chain,
            max_function_depth: self.max_function_depth,
        }
    }

    pub fn issue_policy(&self) -> IssuePolicy {
        let mut policy = if self.use_default_levels {
            IssuePolicy::standard()
        } else {
            IssuePolicy::empty()
        };
        for (code, severity) in &self.issue_levels {
            if let Some(code) = IssueCode::from_code(code) {
                policy.set(code, *severity);
            }
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = ParserConfig::default();
        assert_eq!(cfg.limits(), Limits::default());
        assert_eq!(cfg.limits().max_nested_depth, 10);
        assert!(!cfg.resolve_get_input);
        assert_eq!(cfg.issue_policy(), IssuePolicy::standard());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let cfg = ParserConfig::from_yaml_str(
            "max_nested_depth: 3\nissue_levels:\n  TS002: critical\n",
        )
        .unwrap();
        assert_eq!(cfg.max_nested_depth, 3);
        assert_eq!(cfg.max_function_depth, 32);
        assert_eq!(
            cfg.issue_policy().severity(IssueCode::UnknownField),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn test_without_default_levels_only_overrides_apply() {
        let cfg = ParserConfig::from_yaml_str(
            "use_default_levels: false\nissue_levels:\n  TC006: warning\n",
        )
        .unwrap();
        let policy = cfg.issue_policy();
        assert_eq!(policy.severity(IssueCode::InRangeViolation), Some(Severity::Warning));
        assert_eq!(policy.severity(IssueCode::PatternViolation), None);
    }

    #[test]
    fn test_rejects_unknown_codes_and_fields() {
        let err = ParserConfig::from_yaml_str("issue_levels:\n  NOPE: warning\n").unwrap_err();
        assert_eq!(err.code(), "TE003");
        assert!(ParserConfig::from_yaml_str("max_depth: 3\n").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "resolve_get_input: true").unwrap();
        let cfg = ParserConfig::from_path(file.path()).unwrap();
        assert!(cfg.resolve_get_input);

        let missing = ParserConfig::from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, ToscaError::Config(_)));
    }
}
