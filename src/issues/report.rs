//! Severity classification of collected issues.
use super::collector::IssueCollector;
use super::error::{IssueCode, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Maps issue codes to severities. Codes with no entry are "unanalyzed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePolicy {
    levels: BTreeMap<IssueCode, Severity>,
}

impl IssuePolicy {
    /// An empty policy: every issue lands in the unanalyzed bucket.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in policy. Everything is critical except a few shape
    /// problems that never change the meaning of the model.
    pub fn standard() -> Self {
        let levels = IssueCode::ALL
            .iter()
            .map(|&code| {
                let severity = match code {
                    IssueCode::UnknownField | IssueCode::InvalidVersion | IssueCode::DepthExceeded => {
                        Severity::Warning
                    }
                    _ => Severity::Critical,
                };
                (code, severity)
            })
            .collect();
        Self { levels }
    }

    pub fn set(&mut self, code: IssueCode, severity: Severity) {
        self.levels.insert(code, severity);
    }

    pub fn severity(&self, code: IssueCode) -> Option<Severity> {
        self.levels.get(&code).copied()
    }
}

/// An issue together with the diagnostics captured when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedIssue {
    #[serde(flatten)]
    pub issue: ValidationIssue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backtrace: Option<String>,
}

/// Issues split into warning, critical and unanalyzed buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedReport {
    pub warnings: Vec<ClassifiedIssue>,
    pub critical: Vec<ClassifiedIssue>,
    pub unanalyzed: Vec<ClassifiedIssue>,
}

impl ClassifiedReport {
    pub fn classify(collector: &IssueCollector, policy: &IssuePolicy) -> Self {
        let mut report = Self::default();
        for (issue, trace) in collector.entries() {
            let entry = ClassifiedIssue {
                issue: issue.clone(),
                backtrace: trace.map(str::to_string),
            };
            match policy.severity(issue.code) {
                Some(Severity::Warning) => report.warnings.push(entry),
                Some(Severity::Critical) => report.critical.push(entry),
                None => report.unanalyzed.push(entry),
            }
        }
        report
    }

    /// A parse fails overall only when something critical was found.
    pub fn has_critical(&self) -> bool {
        !self.critical.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_buckets() {
        let mut c = IssueCollector::new();
        c.push(IssueCode::UnknownField, "Input \"a\" contains unknown field \"x\".");
        c.push(IssueCode::InRangeViolation, "out of range");
        c.push(IssueCode::CycleDetected, "cycle");

        let mut policy = IssuePolicy::standard();
        let report = ClassifiedReport::classify(&c, &policy);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.critical.len(), 2);
        assert!(report.unanalyzed.is_empty());
        assert!(report.has_critical());

        policy.set(IssueCode::InRangeViolation, Severity::Warning);
        policy.set(IssueCode::CycleDetected, Severity::Warning);
        assert!(!ClassifiedReport::classify(&c, &policy).has_critical());
    }

    #[test]
    fn test_empty_policy_leaves_everything_unanalyzed() {
        let mut c = IssueCollector::new();
        c.push(IssueCode::InRangeViolation, "out of range");
        let report = ClassifiedReport::classify(&c, &IssuePolicy::empty());
        assert_eq!(report.unanalyzed.len(), 1);
        assert!(!report.has_critical());
    }

    #[test]
    fn test_json_report_uses_codes() {
        let mut c = IssueCollector::new();
        c.push(IssueCode::PatternViolation, "no match");
        let json = ClassifiedReport::classify(&c, &IssuePolicy::standard())
            .to_json()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["critical"][0]["code"], "TC011");
        assert_eq!(parsed["critical"][0]["message"], "no match");
    }
}
