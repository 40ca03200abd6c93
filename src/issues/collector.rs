//! The deduplicating issue accumulator threaded through validation and resolution.
use super::error::{IssueCode, ValidationIssue};
use std::backtrace::Backtrace;
use std::collections::HashSet;

/// Accumulates non-fatal issues for a single template parse.
///
/// Issues are keyed by message text: appending a message that was already
/// recorded is a no-op, so the same problem reached through several
/// evaluation paths is reported once.
#[derive(Debug, Clone, Default)]
pub struct IssueCollector {
    issues: Vec<ValidationIssue>,
    traces: Vec<Option<String>>,
    seen: HashSet<String>,
    capture_backtraces: bool,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collector that records a backtrace alongside every new issue.
    pub fn with_backtraces() -> Self {
        Self {
            capture_backtraces: true,
            ..Self::default()
        }
    }

    /// Records `issue` unless an issue with the same message already exists.
    /// Returns whether the issue was new.
    pub fn add(&mut self, issue: ValidationIssue) -> bool {
        if !self.seen.insert(issue.message.clone()) {
            return false;
        }
        log::debug!("{}", issue);
        let trace = self
            .capture_backtraces
            .then(|| Backtrace::force_capture().to_string());
        self.issues.push(issue);
        self.traces.push(trace);
        true
    }

    pub fn push(&mut self, code: IssueCode, message: impl Into<String>) -> bool {
        self.add(ValidationIssue::new(code, message))
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Backtrace recorded for the issue at `index`, if capture was enabled.
    pub fn backtrace(&self, index: usize) -> Option<&str> {
        self.traces.get(index)?.as_deref()
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn count_code(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// The flattened `"[code]: message"` report.
    pub fn report(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&ValidationIssue, Option<&str>)> {
        self.issues
            .iter()
            .zip(self.traces.iter().map(|t| t.as_deref()))
    }
}
