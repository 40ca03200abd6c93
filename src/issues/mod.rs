//! Non-fatal validation issues.
//!
//! Every validation and resolution step reports problems into an explicit
//! [`IssueCollector`] instead of failing, so one malformed property never stops
//! the rest of a template from being checked. At the end of a parse the
//! collector is classified into warning/critical buckets.

pub use self::collector::IssueCollector;
pub use self::error::{IssueCode, ValidationIssue};
pub use self::report::{ClassifiedIssue, ClassifiedReport, IssuePolicy, Severity};

mod collector;
mod error;
mod report;
