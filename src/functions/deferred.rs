//! Functions whose value is only known at runtime. They are validated at
//! parse time and resolve to themselves.
use super::host::find_entity;
use super::{arity, bad_argument, Args, Context, CONCAT, GET_OPERATION_OUTPUT, HOST, SELF, SOURCE, TARGET, TOKEN};
use crate::issues::{IssueCode, IssueCollector};
use crate::topology::TopologyTemplate;
use crate::value::Value;

const STANDARD: [&str; 2] = ["Standard", "tosca.interfaces.node.lifecycle.Standard"];
const STANDARD_OPERATIONS: [&str; 5] = ["create", "configure", "start", "stop", "delete"];

const CONFIGURE: [&str; 2] = ["Configure", "tosca.interfaces.relationship.Configure"];
const CONFIGURE_OPERATIONS: [&str; 9] = [
    "pre_configure_source",
    "pre_configure_target",
    "post_configure_source",
    "post_configure_target",
    "add_target",
    "add_source",
    "target_changed",
    "remove_target",
    "remove_source",
];

/// Operations of a normative lifecycle interface, or `None` for any other.
fn interface_operations(interface: &str) -> Option<&'static [&'static str]> {
    if STANDARD.contains(&interface) {
        Some(&STANDARD_OPERATIONS)
    } else if CONFIGURE.contains(&interface) {
        Some(&CONFIGURE_OPERATIONS)
    } else {
        None
    }
}

/// `get_operation_output: [node | SELF | SOURCE | TARGET, interface, operation, output]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GetOperationOutput {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

impl GetOperationOutput {
    pub fn new(context: Context, args: Args) -> Self {
        GetOperationOutput { context, args }
    }

    pub(crate) fn validate(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) {
        if self.args.len() != 4 {
            arity(
                GET_OPERATION_OUTPUT,
                "4 arguments: \"template_name\", \"interface_name\", \"operation_name\", \"output_variable_name\"",
                self.args.len(),
                issues,
            );
            return;
        }
        let [reference, interface, operation, output] = [&self.args[0], &self.args[1], &self.args[2], &self.args[3]];

        match reference.as_str() {
            Some(HOST) => {
                issues.push(
                    IssueCode::InvalidContext,
                    format!(
                        "{}: keyword \"{}\" is not allowed; use a node template name, \"{}\", \"{}\" or \"{}\".",
                        GET_OPERATION_OUTPUT, HOST, SELF, SOURCE, TARGET
                    ),
                );
            }
            Some(name) => {
                find_entity(tpl, &self.context, name, GET_OPERATION_OUTPUT, name, &|_| true, issues);
            }
            None => bad_argument(GET_OPERATION_OUTPUT, "the template name", "a string", reference, issues),
        }

        let Some(interface_name) = interface.as_str() else {
            bad_argument(GET_OPERATION_OUTPUT, "the interface name", "a string", interface, issues);
            return;
        };
        let Some(operations) = interface_operations(interface_name) else {
            issues.push(
                IssueCode::UnknownInterface,
                format!(
                    "{}: interface \"{}\" is not one of \"{}\", \"{}\".",
                    GET_OPERATION_OUTPUT, interface_name, STANDARD[1], CONFIGURE[1]
                ),
            );
            return;
        };
        match operation.as_str() {
            Some(op) if operations.contains(&op) => {}
            Some(op) => {
                issues.push(
                    IssueCode::UnknownOperation,
                    format!(
                        "{}: operation \"{}\" is not defined by interface \"{}\".",
                        GET_OPERATION_OUTPUT, op, interface_name
                    ),
                );
            }
            None => bad_argument(GET_OPERATION_OUTPUT, "the operation name", "a string", operation, issues),
        }
        if output.as_str().is_none() {
            bad_argument(GET_OPERATION_OUTPUT, "the output name", "a string", output, issues);
        }
    }
}

/// `concat: [a, b, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Concat {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

impl Concat {
    pub fn new(context: Context, args: Args) -> Self {
        Concat { context, args }
    }

    pub(crate) fn validate(&self, issues: &mut IssueCollector) {
        if self.args.is_empty() {
            arity(CONCAT, "at least 1 argument", 0, issues);
        }
    }
}

/// `token: [string, delimiter, index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

impl Token {
    pub fn new(context: Context, args: Args) -> Self {
        Token { context, args }
    }

    pub(crate) fn validate(&self, issues: &mut IssueCollector) {
        if self.args.len() < 3 {
            arity(
                TOKEN,
                "at least 3 arguments: \"string_with_tokens\", \"string_of_token_chars\", \"substring_index\"",
                self.args.len(),
                issues,
            );
            return;
        }
        let delimiter = &self.args[1];
        if !matches!(delimiter, Value::String(s) if s.chars().count() == 1) {
            bad_argument(TOKEN, "the delimiter", "a single character", delimiter, issues);
        }
        let index = &self.args[2];
        if !matches!(index, Value::Int(_)) {
            bad_argument(TOKEN, "the substring index", "an integer", index, issues);
        }
    }
}
