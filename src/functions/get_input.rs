use super::{arity, bad_argument, unwrap_value, Args, Context, GET_INPUT};
use crate::issues::{IssueCode, IssueCollector};
use crate::topology::TopologyTemplate;
use crate::value::Value;

/// `get_input: name` or `get_input: [name, index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GetInput {
    pub(crate) context: Context,
    pub(crate) args: Args,
}

impl GetInput {
    pub fn new(context: Context, args: Args) -> Self {
        GetInput { context, args }
    }

    pub fn input_name(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }

    pub(crate) fn validate(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) {
        if self.args.is_empty() || self.args.len() > 2 {
            arity(GET_INPUT, "1 or 2 arguments: \"input_name\", \"index\" (optional)", self.args.len(), issues);
            return;
        }
        let Some(name) = self.input_name() else {
            bad_argument(GET_INPUT, "the input name", "a string", &self.args[0], issues);
            return;
        };
        if let Some(index) = self.args.get(1) {
            if !matches!(index, Value::Int(_)) {
                bad_argument(GET_INPUT, "the index", "an integer", index, issues);
            }
        }
        if tpl.input(name).is_none() {
            issues.push(
                IssueCode::UnknownInput,
                format!("{}: unknown input \"{}\".", GET_INPUT, name),
            );
        }
    }

    /// The supplied parameter, or the declared default.
    pub(crate) fn resolve(
        &self,
        tpl: &TopologyTemplate,
        depth: usize,
        issues: &mut IssueCollector,
    ) -> Option<Value> {
        let name = self.input_name()?;
        let value = match tpl.parsed_param(name) {
            Some(v) => v,
            None => tpl.input(name)?.default()?,
        };
        let value = unwrap_value(tpl, &self.context, value, depth, issues)?;
        let Some(index) = self.args.get(1) else {
            return Some(value);
        };
        let item = match (&value, index) {
            (Value::List(items), Value::Int(i)) => usize::try_from(*i).ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match item {
            Some(item) => Some(item.clone()),
            None => {
                issues.push(
                    IssueCode::IndexMismatch,
                    format!(
                        "{}: index \"{}\" cannot be applied to the value \"{}\" of input \"{}\".",
                        GET_INPUT, index, value, name
                    ),
                );
                None
            }
        }
    }
}
