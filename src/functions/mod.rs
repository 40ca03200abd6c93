//! Intrinsic functions and their resolution against a topology.
//!
//! Function-shaped maps in property, attribute, interface and output values
//! are converted into [`Function`] values by [`get_function`]. Conversion
//! validates the arguments right away and records problems in the collector;
//! it never fails. Values are produced later by [`Function::result`], which
//! walks the topology. `get_input` and `get_property` resolve at parse time.
//! The rest depend on runtime state and resolve to themselves.

mod context;
mod deferred;
mod get_attribute;
mod get_input;
mod get_property;
mod host;

pub use context::Context;
pub use deferred::{Concat, GetOperationOutput, Token};
pub use get_attribute::GetAttribute;
pub use get_input::GetInput;
pub use get_property::GetProperty;

use crate::issues::{IssueCode, IssueCollector};
use crate::topology::TopologyTemplate;
use crate::value::Value;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

pub const SELF: &str = "SELF";
pub const HOST: &str = "HOST";
pub const SOURCE: &str = "SOURCE";
pub const TARGET: &str = "TARGET";

pub const GET_INPUT: &str = "get_input";
pub const GET_PROPERTY: &str = "get_property";
pub const GET_ATTRIBUTE: &str = "get_attribute";
pub const GET_OPERATION_OUTPUT: &str = "get_operation_output";
pub const CONCAT: &str = "concat";
pub const TOKEN: &str = "token";

pub const FUNCTION_NAMES: [&str; 6] = [
    GET_INPUT,
    GET_PROPERTY,
    GET_ATTRIBUTE,
    GET_OPERATION_OUTPUT,
    CONCAT,
    TOKEN,
];

/// Positional function arguments. Almost never more than four.
pub type Args = SmallVec<[Value; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    GetInput(GetInput),
    GetProperty(GetProperty),
    GetAttribute(GetAttribute),
    GetOperationOutput(GetOperationOutput),
    Concat(Concat),
    Token(Token),
}

impl Function {
    /// Builds the function called `name` and validates its arguments.
    ///
    /// Returns `None` only when `name` is not a function name.
    pub fn build(
        tpl: &TopologyTemplate,
        context: &Context,
        name: &str,
        args: Args,
        issues: &mut IssueCollector,
    ) -> Option<Function> {
        let context = context.clone();
        let function = match name {
            GET_INPUT => Function::GetInput(GetInput::new(context, args)),
            GET_PROPERTY => Function::GetProperty(GetProperty::new(context, args)),
            GET_ATTRIBUTE => Function::GetAttribute(GetAttribute::new(context, args)),
            GET_OPERATION_OUTPUT => {
                Function::GetOperationOutput(GetOperationOutput::new(context, args))
            }
            CONCAT => Function::Concat(Concat::new(context, args)),
            TOKEN => Function::Token(Token::new(context, args)),
            _ => return None,
        };
        log::trace!("converted {} in {}", function, function.context());
        function.validate(tpl, issues);
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::GetInput(_) => GET_INPUT,
            Function::GetProperty(_) => GET_PROPERTY,
            Function::GetAttribute(_) => GET_ATTRIBUTE,
            Function::GetOperationOutput(_) => GET_OPERATION_OUTPUT,
            Function::Concat(_) => CONCAT,
            Function::Token(_) => TOKEN,
        }
    }

    pub fn args(&self) -> &[Value] {
        match self {
            Function::GetInput(f) => &f.args,
            Function::GetProperty(f) => &f.args,
            Function::GetAttribute(f) => &f.args,
            Function::GetOperationOutput(f) => &f.args,
            Function::Concat(f) => &f.args,
            Function::Token(f) => &f.args,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            Function::GetInput(f) => &f.context,
            Function::GetProperty(f) => &f.context,
            Function::GetAttribute(f) => &f.context,
            Function::GetOperationOutput(f) => &f.context,
            Function::Concat(f) => &f.context,
            Function::Token(f) => &f.context,
        }
    }

    /// True for functions whose value only exists at runtime.
    pub fn is_deferred(&self) -> bool {
        !matches!(self, Function::GetInput(_) | Function::GetProperty(_))
    }

    fn validate(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) {
        match self {
            Function::GetInput(f) => f.validate(tpl, issues),
            Function::GetProperty(f) => f.validate(tpl, issues),
            Function::GetAttribute(f) => f.validate(tpl, issues),
            Function::GetOperationOutput(f) => f.validate(tpl, issues),
            Function::Concat(f) => f.validate(issues),
            Function::Token(f) => f.validate(issues),
        }
    }

    /// The value this function stands for.
    ///
    /// Deferred functions return themselves. Lookup failures are recorded
    /// and yield `None`.
    pub fn result(&self, tpl: &TopologyTemplate, issues: &mut IssueCollector) -> Option<Value> {
        self.resolve(tpl, 0, issues)
    }

    pub(crate) fn resolve(
        &self,
        tpl: &TopologyTemplate,
        depth: usize,
        issues: &mut IssueCollector,
    ) -> Option<Value> {
        let max = tpl.limits().max_function_depth;
        if depth > max {
            issues.push(
                IssueCode::DepthExceeded,
                format!("{}: functions are nested deeper than {} levels.", self, max),
            );
            return None;
        }
        match self {
            Function::GetInput(f) => f.resolve(tpl, depth, issues),
            Function::GetProperty(f) => f.resolve(tpl, depth, issues),
            _ => Some(Value::Function(Box::new(self.clone()))),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args().iter().map(Value::to_string).collect();
        write!(f, "{{{}: [{}]}}", self.name(), args.join(", "))
    }
}

/// The function name and raw argument of a function-shaped map: a single key
/// naming a function whose value is not itself a map.
fn function_call(value: &Value) -> Option<(&'static str, &Value)> {
    let map = value.as_map().filter(|m| m.len() == 1)?;
    let (key, arg) = map.iter().next()?;
    let name = FUNCTION_NAMES.into_iter().find(|n| *n == key.as_str())?;
    if arg.as_map().is_some() {
        return None;
    }
    Some((name, arg))
}

/// True for converted functions and for maps that convert into one.
pub fn is_function(value: &Value) -> bool {
    value.is_function() || function_call(value).is_some()
}

/// Converts every function-shaped map inside `raw` into a [`Function`].
///
/// Maps and lists are walked, scalars come back unchanged and converted
/// functions are kept, so converting twice changes nothing. With
/// `resolve_get_input`, a `get_input` whose value is known is replaced by
/// that value.
pub fn get_function(
    tpl: &TopologyTemplate,
    context: &Context,
    raw: &Value,
    resolve_get_input: bool,
    issues: &mut IssueCollector,
) -> Value {
    if let Some((name, arg)) = function_call(raw) {
        let args: Args = match arg {
            Value::List(items) => items
                .iter()
                .map(|a| get_function(tpl, context, a, resolve_get_input, issues))
                .collect(),
            other => smallvec::smallvec![get_function(tpl, context, other, resolve_get_input, issues)],
        };
        let Some(function) = Function::build(tpl, context, name, args, issues) else {
            return raw.clone();
        };
        if resolve_get_input {
            if let Function::GetInput(f) = &function {
                if let Some(value) = f.resolve(tpl, 0, issues) {
                    return value;
                }
            }
        }
        return Value::Function(Box::new(function));
    }
    match raw {
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), get_function(tpl, context, v, resolve_get_input, issues)))
                .collect(),
        ),
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|v| get_function(tpl, context, v, resolve_get_input, issues))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Converts a whole section of named values in one context.
pub(crate) fn convert_all(
    tpl: &TopologyTemplate,
    context: &Context,
    values: &BTreeMap<String, Value>,
    resolve_get_input: bool,
    issues: &mut IssueCollector,
) -> BTreeMap<String, Value> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), get_function(tpl, context, v, resolve_get_input, issues)))
        .collect()
}

/// Resolves a function value, or converts a plain one.
pub(crate) fn unwrap_value(
    tpl: &TopologyTemplate,
    context: &Context,
    value: &Value,
    depth: usize,
    issues: &mut IssueCollector,
) -> Option<Value> {
    match value {
        Value::Function(f) => f.resolve(tpl, depth + 1, issues),
        other => Some(get_function(tpl, context, other, false, issues)),
    }
}

/// Follows list indices and map keys into `value`, resolving functions met
/// on the way.
pub(crate) fn walk_path(
    fname: &str,
    value: &Value,
    path: &[Value],
    tpl: &TopologyTemplate,
    context: &Context,
    depth: usize,
    issues: &mut IssueCollector,
) -> Option<Value> {
    let mut current = unwrap_value(tpl, context, value, depth, issues)?;
    for segment in path {
        let next = match (&current, segment) {
            (Value::List(items), Value::Int(i)) => usize::try_from(*i).ok().and_then(|i| items.get(i)),
            (Value::Map(map), Value::String(key)) => map.get(key),
            _ => None,
        };
        let Some(next) = next else {
            let (code, reason) = match segment {
                Value::Int(_) => (IssueCode::IndexMismatch, "index"),
                _ => (IssueCode::KeyMismatch, "key"),
            };
            issues.push(
                code,
                format!(
                    "{}: {} \"{}\" cannot be applied to value \"{}\".",
                    fname, reason, segment, current
                ),
            );
            return None;
        };
        current = unwrap_value(tpl, context, next, depth, issues)?;
    }
    Some(current)
}

/// Reports a wrong argument count.
pub(crate) fn arity(fname: &str, expected: &str, got: usize, issues: &mut IssueCollector) {
    issues.push(
        IssueCode::FunctionArity,
        format!("{}: expected {}, got {} argument(s).", fname, expected, got),
    );
}

/// Reports an argument of the wrong kind.
pub(crate) fn bad_argument(
    fname: &str,
    what: &str,
    expected: &str,
    got: &Value,
    issues: &mut IssueCollector,
) {
    issues.push(
        IssueCode::FunctionArgument,
        format!("{}: {} must be {}, got \"{}\".", fname, what, expected, got),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn yaml(text: &str) -> Value {
        Value::from_yaml(&serde_yaml::from_str(text).unwrap())
    }

    #[rstest]
    #[case("{get_input: port}", true)]
    #[case("{get_property: [SELF, port]}", true)]
    #[case("{concat: []}", true)]
    #[case("{get_input: {nested: map}}", false)]
    #[case("{get_input: a, other: b}", false)]
    #[case("{get_everything: [a]}", false)]
    #[case("[get_input, port]", false)]
    #[case("get_input", false)]
    fn test_is_function(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_function(&yaml(text)), expected);
    }

    #[test]
    fn test_display_and_metadata() {
        let f = Function::Token(Token::new(
            Context::NodeTemplate("app".into()),
            smallvec::smallvec![Value::from("a.b"), Value::from("."), Value::Int(1)],
        ));
        assert_eq!(f.to_string(), "{token: [a.b, ., 1]}");
        assert_eq!(f.name(), TOKEN);
        assert_eq!(f.args().len(), 3);
        assert_eq!(f.context(), &Context::NodeTemplate("app".into()));
        assert!(f.is_deferred());
        assert!(is_function(&Value::from(f)));
    }
}
