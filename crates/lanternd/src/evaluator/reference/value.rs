//! Runtime values of the reference language.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use crate::evaluator::{EvalContext, EvalError};

use super::reader::{Form, FormKind};

/// Signature shared by every native function.
pub(crate) type NativeFn = fn(&[Value], &mut EvalContext) -> Result<Value, EvalError>;

/// Accepted argument counts of a native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub(crate) const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(expected) => count == expected,
            Self::AtLeast(minimum) => count >= minimum,
        }
    }
}

/// A function implemented in Rust.
#[derive(Clone, Copy)]
pub(crate) struct Native {
    pub(crate) name: &'static str,
    pub(crate) arity: Arity,
    pub(crate) func: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Native({})", self.name)
    }
}

/// Lexical bindings, searched innermost first.
#[derive(Debug, Clone, Default)]
pub(crate) struct Locals {
    bindings: Vec<(String, Value)>,
}

impl Locals {
    pub(crate) fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.push((name.into(), value));
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find_map(|(bound, value)| (bound == name).then_some(value))
    }
}

/// A function defined in the language.
#[derive(Debug)]
pub(crate) struct Lambda {
    pub(crate) name: Option<String>,
    pub(crate) ns: String,
    pub(crate) params: Vec<String>,
    pub(crate) rest: Option<String>,
    pub(crate) body: Vec<Form>,
    pub(crate) closure: Locals,
}

impl Lambda {
    pub(crate) fn accepts(&self, count: usize) -> bool {
        if self.rest.is_some() {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.name {
            Some(name) => format!("{}/{name}", self.ns),
            None => "fn".to_owned(),
        }
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    Keyword(String),
    Symbol(String),
    List(Vec<Value>),
    Vector(Vec<Value>),
    Var { ns: String, name: String },
    Fn(Arc<Lambda>),
    Native(Native),
}

impl Value {
    /// Converts a quoted form into data.
    pub(crate) fn from_form(form: &Form) -> Self {
        match &form.kind {
            FormKind::Nil => Self::Nil,
            FormKind::Bool(value) => Self::Bool(*value),
            FormKind::Int(value) => Self::Int(*value),
            FormKind::Str(text) => Self::Str(text.clone()),
            FormKind::Keyword(name) => Self::Keyword(name.clone()),
            FormKind::Symbol(name) => Self::Symbol(name.clone()),
            FormKind::List(items) => Self::List(items.iter().map(Self::from_form).collect()),
            FormKind::Vector(items) => Self::Vector(items.iter().map(Self::from_form).collect()),
        }
    }

    pub(crate) const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    pub(crate) const fn is_callable(&self) -> bool {
        matches!(self, Self::Fn(_) | Self::Native(_))
    }

    pub(crate) const fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Str(_) => "persistent_string",
            Self::Keyword(_) => "keyword",
            Self::Symbol(_) => "symbol",
            Self::List(_) => "persistent_list",
            Self::Vector(_) => "persistent_vector",
            Self::Var { .. } => "var",
            Self::Fn(_) | Self::Native(_) => "function",
        }
    }

    /// Printed form, readable back where possible.
    pub(crate) fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out);
        out
    }

    /// Text used by `str` and `print`: strings unquoted, `nil` empty.
    pub(crate) fn display(&self) -> String {
        match self {
            Self::Nil => String::new(),
            Self::Str(text) => text.clone(),
            other => other.repr(),
        }
    }

    fn write_repr(&self, out: &mut String) {
        match self {
            Self::Nil => out.push_str("nil"),
            Self::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
            Self::Int(value) => {
                let _ = write!(out, "{value}");
            }
            Self::Str(text) => write_quoted(text, out),
            Self::Keyword(name) => {
                out.push(':');
                out.push_str(name);
            }
            Self::Symbol(name) => out.push_str(name),
            Self::List(items) => write_items(items, '(', ')', out),
            Self::Vector(items) => write_items(items, '[', ']', out),
            Self::Var { ns, name } => {
                let _ = write!(out, "#'{ns}/{name}");
            }
            Self::Fn(lambda) => {
                let _ = write!(out, "#function[{}]", lambda.display_name());
            }
            Self::Native(native) => {
                let _ = write!(out, "#function[clojure.core/{}]", native.name);
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Str(left), Self::Str(right))
            | (Self::Keyword(left), Self::Keyword(right))
            | (Self::Symbol(left), Self::Symbol(right)) => left == right,
            (Self::List(left) | Self::Vector(left), Self::List(right) | Self::Vector(right)) => {
                left == right
            }
            (
                Self::Var { ns, name },
                Self::Var {
                    ns: other_ns,
                    name: other_name,
                },
            ) => ns == other_ns && name == other_name,
            (Self::Fn(left), Self::Fn(right)) => Arc::ptr_eq(left, right),
            (Self::Native(left), Self::Native(right)) => left.name == right.name,
            _ => false,
        }
    }
}

fn write_items(items: &[Value], open: char, close: char, out: &mut String) {
    out.push(open);
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        item.write_repr(out);
    }
    out.push(close);
}

fn write_quoted(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

/// Prints a form back as source text.
pub(crate) fn form_text(form: &Form) -> String {
    Value::from_form(form).repr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Value::Nil, "nil", "")]
    #[case(Value::Str("a\"b".to_owned()), "\"a\\\"b\"", "a\"b")]
    #[case(Value::Keyword("k".to_owned()), ":k", ":k")]
    #[case(Value::Vector(vec![Value::Int(1), Value::Str("x".to_owned())]), "[1 \"x\"]", "[1 \"x\"]")]
    #[case(Value::Var { ns: "user".to_owned(), name: "x".to_owned() }, "#'user/x", "#'user/x")]
    fn prints_values(#[case] value: Value, #[case] repr: &str, #[case] display: &str) {
        assert_eq!(value.repr(), repr);
        assert_eq!(value.display(), display);
    }

    #[test]
    fn lists_and_vectors_compare_by_elements() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let vector = Value::Vector(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(list, vector);
    }

    #[test]
    fn only_nil_and_false_are_falsey() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Str(String::new()).is_truthy());
    }
}
