//! Native functions interned into `clojure.core`.

use crate::evaluator::{EvalContext, EvalError};

use super::namespace::{CORE_NS, Var, VarMeta};
use super::value::{Arity, Native, NativeFn, Value};

struct CoreFn {
    name: &'static str,
    arity: Arity,
    func: NativeFn,
    doc: &'static str,
    arglists: &'static [&'static str],
}

const CORE_FNS: &[CoreFn] = &[
    CoreFn {
        name: "+",
        arity: Arity::AtLeast(0),
        func: add,
        doc: "Returns the sum of nums. (+) returns 0.",
        arglists: &["[]", "[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "-",
        arity: Arity::AtLeast(1),
        func: subtract,
        doc: "If no ys are supplied, returns the negation of x, else subtracts the ys from x.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "*",
        arity: Arity::AtLeast(0),
        func: multiply,
        doc: "Returns the product of nums. (*) returns 1.",
        arglists: &["[]", "[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "/",
        arity: Arity::AtLeast(1),
        func: divide,
        doc: "Divides x by the ys, truncating towards zero.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "=",
        arity: Arity::AtLeast(1),
        func: equals,
        doc: "Equality. Returns true if x equals y, false if not.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "<",
        arity: Arity::AtLeast(1),
        func: less_than,
        doc: "Returns non-nil if nums are in monotonically increasing order.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: ">",
        arity: Arity::AtLeast(1),
        func: greater_than,
        doc: "Returns non-nil if nums are in monotonically decreasing order.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "<=",
        arity: Arity::AtLeast(1),
        func: at_most,
        doc: "Returns non-nil if nums are in monotonically non-decreasing order.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: ">=",
        arity: Arity::AtLeast(1),
        func: at_least,
        doc: "Returns non-nil if nums are in monotonically non-increasing order.",
        arglists: &["[x]", "[x y]", "[x y & more]"],
    },
    CoreFn {
        name: "not",
        arity: Arity::Exact(1),
        func: not,
        doc: "Returns true if x is logical false, false otherwise.",
        arglists: &["[x]"],
    },
    CoreFn {
        name: "inc",
        arity: Arity::Exact(1),
        func: inc,
        doc: "Returns a number one greater than num.",
        arglists: &["[x]"],
    },
    CoreFn {
        name: "dec",
        arity: Arity::Exact(1),
        func: dec,
        doc: "Returns a number one less than num.",
        arglists: &["[x]"],
    },
    CoreFn {
        name: "str",
        arity: Arity::AtLeast(0),
        func: concat_str,
        doc: "With no args, returns the empty string. With one arg x, returns x.toString(). \
              With more than one arg, returns the concatenation of the str values of the args.",
        arglists: &["[]", "[x]", "[x & ys]"],
    },
    CoreFn {
        name: "print",
        arity: Arity::AtLeast(0),
        func: print,
        doc: "Prints the object(s) to the output stream, separated by spaces.",
        arglists: &["[& more]"],
    },
    CoreFn {
        name: "println",
        arity: Arity::AtLeast(0),
        func: println,
        doc: "Same as print followed by a newline.",
        arglists: &["[& more]"],
    },
    CoreFn {
        name: "list",
        arity: Arity::AtLeast(0),
        func: list,
        doc: "Creates a new list containing the items.",
        arglists: &["[& items]"],
    },
    CoreFn {
        name: "vector",
        arity: Arity::AtLeast(0),
        func: vector,
        doc: "Creates a new vector containing the args.",
        arglists: &["[& args]"],
    },
    CoreFn {
        name: "count",
        arity: Arity::Exact(1),
        func: count,
        doc: "Returns the number of items in the collection. (count nil) returns 0.",
        arglists: &["[coll]"],
    },
    CoreFn {
        name: "first",
        arity: Arity::Exact(1),
        func: first,
        doc: "Returns the first item in the collection.",
        arglists: &["[coll]"],
    },
    CoreFn {
        name: "identity",
        arity: Arity::Exact(1),
        func: identity,
        doc: "Returns its argument.",
        arglists: &["[x]"],
    },
];

/// Forms the evaluator expands itself but which are listed as macros.
const CORE_MACROS: &[(&str, &str, &[&str])] = &[
    (
        "defn",
        "Same as (def name (fn [params*] exprs*)) with any doc-string added to the var metadata.",
        &["[name doc-string? [params*] body]"],
    ),
    (
        "deftest",
        "Defines a test function with no arguments.",
        &["[name & body]"],
    ),
    (
        "is",
        "Generic assertion macro. Reports a pass, fail or error for the form.",
        &["[form]", "[form msg]"],
    ),
    (
        "ns",
        "Sets *ns* to the namespace named by name, creating it if needed.",
        &["[name docstring? references*]"],
    ),
    (
        "when",
        "Evaluates test. If logical true, evaluates body in an implicit do.",
        &["[test & body]"],
    ),
];

pub(crate) fn core_vars() -> Vec<Var> {
    let natives = CORE_FNS.iter().map(|core| Var {
        ns: CORE_NS.to_owned(),
        name: core.name.to_owned(),
        value: Value::Native(Native {
            name: core.name,
            arity: core.arity,
            func: core.func,
        }),
        meta: VarMeta {
            doc: Some(core.doc.to_owned()),
            arglists: core.arglists.iter().map(|&args| args.to_owned()).collect(),
            ..VarMeta::default()
        },
    });
    let macros = CORE_MACROS.iter().map(|&(name, doc, arglists)| Var {
        ns: CORE_NS.to_owned(),
        name: name.to_owned(),
        value: Value::Nil,
        meta: VarMeta {
            doc: Some(doc.to_owned()),
            arglists: arglists.iter().map(|&args| args.to_owned()).collect(),
            is_macro: true,
            ..VarMeta::default()
        },
    });
    natives.chain(macros).collect()
}

fn integer(value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(number) => Ok(*number),
        other => Err(EvalError::host(
            "ClassCastException",
            format!("{} cannot be cast to a number", other.type_name()),
        )),
    }
}

fn overflow() -> EvalError {
    EvalError::host("ArithmeticException", "integer overflow")
}

fn fold(
    args: &[Value],
    initial: i64,
    step: fn(i64, i64) -> Option<i64>,
) -> Result<Value, EvalError> {
    args.iter()
        .try_fold(initial, |total, arg| {
            step(total, integer(arg)?).ok_or_else(overflow)
        })
        .map(Value::Int)
}

fn add(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    fold(args, 0, i64::checked_add)
}

fn multiply(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    fold(args, 1, i64::checked_mul)
}

fn subtract(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    match args {
        [only] => integer(only)?.checked_neg().map(Value::Int).ok_or_else(overflow),
        [head, tail @ ..] => fold(tail, integer(head)?, i64::checked_sub),
        [] => Ok(Value::Int(0)),
    }
}

fn divide(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    let (numerator, divisors) = match args {
        [only] => (1, std::slice::from_ref(only)),
        [head, tail @ ..] => (integer(head)?, tail),
        [] => return Ok(Value::Int(1)),
    };
    divisors
        .iter()
        .try_fold(numerator, |total, arg| {
            let divisor = integer(arg)?;
            if divisor == 0 {
                return Err(EvalError::host("ArithmeticException", "Divide by zero"));
            }
            total.checked_div(divisor).ok_or_else(overflow)
        })
        .map(Value::Int)
}

fn equals(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.windows(2).all(|pair| match pair {
        [left, right] => left == right,
        _ => true,
    })))
}

fn compare(args: &[Value], holds: fn(i64, i64) -> bool) -> Result<Value, EvalError> {
    let numbers = args.iter().map(integer).collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Bool(numbers.windows(2).all(|pair| match pair {
        [left, right] => holds(*left, *right),
        _ => true,
    })))
}

fn less_than(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    compare(args, |left, right| left < right)
}

fn greater_than(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    compare(args, |left, right| left > right)
}

fn at_most(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    compare(args, |left, right| left <= right)
}

fn at_least(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    compare(args, |left, right| left >= right)
}

fn not(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(Value::Bool(!args.first().is_some_and(Value::is_truthy)))
}

fn inc(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    fold(args, 1, i64::checked_add)
}

fn dec(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    match args {
        [only] => integer(only)?.checked_sub(1).map(Value::Int).ok_or_else(overflow),
        _ => Ok(Value::Nil),
    }
}

fn concat_str(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(Value::Str(args.iter().map(Value::display).collect()))
}

fn joined(args: &[Value]) -> String {
    args.iter().map(Value::display).collect::<Vec<_>>().join(" ")
}

fn print(args: &[Value], context: &mut EvalContext) -> Result<Value, EvalError> {
    context.write_output(&joined(args));
    Ok(Value::Nil)
}

fn println(args: &[Value], context: &mut EvalContext) -> Result<Value, EvalError> {
    context.write_output(&joined(args));
    context.write_output("\n");
    Ok(Value::Nil)
}

fn list(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(Value::List(args.to_vec()))
}

fn vector(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(Value::Vector(args.to_vec()))
}

fn items(value: &Value) -> Result<&[Value], EvalError> {
    match value {
        Value::Nil => Ok(&[]),
        Value::List(items) | Value::Vector(items) => Ok(items),
        other => Err(EvalError::host(
            "UnsupportedOperationException",
            format!("count not supported on this type: {}", other.type_name()),
        )),
    }
}

fn count(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    let total = match args.first() {
        Some(Value::Str(text)) => text.chars().count(),
        Some(value) => items(value)?.len(),
        None => 0,
    };
    i64::try_from(total).map(Value::Int).map_err(|_| overflow())
}

fn first(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    let Some(value) = args.first() else {
        return Ok(Value::Nil);
    };
    Ok(items(value)?.first().cloned().unwrap_or(Value::Nil))
}

fn identity(args: &[Value], _: &mut EvalContext) -> Result<Value, EvalError> {
    Ok(args.first().cloned().unwrap_or(Value::Nil))
}
