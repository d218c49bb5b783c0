//! Tree-walking interpreter over positioned forms.

use std::sync::Arc;

use crate::evaluator::{
    CompileError, EvalContext, EvalError, Namespace, SourceLocation, TestKind, TestOutcome,
    TestRecord,
};

use super::namespace::{NamespaceTable, USER_NS, Var, VarMeta};
use super::reader::{Form, FormKind, read_all};
use super::value::{Lambda, Locals, Value, form_text};

/// Nesting limit guarding the native stack.
pub(crate) const MAX_EVAL_DEPTH: usize = 128;

const SPECIAL_FORMS: &[&str] = &[
    "quote", "if", "do", "def", "defn", "fn", "let", "ns", "in-ns", "require", "throw", "deftest",
    "is", "when",
];

#[derive(Clone)]
struct Scope {
    ns: String,
    locals: Locals,
}

pub(crate) struct Interpreter<'a> {
    table: &'a mut NamespaceTable,
    context: &'a mut EvalContext,
    report: Option<&'a mut TestOutcome>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(
        table: &'a mut NamespaceTable,
        context: &'a mut EvalContext,
        report: Option<&'a mut TestOutcome>,
    ) -> Self {
        Self {
            table,
            context,
            report,
        }
    }

    /// Reads and evaluates every form in `source`, returning the last value.
    pub(crate) fn eval_source(&mut self, source: &str) -> Result<Value, EvalError> {
        let forms = read_all(source, self.context.file())?;
        let mut last = Value::Nil;
        for form in &forms {
            let scope = Scope {
                ns: self.context.namespace().name().to_owned(),
                locals: Locals::default(),
            };
            last = self.eval(form, &scope, 0)?;
        }
        Ok(last)
    }

    /// Calls a test function, turning escaped failures into error records.
    pub(crate) fn run_test(&mut self, lambda: &Arc<Lambda>) {
        if let Err(error) = self.apply_lambda(lambda, Vec::new(), None, 0) {
            let mut record = TestRecord::new(TestKind::Error);
            record.message = Some("Uncaught exception, not in assertion.".to_owned());
            record.actual = Some(error.message());
            record.file = self.context.file().map(str::to_owned);
            if let Some(report) = self.report.as_deref_mut() {
                report.report(record);
            }
        }
    }

    fn location(&self, form: &Form) -> SourceLocation {
        SourceLocation::new(self.context.file(), form.line, form.column)
    }

    fn invalid(&self, form: &Form, message: impl Into<String>) -> EvalError {
        CompileError::new("analyze/invalid-special-form", message, self.location(form)).into()
    }

    fn eval(&mut self, form: &Form, scope: &Scope, depth: usize) -> Result<Value, EvalError> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::host(
                "StackOverflowError",
                format!("Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"),
            ));
        }
        match &form.kind {
            FormKind::Symbol(name) => self.resolve_symbol(form, name, scope),
            FormKind::Vector(items) => Ok(Value::Vector(self.eval_all(items, scope, depth)?)),
            FormKind::List(items) => self.eval_list(form, items, scope, depth),
            FormKind::Keyword(name) => Ok(Value::Keyword(self.keyword(name, scope))),
            _ => Ok(Value::from_form(form)),
        }
    }

    /// Interns a keyword literal; `::name` resolves against the scope's
    /// namespace.
    fn keyword(&mut self, name: &str, scope: &Scope) -> String {
        let resolved = match name.strip_prefix(':') {
            Some(local) => format!("{}/{local}", scope.ns),
            None => name.to_owned(),
        };
        self.table.intern_keyword(&resolved);
        resolved
    }

    fn eval_all(
        &mut self,
        forms: &[Form],
        scope: &Scope,
        depth: usize,
    ) -> Result<Vec<Value>, EvalError> {
        forms
            .iter()
            .map(|form| self.eval(form, scope, depth + 1))
            .collect()
    }

    fn eval_body(&mut self, forms: &[Form], scope: &Scope, depth: usize) -> Result<Value, EvalError> {
        let mut last = Value::Nil;
        for form in forms {
            last = self.eval(form, scope, depth + 1)?;
        }
        Ok(last)
    }

    fn resolve_symbol(&self, form: &Form, name: &str, scope: &Scope) -> Result<Value, EvalError> {
        if let Some(value) = scope.locals.get(name) {
            return Ok(value.clone());
        }
        match self.table.resolve(&scope.ns, name) {
            Some(var) if var.meta.is_macro => Err(CompileError::new(
                "analyze/macro-value",
                format!("Can't take value of a macro: {}", var.repr()),
                self.location(form),
            )
            .into()),
            Some(var) => Ok(var.value.clone()),
            None => Err(CompileError::new(
                "analyze/unresolved-symbol",
                format!("Unable to resolve symbol: {name} in this context"),
                self.location(form),
            )
            .into()),
        }
    }

    fn eval_list(
        &mut self,
        form: &Form,
        items: &[Form],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let Some((head, args)) = items.split_first() else {
            return Ok(Value::List(Vec::new()));
        };
        if let Some(special) = head
            .as_symbol()
            .filter(|name| SPECIAL_FORMS.contains(name) && scope.locals.get(name).is_none())
        {
            return self.eval_special(special, form, args, scope, depth);
        }

        let callee = self.eval(head, scope, depth + 1)?;
        let values = self.eval_all(args, scope, depth)?;
        self.apply(&callee, values, form, depth)
    }

    fn apply(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        form: &Form,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match callee {
            Value::Native(native) => {
                if !native.arity.accepts(args.len()) {
                    let name = format!("clojure.core/{}", native.name);
                    return Err(self.arity_error(args.len(), &name, form));
                }
                (native.func)(&args, &mut *self.context)
            }
            Value::Fn(lambda) => self.apply_lambda(lambda, args, Some(form), depth),
            other => Err(EvalError::host(
                "ClassCastException",
                format!("{} cannot be cast to a function", other.type_name()),
            )),
        }
    }

    fn arity_error(&self, count: usize, name: &str, form: &Form) -> EvalError {
        CompileError::new(
            "runtime/invalid-arity",
            format!("Wrong number of args ({count}) passed to: {name}"),
            self.location(form),
        )
        .into()
    }

    fn apply_lambda(
        &mut self,
        lambda: &Arc<Lambda>,
        args: Vec<Value>,
        form: Option<&Form>,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if !lambda.accepts(args.len()) {
            let location = form.map_or_else(SourceLocation::default, |form| self.location(form));
            return Err(CompileError::new(
                "runtime/invalid-arity",
                format!(
                    "Wrong number of args ({}) passed to: {}",
                    args.len(),
                    lambda.display_name()
                ),
                location,
            )
            .into());
        }

        let mut locals = lambda.closure.clone();
        if let Some(name) = &lambda.name {
            locals.bind(name.clone(), Value::Fn(Arc::clone(lambda)));
        }
        let mut remaining = args.into_iter();
        for param in &lambda.params {
            locals.bind(param.clone(), remaining.next().unwrap_or(Value::Nil));
        }
        if let Some(rest) = &lambda.rest {
            locals.bind(rest.clone(), Value::List(remaining.collect()));
        }
        let scope = Scope {
            ns: lambda.ns.clone(),
            locals,
        };
        self.eval_body(&lambda.body, &scope, depth + 1)
    }

    fn eval_special(
        &mut self,
        special: &str,
        form: &Form,
        args: &[Form],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        match special {
            "quote" => match args {
                [quoted] => Ok(Value::from_form(quoted)),
                _ => Err(self.invalid(form, "quote expects exactly one form")),
            },
            "if" => match args {
                [test, then] => self.eval_if(test, then, None, scope, depth),
                [test, then, otherwise] => self.eval_if(test, then, Some(otherwise), scope, depth),
                _ => Err(self.invalid(form, "if expects a test, a then form and an optional else form")),
            },
            "when" => match args {
                [test, body @ ..] => {
                    if self.eval(test, scope, depth + 1)?.is_truthy() {
                        self.eval_body(body, scope, depth)
                    } else {
                        Ok(Value::Nil)
                    }
                }
                [] => Err(self.invalid(form, "when expects a test")),
            },
            "do" => self.eval_body(args, scope, depth),
            "def" => self.eval_def(form, args, scope, depth),
            "defn" => self.eval_defn(form, args, scope),
            "fn" => self.eval_fn(form, args, scope),
            "let" => self.eval_let(form, args, scope, depth),
            "throw" => match args {
                [thrown] => {
                    let value = self.eval(thrown, scope, depth + 1)?;
                    Err(EvalError::Thrown {
                        value: value.repr(),
                        type_name: value.type_name().to_owned(),
                    })
                }
                _ => Err(self.invalid(form, "throw expects exactly one form")),
            },
            "ns" => self.eval_ns(form, args),
            "in-ns" => match args {
                [target] => {
                    let Value::Symbol(name) = self.eval(target, scope, depth + 1)? else {
                        return Err(self.invalid(form, "in-ns expects a symbol"));
                    };
                    self.switch_namespace(&name);
                    Ok(Value::Nil)
                }
                _ => Err(self.invalid(form, "in-ns expects exactly one argument")),
            },
            "require" => {
                for spec in self.eval_all(args, scope, depth)? {
                    self.require(form, &spec)?;
                }
                Ok(Value::Nil)
            }
            "deftest" => self.eval_deftest(form, args, scope),
            "is" => match args {
                [assertion] => self.eval_is(assertion, None, scope, depth),
                [assertion, message] => {
                    let text = self.eval(message, scope, depth + 1)?.display();
                    self.eval_is(assertion, Some(text), scope, depth)
                }
                _ => Err(self.invalid(form, "is expects a form and an optional message")),
            },
            _ => Err(self.invalid(form, format!("unknown special form {special}"))),
        }
    }

    fn eval_if(
        &mut self,
        test: &Form,
        then: &Form,
        otherwise: Option<&Form>,
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        if self.eval(test, scope, depth + 1)?.is_truthy() {
            self.eval(then, scope, depth + 1)
        } else {
            otherwise.map_or(Ok(Value::Nil), |branch| self.eval(branch, scope, depth + 1))
        }
    }

    fn meta_at(&self, form: &Form) -> VarMeta {
        VarMeta {
            file: self.context.file().map(str::to_owned),
            line: Some(form.line),
            column: Some(form.column),
            ..VarMeta::default()
        }
    }

    fn intern(&mut self, ns: &str, name: &str, value: Value, meta: VarMeta) -> Value {
        self.table.intern(Var {
            ns: ns.to_owned(),
            name: name.to_owned(),
            value,
            meta,
        });
        Value::Var {
            ns: ns.to_owned(),
            name: name.to_owned(),
        }
    }

    fn eval_def(
        &mut self,
        form: &Form,
        args: &[Form],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let (name, doc, init) = match args {
            [name] => (name, None, None),
            [name, init] => (name, None, Some(init)),
            [name, doc, init] if doc.as_str().is_some() => (name, doc.as_str(), Some(init)),
            _ => return Err(self.invalid(form, "def expects a name, an optional docstring and a value")),
        };
        let Some(name) = name.as_symbol() else {
            return Err(self.invalid(form, "def expects a symbol name"));
        };
        let value = match init {
            Some(init) => self.eval(init, scope, depth + 1)?,
            None => Value::Nil,
        };
        let mut meta = self.meta_at(form);
        meta.doc = doc.map(str::to_owned);
        Ok(self.intern(&scope.ns, name, value, meta))
    }

    fn eval_defn(&mut self, form: &Form, args: &[Form], scope: &Scope) -> Result<Value, EvalError> {
        let Some((name_form, rest)) = args.split_first() else {
            return Err(self.invalid(form, "defn expects a name"));
        };
        let Some(name) = name_form.as_symbol() else {
            return Err(self.invalid(form, "defn expects a symbol name"));
        };
        let (doc, rest) = match rest.split_first() {
            Some((doc, tail)) if doc.as_str().is_some() => (doc.as_str(), tail),
            _ => (None, rest),
        };
        let Some((params, body)) = rest.split_first() else {
            return Err(self.invalid(form, "defn expects a parameter vector"));
        };
        let lambda = self.lambda(form, Some(name), params, body, scope)?;
        let mut meta = self.meta_at(form);
        meta.doc = doc.map(str::to_owned);
        meta.arglists = vec![form_text(params)];
        Ok(self.intern(&scope.ns, name, Value::Fn(Arc::new(lambda)), meta))
    }

    fn eval_fn(&mut self, form: &Form, args: &[Form], scope: &Scope) -> Result<Value, EvalError> {
        let (name, rest) = match args.split_first() {
            Some((name, tail)) if name.as_symbol().is_some() => (name.as_symbol(), tail),
            _ => (None, args),
        };
        let Some((params, body)) = rest.split_first() else {
            return Err(self.invalid(form, "fn expects a parameter vector"));
        };
        let lambda = self.lambda(form, name, params, body, scope)?;
        Ok(Value::Fn(Arc::new(lambda)))
    }

    fn lambda(
        &self,
        form: &Form,
        name: Option<&str>,
        params: &Form,
        body: &[Form],
        scope: &Scope,
    ) -> Result<Lambda, EvalError> {
        let Some(items) = params.as_vector() else {
            return Err(self.invalid(form, "parameters must be a vector"));
        };
        let mut names = Vec::new();
        let mut rest = None;
        let mut symbols = items.iter();
        while let Some(item) = symbols.next() {
            match item.as_symbol() {
                Some("&") => {
                    let Some(rest_name) = symbols.next().and_then(Form::as_symbol) else {
                        return Err(self.invalid(form, "& must be followed by a symbol"));
                    };
                    rest = Some(rest_name.to_owned());
                    if symbols.next().is_some() {
                        return Err(self.invalid(form, "only one parameter may follow &"));
                    }
                }
                Some(param) => names.push(param.to_owned()),
                None => return Err(self.invalid(form, "parameters must be symbols")),
            }
        }
        Ok(Lambda {
            name: name.map(str::to_owned),
            ns: scope.ns.clone(),
            params: names,
            rest,
            body: body.to_vec(),
            closure: scope.locals.clone(),
        })
    }

    fn eval_let(
        &mut self,
        form: &Form,
        args: &[Form],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let Some((bindings, body)) = args.split_first() else {
            return Err(self.invalid(form, "let expects a binding vector"));
        };
        let Some(pairs) = bindings.as_vector().filter(|items| items.len() % 2 == 0) else {
            return Err(self.invalid(form, "let expects an even number of binding forms"));
        };
        let mut inner = scope.clone();
        for pair in pairs.chunks(2) {
            let [target, init] = pair else {
                continue;
            };
            let Some(name) = target.as_symbol() else {
                return Err(self.invalid(target, "let bindings must be symbols"));
            };
            let value = self.eval(init, &inner, depth + 1)?;
            inner.locals.bind(name, value);
        }
        self.eval_body(body, &inner, depth)
    }

    fn switch_namespace(&mut self, name: &str) {
        self.table.ensure(name);
        self.context.set_namespace(Namespace::new(name));
    }

    fn eval_ns(&mut self, form: &Form, args: &[Form]) -> Result<Value, EvalError> {
        let Some((name_form, clauses)) = args.split_first() else {
            return Err(self.invalid(form, "ns expects a name"));
        };
        let Some(name) = name_form.as_symbol() else {
            return Err(self.invalid(form, "ns expects a symbol name"));
        };
        self.switch_namespace(name);
        for clause in clauses {
            let FormKind::List(items) = &clause.kind else {
                continue;
            };
            let Some((head, specs)) = items.split_first() else {
                continue;
            };
            if head.kind != FormKind::Keyword("require".to_owned()) {
                continue;
            }
            for spec in specs {
                self.require(clause, &Value::from_form(spec))?;
            }
        }
        Ok(Value::Nil)
    }

    fn require(&mut self, form: &Form, spec: &Value) -> Result<(), EvalError> {
        let (target, alias) = match spec {
            Value::Symbol(target) => (target.as_str(), None),
            Value::Vector(items) => match items.as_slice() {
                [Value::Symbol(target)] => (target.as_str(), None),
                [Value::Symbol(target), Value::Keyword(option), Value::Symbol(alias)]
                    if option == "as" =>
                {
                    (target.as_str(), Some(alias.as_str()))
                }
                _ => return Err(self.invalid(form, "require expects [namespace :as alias]")),
            },
            _ => return Err(self.invalid(form, "require expects a quoted namespace")),
        };
        load_namespace(self.table, target)?;
        if let Some(alias) = alias {
            let current = self.context.namespace().name().to_owned();
            self.table.add_alias(&current, alias, target);
        }
        Ok(())
    }

    fn eval_deftest(&mut self, form: &Form, args: &[Form], scope: &Scope) -> Result<Value, EvalError> {
        let Some((name_form, body)) = args.split_first() else {
            return Err(self.invalid(form, "deftest expects a name"));
        };
        let Some(name) = name_form.as_symbol() else {
            return Err(self.invalid(form, "deftest expects a symbol name"));
        };
        let lambda = Lambda {
            name: Some(name.to_owned()),
            ns: scope.ns.clone(),
            params: Vec::new(),
            rest: None,
            body: body.to_vec(),
            closure: scope.locals.clone(),
        };
        let mut meta = self.meta_at(form);
        meta.is_test = true;
        Ok(self.intern(&scope.ns, name, Value::Fn(Arc::new(lambda)), meta))
    }

    fn eval_is(
        &mut self,
        assertion: &Form,
        message: Option<String>,
        scope: &Scope,
        depth: usize,
    ) -> Result<Value, EvalError> {
        let mut record = TestRecord::new(TestKind::Pass);
        record.message = message;
        record.file = self.context.file().map(str::to_owned);
        record.line = Some(assertion.line);

        let outcome = self.check(assertion, &mut record, scope, depth);
        let passed = match outcome {
            Ok(passed) => passed,
            Err(error) if self.report.is_some() => {
                record.kind = TestKind::Error;
                record.expected = Some(form_text(assertion));
                record.actual = Some(error.message());
                false
            }
            Err(error) => return Err(error),
        };
        if !passed && record.kind == TestKind::Pass {
            record.kind = TestKind::Fail;
        }

        match self.report.as_deref_mut() {
            Some(report) => report.report(record),
            None if !passed => {
                let expected = record.expected.unwrap_or_default();
                let actual = record.actual.unwrap_or_default();
                self.context.write_output(&format!(
                    "FAIL in {}\nexpected: {expected}\n  actual: {actual}\n",
                    form_text(assertion)
                ));
            }
            None => {}
        }
        Ok(Value::Bool(passed))
    }

    fn check(
        &mut self,
        assertion: &Form,
        record: &mut TestRecord,
        scope: &Scope,
        depth: usize,
    ) -> Result<bool, EvalError> {
        if let FormKind::List(items) = &assertion.kind
            && let [head, expected, actuals @ ..] = items.as_slice()
            && head.as_symbol() == Some("=")
            && !actuals.is_empty()
        {
            let expected_value = self.eval(expected, scope, depth + 1)?;
            let actual_values = self.eval_all(actuals, scope, depth)?;
            record.expected = Some(expected_value.repr());
            record.actual = actual_values.first().map(Value::repr);
            return Ok(actual_values.iter().all(|actual| *actual == expected_value));
        }

        let value = self.eval(assertion, scope, depth + 1)?;
        record.expected = Some(form_text(assertion));
        record.actual = Some(value.repr());
        Ok(value.is_truthy())
    }
}

/// Loads `name` from its registered source unless it already exists.
pub(crate) fn load_namespace(table: &mut NamespaceTable, name: &str) -> Result<(), EvalError> {
    if table.contains(name) {
        return Ok(());
    }
    let path = source_path(name);
    let Some(source) = table.source(name).map(str::to_owned) else {
        return Err(EvalError::host(
            "FileNotFoundException",
            format!("Could not locate {path} on the load path"),
        ));
    };
    if !table.begin_loading(name) {
        return Err(EvalError::host(
            "IllegalStateException",
            format!("Cyclic load dependency while loading {name}"),
        ));
    }

    let mut context = EvalContext::new(Namespace::new(USER_NS)).with_file(path.clone());
    let result = Interpreter::new(table, &mut context, None).eval_source(&source);
    table.finish_loading(name);
    result?;

    if table.contains(name) {
        Ok(())
    } else {
        Err(EvalError::host(
            "IllegalStateException",
            format!("namespace '{name}' not found after loading '{path}'"),
        ))
    }
}

/// Conventional source path of a namespace, e.g. `app/core_test.clj`.
pub(crate) fn source_path(ns: &str) -> String {
    format!("{}.clj", ns.replace('.', "/").replace('-', "_"))
}
