//! A small Clojure-flavoured interpreter implementing [`Evaluator`].
//!
//! It exists so the server can run and be exercised end to end without an
//! external runtime. The language covers integers, strings, keywords,
//! vectors, `def`/`defn`/`fn`/`let`/`if`/`do`, namespaces with aliases,
//! `throw`, and `deftest`/`is` for the test ops. Source for namespaces that
//! `require` may load is registered up front with
//! [`ReferenceEvaluator::register_source`].
//!
//! ```text
//! user=> (ns app.core (:require [app.util :as u]))
//! app.core=> (defn add [a b] (+ a b))
//! #'app.core/add
//! ```

mod builtins;
mod eval;
mod namespace;
mod reader;
mod value;

use self::eval::{Interpreter, load_namespace};
use self::namespace::{NamespaceTable, USER_NS, Var};
use self::value::Value;

use super::{
    EvalContext, EvalError, Evaluator, Namespace, SymbolEntry, TestOutcome, VarInfo,
};

/// In-process evaluator for the bundled reference language.
#[derive(Debug)]
pub struct ReferenceEvaluator {
    table: NamespaceTable,
}

impl ReferenceEvaluator {
    /// Creates an image holding `clojure.core` and an empty `user` namespace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: NamespaceTable::new(),
        }
    }

    /// Makes `source` loadable as namespace `ns` through `require`.
    pub fn register_source(&mut self, ns: &str, source: &str) {
        self.table.register_source(ns, source);
    }
}

impl Default for ReferenceEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(var: &Var) -> VarInfo {
    VarInfo {
        name: var.name.clone(),
        ns: var.ns.clone(),
        repr: var.repr(),
        doc: var.meta.doc.clone(),
        arglists: var.meta.arglists.clone(),
        is_macro: var.meta.is_macro,
        is_function: var.value.is_callable(),
        file: var.meta.file.clone(),
        line: var.meta.line,
        column: var.meta.column,
    }
}

impl Evaluator for ReferenceEvaluator {
    fn version(&self) -> String {
        concat!("lantern-reference ", env!("CARGO_PKG_VERSION")).to_owned()
    }

    fn user_namespace(&self) -> Namespace {
        Namespace::new(USER_NS)
    }

    fn find_namespace(&self, name: &str) -> Option<Namespace> {
        self.table.contains(name).then(|| Namespace::new(name))
    }

    fn resolve_alias(&self, ns: &Namespace, alias: &str) -> Option<Namespace> {
        self.table
            .get(ns.name())?
            .aliases
            .get(alias)
            .map(|target| Namespace::new(target.as_str()))
    }

    fn symbols(&self, ns: &Namespace) -> Vec<SymbolEntry> {
        self.table
            .visible(ns.name())
            .into_iter()
            .map(|(var, interned)| SymbolEntry {
                name: var.name.clone(),
                repr: var.repr(),
                interned,
            })
            .collect()
    }

    fn keywords(&self) -> Vec<String> {
        self.table.keywords().map(str::to_owned).collect()
    }

    fn find_var(&self, ns: &Namespace, name: &str) -> Option<VarInfo> {
        self.table.resolve(ns.name(), name).map(describe)
    }

    fn eval(&mut self, code: &str, context: &mut EvalContext) -> Result<String, EvalError> {
        self.table.ensure(context.namespace().name());
        Interpreter::new(&mut self.table, context, None)
            .eval_source(code)
            .map(|value| value.repr())
    }

    fn load_namespace(&mut self, name: &str) -> Result<Namespace, EvalError> {
        load_namespace(&mut self.table, name)?;
        Ok(Namespace::new(name))
    }

    fn test_vars(&self, ns: &Namespace) -> Vec<String> {
        self.table
            .get(ns.name())
            .map(|data| {
                data.vars
                    .values()
                    .filter(|var| var.meta.is_test)
                    .map(|var| var.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn run_test(&mut self, ns: &Namespace, var: &str) -> Result<TestOutcome, EvalError> {
        let test = self
            .table
            .get(ns.name())
            .and_then(|data| data.vars.get(var))
            .filter(|found| found.meta.is_test);
        let Some(Var {
            value: Value::Fn(lambda),
            meta,
            ..
        }) = test
        else {
            return Err(EvalError::host(
                "IllegalArgumentException",
                format!("No test var {}/{var}", ns.name()),
            ));
        };
        let lambda = std::sync::Arc::clone(lambda);
        let mut context = EvalContext::new(ns.clone());
        if let Some(file) = &meta.file {
            context = context.with_file(file.as_str());
        }

        let mut outcome = TestOutcome::default();
        Interpreter::new(&mut self.table, &mut context, Some(&mut outcome)).run_test(&lambda);
        Ok(outcome)
    }
}
