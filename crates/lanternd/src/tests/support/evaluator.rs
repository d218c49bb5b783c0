//! Mock evaluator for driving the engine without a language runtime.

use mockall::mock;

use crate::evaluator::{
    EvalContext, EvalError, Evaluator, Namespace, SymbolEntry, TestOutcome, VarInfo,
};

mock! {
    pub Runtime {}

    impl Evaluator for Runtime {
        fn version(&self) -> String;
        fn user_namespace(&self) -> Namespace;
        fn find_namespace(&self, name: &str) -> Option<Namespace>;
        fn resolve_alias(&self, ns: &Namespace, alias: &str) -> Option<Namespace>;
        fn symbols(&self, ns: &Namespace) -> Vec<SymbolEntry>;
        fn find_var(&self, ns: &Namespace, name: &str) -> Option<VarInfo>;
        fn eval(&mut self, code: &str, context: &mut EvalContext) -> Result<String, EvalError>;
        fn load_namespace(&mut self, name: &str) -> Result<Namespace, EvalError>;
        fn test_vars(&self, ns: &Namespace) -> Vec<String>;
        fn run_test(&mut self, ns: &Namespace, var: &str) -> Result<TestOutcome, EvalError>;
    }
}

impl MockRuntime {
    /// A mock whose sessions start in `user`.
    #[must_use]
    pub fn in_user_namespace() -> Self {
        let mut runtime = Self::new();
        runtime
            .expect_user_namespace()
            .returning(|| Namespace::new("user"));
        runtime
    }
}
