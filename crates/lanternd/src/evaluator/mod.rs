//! Contract between the nREPL engine and the language runtime behind it.
//!
//! The engine never reaches into ambient runtime state. Every evaluation
//! receives an explicit [`EvalContext`] carrying the namespace to evaluate in,
//! an optional file hint and the sink that collects printed output. The
//! evaluator reports the namespace it finished in through the same context,
//! so `(ns foo)` persists into the calling session without any global
//! save-and-restore dance.

mod error;
pub mod reference;

use std::fmt;

pub use error::{CompileError, ErrorNote, EvalError, SourceLocation};

/// Handle to a namespace known to an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Wraps a namespace name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the namespace name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Per-call evaluation state handed to [`Evaluator::eval`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    namespace: Namespace,
    file: Option<String>,
    output: String,
}

impl EvalContext {
    /// Creates a context evaluating in `namespace` with an empty output sink.
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            file: None,
            output: String::new(),
        }
    }

    /// Attaches a file hint used in source locations.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        let file = file.into();
        self.file = (!file.is_empty()).then_some(file);
        self
    }

    /// Namespace the code evaluates in.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Switches the namespace, e.g. after `in-ns`.
    pub fn set_namespace(&mut self, namespace: Namespace) {
        self.namespace = namespace;
    }

    /// File hint supplied by the client, if any.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Appends printed text to the output sink.
    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Text printed so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Drains the output sink.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

/// A name visible from a namespace, as listed by [`Evaluator::symbols`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Unqualified symbol name.
    pub name: String,
    /// Printed form of the var, e.g. `#'user/inc`.
    pub repr: String,
    /// `true` when the var is defined in the namespace itself rather than
    /// referred from another one.
    pub interned: bool,
}

/// Metadata describing a resolved var.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarInfo {
    /// Unqualified var name.
    pub name: String,
    /// Namespace owning the var.
    pub ns: String,
    /// Printed form of the var.
    pub repr: String,
    /// Docstring, when one was given.
    pub doc: Option<String>,
    /// Argument vectors as printed strings, e.g. `[x y]`.
    pub arglists: Vec<String>,
    /// The var names a macro.
    pub is_macro: bool,
    /// The var is bound to something callable.
    pub is_function: bool,
    /// Defining file.
    pub file: Option<String>,
    /// Defining line, 1-based.
    pub line: Option<u32>,
    /// Defining column, 1-based.
    pub column: Option<u32>,
}

/// Outcome class of a single test assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    /// The assertion held.
    Pass,
    /// The assertion did not hold.
    Fail,
    /// Evaluating the assertion raised an error.
    Error,
}

impl TestKind {
    /// Wire name of the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

/// One reported assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    /// Outcome class.
    pub kind: TestKind,
    /// Assertion message.
    pub message: Option<String>,
    /// Printed expected value.
    pub expected: Option<String>,
    /// Printed actual value.
    pub actual: Option<String>,
    /// File the assertion lives in.
    pub file: Option<String>,
    /// Line of the assertion.
    pub line: Option<u32>,
}

impl TestRecord {
    /// Builds a record with only the outcome set.
    #[must_use]
    pub const fn new(kind: TestKind) -> Self {
        Self {
            kind,
            message: None,
            expected: None,
            actual: None,
            file: None,
            line: None,
        }
    }
}

/// Per-var totals kept by the test runner.
///
/// These are authoritative: a runner may count passing assertions it never
/// reports as records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestCounts {
    /// Assertions executed.
    pub test: u64,
    /// Assertions that passed.
    pub pass: u64,
    /// Assertions that failed.
    pub fail: u64,
    /// Assertions or test bodies that raised.
    pub error: u64,
}

impl TestCounts {
    /// Counts one assertion of `kind`.
    pub fn tally(&mut self, kind: TestKind) {
        self.test += 1;
        match kind {
            TestKind::Pass => self.pass += 1,
            TestKind::Fail => self.fail += 1,
            TestKind::Error => self.error += 1,
        }
    }

    /// Adds `other` to these totals.
    pub fn absorb(&mut self, other: Self) {
        self.test += other.test;
        self.pass += other.pass;
        self.fail += other.fail;
        self.error += other.error;
    }
}

/// Everything observed while running one test var.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestOutcome {
    /// Reported assertions in execution order.
    pub records: Vec<TestRecord>,
    /// Totals for the var, including unreported passes.
    pub counts: TestCounts,
}

impl TestOutcome {
    /// Reports `record` and counts it.
    pub fn report(&mut self, record: TestRecord) {
        self.counts.tally(record.kind);
        self.records.push(record);
    }
}

/// A language runtime the engine can drive.
///
/// Calls are serialised by the engine lock, so implementations may keep
/// mutable state without further synchronisation.
pub trait Evaluator: Send {
    /// Version string reported by `describe`.
    fn version(&self) -> String;

    /// Namespace new sessions start in.
    fn user_namespace(&self) -> Namespace;

    /// Looks up a loaded namespace by name.
    fn find_namespace(&self, name: &str) -> Option<Namespace>;

    /// Resolves `alias` as seen from `ns`.
    fn resolve_alias(&self, ns: &Namespace, alias: &str) -> Option<Namespace>;

    /// Display name of a namespace handle.
    fn namespace_name(&self, ns: &Namespace) -> String {
        ns.name().to_owned()
    }

    /// Every symbol visible from `ns`: its own vars plus referred ones.
    fn symbols(&self, ns: &Namespace) -> Vec<SymbolEntry>;

    /// Keywords interned so far, without the leading colon. Namespaced ones
    /// read `ns/name`.
    fn keywords(&self) -> Vec<String> {
        Vec::new()
    }

    /// Resolves `name` from `ns`.
    fn find_var(&self, ns: &Namespace, name: &str) -> Option<VarInfo>;

    /// Evaluates every form in `code`, returning the printed last value.
    ///
    /// # Errors
    ///
    /// Returns the classified failure; output written before the failure
    /// stays in `context`.
    fn eval(&mut self, code: &str, context: &mut EvalContext) -> Result<String, EvalError>;

    /// Ensures the namespace called `name` is loaded.
    ///
    /// # Errors
    ///
    /// Fails when the namespace cannot be found or loading it fails.
    fn load_namespace(&mut self, name: &str) -> Result<Namespace, EvalError>;

    /// Names of the test vars defined in `ns`.
    fn test_vars(&self, ns: &Namespace) -> Vec<String>;

    /// Runs the test var `var` in `ns`.
    ///
    /// # Errors
    ///
    /// Fails when the test could not run at all; assertion failures are
    /// reported through [`TestOutcome::records`] instead.
    fn run_test(&mut self, ns: &Namespace, var: &str) -> Result<TestOutcome, EvalError>;
}
