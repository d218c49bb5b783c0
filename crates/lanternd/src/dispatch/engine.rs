//! The op dispatcher.
//!
//! [`Engine::handle`] turns one decoded request into the ordered responses
//! the transport writes back. Requests the engine refuses become a single
//! `unsupported` response; every other sequence ends with a `done` status.

use std::str::FromStr;

use lantern_bencode::Dict;
use strum::{EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

use crate::evaluator::Evaluator;
use crate::middleware::MiddlewareStack;
use crate::session::{Session, SessionRegistry};

use super::errors::Rejection;
use super::message::Message;
use super::response::unsupported;

/// Tracing target for request handling.
pub(crate) const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Operations the engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Op {
    /// Create a session.
    #[strum(serialize = "clone")]
    CloneSession,
    /// Report capabilities.
    Describe,
    /// List sessions.
    LsSessions,
    /// Close a session.
    Close,
    /// Evaluate code.
    Eval,
    /// Evaluate a file's contents.
    LoadFile,
    /// Complete a symbol prefix.
    Completions,
    /// Complete a prefix with var metadata.
    Complete,
    /// Resolve a symbol to its var.
    Lookup,
    /// Describe a symbol for editors.
    Info,
    /// Argument hints for a symbol.
    Eldoc,
    /// Enable system output forwarding.
    ForwardSystemOutput,
    /// Ask a running evaluation to stop.
    Interrupt,
    /// List middleware.
    LsMiddleware,
    /// Install middleware.
    AddMiddleware,
    /// Reorder middleware.
    SwapMiddleware,
    /// Feed stdin.
    Stdin,
    /// Report the last error.
    Caught,
    /// Break the last error down.
    AnalyzeLastStacktrace,
    /// Run tests in one namespace.
    Test,
    /// Run tests selected by a query.
    TestVarQuery,
}

impl Op {
    /// Wire name, e.g. `load-file`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Text advertised by `describe`.
    #[must_use]
    pub const fn doc(self) -> &'static str {
        match self {
            Self::CloneSession => "Create a new session",
            Self::Describe => "Describe server capabilities",
            Self::LsSessions => "List active sessions",
            Self::Close => "Close the provided session",
            Self::Eval => "Evaluate code in the given session",
            Self::LoadFile => "Load and evaluate a file",
            Self::Completions => "Return completion candidates",
            Self::Complete => "Return completion candidates with metadata",
            Self::Lookup => "Lookup metadata about a symbol",
            Self::Info => "Return CIDER-compatible symbol info",
            Self::Eldoc => "Return eldoc hints for a symbol",
            Self::ForwardSystemOutput => "Enable forwarding of System/out and System/err",
            Self::Interrupt => "Attempt to interrupt a running eval",
            Self::LsMiddleware => "List middleware stack",
            Self::AddMiddleware => "Add middleware",
            Self::SwapMiddleware => "Swap middleware order",
            Self::Stdin => "Provide stdin content",
            Self::Caught => "Return details about the last evaluation error",
            Self::AnalyzeLastStacktrace => "Return stacktrace analysis for the last error",
            Self::Test => "Run the tests of a namespace",
            Self::TestVarQuery => "Run the tests selected by a var query",
        }
    }
}

/// Session, middleware and evaluator state behind one request loop.
#[derive(Debug)]
pub struct Engine<E> {
    pub(super) evaluator: E,
    pub(super) sessions: SessionRegistry,
    pub(super) middleware: MiddlewareStack,
}

impl<E: Evaluator> Engine<E> {
    /// Creates an engine with no sessions and the default middleware stack.
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            sessions: SessionRegistry::new(),
            middleware: MiddlewareStack::default(),
        }
    }

    /// The evaluator requests run against.
    pub const fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Live sessions.
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Installed middleware.
    pub const fn middleware(&self) -> &MiddlewareStack {
        &self.middleware
    }

    /// Handles one request, returning responses in transmission order.
    pub fn handle(&mut self, message: &Message) -> Vec<Dict> {
        debug!(
            target: ENGINE_TARGET,
            op = message.op(),
            id = message.id(),
            session = message.session(),
            "handling request"
        );
        self.route(message).unwrap_or_else(|rejection| {
            debug!(target: ENGINE_TARGET, op = message.op(), %rejection, "request rejected");
            vec![unsupported(message, rejection)]
        })
    }

    fn route(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        if message.op().is_empty() {
            return Err(Rejection::MissingOp);
        }
        let op = Op::from_str(message.op()).map_err(|_| Rejection::UnknownOp)?;
        match op {
            Op::CloneSession => Ok(self.clone_session(message)),
            Op::Describe => Ok(self.describe(message)),
            Op::LsSessions => Ok(self.ls_sessions(message)),
            Op::Close => self.close(message),
            Op::Eval => self.eval(message),
            Op::LoadFile => self.load_file(message),
            Op::Completions => Ok(self.completions(message)),
            Op::Complete => self.complete(message),
            Op::Lookup => self.lookup(message),
            Op::Info => self.info(message),
            Op::Eldoc => self.eldoc(message),
            Op::ForwardSystemOutput => Ok(self.forward_system_output(message)),
            Op::Interrupt => self.interrupt(message),
            Op::LsMiddleware => Ok(self.ls_middleware(message)),
            Op::AddMiddleware => self.add_middleware(message),
            Op::SwapMiddleware => self.swap_middleware(message),
            Op::Stdin => self.stdin(message),
            Op::Caught => Ok(self.caught(message)),
            Op::AnalyzeLastStacktrace => Ok(self.analyze_last_stacktrace(message)),
            Op::Test => self.test(message),
            Op::TestVarQuery => Ok(self.test_var_query(message)),
        }
    }

    /// Resolves the request's session, creating it when needed.
    pub(super) fn session_for(&mut self, message: &Message) -> &mut Session {
        let user = self.evaluator.user_namespace();
        self.sessions.ensure(message.session(), &user)
    }

    /// The request's session id when it names a live session.
    pub(super) fn known_session(&self, message: &Message) -> Option<String> {
        self.sessions
            .get(message.session())
            .map(|session| session.id().to_owned())
    }
}
