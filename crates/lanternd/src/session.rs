//! Session lifecycle: ensure, clone, close and list.
//!
//! Sessions are owned by [`SessionRegistry`]; request handlers borrow one
//! mutably for the duration of a single call. Requests that omit a session
//! id share a lazily created default session, so consecutive anonymous
//! evaluations observe each other's namespace changes.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use tracing::debug;
use uuid::Uuid;

use crate::evaluator::{CompileError, EvalError, Namespace};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");

/// The most recent evaluation failure recorded against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtError {
    /// Text reported as `err`.
    pub message: String,
    /// Text reported as `exception-type`.
    pub type_name: String,
    /// Structured details for compile failures.
    pub details: Option<CompileError>,
}

impl From<&EvalError> for CaughtError {
    fn from(error: &EvalError) -> Self {
        let details = match error {
            EvalError::Compile(compile) => Some(compile.clone()),
            _ => None,
        };
        Self {
            message: error.message(),
            type_name: error.type_name().to_owned(),
            details,
        }
    }
}

/// Per-client evaluation state.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    namespace: Namespace,
    forward_system_output: bool,
    stdin_buffer: String,
    active_request_id: String,
    running_eval: bool,
    last_exception: Option<CaughtError>,
}

impl Session {
    fn new(namespace: Namespace) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            namespace,
            forward_system_output: false,
            stdin_buffer: String::new(),
            active_request_id: String::new(),
            running_eval: false,
            last_exception: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Namespace evaluations start in.
    #[must_use]
    pub const fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Replaces the current namespace.
    pub fn set_namespace(&mut self, namespace: Namespace) {
        self.namespace = namespace;
    }

    /// Whether system output forwarding was requested.
    #[must_use]
    pub const fn forwards_system_output(&self) -> bool {
        self.forward_system_output
    }

    /// Enables system output forwarding.
    pub fn enable_system_output_forwarding(&mut self) {
        self.forward_system_output = true;
    }

    /// Everything received through `stdin` so far.
    #[must_use]
    pub fn stdin_buffer(&self) -> &str {
        &self.stdin_buffer
    }

    /// Appends client-provided input.
    pub fn push_stdin(&mut self, text: &str) {
        self.stdin_buffer.push_str(text);
    }

    /// Request id of the evaluation in flight, empty when idle.
    #[must_use]
    pub fn active_request_id(&self) -> &str {
        &self.active_request_id
    }

    /// Whether an evaluation is running.
    #[must_use]
    pub const fn is_evaluating(&self) -> bool {
        self.running_eval
    }

    /// The last recorded evaluation failure.
    #[must_use]
    pub const fn last_exception(&self) -> Option<&CaughtError> {
        self.last_exception.as_ref()
    }

    /// Records (or clears) the last evaluation failure.
    pub fn set_last_exception(&mut self, caught: Option<CaughtError>) {
        self.last_exception = caught;
    }

    /// Marks `request_id` as running until the returned guard drops.
    pub fn begin_eval(&mut self, request_id: &str) -> ActiveEval<'_> {
        self.running_eval = true;
        self.active_request_id = request_id.to_owned();
        ActiveEval { session: self }
    }
}

/// Keeps a session marked as evaluating; clears the mark on drop.
#[derive(Debug)]
pub struct ActiveEval<'a> {
    session: &'a mut Session,
}

impl Deref for ActiveEval<'_> {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session
    }
}

impl DerefMut for ActiveEval<'_> {
    fn deref_mut(&mut self) -> &mut Session {
        self.session
    }
}

impl Drop for ActiveEval<'_> {
    fn drop(&mut self) {
        self.session.running_eval = false;
        self.session.active_request_id.clear();
    }
}

/// Owns every live session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, Session>,
    default_id: Option<String>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, creating one when needed.
    ///
    /// An empty id resolves to the default session. An unknown id gets a
    /// fresh session under a newly minted id; clients learn it from the
    /// `session` field of the response.
    pub fn ensure(&mut self, id: &str, namespace: &Namespace) -> &mut Session {
        let existing = if id.is_empty() {
            self.default_id
                .clone()
                .filter(|known| self.sessions.contains_key(known))
        } else {
            self.sessions.contains_key(id).then(|| id.to_owned())
        };
        let key = existing.unwrap_or_else(|| {
            let session = Session::new(namespace.clone());
            let key = session.id.clone();
            if id.is_empty() {
                self.default_id = Some(key.clone());
            } else {
                debug!(
                    target: SESSION_TARGET,
                    requested = id,
                    session = key.as_str(),
                    live = self.sessions.len() + 1,
                    "unknown session replaced with a fresh one"
                );
            }
            self.sessions.insert(key.clone(), session);
            key
        });
        self.sessions
            .entry(key)
            .or_insert_with(|| Session::new(namespace.clone()))
    }

    /// Creates a child of `parent` sharing only its namespace and output
    /// forwarding flag.
    pub fn clone_session(&mut self, parent: &str, namespace: &Namespace) -> &mut Session {
        let (child_ns, forward) = {
            let source = self.ensure(parent, namespace);
            (source.namespace.clone(), source.forward_system_output)
        };
        let mut child = Session::new(child_ns);
        child.forward_system_output = forward;
        let key = child.id.clone();
        self.sessions.entry(key).or_insert(child)
    }

    /// Looks up an existing session.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Removes `id`, reporting whether it existed.
    pub fn close(&mut self, id: &str) -> bool {
        if self.default_id.as_deref() == Some(id) {
            self.default_id = None;
        }
        self.sessions.remove(id).is_some()
    }

    /// Live session ids in sorted order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }
}
