//! `clone`, `describe`, `ls-sessions` and `close`.

use lantern_bencode::{Dict, Value};
use strum::IntoEnumIterator;

use crate::dispatch::engine::{Engine, Op};
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::Response;
use crate::evaluator::Evaluator;

impl<E: Evaluator> Engine<E> {
    pub(crate) fn clone_session(&mut self, message: &Message) -> Vec<Dict> {
        let user = self.evaluator.user_namespace();
        let child = self
            .sessions
            .clone_session(message.session(), &user)
            .id()
            .to_owned();
        vec![
            Response::to(message, Some(&child))
                .field("new-session", child.as_str())
                .done(),
        ]
    }

    pub(crate) fn describe(&self, message: &Message) -> Vec<Dict> {
        let mut versions = Dict::new();
        versions.insert("lantern".to_owned(), Value::from(env!("CARGO_PKG_VERSION")));
        versions.insert("evaluator".to_owned(), Value::from(self.evaluator.version()));

        let ops: Dict = Op::iter()
            .map(|op| {
                let mut entry = Dict::new();
                entry.insert("doc".to_owned(), Value::from(op.doc()));
                (op.name().to_owned(), Value::Dict(entry))
            })
            .collect();

        let session = self.known_session(message);
        vec![
            Response::to(message, session.as_deref())
                .field("versions", versions)
                .field("ops", ops)
                .done(),
        ]
    }

    pub(crate) fn ls_sessions(&self, message: &Message) -> Vec<Dict> {
        let session = self.known_session(message);
        vec![
            Response::to(message, session.as_deref())
                .field("sessions", Value::string_list(self.sessions.list()))
                .done(),
        ]
    }

    pub(crate) fn close(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let id = message.session();
        if id.is_empty() || !self.sessions.close(id) {
            return Err(Rejection::UnknownSession);
        }
        Ok(vec![Response::to(message, Some(id)).done()])
    }
}
