//! Per-session toggles and input: `forward-system-output`, `interrupt` and
//! `stdin`.

use lantern_bencode::Dict;

use crate::dispatch::engine::Engine;
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::Response;
use crate::evaluator::Evaluator;

impl<E: Evaluator> Engine<E> {
    pub(crate) fn forward_system_output(&mut self, message: &Message) -> Vec<Dict> {
        let session = self.session_for(message);
        session.enable_system_output_forwarding();
        vec![Response::to(message, Some(session.id())).done()]
    }

    /// Interruption is advisory: the reply only says whether the target
    /// request is the one in flight.
    pub(crate) fn interrupt(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let target = message.text("interrupt-id");
        if target.is_empty() {
            return Err(Rejection::MissingInterruptId);
        }
        let session = self.session_for(message);
        let status = if session.active_request_id() == target {
            "interrupt-unsent"
        } else {
            "session-idle"
        };
        Ok(vec![
            Response::to(message, Some(session.id()))
                .field("interrupt-id", target)
                .status(&[status, "done"])
                .build(),
        ])
    }

    pub(crate) fn stdin(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let chunk = message.text("stdin");
        if chunk.is_empty() {
            return Err(Rejection::MissingStdin);
        }
        let session = self.session_for(message);
        session.push_stdin(chunk);
        Ok(vec![
            Response::to(message, Some(session.id()))
                .field("stdin", chunk)
                .field("unread", session.stdin_buffer())
                .done(),
        ])
    }
}
