//! `eval` and `load-file`.

use lantern_bencode::Dict;
use tracing::debug;

use crate::dispatch::engine::{ENGINE_TARGET, Engine};
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::Response;
use crate::evaluator::{EvalContext, EvalError, Evaluator};
use crate::session::CaughtError;

use super::diagnostics::{error_dict, with_location};
use super::lookup::resolve_namespace;

/// Request fields consulted, in order, for the file hint of `load-file`.
const LOAD_FILE_HINTS: [&str; 3] = ["path", "file-path", "file-name"];

impl<E: Evaluator> Engine<E> {
    pub(crate) fn eval(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let code = message.text("code");
        if code.is_empty() {
            return Err(Rejection::MissingCode);
        }
        Ok(self.evaluate(message, code, message.text("path")))
    }

    pub(crate) fn load_file(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let contents = message.text("file");
        if contents.is_empty() {
            return Err(Rejection::MissingFile);
        }
        let mut responses = self.evaluate(message, contents, message.first_text(&LOAD_FILE_HINTS));
        for response in &mut responses {
            response.remove("ns");
        }
        Ok(responses)
    }

    /// Runs `code` in the request's session and sequences the responses.
    fn evaluate(&mut self, message: &Message, code: &str, file: &str) -> Vec<Dict> {
        let user = self.evaluator.user_namespace();
        let session = self.sessions.ensure(message.session(), &user);
        let namespace = resolve_namespace(&self.evaluator, session.namespace(), message.text("ns"));

        let mut session = session.begin_eval(message.id());
        session.set_last_exception(None);
        let session_id = session.id().to_owned();

        let mut context = EvalContext::new(namespace).with_file(file);
        let result = self.evaluator.eval(code, &mut context);
        session.set_namespace(context.namespace().clone());

        let mut responses = Vec::with_capacity(3);
        let output = context.take_output();
        if !output.is_empty() {
            responses.push(
                Response::to(message, Some(&session_id))
                    .field("out", output)
                    .build(),
            );
        }

        match result {
            Ok(value) => {
                responses.push(
                    Response::to(message, Some(&session_id))
                        .field("ns", self.evaluator.namespace_name(context.namespace()))
                        .field("value", value)
                        .build(),
                );
                responses.push(Response::to(message, Some(&session_id)).done());
            }
            Err(error) => {
                debug!(
                    target: ENGINE_TARGET,
                    session = %session_id,
                    kind = error.type_name(),
                    %error,
                    "evaluation failed"
                );
                session.set_last_exception(Some(CaughtError::from(&error)));
                responses.push(error_response(message, &session_id, &error));
                responses.push(
                    Response::to(message, Some(&session_id))
                        .status(&["done", "error"])
                        .build(),
                );
            }
        }
        responses
    }
}

fn error_response(message: &Message, session: &str, error: &EvalError) -> Dict {
    let response = Response::to(message, Some(session))
        .status(&["error"])
        .field("err", error.message())
        .field("exception-type", error.type_name());
    match error {
        EvalError::Compile(compile) => with_location(response, &compile.location)
            .field("error", error_dict(compile))
            .build(),
        _ => response.build(),
    }
}
