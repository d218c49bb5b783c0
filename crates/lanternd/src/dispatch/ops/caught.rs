//! `caught` and `analyze-last-stacktrace`.

use lantern_bencode::Dict;

use crate::dispatch::engine::Engine;
use crate::dispatch::message::Message;
use crate::dispatch::response::Response;
use crate::evaluator::Evaluator;

use super::diagnostics::{analysis, error_dict, with_location};

impl<E: Evaluator> Engine<E> {
    pub(crate) fn caught(&mut self, message: &Message) -> Vec<Dict> {
        let session = self.session_for(message);
        let response = Response::to(message, Some(session.id()));
        let Some(caught) = session.last_exception() else {
            return vec![response.status(&["done", "no-error"]).build()];
        };
        let response = response
            .field("err", caught.message.as_str())
            .field("exception-type", caught.type_name.as_str());
        let response = match &caught.details {
            Some(details) => {
                with_location(response, &details.location).field("error", error_dict(details))
            }
            None => response,
        };
        vec![response.done()]
    }

    pub(crate) fn analyze_last_stacktrace(&mut self, message: &Message) -> Vec<Dict> {
        let session = self.session_for(message);
        let base = Response::to(message, Some(session.id()));
        let Some(details) = session
            .last_exception()
            .and_then(|caught| caught.details.as_ref())
        else {
            return vec![base.status(&["done", "no-error"]).build()];
        };
        let mut responses: Vec<Dict> = details
            .chain()
            .map(|error| analysis(base.clone(), error).build())
            .collect();
        responses.push(base.done());
        responses
    }
}
