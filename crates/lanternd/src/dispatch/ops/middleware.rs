//! `ls-middleware`, `add-middleware` and `swap-middleware`.

use lantern_bencode::{Dict, Value};

use crate::dispatch::engine::Engine;
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::Response;
use crate::evaluator::Evaluator;

impl<E: Evaluator> Engine<E> {
    pub(crate) fn ls_middleware(&mut self, message: &Message) -> Vec<Dict> {
        vec![self.middleware_response(message)]
    }

    pub(crate) fn add_middleware(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let requested = message
            .text_list("middleware")
            .ok_or(Rejection::MissingMiddleware)?;
        self.middleware.add(&requested);
        Ok(vec![self.middleware_response(message)])
    }

    pub(crate) fn swap_middleware(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let requested = message
            .text_list("middleware")
            .ok_or(Rejection::MissingMiddleware)?;
        if !self.middleware.swap(&requested) {
            return Err(Rejection::MiddlewareMismatch);
        }
        Ok(vec![self.middleware_response(message)])
    }

    fn middleware_response(&mut self, message: &Message) -> Dict {
        let session = self.session_for(message).id().to_owned();
        Response::to(message, Some(&session))
            .field(
                "middleware",
                Value::string_list(self.middleware.entries().iter().cloned()),
            )
            .done()
    }
}
