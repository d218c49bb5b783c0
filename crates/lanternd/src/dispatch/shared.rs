//! Shared access to the engine across connection threads.
//!
//! Every connection runs on its own thread but sessions, middleware and the
//! evaluator are process-wide. [`SharedEngine`] wraps the engine in an
//! `Arc<Mutex<...>>` so requests from all clients are serialised, and turns
//! lock poisoning into an ordinary error.

use std::sync::{Arc, Mutex};

use lantern_bencode::Dict;
use tracing::warn;

use crate::evaluator::Evaluator;

use super::engine::{ENGINE_TARGET, Engine};
use super::errors::{DispatchError, Rejection};
use super::message::Message;
use super::response::unsupported;

/// Cloneable handle to one engine.
#[derive(Debug)]
pub struct SharedEngine<E> {
    inner: Arc<Mutex<Engine<E>>>,
}

impl<E> Clone for SharedEngine<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Evaluator> SharedEngine<E> {
    /// Wraps `engine` for shared use.
    pub fn new(engine: Engine<E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Executes a closure with exclusive access to the engine.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::Internal` if the engine lock is poisoned.
    pub fn with_engine<F, R>(&self, f: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut Engine<E>) -> R,
    {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| DispatchError::internal("engine lock poisoned"))?;
        Ok(f(&mut guard))
    }

    /// Handles one request under the lock. A poisoned engine answers every
    /// request with an `internal-error` refusal.
    pub fn handle(&self, message: &Message) -> Vec<Dict> {
        self.with_engine(|engine| engine.handle(message))
            .unwrap_or_else(|error| {
                warn!(target: ENGINE_TARGET, %error, op = message.op(), "engine unavailable");
                vec![unsupported(message, Rejection::Internal)]
            })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use lantern_bencode::Value;
    use rstest::{fixture, rstest};

    use crate::evaluator::reference::ReferenceEvaluator;

    use super::*;

    #[fixture]
    fn shared() -> SharedEngine<ReferenceEvaluator> {
        SharedEngine::new(Engine::new(ReferenceEvaluator::new()))
    }

    #[rstest]
    fn with_engine_provides_access(shared: SharedEngine<ReferenceEvaluator>) {
        let count = shared
            .with_engine(|engine| engine.sessions().list().len())
            .expect("engine lock");
        assert_eq!(count, 0);
    }

    #[rstest]
    fn clones_share_sessions(shared: SharedEngine<ReferenceEvaluator>) {
        let cloned = shared.clone();
        cloned.handle(&Message::from_pairs([("op", "clone")]));
        let count = shared
            .with_engine(|engine| engine.sessions().list().len())
            .expect("engine lock");
        assert_eq!(count, 1);
    }

    #[rstest]
    fn poisoned_engine_refuses_requests(shared: SharedEngine<ReferenceEvaluator>) {
        let poisoner = shared.clone();
        let outcome = thread::spawn(move || {
            let _ = poisoner.with_engine(|engine| {
                if engine.sessions().list().is_empty() {
                    panic!("poison the engine lock");
                }
            });
        })
        .join();
        assert!(outcome.is_err(), "poisoning thread should panic");

        assert!(matches!(
            shared.with_engine(|_| ()),
            Err(DispatchError::Internal { .. })
        ));
        let responses = shared.handle(&Message::from_pairs([("op", "describe"), ("id", "9")]));
        assert_eq!(responses.len(), 1);
        let response = &responses[0];
        assert_eq!(response.get("err"), Some(&Value::from("internal-error")));
        assert_eq!(
            response.get("status"),
            Some(&Value::string_list(["unsupported", "done"]))
        );
        assert_eq!(response.get("id"), Some(&Value::from("9")));
    }
}
