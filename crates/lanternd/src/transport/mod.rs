//! Socket listener for nREPL client connections.
//!
//! The listener binds the configured endpoint and accepts connections on a
//! background thread. Each accepted connection is handed to a
//! [`ConnectionHandler`] on its own thread, so clients are served
//! concurrently while the engine lock serialises their requests.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;

pub use self::errors::ListenerError;
pub use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::{ListenerHandle, ListenerSummary, SocketListener};

pub(crate) const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
