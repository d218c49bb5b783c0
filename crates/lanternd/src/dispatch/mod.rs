//! nREPL request dispatch.
//!
//! This module turns decoded Bencode dictionaries into engine calls and
//! streams the engine's responses back to the client. The dispatcher
//! integrates with the transport layer via the `ConnectionHandler` trait.
//!
//! ## Protocol
//!
//! Clients send a stream of Bencode dictionaries, each naming an `op`:
//!
//! ```text
//! d4:code7:(+ 1 2)2:id1:12:op4:evale
//! ```
//!
//! The engine answers with one or more dictionaries echoing the request `id`
//! (and, once resolved, the `session`). The last response of every request
//! carries a `status` list containing `done`:
//!
//! ```text
//! d2:id1:12:ns4:user7:session36:...5:value1:3e
//! d2:id1:17:session36:...6:statusl4:doneee
//! ```
//!
//! ## Refusals
//!
//! Requests the engine refuses (unknown op, missing required field, unknown
//! session on `close`) receive a single `{status: [unsupported, done], err}`
//! response rather than closing the connection.

mod engine;
mod errors;
mod handler;
mod message;
mod ops;
mod response;
mod shared;

pub use self::engine::{Engine, Op};
pub use self::errors::{DispatchError, Rejection};
pub use self::handler::NreplConnectionHandler;
pub use self::message::Message;
pub use self::shared::SharedEngine;
