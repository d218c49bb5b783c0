//! Connection handler that speaks Bencode.
//!
//! [`NreplConnectionHandler`] implements the transport's
//! [`ConnectionHandler`]. It keeps a byte buffer per connection, decodes
//! every complete message from the front of it, hands each request
//! dictionary to the shared engine and writes the responses back in order.
//! The connection stays open until the client disconnects or sends bytes
//! that cannot be Bencode.

use std::io::{self, Read, Write};

use lantern_bencode::{Decoded, Dict, Value, decode, encode};
use tracing::{debug, warn};

use crate::evaluator::Evaluator;
use crate::transport::{ConnectionHandler, ConnectionStream};

use super::errors::DispatchError;
use super::message::Message;
use super::shared::SharedEngine;

/// Tracing target for the connection loop.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Maximum number of bytes buffered for one undecoded message.
pub(crate) const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK_BYTES: usize = 4096;

/// Serves nREPL clients against a [`SharedEngine`].
#[derive(Debug)]
pub struct NreplConnectionHandler<E> {
    engine: SharedEngine<E>,
}

impl<E: Evaluator> NreplConnectionHandler<E> {
    /// Creates a handler dispatching into `engine`.
    pub const fn new(engine: SharedEngine<E>) -> Self {
        Self { engine }
    }

    /// Runs the read, decode, dispatch loop until EOF.
    fn serve<S: Read + Write>(&self, stream: &mut S) -> Result<(), DispatchError> {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        loop {
            let bytes_read = read_with_retry(stream, &mut chunk)?;
            if bytes_read == 0 {
                if !buffer.is_empty() {
                    debug!(
                        target: DISPATCH_TARGET,
                        pending = buffer.len(),
                        "client closed mid-message"
                    );
                }
                return Ok(());
            }
            buffer.extend_from_slice(&chunk[..bytes_read]);
            self.drain(&mut buffer, stream)?;
            enforce_limit(buffer.len())?;
        }
    }

    /// Dispatches every complete message at the front of `buffer`.
    fn drain<W: Write>(&self, buffer: &mut Vec<u8>, stream: &mut W) -> Result<(), DispatchError> {
        loop {
            let (value, consumed) = match decode(buffer)? {
                Decoded::NeedMore => return Ok(()),
                Decoded::Complete { value, consumed } => (value, consumed),
            };
            buffer.drain(..consumed);
            let Some(fields) = value.into_dict() else {
                debug!(target: DISPATCH_TARGET, "dropping non-dictionary payload");
                continue;
            };
            let message = Message::from(fields);
            for response in self.engine.handle(&message) {
                write_response(stream, response)?;
            }
        }
    }
}

impl<E: Evaluator + 'static> ConnectionHandler for NreplConnectionHandler<E> {
    fn handle(&self, mut stream: ConnectionStream) {
        if let Err(error) = self.serve(&mut stream) {
            warn!(target: DISPATCH_TARGET, peer = stream.peer(), %error, "closing connection");
        }
    }
}

/// Encodes and flushes one response.
fn write_response<W: Write>(stream: &mut W, response: Dict) -> Result<(), DispatchError> {
    stream.write_all(&encode(&Value::Dict(response)))?;
    stream.flush()?;
    Ok(())
}

/// Reads from the stream, retrying on interrupts.
fn read_with_retry<R: Read>(stream: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Enforces the maximum buffered message size.
fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_MESSAGE_BYTES {
        return Err(DispatchError::message_too_large(size, MAX_MESSAGE_BYTES));
    }
    Ok(())
}
