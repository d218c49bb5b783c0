//! Error types for request dispatch.
//!
//! [`Rejection`] covers requests the engine refuses outright; it never
//! escapes as a Rust error but becomes an `unsupported` response.
//! [`DispatchError`] covers failures of the connection loop itself.

use std::io;

use lantern_bencode::DecodeError;
use thiserror::Error;

/// Reason a request was refused. The display text is the wire `err` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The request carried no `op`.
    #[error("missing-op")]
    MissingOp,
    /// The `op` is not one this engine answers.
    #[error("unknown-op")]
    UnknownOp,
    /// `eval` without `code`.
    #[error("missing-code")]
    MissingCode,
    /// `close` named a session that does not exist.
    #[error("unknown-session")]
    UnknownSession,
    /// `load-file` without `file`.
    #[error("missing-file")]
    MissingFile,
    /// `complete` without a prefix.
    #[error("missing-prefix")]
    MissingPrefix,
    /// Symbol lookups without a symbol.
    #[error("missing-symbol")]
    MissingSymbol,
    /// `interrupt` without `interrupt-id`.
    #[error("missing-interrupt-id")]
    MissingInterruptId,
    /// `stdin` without `stdin`.
    #[error("missing-stdin")]
    MissingStdin,
    /// Middleware ops without a list of identifiers.
    #[error("missing-middleware")]
    MissingMiddleware,
    /// `swap-middleware` with a set differing from the installed one.
    #[error("middleware-mismatch")]
    MiddlewareMismatch,
    /// `test` without `ns`.
    #[error("missing-ns")]
    MissingNs,
    /// The engine could not be reached.
    #[error("internal-error")]
    Internal,
}

/// Failures of the connection loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Reading from or writing to the client failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The client sent bytes that are not Bencode.
    #[error("malformed request: {0}")]
    Decode(#[from] DecodeError),

    /// A single message grew past the buffering limit.
    #[error("message too large: {size} bytes exceeds {max_size} byte limit")]
    MessageTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// Internal error (e.g., lock poisoned).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl DispatchError {
    /// Creates a message too large error.
    pub fn message_too_large(size: usize, max_size: usize) -> Self {
        Self::MessageTooLarge { size, max_size }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
