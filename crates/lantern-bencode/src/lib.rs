//! Incremental Bencode codec for the Lantern nREPL server.
//!
//! Bencode is the self-delimiting encoding spoken by nREPL clients. Every
//! value terminates itself, so a transport can accumulate bytes from a socket
//! and call [`decode`] on the buffered prefix until a complete value is
//! available:
//!
//! - [`Decoded::Complete`] carries the value and the number of bytes it
//!   occupied, so the caller can drain exactly that much from its buffer.
//! - [`Decoded::NeedMore`] signals a valid but truncated prefix.
//! - [`DecodeError`] reports malformed input; the stream cannot recover.
//!
//! No partial parse state survives between calls. Retrying from the start of
//! the buffer keeps the decoder stateless at the cost of re-parsing large
//! messages that arrive in many chunks.
//!
//! # Example
//!
//! ```
//! use lantern_bencode::{Decoded, Dict, Value, decode, encode};
//!
//! let mut dict = Dict::new();
//! dict.insert("op".to_owned(), Value::from("eval"));
//! let bytes = encode(&Value::Dict(dict.clone()));
//! assert_eq!(bytes, b"d2:op4:evale");
//!
//! let Ok(Decoded::Complete { value, consumed }) = decode(&bytes) else {
//!     panic!("expected a complete value");
//! };
//! assert_eq!(consumed, bytes.len());
//! assert_eq!(value, Value::Dict(dict));
//! ```

mod decode;
mod encode;
mod value;

pub use decode::{DecodeError, Decoded, decode};
pub use encode::{encode, encode_into};
pub use value::{Dict, Value};

#[cfg(test)]
mod tests;
