//! Recursive-descent decoder over a borrowed byte buffer.

use thiserror::Error;

use crate::value::{Dict, Value};

/// Containers nested deeper than this are rejected to keep recursion bounded.
const MAX_DEPTH: usize = 1024;

/// Result of decoding a buffered prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A full value was parsed from the start of the buffer.
    Complete {
        /// The decoded value.
        value: Value,
        /// Number of bytes the value occupied.
        consumed: usize,
    },
    /// The buffer holds a valid but truncated prefix.
    NeedMore,
}

/// Malformed input encountered while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// An `i...e` token did not hold a signed 64-bit integer.
    #[error("invalid integer at byte {offset}")]
    InvalidInteger {
        /// Offset of the `i` marker.
        offset: usize,
    },
    /// A byte string length prefix was not a valid length.
    #[error("invalid string length at byte {offset}")]
    InvalidStringLength {
        /// Offset of the first length digit.
        offset: usize,
    },
    /// A dictionary key decoded to something other than a byte string.
    #[error("dictionary key must be string at byte {offset}")]
    NonStringKey {
        /// Offset of the offending key.
        offset: usize,
    },
    /// A byte that cannot start any value.
    #[error("unsupported token '{}' at byte {offset}", char::from(*token))]
    UnsupportedToken {
        /// The unexpected byte.
        token: u8,
        /// Offset of the unexpected byte.
        offset: usize,
    },
    /// Containers were nested beyond the supported depth.
    #[error("nesting exceeds {MAX_DEPTH} levels at byte {offset}")]
    TooDeep {
        /// Offset of the container that crossed the limit.
        offset: usize,
    },
}

impl DecodeError {
    /// Short, offset-free description of the failure.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidInteger { .. } => "invalid integer",
            Self::InvalidStringLength { .. } => "invalid string length",
            Self::NonStringKey { .. } => "dictionary key must be string",
            Self::UnsupportedToken { .. } => "unsupported token",
            Self::TooDeep { .. } => "nesting too deep",
        }
    }

    /// Byte offset at which the failure was detected.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::InvalidInteger { offset }
            | Self::InvalidStringLength { offset }
            | Self::NonStringKey { offset }
            | Self::UnsupportedToken { offset, .. }
            | Self::TooDeep { offset } => *offset,
        }
    }
}

/// Decodes one value from the start of `input`.
///
/// Bytes after the first complete value are left untouched; `consumed` tells
/// the caller where the next value begins.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the buffer cannot be the prefix of any
/// valid encoding.
pub fn decode(input: &[u8]) -> Result<Decoded, DecodeError> {
    let mut parser = Parser::new(input);
    match parser.value(0) {
        Ok(value) => Ok(Decoded::Complete {
            value,
            consumed: parser.offset,
        }),
        Err(Halt::NeedMore) => Ok(Decoded::NeedMore),
        Err(Halt::Invalid(error)) => Err(error),
    }
}

/// Why the parser stopped before producing a value.
enum Halt {
    NeedMore,
    Invalid(DecodeError),
}

impl From<DecodeError> for Halt {
    fn from(error: DecodeError) -> Self {
        Self::Invalid(error)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a [u8]) -> Self {
        Self { input, offset: 0 }
    }

    fn peek(&self) -> Result<u8, Halt> {
        self.input.get(self.offset).copied().ok_or(Halt::NeedMore)
    }

    fn value(&mut self, depth: usize) -> Result<Value, Halt> {
        let start = self.offset;
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.nested(depth, start, Self::list),
            b'd' => self.nested(depth, start, Self::dict),
            b'0'..=b'9' => self.bytes(),
            token => Err(DecodeError::UnsupportedToken {
                token,
                offset: start,
            }
            .into()),
        }
    }

    fn nested(
        &mut self,
        depth: usize,
        start: usize,
        body: fn(&mut Self, usize) -> Result<Value, Halt>,
    ) -> Result<Value, Halt> {
        if depth >= MAX_DEPTH {
            return Err(DecodeError::TooDeep { offset: start }.into());
        }
        self.offset += 1;
        body(self, depth + 1)
    }

    /// Scans to `terminator`, returning the bytes before it and moving the
    /// cursor past it. Bytes rejected by `accept` fail early so that a
    /// malformed token is reported instead of waiting for more input.
    fn until(
        &mut self,
        terminator: u8,
        accept: fn(u8) -> bool,
        invalid: DecodeError,
    ) -> Result<&'a [u8], Halt> {
        let input = self.input;
        let rest = input.get(self.offset..).unwrap_or_default();
        for (index, byte) in rest.iter().copied().enumerate() {
            if byte == terminator {
                let token = rest.get(..index).unwrap_or_default();
                self.offset += index + 1;
                return Ok(token);
            }
            if !accept(byte) {
                return Err(invalid.into());
            }
        }
        Err(Halt::NeedMore)
    }

    fn integer(&mut self) -> Result<Value, Halt> {
        let start = self.offset;
        self.offset += 1;
        let invalid = DecodeError::InvalidInteger { offset: start };
        let digits = self.until(
            b'e',
            |byte| byte.is_ascii_digit() || byte == b'-',
            invalid.clone(),
        )?;
        std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .map(Value::Integer)
            .ok_or_else(|| invalid.into())
    }

    fn bytes(&mut self) -> Result<Value, Halt> {
        let start = self.offset;
        let invalid = DecodeError::InvalidStringLength { offset: start };
        let digits = self.until(b':', |byte| byte.is_ascii_digit(), invalid.clone())?;
        let length = std::str::from_utf8(digits)
            .ok()
            .and_then(|text| text.parse::<usize>().ok())
            .ok_or_else(|| Halt::from(invalid.clone()))?;
        let end = self
            .offset
            .checked_add(length)
            .ok_or_else(|| Halt::from(invalid))?;
        let payload = self.input.get(self.offset..end).ok_or(Halt::NeedMore)?;
        self.offset = end;
        Ok(Value::Bytes(payload.to_vec()))
    }

    fn list(&mut self, depth: usize) -> Result<Value, Halt> {
        let mut items = Vec::new();
        loop {
            if self.peek()? == b'e' {
                self.offset += 1;
                return Ok(Value::List(items));
            }
            items.push(self.value(depth)?);
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Value, Halt> {
        let mut dict = Dict::new();
        loop {
            if self.peek()? == b'e' {
                self.offset += 1;
                return Ok(Value::Dict(dict));
            }
            let key_offset = self.offset;
            let Value::Bytes(raw_key) = self.value(depth)? else {
                return Err(DecodeError::NonStringKey { offset: key_offset }.into());
            };
            let key = String::from_utf8_lossy(&raw_key).into_owned();
            let entry = self.value(depth)?;
            // The first occurrence of a duplicated key wins.
            dict.entry(key).or_insert(entry);
        }
    }
}
