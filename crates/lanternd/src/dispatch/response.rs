//! Response dictionary construction.

use lantern_bencode::{Dict, Value};

use super::errors::Rejection;
use super::message::Message;

/// Builds one response dictionary addressed to a request.
#[derive(Debug, Clone)]
pub(crate) struct Response {
    fields: Dict,
}

impl Response {
    /// Starts a response echoing the request `id` and, when known, the
    /// session it ran in.
    pub(crate) fn to(message: &Message, session: Option<&str>) -> Self {
        let mut fields = Dict::new();
        if !message.id().is_empty() {
            fields.insert("id".to_owned(), Value::from(message.id()));
        }
        if let Some(session) = session.filter(|session| !session.is_empty()) {
            fields.insert("session".to_owned(), Value::from(session));
        }
        Self { fields }
    }

    /// Sets `key`.
    pub(crate) fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    /// Sets `key` when `value` is present.
    pub(crate) fn field_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(key, value),
            None => self,
        }
    }

    /// Sets the `status` list.
    pub(crate) fn status(self, statuses: &[&str]) -> Self {
        self.field("status", Value::string_list(statuses.iter().copied()))
    }

    /// Adds `status: [done]`.
    pub(crate) fn done(self) -> Dict {
        self.status(&["done"]).build()
    }

    pub(crate) fn build(self) -> Dict {
        self.fields
    }
}

/// The uniform refusal: `{id?, status: [unsupported, done], err}`.
///
/// The requested session is not echoed: a refused request never resolved one.
pub(crate) fn unsupported(message: &Message, rejection: Rejection) -> Dict {
    Response::to(message, None)
        .status(&["unsupported", "done"])
        .field("err", rejection.to_string())
        .build()
}

/// Converts an unsigned count for the wire.
pub(crate) fn integer(value: impl TryInto<i64>) -> Value {
    Value::Integer(value.try_into().unwrap_or(i64::MAX))
}
