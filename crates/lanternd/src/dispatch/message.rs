//! Typed, defaulted view over a decoded request dictionary.

use lantern_bencode::{Dict, Value};

/// A client request.
///
/// String accessors default to the empty string, so handlers can test
/// `is_empty()` instead of unwrapping options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    fields: Dict,
}

impl Message {
    /// Wraps a decoded dictionary.
    #[must_use]
    pub const fn new(fields: Dict) -> Self {
        Self { fields }
    }

    /// Builds a message from string pairs.
    #[must_use]
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(key, value)| (key.to_owned(), Value::from(value)))
                .collect(),
        )
    }

    /// Every field of the request.
    #[must_use]
    pub const fn fields(&self) -> &Dict {
        &self.fields
    }

    /// Raw field access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Text of `key`, or `""` when absent or not a string.
    #[must_use]
    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    /// The first non-empty text among `keys`.
    #[must_use]
    pub fn first_text(&self, keys: &[&str]) -> &str {
        keys.iter()
            .map(|key| self.text(key))
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    /// Strings of a list field; `None` when absent or not a list of strings.
    #[must_use]
    pub fn text_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key)?
            .as_list()?
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect()
    }

    /// Requested operation.
    #[must_use]
    pub fn op(&self) -> &str {
        self.text("op")
    }

    /// Client-chosen request id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.text("id")
    }

    /// Requested session id.
    #[must_use]
    pub fn session(&self) -> &str {
        self.text("session")
    }

    /// A copy of this message with `key` set to `value`.
    #[must_use]
    pub fn with_field(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(key.to_owned(), value.into());
        Self { fields }
    }
}

impl From<Dict> for Message {
    fn from(fields: Dict) -> Self {
        Self::new(fields)
    }
}
