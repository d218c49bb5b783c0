//! Classified evaluation failures.

use std::fmt;

use thiserror::Error;

/// Where a problem was found. Zero lines or columns mean unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    /// File the code came from.
    pub file: Option<String>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl SourceLocation {
    /// Builds a location in `file` at `line`:`column`.
    #[must_use]
    pub fn new(file: Option<&str>, line: u32, column: u32) -> Self {
        Self {
            file: file.map(str::to_owned),
            line,
            column,
        }
    }

    /// `true` when nothing about the location is known.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.file.is_none() && self.line == 0 && self.column == 0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("NO_SOURCE_PATH");
        write!(formatter, "{file}:{}:{}", self.line, self.column)
    }
}

/// Secondary diagnostic attached to a [`CompileError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNote {
    /// Note category, e.g. `error` or `info`.
    pub kind: String,
    /// Human-readable text.
    pub message: String,
    /// Where the note points.
    pub location: SourceLocation,
}

/// Code rejected before it ran: a reader or analyzer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    /// Slash-separated category such as `parse/unterminated-list`.
    pub kind: String,
    /// Human-readable description.
    pub message: String,
    /// Primary location.
    pub location: SourceLocation,
    /// Additional diagnostics.
    pub notes: Vec<ErrorNote>,
    /// Underlying failure that triggered this one.
    pub cause: Option<Box<CompileError>>,
}

impl CompileError {
    /// Builds an error with no notes or cause.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location,
            notes: Vec::new(),
            cause: None,
        }
    }

    /// Adds a note.
    #[must_use]
    pub fn with_note(mut self, note: ErrorNote) -> Self {
        self.notes.push(note);
        self
    }

    /// Sets the underlying cause.
    #[must_use]
    pub fn caused_by(mut self, cause: Self) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Iterates this error followed by its causes, outermost first.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |error| error.cause.as_deref())
    }
}

/// Failure reported by [`Evaluator::eval`](super::Evaluator::eval).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The program raised a value explicitly.
    #[error("{value}")]
    Thrown {
        /// Printed form of the raised value.
        value: String,
        /// Type name of the raised value.
        type_name: String,
    },
    /// The code was rejected before it ran.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The runtime itself failed.
    #[error("{message}")]
    Host {
        /// Failure description.
        message: String,
        /// Category of the failure.
        type_name: String,
    },
    /// Nothing is known about the failure.
    #[error("unknown exception")]
    Unknown,
}

impl EvalError {
    /// Builds a [`EvalError::Host`] failure.
    #[must_use]
    pub fn host(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
            type_name: type_name.into(),
        }
    }

    /// Text reported as the `err` field.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Text reported as the `exception-type` field.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Thrown { type_name, .. } | Self::Host { type_name, .. } => type_name,
            Self::Compile(error) => &error.kind,
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EvalError::Thrown { value: ":boom".into(), type_name: "keyword".into() }, ":boom", "keyword")]
    #[case(EvalError::host("ArithmeticException", "Divide by zero"), "Divide by zero", "ArithmeticException")]
    #[case(EvalError::Unknown, "unknown exception", "unknown")]
    fn classifies_message_and_type(
        #[case] error: EvalError,
        #[case] message: &str,
        #[case] type_name: &str,
    ) {
        assert_eq!(error.message(), message);
        assert_eq!(error.type_name(), type_name);
    }

    #[test]
    fn compile_errors_report_their_kind() {
        let error = EvalError::from(CompileError::new(
            "analyze/unresolved-symbol",
            "Unable to resolve symbol: foo in this context",
            SourceLocation::new(Some("scratch.clj"), 3, 7),
        ));
        assert_eq!(error.type_name(), "analyze/unresolved-symbol");
        assert_eq!(error.message(), "Unable to resolve symbol: foo in this context");
    }

    #[test]
    fn chain_walks_causes_outermost_first() {
        let root = CompileError::new("parse/unexpected-close", "root", SourceLocation::default());
        let outer = CompileError::new("analyze/macro-expansion", "outer", SourceLocation::default())
            .caused_by(root);
        let kinds: Vec<_> = outer.chain().map(|error| error.kind.as_str()).collect();
        assert_eq!(kinds, ["analyze/macro-expansion", "parse/unexpected-close"]);
    }
}
