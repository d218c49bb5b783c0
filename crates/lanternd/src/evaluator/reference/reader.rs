//! S-expression reader producing positioned forms.

use std::iter::Peekable;
use std::str::Chars;

use crate::evaluator::{CompileError, ErrorNote, SourceLocation};

/// Deepest nesting of lists, vectors and quotes the reader accepts.
pub(crate) const MAX_READ_DEPTH: usize = 256;

/// Syntactic shape of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FormKind {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    Keyword(String),
    Symbol(String),
    List(Vec<Form>),
    Vector(Vec<Form>),
}

/// A form together with the position it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Form {
    pub(crate) kind: FormKind,
    pub(crate) line: u32,
    pub(crate) column: u32,
}

impl Form {
    pub(crate) const fn new(kind: FormKind, line: u32, column: u32) -> Self {
        Self { kind, line, column }
    }

    pub(crate) fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Str(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn as_vector(&self) -> Option<&[Self]> {
        match &self.kind {
            FormKind::Vector(items) => Some(items),
            _ => None,
        }
    }
}

/// Reads every top-level form in `source`.
pub(crate) fn read_all(source: &str, file: Option<&str>) -> Result<Vec<Form>, CompileError> {
    let mut reader = Reader::new(source, file);
    let mut forms = Vec::new();
    while let Some(form) = reader.next_form(0)? {
        forms.push(form);
    }
    Ok(forms)
}

struct Reader<'a> {
    chars: Peekable<Chars<'a>>,
    file: Option<&'a str>,
    line: u32,
    column: u32,
}

#[derive(Clone, Copy)]
enum Delimiter {
    List,
    Vector,
}

impl Delimiter {
    const fn close(self) -> char {
        match self {
            Self::List => ')',
            Self::Vector => ']',
        }
    }

    const fn unterminated_kind(self) -> &'static str {
        match self {
            Self::List => "parse/unterminated-list",
            Self::Vector => "parse/unterminated-vector",
        }
    }
}

impl<'a> Reader<'a> {
    fn new(source: &'a str, file: Option<&'a str>) -> Self {
        Self {
            chars: source.chars().peekable(),
            file,
            line: 1,
            column: 1,
        }
    }

    fn location(&self, line: u32, column: u32) -> SourceLocation {
        SourceLocation::new(self.file, line, column)
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.chars.next()?;
        if next == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(next)
    }

    fn skip_trivia(&mut self) {
        while let Some(&next) = self.chars.peek() {
            if next.is_whitespace() || next == ',' {
                self.bump();
            } else if next == ';' {
                while self.chars.peek().is_some_and(|&c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Fails once `depth` enclosing forms are already open.
    fn descend(&self, depth: usize, line: u32, column: u32) -> Result<usize, CompileError> {
        if depth >= MAX_READ_DEPTH {
            return Err(CompileError::new(
                "parse/nesting-too-deep",
                format!("Forms nest deeper than {MAX_READ_DEPTH} levels"),
                self.location(line, column),
            ));
        }
        Ok(depth + 1)
    }

    fn next_form(&mut self, depth: usize) -> Result<Option<Form>, CompileError> {
        self.skip_trivia();
        let (line, column) = (self.line, self.column);
        let Some(&next) = self.chars.peek() else {
            return Ok(None);
        };
        let kind = match next {
            '(' => {
                let inner = self.descend(depth, line, column)?;
                self.bump();
                FormKind::List(self.sequence(Delimiter::List, line, column, inner)?)
            }
            '[' => {
                let inner = self.descend(depth, line, column)?;
                self.bump();
                FormKind::Vector(self.sequence(Delimiter::Vector, line, column, inner)?)
            }
            ')' | ']' => {
                self.bump();
                return Err(CompileError::new(
                    "parse/unexpected-close",
                    format!("Unexpected closing character '{next}'"),
                    self.location(line, column),
                ));
            }
            '"' => {
                self.bump();
                FormKind::Str(self.string(line, column)?)
            }
            '\'' => {
                let inner = self.descend(depth, line, column)?;
                self.bump();
                let Some(quoted) = self.next_form(inner)? else {
                    return Err(CompileError::new(
                        "parse/missing-quoted-form",
                        "Expected a form after quote",
                        self.location(line, column),
                    ));
                };
                FormKind::List(vec![
                    Form::new(FormKind::Symbol("quote".to_owned()), line, column),
                    quoted,
                ])
            }
            '{' | '}' | '@' | '^' | '`' | '~' | '\\' | '#' => {
                self.bump();
                return Err(CompileError::new(
                    "lex/unsupported-character",
                    format!("Unsupported reader character '{next}'"),
                    self.location(line, column),
                ));
            }
            _ => self.atom(line, column)?,
        };
        Ok(Some(Form::new(kind, line, column)))
    }

    fn sequence(
        &mut self,
        delimiter: Delimiter,
        line: u32,
        column: u32,
        depth: usize,
    ) -> Result<Vec<Form>, CompileError> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            match self.chars.peek() {
                None => {
                    let close = delimiter.close();
                    return Err(CompileError::new(
                        delimiter.unterminated_kind(),
                        format!("Unexpected end of input, expected '{close}'"),
                        self.location(line, column),
                    )
                    .with_note(ErrorNote {
                        kind: "error".to_owned(),
                        message: format!("expected '{close}' here"),
                        location: self.location(self.line, self.column),
                    }));
                }
                Some(&next) if next == delimiter.close() => {
                    self.bump();
                    return Ok(items);
                }
                Some(_) => {
                    if let Some(form) = self.next_form(depth)? {
                        items.push(form);
                    }
                }
            }
        }
    }

    fn string(&mut self, line: u32, column: u32) -> Result<String, CompileError> {
        let mut text = String::new();
        loop {
            let Some(next) = self.bump() else {
                return Err(CompileError::new(
                    "parse/unterminated-string",
                    "Unexpected end of input inside string",
                    self.location(line, column),
                ));
            };
            match next {
                '"' => return Ok(text),
                '\\' => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some(other) => other,
                        None => continue,
                    };
                    text.push(escaped);
                }
                other => text.push(other),
            }
        }
    }

    fn atom(&mut self, line: u32, column: u32) -> Result<FormKind, CompileError> {
        let mut token = String::new();
        while let Some(&next) = self.chars.peek() {
            if is_delimiter(next) {
                break;
            }
            token.push(next);
            self.bump();
        }

        if looks_numeric(&token) {
            return token.parse().map(FormKind::Int).map_err(|_| {
                CompileError::new(
                    "lex/invalid-number",
                    format!("Invalid number: {token}"),
                    self.location(line, column),
                )
            });
        }

        Ok(match token.as_str() {
            "nil" => FormKind::Nil,
            "true" => FormKind::Bool(true),
            "false" => FormKind::Bool(false),
            _ => match token.strip_prefix(':') {
                Some(name) => FormKind::Keyword(name.to_owned()),
                None => FormKind::Symbol(token),
            },
        })
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'')
}

fn looks_numeric(token: &str) -> bool {
    let digits = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    digits.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn read_one(source: &str) -> Form {
        let mut forms = read_all(source, None).expect("readable source");
        assert_eq!(forms.len(), 1, "expected exactly one form");
        forms.remove(0)
    }

    #[test]
    fn reads_nested_forms_with_positions() {
        let form = read_one("(+ 1\n   [x \"s\"])");
        let FormKind::List(items) = form.kind else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        let vector = items.get(2).expect("vector");
        assert_eq!((vector.line, vector.column), (2, 4));
    }

    #[rstest]
    #[case("nil", FormKind::Nil)]
    #[case("true", FormKind::Bool(true))]
    #[case("-42", FormKind::Int(-42))]
    #[case(":done", FormKind::Keyword("done".to_owned()))]
    #[case("clojure.core/inc", FormKind::Symbol("clojure.core/inc".to_owned()))]
    #[case("-", FormKind::Symbol("-".to_owned()))]
    #[case("\"a\\nb\"", FormKind::Str("a\nb".to_owned()))]
    fn reads_atoms(#[case] source: &str, #[case] expected: FormKind) {
        assert_eq!(read_one(source).kind, expected);
    }

    #[test]
    fn quote_expands_to_quote_form() {
        let form = read_one("'foo");
        let FormKind::List(items) = form.kind else {
            panic!("expected list");
        };
        assert_eq!(items.first().and_then(Form::as_symbol), Some("quote"));
        assert_eq!(items.get(1).and_then(Form::as_symbol), Some("foo"));
    }

    #[test]
    fn skips_comments_and_commas() {
        let forms = read_all("; leading\n1, 2 ; trailing", None).expect("readable");
        assert_eq!(forms.len(), 2);
    }

    #[rstest]
    #[case("(+ 1 2", "parse/unterminated-list", 1, 1)]
    #[case("  [1 2", "parse/unterminated-vector", 1, 3)]
    #[case("\"abc", "parse/unterminated-string", 1, 1)]
    #[case("1 )", "parse/unexpected-close", 1, 3)]
    #[case("{:a 1}", "lex/unsupported-character", 1, 1)]
    #[case("99999999999999999999", "lex/invalid-number", 1, 1)]
    fn reports_reader_errors(
        #[case] source: &str,
        #[case] kind: &str,
        #[case] line: u32,
        #[case] column: u32,
    ) {
        let error = read_all(source, Some("scratch.clj")).expect_err("reader error");
        assert_eq!(error.kind, kind);
        assert_eq!((error.location.line, error.location.column), (line, column));
        assert_eq!(error.location.file.as_deref(), Some("scratch.clj"));
    }

    #[rstest]
    #[case("(".repeat(20_000))]
    #[case("'".repeat(20_000))]
    #[case("[(".repeat(10_000))]
    fn deep_nesting_is_refused_before_the_stack_runs_out(#[case] source: String) {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || read_all(&source, None))
            .expect("spawn reader thread");
        let error = handle.join().expect("reader thread").expect_err("too deep");
        assert_eq!(error.kind, "parse/nesting-too-deep");
    }

    #[test]
    fn nesting_up_to_the_limit_reads() {
        let source = format!("{}{}", "(".repeat(MAX_READ_DEPTH), ")".repeat(MAX_READ_DEPTH));
        assert!(read_all(&source, None).is_ok());
    }

    #[test]
    fn unterminated_list_points_a_note_at_end_of_input() {
        let error = read_all("(foo\n  bar", None).expect_err("reader error");
        let note = error.notes.first().expect("note");
        assert_eq!((note.location.line, note.location.column), (2, 6));
    }
}
