//! Wire shapes for recorded evaluation failures.

use lantern_bencode::{Dict, Value};

use crate::dispatch::response::{Response, integer};
use crate::evaluator::{CompileError, ErrorNote, SourceLocation};

/// Adds top-level `file`, `line` and `column` fields for the known parts of
/// `location`. Line and column travel as decimal strings.
pub(super) fn with_location(response: Response, location: &SourceLocation) -> Response {
    let known = |value: u32| (value != 0).then(|| value.to_string());
    response
        .field_opt("file", location.file.as_deref())
        .field_opt("line", known(location.line))
        .field_opt("column", known(location.column))
}

fn source_dict(location: &SourceLocation) -> Dict {
    let mut source = Dict::new();
    if let Some(file) = &location.file {
        source.insert("file".to_owned(), Value::from(file.as_str()));
    }
    if location.line != 0 {
        source.insert("line".to_owned(), integer(location.line));
    }
    if location.column != 0 {
        source.insert("column".to_owned(), integer(location.column));
    }
    source
}

fn note_dict(note: &ErrorNote) -> Value {
    let mut dict = Dict::new();
    dict.insert("kind".to_owned(), Value::from(note.kind.as_str()));
    dict.insert("message".to_owned(), Value::from(note.message.as_str()));
    dict.insert("source".to_owned(), Value::Dict(source_dict(&note.location)));
    Value::Dict(dict)
}

fn notes_list(notes: &[ErrorNote]) -> Value {
    Value::List(notes.iter().map(note_dict).collect())
}

/// `{kind, message, source, notes, causes}` for a compile failure.
pub(super) fn error_dict(error: &CompileError) -> Dict {
    let mut dict = Dict::new();
    dict.insert("kind".to_owned(), Value::from(error.kind.as_str()));
    dict.insert("message".to_owned(), Value::from(error.message.as_str()));
    dict.insert("source".to_owned(), Value::Dict(source_dict(&error.location)));
    dict.insert("notes".to_owned(), notes_list(&error.notes));
    let causes = error
        .chain()
        .skip(1)
        .map(|cause| {
            let mut entry = Dict::new();
            entry.insert("kind".to_owned(), Value::from(cause.kind.as_str()));
            entry.insert("message".to_owned(), Value::from(cause.message.as_str()));
            entry.insert("source".to_owned(), Value::Dict(source_dict(&cause.location)));
            Value::Dict(entry)
        })
        .collect();
    dict.insert("causes".to_owned(), Value::List(causes));
    dict
}

/// Phase reported by `analyze-last-stacktrace` for an error kind.
pub(super) fn phase(kind: &str) -> Option<&'static str> {
    let (prefix, _) = kind.split_once('/')?;
    match prefix {
        "lex" | "parse" => Some("read-source"),
        "analyze" => Some("compile-syntax-check"),
        "runtime" => Some("execution"),
        "aot" => Some("compile"),
        "system" => Some("system"),
        _ => None,
    }
}

fn frame(error: &CompileError) -> Value {
    let mut frame = Dict::new();
    frame.insert("class".to_owned(), Value::from(error.kind.as_str()));
    frame.insert("message".to_owned(), Value::from(error.message.as_str()));
    frame.insert("type".to_owned(), Value::from("lantern"));
    frame.insert("method".to_owned(), Value::from(error.kind.as_str()));
    frame.insert("name".to_owned(), Value::from(error.kind.as_str()));
    frame.extend(source_dict(&error.location));
    frame.insert("flags".to_owned(), Value::string_list(["lantern"]));
    Value::Dict(frame)
}

/// One `analyze-last-stacktrace` response body for `error`.
///
/// The stacktrace holds a frame for `error` followed by one per cause.
pub(super) fn analysis(response: Response, error: &CompileError) -> Response {
    let response = response
        .field("class", error.kind.as_str())
        .field("message", error.message.as_str())
        .field("type", error.kind.as_str())
        .field_opt("phase", phase(&error.kind));
    let response = with_location(response, &error.location);
    let response = if error.notes.is_empty() {
        response
    } else {
        response.field("notes", notes_list(&error.notes))
    };
    response.field("stacktrace", Value::List(error.chain().map(frame).collect()))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::dispatch::message::Message;

    fn sample() -> CompileError {
        CompileError::new(
            "analyze/unresolved-symbol",
            "Unable to resolve symbol: foo in this context",
            SourceLocation::new(Some("scratch.clj"), 3, 7),
        )
        .with_note(ErrorNote {
            kind: "error".to_owned(),
            message: "Referenced here".to_owned(),
            location: SourceLocation::new(Some("scratch.clj"), 3, 7),
        })
    }

    #[rstest]
    #[case("parse/unterminated-list", Some("read-source"))]
    #[case("lex/invalid-number", Some("read-source"))]
    #[case("analyze/unresolved-symbol", Some("compile-syntax-check"))]
    #[case("runtime/invalid-arity", Some("execution"))]
    #[case("aot/unresolved-symbol", Some("compile"))]
    #[case("system/missing-file", Some("system"))]
    #[case("internal/failure", None)]
    #[case("unprefixed", None)]
    fn maps_kinds_to_phases(#[case] kind: &str, #[case] expected: Option<&str>) {
        assert_eq!(phase(kind), expected);
    }

    #[test]
    fn location_fields_are_strings_and_skip_unknowns() {
        let location = SourceLocation::new(None, 12, 0);
        let response = with_location(Response::to(&Message::default(), None), &location).build();
        assert_eq!(response.get("line"), Some(&Value::from("12")));
        assert!(response.get("column").is_none());
        assert!(response.get("file").is_none());
    }

    #[test]
    fn error_dict_nests_source_and_notes() {
        let dict = error_dict(&sample());
        let source = dict.get("source").and_then(Value::as_dict).expect("source");
        assert_eq!(source.get("line"), Some(&Value::Integer(3)));
        assert_eq!(source.get("file"), Some(&Value::from("scratch.clj")));
        let notes = dict.get("notes").and_then(Value::as_list).expect("notes");
        assert_eq!(notes.len(), 1);
        assert_eq!(dict.get("causes"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn error_dict_lists_causes_outermost_first() {
        let root = CompileError::new("parse/unexpected-close", "Unexpected )", SourceLocation::default());
        let dict = error_dict(&sample().caused_by(root));
        let causes = dict.get("causes").and_then(Value::as_list).expect("causes");
        let kinds: Vec<_> = causes
            .iter()
            .filter_map(|cause| cause.as_dict()?.get("kind")?.as_str())
            .collect();
        assert_eq!(kinds, ["parse/unexpected-close"]);
    }

    #[test]
    fn analysis_includes_phase_and_frame() {
        let response = analysis(Response::to(&Message::default(), None), &sample()).build();
        assert_eq!(response.get("phase"), Some(&Value::from("compile-syntax-check")));
        assert_eq!(response.get("class"), Some(&Value::from("analyze/unresolved-symbol")));
        let frames = response
            .get("stacktrace")
            .and_then(Value::as_list)
            .expect("stacktrace");
        let frame = frames.first().and_then(Value::as_dict).expect("frame");
        assert_eq!(frame.get("flags"), Some(&Value::string_list(["lantern"])));
        assert_eq!(frame.get("line"), Some(&Value::Integer(3)));
    }
}
