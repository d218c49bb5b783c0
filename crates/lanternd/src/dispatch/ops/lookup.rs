//! Symbol queries: `completions`, `complete`, `lookup`, `info` and `eldoc`.

use std::collections::BTreeSet;

use lantern_bencode::{Dict, Value};

use crate::dispatch::engine::Engine;
use crate::dispatch::errors::Rejection;
use crate::dispatch::message::Message;
use crate::dispatch::response::{Response, integer};
use crate::evaluator::{Evaluator, Namespace, VarInfo};

/// Resolves a requested namespace name as seen from `current`.
///
/// Aliases win over full names; anything unresolvable (including an empty
/// request) falls back to `current`.
pub(super) fn resolve_namespace<E: Evaluator>(
    evaluator: &E,
    current: &Namespace,
    requested: &str,
) -> Namespace {
    if requested.is_empty() {
        return current.clone();
    }
    evaluator
        .resolve_alias(current, requested)
        .or_else(|| evaluator.find_namespace(requested))
        .unwrap_or_else(|| current.clone())
}

/// Splits `ns/name`. A missing or leading slash leaves the whole input as
/// the name, so `/` names the division function.
pub(super) fn parse_symbol(symbol: &str) -> (Option<&str>, &str) {
    match symbol.split_once('/') {
        Some((ns, name)) if !ns.is_empty() => (Some(ns), name),
        _ => (None, symbol),
    }
}

/// Unwraps an Emacs propertized string such as `#("map" 0 3 (face x))`.
pub(super) fn strip_text_properties(raw: &str) -> &str {
    if raw.len() <= 3 || !raw.starts_with("#(") {
        return raw;
    }
    let mut parts = raw.splitn(3, '"');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(inner), Some(_)) => inner,
        _ => raw,
    }
}

/// `macro`, `function` or `variable`.
fn var_type(var: &VarInfo) -> &'static str {
    if var.is_macro {
        "macro"
    } else if var.is_function || !var.arglists.is_empty() {
        "function"
    } else {
        "variable"
    }
}

/// A `complete` entry carrying the metadata the client asked for.
fn described_entry(candidate: String, var: &VarInfo, metadata: CompletionMetadata) -> Value {
    let mut entry = Dict::new();
    entry.insert("candidate".to_owned(), Value::from(candidate));
    entry.insert("type".to_owned(), Value::from(var_type(var)));
    if metadata.ns {
        entry.insert("ns".to_owned(), Value::from(var.ns.as_str()));
    }
    if metadata.doc
        && let Some(doc) = &var.doc
    {
        entry.insert("doc".to_owned(), Value::from(doc.as_str()));
    }
    if metadata.arglists && !var.arglists.is_empty() {
        entry.insert(
            "arglists".to_owned(),
            Value::string_list(var.arglists.iter().cloned()),
        );
        entry.insert("arglists-str".to_owned(), Value::from(var.arglists.join("\n")));
    }
    Value::Dict(entry)
}

/// Splits an arglist such as `[x & more]` into `["x", "&", "more"]`.
fn arglist_tokens(arglist: &str) -> Vec<String> {
    let trimmed = arglist.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(trimmed);
    inner
        .split_whitespace()
        .skip_while(|token| *token == "quote")
        .map(str::to_owned)
        .collect()
}

/// Metadata `complete` attaches to each candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CompletionMetadata {
    ns: bool,
    doc: bool,
    arglists: bool,
}

impl CompletionMetadata {
    /// Everything unless `extra-metadata` narrows it. Entries may be written
    /// as keywords, so `:doc` and `doc` are the same request.
    fn requested(message: &Message) -> Self {
        let Some(extra) = message.text_list("extra-metadata") else {
            return Self {
                ns: true,
                doc: true,
                arglists: true,
            };
        };
        let wanted: BTreeSet<&str> = extra
            .iter()
            .map(|entry| entry.trim_start_matches(':'))
            .collect();
        Self {
            ns: wanted.contains("ns"),
            doc: wanted.contains("doc"),
            arglists: wanted.contains("arglists"),
        }
    }
}

/// A completion candidate and the var it names.
struct Candidate {
    display: String,
    namespace: Namespace,
    name: String,
}

/// A symbol query after namespace resolution.
struct SymbolQuery {
    session: String,
    namespace: Namespace,
    name: String,
}

fn completion_entry(candidate: String, kind: &str, ns: &str) -> Value {
    let mut entry = Dict::new();
    entry.insert("candidate".to_owned(), Value::from(candidate));
    entry.insert("type".to_owned(), Value::from(kind));
    entry.insert("ns".to_owned(), Value::from(ns));
    Value::Dict(entry)
}

impl<E: Evaluator> Engine<E> {
    pub(crate) fn completions(&mut self, message: &Message) -> Vec<Dict> {
        let session = self.session_for(message);
        let session_id = session.id().to_owned();
        let current = session.namespace().clone();
        let prefix = message.text("prefix");

        let completions = match self.keyword_candidates(&current, prefix) {
            Some(keywords) => keywords,
            None => {
                let target = resolve_namespace(&self.evaluator, &current, message.text("ns"));
                self.symbol_candidates(&target, prefix)
                    .into_iter()
                    .map(|candidate| {
                        let mut entry = Dict::new();
                        entry.insert("candidate".to_owned(), Value::from(candidate.display));
                        entry.insert("type".to_owned(), Value::from("var"));
                        Value::Dict(entry)
                    })
                    .collect()
            }
        };
        vec![
            Response::to(message, Some(&session_id))
                .field("completions", completions)
                .done(),
        ]
    }

    pub(crate) fn complete(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let prefix = message.first_text(&["prefix", "symbol"]).to_owned();
        if prefix.is_empty() {
            return Err(Rejection::MissingPrefix);
        }
        let session = self.session_for(message);
        let session_id = session.id().to_owned();
        let current = session.namespace().clone();

        let completions = match self.keyword_candidates(&current, &prefix) {
            Some(keywords) => keywords,
            None => {
                let target = resolve_namespace(&self.evaluator, &current, message.text("ns"));
                let metadata = CompletionMetadata::requested(message);
                self.symbol_candidates(&target, &prefix)
                    .into_iter()
                    .filter_map(|candidate| {
                        let var = self.evaluator.find_var(&candidate.namespace, &candidate.name)?;
                        Some(described_entry(candidate.display, &var, metadata))
                    })
                    .collect()
            }
        };
        Ok(vec![
            Response::to(message, Some(&session_id))
                .field("completions", completions)
                .done(),
        ])
    }

    /// Keyword completions when `prefix` starts with `:`. `::name` completes
    /// keywords of the session namespace and keeps the `::` form.
    fn keyword_candidates(&self, current: &Namespace, prefix: &str) -> Option<Vec<Value>> {
        let keyword_prefix = prefix.strip_prefix(':')?;
        let keywords = self.evaluator.keywords();
        let entries = match keyword_prefix.strip_prefix(':') {
            Some(local_prefix) => {
                let ns = self.evaluator.namespace_name(current);
                let qualifier = format!("{ns}/");
                keywords
                    .iter()
                    .filter_map(|keyword| keyword.strip_prefix(qualifier.as_str()))
                    .filter(|local| local.starts_with(local_prefix))
                    .map(|local| completion_entry(format!("::{local}"), "keyword", &ns))
                    .collect()
            }
            None => keywords
                .iter()
                .filter(|keyword| keyword.starts_with(keyword_prefix))
                .map(|keyword| completion_entry(format!(":{keyword}"), "keyword", ""))
                .collect(),
        };
        Some(entries)
    }

    /// Vars visible from `target` whose names start with `prefix`. A
    /// qualified prefix (`alias/na`) lists the interned vars of the aliased
    /// namespace and keeps the qualifier in the display name.
    fn symbol_candidates(&self, target: &Namespace, prefix: &str) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = match parse_symbol(prefix) {
            (Some(qualifier), name_prefix) => self
                .evaluator
                .resolve_alias(target, qualifier)
                .or_else(|| self.evaluator.find_namespace(qualifier))
                .map(|ns| {
                    self.evaluator
                        .symbols(&ns)
                        .into_iter()
                        .filter(|entry| entry.interned && entry.name.starts_with(name_prefix))
                        .map(|entry| Candidate {
                            display: format!("{qualifier}/{}", entry.name),
                            namespace: ns.clone(),
                            name: entry.name,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            (None, _) => self
                .evaluator
                .symbols(target)
                .into_iter()
                .filter(|entry| entry.name.starts_with(prefix))
                .map(|entry| Candidate {
                    display: entry.name.clone(),
                    namespace: target.clone(),
                    name: entry.name,
                })
                .collect(),
        };
        candidates.sort_by(|left, right| left.display.cmp(&right.display));
        candidates.dedup_by(|left, right| left.display == right.display);
        candidates
    }

    pub(crate) fn lookup(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let query = self.symbol_query(message, message.text("sym"), message.text("ns"))?;
        let mut info = Dict::new();
        info.insert("name".to_owned(), Value::from(query.name.as_str()));
        info.insert(
            "ns".to_owned(),
            Value::from(self.evaluator.namespace_name(&query.namespace)),
        );
        match self.evaluator.find_var(&query.namespace, &query.name) {
            Some(var) => info.insert("var".to_owned(), Value::from(var.repr)),
            None => info.insert("missing".to_owned(), Value::from("true")),
        };
        Ok(vec![
            Response::to(message, Some(&query.session))
                .field("info", info)
                .done(),
        ])
    }

    pub(crate) fn info(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let Some((session, var)) = self.describe_symbol(message)? else {
            return Ok(vec![self.no_result(message, "no-info")]);
        };
        let response = Response::to(message, Some(&session))
            .field("name", var.name.as_str())
            .field("ns", var.ns.as_str())
            .field("type", var_type(&var))
            .field_opt("macro", var.is_macro.then_some("true"))
            .field_opt("doc", var.doc.as_deref())
            .field_opt("docstring", var.doc.as_deref())
            .field_opt(
                "arglists",
                (!var.arglists.is_empty()).then(|| Value::string_list(var.arglists.iter().cloned())),
            )
            .field_opt("file", var.file.as_deref())
            .field_opt("line", var.line.map(integer))
            .field_opt("column", var.column.map(integer));
        Ok(vec![response.done()])
    }

    pub(crate) fn eldoc(&mut self, message: &Message) -> Result<Vec<Dict>, Rejection> {
        let Some((session, var)) = self.describe_symbol(message)? else {
            return Ok(vec![self.no_result(message, "no-eldoc")]);
        };
        let eldoc: Vec<Value> = var
            .arglists
            .iter()
            .map(|arglist| Value::string_list(arglist_tokens(arglist)))
            .collect();
        let response = Response::to(message, Some(&session))
            .field("ns", var.ns.as_str())
            .field("name", var.name.as_str())
            .field("type", var_type(&var))
            .field("eldoc", eldoc)
            .field_opt("doc", var.doc.as_deref())
            .field_opt("docstring", var.doc.as_deref());
        Ok(vec![response.done()])
    }

    /// Shared front half of `info` and `eldoc`.
    fn describe_symbol(&mut self, message: &Message) -> Result<Option<(String, VarInfo)>, Rejection> {
        let raw = message.first_text(&["sym", "symbol"]);
        let query = self.symbol_query(
            message,
            strip_text_properties(raw),
            strip_text_properties(message.text("ns")),
        )?;
        Ok(self
            .evaluator
            .find_var(&query.namespace, &query.name)
            .map(|var| (query.session, var)))
    }

    fn symbol_query(
        &mut self,
        message: &Message,
        symbol: &str,
        requested_ns: &str,
    ) -> Result<SymbolQuery, Rejection> {
        let (embedded, name) = parse_symbol(symbol);
        if name.is_empty() {
            return Err(Rejection::MissingSymbol);
        }
        let session = self.session_for(message);
        let session_id = session.id().to_owned();
        let current = session.namespace().clone();
        let namespace =
            resolve_namespace(&self.evaluator, &current, embedded.unwrap_or(requested_ns));
        Ok(SymbolQuery {
            session: session_id,
            namespace,
            name: name.to_owned(),
        })
    }

    fn no_result(&mut self, message: &Message, status: &str) -> Dict {
        let session = self.session_for(message).id().to_owned();
        Response::to(message, Some(&session))
            .status(&["done", status])
            .build()
    }
}
