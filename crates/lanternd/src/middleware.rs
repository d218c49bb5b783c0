//! The client-visible middleware stack.
//!
//! Identifiers are informational: the engine answers every op itself, but
//! clients such as CIDER inspect and reorder the list.

use std::collections::BTreeSet;

/// Built-in stack, in installation order.
pub const DEFAULT_MIDDLEWARE: [&str; 10] = [
    "nrepl.middleware.session/session",
    "nrepl.middleware.caught/wrap-caught",
    "nrepl.middleware.print/wrap-print",
    "nrepl.middleware.interruptible-eval/interruptible-eval",
    "nrepl.middleware.load-file/wrap-load-file",
    "nrepl.middleware.completion/wrap-completion",
    "nrepl.middleware.lookup/wrap-lookup",
    "nrepl.middleware.dynamic-loader/wrap-dynamic-loader",
    "nrepl.middleware.io/wrap-out",
    "nrepl.middleware.session/add-stdin",
];

/// Ordered, duplicate-free list of middleware identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddlewareStack {
    entries: Vec<String>,
}

impl MiddlewareStack {
    /// Installed identifiers in order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Appends every identifier not already installed.
    pub fn add<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for identifier in identifiers {
            let identifier = identifier.as_ref();
            if !self.entries.iter().any(|entry| entry == identifier) {
                self.entries.push(identifier.to_owned());
            }
        }
    }

    /// Replaces the order when `identifiers` names exactly the installed set.
    ///
    /// Returns `false` and leaves the stack untouched otherwise.
    pub fn swap(&mut self, identifiers: &[String]) -> bool {
        let installed: BTreeSet<&str> = self.entries.iter().map(String::as_str).collect();
        let requested: BTreeSet<&str> = identifiers.iter().map(String::as_str).collect();
        if installed != requested {
            return false;
        }
        let mut reordered = Vec::with_capacity(requested.len());
        for identifier in identifiers {
            if !reordered.contains(identifier) {
                reordered.push(identifier.clone());
            }
        }
        self.entries = reordered;
        true
    }
}

impl Default for MiddlewareStack {
    fn default() -> Self {
        Self {
            entries: DEFAULT_MIDDLEWARE.iter().map(|&name| name.to_owned()).collect(),
        }
    }
}
