//! Namespace and var storage.

use std::collections::{BTreeMap, BTreeSet};

use super::builtins;
use super::value::Value;

pub(crate) const CORE_NS: &str = "clojure.core";
pub(crate) const USER_NS: &str = "user";

/// Metadata attached to a var.
#[derive(Debug, Clone, Default)]
pub(crate) struct VarMeta {
    pub(crate) doc: Option<String>,
    pub(crate) arglists: Vec<String>,
    pub(crate) is_macro: bool,
    pub(crate) is_test: bool,
    pub(crate) file: Option<String>,
    pub(crate) line: Option<u32>,
    pub(crate) column: Option<u32>,
}

/// A named, namespace-owned binding.
#[derive(Debug, Clone)]
pub(crate) struct Var {
    pub(crate) ns: String,
    pub(crate) name: String,
    pub(crate) value: Value,
    pub(crate) meta: VarMeta,
}

impl Var {
    pub(crate) fn repr(&self) -> String {
        format!("#'{}/{}", self.ns, self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct NamespaceData {
    pub(crate) vars: BTreeMap<String, Var>,
    pub(crate) aliases: BTreeMap<String, String>,
}

/// Every namespace in the image plus the sources `require` may load.
#[derive(Debug)]
pub(crate) struct NamespaceTable {
    namespaces: BTreeMap<String, NamespaceData>,
    sources: BTreeMap<String, String>,
    loading: BTreeSet<String>,
    keywords: BTreeSet<String>,
}

impl NamespaceTable {
    /// Records a keyword the program has produced.
    pub(crate) fn intern_keyword(&mut self, name: &str) {
        if !self.keywords.contains(name) {
            self.keywords.insert(name.to_owned());
        }
    }

    /// Interned keyword names in sorted order.
    pub(crate) fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub(crate) fn new() -> Self {
        let mut table = Self {
            namespaces: BTreeMap::new(),
            sources: BTreeMap::new(),
            loading: BTreeSet::new(),
            keywords: BTreeSet::new(),
        };
        let core = table.ensure(CORE_NS);
        for var in builtins::core_vars() {
            core.vars.insert(var.name.clone(), var);
        }
        table.ensure(USER_NS);
        table
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&NamespaceData> {
        self.namespaces.get(name)
    }

    pub(crate) fn ensure(&mut self, name: &str) -> &mut NamespaceData {
        self.namespaces.entry(name.to_owned()).or_default()
    }

    pub(crate) fn intern(&mut self, var: Var) {
        let ns = self.ensure(&var.ns);
        ns.vars.insert(var.name.clone(), var);
    }

    pub(crate) fn add_alias(&mut self, ns: &str, alias: &str, target: &str) {
        self.ensure(ns)
            .aliases
            .insert(alias.to_owned(), target.to_owned());
    }

    /// Resolves an alias or a full namespace name as seen from `ns`.
    pub(crate) fn resolve_ns(&self, ns: &str, name: &str) -> Option<&str> {
        if let Some(target) = self.get(ns).and_then(|data| data.aliases.get(name)) {
            return Some(target.as_str());
        }
        self.namespaces
            .get_key_value(name)
            .map(|(key, _)| key.as_str())
    }

    /// Resolves `symbol` (optionally `alias/name`) from `ns`.
    pub(crate) fn resolve(&self, ns: &str, symbol: &str) -> Option<&Var> {
        if let Some((qualifier, name)) = split_qualified(symbol) {
            let target = self.resolve_ns(ns, qualifier)?;
            return self.get(target)?.vars.get(name);
        }
        self.get(ns)
            .and_then(|data| data.vars.get(symbol))
            .or_else(|| self.get(CORE_NS)?.vars.get(symbol))
    }

    /// Vars visible from `ns`, paired with whether `ns` owns them.
    pub(crate) fn visible(&self, ns: &str) -> Vec<(&Var, bool)> {
        let own = self
            .get(ns)
            .into_iter()
            .flat_map(|data| data.vars.values())
            .map(|var| (var, true));
        let referred = (ns != CORE_NS)
            .then(|| self.get(CORE_NS))
            .flatten()
            .into_iter()
            .flat_map(|data| data.vars.values())
            .map(|var| (var, false));
        own.chain(referred).collect()
    }

    pub(crate) fn register_source(&mut self, ns: &str, source: &str) {
        self.sources.insert(ns.to_owned(), source.to_owned());
    }

    pub(crate) fn source(&self, ns: &str) -> Option<&str> {
        self.sources.get(ns).map(String::as_str)
    }

    /// Marks `ns` as being loaded; `false` when it already is.
    pub(crate) fn begin_loading(&mut self, ns: &str) -> bool {
        self.loading.insert(ns.to_owned())
    }

    pub(crate) fn finish_loading(&mut self, ns: &str) {
        self.loading.remove(ns);
    }
}

/// Splits `ns/name`; a lone `/` or a leading slash is an ordinary name.
pub(crate) fn split_qualified(symbol: &str) -> Option<(&str, &str)> {
    let (qualifier, name) = symbol.split_once('/')?;
    (!qualifier.is_empty() && !name.is_empty()).then_some((qualifier, name))
}
