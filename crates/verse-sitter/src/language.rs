//! The opaque language handle.

use crate::grammar::{Grammar, Rule};
use std::collections::BTreeSet;
use std::sync::Arc;

/// The grammar table ABI version handles are issued for.
pub const LANGUAGE_VERSION: u32 = 15;

/// A loaded, validated grammar.
///
/// Handles are only ever created by [`Loader::load`](crate::Loader::load), so
/// holding one means the grammar passed validation. A handle is immutable and
/// cheap to clone; clones share the same tables.
#[derive(Debug, Clone)]
pub struct Language {
    inner: Arc<LanguageInner>,
}

#[derive(Debug)]
struct LanguageInner {
    grammar: Grammar,
    origin: String,
    abi_version: u32,
}

impl Language {
    pub(crate) fn new(grammar: Grammar, origin: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LanguageInner {
                grammar,
                origin: origin.into(),
                abi_version: LANGUAGE_VERSION,
            }),
        }
    }

    /// The grammar's name, e.g. `"verse"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.grammar.name
    }

    /// The ABI version tag of this handle.
    #[must_use]
    pub fn abi_version(&self) -> u32 {
        self.inner.abi_version
    }

    /// Where the tables were loaded from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// Read-only access to the underlying grammar tables.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.inner.grammar
    }

    /// Looks up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.inner.grammar.rule(name)
    }

    /// Number of rules in the grammar.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.inner.grammar.rules.len()
    }

    /// All rule names, sorted.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.grammar.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// External scanner tokens, in declaration order.
    #[must_use]
    pub fn external_names(&self) -> Vec<&str> {
        self.inner.grammar.external_names()
    }

    /// Every field label used anywhere in the grammar, sorted and deduplicated.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        fn walk<'a>(rule: &'a Rule, out: &mut BTreeSet<&'a str>) {
            if let Some(name) = rule.field_name() {
                out.insert(name);
            }
            for child in rule.children() {
                walk(child, out);
            }
        }

        let mut fields = BTreeSet::new();
        for rule in self.inner.grammar.rules.values() {
            walk(rule, &mut fields);
        }
        fields.into_iter().collect()
    }

    /// Whether two handles share the same tables.
    #[must_use]
    pub fn ptr_eq(&self, other: &Language) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
