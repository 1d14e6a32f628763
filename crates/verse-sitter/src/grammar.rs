//! Core structures and parsing logic for Tree-sitter grammars.
//!
//! This module defines the internal representation of a grammar as parsed from
//! Tree-sitter's JSON format. It uses [`serde_json`] for deserialization and
//! provides ergonomic accessors for inspecting rule properties and structure.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};

pub mod dsl;
mod rules;

pub use rules::{Rule, RuleType, RuleValue};

/// Schema URL that `tree-sitter generate` writes into `grammar.json`.
pub const GRAMMAR_SCHEMA_URL: &str =
    "https://tree-sitter.github.io/tree-sitter/assets/schemas/grammar.schema.json";

/// Represents a full Tree-sitter grammar definition.
///
/// This structure directly mirrors the serialized JSON format produced by
/// `tree-sitter generate` (`src/grammar.json`). It captures the complete rule
/// set along with auxiliary metadata such as precedences, conflicts, and
/// supertypes.
///
/// See <https://tree-sitter.github.io/tree-sitter/assets/schemas/grammar.schema.json>
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Grammar {
    /// Optional `$schema` field from the JSON, typically used for schema
    /// validation or editor integration.
    #[serde(rename = "$schema", default)]
    pub schema: Option<String>,

    /// The short name of the grammar (e.g. `"verse"` or `"rust"`).
    pub name: String,

    /// Optional name of a base grammar that this one inherits from.
    #[serde(default)]
    pub inherits: Option<String>,

    /// Map of all rule identifiers to their corresponding definitions.
    pub rules: HashMap<String, Rule>,

    /// “Extras” that may appear between other tokens, such as whitespace or comments.
    #[serde(default)]
    pub extras: Option<Vec<Rule>>,

    /// Rules implemented externally via a scanner.
    #[serde(default)]
    pub externals: Option<Vec<Rule>>,

    /// Names of rules that should be inlined into other rules.
    #[serde(default)]
    pub inline: Option<Vec<String>>,

    /// Precedence orderings, each a list of `STRING` or `SYMBOL` rules.
    #[serde(default)]
    pub precedences: Option<Vec<Vec<Rule>>>,

    /// Explicit conflict groups expected during parsing.
    #[serde(default)]
    pub conflicts: Option<Vec<Vec<String>>>,

    /// Context-specific reserved word definitions.
    #[serde(default)]
    pub reserved: Option<HashMap<String, Vec<Rule>>>,

    /// The special rule name used to identify word tokens (keywords, identifiers, etc.).
    #[serde(default)]
    pub word: Option<String>,

    /// A list of node supertypes, grouping related syntactic forms.
    #[serde(default)]
    pub supertypes: Option<Vec<String>>,
}

/// Parse a JSON grammar definition into a strongly typed [`Grammar`] structure.
///
/// # Errors
///
/// Returns [`GrammarError::JsonParse`] if the provided string is not valid JSON
/// or fails schema deserialization.
pub fn parse_grammar(json: &str) -> Result<Grammar, GrammarError> {
    serde_json::from_str(json).map_err(|e| GrammarError::JsonParse(e.to_string()))
}

/// Errors raised while turning serialized grammar tables into a [`Grammar`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrammarError {
    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

impl Grammar {
    /// Looks up a rule definition by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Names of the tokens produced by the external scanner, in declaration order.
    ///
    /// Externals are usually `SYMBOL` references, but string literals are
    /// allowed too, in which case the literal text is returned.
    #[must_use]
    pub fn external_names(&self) -> Vec<&str> {
        self.externals
            .iter()
            .flatten()
            .filter_map(|rule| rule.symbol_name().or_else(|| rule.string_value()))
            .collect()
    }

    /// Candidate entry points: visible rules that no other rule refers to.
    ///
    /// `grammar.json` keeps the start rule first, but [`Grammar::rules`] is a
    /// map, so the start rule is recovered from the reference graph instead.
    /// The result is sorted by name.
    #[must_use]
    pub fn start_rules(&self) -> Vec<&str> {
        let mut referenced = HashSet::new();
        for (name, rule) in &self.rules {
            collect_symbols(rule, &mut |symbol| {
                if symbol != name {
                    referenced.insert(symbol.to_owned());
                }
            });
        }

        let mut roots: Vec<&str> = self
            .rules
            .keys()
            .map(String::as_str)
            .filter(|name| !name.starts_with('_') && !referenced.contains(*name))
            .collect();
        roots.sort_unstable();
        roots
    }

    /// The single entry point of the grammar, if it can be determined.
    #[must_use]
    pub fn start_rule(&self) -> Option<&str> {
        match self.start_rules().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// Calls `visit` for every symbol referenced anywhere inside `rule`.
pub(crate) fn collect_symbols<'a>(rule: &'a Rule, visit: &mut impl FnMut(&'a str)) {
    if let Some(name) = rule.symbol_name() {
        visit(name);
    }
    for child in rule.children() {
        collect_symbols(child, visit);
    }
}
