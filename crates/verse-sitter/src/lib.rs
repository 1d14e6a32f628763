//! The Verse grammar for a Rust-native tree-sitter.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Core structures and parsing logic for Tree-sitter grammars.
///
/// This module defines how a grammar is represented: the typed form of
/// tree-sitter's `grammar.json`, and the DSL used to write one in Rust.
pub mod grammar;

/// The opaque [`Language`] handle.
pub mod language;

/// Turning grammar references into handles, and the load check.
///
/// Loading is where malformed or mismatched tables get stopped: nothing
/// outside this module can construct a [`Language`].
pub mod loader;

/// Where grammar tables come from.
pub mod provider;

/// Grammar validation and consistency checking utilities.
///
/// Validation exists to protect downstream stages from malformed grammars.
/// It enforces Tree-sitter's invariants and ensures that what's parsed is
/// also semantically meaningful.
pub mod validate;

/// The Verse grammar definition.
pub mod verse;

pub use grammar::{parse_grammar, Grammar, GrammarError, Rule, RuleType, RuleValue};
pub use language::{Language, LANGUAGE_VERSION};
pub use loader::{CheckFailure, GrammarCheck, GrammarLoadError, LoadErrorKind, LoadState, Loader};
pub use provider::{
    DirectoryProvider, EmbeddedProvider, Fallback, GrammarProvider, InMemoryProvider, TableData,
};
pub use validate::{validate, ValidationError};

/// Returns the [`Language`] for Verse, loaded from the embedded tables.
///
/// # Errors
///
/// Returns a [`GrammarLoadError`] if the embedded tables fail validation.
pub fn language() -> Result<Language, GrammarLoadError> {
    Loader::embedded().load(verse::NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_load_grammar() {
        let language = language().expect("Error loading Verse grammar");
        assert_eq!(language.name(), "verse");
        assert_eq!(language.abi_version(), LANGUAGE_VERSION);
    }
}
