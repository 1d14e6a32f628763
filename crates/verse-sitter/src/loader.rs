//! Loading grammar tables into [`Language`] handles, and checking that it worked.
//!
//! [`Loader::load`] is the one way to get a handle: it asks its
//! [`GrammarProvider`] for the tables, parses them if they're serialized,
//! checks that they are the grammar that was asked for, and validates them.
//! [`GrammarCheck`] wraps a single load in a two-outcome state machine and
//! reports failure the way a test harness or CLI wants to print it.

use crate::grammar::{parse_grammar, GrammarError, GRAMMAR_SCHEMA_URL};
use crate::language::Language;
use crate::provider::{EmbeddedProvider, GrammarProvider, TableData};
use crate::validate::{validate, ValidationError};
use crate::verse;
use std::path::PathBuf;

/// A grammar reference could not be turned into a usable [`Language`].
#[derive(Debug, thiserror::Error)]
#[error("cannot load grammar '{grammar}': {kind}")]
pub struct GrammarLoadError {
    grammar: String,
    #[source]
    kind: LoadErrorKind,
}

/// Why a load failed.
#[derive(Debug, thiserror::Error)]
pub enum LoadErrorKind {
    /// No artifact exists for the name.
    #[error("no grammar tables found (searched: {})", .searched.join(", "))]
    NotFound {
        /// Human-readable descriptions of the places that were searched.
        searched: Vec<String>,
    },

    /// The name can't be used to look up an artifact.
    #[error("not a valid grammar name")]
    InvalidName,

    /// The artifact exists but couldn't be read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        /// The artifact's path.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The artifact isn't well-formed grammar JSON.
    #[error(transparent)]
    Malformed(#[from] GrammarError),

    /// The artifact is a grammar, but not one this loader can accept for the name.
    #[error("incompatible grammar tables: {reason}")]
    Incompatible {
        /// What didn't match.
        reason: String,
    },

    /// The grammar failed structural validation.
    #[error("invalid grammar: {0}")]
    Invalid(#[from] ValidationError),
}

impl GrammarLoadError {
    /// Creates an error for the grammar reference `grammar`.
    #[must_use]
    pub fn new(grammar: impl Into<String>, kind: LoadErrorKind) -> Self {
        Self {
            grammar: grammar.into(),
            kind,
        }
    }

    /// The grammar reference that failed to load.
    #[must_use]
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// The reason for the failure.
    #[must_use]
    pub fn kind(&self) -> &LoadErrorKind {
        &self.kind
    }

    /// Whether the failure is just a missing artifact.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LoadErrorKind::NotFound { .. })
    }

    /// The places searched, for [`LoadErrorKind::NotFound`]; empty otherwise.
    #[must_use]
    pub fn searched(&self) -> &[String] {
        match &self.kind {
            LoadErrorKind::NotFound { searched } => searched,
            _ => &[],
        }
    }

    pub(crate) fn prepend_searched(&mut self, earlier: &[String]) {
        if let LoadErrorKind::NotFound { searched } = &mut self.kind {
            searched.splice(0..0, earlier.iter().cloned());
        }
    }
}

/// Builds [`Language`] handles from whatever a [`GrammarProvider`] resolves.
#[derive(Debug, Clone, Default)]
pub struct Loader<P = EmbeddedProvider> {
    provider: P,
}

impl Loader<EmbeddedProvider> {
    /// A loader for the grammars compiled into this crate.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new(EmbeddedProvider)
    }
}

impl<P: GrammarProvider> Loader<P> {
    /// Creates a loader backed by `provider`.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The provider this loader resolves names with.
    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Loads the grammar called `name`.
    ///
    /// Every successful call returns a fresh handle; two loads of the same
    /// grammar are equivalent but don't share tables.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarLoadError`] if the provider has no tables for `name`,
    /// the tables are malformed, they declare a foreign `$schema` or a
    /// different grammar name, or they fail [`validate`].
    pub fn load(&self, name: &str) -> Result<Language, GrammarLoadError> {
        let fail = |kind: LoadErrorKind| GrammarLoadError::new(name, kind);

        let tables = self.provider.resolve(name)?;
        let origin = tables.origin().to_owned();
        let grammar = match tables {
            TableData::Json { json, .. } => {
                parse_grammar(&json).map_err(|e| fail(LoadErrorKind::Malformed(e)))?
            }
            TableData::Compiled { grammar, .. } => *grammar,
        };

        if let Some(schema) = grammar.schema.as_deref() {
            if schema != GRAMMAR_SCHEMA_URL {
                return Err(fail(LoadErrorKind::Incompatible {
                    reason: format!("unsupported schema '{schema}'"),
                }));
            }
        }
        if grammar.name != name {
            return Err(fail(LoadErrorKind::Incompatible {
                reason: format!("tables are for grammar '{}'", grammar.name),
            }));
        }

        validate(&grammar).map_err(|e| fail(LoadErrorKind::Invalid(e)))?;

        tracing::debug!(
            grammar = name,
            %origin,
            rules = grammar.rules.len(),
            "loaded grammar"
        );
        Ok(Language::new(grammar, origin))
    }
}

/// Where a [`GrammarCheck`] stands.
#[derive(Debug)]
pub enum LoadState {
    /// Nothing has been attempted yet.
    Unloaded,
    /// The grammar loaded; here is the handle.
    Loaded(Language),
    /// The load failed; here is why.
    Failed(GrammarLoadError),
}

impl LoadState {
    /// `Loaded` and `Failed` are final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Unloaded)
    }
}

/// A reported check failure, e.g. `Error loading Verse grammar: ...`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error loading {label} grammar: {cause}")]
pub struct CheckFailure {
    /// Display name of the grammar being checked.
    pub label: String,
    /// The rendered load error.
    pub cause: String,
}

/// Loads one grammar reference once and reports the outcome.
///
/// The check moves from [`LoadState::Unloaded`] to either
/// [`LoadState::Loaded`] or [`LoadState::Failed`] on its first run and stays
/// there; running it again reports the same outcome without reloading.
#[derive(Debug)]
pub struct GrammarCheck {
    label: String,
    grammar: String,
    state: LoadState,
}

impl GrammarCheck {
    /// A check that loads `grammar`, reporting it as `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, grammar: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            grammar: grammar.into(),
            state: LoadState::Unloaded,
        }
    }

    /// The check for the Verse grammar.
    #[must_use]
    pub fn verse() -> Self {
        Self::new(verse::LABEL, verse::NAME)
    }

    /// The grammar reference being checked.
    #[must_use]
    pub fn grammar(&self) -> &str {
        &self.grammar
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Runs the check with `loader`, unless it already ran.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckFailure`] if the load failed, now or on an earlier run.
    pub fn run<P: GrammarProvider>(
        &mut self,
        loader: &Loader<P>,
    ) -> Result<&Language, CheckFailure> {
        if let LoadState::Unloaded = self.state {
            self.state = match loader.load(&self.grammar) {
                Ok(language) => LoadState::Loaded(language),
                Err(e) => {
                    tracing::debug!(grammar = %self.grammar, error = %e, "grammar check failed");
                    LoadState::Failed(e)
                }
            };
        }

        match &self.state {
            LoadState::Loaded(language) => Ok(language),
            LoadState::Failed(e) => Err(self.failure(e.to_string())),
            LoadState::Unloaded => Err(self.failure("check did not run".to_owned())),
        }
    }

    fn failure(&self, cause: String) -> CheckFailure {
        CheckFailure {
            label: self.label.clone(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;
    use crate::provider::InMemoryProvider;

    const TINY: &str = r#"{
        "name": "tiny",
        "rules": {
            "source_file": {"type": "REPEAT", "content": {"type": "SYMBOL", "name": "word"}},
            "word": {"type": "PATTERN", "value": "[a-z]+"}
        }
    }"#;

    fn loader() -> Loader<InMemoryProvider> {
        Loader::new(InMemoryProvider::new().with("tiny", TINY))
    }

    #[test]
    fn test_load_json_tables() {
        let language = loader().load("tiny").unwrap();
        assert_eq!(language.name(), "tiny");
        assert_eq!(language.origin(), "memory:tiny");
        assert_eq!(language.rule_count(), 2);
    }

    #[test]
    fn test_load_valued_rules() {
        let strings = r#"{"name":"t","rules":{"source_file":{"type":"STRING","value":"x"}}}"#;
        let numbers = r#"{"name":"n","rules":{"source_file":{
            "type":"PREC","value":1,"content":{"type":"STRING","value":"x"}
        }}}"#;
        let loader = Loader::new(
            InMemoryProvider::new()
                .with("t", strings)
                .with("n", numbers),
        );

        let t = loader.load("t").unwrap();
        assert_eq!(t.rule("source_file").and_then(Rule::string_value), Some("x"));
        let n = loader.load("n").unwrap();
        assert_eq!(n.rule("source_file").and_then(Rule::precedence), Some(1));
    }

    #[test]
    fn test_load_embedded_verse() {
        let language = Loader::embedded().load("verse").unwrap();
        assert_eq!(language.name(), "verse");
        assert_eq!(language.origin(), "embedded:verse");
    }

    #[test]
    fn test_malformed_tables() {
        let loader = Loader::new(InMemoryProvider::new().with("tiny", "{ not json"));
        let err = loader.load("tiny").unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::Malformed(_)));
        assert_eq!(err.grammar(), "tiny");
    }

    #[test]
    fn test_name_mismatch_is_incompatible() {
        let loader = Loader::new(InMemoryProvider::new().with("other", TINY));
        let err = loader.load("other").unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::Incompatible { .. }));
        assert!(err.to_string().contains("tables are for grammar 'tiny'"));
    }

    #[test]
    fn test_foreign_schema_is_incompatible() {
        let json = TINY.replacen('{', r#"{"$schema": "https://example.com/other.json","#, 1);
        let loader = Loader::new(InMemoryProvider::new().with("tiny", json));
        let err = loader.load("tiny").unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::Incompatible { .. }));
    }

    #[test]
    fn test_invalid_grammar() {
        let json = TINY.replace(r#""name": "word""#, r#""name": "letter""#);
        let loader = Loader::new(InMemoryProvider::new().with("tiny", json));
        let err = loader.load("tiny").unwrap_err();
        assert!(matches!(
            err.kind(),
            LoadErrorKind::Invalid(ValidationError::UndefinedSymbol { .. })
        ));
    }

    #[test]
    fn test_check_transitions_once() {
        let mut check = GrammarCheck::new("Tiny", "tiny");
        assert!(matches!(check.state(), LoadState::Unloaded));

        let loader = loader();
        assert!(check.run(&loader).is_ok());
        assert!(matches!(check.state(), LoadState::Loaded(_)));

        // a later run doesn't reload, even against a loader that would fail
        let empty = Loader::new(InMemoryProvider::new());
        assert!(check.run(&empty).is_ok());
    }

    #[test]
    fn test_failed_check_is_not_retried() {
        let mut check = GrammarCheck::new("Tiny", "tiny");
        let failure = check.run(&Loader::new(InMemoryProvider::new())).unwrap_err();
        assert!(failure.to_string().starts_with("Error loading Tiny grammar: "));
        assert!(matches!(check.state(), LoadState::Failed(_)));

        assert_eq!(check.run(&loader()).unwrap_err(), failure);
    }

    #[test]
    fn test_searched_locations_are_merged() {
        let mut err = GrammarLoadError::new(
            "x",
            LoadErrorKind::NotFound {
                searched: vec!["b".into()],
            },
        );
        err.prepend_searched(&["a".to_owned()]);
        assert_eq!(err.searched(), ["a", "b"]);
        assert_eq!(
            err.to_string(),
            "cannot load grammar 'x': no grammar tables found (searched: a, b)"
        );
    }
}
