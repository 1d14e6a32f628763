//! Sources of grammar tables.
//!
//! A [`GrammarProvider`] resolves a grammar name to raw [`TableData`]. The
//! [`Loader`](crate::Loader) only ever talks to this trait, so tables can come
//! from the crate itself, from `grammar.json` files on disk, or from memory.

use crate::grammar::Grammar;
use crate::loader::{GrammarLoadError, LoadErrorKind};
use crate::verse;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Raw grammar tables, as handed over by a provider.
#[derive(Debug, Clone)]
pub enum TableData {
    /// Serialized tables in tree-sitter's `grammar.json` format.
    Json {
        /// Where the JSON came from (a path, a resource name, ...).
        origin: String,
        /// The JSON text.
        json: String,
    },
    /// Tables that are already in memory as a [`Grammar`].
    Compiled {
        /// Where the grammar came from.
        origin: String,
        /// The grammar itself.
        grammar: Box<Grammar>,
    },
}

impl TableData {
    /// Describes where these tables came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        match self {
            TableData::Json { origin, .. } | TableData::Compiled { origin, .. } => origin,
        }
    }
}

/// The capability to turn a grammar name into grammar tables.
pub trait GrammarProvider: Send + Sync {
    /// Resolves `name` to its tables.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarLoadError`] with [`LoadErrorKind::NotFound`] when the
    /// provider has no artifact for `name`, or another kind when an artifact
    /// exists but can't be read.
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError>;
}

impl<T: GrammarProvider + ?Sized> GrammarProvider for &T {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        (**self).resolve(name)
    }
}

impl<T: GrammarProvider + ?Sized> GrammarProvider for Box<T> {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        (**self).resolve(name)
    }
}

/// Serves the grammars compiled into this crate. Currently that's Verse.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedProvider;

impl GrammarProvider for EmbeddedProvider {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        if name == verse::NAME {
            Ok(TableData::Compiled {
                origin: format!("embedded:{name}"),
                grammar: Box::new(verse::grammar()),
            })
        } else {
            Err(GrammarLoadError::new(
                name,
                LoadErrorKind::NotFound {
                    searched: vec!["embedded grammars".to_owned()],
                },
            ))
        }
    }
}

/// Reads `grammar.json` files from a directory tree.
///
/// For a name `n` it tries, in order, `<root>/n.json`, `<root>/n/src/grammar.json`
/// and `<root>/tree-sitter-n/src/grammar.json`, the last two being the layout of
/// a generated tree-sitter grammar repository.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    /// Creates a provider rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this provider searches.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> [PathBuf; 3] {
        [
            self.root.join(format!("{name}.json")),
            self.root.join(name).join("src").join("grammar.json"),
            self.root
                .join(format!("tree-sitter-{name}"))
                .join("src")
                .join("grammar.json"),
        ]
    }
}

impl GrammarProvider for DirectoryProvider {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        if !is_plain_name(name) {
            return Err(GrammarLoadError::new(name, LoadErrorKind::InvalidName));
        }

        let candidates = self.candidates(name);
        for path in &candidates {
            match std::fs::read_to_string(path) {
                Ok(json) => {
                    tracing::debug!(grammar = name, path = %path.display(), "read grammar tables");
                    return Ok(TableData::Json {
                        origin: path.display().to_string(),
                        json,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(GrammarLoadError::new(
                        name,
                        LoadErrorKind::Io {
                            path: path.clone(),
                            source,
                        },
                    ));
                }
            }
        }

        Err(GrammarLoadError::new(
            name,
            LoadErrorKind::NotFound {
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            },
        ))
    }
}

/// Grammar names double as path components, so keep them to one plain segment.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Serves `grammar.json` text held in memory, keyed by grammar name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    tables: HashMap<String, String>,
}

impl InMemoryProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the tables for `name`, builder-style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, json: impl Into<String>) -> Self {
        self.insert(name, json);
        self
    }

    /// Adds (or replaces) the tables for `name`.
    pub fn insert(&mut self, name: impl Into<String>, json: impl Into<String>) {
        self.tables.insert(name.into(), json.into());
    }
}

impl GrammarProvider for InMemoryProvider {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        self.tables
            .get(name)
            .map(|json| TableData::Json {
                origin: format!("memory:{name}"),
                json: json.clone(),
            })
            .ok_or_else(|| {
                GrammarLoadError::new(
                    name,
                    LoadErrorKind::NotFound {
                        searched: vec!["in-memory tables".to_owned()],
                    },
                )
            })
    }
}

/// Tries `primary`, then `secondary` if the primary doesn't have the grammar.
///
/// Only [`LoadErrorKind::NotFound`] falls through; any other failure of the
/// primary is returned as is.
#[derive(Debug, Clone, Default)]
pub struct Fallback<A, B> {
    primary: A,
    secondary: B,
}

impl<A, B> Fallback<A, B> {
    /// Chains two providers.
    #[must_use]
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: GrammarProvider, B: GrammarProvider> GrammarProvider for Fallback<A, B> {
    fn resolve(&self, name: &str) -> Result<TableData, GrammarLoadError> {
        match self.primary.resolve(name) {
            Err(first) if first.is_not_found() => {
                self.secondary.resolve(name).map_err(|mut second| {
                    second.prepend_searched(first.searched());
                    second
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_provider_serves_verse_only() {
        let tables = EmbeddedProvider.resolve("verse").unwrap();
        assert_eq!(tables.origin(), "embedded:verse");
        assert!(matches!(tables, TableData::Compiled { .. }));

        let err = EmbeddedProvider.resolve("python").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.grammar(), "python");
    }

    #[test]
    fn test_in_memory_provider() {
        let provider = InMemoryProvider::new().with("tiny", "{}");
        match provider.resolve("tiny").unwrap() {
            TableData::Json { origin, json } => {
                assert_eq!(origin, "memory:tiny");
                assert_eq!(json, "{}");
            }
            TableData::Compiled { .. } => panic!("expected JSON tables"),
        }
        assert!(provider.resolve("other").unwrap_err().is_not_found());
    }

    #[test]
    fn test_plain_names() {
        assert!(is_plain_name("verse"));
        assert!(is_plain_name("tree-sitter-verse"));
        assert!(is_plain_name("c_sharp"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("../verse"));
        assert!(!is_plain_name("a/b"));
    }

    #[test]
    fn test_directory_provider_rejects_path_names() {
        let provider = DirectoryProvider::new("/nonexistent");
        let err = provider.resolve("../etc").unwrap_err();
        assert!(matches!(err.kind(), LoadErrorKind::InvalidName));
    }

    #[test]
    fn test_fallback_only_on_not_found() {
        let chained = Fallback::new(InMemoryProvider::new(), EmbeddedProvider);
        assert!(chained.resolve("verse").is_ok());

        let err = chained.resolve("missing").unwrap_err();
        assert_eq!(err.searched(), ["in-memory tables", "embedded grammars"]);
    }
}
