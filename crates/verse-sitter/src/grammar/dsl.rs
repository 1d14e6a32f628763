//! Rule combinators for writing grammars in Rust.
//!
//! These mirror the functions of tree-sitter's `grammar.js` DSL and produce
//! exactly the [`Rule`] trees that `tree-sitter generate` would serialize into
//! `grammar.json`, so a grammar written here and a grammar loaded from JSON
//! are interchangeable.

use super::{Grammar, Rule, RuleType, RuleValue, GRAMMAR_SCHEMA_URL};
use std::collections::HashMap;

/// An empty production.
#[must_use]
pub fn blank() -> Rule {
    Rule::new(RuleType::Blank)
}

/// A literal string token, e.g. `string(":=")`.
#[must_use]
pub fn string(value: impl Into<String>) -> Rule {
    let mut rule = Rule::new(RuleType::String);
    rule.value = Some(RuleValue::String(value.into()));
    rule
}

/// A regular-expression token, given as the pattern source.
#[must_use]
pub fn pattern(source: impl Into<String>) -> Rule {
    let mut rule = Rule::new(RuleType::Pattern);
    rule.value = Some(RuleValue::String(source.into()));
    rule
}

/// A reference to the rule (or external token) called `name`.
#[must_use]
pub fn sym(name: impl Into<String>) -> Rule {
    let mut rule = Rule::new(RuleType::Symbol);
    rule.name = Some(name.into());
    rule
}

/// Matches each of `members` in order.
#[must_use]
pub fn seq(members: impl IntoIterator<Item = Rule>) -> Rule {
    let mut rule = Rule::new(RuleType::Seq);
    rule.members = members.into_iter().collect();
    rule
}

/// Matches any one of `members`.
#[must_use]
pub fn choice(members: impl IntoIterator<Item = Rule>) -> Rule {
    let mut rule = Rule::new(RuleType::Choice);
    rule.members = members.into_iter().collect();
    rule
}

/// Matches `content` or nothing.
#[must_use]
pub fn optional(content: Rule) -> Rule {
    choice([content, blank()])
}

/// Zero or more repetitions of `content`.
#[must_use]
pub fn repeat(content: Rule) -> Rule {
    wrap(RuleType::Repeat, content)
}

/// One or more repetitions of `content`.
#[must_use]
pub fn repeat1(content: Rule) -> Rule {
    wrap(RuleType::Repeat1, content)
}

/// `prec(level, content)`.
#[must_use]
pub fn prec(level: i32, content: Rule) -> Rule {
    with_precedence(RuleType::Prec, level, content)
}

/// `prec.left(level, content)`. Tree-sitter's level-less form is level `0`.
#[must_use]
pub fn prec_left(level: i32, content: Rule) -> Rule {
    with_precedence(RuleType::PrecLeft, level, content)
}

/// `prec.right(level, content)`. Tree-sitter's level-less form is level `0`.
#[must_use]
pub fn prec_right(level: i32, content: Rule) -> Rule {
    with_precedence(RuleType::PrecRight, level, content)
}

/// `prec.dynamic(level, content)`.
#[must_use]
pub fn prec_dynamic(level: i32, content: Rule) -> Rule {
    with_precedence(RuleType::PrecDynamic, level, content)
}

/// Labels `content` with the field `name`.
#[must_use]
pub fn field(name: impl Into<String>, content: Rule) -> Rule {
    let mut rule = wrap(RuleType::Field, content);
    rule.name = Some(name.into());
    rule
}

/// Renames the node produced by `content`.
///
/// `named` is `true` for `alias($.x, $.y)` and `false` for `alias($.x, "y")`.
#[must_use]
pub fn alias(content: Rule, name: impl Into<String>, named: bool) -> Rule {
    let mut rule = wrap(RuleType::Alias, content);
    rule.value = Some(RuleValue::String(name.into()));
    rule.named = Some(named);
    rule
}

/// Collapses `content` into a single token.
#[must_use]
pub fn token(content: Rule) -> Rule {
    wrap(RuleType::Token, content)
}

/// A token that may not be preceded by extras.
#[must_use]
pub fn immediate_token(content: Rule) -> Rule {
    wrap(RuleType::ImmediateToken, content)
}

fn wrap(rule_type: RuleType, content: Rule) -> Rule {
    let mut rule = Rule::new(rule_type);
    rule.content = Some(Box::new(content));
    rule
}

fn with_precedence(rule_type: RuleType, level: i32, content: Rule) -> Rule {
    let mut rule = wrap(rule_type, content);
    rule.value = Some(RuleValue::Integer(level));
    rule
}

/// Assembles a [`Grammar`] the way `grammar({...})` does in `grammar.js`.
///
/// ```
/// use verse_sitter::grammar::dsl::{pattern, repeat, sym, GrammarBuilder};
///
/// let grammar = GrammarBuilder::new("words")
///     .rule("source_file", repeat(sym("word")))
///     .rule("word", pattern("[a-z]+"))
///     .build();
///
/// assert_eq!(grammar.rules.len(), 2);
/// assert_eq!(grammar.start_rule(), Some("source_file"));
/// ```
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    grammar: Grammar,
}

impl GrammarBuilder {
    /// Starts an empty grammar called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            grammar: Grammar {
                schema: Some(GRAMMAR_SCHEMA_URL.to_owned()),
                name: name.into(),
                inherits: None,
                rules: HashMap::new(),
                extras: None,
                externals: None,
                inline: None,
                precedences: None,
                conflicts: None,
                reserved: None,
                word: None,
                supertypes: None,
            },
        }
    }

    /// Defines (or redefines) the rule `name`.
    #[must_use]
    pub fn rule(mut self, name: impl Into<String>, rule: Rule) -> Self {
        self.grammar.rules.insert(name.into(), rule);
        self
    }

    /// Declares an external scanner token.
    #[must_use]
    pub fn external(mut self, name: impl Into<String>) -> Self {
        self.grammar
            .externals
            .get_or_insert_with(Vec::new)
            .push(sym(name));
        self
    }

    /// Adds a rule that may appear between any two tokens.
    #[must_use]
    pub fn extra(mut self, rule: Rule) -> Self {
        self.grammar.extras.get_or_insert_with(Vec::new).push(rule);
        self
    }

    /// Marks `name` as the keyword-extraction word rule.
    #[must_use]
    pub fn word(mut self, name: impl Into<String>) -> Self {
        self.grammar.word = Some(name.into());
        self
    }

    /// Marks `name` for inlining.
    #[must_use]
    pub fn inline(mut self, name: impl Into<String>) -> Self {
        self.grammar
            .inline
            .get_or_insert_with(Vec::new)
            .push(name.into());
        self
    }

    /// Declares an expected LR conflict between `names`.
    #[must_use]
    pub fn conflict<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.grammar
            .conflicts
            .get_or_insert_with(Vec::new)
            .push(names.into_iter().map(Into::into).collect());
        self
    }

    /// Declares `name` as a supertype.
    #[must_use]
    pub fn supertype(mut self, name: impl Into<String>) -> Self {
        self.grammar
            .supertypes
            .get_or_insert_with(Vec::new)
            .push(name.into());
        self
    }

    /// Finishes the grammar. Without explicit extras, whitespace (`\s`) is the
    /// only extra, matching tree-sitter's default.
    #[must_use]
    pub fn build(mut self) -> Grammar {
        if self.grammar.extras.is_none() {
            self.grammar.extras = Some(vec![pattern(r"\s")]);
        }
        self.grammar
    }
}
