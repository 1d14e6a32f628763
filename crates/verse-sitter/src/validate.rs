//! Validation routines for Tree-sitter grammars.
//!
//! This module performs structural checks over parsed [`Grammar`](crate::grammar::Grammar)
//! definitions before a [`Language`](crate::Language) handle is issued for them:
//! symbol references must resolve, metadata must name real rules, and
//! unreachable rules, left recursion and mixed precedence are reported through
//! `tracing`.

use crate::grammar::{collect_symbols, Grammar, Rule, RuleType};
use std::collections::{HashMap, HashSet};

/// Represents a validation failure encountered when checking a grammar.
///
/// Validation errors indicate issues such as undefined symbols or metadata
/// that points at rules the grammar doesn't define.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The grammar has an empty `name`.
    #[error("grammar has no name")]
    MissingName,

    /// The grammar defines no rules at all.
    #[error("grammar has no rules")]
    NoRules,

    /// A `SYMBOL` names neither a rule nor an external token.
    #[error("undefined symbol '{symbol}' referenced in rule '{rule}'")]
    UndefinedSymbol {
        /// The unresolved symbol.
        symbol: String,
        /// The rule whose body contains the reference.
        rule: String,
    },

    /// A grammar-level declaration (`word`, `inline`, ...) names an unknown rule.
    #[error("{section} refers to undefined rule '{symbol}'")]
    UndefinedDeclaration {
        /// The unresolved rule name.
        symbol: String,
        /// Which declaration it appeared in.
        section: &'static str,
    },
}

/// Performs semantic validation of a parsed [`Grammar`](crate::grammar::Grammar).
///
/// This function runs several consistency passes over the grammar:
///
/// - Checks that the grammar is named and has rules.
/// - Checks that all referenced symbols are defined, as rules or externals.
/// - Checks that `word`, `inline`, `supertypes` and `conflicts` name defined rules.
/// - Warns about unreachable rules.
/// - Reports immediate left recursion and mixed precedence levels.
///
/// # Errors
///
/// Returns a [`ValidationError`] if any structural rule violation is detected.
pub fn validate(grammar: &Grammar) -> Result<(), ValidationError> {
    if grammar.name.trim().is_empty() {
        return Err(ValidationError::MissingName);
    }
    if grammar.rules.is_empty() {
        return Err(ValidationError::NoRules);
    }

    check_undefined_symbols(grammar)?;
    check_declarations(grammar)?;
    check_unreachable_rules(grammar);
    check_left_recursion(grammar);
    check_precedence(grammar);

    Ok(())
}

fn check_undefined_symbols(grammar: &Grammar) -> Result<(), ValidationError> {
    let mut defined: HashSet<&str> = grammar.rules.keys().map(String::as_str).collect();
    defined.extend(grammar.external_names());

    // sorted so the reported error doesn't depend on map order
    let mut names: Vec<&String> = grammar.rules.keys().collect();
    names.sort_unstable();

    for rule_name in names {
        check_rule_symbols(&grammar.rules[rule_name], &defined, rule_name)?;
    }

    for extra in grammar.extras.iter().flatten() {
        check_rule_symbols(extra, &defined, "extras")?;
    }

    Ok(())
}

fn check_rule_symbols(
    rule: &Rule,
    defined: &HashSet<&str>,
    context: &str,
) -> Result<(), ValidationError> {
    if let Some(name) = rule.symbol_name() {
        if !defined.contains(name) {
            return Err(ValidationError::UndefinedSymbol {
                symbol: name.to_owned(),
                rule: context.to_owned(),
            });
        }
    }

    for child in rule.children() {
        check_rule_symbols(child, defined, context)?;
    }

    Ok(())
}

fn check_declarations(grammar: &Grammar) -> Result<(), ValidationError> {
    let require = |symbol: &str, section: &'static str| {
        if grammar.rules.contains_key(symbol) {
            Ok(())
        } else {
            Err(ValidationError::UndefinedDeclaration {
                symbol: symbol.to_owned(),
                section,
            })
        }
    };

    if let Some(word) = &grammar.word {
        require(word, "word")?;
    }
    for name in grammar.inline.iter().flatten() {
        require(name, "inline")?;
    }
    for name in grammar.supertypes.iter().flatten() {
        require(name, "supertypes")?;
    }
    for name in grammar.conflicts.iter().flatten().flatten() {
        require(name, "conflicts")?;
    }

    Ok(())
}

fn check_unreachable_rules(grammar: &Grammar) {
    let roots = grammar.start_rules();
    match roots.as_slice() {
        [] => {
            tracing::warn!(grammar = %grammar.name, "no entry point: every visible rule is referenced");
            return;
        }
        [_] => {}
        _ => {
            tracing::warn!(grammar = %grammar.name, ?roots, "ambiguous entry point");
        }
    }

    let mut to_visit: Vec<&str> = roots;
    for extra in grammar.extras.iter().flatten() {
        collect_symbols(extra, &mut |symbol| to_visit.push(symbol));
    }
    to_visit.extend(grammar.word.as_deref());

    let mut reachable = HashSet::new();
    while let Some(rule_name) = to_visit.pop() {
        if !reachable.insert(rule_name) {
            continue;
        }
        if let Some(rule) = grammar.rules.get(rule_name) {
            collect_symbols(rule, &mut |symbol| to_visit.push(symbol));
        }
    }

    for rule_name in grammar.rules.keys() {
        let inlined = grammar
            .inline
            .as_ref()
            .is_some_and(|v| v.contains(rule_name));

        if !reachable.contains(rule_name.as_str()) && !inlined {
            tracing::warn!(grammar = %grammar.name, rule = %rule_name, "unreachable rule");
        }
    }
}

fn check_left_recursion(grammar: &Grammar) {
    for (rule_name, rule) in &grammar.rules {
        if has_immediate_left_recursion(rule, rule_name) {
            tracing::debug!(grammar = %grammar.name, rule = %rule_name, "rule is left-recursive");
        }
    }
}

/// Whether `rule` can begin with a reference to `target` without consuming input first.
fn has_immediate_left_recursion(rule: &Rule, target: &str) -> bool {
    match rule.rule_type {
        RuleType::Symbol => rule.name.as_deref() == Some(target),

        RuleType::Seq => rule
            .members
            .first()
            .is_some_and(|first| has_immediate_left_recursion(first, target)),

        RuleType::Choice => rule
            .members
            .iter()
            .any(|member| has_immediate_left_recursion(member, target)),

        RuleType::Prec
        | RuleType::PrecLeft
        | RuleType::PrecRight
        | RuleType::PrecDynamic
        | RuleType::Field
        | RuleType::Alias
        | RuleType::Repeat
        | RuleType::Repeat1 => rule
            .content
            .as_deref()
            .is_some_and(|content| has_immediate_left_recursion(content, target)),

        RuleType::Blank
        | RuleType::String
        | RuleType::Pattern
        | RuleType::Token
        | RuleType::ImmediateToken
        | RuleType::Reserved => false,
    }
}

fn check_precedence(grammar: &Grammar) {
    let mut prec_levels: HashMap<&str, Vec<i32>> = HashMap::new();

    for (rule_name, rule) in &grammar.rules {
        collect_precedence_levels(rule, &mut prec_levels, rule_name);
    }

    for (rule, levels) in &mut prec_levels {
        levels.sort_unstable();
        levels.dedup();
        if levels.len() > 1 {
            tracing::debug!(grammar = %grammar.name, %rule, ?levels, "rule mixes precedence levels");
        }
    }
}

fn collect_precedence_levels<'a>(
    rule: &Rule,
    levels: &mut HashMap<&'a str, Vec<i32>>,
    context: &'a str,
) {
    if let Some(p) = rule.precedence() {
        levels.entry(context).or_default().push(p);
    }
    for child in rule.children() {
        collect_precedence_levels(child, levels, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::dsl::{choice, pattern, prec_left, seq, string, sym, GrammarBuilder};
    use crate::grammar::parse_grammar;

    fn expressions() -> GrammarBuilder {
        GrammarBuilder::new("expr")
            .rule("source_file", sym("expression"))
            .rule("expression", choice([sym("number"), sym("sum")]))
            .rule(
                "sum",
                prec_left(
                    1,
                    seq([sym("expression"), string("+"), sym("expression")]),
                ),
            )
            .rule("number", pattern("[0-9]+"))
    }

    #[test]
    fn test_valid_grammar_passes() {
        assert_eq!(validate(&expressions().build()), Ok(()));
    }

    #[test]
    fn test_undefined_symbol_is_rejected() {
        let grammar = expressions().rule("number", sym("digits")).build();
        assert_eq!(
            validate(&grammar),
            Err(ValidationError::UndefinedSymbol {
                symbol: "digits".into(),
                rule: "number".into(),
            })
        );
    }

    #[test]
    fn test_external_symbols_count_as_defined() {
        let grammar = expressions()
            .rule("source_file", seq([sym("expression"), sym("_terminator")]))
            .external("_terminator")
            .build();
        assert_eq!(validate(&grammar), Ok(()));
    }

    #[test]
    fn test_symbols_in_extras_must_resolve() {
        let grammar = expressions().extra(sym("comment")).build();
        assert!(matches!(
            validate(&grammar),
            Err(ValidationError::UndefinedSymbol { rule, .. }) if rule == "extras"
        ));
    }

    #[test]
    fn test_declarations_must_name_rules() {
        let word = expressions().word("identifier").build();
        assert_eq!(
            validate(&word),
            Err(ValidationError::UndefinedDeclaration {
                symbol: "identifier".into(),
                section: "word",
            })
        );

        let conflict = expressions().conflict(["sum", "product"]).build();
        assert!(matches!(
            validate(&conflict),
            Err(ValidationError::UndefinedDeclaration { section: "conflicts", .. })
        ));

        let fine = expressions()
            .inline("expression")
            .supertype("expression")
            .word("number")
            .build();
        assert_eq!(validate(&fine), Ok(()));
    }

    #[test]
    fn test_empty_grammars_are_rejected() {
        let no_rules = parse_grammar(r#"{"name": "empty", "rules": {}}"#).unwrap();
        assert_eq!(validate(&no_rules), Err(ValidationError::NoRules));

        let no_name = parse_grammar(r#"{"name": " ", "rules": {"a": {"type": "BLANK"}}}"#)
            .unwrap();
        assert_eq!(validate(&no_name), Err(ValidationError::MissingName));
    }

    #[test]
    fn test_left_recursion_detection() {
        let grammar = expressions().build();
        assert!(has_immediate_left_recursion(
            grammar.rule("sum").unwrap(),
            "expression"
        ));
        assert!(!has_immediate_left_recursion(
            grammar.rule("sum").unwrap(),
            "number"
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = ValidationError::UndefinedSymbol {
            symbol: "x".into(),
            rule: "y".into(),
        };
        assert_eq!(err.to_string(), "undefined symbol 'x' referenced in rule 'y'");
    }
}
