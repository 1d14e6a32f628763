//! The Verse grammar.
//!
//! Verse is the language of Epic Games' UEFN. Everything in Verse is an
//! expression, and blocks can be opened by braces, by an indented body after
//! `:`, or by a bare indent. Layout-sensitive tokens (automatic terminators,
//! block open/close, indent/dedent) come from an external scanner; this module
//! only declares them.

use crate::grammar::dsl::{
    alias, choice, field, immediate_token, optional, pattern, prec_left, prec_right, repeat,
    repeat1, seq, string, sym, token, GrammarBuilder,
};
use crate::grammar::{Grammar, Rule};

/// Name of the grammar, as used by providers and in the `name` field.
pub const NAME: &str = "verse";

/// Human-readable label used in check reports.
pub const LABEL: &str = "Verse";

/// Tokens produced by the external scanner, in declaration order.
pub const EXTERNALS: [&str; 10] = [
    "_auto_terminator",
    "_open_braced_block",
    "_open_indent_block",
    "_open_indent_block_colon",
    "_close_indent_block",
    "_indent",
    "_dedent",
    "_incomplete_string",
    "_best_guess_attr_start",
    "_error_sentinel",
];

/// Operator precedence levels. Higher binds tighter.
pub mod prec {
    /// `lhs => rhs`
    pub const FAT_ARROW: i32 = 10;
    /// Postfix `x?`
    pub const QUERY: i32 = 9;
    /// Prefix `?x`
    pub const OPT: i32 = 9;
    /// `not x`
    pub const NOT: i32 = 8;
    /// Prefix `+x` and `-x`
    pub const SIGN: i32 = 8;
    /// `*` and `/`
    pub const MULT: i32 = 7;
    /// `+` and `-`
    pub const ADD: i32 = 6;
    /// `=` and `<>`
    pub const EQ: i32 = 4;
    /// `<`, `>`, `<=`, `>=`
    pub const CMP: i32 = 4;
    /// `and`
    pub const AND: i32 = 3;
    /// `or`
    pub const OR: i32 = 2;
    /// Declarations, `set`, named arguments
    pub const DECL: i32 = 1;
}

const ANYLINE_WHITESPACE: &str = r"\s*";

const BINARY_OPERATORS: [(&str, i32); 12] = [
    ("*", prec::MULT),
    ("/", prec::MULT),
    ("+", prec::ADD),
    ("-", prec::ADD),
    ("=", prec::EQ),
    ("<>", prec::EQ),
    ("<", prec::CMP),
    (">", prec::CMP),
    ("<=", prec::CMP),
    (">=", prec::CMP),
    ("and", prec::AND),
    ("or", prec::OR),
];

const PREFIX_OPERATORS: [(&str, i32); 5] = [
    ("?", prec::OPT),
    ("not", prec::NOT),
    ("+", prec::SIGN),
    ("-", prec::SIGN),
    ("set", prec::DECL),
];

const SUFFIX_OPERATORS: [(&str, i32); 1] = [("?", prec::QUERY)];

/// Builds the Verse grammar tables.
#[must_use]
pub fn grammar() -> Grammar {
    let builder = EXTERNALS
        .iter()
        .fold(GrammarBuilder::new(NAME), |builder, name| builder.external(*name));
    let builder = expressions(builder);
    let builder = literals(builder);
    let builder = declarations(builder);
    let builder = blocks(builder);
    operators(builder).build()
}

/// Top-level structure and expression kinds.
fn expressions(builder: GrammarBuilder) -> GrammarBuilder {
    builder
        .rule("source_file", repeat(sym("_complete_expr")))
        .rule(
            "_complete_expr",
            seq([
                sym("_expr"),
                choice([string(";"), sym("_auto_terminator")]),
            ]),
        )
        .rule(
            "_expr",
            prec_left(0, choice([sym("_stdexpr"), sym("_non_attributable_expr")])),
        )
        // parentheses stay transparent so `(((x))<internal>)` still yields a workable tree
        .rule(
            "_stdexpr",
            prec_right(
                0,
                seq([
                    choice([
                        seq([
                            string("("),
                            pattern(ANYLINE_WHITESPACE),
                            sym("_expr"),
                            pattern(r"\s*[)]"),
                        ]),
                        sym("_standalone_expr"),
                    ]),
                    optional(sym("attributes")),
                ]),
            ),
        )
        // `if. (0 < 1 > 0)` reads as `0<1>` followed by a stray `0`
        .rule(
            "attributes",
            prec_right(
                0,
                seq([
                    sym("_best_guess_attr_start"),
                    repeat1(prec_left(
                        prec::CMP,
                        seq([string("<"), sym("_expr"), string(">")]),
                    )),
                ]),
            ),
        )
        .rule(
            "comma_separated_group",
            prec_right(
                0,
                seq([
                    sym("_expr"),
                    repeat1(prec_left(0, seq([string(","), sym("_expr")]))),
                    optional(string(",")),
                ]),
            ),
        )
        .rule(
            "_standalone_expr",
            choice(
                [
                    "identifier",
                    "path_literal",
                    "logic_literal",
                    "integer",
                    "float",
                    "string",
                    "char",
                    "macro_call",
                    "function_call",
                ]
                .map(sym),
            ),
        )
        .rule(
            "_non_attributable_expr",
            choice(
                [
                    "declaration",
                    "function_declaration",
                    "unary_expression",
                    "binary_expression",
                    "fat_arrow_expression",
                    "comma_separated_group",
                ]
                .map(sym),
            ),
        )
}

/// Identifiers, paths, logic values, numbers, strings and chars.
fn literals(builder: GrammarBuilder) -> GrammarBuilder {
    builder
        .rule("identifier", pattern("[A-Za-z_][A-Za-z0-9_]*"))
        .rule(
            "path_literal",
            pattern(r"[/][A-Za-z0-9_][A-Za-z0-9_\-.]*(\/[A-Za-z0-9_][A-Za-z0-9_\-.]*)*"),
        )
        .rule("logic_literal", choice([string("true"), string("false")]))
        .rule(
            "integer",
            choice([
                pattern("0x[0-9A-Fa-f]+"),
                seq([pattern("[0-9]+"), optional(sym("number_suffix"))]),
            ]),
        )
        .rule("float", float())
        .rule(
            "number_suffix",
            immediate_token(pattern("[A-Za-z_][A-Za-z0-9_]*")),
        )
        .rule(
            "string",
            seq([
                string("\""),
                repeat(choice([sym("string_fragment"), sym("string_template")])),
                choice([string("\""), sym("_incomplete_string")]),
            ]),
        )
        .rule(
            "string_fragment",
            prec_right(0, repeat1(choice([pattern(r#"[^"{]"#), string(r"\{")]))),
        )
        .rule(
            "string_template",
            seq([pattern(r"[{]\s*"), sym("_expr"), pattern(r"\s*[}]")]),
        )
        .rule("char", pattern(r"'[^\']*'"))
}

/// Declarations, calls and argument lists.
fn declarations(builder: GrammarBuilder) -> GrammarBuilder {
    builder
        .rule("declaration", declaration())
        .rule(
            "function_call",
            prec_left(
                0,
                seq([
                    field("function", sym("_stdexpr")),
                    field("arguments", sym("argument_list")),
                ]),
            ),
        )
        .rule("function_declaration", function_declaration())
        .rule(
            "argument_list",
            choice([sym("_argument_list_paren"), sym("_argument_list_square")]),
        )
        .rule("_argument_list_paren", argument_list("(", ")"))
        .rule("_argument_list_square", argument_list("[", "]"))
}

/// Macro calls, blocks and named arguments.
fn blocks(builder: GrammarBuilder) -> GrammarBuilder {
    builder
        .rule(
            "macro_call",
            prec_left(
                1,
                seq([
                    field("macro", sym("_stdexpr")),
                    optional(field("arguments", sym("argument_list"))),
                    alias(sym("macro_block"), "block", true),
                ]),
            ),
        )
        .rule(
            "macro_block",
            prec_right(0, block_body("_open_indent_block_colon")),
        )
        .rule(
            "_inline_body",
            prec_left(10, choice([sym("block"), sym("_expr")])),
        )
        .rule("block", block_body("_open_indent_block"))
        .rule(
            "named_argument",
            prec_left(
                prec::DECL,
                seq([
                    string("?"),
                    field("name", sym("identifier")),
                    string(":="),
                    sym("_expr"),
                ]),
            ),
        )
}

/// Binary, unary and fat-arrow expressions.
fn operators(builder: GrammarBuilder) -> GrammarBuilder {
    builder
        .rule(
            "binary_expression",
            choice(BINARY_OPERATORS.map(|(op, level)| {
                prec_left(
                    level,
                    seq([
                        field("lhs", sym("_expr")),
                        field("operator", string(op)),
                        field("rhs", sym("_expr")),
                    ]),
                )
            })),
        )
        .rule(
            "fat_arrow_expression",
            prec_left(
                prec::FAT_ARROW,
                seq([
                    field("lhs", sym("_expr")),
                    string("=>"),
                    field("rhs", sym("_inline_body")),
                ]),
            ),
        )
        .rule("unary_expression", unary_expression())
}

fn float() -> Rule {
    let digits = || pattern("[0-9]+");
    let exponent = || seq([pattern(r"[eE][\+-]?"), digits()]);

    seq([
        token(choice([
            seq([digits(), string("."), digits(), optional(exponent())]),
            seq([digits(), exponent()]),
        ])),
        optional(sym("number_suffix")),
    ])
}

fn declaration() -> Rule {
    prec_left(
        0,
        seq([
            field("lhs", sym("_stdexpr")),
            choice([
                seq([
                    seq([string(":"), field("type_hint", sym("_expr"))]),
                    seq([string("="), field("rhs", sym("_inline_body"))]),
                ]),
                seq([string(":"), field("rhs", sym("_expr"))]),
                seq([string(":="), field("rhs", sym("_inline_body"))]),
            ]),
        ]),
    )
}

fn function_declaration() -> Rule {
    prec_left(
        1,
        seq([
            field("name", sym("_stdexpr")),
            field("parameters", sym("_argument_list_paren")),
            optional(field("effects", sym("attributes"))),
            string(":"),
            field("ret_type", sym("_expr")),
            optional(seq([
                choice([string("="), string(":=")]),
                sym("_inline_body"),
            ])),
        ]),
    )
}

/// A braced block or an indented block opened by `indent_opener`.
fn block_body(indent_opener: &str) -> Rule {
    choice([
        seq([
            sym("_open_braced_block"),
            repeat(sym("_complete_expr")),
            pattern(r"\s*[}]"),
        ]),
        seq([
            sym(indent_opener),
            repeat(seq([sym("_indent"), sym("_complete_expr"), sym("_dedent")])),
            sym("_close_indent_block"),
        ]),
    ])
}

/// `start item (, item)* ,? end`, where items are expressions or named arguments.
fn argument_list(start: &str, end: &str) -> Rule {
    let item = || choice([sym("_expr"), sym("named_argument")]);

    seq([
        string(start),
        optional(separated1(string(","), item, Some(optional(string(","))))),
        string(end),
    ])
}

fn separated1(separator: Rule, item: impl Fn() -> Rule, trail: Option<Rule>) -> Rule {
    let mut members = vec![item(), repeat(prec_left(1, seq([separator, item()])))];
    members.extend(trail);
    seq(members)
}

fn unary_expression() -> Rule {
    let prefix = PREFIX_OPERATORS.map(|(op, level)| {
        prec_left(
            level,
            seq([
                field("operator", string(op)),
                field("operand", sym("_expr")),
            ]),
        )
    });
    let suffix = SUFFIX_OPERATORS.map(|(op, level)| {
        prec_left(
            level,
            seq([
                field("operand", sym("_expr")),
                field("operator", string(op)),
            ]),
        )
    });

    choice(prefix.into_iter().chain(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{RuleType, RuleValue};
    use crate::validate::validate;

    #[test]
    fn test_verse_grammar_is_valid() {
        let grammar = grammar();
        assert_eq!(grammar.name, NAME);
        assert!(validate(&grammar).is_ok());
    }

    #[test]
    fn test_start_rule_is_source_file() {
        assert_eq!(grammar().start_rule(), Some("source_file"));
    }

    #[test]
    fn test_externals_in_declaration_order() {
        assert_eq!(grammar().external_names(), EXTERNALS.to_vec());
    }

    #[test]
    fn test_binary_expression_precedence_table() {
        let grammar = grammar();
        let binary = grammar.rule("binary_expression").unwrap();
        assert_eq!(binary.rule_type, RuleType::Choice);

        let levels: Vec<_> = binary.members.iter().map(|m| m.precedence()).collect();
        assert_eq!(levels.len(), 12);
        assert_eq!(levels.first(), Some(&Some(prec::MULT)));
        assert_eq!(levels.last(), Some(&Some(prec::OR)));
        assert!(binary
            .members
            .iter()
            .all(|m| m.rule_type == RuleType::PrecLeft));
    }

    #[test]
    fn test_unary_expression_has_prefix_and_suffix_forms() {
        let grammar = grammar();
        let unary = grammar.rule("unary_expression").unwrap();
        assert_eq!(unary.members.len(), 6);

        // the last alternative is the postfix query, operand first
        let query = unary.members.last().unwrap();
        assert_eq!(query.precedence(), Some(prec::QUERY));
        let body = query.children().next().unwrap();
        assert_eq!(body.members[0].field_name(), Some("operand"));
        assert_eq!(body.members[1].field_name(), Some("operator"));
    }

    #[test]
    fn test_macro_call_aliases_its_block() {
        let grammar = grammar();
        let macro_call = grammar.rule("macro_call").unwrap();
        let body = macro_call.children().next().unwrap();
        let aliased = body.members.last().unwrap();
        assert_eq!(aliased.rule_type, RuleType::Alias);
        assert_eq!(aliased.value, Some(RuleValue::String("block".into())));
    }

    #[test]
    fn test_hidden_rules_are_present() {
        let grammar = grammar();
        for name in [
            "_complete_expr",
            "_expr",
            "_stdexpr",
            "_standalone_expr",
            "_non_attributable_expr",
            "_inline_body",
            "_argument_list_paren",
            "_argument_list_square",
        ] {
            assert!(grammar.rule(name).is_some(), "missing rule {name}");
        }
    }
}
