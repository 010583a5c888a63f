//! # Testing Utilities
//!
//! Grammar fixtures and input generators shared by the crate's tests,
//! benches and fuzz targets.
//!
//! ## Fixtures
//!
//! Each fixture builds a small, well-known grammar:
//!
//! - [`arithmetic_grammar`]: left-recursive sums of integers
//! - [`precedence_grammar`]: `+`, `*` and parentheses via precedence levels
//! - [`word_list_grammar`]: space-separated words with a lexical rule
//!
//! ## Property-Based Testing
//!
//! [`InputGenerator`] produces strings that follow a rule's structure, which
//! make better `proptest` inputs than uniformly random text.

pub mod generators;

pub use generators::*;

use crate::grammar::{Expr, Grammar, GrammarBuilder};

/// `Sum <- add:(Sum '+' Num) / Num` and `Num <- [0-9]+`, labeled `num`.
///
/// # Panics
/// Never; the grammar is fixed and valid.
#[must_use]
pub fn arithmetic_grammar() -> Grammar {
    GrammarBuilder::new()
        .rule(
            "Sum",
            Expr::first([
                Expr::label(
                    "add",
                    Expr::seq([Expr::rule("Sum"), Expr::char('+'), Expr::rule("Num")]),
                ),
                Expr::rule("Num"),
            ]),
        )
        .rule(
            "Num",
            Expr::label("num", Expr::one_or_more(Expr::char_range('0', '9'))),
        )
        .build()
        .unwrap_or_else(|e| panic!("arithmetic fixture failed to compile: {e}"))
}

/// Three precedence levels of `E`:
///
/// ```text
/// E[0] <- add:(E '+' E[1])
/// E[1] <- mul:(E[1] '*' E[2]) / E[2]
/// E[2] <- '(' E ')' / num:[0-9]+
/// ```
///
/// # Panics
/// Never; the grammar is fixed and valid.
#[must_use]
pub fn precedence_grammar() -> Grammar {
    GrammarBuilder::new()
        .rule_with_precedence(
            "E",
            0,
            Expr::label(
                "add",
                Expr::seq([Expr::rule("E"), Expr::char('+'), Expr::rule("E[1]")]),
            ),
        )
        .rule_with_precedence(
            "E",
            1,
            Expr::first([
                Expr::label(
                    "mul",
                    Expr::seq([Expr::rule("E[1]"), Expr::char('*'), Expr::rule("E[2]")]),
                ),
                Expr::rule("E[2]"),
            ]),
        )
        .rule_with_precedence(
            "E",
            2,
            Expr::first([
                Expr::seq([Expr::char('('), Expr::rule("E"), Expr::char(')')]),
                Expr::label("num", Expr::one_or_more(Expr::char_range('0', '9'))),
            ]),
        )
        .build()
        .unwrap_or_else(|e| panic!("precedence fixture failed to compile: {e}"))
}

/// Lowercase words separated by spaces, seeded only at lexeme boundaries.
///
/// ```text
/// Words  <- Word (' '+ Word)*
/// Word   <- word:[a-z]+
/// Lexeme <- Word / ' '+
/// ```
///
/// # Panics
/// Never; the grammar is fixed and valid.
#[must_use]
pub fn word_list_grammar() -> Grammar {
    let spaces = || Expr::one_or_more(Expr::char(' '));
    GrammarBuilder::new()
        .rule(
            "Words",
            Expr::seq([
                Expr::rule("Word"),
                Expr::zero_or_more(Expr::seq([spaces(), Expr::rule("Word")])),
            ]),
        )
        .rule(
            "Word",
            Expr::label("word", Expr::one_or_more(Expr::char_range('a', 'z'))),
        )
        .rule("Lexeme", Expr::first([Expr::rule("Word"), spaces()]))
        .lexical_rule("Lexeme")
        .build()
        .unwrap_or_else(|e| panic!("word list fixture failed to compile: {e}"))
}
