//! # Error Types
//!
//! Error types for grammar compilation and parse queries.
//!
//! ## Overview
//!
//! There are two kinds of failure in this crate:
//!
//! - **Grammar errors** ([`GrammarError`]): raised while compiling a list of
//!   rules into a [`Grammar`](crate::grammar::Grammar). They are fatal; the
//!   grammar has to be fixed and rebuilt.
//! - **Query errors** ([`QueryError`]): raised when a completed parse is
//!   asked about a rule name the grammar does not define.
//!
//! A rule failing to match is *not* an error. Queries report it as `None`
//! or as an empty list, and the memo table stays inspectable.
//!
//! ## Usage
//!
//! ```rust
//! use pika::grammar::{Expr, GrammarBuilder};
//! use pika::error::GrammarError;
//!
//! let result = GrammarBuilder::new()
//!     .rule("A", Expr::rule("Missing"))
//!     .build();
//!
//! assert!(matches!(result, Err(GrammarError::UnknownRule { .. })));
//! ```
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry stable diagnostic codes.

use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors detected while compiling rules into a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Grammar has no rules")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::no_rules)))]
    NoRules,

    #[error("Rule #{index} has an empty name")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unnamed_rule)))]
    UnnamedRule { index: usize },

    #[error("Duplicate rule name: {name}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::duplicate_rule),
            help("rules sharing a name must each carry a distinct precedence level")
        )
    )]
    DuplicateRule { name: CompactString },

    #[error("Unknown rule name {name:?} referenced from rule {referenced_from}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_rule)))]
    UnknownRule {
        name: CompactString,
        referenced_from: CompactString,
    },

    #[error("Rule {name} consists only of a reference to itself")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::self_reference)))]
    SelfReference { name: CompactString },

    #[error("Cycle in rule aliases: {}", chain.join(" -> "))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::alias_cycle)))]
    AliasCycle { chain: Vec<CompactString> },

    #[error("Lexical rule {rule} is not defined")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unknown_lexical_rule)))]
    UnknownLexicalRule { rule: CompactString },

    #[error("Lexical rule {rule} contains a cycle through clause {clause}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::lexical_cycle),
            help("the lexical rule must be matchable without recursion")
        )
    )]
    LexicalCycle {
        rule: CompactString,
        clause: CompactString,
    },

    #[error(
        "Alternative {index} of {clause} always matches, so the alternatives after it can never match"
    )]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::shadowed_alternative),
            help("move the always-matching alternative to the end of the ordered choice")
        )
    )]
    ShadowedAlternative { clause: CompactString, index: usize },

    #[error("Negative lookahead {clause} is part of the cycle it looks ahead into")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::lookahead_cycle),
            help("a negative lookahead may read a recursive rule, but that rule must not lead back to the lookahead")
        )
    )]
    LookaheadCycle { clause: CompactString },
}

impl GrammarError {
    /// Name of the rule the error is about, when there is one.
    #[must_use]
    pub fn rule_name(&self) -> Option<&str> {
        match self {
            Self::DuplicateRule { name } | Self::SelfReference { name } => Some(name),
            Self::UnknownRule {
                referenced_from, ..
            } => Some(referenced_from),
            Self::UnknownLexicalRule { rule } | Self::LexicalCycle { rule, .. } => Some(rule),
            Self::AliasCycle { chain } => chain.first().map(CompactString::as_str),
            Self::NoRules
            | Self::UnnamedRule { .. }
            | Self::ShadowedAlternative { .. }
            | Self::LookaheadCycle { .. } => None,
        }
    }
}

/// Errors returned by name-based queries on a completed parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum QueryError {
    #[error("Grammar has no rule named {name}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(query::unknown_rule)))]
    UnknownRule { name: CompactString },
}
