//! # Parser Module
//!
//! The bottom-up matching engine.
//!
//! ## Overview
//!
//! [`Parser`] runs a compiled [`Grammar`] over an input string and returns
//! the populated [`MemoTable`]. Matching is bottom-up: terminals are matched
//! first, and each match triggers its parent clauses at the same position,
//! round after round, until no memo entry can improve. Left-recursive rules
//! need no special treatment.
//!
//! A parse never fails. Whether a rule matched, and where, is answered by
//! the memo table's queries.
//!
//! ## Usage
//!
//! ```rust
//! use pika::grammar::{Expr, GrammarBuilder};
//! use pika::parser::Parser;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("Digits", Expr::one_or_more(Expr::char_range('0', '9')))
//!     .build()?;
//!
//! let table = Parser::new(&grammar).parse("123abc");
//! let matches = table.non_overlapping_matches("Digits")?;
//! assert_eq!(matches.len(), 1);
//! assert_eq!(table.match_text(&matches[0]), "123");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod engine;
pub(crate) mod matcher;
mod parallel;

pub use config::{ParseConfig, ParseMetrics};

use crate::grammar::Grammar;
use crate::memo::MemoTable;

/// Runs a grammar over input strings.
#[derive(Debug, Clone)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    config: ParseConfig,
}

impl<'g> Parser<'g> {
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            config: ParseConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_config(grammar: &'g Grammar, config: ParseConfig) -> Self {
        Self { grammar, config }
    }

    #[must_use]
    pub const fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[must_use]
    pub const fn config(&self) -> &ParseConfig {
        &self.config
    }

    /// Match the whole input and return the memo table.
    #[must_use]
    pub fn parse(&self, input: &str) -> MemoTable<'g> {
        engine::run(self.grammar, input, &self.config)
    }
}

/// Parse `input` with the default configuration.
#[must_use]
pub fn parse<'g>(grammar: &'g Grammar, input: &str) -> MemoTable<'g> {
    Parser::new(grammar).parse(input)
}
