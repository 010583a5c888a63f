//! # Pika
//!
//! A bottom-up, memoizing PEG parser that handles left recursion and
//! operator precedence directly.
//!
//! ## Overview
//!
//! Pika parsing runs a PEG grammar "backwards": terminals are matched first,
//! at every position, and each successful match triggers the clauses that
//! contain it. The memo table fills up bottom-up until it reaches a fixed
//! point. Because no clause ever calls into itself, left-recursive rules
//! work as written, and every position of the input ends up with the best
//! match of every clause that could start there. That makes partial parses
//! and syntax error spans a query rather than a recovery strategy.
//!
//! The crate is split into:
//!
//! - [`grammar`]: building rules and compiling them into a [`Grammar`]
//! - [`clause`]: the compiled clause graph
//! - [`parser`]: the matching engine
//! - [`memo`]: the memo table a parse produces, and queries over it
//! - [`ast`]: labeled syntax trees extracted from matches
//!
//! ## Quick Start
//!
//! ```rust
//! use pika::{Expr, GrammarBuilder, parse};
//!
//! // Left recursion needs no rewriting
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "Sum",
//!         Expr::first([
//!             Expr::label("add", Expr::seq([Expr::rule("Sum"), Expr::char('+'), Expr::rule("Num")])),
//!             Expr::rule("Num"),
//!         ]),
//!     )
//!     .rule("Num", Expr::label("num", Expr::one_or_more(Expr::char_range('0', '9'))))
//!     .build()?;
//!
//! let table = parse(&grammar, "1+2+3");
//! let sums = table.non_overlapping_matches("Sum")?;
//! assert_eq!(sums.len(), 1);
//! assert_eq!(table.match_text(&sums[0]), "1+2+3");
//!
//! let ast = table.to_ast(&sums[0], "sum");
//! assert_eq!(ast.to_string(), "(sum (add (add (num 1) (num 2)) (num 3)))");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` (default): evaluate large rounds on the rayon thread pool
//! - `diagnostics`: `miette` diagnostics for grammar errors
//! - `serialize`: `serde` derives for keys, spans and AST nodes

pub mod ast;
pub mod clause;
pub mod error;
pub mod grammar;
pub mod memo;
pub mod parser;
pub mod testing;

pub use ast::{AstNode, Span};
pub use clause::{CharSet, ClauseId};
pub use error::{GrammarError, QueryError};
pub use grammar::{Expr, Grammar, GrammarBuilder, Rule, RuleDef};
pub use memo::{Match, MemoKey, MemoTable};
pub use parser::{ParseConfig, ParseMetrics, Parser, parse};
