//! # Grammar Module
//!
//! Grammar definition and compilation.
//!
//! ## Overview
//!
//! A grammar is written as a list of named rules whose right-hand sides are
//! [`Expr`] trees. Rules refer to each other by name with [`Expr::rule`].
//! [`GrammarBuilder::build`] compiles the rules into a [`Grammar`]: an arena
//! of shared, interned [`Clause`]s with every rule reference resolved and
//! the per-clause metadata the parser needs already computed.
//!
//! Compilation runs these passes in order:
//!
//! 1. **Precedence rewriting**: rules sharing a name at several precedence
//!    levels become one level rule each plus selector rules, and
//!    self-references are redirected to the next-higher levels.
//! 2. **Name check**: rule names must now be unique.
//! 3. **Interning**: clauses with the same canonical form are coalesced.
//! 4. **Reference resolution**: rule references (and alias chains) are
//!    replaced with direct clause ids.
//! 5. **Lexical check**: the lexical rule, if any, must be acyclic.
//! 6. **Analysis**: clauses are ordered bottom-up, then the
//!    always-matches flags and seed parents are computed.
//!
//! ## Usage
//!
//! ```rust
//! use pika::grammar::{Expr, GrammarBuilder};
//!
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "Sum",
//!         Expr::first([
//!             Expr::seq([Expr::rule("Sum"), Expr::char('+'), Expr::rule("Num")]),
//!             Expr::rule("Num"),
//!         ]),
//!     )
//!     .rule("Num", Expr::one_or_more(Expr::char_range('0', '9')))
//!     .build()?;
//!
//! assert_eq!(grammar.rule("Num").unwrap().to_string(), "Num <- [0-9]+");
//! # Ok::<(), pika::error::GrammarError>(())
//! ```

mod analysis;
pub mod builder;
pub mod expr;
mod intern;
mod precedence;
mod resolve;

pub use builder::*;
pub use expr::*;

use crate::clause::{Clause, ClauseId, ClauseKind};
use compact_str::CompactString;
use hashbrown::HashMap;
use lasso::RodeoReader;
use std::fmt;

/// A rule as written by the grammar author, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: CompactString,
    /// Precedence level; rules sharing a name must each have a distinct one
    pub precedence: Option<i32>,
    pub expr: Expr,
}

impl RuleDef {
    #[must_use]
    pub fn new(name: impl Into<CompactString>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            precedence: None,
            expr,
        }
    }

    #[must_use]
    pub fn with_precedence(name: impl Into<CompactString>, precedence: i32, expr: Expr) -> Self {
        Self {
            name: name.into(),
            precedence: Some(precedence),
            expr,
        }
    }
}

/// A named rule of a compiled grammar.
#[derive(Debug, Clone)]
pub struct Rule {
    pub(crate) name: CompactString,
    pub(crate) precedence: Option<i32>,
    pub(crate) clause: ClauseId,
    pub(crate) ast_label: Option<CompactString>,
    pub(crate) definition: String,
}

impl Rule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Precedence level, for rules produced from a precedence group
    #[must_use]
    pub const fn precedence(&self) -> Option<i32> {
        self.precedence
    }

    /// The clause this rule names
    #[must_use]
    pub const fn clause(&self) -> ClauseId {
        self.clause
    }

    #[must_use]
    pub fn ast_label(&self) -> Option<&str> {
        self.ast_label.as_deref()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- {}", self.name, self.definition)
    }
}

/// A compiled grammar.
///
/// The clause arena is stored in bottom-up order: every clause comes after
/// all of its children, except along the back edges of a recursive cycle.
/// A `Grammar` is immutable and can be shared by any number of concurrent
/// parses.
#[derive(Debug)]
pub struct Grammar {
    clauses: Vec<Clause>,
    rules: Vec<Rule>,
    rule_index: HashMap<CompactString, usize, ahash::RandomState>,
    /// Clauses tried at every seeding position
    seed_clauses: Vec<ClauseId>,
    lexical_rule: Option<usize>,
    canonical: RodeoReader,
}

impl Grammar {
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rule_index.get(name).map(|&i| &self.rules[i])
    }

    /// The rule the lexical pre-pass runs, if one was designated
    #[must_use]
    pub fn lexical_rule(&self) -> Option<&Rule> {
        self.lexical_rule.map(|i| &self.rules[i])
    }

    #[inline]
    #[must_use]
    pub fn clause(&self, id: ClauseId) -> &Clause {
        &self.clauses[id.index()]
    }

    /// Every reachable clause, children before parents
    #[must_use]
    pub fn clauses_bottom_up(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// The canonical textual form of a clause
    #[must_use]
    pub fn canonical_form(&self, id: ClauseId) -> &str {
        self.canonical.resolve(&self.clauses[id.index()].canonical)
    }

    /// Find the clause with the given canonical form
    #[must_use]
    pub fn clause_by_form(&self, form: &str) -> Option<ClauseId> {
        let spur = self.canonical.get(form)?;
        self.clauses
            .iter()
            .position(|c| c.canonical == spur)
            .map(ClauseId::new)
    }

    pub(crate) fn seed_clauses(&self) -> &[ClauseId] {
        &self.seed_clauses
    }

    pub(crate) fn from_parts(
        clauses: Vec<Clause>,
        rules: Vec<Rule>,
        lexical_rule: Option<usize>,
        canonical: RodeoReader,
    ) -> Self {
        let rule_index = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name.clone(), i))
            .collect();

        // Nothing matches everywhere and needs no seeding; its parents are
        // covered by the always-matches flag instead.
        let seed_clauses = clauses
            .iter()
            .enumerate()
            .filter(|(_, c)| match c.kind() {
                ClauseKind::Nothing => false,
                ClauseKind::NotFollowedBy(_) => true,
                kind => kind.is_terminal(),
            })
            .filter(|(_, c)| !c.seed_parents().is_empty())
            .map(|(i, _)| ClauseId::new(i))
            .collect();

        Self {
            clauses,
            rules,
            rule_index,
            seed_clauses,
            lexical_rule,
            canonical,
        }
    }
}
