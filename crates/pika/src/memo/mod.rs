//! # Memo Table
//!
//! The result of a parse: the best match found for every (clause, position)
//! pair the parser evaluated.
//!
//! ## Overview
//!
//! Entries are created on demand, the first time a clause is evaluated at a
//! position or read there by a parent. Terminals and negative lookaheads are
//! never stored; lookups match them directly against the input. A memoized
//! clause that can match the empty string everywhere and has no stored match
//! at a position reads as a zero-length match there.
//!
//! Positions and lengths are counted in characters (Unicode scalar values),
//! not bytes. [`MemoTable::match_text`] maps a match back to its slice of
//! the input.
//!
//! ## Queries
//!
//! - [`MemoTable::non_overlapping_matches`]: the left-to-right sequence of
//!   matches of a rule, each search resuming after the previous match
//! - [`MemoTable::all_matches`]: every position where a rule matches
//! - [`MemoTable::non_match_positions`]: positions where a rule was tried
//!   and did not match
//! - [`MemoTable::syntax_errors`]: input spans no listed rule covers
//! - [`MemoTable::to_ast`]: the labeled tree of a match

mod compare;
mod entry;

pub use entry::{Match, MemoEntry};

#[cfg(test)]
pub(crate) use compare::is_better;

use crate::ast::{AstNode, Span};
use crate::clause::ClauseId;
use crate::error::QueryError;
use crate::grammar::{Grammar, Rule};
use crate::parser::ParseMetrics;
use crate::parser::matcher::Matcher;
use compact_str::CompactString;
use hashbrown::HashMap;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Identifies one matching attempt: a clause at a start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct MemoKey {
    pub clause: ClauseId,
    pub start: usize,
}

impl MemoKey {
    #[must_use]
    pub const fn new(clause: ClauseId, start: usize) -> Self {
        Self { clause, start }
    }
}

/// The populated memo table of a completed parse.
#[derive(Debug)]
pub struct MemoTable<'g> {
    pub(crate) grammar: &'g Grammar,
    input: String,
    pub(crate) chars: Vec<char>,
    /// Byte offset of every character, plus the input length
    offsets: Vec<usize>,
    pub(crate) entries: HashMap<MemoKey, MemoEntry, ahash::RandomState>,
    pub(crate) metrics: ParseMetrics,
}

impl<'g> MemoTable<'g> {
    pub(crate) fn new(grammar: &'g Grammar, input: &str) -> Self {
        let (offsets, chars): (Vec<usize>, Vec<char>) = input.char_indices().unzip();
        let mut offsets = offsets;
        offsets.push(input.len());
        Self {
            grammar,
            input: input.to_owned(),
            chars,
            offsets,
            entries: HashMap::default(),
            metrics: ParseMetrics::default(),
        }
    }

    pub(crate) fn matcher(&self) -> Matcher<'_> {
        Matcher::new(self.grammar, &self.chars, &self.entries)
    }

    pub(crate) fn entry_mut(&mut self, key: MemoKey) -> &mut MemoEntry {
        self.entries.entry(key).or_default()
    }

    #[must_use]
    pub const fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Input length in characters
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    /// Number of memo entries created during the parse
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entry(&self, key: MemoKey) -> Option<&MemoEntry> {
        self.entries.get(&key)
    }

    /// Look up a rule of the grammar by name.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRule`] if the grammar has no such rule.
    pub fn rule(&self, name: &str) -> Result<&'g Rule, QueryError> {
        self.grammar.rule(name).ok_or_else(|| QueryError::UnknownRule {
            name: CompactString::from(name),
        })
    }

    /// The best match of a clause at a position, if it matches there.
    ///
    /// Positions past the end of input never match.
    ///
    /// # Panics
    ///
    /// Panics if `clause` does not belong to this table's grammar.
    #[must_use]
    pub fn best_match(&self, clause: ClauseId, start: usize) -> Option<Arc<Match>> {
        if start > self.chars.len() {
            return None;
        }
        self.matcher().lookup(clause, start, &mut Vec::new())
    }

    /// The non-overlapping matches of a rule, left to right.
    ///
    /// Scanning covers positions 0 through the end of input, inclusive, so a
    /// zero-length match at the very end is reported. After each match the
    /// scan resumes at its end (or one past its start, for a zero-length
    /// match).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRule`] if the grammar has no such rule.
    pub fn non_overlapping_matches(&self, rule: &str) -> Result<Vec<Arc<Match>>, QueryError> {
        let clause = self.rule(rule)?.clause();
        let mut matches = Vec::new();
        let mut pos = 0;
        while pos <= self.input_len() {
            match self.best_match(clause, pos) {
                Some(m) => {
                    pos += m.len().max(1);
                    matches.push(m);
                }
                None => pos += 1,
            }
        }
        Ok(matches)
    }

    /// Every match of a rule, by ascending start position up to and
    /// including the end of input; matches may overlap.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRule`] if the grammar has no such rule.
    pub fn all_matches(&self, rule: &str) -> Result<Vec<Arc<Match>>, QueryError> {
        let clause = self.rule(rule)?.clause();
        Ok((0..=self.input_len())
            .filter_map(|pos| self.best_match(clause, pos))
            .collect())
    }

    /// Positions where a rule was tried during the parse and did not match.
    ///
    /// For rules whose clause is not memoized (terminals and negative
    /// lookaheads) every position up to and including the end of input is
    /// tried.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRule`] if the grammar has no such rule.
    pub fn non_match_positions(&self, rule: &str) -> Result<Vec<usize>, QueryError> {
        let clause = self.rule(rule)?.clause();
        if !self.grammar.clause(clause).is_memoized() {
            return Ok((0..=self.input_len())
                .filter(|&pos| self.best_match(clause, pos).is_none())
                .collect());
        }
        let mut positions: Vec<usize> = self
            .entries
            .keys()
            .filter(|key| key.clause == clause)
            .map(|key| key.start)
            .filter(|&pos| self.best_match(clause, pos).is_none())
            .collect();
        positions.sort_unstable();
        Ok(positions)
    }

    /// Maximal spans of input covered by no non-overlapping match of any
    /// of the given rules.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownRule`] for the first unknown rule name.
    pub fn syntax_errors(&self, rules: &[&str]) -> Result<Vec<Span>, QueryError> {
        let mut covered = vec![false; self.chars.len()];
        for rule in rules {
            for m in self.non_overlapping_matches(rule)? {
                covered[m.start()..m.end()].fill(true);
            }
        }

        let mut errors = Vec::new();
        let mut start = None;
        for (pos, &is_covered) in covered.iter().enumerate() {
            match (is_covered, start) {
                (false, None) => start = Some(pos),
                (true, Some(s)) => {
                    errors.push(Span::new(s, pos));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            errors.push(Span::new(s, covered.len()));
        }
        Ok(errors)
    }

    /// The input text a match spans
    #[must_use]
    pub fn match_text(&self, m: &Match) -> &str {
        self.span_text(Span::new(m.start(), m.end()))
    }

    /// The input text of a character span
    ///
    /// # Panics
    ///
    /// Panics if the span ends past the end of input or starts after its
    /// end.
    #[must_use]
    pub fn span_text(&self, span: Span) -> &str {
        &self.input[self.offsets[span.start]..self.offsets[span.end]]
    }

    /// Build the AST of a match, rooted at a node labeled `root_label`.
    #[must_use]
    pub fn to_ast(&self, m: &Match, root_label: &str) -> AstNode {
        AstNode::from_match(self, m, root_label)
    }
}
