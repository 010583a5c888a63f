use super::MemoKey;
use super::compare::is_better;
use crate::clause::{Clause, ClauseId};
use hashbrown::HashSet;
use smallvec::SmallVec;
use std::sync::Arc;

/// A successful match of a clause at a start position.
///
/// Matches are immutable once built. A better match for the same key
/// replaces the old one in the memo table; it never edits it, since other
/// matches may hold the old one as a sub-match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    clause: ClauseId,
    start: usize,
    len: usize,
    index: usize,
    sub_matches: SmallVec<[Arc<Match>; 2]>,
}

impl Match {
    /// A match with no sub-matches (terminals and lookaheads)
    pub(crate) fn leaf(clause: ClauseId, start: usize, len: usize) -> Self {
        Self {
            clause,
            start,
            len,
            index: 0,
            sub_matches: SmallVec::new(),
        }
    }

    pub(crate) fn new(
        clause: ClauseId,
        start: usize,
        len: usize,
        index: usize,
        sub_matches: SmallVec<[Arc<Match>; 2]>,
    ) -> Self {
        Self {
            clause,
            start,
            len,
            index,
            sub_matches,
        }
    }

    #[inline]
    #[must_use]
    pub const fn clause(&self) -> ClauseId {
        self.clause
    }

    /// Start position, in characters
    #[inline]
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Length, in characters
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Index of the alternative that matched, for `First` and `Longest`
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn sub_matches(&self) -> &[Arc<Match>] {
        &self.sub_matches
    }

    #[must_use]
    pub const fn key(&self) -> MemoKey {
        MemoKey::new(self.clause, self.start)
    }
}

/// The record kept for one memo key.
#[derive(Debug, Default)]
pub struct MemoEntry {
    pub(crate) best: Option<Arc<Match>>,
    /// Matches proposed in the current round, not yet compared
    pub(crate) pending: SmallVec<[Arc<Match>; 1]>,
    /// Keys whose last evaluation read this entry
    pub(crate) backrefs: HashSet<MemoKey, ahash::RandomState>,
}

impl MemoEntry {
    /// The best match found so far
    #[must_use]
    pub fn best(&self) -> Option<&Arc<Match>> {
        self.best.as_ref()
    }

    /// Keys to re-evaluate when the best match changes
    pub fn backrefs(&self) -> impl Iterator<Item = MemoKey> + '_ {
        self.backrefs.iter().copied()
    }

    /// Install the best pending match if it beats the current one.
    ///
    /// Returns the installed match, if any. The pending queue is always
    /// drained.
    pub(crate) fn commit(&mut self, clauses: &[Clause]) -> Option<Arc<Match>> {
        let candidate = self
            .pending
            .drain(..)
            .reduce(|a, b| if is_better(clauses, &b, &a) { b } else { a })?;
        let improves = self
            .best
            .as_ref()
            .is_none_or(|old| is_better(clauses, &candidate, old));
        if !improves {
            return None;
        }
        self.best = Some(Arc::clone(&candidate));
        Some(candidate)
    }
}
