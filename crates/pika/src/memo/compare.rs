//! Ordering of competing matches for the same memo key.
//!
//! `compare(a, b) == Greater` means `a` is the better match. The checks, in
//! order:
//!
//! 1. `First`: the lower alternative index wins. `Longest`: the longer match
//!    wins, then the lower alternative index.
//! 2. With equally many sub-matches, the first sub-match that differs in
//!    length decides; longer wins.
//! 3. The longer match wins.
//! 4. Sub-matches are compared pairwise by these same rules.
//! 5. More sub-matches wins.
//!
//! Step 4 recurses through the whole match tree, so a comparison can cost
//! time proportional to the tree size. It only runs when steps 1-3 tie.

use super::Match;
use crate::clause::{Clause, ClauseKind};
use std::cmp::Ordering;

/// True if `new` should replace `old`
#[inline]
#[must_use]
pub(crate) fn is_better(clauses: &[Clause], new: &Match, old: &Match) -> bool {
    compare(clauses, new, old) == Ordering::Greater
}

pub(crate) fn compare(clauses: &[Clause], a: &Match, b: &Match) -> Ordering {
    let by_kind = match clauses[a.clause().index()].kind() {
        ClauseKind::First(_) => b.index().cmp(&a.index()),
        ClauseKind::Longest(_) => a.len().cmp(&b.len()).then(b.index().cmp(&a.index())),
        _ => Ordering::Equal,
    };
    by_kind.then_with(|| compare_structure(clauses, a, b))
}

fn compare_structure(clauses: &[Clause], a: &Match, b: &Match) -> Ordering {
    let (subs_a, subs_b) = (a.sub_matches(), b.sub_matches());

    if subs_a.len() == subs_b.len() {
        let by_components = subs_a
            .iter()
            .zip(subs_b)
            .map(|(x, y)| x.len().cmp(&y.len()))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal);
        if by_components.is_ne() {
            return by_components;
        }
    }

    a.len()
        .cmp(&b.len())
        .then_with(|| {
            subs_a
                .iter()
                .zip(subs_b)
                .map(|(x, y)| compare(clauses, x, y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
        .then(subs_a.len().cmp(&subs_b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseId;
    use crate::grammar::{Expr, GrammarBuilder};
    use smallvec::smallvec;
    use std::sync::Arc;

    fn leaf(clause: ClauseId, start: usize, len: usize) -> Arc<Match> {
        Arc::new(Match::leaf(clause, start, len))
    }

    #[test]
    fn test_first_prefers_lower_index_over_length() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::first([Expr::char('a'), Expr::str("ab")]))
            .build()
            .unwrap();
        let first = grammar.rule("A").unwrap().clause();
        let alts: Vec<ClauseId> = grammar.clause(first).children().iter().map(|s| s.clause).collect();

        let early = Match::new(first, 0, 1, 0, smallvec![leaf(alts[0], 0, 1)]);
        let late = Match::new(first, 0, 2, 1, smallvec![leaf(alts[1], 0, 2)]);
        let clauses = grammar.clauses_bottom_up();
        assert!(is_better(clauses, &early, &late));
        assert!(!is_better(clauses, &late, &early));
    }

    #[test]
    fn test_longest_prefers_length_then_index() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::longest([Expr::char('a'), Expr::str("ab"), Expr::str("ac")]))
            .build()
            .unwrap();
        let longest = grammar.rule("A").unwrap().clause();
        let alts: Vec<ClauseId> = grammar
            .clause(longest)
            .children()
            .iter()
            .map(|s| s.clause)
            .collect();
        let clauses = grammar.clauses_bottom_up();

        let short = Match::new(longest, 0, 1, 0, smallvec![leaf(alts[0], 0, 1)]);
        let long = Match::new(longest, 0, 2, 1, smallvec![leaf(alts[1], 0, 2)]);
        let long_later = Match::new(longest, 0, 2, 2, smallvec![leaf(alts[2], 0, 2)]);
        assert!(is_better(clauses, &long, &short));
        assert!(is_better(clauses, &long, &long_later));
    }

    #[test]
    fn test_equal_matches_are_not_better() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::seq([Expr::char('a'), Expr::char('b')]))
            .build()
            .unwrap();
        let seq = grammar.rule("A").unwrap().clause();
        let kids: Vec<ClauseId> = grammar.clause(seq).children().iter().map(|s| s.clause).collect();
        let m = Match::new(seq, 0, 2, 0, smallvec![leaf(kids[0], 0, 1), leaf(kids[1], 1, 1)]);
        assert_eq!(compare(grammar.clauses_bottom_up(), &m, &m.clone()), Ordering::Equal);
    }
}
