//! Per-clause match rules.
//!
//! A [`Matcher`] evaluates clauses against a read-only view of the memo
//! table. Every memo entry it reads is recorded as a dependency so the
//! caller can register a backreference and re-evaluate when that entry
//! improves.

use crate::clause::{ChildSlot, ClauseId, ClauseKind};
use crate::grammar::Grammar;
use crate::memo::{Match, MemoEntry, MemoKey};
use hashbrown::HashMap;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

pub(crate) struct Matcher<'a> {
    grammar: &'a Grammar,
    input: &'a [char],
    memo: &'a HashMap<MemoKey, MemoEntry, ahash::RandomState>,
}

impl<'a> Matcher<'a> {
    pub(crate) const fn new(
        grammar: &'a Grammar,
        input: &'a [char],
        memo: &'a HashMap<MemoKey, MemoEntry, ahash::RandomState>,
    ) -> Self {
        Self {
            grammar,
            input,
            memo,
        }
    }

    /// The current match of any clause at `pos`.
    ///
    /// Terminals are matched directly and negative lookaheads decided on the
    /// spot. Memoized clauses read their entry, recording it in `deps`.
    pub(crate) fn lookup(
        &self,
        id: ClauseId,
        pos: usize,
        deps: &mut Vec<MemoKey>,
    ) -> Option<Arc<Match>> {
        let clause = self.grammar.clause(id);
        match clause.kind() {
            kind if kind.is_terminal() => self.match_terminal(id, kind, pos).map(Arc::new),
            ClauseKind::NotFollowedBy(slot) => self.not_followed_by(id, slot, pos, deps),
            ClauseKind::RuleRef(name) => {
                panic!("unresolved rule reference {name} reached the matcher")
            }
            _ => {
                let key = MemoKey::new(id, pos);
                deps.push(key);
                let best = self.memo.get(&key).and_then(|e| e.best().cloned());
                if best.is_none() && clause.always_matches() {
                    return self.zero_length(id, pos, &mut SmallVec::new()).map(Arc::new);
                }
                best
            }
        }
    }

    /// Evaluate a memoized clause from the current memo contents.
    pub(crate) fn match_memoized(
        &self,
        id: ClauseId,
        pos: usize,
        deps: &mut Vec<MemoKey>,
    ) -> Option<Match> {
        match self.grammar.clause(id).kind() {
            ClauseKind::Seq(slots) => {
                let mut end = pos;
                let mut subs = SmallVec::with_capacity(slots.len());
                for slot in slots {
                    let m = self.lookup(slot.clause, end, deps)?;
                    end = m.end();
                    subs.push(m);
                }
                Some(Match::new(id, pos, end - pos, 0, subs))
            }
            ClauseKind::First(slots) => slots.iter().enumerate().find_map(|(i, slot)| {
                self.lookup(slot.clause, pos, deps)
                    .map(|m| Match::new(id, pos, m.len(), i, smallvec![m]))
            }),
            ClauseKind::Longest(slots) => {
                let mut best: Option<(usize, Arc<Match>)> = None;
                for (i, slot) in slots.iter().enumerate() {
                    if let Some(m) = self.lookup(slot.clause, pos, deps)
                        && best.as_ref().is_none_or(|(_, b)| m.len() > b.len())
                    {
                        best = Some((i, m));
                    }
                }
                best.map(|(i, m)| Match::new(id, pos, m.len(), i, smallvec![m]))
            }
            ClauseKind::OneOrMore(slot) => {
                // Right-recursive: one repetition, then this clause's own
                // match where that repetition ends.
                let head = self.lookup(slot.clause, pos, deps)?;
                if head.is_empty() {
                    return Some(Match::new(id, pos, 0, 0, smallvec![head]));
                }
                match self.lookup(id, head.end(), deps) {
                    Some(tail) if !tail.is_empty() => Some(Match::new(
                        id,
                        pos,
                        head.len() + tail.len(),
                        0,
                        smallvec![head, tail],
                    )),
                    _ => Some(Match::new(id, pos, head.len(), 0, smallvec![head])),
                }
            }
            ClauseKind::FollowedBy(slot) => self
                .lookup(slot.clause, pos, deps)
                .map(|_| Match::leaf(id, pos, 0)),
            kind => unreachable!("{kind:?} is not memoized"),
        }
    }

    pub(crate) fn match_terminal(&self, id: ClauseId, kind: &ClauseKind, pos: usize) -> Option<Match> {
        let len = match kind {
            ClauseKind::CharSet(set) => {
                let c = *self.input.get(pos)?;
                set.matches(c).then_some(1)?
            }
            ClauseKind::CharSeq { text, ignore_case } => {
                let rest = self.input.get(pos..)?;
                let mut len = 0;
                for expected in text.chars() {
                    let actual = *rest.get(len)?;
                    let same = actual == expected
                        || (*ignore_case && actual.to_lowercase().eq(expected.to_lowercase()));
                    if !same {
                        return None;
                    }
                    len += 1;
                }
                len
            }
            ClauseKind::Nothing => 0,
            ClauseKind::Start => (pos == 0).then_some(0)?,
            _ => return None,
        };
        (pos <= self.input.len()).then(|| Match::leaf(id, pos, len))
    }

    fn not_followed_by(
        &self,
        id: ClauseId,
        slot: &ChildSlot,
        pos: usize,
        deps: &mut Vec<MemoKey>,
    ) -> Option<Arc<Match>> {
        let child_matches = if self.grammar.clause(slot.clause).is_acyclic() {
            self.match_top_down(slot.clause, pos).is_some()
        } else {
            // Strata keep this from running before the child's entry settles
            self.lookup(slot.clause, pos, deps).is_some()
        };
        (!child_matches).then(|| Arc::new(Match::leaf(id, pos, 0)))
    }

    /// Exact recursive-descent evaluation, without the memo table.
    ///
    /// Only valid for clauses from which no cycle is reachable.
    pub(crate) fn match_top_down(&self, id: ClauseId, pos: usize) -> Option<Arc<Match>> {
        let kind = self.grammar.clause(id).kind();
        let m = match kind {
            ClauseKind::CharSet(_)
            | ClauseKind::CharSeq { .. }
            | ClauseKind::Nothing
            | ClauseKind::Start => self.match_terminal(id, kind, pos)?,
            ClauseKind::Seq(slots) => {
                let mut end = pos;
                let mut subs = SmallVec::with_capacity(slots.len());
                for slot in slots {
                    let m = self.match_top_down(slot.clause, end)?;
                    end = m.end();
                    subs.push(m);
                }
                Match::new(id, pos, end - pos, 0, subs)
            }
            ClauseKind::First(slots) => slots.iter().enumerate().find_map(|(i, slot)| {
                self.match_top_down(slot.clause, pos)
                    .map(|m| Match::new(id, pos, m.len(), i, smallvec![m]))
            })?,
            ClauseKind::Longest(slots) => {
                let mut best: Option<(usize, Arc<Match>)> = None;
                for (i, slot) in slots.iter().enumerate() {
                    if let Some(m) = self.match_top_down(slot.clause, pos)
                        && best.as_ref().is_none_or(|(_, b)| m.len() > b.len())
                    {
                        best = Some((i, m));
                    }
                }
                let (i, m) = best?;
                Match::new(id, pos, m.len(), i, smallvec![m])
            }
            ClauseKind::OneOrMore(slot) => {
                let mut reps = Vec::new();
                let mut end = pos;
                while let Some(m) = self.match_top_down(slot.clause, end) {
                    if m.is_empty() {
                        // A zero-length repetition is only taken on its own
                        if reps.is_empty() {
                            reps.push(m);
                        }
                        break;
                    }
                    end = m.end();
                    reps.push(m);
                }
                // Fold into the same right-nested shape the memoized rule builds
                let mut tail: Option<Arc<Match>> = None;
                for rep in reps.into_iter().rev() {
                    let start = rep.start();
                    let m = match tail.take() {
                        Some(t) => Match::new(id, start, rep.len() + t.len(), 0, smallvec![rep, t]),
                        None => Match::new(id, start, rep.len(), 0, smallvec![rep]),
                    };
                    tail = Some(Arc::new(m));
                }
                return tail;
            }
            ClauseKind::FollowedBy(slot) => {
                self.match_top_down(slot.clause, pos)?;
                Match::leaf(id, pos, 0)
            }
            ClauseKind::NotFollowedBy(slot) => {
                if self.match_top_down(slot.clause, pos).is_some() {
                    return None;
                }
                Match::leaf(id, pos, 0)
            }
            ClauseKind::RuleRef(name) => {
                panic!("unresolved rule reference {name} reached the matcher")
            }
        };
        Some(Arc::new(m))
    }

    /// The zero-length match of an always-matching clause, built from
    /// always-matching children. `path` guards against cycles.
    fn zero_length(
        &self,
        id: ClauseId,
        pos: usize,
        path: &mut SmallVec<[ClauseId; 8]>,
    ) -> Option<Match> {
        let clause = self.grammar.clause(id);
        if !clause.always_matches() || path.contains(&id) {
            return None;
        }
        path.push(id);
        let child = |slot: &ChildSlot, path: &mut SmallVec<[ClauseId; 8]>| {
            self.zero_length(slot.clause, pos, path).map(Arc::new)
        };
        let m = match clause.kind() {
            ClauseKind::Nothing => Some(Match::leaf(id, pos, 0)),
            ClauseKind::CharSeq { text, .. } if text.is_empty() => Some(Match::leaf(id, pos, 0)),
            ClauseKind::Seq(slots) => slots
                .iter()
                .map(|slot| child(slot, path))
                .collect::<Option<SmallVec<_>>>()
                .map(|subs| Match::new(id, pos, 0, 0, subs)),
            ClauseKind::First(slots) | ClauseKind::Longest(slots) => {
                slots.iter().enumerate().find_map(|(i, slot)| {
                    child(slot, path).map(|m| Match::new(id, pos, 0, i, smallvec![m]))
                })
            }
            ClauseKind::OneOrMore(slot) => {
                child(slot, path).map(|m| Match::new(id, pos, 0, 0, smallvec![m]))
            }
            ClauseKind::FollowedBy(_) => Some(Match::leaf(id, pos, 0)),
            _ => None,
        };
        path.pop();
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, GrammarBuilder};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_char_seq_ignore_case() {
        let grammar = GrammarBuilder::new()
            .rule("K", Expr::str_ignore_case("select"))
            .build()
            .unwrap();
        let memo = HashMap::default();
        let input = chars("SeLeCt *");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let k = grammar.rule("K").unwrap().clause();
        assert_eq!(matcher.match_top_down(k, 0).map(|m| m.len()), Some(6));
        assert!(matcher.match_top_down(k, 1).is_none());
    }

    #[test]
    fn test_start_only_at_zero() {
        let grammar = GrammarBuilder::new().rule("S", Expr::start()).build().unwrap();
        let memo = HashMap::default();
        let input = chars("ab");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let s = grammar.rule("S").unwrap().clause();
        assert!(matcher.lookup(s, 0, &mut Vec::new()).is_some());
        assert!(matcher.lookup(s, 1, &mut Vec::new()).is_none());
    }

    #[test]
    fn test_nothing_matches_at_end_of_input() {
        let grammar = GrammarBuilder::new().rule("N", Expr::nothing()).build().unwrap();
        let memo = HashMap::default();
        let input = chars("ab");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let n = grammar.rule("N").unwrap().clause();
        assert_eq!(matcher.lookup(n, 2, &mut Vec::new()).map(|m| m.len()), Some(0));
    }

    #[test]
    fn test_top_down_repetition_is_right_nested() {
        let grammar = GrammarBuilder::new()
            .rule("D", Expr::one_or_more(Expr::char_range('0', '9')))
            .build()
            .unwrap();
        let memo = HashMap::default();
        let input = chars("123x");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let d = grammar.rule("D").unwrap().clause();
        let m = matcher.match_top_down(d, 0).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.sub_matches().len(), 2);
        assert_eq!(m.sub_matches()[1].len(), 2);
        assert_eq!(m.sub_matches()[1].sub_matches()[1].len(), 1);
    }

    #[test]
    fn test_always_matching_clause_reads_as_zero_length() {
        let grammar = GrammarBuilder::new()
            .rule("O", Expr::optional(Expr::char('a')))
            .build()
            .unwrap();
        let memo = HashMap::default();
        let input = chars("b");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let o = grammar.rule("O").unwrap().clause();
        let mut deps = Vec::new();
        let m = matcher.lookup(o, 0, &mut deps).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.index(), 1);
        assert_eq!(deps, vec![MemoKey::new(o, 0)]);
    }

    #[test]
    fn test_not_followed_by_acyclic_child_is_exact() {
        let grammar = GrammarBuilder::new()
            .rule("N", Expr::not_followed_by(Expr::str("ab")))
            .build()
            .unwrap();
        let memo = HashMap::default();
        let input = chars("abac");
        let matcher = Matcher::new(&grammar, &input, &memo);
        let n = grammar.rule("N").unwrap().clause();
        assert!(matcher.lookup(n, 0, &mut Vec::new()).is_none());
        assert!(matcher.lookup(n, 2, &mut Vec::new()).is_some());
    }
}
