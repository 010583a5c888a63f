//! Bottom-up ordering and per-clause analysis of a resolved clause graph.

use crate::clause::{Clause, ClauseId, ClauseKind};
use crate::error::GrammarError;
use compact_str::CompactString;
use lasso::Rodeo;

/// Rebuild the arena with only the clauses reachable from `roots`, in
/// bottom-up order, remapping `roots` to the new ids.
///
/// # Panics
///
/// Panics if a rule reference survived resolution.
pub(crate) fn compact_bottom_up(clauses: Vec<Clause>, roots: &mut [ClauseId]) -> Vec<Clause> {
    fn visit(clauses: &[Clause], id: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        if visited[id] {
            return;
        }
        visited[id] = true;
        for slot in clauses[id].children() {
            visit(clauses, slot.clause.index(), visited, order);
        }
        order.push(id);
    }

    let mut visited = vec![false; clauses.len()];
    let mut order = Vec::new();
    for root in roots.iter() {
        visit(&clauses, root.index(), &mut visited, &mut order);
    }

    let mut new_id = vec![None; clauses.len()];
    for (new, &old) in order.iter().enumerate() {
        new_id[old] = Some(ClauseId::new(new));
    }
    let remap = |id: ClauseId| new_id[id.index()].unwrap_or_else(|| unreachable!());

    let mut slots: Vec<Option<Clause>> = clauses.into_iter().map(Some).collect();
    let mut out = Vec::with_capacity(order.len());
    for old in order {
        let Some(mut clause) = slots[old].take() else {
            unreachable!("clause visited twice");
        };
        if let ClauseKind::RuleRef(name) = &clause.kind {
            panic!("unresolved rule reference {name} survived grammar compilation");
        }
        for slot in clause.kind.children_mut() {
            slot.clause = remap(slot.clause);
        }
        out.push(clause);
    }
    for root in roots.iter_mut() {
        *root = remap(*root);
    }
    out
}

/// Fail if a cycle is reachable from the lexical rule's clause.
pub(crate) fn check_lexical_acyclic(
    clauses: &[Clause],
    root: ClauseId,
    rule: &str,
    rodeo: &Rodeo,
) -> Result<(), GrammarError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnPath,
        Done,
    }

    fn visit(
        clauses: &[Clause],
        id: usize,
        state: &mut [State],
    ) -> Result<(), usize> {
        match state[id] {
            State::OnPath => return Err(id),
            State::Done => return Ok(()),
            State::Unvisited => {}
        }
        state[id] = State::OnPath;
        for slot in clauses[id].children() {
            visit(clauses, slot.clause.index(), state)?;
        }
        state[id] = State::Done;
        Ok(())
    }

    let mut state = vec![State::Unvisited; clauses.len()];
    visit(clauses, root.index(), &mut state).map_err(|id| GrammarError::LexicalCycle {
        rule: CompactString::from(rule),
        clause: CompactString::from(rodeo.resolve(&clauses[id].canonical)),
    })
}

/// Compute the always-matches and can-match-zero flags.
///
/// Flags only ever go from `false` to `true`, so iterating the bottom-up
/// order until nothing changes also settles clauses inside cycles.
pub(crate) fn compute_match_flags(
    clauses: &mut [Clause],
    rodeo: &Rodeo,
) -> Result<(), GrammarError> {
    loop {
        let mut changed = false;
        for i in 0..clauses.len() {
            let (always, zero) = clauses[i].test_always_matches(clauses).map_err(|index| {
                GrammarError::ShadowedAlternative {
                    clause: CompactString::from(rodeo.resolve(&clauses[i].canonical)),
                    index,
                }
            })?;
            let clause = &mut clauses[i];
            if always != clause.always_matches || zero != clause.can_match_zero {
                clause.always_matches |= always;
                clause.can_match_zero |= zero;
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
    }
}

/// Mark every clause from which no cycle is reachable, and assign strata.
///
/// Cycles are found as the non-trivial strongly connected components
/// (Tarjan), plus single clauses that list themselves as a child. Tarjan
/// emits components children first, which is the order strata are
/// computed in.
///
/// # Errors
///
/// Returns [`GrammarError::LookaheadCycle`] if a negative lookahead shares
/// a component with its child.
pub(crate) fn mark_acyclic(clauses: &mut [Clause], rodeo: &Rodeo) -> Result<(), GrammarError> {
    struct Tarjan<'a> {
        clauses: &'a [Clause],
        index: Vec<Option<usize>>,
        low: Vec<usize>,
        on_stack: Vec<bool>,
        stack: Vec<usize>,
        next: usize,
        components: Vec<Vec<usize>>,
    }

    impl Tarjan<'_> {
        fn visit(&mut self, v: usize) {
            self.index[v] = Some(self.next);
            self.low[v] = self.next;
            self.next += 1;
            self.stack.push(v);
            self.on_stack[v] = true;

            for slot in self.clauses[v].children() {
                let w = slot.clause.index();
                match self.index[w] {
                    None => {
                        self.visit(w);
                        self.low[v] = self.low[v].min(self.low[w]);
                    }
                    Some(iw) if self.on_stack[w] => self.low[v] = self.low[v].min(iw),
                    Some(_) => {}
                }
            }

            if self.index[v] == Some(self.low[v]) {
                let mut component = Vec::new();
                while let Some(w) = self.stack.pop() {
                    self.on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                self.components.push(component);
            }
        }
    }

    let n = clauses.len();
    let components = {
        let mut tarjan = Tarjan {
            clauses,
            index: vec![None; n],
            low: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next: 0,
            components: Vec::new(),
        };
        for v in 0..n {
            if tarjan.index[v].is_none() {
                tarjan.visit(v);
            }
        }
        tarjan.components
    };

    let mut component_of = vec![0; n];
    let mut cyclic = vec![false; n];
    for (c, members) in components.iter().enumerate() {
        let self_loop = |&m: &usize| clauses[m].children().iter().any(|s| s.clause.index() == m);
        let is_cycle = members.len() > 1 || members.iter().any(self_loop);
        for &m in members {
            component_of[m] = c;
            cyclic[m] = is_cycle;
        }
    }

    // Outside a cycle every child precedes its parent in bottom-up order
    for i in 0..n {
        let acyclic = !cyclic[i]
            && clauses[i]
                .children()
                .iter()
                .all(|s| clauses[s.clause.index()].acyclic);
        clauses[i].acyclic = acyclic;
    }

    let mut strata = vec![0u32; components.len()];
    for (c, members) in components.iter().enumerate() {
        let mut stratum = 0;
        for &m in members {
            let negative = matches!(clauses[m].kind, ClauseKind::NotFollowedBy(_));
            for slot in clauses[m].children() {
                let child = slot.clause.index();
                if component_of[child] == c {
                    if negative {
                        return Err(GrammarError::LookaheadCycle {
                            clause: CompactString::from(rodeo.resolve(&clauses[m].canonical)),
                        });
                    }
                    continue;
                }
                // An acyclic child is decided top-down, without the memo table
                let step = u32::from(negative && !clauses[child].acyclic);
                stratum = stratum.max(strata[component_of[child]] + step);
            }
        }
        strata[c] = stratum;
    }
    for (clause, &c) in clauses.iter_mut().zip(&component_of) {
        clause.stratum = strata[c];
    }
    Ok(())
}

/// Register each memoized clause as a seed parent of its seed children.
///
/// Must run after [`compute_match_flags`]: a `Seq` seeds past children that
/// can match zero characters.
pub(crate) fn link_seed_parents(clauses: &mut [Clause]) {
    for i in 0..clauses.len() {
        if !clauses[i].is_memoized() {
            continue;
        }
        let parent = ClauseId::new(i);
        for child in clauses[i].seed_children(clauses) {
            let parents = &mut clauses[child.index()].seed_parents;
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{CharSet, ChildSlot};
    use smallvec::smallvec;

    fn build(kinds: Vec<ClauseKind>) -> (Vec<Clause>, Rodeo) {
        let mut rodeo = Rodeo::new();
        let clauses = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| Clause::new(kind, rodeo.get_or_intern(format!("c{i}"))))
            .collect();
        (clauses, rodeo)
    }

    fn slot(i: usize) -> ChildSlot {
        ChildSlot::new(ClauseId::new(i))
    }

    #[test]
    fn test_compaction_orders_children_first_and_drops_unreachable() {
        let (clauses, _) = build(vec![
            ClauseKind::Seq(smallvec![slot(2), slot(3)]),
            ClauseKind::CharSet(CharSet::single('z')),
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::CharSet(CharSet::single('b')),
        ]);
        let mut roots = [ClauseId::new(0)];
        let out = compact_bottom_up(clauses, &mut roots);
        assert_eq!(out.len(), 3);
        assert_eq!(roots[0], ClauseId::new(2));
        assert_eq!(
            out[2].children().iter().map(|s| s.clause).collect::<Vec<_>>(),
            vec![ClauseId::new(0), ClauseId::new(1)]
        );
    }

    #[test]
    fn test_cycle_members_are_not_acyclic() {
        // 0: 'a', 1: 0 2, 2: 1 / 0, 3: 0+
        let (mut clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::Seq(smallvec![slot(0), slot(2)]),
            ClauseKind::First(smallvec![slot(1), slot(0)]),
            ClauseKind::OneOrMore(slot(0)),
        ]);
        mark_acyclic(&mut clauses, &rodeo).unwrap();
        assert!(clauses[0].is_acyclic());
        assert!(!clauses[1].is_acyclic());
        assert!(!clauses[2].is_acyclic());
        assert!(clauses[3].is_acyclic());
    }

    #[test]
    fn test_negative_lookahead_over_cycle_is_a_stratum_higher() {
        // 0: 'y', 1: 2 0, 2: 1 / 0, 3: 'x', 4: !2, 5: 3 4, 6: !0
        let (mut clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('y')),
            ClauseKind::Seq(smallvec![slot(2), slot(0)]),
            ClauseKind::First(smallvec![slot(1), slot(0)]),
            ClauseKind::CharSet(CharSet::single('x')),
            ClauseKind::NotFollowedBy(slot(2)),
            ClauseKind::Seq(smallvec![slot(3), slot(4)]),
            ClauseKind::NotFollowedBy(slot(0)),
        ]);
        mark_acyclic(&mut clauses, &rodeo).unwrap();
        assert_eq!(clauses[1].stratum(), 0);
        assert_eq!(clauses[2].stratum(), 0);
        assert_eq!(clauses[4].stratum(), 1);
        assert_eq!(clauses[5].stratum(), 1);
        // Decided top-down, so no extra layer
        assert_eq!(clauses[6].stratum(), 0);
    }

    #[test]
    fn test_negative_lookahead_inside_its_cycle_is_rejected() {
        // 0: 'a', 1: 0 2, 2: !1
        let (mut clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::Seq(smallvec![slot(0), slot(2)]),
            ClauseKind::NotFollowedBy(slot(1)),
        ]);
        let err = mark_acyclic(&mut clauses, &rodeo).unwrap_err();
        assert!(matches!(err, GrammarError::LookaheadCycle { .. }), "{err}");
    }

    #[test]
    fn test_lexical_cycle_is_detected() {
        let (clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::Seq(smallvec![slot(0), slot(2)]),
            ClauseKind::First(smallvec![slot(1), slot(0)]),
        ]);
        let err = check_lexical_acyclic(&clauses, ClauseId::new(2), "Lex", &rodeo).unwrap_err();
        assert!(matches!(err, GrammarError::LexicalCycle { ref rule, .. } if rule == "Lex"));
    }

    #[test]
    fn test_shared_subclause_is_not_a_lexical_cycle() {
        let (clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::Seq(smallvec![slot(0), slot(0)]),
        ]);
        assert!(check_lexical_acyclic(&clauses, ClauseId::new(1), "Lex", &rodeo).is_ok());
    }

    #[test]
    fn test_flags_settle_inside_cycles() {
        // 0: (), 1: 3 / (), 2: 1+, 3: 2 'a'
        let (mut clauses, rodeo) = build(vec![
            ClauseKind::Nothing,
            ClauseKind::First(smallvec![slot(3), slot(0)]),
            ClauseKind::OneOrMore(slot(1)),
            ClauseKind::Seq(smallvec![slot(2), slot(4)]),
            ClauseKind::CharSet(CharSet::single('a')),
        ]);
        compute_match_flags(&mut clauses, &rodeo).unwrap();
        assert!(clauses[1].always_matches());
        assert!(clauses[2].always_matches());
        assert!(!clauses[3].always_matches());
        assert!(!clauses[3].can_match_zero());
    }

    #[test]
    fn test_seed_parents_skip_negative_lookahead() {
        let (mut clauses, rodeo) = build(vec![
            ClauseKind::CharSet(CharSet::single('a')),
            ClauseKind::NotFollowedBy(slot(0)),
            ClauseKind::FollowedBy(slot(0)),
        ]);
        compute_match_flags(&mut clauses, &rodeo).unwrap();
        link_seed_parents(&mut clauses);
        assert_eq!(clauses[0].seed_parents(), &[ClauseId::new(2)]);
    }
}
