//! # Matching Engine
//!
//! The fixed-point loop that fills the memo table bottom-up.
//!
//! 1. **Seeding**: every seed clause (terminals other than `Nothing`, plus
//!    negative lookaheads) is tried at every seeding position; where it
//!    matches, its seed parents become active there. With a lexical rule,
//!    the memoized parts of each lexeme's match are installed up front.
//! 2. **Match phase**: the active keys of the lowest active stratum are
//!    evaluated against the memo table as it stood at the start of the round
//!    (see [`super::parallel`]). Keys of higher strata wait until the lower
//!    ones settle, so a negative lookahead reads only final matches.
//! 3. **Commit phase**: each evaluation registers a backreference on every
//!    entry it read. Then each proposed match is installed if it beats the
//!    entry's current best, which activates the entry's backreferences and
//!    the clause's seed parents at the same position.
//!
//! The loop ends when a round activates nothing. An entry only ever takes a
//! strictly better match, so this always happens.

use super::parallel::{Proposal, evaluate_round};
use super::{ParseConfig, ParseMetrics};
use crate::clause::ClauseKind;
use crate::grammar::Grammar;
use crate::memo::{Match, MemoKey, MemoTable};
use hashbrown::HashSet;
use log::{debug, trace};
use std::sync::Arc;
use std::time::Instant;

type ActiveSet = HashSet<MemoKey, ahash::RandomState>;

pub(crate) fn run<'g>(grammar: &'g Grammar, input: &str, config: &ParseConfig) -> MemoTable<'g> {
    let started = Instant::now();
    let mut table = MemoTable::new(grammar, input);
    let mut metrics = ParseMetrics {
        converged: true,
        ..ParseMetrics::default()
    };

    let lexemes = lex(&table);
    let mut active = seed(&table, &lexemes.positions);
    if !lexemes.matches.is_empty() {
        let proposals = lexeme_proposals(&table, &lexemes.matches);
        commit(&mut table, proposals, &mut active, &mut metrics);
    }

    while !active.is_empty() {
        if config.max_rounds.is_some_and(|max| metrics.rounds >= max) {
            metrics.converged = false;
            break;
        }
        metrics.rounds += 1;

        let Some(stratum) = active
            .iter()
            .map(|key| grammar.clause(key.clause).stratum())
            .min()
        else {
            break;
        };
        let mut keys: Vec<MemoKey> = active
            .extract_if(|key| grammar.clause(key.clause).stratum() == stratum)
            .collect();
        keys.sort_unstable();
        trace!(
            "round {} (stratum {stratum}): {} active",
            metrics.rounds,
            keys.len()
        );
        metrics.evaluations += keys.len();

        let proposals = evaluate_round(&table.matcher(), &keys, config);
        commit(&mut table, proposals, &mut active, &mut metrics);
    }

    metrics.memo_entries = table.len();
    metrics.parse_time = started.elapsed();
    debug!(
        "parsed {} chars in {:?}: {} rounds, {} evaluations, {} matches installed, {} memo entries",
        table.input_len(),
        metrics.parse_time,
        metrics.rounds,
        metrics.evaluations,
        metrics.matches_installed,
        metrics.memo_entries,
    );
    table.metrics = metrics;
    table
}

/// The result of the lexical pass.
#[derive(Debug, Default)]
struct Lexemes {
    /// Positions where seed clauses are tried
    positions: Vec<usize>,
    /// Top-down matches of the lexical rule, one per lexeme
    matches: Vec<Arc<Match>>,
}

/// Without a lexical rule, every position seeds, including the end of input.
///
/// With one, the rule is matched top-down repeatedly from position 0,
/// skipping one character wherever it fails or matches nothing. Seeding is
/// then limited to the lexeme boundaries.
fn lex(table: &MemoTable<'_>) -> Lexemes {
    let len = table.input_len();
    let Some(lexical) = table.grammar.lexical_rule() else {
        return Lexemes {
            positions: (0..=len).collect(),
            matches: Vec::new(),
        };
    };

    let matcher = table.matcher();
    let mut lexemes = Lexemes {
        positions: vec![0],
        matches: Vec::new(),
    };
    let mut pos = 0;
    while pos < len {
        pos += match matcher.match_top_down(lexical.clause(), pos) {
            Some(m) if !m.is_empty() => {
                let len = m.len();
                lexemes.matches.push(m);
                len
            }
            _ => 1,
        };
        lexemes.positions.push(pos);
    }
    debug!(
        "lexical pass over {len} chars found {} lexemes",
        lexemes.matches.len()
    );
    lexemes
}

/// Proposals installing every memoized match inside the lexemes.
///
/// Seeding stops at lexeme boundaries, so positions inside a lexeme are
/// never evaluated bottom-up; their matches come from the top-down pass.
fn lexeme_proposals(table: &MemoTable<'_>, lexemes: &[Arc<Match>]) -> Vec<Proposal> {
    let mut proposals = Vec::new();
    let mut stack: Vec<&Arc<Match>> = lexemes.iter().collect();
    while let Some(m) = stack.pop() {
        if table.grammar.clause(m.clause()).is_memoized() {
            proposals.push(Proposal {
                key: m.key(),
                new_match: Some(Match::clone(m)),
                deps: Vec::new(),
            });
        }
        stack.extend(m.sub_matches());
    }
    proposals
}

fn seed(table: &MemoTable<'_>, positions: &[usize]) -> ActiveSet {
    let grammar = table.grammar;
    let matcher = table.matcher();
    let mut active = ActiveSet::default();
    let mut deps = Vec::new();

    for &id in grammar.seed_clauses() {
        let clause = grammar.clause(id);
        for &pos in positions {
            if matches!(clause.kind(), ClauseKind::Start) && pos != 0 {
                continue;
            }
            deps.clear();
            if matcher.lookup(id, pos, &mut deps).is_some() {
                active.extend(clause.seed_parents().iter().map(|&p| MemoKey::new(p, pos)));
            }
        }
    }
    active
}

fn commit(
    table: &mut MemoTable<'_>,
    proposals: Vec<Proposal>,
    active: &mut ActiveSet,
    metrics: &mut ParseMetrics,
) {
    let grammar = table.grammar;

    // Register every read before installing anything, so an entry improved
    // this round still reaches evaluations that saw its old value.
    for proposal in &proposals {
        for &dep in &proposal.deps {
            table.entry_mut(dep).backrefs.insert(proposal.key);
        }
    }

    let mut touched = Vec::new();
    for proposal in proposals {
        if let Some(m) = proposal.new_match {
            table.entry_mut(proposal.key).pending.push(Arc::new(m));
            touched.push(proposal.key);
        }
    }

    for key in touched {
        let entry = table.entry_mut(key);
        let Some(installed) = entry.commit(grammar.clauses_bottom_up()) else {
            continue;
        };
        metrics.matches_installed += 1;
        trace!(
            "{} at {}: length {}",
            grammar.canonical_form(key.clause),
            key.start,
            installed.len()
        );
        active.extend(entry.backrefs());
        active.extend(
            grammar
                .clause(key.clause)
                .seed_parents()
                .iter()
                .map(|&p| MemoKey::new(p, key.start)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expr, GrammarBuilder};

    #[test]
    fn test_max_rounds_stops_early() {
        let grammar = GrammarBuilder::new()
            .rule("D", Expr::one_or_more(Expr::char_range('0', '9')))
            .build()
            .unwrap();
        let config = ParseConfig {
            max_rounds: Some(1),
            ..ParseConfig::default()
        };
        let table = run(&grammar, "12345", &config);
        assert!(!table.metrics().converged);
        assert_eq!(table.metrics().rounds, 1);

        let table = run(&grammar, "12345", &ParseConfig::default());
        assert!(table.metrics().converged);
        let d = grammar.rule("D").unwrap().clause();
        assert_eq!(table.best_match(d, 0).map(|m| m.len()), Some(5));
    }

    #[test]
    fn test_lexical_rule_restricts_seed_positions() {
        let grammar = GrammarBuilder::new()
            .rule("Word", Expr::one_or_more(Expr::char_range('a', 'z')))
            .rule(
                "Lex",
                Expr::first([Expr::rule("Word"), Expr::char(' ')]),
            )
            .lexical_rule("Lex")
            .build()
            .unwrap();
        let table = MemoTable::new(&grammar, "ab cd");
        let lexemes = lex(&table);
        assert_eq!(lexemes.positions, vec![0, 2, 3, 5]);
        assert_eq!(lexemes.matches.len(), 3);
    }

    #[test]
    fn test_lexeme_interiors_are_installed() {
        let grammar = GrammarBuilder::new()
            .rule("Word", Expr::one_or_more(Expr::char_range('a', 'z')))
            .rule(
                "Lex",
                Expr::first([Expr::rule("Word"), Expr::char(' ')]),
            )
            .lexical_rule("Lex")
            .build()
            .unwrap();
        let table = run(&grammar, "abc d", &ParseConfig::default());
        let word = grammar.rule("Word").unwrap().clause();
        // The tail of "abc" starts inside the lexeme
        assert_eq!(table.best_match(word, 1).map(|m| m.len()), Some(2));
        assert_eq!(table.best_match(word, 0).map(|m| m.len()), Some(3));
    }

    #[test]
    fn test_without_lexical_rule_every_position_seeds() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::char('a'))
            .build()
            .unwrap();
        let table = MemoTable::new(&grammar, "abc");
        let lexemes = lex(&table);
        assert_eq!(lexemes.positions, vec![0, 1, 2, 3]);
        assert!(lexemes.matches.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn test_no_entry_can_improve_after_convergence(input in "[0-9+*()]{0,16}") {
            let grammar = crate::testing::precedence_grammar();
            let table = run(&grammar, &input, &ParseConfig::default());
            let matcher = table.matcher();
            for (&key, entry) in &table.entries {
                let Some(m) = matcher.match_memoized(key.clause, key.start, &mut Vec::new()) else {
                    continue;
                };
                let improves = entry
                    .best()
                    .is_none_or(|old| crate::memo::is_better(grammar.clauses_bottom_up(), &m, old));
                proptest::prop_assert!(!improves, "{} at {}", grammar.canonical_form(key.clause), key.start);
            }
        }
    }
}
