//! # Round Evaluation
//!
//! The match phase of a round evaluates every active memo key against the
//! memo table as it stood at the start of the round. Evaluations only read
//! shared state and return a [`Proposal`], so they can run on any number of
//! threads; all writes happen afterwards, in the commit phase.

use super::ParseConfig;
use super::matcher::Matcher;
use crate::memo::{Match, MemoKey};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The outcome of evaluating one memo key.
#[derive(Debug)]
pub(crate) struct Proposal {
    pub key: MemoKey,
    pub new_match: Option<Match>,
    /// Memo entries the evaluation read
    pub deps: Vec<MemoKey>,
}

fn evaluate(matcher: &Matcher<'_>, key: MemoKey) -> Proposal {
    let mut deps = Vec::new();
    let new_match = matcher.match_memoized(key.clause, key.start, &mut deps);
    Proposal {
        key,
        new_match,
        deps,
    }
}

/// Evaluate a round's active keys, in parallel when the round is large
/// enough and the configuration allows it.
pub(crate) fn evaluate_round(
    matcher: &Matcher<'_>,
    active: &[MemoKey],
    config: &ParseConfig,
) -> Vec<Proposal> {
    #[cfg(feature = "parallel")]
    if config.parallel && active.len() >= config.parallel_threshold {
        return active.par_iter().map(|&key| evaluate(matcher, key)).collect();
    }
    #[cfg(not(feature = "parallel"))]
    let _ = config;

    active.iter().map(|&key| evaluate(matcher, key)).collect()
}
