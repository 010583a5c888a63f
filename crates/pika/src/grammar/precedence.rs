//! Precedence climbing by rule rewriting.
//!
//! Given `E` at levels `p0 < p1 < ... < pN-1`, each level becomes a rule
//! named `E[pi]`. A self-reference inside level `i` is redirected to the
//! levels above it: `E[pi+1..pN-1]` (an ordered choice of those levels,
//! lowest first) or, when only one level is above, straight to `E[pN-1]`.
//! Self-references in the top level wrap around to `E` itself, which becomes
//! the ordered choice of every level.

use super::{Expr, RuleDef};
use crate::error::GrammarError;
use compact_str::{CompactString, format_compact};
use hashbrown::HashMap;

/// Rewrite precedence groups, returning the rules with every group expanded.
///
/// Output order follows the first appearance of each name in `rules`.
pub(crate) fn rewrite(rules: Vec<RuleDef>) -> Result<Vec<RuleDef>, GrammarError> {
    let mut order: Vec<CompactString> = Vec::new();
    let mut groups: HashMap<CompactString, Vec<RuleDef>, ahash::RandomState> = HashMap::default();
    for rule in rules {
        let group = groups.entry(rule.name.clone()).or_insert_with(|| {
            order.push(rule.name.clone());
            Vec::new()
        });
        group.push(rule);
    }

    let mut out = Vec::new();
    for name in order {
        let Some(mut group) = groups.remove(&name) else {
            continue;
        };

        if group.len() == 1 {
            let rule = group.remove(0);
            check_not_self_only(&rule)?;
            out.push(rule);
            continue;
        }

        // Several rules with one name must all carry distinct precedences
        if group.iter().any(|r| r.precedence.is_none()) {
            return Err(GrammarError::DuplicateRule { name });
        }
        group.sort_by_key(|r| r.precedence);
        if group
            .windows(2)
            .any(|pair| pair[0].precedence == pair[1].precedence)
        {
            return Err(GrammarError::DuplicateRule { name });
        }

        expand_group(&name, group, &mut out);
    }
    Ok(out)
}

fn check_not_self_only(rule: &RuleDef) -> Result<(), GrammarError> {
    let mut expr = &rule.expr;
    while let Expr::Label { expr: inner, .. } = expr {
        expr = inner.as_ref();
    }
    match expr {
        Expr::RuleRef(target) if *target == rule.name => Err(GrammarError::SelfReference {
            name: rule.name.clone(),
        }),
        _ => Ok(()),
    }
}

fn level_name(name: &str, precedence: Option<i32>) -> CompactString {
    match precedence {
        Some(p) => format_compact!("{name}[{p}]"),
        None => CompactString::from(name),
    }
}

/// `group` is sorted by ascending precedence and has at least two levels.
fn expand_group(name: &str, group: Vec<RuleDef>, out: &mut Vec<RuleDef>) {
    let precedences: Vec<Option<i32>> = group.iter().map(|r| r.precedence).collect();
    let levels: Vec<CompactString> = precedences.iter().map(|&p| level_name(name, p)).collect();
    let count = levels.len();
    let choice_of = |levels: &[CompactString]| {
        Expr::First(levels.iter().map(|l| Expr::rule(l.clone())).collect())
    };

    // The group name selects among all levels
    out.push(RuleDef::new(name, choice_of(&levels)));

    let mut selectors = Vec::new();
    for (i, mut rule) in group.into_iter().enumerate() {
        let target = match count - i - 1 {
            0 => CompactString::from(name),
            1 => levels[i + 1].clone(),
            _ => {
                let (lo, hi) = (precedences[i + 1], precedences[count - 1]);
                let selector = format_compact!(
                    "{name}[{}..{}]",
                    lo.unwrap_or_default(),
                    hi.unwrap_or_default()
                );
                if rule.expr.count_references(name) > 0 {
                    selectors.push(RuleDef::new(selector.clone(), choice_of(&levels[i + 1..])));
                }
                selector
            }
        };
        rule.expr.rename_references(name, &target);
        rule.name = levels[i].clone();
        out.push(rule);
    }
    out.extend(selectors);
}
