//! Rule reference resolution.

use super::{Expr, RuleDef};
use crate::clause::{Clause, ClauseId, ClauseKind};
use crate::error::GrammarError;
use compact_str::CompactString;
use hashbrown::HashMap;

/// Fail on the first reference to a rule name that is not defined.
pub(crate) fn check_references(
    rules: &[RuleDef],
    index: &HashMap<CompactString, usize, ahash::RandomState>,
) -> Result<(), GrammarError> {
    fn walk(
        expr: &Expr,
        rule: &RuleDef,
        index: &HashMap<CompactString, usize, ahash::RandomState>,
    ) -> Result<(), GrammarError> {
        if let Expr::RuleRef(name) = expr
            && !index.contains_key(name)
        {
            return Err(GrammarError::UnknownRule {
                name: name.clone(),
                referenced_from: rule.name.clone(),
            });
        }
        expr.children().iter().try_for_each(|e| walk(e, rule, index))
    }

    rules.iter().try_for_each(|rule| walk(&rule.expr, rule, index))
}

/// Replace every rule reference with the clause it names.
///
/// `rule_clauses[i]` is the interned body of rule `i` and is updated in
/// place when that body is itself a reference to another rule. Reference
/// clauses stay in the arena but become unreachable.
pub(crate) fn resolve(
    clauses: &mut [Clause],
    rule_names: &[CompactString],
    rule_clauses: &mut [ClauseId],
    index: &HashMap<CompactString, usize, ahash::RandomState>,
) -> Result<(), GrammarError> {
    let follow = |start: ClauseId, mut chain: Vec<CompactString>| -> Result<ClauseId, GrammarError> {
        let mut id = start;
        while let ClauseKind::RuleRef(name) = &clauses[id.index()].kind {
            let seen = chain.contains(name);
            chain.push(name.clone());
            if seen {
                return Err(GrammarError::AliasCycle { chain });
            }
            let Some(&rule) = index.get(name) else {
                panic!("reference to undefined rule {name} reached resolution");
            };
            id = rule_clauses[rule];
        }
        Ok(id)
    };

    let mut resolved_rules = Vec::with_capacity(rule_clauses.len());
    for (name, &clause) in rule_names.iter().zip(rule_clauses.iter()) {
        resolved_rules.push(follow(clause, vec![name.clone()])?);
    }

    let targets = (0..clauses.len())
        .map(|i| follow(ClauseId::new(i), Vec::new()))
        .collect::<Result<Vec<_>, _>>()?;

    rule_clauses.copy_from_slice(&resolved_rules);
    for clause in clauses.iter_mut() {
        for slot in clause.kind.children_mut() {
            slot.clause = targets[slot.clause.index()];
        }
    }
    Ok(())
}
