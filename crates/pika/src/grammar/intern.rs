//! Interning of clause trees by canonical form.
//!
//! Rule bodies are turned into clauses bottom-up, so every child is interned
//! (and its canonical form known) before its parent is rendered. Rule
//! references are still symbolic at this point and render as the rule name.

use super::{Expr, RuleDef};
use crate::clause::{ChildSlot, Clause, ClauseId, ClauseKind};
use compact_str::CompactString;
use hashbrown::HashMap;
use lasso::{Rodeo, Spur};

/// Clause arena under construction.
pub(crate) struct ClauseInterner {
    pub(crate) clauses: Vec<Clause>,
    pub(crate) rodeo: Rodeo,
    by_form: HashMap<Spur, ClauseId, ahash::RandomState>,
}

impl ClauseInterner {
    pub(crate) fn new() -> Self {
        Self {
            clauses: Vec::new(),
            rodeo: Rodeo::new(),
            by_form: HashMap::default(),
        }
    }

    /// Intern a rule body, returning its clause and the rule's AST label.
    pub(crate) fn intern_rule(&mut self, rule: RuleDef) -> (ClauseId, Option<CompactString>) {
        let (label, expr) = rule.expr.into_labeled();
        (self.intern_expr(expr), label)
    }

    fn intern_slot(&mut self, expr: Expr) -> ChildSlot {
        let (label, expr) = expr.into_labeled();
        ChildSlot {
            clause: self.intern_expr(expr),
            label,
        }
    }

    fn intern_slots(&mut self, exprs: Vec<Expr>) -> smallvec::SmallVec<[ChildSlot; 2]> {
        exprs.into_iter().map(|e| self.intern_slot(e)).collect()
    }

    pub(crate) fn intern_expr(&mut self, expr: Expr) -> ClauseId {
        let kind = match expr {
            Expr::CharSet(set) => ClauseKind::CharSet(set),
            Expr::CharSeq { text, ignore_case } => ClauseKind::CharSeq { text, ignore_case },
            Expr::Nothing => ClauseKind::Nothing,
            Expr::Start => ClauseKind::Start,
            Expr::RuleRef(name) => ClauseKind::RuleRef(name),
            Expr::Seq(exprs) => ClauseKind::Seq(self.intern_slots(exprs)),
            Expr::First(exprs) => ClauseKind::First(self.intern_slots(exprs)),
            Expr::Longest(exprs) => ClauseKind::Longest(self.intern_slots(exprs)),
            Expr::OneOrMore(expr) => ClauseKind::OneOrMore(self.intern_slot(*expr)),
            Expr::FollowedBy(expr) => ClauseKind::FollowedBy(self.intern_slot(*expr)),
            Expr::NotFollowedBy(expr) => ClauseKind::NotFollowedBy(self.intern_slot(*expr)),
            // A label anywhere but a rule root or a child position has
            // nothing to attach to.
            Expr::Label { expr, .. } => return self.intern_expr(*expr),
        };
        self.intern_kind(kind)
    }

    fn intern_kind(&mut self, kind: ClauseKind) -> ClauseId {
        let form = {
            let clauses = &self.clauses;
            let rodeo = &self.rodeo;
            kind.render(|id| {
                let child = &clauses[id.index()];
                (rodeo.resolve(&child.canonical), &child.kind)
            })
        };
        let spur = self.rodeo.get_or_intern(form);
        if let Some(&id) = self.by_form.get(&spur) {
            return id;
        }
        let id = ClauseId::new(self.clauses.len());
        self.clauses.push(Clause::new(kind, spur));
        self.by_form.insert(spur, id);
        id
    }
}
