//! # Clause Model
//!
//! The nodes of a compiled grammar.
//!
//! ## Overview
//!
//! A compiled grammar is an arena of [`Clause`]s addressed by [`ClauseId`].
//! Inter-clause references are ids, never owning pointers, because the graph
//! is cyclic whenever a rule recurses.
//!
//! Clauses come in two groups:
//!
//! - **Terminals** match directly against the input: [`ClauseKind::CharSet`],
//!   [`ClauseKind::CharSeq`], [`ClauseKind::Nothing`] and [`ClauseKind::Start`].
//!   They are never stored in the memo table.
//! - **Combinators** match through their children: `Seq`, `First`, `Longest`,
//!   `OneOrMore`, `FollowedBy` and `NotFollowedBy`.
//!
//! [`ClauseKind::RuleRef`] only exists while a grammar is being compiled.
//!
//! Each child reference is a [`ChildSlot`] which may carry an AST label for
//! that position. A clause may also carry its own AST label, inherited from
//! the rule it defines.

mod char_set;

pub use char_set::CharSet;

use compact_str::CompactString;
use smallvec::{SmallVec, smallvec};
use std::fmt::Write as _;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Index of a clause in its grammar's clause arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ClauseId(u32);

impl ClauseId {
    pub(crate) fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("clause arena exceeds u32::MAX entries"))
    }

    /// Position of the clause in the arena
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference from a parent clause to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildSlot {
    pub clause: ClauseId,
    /// AST label of this child position, if any
    pub label: Option<CompactString>,
}

impl ChildSlot {
    #[must_use]
    pub const fn new(clause: ClauseId) -> Self {
        Self {
            clause,
            label: None,
        }
    }

    #[must_use]
    pub fn labeled(clause: ClauseId, label: impl Into<CompactString>) -> Self {
        Self {
            clause,
            label: Some(label.into()),
        }
    }
}

/// The variant of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseKind {
    /// Matches one character in (or, inverted, not in) the set
    CharSet(CharSet),
    /// Matches a literal run of characters
    CharSeq {
        text: CompactString,
        ignore_case: bool,
    },
    /// Always matches, consuming nothing
    Nothing,
    /// Matches only at position 0, consuming nothing
    Start,
    /// All children in order
    Seq(SmallVec<[ChildSlot; 2]>),
    /// The first child (by index) that matches
    First(SmallVec<[ChildSlot; 2]>),
    /// The child with the longest match, lowest index on ties
    Longest(SmallVec<[ChildSlot; 2]>),
    /// One or more repetitions of the child
    OneOrMore(ChildSlot),
    /// Zero-width positive lookahead
    FollowedBy(ChildSlot),
    /// Zero-width negative lookahead
    NotFollowedBy(ChildSlot),
    /// Reference to a rule by name; removed during compilation
    RuleRef(CompactString),
}

impl ClauseKind {
    /// Child slots in order (empty for terminals and rule references)
    #[must_use]
    pub fn children(&self) -> &[ChildSlot] {
        match self {
            Self::Seq(slots) | Self::First(slots) | Self::Longest(slots) => slots,
            Self::OneOrMore(slot) | Self::FollowedBy(slot) | Self::NotFollowedBy(slot) => {
                std::slice::from_ref(slot)
            }
            Self::CharSet(_)
            | Self::CharSeq { .. }
            | Self::Nothing
            | Self::Start
            | Self::RuleRef(_) => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [ChildSlot] {
        match self {
            Self::Seq(slots) | Self::First(slots) | Self::Longest(slots) => slots,
            Self::OneOrMore(slot) | Self::FollowedBy(slot) | Self::NotFollowedBy(slot) => {
                std::slice::from_mut(slot)
            }
            Self::CharSet(_)
            | Self::CharSeq { .. }
            | Self::Nothing
            | Self::Start
            | Self::RuleRef(_) => &mut [],
        }
    }

    /// Terminals are matched directly against the input
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CharSet(_) | Self::CharSeq { .. } | Self::Nothing | Self::Start
        )
    }

    /// Binding strength used when rendering canonical forms.
    const fn precedence(&self) -> u8 {
        match self {
            Self::First(_) | Self::Longest(_) => 1,
            Self::Seq(_) => 2,
            Self::OneOrMore(_) | Self::FollowedBy(_) | Self::NotFollowedBy(_) => 3,
            Self::CharSet(_)
            | Self::CharSeq { .. }
            | Self::Nothing
            | Self::Start
            | Self::RuleRef(_) => 4,
        }
    }

    /// Render the canonical form of a clause of this kind.
    ///
    /// `child` returns the canonical form and kind of a child clause, which
    /// must already be rendered.
    pub(crate) fn render<'a>(
        &self,
        mut child: impl FnMut(ClauseId) -> (&'a str, &'a ClauseKind),
    ) -> String {
        let mut out = String::new();
        let mut render_slot = |out: &mut String, slot: &ChildSlot, parent_prec: u8| {
            let (form, kind) = child(slot.clause);
            let mut parent_prec = parent_prec;
            if let Some(label) = &slot.label {
                out.push_str(label);
                out.push(':');
                parent_prec = parent_prec.max(3);
            }
            if kind.precedence() <= parent_prec {
                out.push('(');
                out.push_str(form);
                out.push(')');
            } else {
                out.push_str(form);
            }
        };

        match self {
            Self::CharSet(set) => {
                let _ = write!(out, "{set}");
            }
            Self::CharSeq { text, ignore_case } => {
                out.push('"');
                for c in text.chars() {
                    let _ = write!(out, "{}", c.escape_debug());
                }
                out.push('"');
                if *ignore_case {
                    out.push('i');
                }
            }
            Self::Nothing => out.push_str("()"),
            Self::Start => out.push('^'),
            Self::RuleRef(name) => out.push_str(name),
            Self::Seq(slots) | Self::First(slots) | Self::Longest(slots) => {
                let separator = match self {
                    Self::Seq(_) => " ",
                    Self::First(_) => " / ",
                    _ => " | ",
                };
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        out.push_str(separator);
                    }
                    render_slot(&mut out, slot, self.precedence());
                }
            }
            Self::OneOrMore(slot) => {
                render_slot(&mut out, slot, self.precedence());
                out.push('+');
            }
            Self::FollowedBy(slot) => {
                out.push('&');
                render_slot(&mut out, slot, self.precedence());
            }
            Self::NotFollowedBy(slot) => {
                out.push('!');
                render_slot(&mut out, slot, self.precedence());
            }
        }
        out
    }
}

/// A node of a compiled grammar.
#[derive(Debug, Clone)]
pub struct Clause {
    pub(crate) kind: ClauseKind,
    /// Names of the rules this clause is the definition of
    pub(crate) rule_names: SmallVec<[CompactString; 1]>,
    pub(crate) ast_label: Option<CompactString>,
    pub(crate) canonical: lasso::Spur,
    pub(crate) always_matches: bool,
    pub(crate) can_match_zero: bool,
    pub(crate) acyclic: bool,
    /// Evaluation layer; a negative lookahead sits above the clause it reads
    pub(crate) stratum: u32,
    pub(crate) seed_parents: SmallVec<[ClauseId; 2]>,
}

impl Clause {
    pub(crate) fn new(kind: ClauseKind, canonical: lasso::Spur) -> Self {
        Self {
            kind,
            rule_names: SmallVec::new(),
            ast_label: None,
            canonical,
            always_matches: false,
            can_match_zero: false,
            acyclic: false,
            stratum: 0,
            seed_parents: SmallVec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &ClauseKind {
        &self.kind
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ChildSlot] {
        self.kind.children()
    }

    #[must_use]
    pub fn rule_names(&self) -> &[CompactString] {
        &self.rule_names
    }

    /// AST label carried by the clause itself (from the rule it defines)
    #[must_use]
    pub fn ast_label(&self) -> Option<&str> {
        self.ast_label.as_deref()
    }

    /// True if the clause matches zero characters at every position
    #[inline]
    #[must_use]
    pub const fn always_matches(&self) -> bool {
        self.always_matches
    }

    /// True if some match of the clause may consume zero characters
    #[inline]
    #[must_use]
    pub const fn can_match_zero(&self) -> bool {
        self.can_match_zero
    }

    /// True if no cycle is reachable from this clause
    #[inline]
    #[must_use]
    pub const fn is_acyclic(&self) -> bool {
        self.acyclic
    }

    /// Layer in which the engine evaluates this clause.
    ///
    /// A clause's stratum is at least that of each child, and strictly
    /// greater when the clause is a negative lookahead read from the memo
    /// table. The engine runs each stratum to a fixed point before the next,
    /// so such a lookahead only ever sees its child's final matches.
    #[inline]
    #[must_use]
    pub const fn stratum(&self) -> u32 {
        self.stratum
    }

    /// Parents to re-evaluate at a position when this clause matches there
    #[must_use]
    pub fn seed_parents(&self) -> &[ClauseId] {
        &self.seed_parents
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Whether matches of this clause live in the memo table.
    ///
    /// Terminals are matched directly and negative lookaheads are decided on
    /// demand, since a negative lookahead can go from matching to not
    /// matching as its child improves.
    #[inline]
    #[must_use]
    pub const fn is_memoized(&self) -> bool {
        !matches!(
            self.kind,
            ClauseKind::CharSet(_)
                | ClauseKind::CharSeq { .. }
                | ClauseKind::Nothing
                | ClauseKind::Start
                | ClauseKind::NotFollowedBy(_)
                | ClauseKind::RuleRef(_)
        )
    }

    /// Compute `(always_matches, can_match_zero)` from the children's flags.
    ///
    /// Children must have been tested already, except along back edges of a
    /// cycle, where the child's flags read as `false`.
    ///
    /// # Errors
    ///
    /// Returns the index of the offending alternative if a non-final
    /// alternative of a `First` always matches.
    pub(crate) fn test_always_matches(&self, clauses: &[Clause]) -> Result<(bool, bool), usize> {
        let child = |slot: &ChildSlot| &clauses[slot.clause.index()];
        Ok(match &self.kind {
            ClauseKind::Nothing => (true, true),
            ClauseKind::Start => (false, true),
            ClauseKind::CharSet(_) => (false, false),
            ClauseKind::CharSeq { text, .. } => (text.is_empty(), text.is_empty()),
            ClauseKind::Seq(slots) => (
                slots.iter().all(|s| child(s).always_matches),
                slots.iter().all(|s| child(s).can_match_zero),
            ),
            ClauseKind::First(slots) => {
                let last = slots.len().saturating_sub(1);
                if let Some(index) = slots[..last]
                    .iter()
                    .position(|s| child(s).always_matches)
                {
                    return Err(index);
                }
                (
                    slots.iter().any(|s| child(s).always_matches),
                    slots.iter().any(|s| child(s).can_match_zero),
                )
            }
            ClauseKind::Longest(slots) => (
                slots.iter().any(|s| child(s).always_matches),
                slots.iter().any(|s| child(s).can_match_zero),
            ),
            ClauseKind::OneOrMore(slot) => (child(slot).always_matches, child(slot).can_match_zero),
            ClauseKind::FollowedBy(slot) => (child(slot).always_matches, true),
            ClauseKind::NotFollowedBy(_) => (false, true),
            ClauseKind::RuleRef(name) => {
                panic!("unresolved rule reference {name} survived grammar compilation")
            }
        })
    }

    /// Children whose match at a position may make this clause match there.
    ///
    /// For a `Seq` this is the first child plus every following child
    /// reachable over children that can match zero characters. For `First`
    /// and `Longest` it is every alternative.
    pub(crate) fn seed_children(&self, clauses: &[Clause]) -> SmallVec<[ClauseId; 4]> {
        match &self.kind {
            ClauseKind::Seq(slots) => {
                let mut seeds = SmallVec::new();
                for slot in slots {
                    if !seeds.contains(&slot.clause) {
                        seeds.push(slot.clause);
                    }
                    if !clauses[slot.clause.index()].can_match_zero {
                        break;
                    }
                }
                seeds
            }
            ClauseKind::First(slots) | ClauseKind::Longest(slots) => {
                let mut seeds = SmallVec::new();
                for slot in slots {
                    if !seeds.contains(&slot.clause) {
                        seeds.push(slot.clause);
                    }
                }
                seeds
            }
            ClauseKind::OneOrMore(slot)
            | ClauseKind::FollowedBy(slot)
            | ClauseKind::NotFollowedBy(slot) => smallvec![slot.clause],
            ClauseKind::CharSet(_)
            | ClauseKind::CharSeq { .. }
            | ClauseKind::Nothing
            | ClauseKind::Start
            | ClauseKind::RuleRef(_) => SmallVec::new(),
        }
    }
}
