//! Grammar expression trees
//!
//! [`Expr`] is the uncompiled form of a clause: an owned tree in which other
//! rules are referenced by name. [`GrammarBuilder`](super::GrammarBuilder)
//! turns rules made of `Expr`s into the shared clause graph the parser runs
//! on.

use crate::clause::CharSet;
use compact_str::CompactString;

/// Grammar expression representing the right-hand side of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    // Terminals
    /// Match one character from a set
    CharSet(CharSet),
    /// Match a literal string
    CharSeq {
        text: CompactString,
        ignore_case: bool,
    },
    /// Match the empty string (always succeeds)
    Nothing,
    /// Match the start of input
    Start,

    // Combinators
    /// Sequence: match all expressions in order
    Seq(Vec<Expr>),
    /// Ordered choice: the first expression that matches wins
    First(Vec<Expr>),
    /// Longest choice: the expression with the longest match wins
    Longest(Vec<Expr>),
    /// One or more repetitions
    OneOrMore(Box<Expr>),
    /// Positive lookahead
    FollowedBy(Box<Expr>),
    /// Negative lookahead
    NotFollowedBy(Box<Expr>),
    /// Reference to a rule by name
    RuleRef(CompactString),

    // Tree construction
    /// Attach an AST label to an expression
    Label {
        name: CompactString,
        expr: Box<Expr>,
    },
}

// Builder methods
impl Expr {
    /// Match one specific character
    #[must_use]
    pub fn char(c: char) -> Self {
        Self::CharSet(CharSet::single(c))
    }

    /// Match one character in the inclusive range
    #[must_use]
    pub fn char_range(start: char, end: char) -> Self {
        Self::CharSet(CharSet::range(start, end))
    }

    /// Match any one of the given characters
    #[must_use]
    pub fn one_of(chars: &str) -> Self {
        Self::CharSet(CharSet::of(chars))
    }

    /// Match one character from a set
    #[must_use]
    pub const fn char_set(set: CharSet) -> Self {
        Self::CharSet(set)
    }

    /// Match any single character
    #[must_use]
    pub fn any_char() -> Self {
        Self::CharSet(CharSet::any())
    }

    /// Match a literal string
    #[must_use]
    pub fn str(text: impl Into<CompactString>) -> Self {
        Self::CharSeq {
            text: text.into(),
            ignore_case: false,
        }
    }

    /// Match a literal string, ignoring case
    #[must_use]
    pub fn str_ignore_case(text: impl Into<CompactString>) -> Self {
        Self::CharSeq {
            text: text.into(),
            ignore_case: true,
        }
    }

    #[must_use]
    pub const fn nothing() -> Self {
        Self::Nothing
    }

    #[must_use]
    pub const fn start() -> Self {
        Self::Start
    }

    /// Reference a rule by name
    #[must_use]
    pub fn rule(name: impl Into<CompactString>) -> Self {
        Self::RuleRef(name.into())
    }

    /// Create a sequence expression
    #[must_use]
    pub fn seq<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 {
            vec.remove(0)
        } else {
            Self::Seq(vec)
        }
    }

    /// Create an ordered choice expression
    #[must_use]
    pub fn first<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 {
            vec.remove(0)
        } else {
            Self::First(vec)
        }
    }

    /// Create a longest-match choice expression
    #[must_use]
    pub fn longest<I>(exprs: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut vec: Vec<_> = exprs.into_iter().collect();
        if vec.len() == 1 {
            vec.remove(0)
        } else {
            Self::Longest(vec)
        }
    }

    /// One or more repetitions (`e+`)
    #[must_use]
    pub fn one_or_more(expr: Self) -> Self {
        Self::OneOrMore(Box::new(expr))
    }

    /// Zero or more repetitions (`e*`), as `e+ / ()`
    #[must_use]
    pub fn zero_or_more(expr: Self) -> Self {
        Self::First(vec![Self::one_or_more(expr), Self::Nothing])
    }

    /// Optional expression (`e?`), as `e / ()`
    #[must_use]
    pub fn optional(expr: Self) -> Self {
        Self::First(vec![expr, Self::Nothing])
    }

    /// Positive lookahead (`&e`)
    #[must_use]
    pub fn followed_by(expr: Self) -> Self {
        Self::FollowedBy(Box::new(expr))
    }

    /// Negative lookahead (`!e`)
    #[must_use]
    pub fn not_followed_by(expr: Self) -> Self {
        Self::NotFollowedBy(Box::new(expr))
    }

    /// Attach an AST label
    #[must_use]
    pub fn label(name: impl Into<CompactString>, expr: Self) -> Self {
        Self::Label {
            name: name.into(),
            expr: Box::new(expr),
        }
    }

    /// Split off the outermost label, if any.
    ///
    /// Directly nested labels collapse to the outermost one.
    #[must_use]
    pub fn into_labeled(self) -> (Option<CompactString>, Self) {
        match self {
            Self::Label { name, expr } => {
                let (_, inner) = expr.into_labeled();
                (Some(name), inner)
            }
            other => (None, other),
        }
    }

    /// Sub-expressions in order
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Seq(exprs) | Self::First(exprs) | Self::Longest(exprs) => exprs,
            Self::OneOrMore(expr)
            | Self::FollowedBy(expr)
            | Self::NotFollowedBy(expr)
            | Self::Label { expr, .. } => std::slice::from_ref(expr.as_ref()),
            Self::CharSet(_) | Self::CharSeq { .. } | Self::Nothing | Self::Start | Self::RuleRef(_) => {
                &[]
            }
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Self] {
        match self {
            Self::Seq(exprs) | Self::First(exprs) | Self::Longest(exprs) => exprs,
            Self::OneOrMore(expr)
            | Self::FollowedBy(expr)
            | Self::NotFollowedBy(expr)
            | Self::Label { expr, .. } => std::slice::from_mut(expr.as_mut()),
            Self::CharSet(_) | Self::CharSeq { .. } | Self::Nothing | Self::Start | Self::RuleRef(_) => {
                &mut []
            }
        }
    }

    /// Count the references to rule `name` in this expression
    #[must_use]
    pub fn count_references(&self, name: &str) -> usize {
        match self {
            Self::RuleRef(n) => usize::from(n.as_str() == name),
            other => other
                .children()
                .iter()
                .map(|e| e.count_references(name))
                .sum(),
        }
    }

    /// Replace every reference to `from` with a reference to `to`
    pub fn rename_references(&mut self, from: &str, to: &str) {
        match self {
            Self::RuleRef(n) if n.as_str() == from => *n = to.into(),
            other => {
                for child in other.children_mut() {
                    child.rename_references(from, to);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_seq_collapses() {
        assert_eq!(Expr::seq([Expr::char('a')]), Expr::char('a'));
        assert_eq!(Expr::first([Expr::rule("A")]), Expr::rule("A"));
    }

    #[test]
    fn test_optional_is_first_with_nothing() {
        assert_eq!(
            Expr::optional(Expr::char('a')),
            Expr::First(vec![Expr::char('a'), Expr::Nothing])
        );
    }

    #[test]
    fn test_nested_labels_keep_outermost() {
        let expr = Expr::label("outer", Expr::label("inner", Expr::char('x')));
        let (label, inner) = expr.into_labeled();
        assert_eq!(label.as_deref(), Some("outer"));
        assert_eq!(inner, Expr::char('x'));
    }

    #[test]
    fn test_rename_references() {
        let mut expr = Expr::seq([
            Expr::rule("E"),
            Expr::char('+'),
            Expr::label("rhs", Expr::rule("E")),
            Expr::rule("Other"),
        ]);
        assert_eq!(expr.count_references("E"), 2);
        expr.rename_references("E", "E[1..2]");
        assert_eq!(expr.count_references("E"), 0);
        assert_eq!(expr.count_references("E[1..2]"), 2);
        assert_eq!(expr.count_references("Other"), 1);
    }
}
