//! # Abstract Syntax Trees
//!
//! Labeled trees extracted from a match.
//!
//! ## Overview
//!
//! Only labeled matches become nodes. A match is labeled when the child
//! position it fills carries a label, or else when its clause carries one
//! (the label of the rule it defines). Unlabeled matches are transparent:
//! their labeled descendants attach to the nearest labeled ancestor.
//!
//! ```rust
//! use pika::grammar::{Expr, GrammarBuilder};
//! use pika::parser::parse;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "Sum",
//!         Expr::first([
//!             Expr::label("add", Expr::seq([Expr::rule("Sum"), Expr::char('+'), Expr::rule("Num")])),
//!             Expr::rule("Num"),
//!         ]),
//!     )
//!     .rule("Num", Expr::label("num", Expr::one_or_more(Expr::char_range('0', '9'))))
//!     .build()?;
//!
//! let table = parse(&grammar, "1+2+3");
//! let sum = table.non_overlapping_matches("Sum")?;
//! let ast = table.to_ast(&sum[0], "expr");
//! assert_eq!(ast.to_string(), "(expr (add (add (num 1) (num 2)) (num 3)))");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::clause::ClauseKind;
use crate::memo::{Match, MemoTable};
use compact_str::CompactString;
use std::fmt;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A half-open range of character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A labeled node of an abstract syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AstNode {
    pub label: CompactString,
    pub span: Span,
    /// The input text the node spans
    pub text: CompactString,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub(crate) fn from_match(table: &MemoTable<'_>, m: &Match, root_label: &str) -> Self {
        let mut root = Self::new(table, m, root_label);
        collect_children(table, m, &mut root.children);
        root
    }

    fn new(table: &MemoTable<'_>, m: &Match, label: &str) -> Self {
        Self {
            label: CompactString::from(label),
            span: Span::new(m.start(), m.end()),
            text: CompactString::from(table.match_text(m)),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The first child with the given label
    #[must_use]
    pub fn child(&self, label: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.label == label)
    }

    /// All descendants (and this node) with the given label, in pre-order
    #[must_use]
    pub fn find_all(&self, label: &str) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.label == label {
                out.push(node);
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Indented multi-line rendering, one node per line.
    #[must_use]
    pub fn to_tree_string(&self) -> String {
        fn write(node: &AstNode, depth: usize, out: &mut String) {
            use std::fmt::Write as _;
            let _ = writeln!(
                out,
                "{:indent$}{} {}: {:?}",
                "",
                node.label,
                node.span,
                node.text.as_str(),
                indent = depth * 2
            );
            for child in &node.children {
                write(child, depth + 1, out);
            }
        }

        let mut out = String::new();
        write(self, 0, &mut out);
        out
    }
}

/// S-expression form: leaves show their text, inner nodes their children.
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.label)?;
        if self.children.is_empty() {
            write!(f, " {}", self.text)?;
        }
        for child in &self.children {
            write!(f, " {child}")?;
        }
        f.write_str(")")
    }
}

/// Add the AST nodes of `m`'s sub-matches to `out`.
fn collect_children(table: &MemoTable<'_>, m: &Match, out: &mut Vec<AstNode>) {
    let grammar = table.grammar();
    let subs = m.sub_matches();
    match grammar.clause(m.clause()).kind() {
        ClauseKind::Seq(slots) => {
            for (slot, sub) in slots.iter().zip(subs) {
                collect(table, sub, slot.label.as_deref(), out);
            }
        }
        ClauseKind::First(slots) | ClauseKind::Longest(slots) => {
            if let (Some(slot), Some(sub)) = (slots.get(m.index()), subs.first()) {
                collect(table, sub, slot.label.as_deref(), out);
            }
        }
        ClauseKind::OneOrMore(slot) => {
            if let Some(head) = subs.first() {
                collect(table, head, slot.label.as_deref(), out);
            }
            // The tail is more repetitions of this clause, not a nested one
            if let Some(tail) = subs.get(1) {
                collect_children(table, tail, out);
            }
        }
        _ => {}
    }
}

fn collect(table: &MemoTable<'_>, m: &Match, slot_label: Option<&str>, out: &mut Vec<AstNode>) {
    let label = slot_label.or_else(|| table.grammar().clause(m.clause()).ast_label());
    match label {
        Some(label) => {
            let mut node = AstNode::new(table, m, label);
            collect_children(table, m, &mut node.children);
            out.push(node);
        }
        None => collect_children(table, m, out),
    }
}
