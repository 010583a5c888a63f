use super::intern::ClauseInterner;
use super::{Expr, Grammar, Rule, RuleDef, analysis, precedence, resolve};
use crate::error::GrammarError;
use compact_str::CompactString;
use hashbrown::HashMap;
use log::{debug, warn};

/// Builder for constructing grammars
///
/// # Example
///
/// ```rust
/// use pika::grammar::{Expr, GrammarBuilder};
///
/// let grammar = GrammarBuilder::new()
///     .rule_with_precedence("E", 0, Expr::seq([Expr::rule("E"), Expr::char('+'), Expr::rule("E")]))
///     .rule_with_precedence("E", 1, Expr::char_range('0', '9'))
///     .build()
///     .expect("Failed to build grammar");
///
/// assert_eq!(grammar.rule("E[0]").unwrap().to_string(), "E[0] <- E[1] '+' E[1]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GrammarBuilder {
    rules: Vec<RuleDef>,
    lexical_rule: Option<CompactString>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, name: impl Into<CompactString>, expr: Expr) -> Self {
        self.rules.push(RuleDef::new(name, expr));
        self
    }

    /// Add one level of a precedence group.
    ///
    /// Every rule sharing `name` must be added this way, each with its own
    /// precedence. Inside a level, references to `name` itself bind to the
    /// levels with higher precedence.
    #[must_use]
    pub fn rule_with_precedence(
        mut self,
        name: impl Into<CompactString>,
        precedence: i32,
        expr: Expr,
    ) -> Self {
        self.rules
            .push(RuleDef::with_precedence(name, precedence, expr));
        self
    }

    #[must_use]
    pub fn rule_def(mut self, rule: RuleDef) -> Self {
        self.rules.push(rule);
        self
    }

    /// Designate the rule used for the lexical pre-pass.
    ///
    /// The rule is matched repeatedly from the start of the input, and
    /// terminals are then only seeded at the lexeme boundaries it finds. It
    /// must not be recursive.
    #[must_use]
    pub fn lexical_rule(mut self, name: impl Into<CompactString>) -> Self {
        self.lexical_rule = Some(name.into());
        self
    }

    /// Compile the configured rules into a grammar.
    ///
    /// # Errors
    ///
    /// Returns the first [`GrammarError`] found; see that type for the
    /// possible failures.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        if let Some(index) = self.rules.iter().position(|r| r.name.is_empty()) {
            return Err(GrammarError::UnnamedRule { index });
        }

        let rules = precedence::rewrite(self.rules)?;

        let mut index: HashMap<CompactString, usize, ahash::RandomState> = HashMap::default();
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.clone(), i).is_some() {
                return Err(GrammarError::DuplicateRule {
                    name: rule.name.clone(),
                });
            }
        }
        resolve::check_references(&rules, &index)?;

        let lexical_rule = self
            .lexical_rule
            .map(|name| {
                index
                    .get(&name)
                    .copied()
                    .ok_or(GrammarError::UnknownLexicalRule { rule: name })
            })
            .transpose()?;

        let names: Vec<CompactString> = rules.iter().map(|r| r.name.clone()).collect();
        let precedences: Vec<Option<i32>> = rules.iter().map(|r| r.precedence).collect();

        let mut interner = ClauseInterner::new();
        let mut roots = Vec::with_capacity(rules.len());
        let mut labels = Vec::with_capacity(rules.len());
        for rule in rules {
            let (clause, label) = interner.intern_rule(rule);
            roots.push(clause);
            labels.push(label);
        }
        let mut clauses = interner.clauses;
        let rodeo = interner.rodeo;

        resolve::resolve(&mut clauses, &names, &mut roots, &index)?;
        let mut clauses = analysis::compact_bottom_up(clauses, &mut roots);

        if let Some(lexical) = lexical_rule {
            analysis::check_lexical_acyclic(&clauses, roots[lexical], &names[lexical], &rodeo)?;
        }
        analysis::compute_match_flags(&mut clauses, &rodeo)?;
        analysis::mark_acyclic(&mut clauses, &rodeo)?;
        analysis::link_seed_parents(&mut clauses);

        for ((name, &root), label) in names.iter().zip(&roots).zip(&labels) {
            let clause = &mut clauses[root.index()];
            clause.rule_names.push(name.clone());
            let Some(label) = label else {
                continue;
            };
            match &clause.ast_label {
                None => clause.ast_label = Some(label.clone()),
                Some(existing) if existing != label => warn!(
                    "rules {} share one clause but carry different AST labels ({existing} and {label}); keeping {existing}",
                    clause.rule_names.join(", "),
                ),
                Some(_) => {}
            }
        }

        let rules: Vec<Rule> = names
            .into_iter()
            .zip(precedences)
            .zip(roots)
            .zip(labels)
            .map(|(((name, precedence), clause), ast_label)| Rule {
                definition: rodeo.resolve(&clauses[clause.index()].canonical).to_string(),
                name,
                precedence,
                clause,
                ast_label,
            })
            .collect();

        debug!(
            "compiled grammar: {} rules, {} clauses",
            rules.len(),
            clauses.len()
        );

        Ok(Grammar::from_parts(
            clauses,
            rules,
            lexical_rule,
            rodeo.into_reader(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::ClauseKind;

    #[test]
    fn test_empty_grammar_is_rejected() {
        assert_eq!(GrammarBuilder::new().build().unwrap_err(), GrammarError::NoRules);
    }

    #[test]
    fn test_unnamed_rule_is_rejected() {
        let err = GrammarBuilder::new()
            .rule("A", Expr::char('a'))
            .rule("", Expr::char('b'))
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UnnamedRule { index: 1 });
    }

    #[test]
    fn test_duplicate_rule_is_rejected() {
        let err = GrammarBuilder::new()
            .rule("A", Expr::char('a'))
            .rule("A", Expr::char('b'))
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { name: "A".into() });
    }

    #[test]
    fn test_synthetic_name_collision_is_rejected() {
        let err = GrammarBuilder::new()
            .rule_with_precedence("E", 0, Expr::char('a'))
            .rule_with_precedence("E", 1, Expr::char('b'))
            .rule("E[0]", Expr::char('c'))
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateRule { name: "E[0]".into() });
    }

    #[test]
    fn test_unknown_lexical_rule() {
        let err = GrammarBuilder::new()
            .rule("A", Expr::char('a'))
            .lexical_rule("Lex")
            .build()
            .unwrap_err();
        assert_eq!(err, GrammarError::UnknownLexicalRule { rule: "Lex".into() });
    }

    #[test]
    fn test_recursive_lexical_rule_is_rejected() {
        let err = GrammarBuilder::new()
            .rule(
                "Lex",
                Expr::first([
                    Expr::seq([Expr::char('('), Expr::rule("Lex"), Expr::char(')')]),
                    Expr::char('x'),
                ]),
            )
            .lexical_rule("Lex")
            .build()
            .unwrap_err();
        assert!(matches!(err, GrammarError::LexicalCycle { .. }));
    }

    #[test]
    fn test_shadowed_alternative_is_rejected() {
        let err = GrammarBuilder::new()
            .rule("F", Expr::first([Expr::nothing(), Expr::char('a')]))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            GrammarError::ShadowedAlternative {
                clause: "() / 'a'".into(),
                index: 0
            }
        );
    }

    #[test]
    fn test_no_rule_reference_survives() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::seq([Expr::rule("B"), Expr::rule("C")]))
            .rule("B", Expr::rule("C"))
            .rule("C", Expr::char('c'))
            .build()
            .unwrap();
        assert!(
            grammar
                .clauses_bottom_up()
                .iter()
                .all(|c| !matches!(c.kind(), ClauseKind::RuleRef(_)))
        );
        // Alias rules share their target's clause
        assert_eq!(
            grammar.rule("B").unwrap().clause(),
            grammar.rule("C").unwrap().clause()
        );
        let c = grammar.clause(grammar.rule("C").unwrap().clause());
        assert_eq!(c.rule_names(), &["B", "C"]);
    }

    #[test]
    fn test_clauses_are_bottom_up() {
        let grammar = GrammarBuilder::new()
            .rule(
                "A",
                Expr::seq([Expr::one_or_more(Expr::char('a')), Expr::rule("B")]),
            )
            .rule("B", Expr::optional(Expr::char('b')))
            .build()
            .unwrap();
        for (i, clause) in grammar.clauses_bottom_up().iter().enumerate() {
            for slot in clause.children() {
                assert!(slot.clause.index() < i);
            }
        }
    }

    #[test]
    fn test_rule_label_attaches_to_clause() {
        let grammar = GrammarBuilder::new()
            .rule(
                "Num",
                Expr::label("num", Expr::one_or_more(Expr::char_range('0', '9'))),
            )
            .build()
            .unwrap();
        let rule = grammar.rule("Num").unwrap();
        assert_eq!(rule.ast_label(), Some("num"));
        assert_eq!(grammar.clause(rule.clause()).ast_label(), Some("num"));
    }

    #[test]
    fn test_equal_bodies_intern_to_one_clause() {
        let grammar = GrammarBuilder::new()
            .rule("A", Expr::seq([Expr::char('x'), Expr::char('y')]))
            .rule("B", Expr::seq([Expr::char('x'), Expr::char('y')]))
            .build()
            .unwrap();
        assert_eq!(
            grammar.rule("A").unwrap().clause(),
            grammar.rule("B").unwrap().clause()
        );
        assert_eq!(grammar.num_clauses(), 3);
    }
}
