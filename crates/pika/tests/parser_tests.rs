//! Tests for the matching engine and memo table queries

use pika::ast::Span;
use pika::error::QueryError;
use pika::grammar::{Expr, Grammar, GrammarBuilder};
use pika::parser::{ParseConfig, Parser, parse};
use pika::testing::{arithmetic_grammar, precedence_grammar, word_list_grammar};

fn single_rule(expr: Expr) -> Grammar {
    GrammarBuilder::new().rule("R", expr).build().unwrap()
}

fn match_len(grammar: &Grammar, input: &str, start: usize) -> Option<usize> {
    let table = parse(grammar, input);
    let clause = grammar.rule("R").unwrap().clause();
    table.best_match(clause, start).map(|m| m.len())
}

#[test]
fn test_digits_stop_at_first_letter() {
    let grammar = GrammarBuilder::new()
        .rule("Digits", Expr::one_or_more(Expr::char_range('0', '9')))
        .build()
        .unwrap();
    let table = parse(&grammar, "123abc");

    let matches = table.non_overlapping_matches("Digits").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start(), 0);
    assert_eq!(matches[0].len(), 3);
    assert_eq!(table.non_match_positions("Digits").unwrap(), vec![3]);
}

#[test]
fn test_left_recursive_sum_covers_input() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "1+2+3");

    let matches = table.non_overlapping_matches("Sum").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(table.match_text(&matches[0]), "1+2+3");
    assert!(table.metrics().converged);
    assert!(table.metrics().rounds > 0);
    assert!(table.metrics().matches_installed > 0);
}

#[test]
fn test_left_recursion_nests_to_the_left() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "1+2+3");
    let sum = &table.non_overlapping_matches("Sum").unwrap()[0];

    // First alternative: Sum '+' Num
    assert_eq!(sum.index(), 0);
    let seq = &sum.sub_matches()[0];
    let inner = &seq.sub_matches()[0];
    assert_eq!(table.match_text(inner), "1+2");
    assert_eq!(table.match_text(&seq.sub_matches()[2]), "3");
}

#[test]
fn test_precedence_binds_multiplication_tighter() {
    let grammar = precedence_grammar();
    let table = parse(&grammar, "2+3*4");

    let e = table.non_overlapping_matches("E").unwrap();
    assert_eq!(e.len(), 1);
    assert_eq!(e[0].len(), 5);

    let e0 = grammar.rule("E[0]").unwrap().clause();
    let add = table.best_match(e0, 0).unwrap();
    let [left, _, right] = add.sub_matches() else {
        panic!("expected three sub-matches, got {}", add.sub_matches().len());
    };
    assert_eq!(table.match_text(left), "2");
    assert_eq!(table.match_text(right), "3*4");
}

#[test]
fn test_parentheses_wrap_to_lowest_level() {
    let grammar = precedence_grammar();
    let table = parse(&grammar, "(2+3)*4");
    let e1 = grammar.rule("E[1]").unwrap().clause();
    let mul = table.best_match(e1, 0).unwrap();
    assert_eq!(mul.len(), 7);
    assert_eq!(mul.index(), 0);
}

#[test]
fn test_positive_lookahead_consumes_nothing() {
    let grammar = single_rule(Expr::seq([
        Expr::char('x'),
        Expr::followed_by(Expr::char('y')),
    ]));
    assert_eq!(match_len(&grammar, "xy", 0), Some(1));
    assert_eq!(match_len(&grammar, "xz", 0), None);
}

#[test]
fn test_negative_lookahead_consumes_nothing() {
    let grammar = single_rule(Expr::seq([
        Expr::char('x'),
        Expr::not_followed_by(Expr::char('y')),
    ]));
    assert_eq!(match_len(&grammar, "xz", 0), Some(1));
    assert_eq!(match_len(&grammar, "x", 0), Some(1));
    assert_eq!(match_len(&grammar, "xy", 0), None);
}

/// `A <- 'x' !B`, `B <- B 'y' / 'y'`
fn lookahead_over_left_recursion() -> Grammar {
    GrammarBuilder::new()
        .rule(
            "A",
            Expr::seq([Expr::char('x'), Expr::not_followed_by(Expr::rule("B"))]),
        )
        .rule(
            "B",
            Expr::first([
                Expr::seq([Expr::rule("B"), Expr::char('y')]),
                Expr::char('y'),
            ]),
        )
        .build()
        .unwrap()
}

#[test]
fn test_negative_lookahead_over_left_recursion() {
    let grammar = lookahead_over_left_recursion();
    let a = grammar.rule("A").unwrap().clause();
    let b = grammar.rule("B").unwrap().clause();
    assert!(grammar.clause(a).stratum() > grammar.clause(b).stratum());

    let table = parse(&grammar, "xy");
    let b_matches = table.all_matches("B").unwrap();
    assert_eq!(b_matches.len(), 1);
    assert_eq!((b_matches[0].start(), b_matches[0].len()), (1, 1));
    assert!(table.best_match(a, 0).is_none());
    assert!(table.all_matches("A").unwrap().is_empty());

    let table = parse(&grammar, "xyyy");
    assert_eq!(table.best_match(b, 1).map(|m| m.len()), Some(3));
    assert!(table.best_match(a, 0).is_none());

    let table = parse(&grammar, "xz");
    assert_eq!(table.best_match(a, 0).map(|m| m.len()), Some(1));
}

#[test]
fn test_negative_lookahead_over_left_recursion_in_parallel() {
    let grammar = lookahead_over_left_recursion();
    let a = grammar.rule("A").unwrap().clause();
    let config = ParseConfig {
        parallel: true,
        parallel_threshold: 0,
        ..ParseConfig::default()
    };
    let parser = Parser::with_config(&grammar, config);
    assert!(parser.parse("xyy").best_match(a, 0).is_none());
    assert_eq!(parser.parse("xx").best_match(a, 0).map(|m| m.len()), Some(1));
}

#[test]
fn test_end_of_input_rule_matches_at_end() {
    let grammar = GrammarBuilder::new()
        .rule("Eof", Expr::not_followed_by(Expr::any_char()))
        .build()
        .unwrap();
    let table = parse(&grammar, "ab");
    let matches = table.non_overlapping_matches("Eof").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start(), 2);
    assert!(matches[0].is_empty());
    assert_eq!(table.all_matches("Eof").unwrap().len(), 1);
    assert_eq!(table.non_match_positions("Eof").unwrap(), vec![0, 1]);
    assert_eq!(table.syntax_errors(&["Eof"]).unwrap(), vec![Span::new(0, 2)]);

    let eof = grammar.rule("Eof").unwrap().clause();
    assert!(table.best_match(eof, 2).is_some());
    assert!(table.best_match(eof, 3).is_none());
    assert_eq!(table.span_text(Span::new(2, 2)), "");
}

#[test]
fn test_nothing_matches_at_every_position_including_end() {
    let grammar = single_rule(Expr::nothing());
    let table = parse(&grammar, "ab");
    let starts: Vec<usize> = table
        .non_overlapping_matches("R")
        .unwrap()
        .iter()
        .map(|m| m.start())
        .collect();
    assert_eq!(starts, vec![0, 1, 2]);
}

#[test]
fn test_repeated_nothing_terminates_with_empty_match() {
    let grammar = single_rule(Expr::one_or_more(Expr::nothing()));
    let table = parse(&grammar, "abc");
    let clause = grammar.rule("R").unwrap().clause();
    let m = table.best_match(clause, 1).unwrap();
    assert!(m.is_empty());
    assert!(table.metrics().converged);
}

#[test]
fn test_ordered_choice_keeps_first_alternative() {
    let grammar = single_rule(Expr::first([Expr::str("ab"), Expr::str("abc")]));
    assert_eq!(match_len(&grammar, "abc", 0), Some(2));

    let grammar = single_rule(Expr::longest([Expr::str("ab"), Expr::str("abc")]));
    assert_eq!(match_len(&grammar, "abc", 0), Some(3));
}

#[test]
fn test_ordered_choice_falls_through() {
    let grammar = single_rule(Expr::first([Expr::str("abd"), Expr::str("ab")]));
    let table = parse(&grammar, "abc");
    let clause = grammar.rule("R").unwrap().clause();
    let m = table.best_match(clause, 0).unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.index(), 1);
}

#[test]
fn test_ignore_case_literal() {
    let grammar = single_rule(Expr::str_ignore_case("select"));
    assert_eq!(match_len(&grammar, "SeLeCt", 0), Some(6));
    assert_eq!(match_len(&grammar, "selext", 0), None);
}

#[test]
fn test_start_anchor_matches_only_at_zero() {
    let grammar = single_rule(Expr::seq([Expr::start(), Expr::char('a')]));
    let table = parse(&grammar, "aa");
    let matches = table.all_matches("R").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start(), 0);
}

#[test]
fn test_lexical_rule_seeds_word_boundaries() {
    let grammar = word_list_grammar();
    let table = parse(&grammar, "ab  cd");
    let words = table.non_overlapping_matches("Words").unwrap();
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].len(), 6);

    let texts: Vec<&str> = table
        .non_overlapping_matches("Word")
        .unwrap()
        .iter()
        .map(|m| table.match_text(m))
        .collect();
    assert_eq!(texts, ["ab", "cd"]);
}

#[test]
fn test_lexical_rule_skips_unlexable_chars() {
    let grammar = word_list_grammar();
    let table = parse(&grammar, "ab 1 cd");
    // '1' is no lexeme; the pass steps over it and resumes at the next char
    let texts: Vec<&str> = table
        .non_overlapping_matches("Word")
        .unwrap()
        .iter()
        .map(|m| table.match_text(m))
        .collect();
    assert_eq!(texts, ["ab", "cd"]);
    assert_eq!(table.syntax_errors(&["Words"]).unwrap(), vec![Span::new(2, 5)]);
}

#[test]
fn test_positions_are_characters() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "é1+2");
    let matches = table.non_overlapping_matches("Sum").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].start(), 1);
    assert_eq!(table.match_text(&matches[0]), "1+2");
    assert_eq!(table.input_len(), 4);
}

#[test]
fn test_syntax_errors_are_uncovered_spans() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "1+2 x 3");
    assert_eq!(table.syntax_errors(&["Sum"]).unwrap(), vec![Span::new(3, 6)]);
    assert_eq!(table.span_text(Span::new(3, 6)), " x ");

    let table = parse(&grammar, "1+2");
    assert!(table.syntax_errors(&["Sum"]).unwrap().is_empty());
}

#[test]
fn test_all_matches_overlap() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "1+2");
    let starts: Vec<usize> = table
        .all_matches("Sum")
        .unwrap()
        .iter()
        .map(|m| m.start())
        .collect();
    assert_eq!(starts, vec![0, 2]);
}

#[test]
fn test_unknown_rule_query() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "1");
    assert_eq!(
        table.non_overlapping_matches("Product").unwrap_err(),
        QueryError::UnknownRule {
            name: "Product".into()
        }
    );
    assert!(table.syntax_errors(&["Sum", "Product"]).is_err());
}

#[test]
fn test_empty_input() {
    let grammar = arithmetic_grammar();
    let table = parse(&grammar, "");
    assert!(table.non_overlapping_matches("Sum").unwrap().is_empty());
    assert!(table.syntax_errors(&["Sum"]).unwrap().is_empty());
    assert!(table.metrics().converged);

    let grammar = single_rule(Expr::optional(Expr::char('a')));
    let table = parse(&grammar, "");
    let matches = table.non_overlapping_matches("R").unwrap();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].is_empty());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let grammar = precedence_grammar();
    let input = "1+2*(3+4)*5+6*7+(8*9+1)*2";
    let sequential = Parser::with_config(
        &grammar,
        ParseConfig {
            parallel: false,
            ..ParseConfig::default()
        },
    )
    .parse(input);
    let parallel = Parser::with_config(
        &grammar,
        ParseConfig {
            parallel: true,
            parallel_threshold: 0,
            ..ParseConfig::default()
        },
    )
    .parse(input);

    for rule in grammar.rules() {
        let a = sequential.all_matches(rule.name()).unwrap();
        let b = parallel.all_matches(rule.name()).unwrap();
        assert_eq!(a, b, "rule {}", rule.name());
    }
    assert_eq!(sequential.metrics().rounds, parallel.metrics().rounds);
    assert_eq!(sequential.len(), parallel.len());
}
