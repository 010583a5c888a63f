#![no_main]
use libfuzzer_sys::fuzz_target;
use pika::parser::{ParseConfig, Parser};
use pika::testing::{arithmetic_grammar, precedence_grammar};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    let grammar = precedence_grammar();
    let table = Parser::new(&grammar).parse(input);
    assert!(table.metrics().converged);

    // Every match must lie inside the input and map back to valid text
    for m in table.all_matches("E").unwrap() {
        assert!(m.end() <= table.input_len());
        let _ = table.match_text(&m);
        let _ = table.to_ast(&m, "expr");
    }
    let errors = table.syntax_errors(&["E"]).unwrap();
    assert!(errors.windows(2).all(|w| w[0].end < w[1].start));

    // Sequential evaluation must agree with the parallel default
    let grammar = arithmetic_grammar();
    let parallel = Parser::with_config(
        &grammar,
        ParseConfig {
            parallel_threshold: 1,
            ..ParseConfig::default()
        },
    )
    .parse(input);
    let sequential = Parser::with_config(
        &grammar,
        ParseConfig {
            parallel: false,
            ..ParseConfig::default()
        },
    )
    .parse(input);
    assert_eq!(
        parallel.all_matches("Sum").unwrap(),
        sequential.all_matches("Sum").unwrap()
    );
});
