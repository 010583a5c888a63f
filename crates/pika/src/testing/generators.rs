//! # Input Generators
//!
//! Grammar-guided input generation for property-based tests and fuzzing.
//!
//! ## Usage
//!
//! ```rust
//! use pika::testing::{GeneratorConfig, InputGenerator, arithmetic_grammar};
//!
//! let grammar = arithmetic_grammar();
//! let generator = InputGenerator::new(&grammar, GeneratorConfig::default());
//! let input = generator.generate("Sum", 7).unwrap();
//! assert!(input.chars().all(|c| c.is_ascii_digit() || c == '+'));
//! ```
//!
//! Generation walks the compiled clauses top-down and picks alternatives at
//! random, so inputs follow the shape of a rule. They are not guaranteed to
//! be accepted: ordered choice and lookaheads are not simulated.

use crate::clause::{ClauseId, ClauseKind};
use crate::grammar::Grammar;

/// Configuration for grammar-based input generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Rule references followed before generation stops descending
    pub max_depth: usize,
    /// Maximum number of repetitions for `OneOrMore`
    pub max_repetitions: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            max_repetitions: 4,
        }
    }
}

/// Generates strings shaped by a grammar's rules.
#[derive(Debug, Clone)]
pub struct InputGenerator<'g> {
    grammar: &'g Grammar,
    config: GeneratorConfig,
}

impl<'g> InputGenerator<'g> {
    #[must_use]
    pub const fn new(grammar: &'g Grammar, config: GeneratorConfig) -> Self {
        Self { grammar, config }
    }

    /// Generate one input for `rule`, or `None` if the grammar has no such
    /// rule. The same seed always gives the same input.
    #[must_use]
    pub fn generate(&self, rule: &str, seed: u64) -> Option<String> {
        let clause = self.grammar.rule(rule)?.clause();
        let mut rng = SimpleRng::with_seed(seed);
        let mut out = String::new();
        self.generate_clause(clause, 0, &mut out, &mut rng);
        Some(out)
    }

    fn generate_clause(&self, id: ClauseId, depth: usize, out: &mut String, rng: &mut SimpleRng) {
        if depth > self.config.max_depth {
            return;
        }
        let clause = self.grammar.clause(id);
        // Entering another rule's clause counts towards the depth limit
        let depth = depth + usize::from(!clause.rule_names().is_empty());

        match clause.kind() {
            ClauseKind::CharSet(set) => {
                if let Some(c) = set.sample(rng.next_u64()) {
                    out.push(c);
                }
            }
            ClauseKind::CharSeq { text, .. } => out.push_str(text),
            ClauseKind::Seq(slots) => {
                for slot in slots {
                    self.generate_clause(slot.clause, depth, out, rng);
                }
            }
            ClauseKind::First(slots) | ClauseKind::Longest(slots) if !slots.is_empty() => {
                // Past half the depth budget, prefer the last alternative,
                // which is usually the base case
                let idx = if depth * 2 > self.config.max_depth {
                    slots.len() - 1
                } else {
                    (rng.next_u64() % slots.len() as u64) as usize
                };
                self.generate_clause(slots[idx].clause, depth, out, rng);
            }
            ClauseKind::OneOrMore(slot) => {
                let reps = 1 + (rng.next_u64() % self.config.max_repetitions.max(1) as u64);
                for _ in 0..reps {
                    self.generate_clause(slot.clause, depth, out, rng);
                }
            }
            _ => {}
        }
    }
}

/// Simple RNG for deterministic generation
#[derive(Debug, Clone)]
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn with_seed(seed: u64) -> Self {
        // XorShift has a fixed point at zero
        Self {
            state: seed ^ 0x853c_49e6_748f_ea9b,
        }
    }

    fn next_u64(&mut self) -> u64 {
        // XorShift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}
