use std::time::Duration;

/// Configuration options for the parser.
///
/// # Example
///
/// ```rust
/// use pika::parser::ParseConfig;
///
/// // Use default configuration
/// let config = ParseConfig::default();
///
/// // Or customize it
/// let config = ParseConfig {
///     parallel: false,           // Evaluate every round on the calling thread
///     parallel_threshold: 256,   // Smallest round worth spreading over threads
///     max_rounds: Some(10_000),  // Stop early instead of running to the fixed point
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Evaluate large rounds on the rayon thread pool
    ///
    /// Only has an effect with the `parallel` feature.
    pub parallel: bool,

    /// Rounds with fewer active entries than this run sequentially
    pub parallel_threshold: usize,

    /// Upper bound on the number of rounds
    ///
    /// The matching loop always terminates on its own; this is a guard for
    /// inspecting partial results. When the bound is hit,
    /// [`ParseMetrics::converged`] is `false`.
    pub max_rounds: Option<usize>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 64,
            max_rounds: None,
        }
    }
}

/// Counters recorded for one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseMetrics {
    /// Wall-clock time of the whole parse
    pub parse_time: Duration,
    /// Rounds of the matching loop
    pub rounds: usize,
    /// Clause evaluations over all rounds
    pub evaluations: usize,
    /// Times a better match replaced the best match of an entry
    pub matches_installed: usize,
    /// Memo entries at the end of the parse
    pub memo_entries: usize,
    /// False if the loop was stopped by `max_rounds` before its fixed point
    pub converged: bool,
}
