// src/core/meter.rs — Token spend metering

/// Monotonic counter of consumed tokens with a budget predicate.
///
/// One meter lives for the whole optimization run and is charged by every
/// evaluator and mutator call. Not thread-safe by design: the search loops
/// are strictly sequential, and the budget is only enforced at call
/// boundaries, so actual spend can overshoot the budget by at most one
/// call's cost.
#[derive(Debug, Clone, Default)]
pub struct TokenMeter {
    total: u64,
}

impl TokenMeter {
    pub fn new() -> Self {
        Self { total: 0 }
    }

    /// Add a per-call cost. Negative contributions are clamped to zero so
    /// the counter is monotonically non-decreasing.
    pub fn add(&mut self, n: i64) {
        self.total += n.max(0) as u64;
    }

    pub fn snapshot(&self) -> u64 {
        self.total
    }

    /// True iff `budget` is unset or the running total is strictly below it.
    pub fn can(&self, budget: Option<u64>) -> bool {
        match budget {
            None => true,
            Some(b) => self.total < b,
        }
    }
}
