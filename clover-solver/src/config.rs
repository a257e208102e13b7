//! Engine Configuration.
//!
//! Process-wide tunables; they persist across queries on the same
//! [`crate::Engine`].

/// Tunable parameters for propagation and search.
#[derive(Debug, Clone)]
pub struct Config {
    /// Narrowing-operation budget per top-level propagation round.
    pub max_narrowing_ops: usize,
    /// Significant digits used by the `small` width test and as the default
    /// search precision.
    pub precision: u32,
    /// Relative width shrinkage below which an update does not count as
    /// progress once the budget is exhausted. Heuristic; exposed because its
    /// choice trades propagation effort against enclosure tightness.
    pub narrowing_threshold: f64,
    /// Bit budget for exact rationals before degradation to floats.
    pub max_rational_bits: u64,
    /// Emit a tracing event for every narrowing, not just watched intervals.
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_narrowing_ops: 3000,
            precision: 6,
            narrowing_threshold: 0.1,
            max_rational_bits: 512,
            verbose: false,
        }
    }
}

impl Config {
    /// Absolute width below which an interval counts as `small` at the
    /// configured precision: `10^-precision`.
    #[must_use]
    pub fn small_width(&self) -> f64 {
        10f64.powi(-(self.precision as i32))
    }
}
