/// Indicates how the iteration terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran all configured iterations.
    Complete,
    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of a Landweber solve.
///
/// The iterate itself is updated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// How the iteration terminated.
    pub status: Status,
    /// Number of completed iterations.
    pub iterations: usize,
    /// Norm of `rhs - A x` at the final iterate.
    pub residual_norm: f64,
}
