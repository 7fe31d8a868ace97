/// Indicates how the solver terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The normal residual dropped below the tolerance, or the search
    /// direction vanished.
    Converged,
    /// Ran all configured iterations without converging.
    Complete,
    /// Stopped early due to an observer action.
    StoppedByObserver,
}

/// The result of a conjugate gradient solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    pub status: Status,
    /// Number of completed iterations.
    pub iterations: usize,
    /// Norm of `A^T (rhs - A x)` at the final iterate.
    pub normal_residual_norm: f64,
}
