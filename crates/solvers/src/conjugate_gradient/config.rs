/// Configuration for the conjugate gradient solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Maximum number of iterations.
    pub iterations: usize,
    /// Stop once `||A^T (rhs - A x)||` is at most this value.
    pub residual_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: 100,
            residual_tol: 1e-12,
        }
    }
}

impl Config {
    /// Validates that the tolerance is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns an error if `residual_tol` is negative or non-finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.residual_tol.is_finite() || self.residual_tol < 0.0 {
            return Err("residual_tol must be finite and non-negative");
        }
        Ok(())
    }
}
