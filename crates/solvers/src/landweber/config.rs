/// Configuration for the Landweber iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Number of iterations to run.
    pub iterations: usize,
    /// Relaxation parameter. The iteration is stable for
    /// `0 < omega < 2 / ||A||^2`.
    pub omega: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: 100,
            omega: 1.0,
        }
    }
}

impl Config {
    /// Validates that the relaxation parameter is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns an error if `omega` is non-finite or not positive.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.omega.is_finite() || self.omega <= 0.0 {
            return Err("omega must be finite and positive");
        }
        Ok(())
    }
}
