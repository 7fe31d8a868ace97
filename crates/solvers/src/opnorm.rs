//! Operator norm estimation by power iteration.
//!
//! Iterates `x <- A^T A x / ||A^T A x||` from a normalized constant vector.
//! The square root of `||A^T A x||` converges to the largest singular value
//! of `A`, as long as the start vector is not orthogonal to its singular
//! vector.

use std::error::Error as StdError;

use ndarray::Array1;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{LinearOperator, norm};

/// Configuration for [`estimate`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    pub iterations: usize,
    /// Stop once successive estimates differ by at most this fraction.
    pub rel_tol: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: 100,
            rel_tol: 1e-10,
        }
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns an error if `iterations` is zero or `rel_tol` is negative or
    /// non-finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.iterations == 0 {
            return Err("iterations must be positive");
        }
        if !self.rel_tol.is_finite() || self.rel_tol < 0.0 {
            return Err("rel_tol must be finite and non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error("operator application failed")]
    Operator(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    fn operator<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Operator(Box::new(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Successive estimates agreed within the tolerance.
    Converged,
    /// Ran all configured iterations.
    Complete,
}

/// An estimate of `||A||`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub status: Status,
    pub iterations: usize,
    pub norm: f64,
}

/// Estimates the operator norm of `op`.
///
/// # Errors
///
/// Returns an error if the config is invalid or applying the operator fails.
pub fn estimate<Op: LinearOperator>(op: &Op, config: &Config) -> Result<Estimate, Error> {
    config
        .validate()
        .map_err(|reason| Error::InvalidConfig { reason })?;

    let n = op.domain_dim();
    if n == 0 || op.range_dim() == 0 {
        return Ok(Estimate {
            status: Status::Converged,
            iterations: 0,
            norm: 0.0,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let mut x = Array1::from_elem(n, 1.0 / (n as f64).sqrt());
    let mut y = Array1::zeros(op.range_dim());
    let mut z = Array1::zeros(n);
    let mut previous = 0.0;

    for iter in 1..=config.iterations {
        op.apply(x.view(), y.view_mut()).map_err(Error::operator)?;
        op.apply_adjoint(y.view(), z.view_mut())
            .map_err(Error::operator)?;

        let z_norm = norm(z.view());
        let current = z_norm.sqrt();
        trace!(iter, estimate = current, "power iteration");

        if z_norm == 0.0 {
            return Ok(Estimate {
                status: Status::Converged,
                iterations: iter,
                norm: 0.0,
            });
        }
        if (current - previous).abs() <= config.rel_tol * current {
            debug!(iter, norm = current, "operator norm converged");
            return Ok(Estimate {
                status: Status::Converged,
                iterations: iter,
                norm: current,
            });
        }

        x.assign(&z);
        x /= z_norm;
        previous = current;
    }

    Ok(Estimate {
        status: Status::Complete,
        iterations: config.iterations,
        norm: previous,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    use crate::MatrixOperator;

    #[test]
    fn diagonal_operator() {
        let op = MatrixOperator::new(array![[3.0, 0.0], [0.0, 1.0]]);
        let estimate = estimate(&op, &Config::default()).unwrap();
        assert_eq!(estimate.status, Status::Converged);
        assert_relative_eq!(estimate.norm, 3.0, max_relative = 1e-8);
    }

    #[test]
    fn rectangular_operator() {
        // Singular values of this matrix are sqrt(3) and 1.
        let op = MatrixOperator::new(array![[1.0, 1.0], [0.0, 1.0], [1.0, 0.0]]);
        let estimate = estimate(&op, &Config::default()).unwrap();
        assert_relative_eq!(estimate.norm, 3.0_f64.sqrt(), max_relative = 1e-8);
    }

    #[test]
    fn zero_operator() {
        let op = MatrixOperator::new(array![[0.0, 0.0]]);
        let estimate = estimate(&op, &Config::default()).unwrap();
        assert_eq!(estimate.status, Status::Converged);
        assert_eq!(estimate.norm, 0.0);
    }

    #[test]
    fn iteration_limit() {
        let op = MatrixOperator::new(array![[3.0, 0.0], [0.0, 2.9]]);
        let config = Config {
            iterations: 2,
            rel_tol: 0.0,
        };
        let estimate = estimate(&op, &config).unwrap();
        assert_eq!(estimate.status, Status::Complete);
        assert_eq!(estimate.iterations, 2);
        assert!(estimate.norm > 2.9 && estimate.norm <= 3.0);
    }

    #[test]
    fn rejects_zero_iterations() {
        let op = MatrixOperator::new(array![[1.0]]);
        let config = Config {
            iterations: 0,
            rel_tol: 1e-6,
        };
        assert!(matches!(
            estimate(&op, &config),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
