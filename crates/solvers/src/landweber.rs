//! Landweber iteration for linear inverse problems.
//!
//! Solves `A x = rhs` in the least-squares sense by gradient descent on
//! `||A x - rhs||^2 / 2`:
//!
//! ```text
//! x_{k+1} = x_k + omega * A^T (rhs - A x_k)
//! ```
//!
//! The iteration converges for `0 < omega < 2 / ||A||^2`; see
//! [`opnorm::estimate`](crate::opnorm::estimate) for a way to pick `omega`.
//!
//! # Example
//!
//! ```
//! use fnspace_solvers::{MatrixOperator, landweber};
//! use ndarray::{Array1, array};
//!
//! let op = MatrixOperator::new(array![[2.0, 0.0], [0.0, 1.0]]);
//! let rhs = array![2.0, 3.0];
//! let mut x = Array1::zeros(2);
//!
//! let config = landweber::Config { iterations: 200, omega: 0.4 };
//! let solution = landweber::solve_unobserved(&op, &mut x, rhs.view(), &config).unwrap();
//!
//! assert_eq!(solution.status, landweber::Status::Complete);
//! assert!((x[0] - 1.0).abs() < 1e-10 && (x[1] - 3.0).abs() < 1e-10);
//! ```

mod config;
mod error;
mod solution;

pub use config::Config;
pub use error::Error;
pub use solution::{Solution, Status};

use fnspace_core::Observer;
use ndarray::{Array1, ArrayView1};
use tracing::debug;

use crate::{LinearOperator, norm};

/// Control actions supported by the Landweber solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the iteration and keep the current iterate.
    StopEarly,
}

/// Event emitted after each Landweber update.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Iteration counter, starting at 1.
    pub iter: usize,
    /// The updated iterate.
    pub x: ArrayView1<'a, f64>,
    /// Norm of `rhs - A x` at the updated iterate.
    pub residual_norm: f64,
}

/// Runs the Landweber iteration, updating `x` in place.
///
/// # Observer
///
/// The observer receives an [`Event`] after each update and may return
/// [`Action::StopEarly`] to end the iteration.
///
/// # Errors
///
/// Returns an error if the config is invalid, if `x` or `rhs` do not match
/// the operator's dimensions, or if applying the operator fails.
pub fn solve<Op, Obs>(
    op: &Op,
    x: &mut Array1<f64>,
    rhs: ArrayView1<'_, f64>,
    config: &Config,
    mut observer: Obs,
) -> Result<Solution, Error>
where
    Op: LinearOperator,
    Obs: for<'a> Observer<Event<'a>, Action>,
{
    config
        .validate()
        .map_err(|reason| Error::InvalidConfig { reason })?;
    check_dimension("x", op.domain_dim(), x.len())?;
    check_dimension("rhs", op.range_dim(), rhs.len())?;

    let mut residual = Array1::zeros(op.range_dim());
    let mut gradient = Array1::zeros(op.domain_dim());
    let mut residual_norm = update_residual(op, x, rhs, &mut residual)?;

    for iter in 1..=config.iterations {
        op.apply_adjoint(residual.view(), gradient.view_mut())
            .map_err(Error::operator)?;
        x.scaled_add(config.omega, &gradient);
        residual_norm = update_residual(op, x, rhs, &mut residual)?;
        debug!(iter, residual_norm, "landweber iteration");

        let event = Event {
            iter,
            x: x.view(),
            residual_norm,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                iterations: iter,
                residual_norm,
            });
        }
    }

    Ok(Solution {
        status: Status::Complete,
        iterations: config.iterations,
        residual_norm,
    })
}

/// Runs the Landweber iteration without observation.
///
/// # Errors
///
/// Returns an error if the config is invalid, if `x` or `rhs` do not match
/// the operator's dimensions, or if applying the operator fails.
pub fn solve_unobserved<Op: LinearOperator>(
    op: &Op,
    x: &mut Array1<f64>,
    rhs: ArrayView1<'_, f64>,
    config: &Config,
) -> Result<Solution, Error> {
    solve(op, x, rhs, config, ())
}

/// Sets `residual = rhs - A x` and returns its norm.
fn update_residual<Op: LinearOperator>(
    op: &Op,
    x: &Array1<f64>,
    rhs: ArrayView1<'_, f64>,
    residual: &mut Array1<f64>,
) -> Result<f64, Error> {
    op.apply(x.view(), residual.view_mut())
        .map_err(Error::operator)?;
    residual.zip_mut_with(&rhs, |r, &b| *r = b - *r);
    Ok(norm(residual.view()))
}

fn check_dimension(name: &'static str, expected: usize, actual: usize) -> Result<(), Error> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::Dimension {
            name,
            expected,
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use ndarray::array;

    use crate::{DimensionError, MatrixOperator};

    fn diagonal() -> MatrixOperator {
        MatrixOperator::new(array![[2.0, 0.0], [0.0, 1.0]])
    }

    #[test]
    fn converges_for_stable_step() {
        let op = diagonal();
        let rhs = array![4.0, -1.0];
        let mut x = Array1::zeros(2);

        let config = Config {
            iterations: 300,
            omega: 0.3,
        };
        let solution = solve_unobserved(&op, &mut x, rhs.view(), &config).unwrap();

        assert_eq!(solution.status, Status::Complete);
        assert_eq!(solution.iterations, 300);
        assert_relative_eq!(x[0], 2.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], -1.0, epsilon = 1e-10);
        assert!(solution.residual_norm < 1e-10);
    }

    #[test]
    fn residual_decreases_monotonically() {
        let op = MatrixOperator::new(array![[1.0, 0.5], [0.5, 1.0], [0.0, 1.0]]);
        let rhs = array![1.0, 2.0, 3.0];
        let mut x = Array1::zeros(2);
        let mut norms = Vec::new();

        let config = Config {
            iterations: 20,
            omega: 0.5,
        };
        solve(&op, &mut x, rhs.view(), &config, |event: &Event<'_>| {
            norms.push(event.residual_norm);
            None
        })
        .unwrap();

        assert_eq!(norms.len(), 20);
        assert!(norms.windows(2).all(|w| w[1] <= w[0] + 1e-12));
    }

    #[test]
    fn observer_can_stop_early() {
        let op = diagonal();
        let rhs = array![1.0, 1.0];
        let mut x = Array1::zeros(2);

        let solution = solve(&op, &mut x, rhs.view(), &Config::default(), |event: &Event<'_>| {
            (event.iter == 3).then_some(Action::StopEarly)
        })
        .unwrap();

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.iterations, 3);
    }

    #[test]
    fn rejects_invalid_input() {
        let op = diagonal();
        let mut x = Array1::zeros(2);

        let config = Config {
            iterations: 1,
            omega: -1.0,
        };
        let rhs = array![1.0, 1.0];
        assert!(matches!(
            solve_unobserved(&op, &mut x, rhs.view(), &config),
            Err(Error::InvalidConfig { .. })
        ));

        let rhs = array![1.0, 1.0, 1.0];
        assert!(matches!(
            solve_unobserved(&op, &mut x, rhs.view(), &Config::default()),
            Err(Error::Dimension {
                name: "rhs",
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn operator_errors_are_wrapped() {
        struct Broken;

        impl LinearOperator for Broken {
            type Error = DimensionError;

            fn domain_dim(&self) -> usize {
                1
            }

            fn range_dim(&self) -> usize {
                1
            }

            fn apply(
                &self,
                _x: ArrayView1<'_, f64>,
                _out: ndarray::ArrayViewMut1<'_, f64>,
            ) -> Result<(), DimensionError> {
                Err(DimensionError {
                    expected: 0,
                    actual: 1,
                })
            }

            fn apply_adjoint(
                &self,
                _y: ArrayView1<'_, f64>,
                _out: ndarray::ArrayViewMut1<'_, f64>,
            ) -> Result<(), DimensionError> {
                Ok(())
            }
        }

        let mut x = Array1::zeros(1);
        let rhs = array![1.0];
        let error = solve_unobserved(&Broken, &mut x, rhs.view(), &Config::default()).unwrap_err();
        assert!(matches!(error, Error::Operator(_)));
    }
}
