//! Conjugate gradient on the normal equations (CGN).
//!
//! Minimizes `||A x - rhs||` by running conjugate gradient on
//! `A^T A x = A^T rhs` without forming `A^T A`. Each iteration costs one
//! application of `A` and one of `A^T`. In exact arithmetic the method
//! terminates after at most `n` iterations for an `n`-dimensional domain.

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

/// Control actions supported by the conjugate gradient solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Stop the iteration and keep the current iterate.
    StopEarly,
}

/// Event emitted after each conjugate gradient update.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    /// Iteration counter, starting at 1.
    pub iter: usize,
    /// The updated iterate.
    pub x: ArrayView1<'a, f64>,
    /// Norm of `A^T (rhs - A x)` at the updated iterate.
    pub normal_residual_norm: f64,
}

/// Solves the normal equations, updating `x` in place.
///
/// The iteration stops when the normal residual norm is at most
/// `config.residual_tol` or when the search direction is annihilated by
/// `A`; both report [`Status::Converged`].
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

    // r = rhs - A x
    let mut r = Array1::zeros(op.range_dim());
    op.apply(x.view(), r.view_mut()).map_err(Error::operator)?;
    r.zip_mut_with(&rhs, |r, &b| *r = b - *r);

    // s = A^T r, p = s
    let mut s = Array1::zeros(op.domain_dim());
    op.apply_adjoint(r.view(), s.view_mut())
        .map_err(Error::operator)?;
    let mut p = s.clone();
    let mut q = Array1::zeros(op.range_dim());

    let mut sqnorm_s = s.dot(&s);
    if sqnorm_s.sqrt() <= config.residual_tol {
        return Ok(converged(0, sqnorm_s));
    }

    for iter in 1..=config.iterations {
        op.apply(p.view(), q.view_mut()).map_err(Error::operator)?;
        let sqnorm_q = q.dot(&q);
        if sqnorm_q == 0.0 {
            return Ok(converged(iter - 1, sqnorm_s));
        }

        let a = sqnorm_s / sqnorm_q;
        x.scaled_add(a, &p);
        r.scaled_add(-a, &q);

        op.apply_adjoint(r.view(), s.view_mut())
            .map_err(Error::operator)?;
        let sqnorm_s_new = s.dot(&s);
        let b = sqnorm_s_new / sqnorm_s;
        sqnorm_s = sqnorm_s_new;

        // p = s + b p
        p.zip_mut_with(&s, |p, &s| *p = s + b * *p);

        let normal_residual_norm = norm(s.view());
        debug!(iter, normal_residual_norm, "conjugate gradient iteration");

        let event = Event {
            iter,
            x: x.view(),
            normal_residual_norm,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                iterations: iter,
                normal_residual_norm,
            });
        }

        if normal_residual_norm <= config.residual_tol {
            return Ok(converged(iter, sqnorm_s));
        }
    }

    Ok(Solution {
        status: Status::Complete,
        iterations: config.iterations,
        normal_residual_norm: sqnorm_s.sqrt(),
    })
}

/// Solves the normal equations without observation.
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

fn converged(iterations: usize, sqnorm_s: f64) -> Solution {
    Solution {
        status: Status::Converged,
        iterations,
        normal_residual_norm: sqnorm_s.sqrt(),
    }
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

    use crate::MatrixOperator;

    #[test]
    fn solves_square_system_in_n_steps() {
        let op = MatrixOperator::new(array![[4.0, 1.0], [1.0, 3.0]]);
        let rhs = array![1.0, 2.0];
        let mut x = Array1::zeros(2);

        let solution = solve_unobserved(&op, &mut x, rhs.view(), &Config::default()).unwrap();

        assert_eq!(solution.status, Status::Converged);
        assert!(solution.iterations <= 3);
        assert_relative_eq!(x[0], 1.0 / 11.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 7.0 / 11.0, epsilon = 1e-10);
    }

    #[test]
    fn least_squares_for_overdetermined_system() {
        // Fit y = c0 + c1 t through (0, 1), (1, 2), (2, 2).
        let op = MatrixOperator::new(array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0]]);
        let rhs = array![1.0, 2.0, 2.0];
        let mut x = Array1::zeros(2);

        let solution = solve_unobserved(&op, &mut x, rhs.view(), &Config::default()).unwrap();

        assert_eq!(solution.status, Status::Converged);
        assert_relative_eq!(x[0], 7.0 / 6.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 0.5, epsilon = 1e-10);
    }

    #[test]
    fn exact_start_converges_immediately() {
        let op = MatrixOperator::new(array![[2.0, 0.0], [0.0, 2.0]]);
        let rhs = array![2.0, 4.0];
        let mut x = array![1.0, 2.0];

        let solution = solve_unobserved(&op, &mut x, rhs.view(), &Config::default()).unwrap();
        assert_eq!(solution.status, Status::Converged);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn iteration_limit_and_observer() {
        let op = MatrixOperator::new(array![[3.0, 1.0, 0.0], [1.0, 2.0, 1.0], [0.0, 1.0, 1.0]]);
        let rhs = array![1.0, 0.0, 1.0];

        let mut x = Array1::zeros(3);
        let config = Config {
            iterations: 1,
            residual_tol: 0.0,
        };
        let solution = solve_unobserved(&op, &mut x, rhs.view(), &config).unwrap();
        assert_eq!(solution.status, Status::Complete);
        assert_eq!(solution.iterations, 1);

        let mut x = Array1::zeros(3);
        let mut seen = 0;
        let solution = solve(&op, &mut x, rhs.view(), &Config::default(), |event: &Event<'_>| {
            seen = event.iter;
            Some(Action::StopEarly)
        })
        .unwrap();
        assert_eq!(solution.status, Status::StoppedByObserver);
        assert_eq!(solution.iterations, 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn rejects_negative_tolerance() {
        let op = MatrixOperator::new(array![[1.0]]);
        let rhs = array![1.0];
        let mut x = Array1::zeros(1);
        let config = Config {
            iterations: 10,
            residual_tol: -1.0,
        };
        assert!(matches!(
            solve_unobserved(&op, &mut x, rhs.view(), &config),
            Err(Error::InvalidConfig { .. })
        ));
    }
}
