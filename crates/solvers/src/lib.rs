//! Iterative solvers for linear inverse problems over discretized function
//! spaces.
//!
//! Functions from `fnspace-core` are turned into plain vectors with
//! [`sample`], and operators between such vectors implement
//! [`LinearOperator`]. The solvers report progress to an
//! [`Observer`](fnspace_core::Observer), which may stop them early.
//!
//! - [`landweber`]: gradient descent on the least-squares functional
//! - [`conjugate_gradient`]: conjugate gradient on the normal equations
//! - [`opnorm`]: operator norm estimation, used to pick a Landweber step

pub mod conjugate_gradient;
pub mod landweber;
pub mod opnorm;

mod operator;
mod sample;

pub use operator::{DimensionError, LinearOperator, MatrixOperator};
pub use sample::sample;

use ndarray::ArrayView1;

/// Euclidean norm of a vector.
pub(crate) fn norm(x: ArrayView1<'_, f64>) -> f64 {
    x.dot(&x).sqrt()
}
