use std::error::Error as StdError;

use ndarray::{Array2, ArrayView1, ArrayViewMut1, linalg::general_mat_vec_mul};
use thiserror::Error;

/// A linear map between discretized spaces `R^n -> R^m`.
///
/// Operators write into caller-supplied buffers so that iterative solvers
/// can reuse their work arrays across iterations.
pub trait LinearOperator {
    type Error: StdError + Send + Sync + 'static;

    /// Length `n` of domain vectors.
    fn domain_dim(&self) -> usize;

    /// Length `m` of range vectors.
    fn range_dim(&self) -> usize;

    /// Computes `out = A x`.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be applied to `x`.
    fn apply(&self, x: ArrayView1<'_, f64>, out: ArrayViewMut1<'_, f64>) -> Result<(), Self::Error>;

    /// Computes `out = A^T y`.
    ///
    /// # Errors
    ///
    /// Returns an error if the adjoint cannot be applied to `y`.
    fn apply_adjoint(
        &self,
        y: ArrayView1<'_, f64>,
        out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), Self::Error>;
}

/// Error returned when a vector does not match an operator's dimensions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("vector of length {actual} does not match operator dimension {expected}")]
pub struct DimensionError {
    pub expected: usize,
    pub actual: usize,
}

impl DimensionError {
    pub(crate) fn check(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self { expected, actual })
        }
    }
}

/// A dense matrix acting as a linear operator.
///
/// # Example
///
/// ```
/// use fnspace_solvers::{LinearOperator, MatrixOperator};
/// use ndarray::{Array1, array};
///
/// let op = MatrixOperator::new(array![[1.0, 2.0], [0.0, 1.0], [1.0, 0.0]]);
/// assert_eq!((op.domain_dim(), op.range_dim()), (2, 3));
///
/// let mut out = Array1::zeros(3);
/// op.apply(array![1.0, 1.0].view(), out.view_mut()).unwrap();
/// assert_eq!(out, array![3.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixOperator {
    matrix: Array2<f64>,
}

impl MatrixOperator {
    #[must_use]
    pub fn new(matrix: Array2<f64>) -> Self {
        Self { matrix }
    }

    #[must_use]
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }
}

impl LinearOperator for MatrixOperator {
    type Error = DimensionError;

    fn domain_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn range_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn apply(
        &self,
        x: ArrayView1<'_, f64>,
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), DimensionError> {
        DimensionError::check(self.domain_dim(), x.len())?;
        DimensionError::check(self.range_dim(), out.len())?;
        general_mat_vec_mul(1.0, &self.matrix, &x, 0.0, &mut out);
        Ok(())
    }

    fn apply_adjoint(
        &self,
        y: ArrayView1<'_, f64>,
        mut out: ArrayViewMut1<'_, f64>,
    ) -> Result<(), DimensionError> {
        DimensionError::check(self.range_dim(), y.len())?;
        DimensionError::check(self.domain_dim(), out.len())?;
        general_mat_vec_mul(1.0, &self.matrix.t(), &y, 0.0, &mut out);
        Ok(())
    }
}
