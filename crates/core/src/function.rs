//! The evaluation protocol shared by all function-set vectors.
//!
//! A call goes through five steps:
//!
//! 1. Classify the input as a single domain point, a `(d, N)` coordinate
//!    array, or a meshgrid. Anything else is [`Error::InvalidInput`].
//! 2. Infer the output shape: a scalar for single points, `(N,)` for arrays
//!    and the broadcast shape for meshgrids.
//! 3. If bounds checking is enabled, test all points against the domain.
//! 4. Evaluate out of place, or in place into a caller-supplied buffer.
//! 5. Check the output shape and, with bounds checking, the output values
//!    against the range.
//!
//! The [`Function`] trait provides this protocol to any type exposing a
//! function set and an expression tree.

use ndarray::{Array2, ArrayD, ArrayViewD, ArrayViewMutD, IxDyn};
use tracing::trace;

use crate::{
    Error, FunctionSet, Input, Points, Result,
    expr::Expr,
    points::{is_valid_input_array, is_valid_input_meshgrid},
    set::{Domain, Range, ValueOf},
};

/// Options for a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallOptions {
    /// Test inputs against the domain and outputs against the range.
    pub bounds_check: bool,
}

impl CallOptions {
    /// Options with bounds checking disabled.
    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            bounds_check: false,
        }
    }
}

impl Default for CallOptions {
    fn default() -> Self {
        Self { bounds_check: true }
    }
}

/// The result of an out-of-place evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Output<S> {
    /// The value at a single domain point.
    Scalar(S),
    /// Values at a batch of points, shaped like the batch.
    Array(ArrayD<S>),
}

impl<S> Output<S> {
    /// Returns the scalar value, if this is one.
    pub fn scalar(self) -> Option<S> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Array(_) => None,
        }
    }

    /// Returns the array of values, if this is one.
    pub fn array(self) -> Option<ArrayD<S>> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values),
        }
    }

    /// Converts into an array, wrapping a scalar as a one-element array.
    pub fn into_array(self) -> ArrayD<S>
    where
        S: Clone,
    {
        match self {
            Self::Scalar(value) => ArrayD::from_elem(IxDyn(&[1]), value),
            Self::Array(values) => values,
        }
    }
}

/// A function that can be evaluated on points of its domain.
///
/// Implementors supply their function set and expression tree. Evaluation
/// is provided.
///
/// # Example
///
/// ```
/// use fnspace_core::{Callable, Function, FunctionSet, Output};
/// use fnspace_core::set::{IntervalProd, RealNumbers};
/// use ndarray::array;
///
/// let set = FunctionSet::new(IntervalProd::interval(0.0, 1.0), RealNumbers);
/// let f = set.element(Callable::out_of_place(|x| Ok(x.coord(0) * 2.0)));
///
/// assert_eq!(f.call(&[0.25]).unwrap(), Output::Scalar(0.5));
///
/// let x = array![0.0, 0.5, 1.0];
/// let values = f.call(&x).unwrap().array().unwrap();
/// assert_eq!(values, array![0.0, 1.0, 2.0].into_dyn());
/// ```
pub trait Function {
    type Domain: Domain;
    type Range: Range;

    /// The set this function belongs to.
    fn function_set(&self) -> &FunctionSet<Self::Domain, Self::Range>;

    /// The expression tree evaluated on calls.
    fn expr(&self) -> &Expr<ValueOf<Self::Range>>;

    /// Whether calls evaluate whole batches at once.
    fn is_vectorized(&self) -> bool {
        self.expr().is_vectorized()
    }

    /// Whether the underlying callable accepts an output buffer.
    fn call_has_out(&self) -> bool {
        self.expr().call_has_out()
    }

    /// Whether the underlying callable's output buffer is optional.
    fn call_out_optional(&self) -> bool {
        self.expr().call_out_optional()
    }

    /// Evaluates with bounds checking.
    ///
    /// # Errors
    ///
    /// See [`Function::call_with`].
    fn call<'a>(&self, x: impl Into<Input<'a>>) -> Result<Output<ValueOf<Self::Range>>> {
        self.call_with(x, &CallOptions::default())
    }

    /// Evaluates into a newly allocated result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `x` is not a point, a `(d, N)`
    /// array or a meshgrid of the domain's dimension,
    /// [`Error::OutOfDomain`] or [`Error::OutOfRange`] if a bounds check
    /// fails, [`Error::MissingCapability`] if a set cannot run the check, and
    /// [`Error::ShapeMismatch`] if the callable returns a misshapen array.
    /// Errors raised by the callable itself are passed through.
    fn call_with<'a>(
        &self,
        x: impl Into<Input<'a>>,
        options: &CallOptions,
    ) -> Result<Output<ValueOf<Self::Range>>> {
        let input = x.into();
        let set = self.function_set();
        let points = classify(set, &input)?;
        check_domain(set, &points, options)?;

        let expected = points.out_shape();
        trace!(shape = ?expected, single = points.is_single(), "evaluating out of place");

        let mut values = self.expr().call_out_of_place(&points.batch)?;
        if values.shape() != expected.as_slice() {
            if expected == [1] && values.len() == 1 {
                values = values
                    .into_shape_with_order(IxDyn(&[1]))
                    .map_err(|_| Error::shape(&expected, &[]))?;
            } else {
                return Err(Error::shape(&expected, values.shape()));
            }
        }
        check_range(set, values.view(), options)?;

        if points.is_single() {
            let value = values
                .iter()
                .next()
                .copied()
                .ok_or_else(|| Error::shape(&[1], values.shape()))?;
            Ok(Output::Scalar(value))
        } else {
            Ok(Output::Array(values))
        }
    }

    /// Evaluates into `out` with bounds checking.
    ///
    /// # Errors
    ///
    /// See [`Function::call_into_with`].
    fn call_into<'a>(
        &self,
        x: impl Into<Input<'a>>,
        out: ArrayViewMutD<'_, ValueOf<Self::Range>>,
    ) -> Result<()> {
        self.call_into_with(x, out, &CallOptions::default())
    }

    /// Evaluates into a caller-supplied buffer.
    ///
    /// A single point writes into a buffer of shape `(1,)`. The buffer may
    /// already have been written to when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUsage`] for non-vectorized functions,
    /// [`Error::ShapeMismatch`] if `out` does not match the inferred shape,
    /// and the errors of [`Function::call_with`] otherwise.
    fn call_into_with<'a>(
        &self,
        x: impl Into<Input<'a>>,
        mut out: ArrayViewMutD<'_, ValueOf<Self::Range>>,
        options: &CallOptions,
    ) -> Result<()> {
        let input = x.into();
        let set = self.function_set();
        let points = classify(set, &input)?;
        check_domain(set, &points, options)?;

        if !self.is_vectorized() {
            return Err(Error::usage(
                "output parameter cannot be used for a non-vectorized function",
            ));
        }

        let expected = points.out_shape();
        if out.shape() != expected.as_slice() {
            return Err(Error::shape(&expected, out.shape()));
        }
        trace!(shape = ?expected, "evaluating in place");

        self.expr().call_in_place(&points.batch, out.view_mut())?;
        check_range(set, out.view(), options)
    }
}

/// Classified evaluation points.
struct Classified<'a> {
    batch: Points<'a>,
    single: bool,
}

impl Classified<'_> {
    fn is_single(&self) -> bool {
        self.single
    }

    fn out_shape(&self) -> Vec<usize> {
        self.batch.out_shape()
    }
}

fn classify<'a, D: Domain, R: Range>(
    set: &FunctionSet<D, R>,
    input: &'a Input<'_>,
) -> Result<Classified<'a>> {
    let domain = set.domain();
    let ndim = domain.ndim();
    let invalid = || Error::InvalidInput {
        domain: domain.to_string(),
        ndim,
    };

    let (batch, single) = match input {
        Input::Point(point) if point.len() == ndim => {
            let column =
                Array2::from_shape_vec((ndim, 1), point.to_vec()).map_err(|_| invalid())?;
            (Points::array(column), true)
        }
        Input::Point(_) => return Err(invalid()),
        Input::Array(x) if is_valid_input_array(x, ndim) => {
            (Points::from_array(x, ndim).map_err(|_| invalid())?, false)
        }
        Input::Meshgrid(grid) if is_valid_input_meshgrid(grid, ndim) => {
            (Points::meshgrid(grid).map_err(|_| invalid())?, false)
        }
        Input::Array(_) | Input::Meshgrid(_) => return Err(invalid()),
    };
    Ok(Classified { batch, single })
}

fn check_domain<D: Domain, R: Range>(
    set: &FunctionSet<D, R>,
    points: &Classified<'_>,
    options: &CallOptions,
) -> Result<()> {
    if !options.bounds_check {
        return Ok(());
    }
    let domain = set.domain();
    match domain.contains_all(&points.batch) {
        Some(true) => Ok(()),
        Some(false) => Err(Error::OutOfDomain {
            domain: domain.to_string(),
        }),
        None => Err(Error::MissingCapability {
            set: domain.to_string(),
        }),
    }
}

fn check_range<D: Domain, R: Range>(
    set: &FunctionSet<D, R>,
    values: ArrayViewD<'_, ValueOf<R>>,
    options: &CallOptions,
) -> Result<()> {
    if !options.bounds_check {
        return Ok(());
    }
    let range = set.range();
    match range.contains_all(values) {
        Some(true) => Ok(()),
        Some(false) => Err(Error::OutOfRange {
            range: range.to_string(),
        }),
        None => Err(Error::MissingCapability {
            set: range.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    use crate::{
        Callable, Meshgrid, MeshgridOrder,
        set::{EuclideanSpace, Interval, IntervalProd, RealNumbers, Set},
    };

    /// A domain without bulk membership.
    #[derive(Debug, PartialEq)]
    struct Ball;

    impl std::fmt::Display for Ball {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("unit ball")
        }
    }

    impl Set for Ball {
        type Element = [f64];

        fn contains(&self, point: &[f64]) -> bool {
            point.iter().map(|v| v * v).sum::<f64>() <= 1.0
        }
    }

    impl Domain for Ball {
        fn ndim(&self) -> usize {
            2
        }
    }

    fn sum_of_coords() -> Callable<f64> {
        Callable::out_of_place(|x| Ok(x.coord(0) + x.coord(1)))
    }

    #[test]
    fn output_shapes_follow_input_kind() {
        let set = FunctionSet::new(EuclideanSpace::new(2), RealNumbers);
        let f = set.element(sum_of_coords());

        assert_eq!(f.call(&[1.0, 2.0]).unwrap(), Output::Scalar(3.0));

        let x = array![[0.0, 1.0, 2.0], [1.0, 1.0, 1.0]];
        assert_eq!(f.call(&x).unwrap(), Output::Array(array![1.0, 2.0, 3.0].into_dyn()));

        let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![10.0, 20.0, 30.0]]);
        let values = f.call(grid).unwrap().array().unwrap();
        assert_eq!(values.shape(), &[2, 3]);
        assert_eq!(values[[1, 2]], 31.0);
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        let set = FunctionSet::new(EuclideanSpace::new(2), RealNumbers);
        let f = set.element(sum_of_coords());

        assert!(matches!(f.call(&[1.0, 2.0, 3.0]), Err(Error::InvalidInput { ndim: 2, .. })));
        let wrong_rows = array![[0.0, 1.0, 2.0]];
        assert!(matches!(f.call(&wrong_rows), Err(Error::InvalidInput { .. })));
        let flat = array![0.0, 1.0];
        assert!(matches!(f.call(&flat), Err(Error::InvalidInput { .. })));
        let grid = Meshgrid::sparse(&[array![0.0, 1.0]]);
        assert!(matches!(f.call(grid), Err(Error::InvalidInput { .. })));
    }

    #[test]
    fn bounds_checks_can_be_disabled() {
        let set = FunctionSet::new(IntervalProd::interval(0.0, 1.0), Interval::unit());
        let f = set.element(Callable::out_of_place(|x| Ok(x.coord(0) * 2.0)));

        assert!(matches!(f.call(&[2.0]), Err(Error::OutOfDomain { .. })));
        assert!(matches!(f.call(&[0.75]), Err(Error::OutOfRange { .. })));
        assert_eq!(f.call_with(&[2.0], &CallOptions::unchecked()), Ok(Output::Scalar(4.0)));
        assert_eq!(f.call(&[0.25]), Ok(Output::Scalar(0.5)));
    }

    #[test]
    fn missing_bulk_membership_is_reported() {
        let set = FunctionSet::new(Ball, RealNumbers);
        let f = set.element(sum_of_coords());

        assert_eq!(
            f.call(&[0.5, 0.5]),
            Err(Error::MissingCapability {
                set: "unit ball".into()
            })
        );
        assert_eq!(f.call_with(&[0.5, 0.5], &CallOptions::unchecked()), Ok(Output::Scalar(1.0)));
    }

    #[test]
    fn misshapen_results_are_rejected() {
        let set = FunctionSet::new(EuclideanSpace::new(1), RealNumbers);
        let f = set.element(Callable::out_of_place(|_| Ok(array![1.0, 2.0].into_dyn())));
        let x = array![0.0, 1.0, 2.0];
        assert_eq!(f.call(&x), Err(Error::shape(&[3], &[2])));
    }

    #[test]
    fn zero_dimensional_result_for_single_point_is_accepted() {
        let set = FunctionSet::new(EuclideanSpace::new(1), RealNumbers);
        let f = set.element(Callable::out_of_place(|_| Ok(ArrayD::from_elem(IxDyn(&[]), 7.0))));
        assert_eq!(f.call(0.5), Ok(Output::Scalar(7.0)));
    }

    #[test]
    fn in_place_evaluation() {
        let set = FunctionSet::new(EuclideanSpace::new(2), RealNumbers);
        let f = set.element(sum_of_coords());
        let x = array![[0.0, 1.0], [2.0, 2.0]];

        let mut out = ArrayD::zeros(IxDyn(&[2]));
        f.call_into(&x, out.view_mut()).unwrap();
        assert_eq!(out, array![2.0, 3.0].into_dyn());

        let mut wrong = ArrayD::zeros(IxDyn(&[3]));
        assert_eq!(f.call_into(&x, wrong.view_mut()), Err(Error::shape(&[2], &[3])));

        let g = set.element(Callable::pointwise(|p: &[f64]| p[0]));
        assert!(matches!(
            g.call_into(&x, out.view_mut()),
            Err(Error::InvalidUsage { .. })
        ));
    }

    #[test]
    fn pointwise_and_vectorized_agree_on_dense_grids() {
        let set = FunctionSet::new(EuclideanSpace::new(2), RealNumbers);
        let vectorized =
            set.element(Callable::out_of_place(|x| Ok(x.coord(0) + 10.0 * x.coord(1))));
        let pointwise = set.element(Callable::pointwise(|p: &[f64]| p[0] + 10.0 * p[1]));

        let vecs = [array![0.0, 0.0, 1.0], array![5.0, 6.0]];
        for order in [MeshgridOrder::C, MeshgridOrder::F] {
            let expected = vectorized.call(Meshgrid::dense(&vecs, order)).unwrap();
            let actual = pointwise.call(Meshgrid::dense(&vecs, order)).unwrap();
            assert_eq!(actual, expected, "{order:?}");
        }

        let values = pointwise
            .call(Meshgrid::dense(&vecs, MeshgridOrder::F))
            .unwrap()
            .into_array();
        assert_eq!(values, array![[50.0, 50.0, 51.0], [60.0, 60.0, 61.0]].into_dyn());
    }

    #[test]
    fn scalar_output_becomes_one_element_array() {
        assert_eq!(Output::Scalar(2.5).into_array(), array![2.5].into_dyn());
        assert_eq!(Output::<f64>::Array(array![1.0].into_dyn()).scalar(), None);
    }
}
