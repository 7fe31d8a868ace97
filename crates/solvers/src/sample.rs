use fnspace_core::{Function, Input, MeshgridOrder, Output, Result, set::ValueOf};
use ndarray::{Array1, ArrayD};

/// Evaluates `f` and flattens the values into a discrete vector.
///
/// On a meshgrid the first coordinate varies slowest, whichever
/// [`MeshgridOrder`] the grid uses, so the same vector comes out of a
/// pointwise and a vectorized function. Arrays of points keep their column
/// order. A single point gives a vector of length one.
///
/// # Errors
///
/// Returns the evaluation error of `f`, for example when `x` lies outside
/// its domain.
///
/// # Example
///
/// ```
/// use fnspace_core::{Callable, FunctionSpace, Meshgrid};
/// use fnspace_core::set::IntervalProd;
/// use fnspace_solvers::sample;
/// use ndarray::array;
///
/// let space = FunctionSpace::new(IntervalProd::rectangle([0.0, 0.0], [1.0, 1.0]));
/// let f = space.element(Callable::pointwise(|x: &[f64]| x[0] + 10.0 * x[1]));
///
/// let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![0.0, 0.5]]);
/// assert_eq!(sample(&f, grid).unwrap(), array![0.0, 5.0, 1.0, 6.0]);
/// ```
pub fn sample<'a, F: Function>(
    f: &F,
    x: impl Into<Input<'a>>,
) -> Result<Array1<ValueOf<F::Range>>> {
    let input = x.into();
    let order = match &input {
        Input::Meshgrid(grid) => grid.order(),
        Input::Point(_) | Input::Array(_) => MeshgridOrder::C,
    };
    Ok(match f.call(input)? {
        Output::Scalar(value) => Array1::from_elem(1, value),
        Output::Array(values) => flatten(&values, order),
    })
}

/// Flattens grid values so the first coordinate varies slowest.
fn flatten<S: Clone>(values: &ArrayD<S>, order: MeshgridOrder) -> Array1<S> {
    match order {
        MeshgridOrder::C => values.iter().cloned().collect(),
        MeshgridOrder::F => values.t().iter().cloned().collect(),
    }
}
