//! Evaluation inputs: single points, coordinate arrays, and meshgrids.
//!
//! Callers hand an [`Input`] to a function. Before any user code runs, the
//! input is classified against the domain dimension and normalized into a
//! [`Points`] batch, which is what vectorized callables receive.
//!
//! Two batch layouts are supported:
//!
//! - A coordinate array of shape `(d, N)`, one point per column. For 1-D
//!   domains a flat array of shape `(N,)` is accepted as well.
//! - A [`Meshgrid`]: `d` per-axis coordinate arrays that broadcast against
//!   each other, describing a grid without materializing every point.

use std::borrow::Cow;

use itertools::Itertools;
use ndarray::{
    Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Axis, CowArray, Ix2, IxDyn,
    ShapeBuilder,
};

use crate::Error;

/// Element ordering of a meshgrid, and of arrays allocated to match it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshgridOrder {
    /// Component `i` varies along axis `i` ("ij" indexing, row-major).
    #[default]
    C,
    /// Component `i` varies along axis `d - 1 - i` ("xy" indexing, column-major).
    F,
}

/// A length-`d` sequence of broadcastable per-axis coordinate arrays.
#[derive(Debug)]
pub struct Meshgrid<'a> {
    components: Vec<CowArray<'a, f64, IxDyn>>,
}

impl<'a> Meshgrid<'a> {
    /// Wraps existing component arrays without validating them.
    ///
    /// Use [`is_valid_input_meshgrid`] to check the components against a
    /// domain dimension.
    #[must_use]
    pub fn new(components: Vec<CowArray<'a, f64, IxDyn>>) -> Self {
        Self { components }
    }

    /// Wraps borrowed component views.
    #[must_use]
    pub fn from_views(views: Vec<ArrayViewD<'a, f64>>) -> Self {
        Self::new(views.into_iter().map(CowArray::from).collect())
    }

    /// Number of components, which is the dimension of the grid.
    #[must_use]
    pub fn ndim(&self) -> usize {
        self.components.len()
    }

    /// The component arrays.
    #[must_use]
    pub fn components(&self) -> &[CowArray<'a, f64, IxDyn>] {
        &self.components
    }

    /// Broadcast shape of the components, or `None` if they do not broadcast.
    #[must_use]
    pub fn shape(&self) -> Option<Vec<usize>> {
        let first = self.components.first()?;
        let ndim = first.ndim();
        if self.components.iter().any(|c| c.ndim() != ndim) {
            return None;
        }

        let mut shape = vec![1; ndim];
        for component in &self.components {
            for (target, &len) in shape.iter_mut().zip(component.shape()) {
                if *target == 1 {
                    *target = len;
                } else if len != 1 && len != *target {
                    return None;
                }
            }
        }
        Some(shape)
    }

    /// The axis along which component `i` varies, if it can be told.
    ///
    /// A component with a single non-unit axis varies along it. A dense
    /// component varies along the one axis whose slices are not all equal.
    /// Constant components are undecided.
    fn varying_axis(&self, i: usize) -> Option<usize> {
        let component = self.components[i].view();
        let shape = component.shape();
        let long: Vec<usize> = (0..shape.len()).filter(|&k| shape[k] > 1).collect();
        if long.len() <= 1 {
            return long.first().copied();
        }
        let varying: Vec<usize> =
            long.into_iter().filter(|&k| varies_along(&component, k)).collect();
        match varying.as_slice() {
            [k] => Some(*k),
            _ => None,
        }
    }

    /// Per-component axes and the ordering they imply.
    ///
    /// Undecided components take axis `i` on C-ordered grids and axis
    /// `d - 1 - i` on F-ordered ones.
    fn axes(&self) -> (Vec<usize>, MeshgridOrder) {
        let ndim = self.ndim();
        let found: Vec<Option<usize>> = (0..ndim).map(|i| self.varying_axis(i)).collect();
        let known: Vec<(usize, usize)> = found
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| axis.map(|axis| (i, axis)))
            .collect();

        let reversed = match known.as_slice() {
            [] => false,
            [(i, axis)] => axis != i && *axis == ndim - 1 - i,
            _ => known.iter().tuple_windows().all(|(a, b)| a.1 > b.1),
        };
        let axes = found
            .into_iter()
            .enumerate()
            .map(|(i, axis)| axis.unwrap_or(if reversed { ndim - 1 - i } else { i }))
            .collect();
        let order = if reversed {
            MeshgridOrder::F
        } else {
            MeshgridOrder::C
        };
        (axes, order)
    }

    /// Element ordering implied by the grid's indexing convention.
    ///
    /// Components oriented along increasing axes give [`MeshgridOrder::C`],
    /// decreasing axes give [`MeshgridOrder::F`].
    #[must_use]
    pub fn order(&self) -> MeshgridOrder {
        self.axes().1
    }

    /// Per-axis coordinate vectors, one per component.
    #[must_use]
    pub fn vecs(&self) -> Vec<Array1<f64>> {
        let (axes, _) = self.axes();
        self.components
            .iter()
            .zip(axes)
            .map(|(component, axis)| {
                component
                    .lanes(Axis(axis))
                    .into_iter()
                    .next()
                    .map_or_else(|| Array1::zeros(0), |lane| lane.to_owned())
            })
            .collect()
    }

    /// Iterates over the grid points.
    ///
    /// Points are produced in the logical (row-major) order of an array with
    /// the grid's broadcast [`shape`], so zipping them with
    /// `ndarray::ArrayBase::iter_mut` fills the array element by element.
    /// Coordinates are read from the broadcast components, so the result
    /// agrees with [`Points::coord`] for any valid grid.
    ///
    /// [`shape`]: Meshgrid::shape
    pub fn points(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        let shape = self.shape().unwrap_or_default();
        let views: Vec<ArrayViewD<'_, f64>> = self
            .components
            .iter()
            .filter_map(|component| component.broadcast(IxDyn(&shape)))
            .collect();
        let count = if views.is_empty() || views.len() != self.components.len() {
            0
        } else {
            shape.iter().product()
        };

        let mut iters: Vec<_> = views.into_iter().map(IntoIterator::into_iter).collect();
        std::iter::from_fn(move || {
            iters
                .iter_mut()
                .map(|values| values.next().copied())
                .collect::<Option<Vec<f64>>>()
        })
        .take(count)
    }
}

/// Returns `true` if the slices of `component` along `axis` are not all equal.
fn varies_along(component: &ArrayViewD<'_, f64>, axis: usize) -> bool {
    let first = component.index_axis(Axis(axis), 0);
    component.axis_iter(Axis(axis)).any(|slice| slice != first)
}

impl Meshgrid<'static> {
    /// Builds a sparse meshgrid from per-axis coordinate vectors.
    ///
    /// Component `i` has length `vecs[i].len()` along axis `i` and length one
    /// along every other axis.
    #[must_use]
    pub fn sparse(vecs: &[Array1<f64>]) -> Self {
        let ndim = vecs.len();
        let components = vecs
            .iter()
            .enumerate()
            .map(|(i, vec)| {
                let mut component = vec.to_owned().into_dyn();
                for _ in 0..i {
                    component = component.insert_axis(Axis(0));
                }
                for _ in i + 1..ndim {
                    component = component.insert_axis(Axis(i + 1));
                }
                CowArray::from(component)
            })
            .collect();
        Self { components }
    }

    /// Builds a dense meshgrid from per-axis coordinate vectors.
    ///
    /// With [`MeshgridOrder::C`], component `i` varies along axis `i`.
    /// With [`MeshgridOrder::F`], the axes are reversed.
    #[must_use]
    pub fn dense(vecs: &[Array1<f64>], order: MeshgridOrder) -> Self {
        let ndim = vecs.len();
        let axis_of = |i: usize| match order {
            MeshgridOrder::C => i,
            MeshgridOrder::F => ndim - 1 - i,
        };

        let mut shape = vec![0; ndim];
        for (i, vec) in vecs.iter().enumerate() {
            shape[axis_of(i)] = vec.len();
        }

        let components = vecs
            .iter()
            .enumerate()
            .map(|(i, vec)| {
                let axis = axis_of(i);
                let component = ArrayD::from_shape_fn(IxDyn(&shape), |index| vec[index[axis]]);
                CowArray::from(component)
            })
            .collect();
        Self { components }
    }
}

/// An evaluation argument as supplied by a caller.
#[derive(Debug)]
pub enum Input<'a> {
    /// A single domain element.
    Point(Cow<'a, [f64]>),
    /// A coordinate array of shape `(d, N)`, or `(N,)` for 1-D domains.
    Array(ArrayViewD<'a, f64>),
    /// A length-`d` meshgrid.
    Meshgrid(Meshgrid<'a>),
}

impl Input<'_> {
    /// Creates a point input from owned coordinates.
    #[must_use]
    pub fn point(coords: impl Into<Vec<f64>>) -> Input<'static> {
        Input::Point(Cow::Owned(coords.into()))
    }
}

impl From<f64> for Input<'_> {
    fn from(value: f64) -> Self {
        Input::Point(Cow::Owned(vec![value]))
    }
}

impl<'a> From<&'a [f64]> for Input<'a> {
    fn from(point: &'a [f64]) -> Self {
        Input::Point(Cow::Borrowed(point))
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Input<'a> {
    fn from(point: &'a [f64; N]) -> Self {
        Input::Point(Cow::Borrowed(point.as_slice()))
    }
}

impl<'a> From<ArrayViewD<'a, f64>> for Input<'a> {
    fn from(x: ArrayViewD<'a, f64>) -> Self {
        Input::Array(x)
    }
}

impl<'a> From<&'a ArrayD<f64>> for Input<'a> {
    fn from(x: &'a ArrayD<f64>) -> Self {
        Input::Array(x.view())
    }
}

impl<'a> From<ArrayView2<'a, f64>> for Input<'a> {
    fn from(x: ArrayView2<'a, f64>) -> Self {
        Input::Array(x.into_dyn())
    }
}

impl<'a> From<&'a Array2<f64>> for Input<'a> {
    fn from(x: &'a Array2<f64>) -> Self {
        Input::Array(x.view().into_dyn())
    }
}

impl<'a> From<ArrayView1<'a, f64>> for Input<'a> {
    fn from(x: ArrayView1<'a, f64>) -> Self {
        Input::Array(x.into_dyn())
    }
}

impl<'a> From<&'a Array1<f64>> for Input<'a> {
    fn from(x: &'a Array1<f64>) -> Self {
        Input::Array(x.view().into_dyn())
    }
}

impl<'a> From<Meshgrid<'a>> for Input<'a> {
    fn from(grid: Meshgrid<'a>) -> Self {
        Input::Meshgrid(grid)
    }
}

/// Returns `true` if `x` is a valid coordinate array for a `ndim`-dimensional domain.
#[must_use]
pub fn is_valid_input_array(x: &ArrayViewD<'_, f64>, ndim: usize) -> bool {
    match x.ndim() {
        1 => ndim == 1,
        2 => x.shape()[0] == ndim,
        _ => false,
    }
}

/// Returns `true` if `grid` is a valid meshgrid for a `ndim`-dimensional domain.
#[must_use]
pub fn is_valid_input_meshgrid(grid: &Meshgrid<'_>, ndim: usize) -> bool {
    ndim > 0
        && grid.ndim() == ndim
        && grid.components().iter().all(|c| c.ndim() == ndim)
        && grid.shape().is_some()
}

/// Output shape of a vectorized call on a coordinate array.
#[must_use]
pub fn out_shape_from_array(x: &ArrayViewD<'_, f64>) -> Vec<usize> {
    match x.shape() {
        [n] => vec![*n],
        [_, n, ..] => vec![*n],
        [] => vec![1],
    }
}

/// Output shape of a vectorized call on a meshgrid.
#[must_use]
pub fn out_shape_from_meshgrid(grid: &Meshgrid<'_>) -> Option<Vec<usize>> {
    grid.shape()
}

/// A normalized batch of evaluation points.
///
/// This is what vectorized callables receive. Arrays always have shape
/// `(d, N)`; meshgrids are validated and carry their broadcast shape.
#[derive(Debug)]
pub enum Points<'a> {
    /// `N` points stored column-wise in a `(d, N)` array.
    Array(CowArray<'a, f64, Ix2>),
    /// A validated meshgrid with its broadcast shape.
    Meshgrid { grid: Meshgrid<'a>, shape: Vec<usize> },
}

impl<'a> Points<'a> {
    /// Wraps a `(d, N)` coordinate array.
    #[must_use]
    pub fn array(x: impl Into<CowArray<'a, f64, Ix2>>) -> Self {
        Points::Array(x.into())
    }

    /// Validates and wraps a meshgrid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the components do not broadcast.
    pub fn meshgrid(grid: &'a Meshgrid<'_>) -> Result<Self, Error> {
        let ndim = grid.ndim();
        if !is_valid_input_meshgrid(grid, ndim) {
            return Err(Error::InvalidInput {
                domain: "meshgrid".into(),
                ndim,
            });
        }
        let shape = grid.shape().unwrap_or_default();
        let grid = Meshgrid::from_views(grid.components().iter().map(|c| c.view()).collect());
        Ok(Points::Meshgrid { grid, shape })
    }

    /// Classifies a batch input by its own dimensionality.
    ///
    /// A 1-D array is taken as points of a 1-D domain and a 2-D array as
    /// `(d, N)` points. Meshgrids take their dimension from the number of
    /// components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for point inputs, arrays of other
    /// dimensionality, and meshgrids that do not broadcast.
    pub fn infer(input: &'a Input<'_>) -> Result<Self, Error> {
        match input {
            Input::Array(x) => {
                let ndim = if x.ndim() == 1 { 1 } else { x.shape().first().copied().unwrap_or(0) };
                Self::from_array(x, ndim)
            }
            Input::Meshgrid(grid) => Self::meshgrid(grid),
            Input::Point(point) => Err(Error::InvalidInput {
                domain: "batch input".into(),
                ndim: point.len(),
            }),
        }
    }

    pub(crate) fn from_array(x: &'a ArrayViewD<'_, f64>, ndim: usize) -> Result<Self, Error> {
        let invalid = || Error::InvalidInput {
            domain: "coordinate array".into(),
            ndim,
        };
        if !is_valid_input_array(x, ndim) {
            return Err(invalid());
        }
        let view = if x.ndim() == 1 {
            x.view().insert_axis(Axis(0))
        } else {
            x.view()
        };
        let view = view.into_dimensionality::<Ix2>().map_err(|_| invalid())?;
        Ok(Points::Array(CowArray::from(view)))
    }

    /// Dimension of the points.
    #[must_use]
    pub fn ndim(&self) -> usize {
        match self {
            Points::Array(x) => x.nrows(),
            Points::Meshgrid { grid, .. } => grid.ndim(),
        }
    }

    /// Shape of the array a vectorized call on these points returns.
    #[must_use]
    pub fn out_shape(&self) -> Vec<usize> {
        match self {
            Points::Array(x) => vec![x.ncols()],
            Points::Meshgrid { shape, .. } => shape.clone(),
        }
    }

    /// Number of points in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.out_shape().iter().product()
    }

    /// Returns `true` if the batch contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element ordering used for arrays allocated for these points.
    #[must_use]
    pub fn order(&self) -> MeshgridOrder {
        match self {
            Points::Array(_) => MeshgridOrder::C,
            Points::Meshgrid { grid, .. } => grid.order(),
        }
    }

    /// Coordinate `i` of every point, shaped like the output.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not less than [`Points::ndim`].
    #[must_use]
    pub fn coord(&self, i: usize) -> ArrayD<f64> {
        match self {
            Points::Array(x) => x.row(i).to_owned().into_dyn(),
            Points::Meshgrid { grid, shape } => {
                let component = &grid.components()[i];
                component
                    .broadcast(IxDyn(shape))
                    .map_or_else(|| component.to_owned(), |view| view.to_owned())
            }
        }
    }

    /// Iterates over the points in output order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = Vec<f64>> + '_> {
        match self {
            Points::Array(x) => Box::new(x.columns().into_iter().map(|col| col.to_vec())),
            Points::Meshgrid { grid, .. } => Box::new(grid.points()),
        }
    }

    /// Allocates an output array filled with `value`, laid out in [`Points::order`].
    pub(crate) fn full<S: Clone>(&self, value: S) -> ArrayD<S> {
        let shape = IxDyn(&self.out_shape());
        match self.order() {
            MeshgridOrder::C => ArrayD::from_elem(shape, value),
            MeshgridOrder::F => ArrayD::from_elem(shape.f(), value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn sparse_meshgrid_shape_and_order() {
        let grid = Meshgrid::sparse(&[array![0.0, 1.0, 2.0], array![5.0, 6.0]]);
        assert_eq!(grid.shape(), Some(vec![3, 2]));
        assert_eq!(grid.order(), MeshgridOrder::C);
        assert!(is_valid_input_meshgrid(&grid, 2));
        assert!(!is_valid_input_meshgrid(&grid, 3));
    }

    #[test]
    fn dense_meshgrid_orders() {
        let vecs = [array![0.0, 1.0, 2.0], array![5.0, 6.0]];

        let c = Meshgrid::dense(&vecs, MeshgridOrder::C);
        assert_eq!(c.shape(), Some(vec![3, 2]));
        assert_eq!(c.order(), MeshgridOrder::C);

        let f = Meshgrid::dense(&vecs, MeshgridOrder::F);
        assert_eq!(f.shape(), Some(vec![2, 3]));
        assert_eq!(f.order(), MeshgridOrder::F);
        assert_eq!(f.vecs(), vecs.to_vec());
    }

    #[test]
    fn meshgrid_points_follow_cartesian_product() {
        let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![5.0, 6.0, 7.0]]);
        let points: Vec<Vec<f64>> = grid.points().collect();
        assert_eq!(
            points,
            vec![
                vec![0.0, 5.0],
                vec![0.0, 6.0],
                vec![0.0, 7.0],
                vec![1.0, 5.0],
                vec![1.0, 6.0],
                vec![1.0, 7.0],
            ]
        );
    }

    #[test]
    fn f_ordered_points_match_logical_indices() {
        let grid = Meshgrid::dense(&[array![0.0, 1.0, 2.0], array![5.0, 6.0]], MeshgridOrder::F);
        let points: Vec<Vec<f64>> = grid.points().collect();
        // Shape is (2, 3): axis 0 carries the second coordinate.
        assert_eq!(points[0], vec![0.0, 5.0]);
        assert_eq!(points[1], vec![1.0, 5.0]);
        assert_eq!(points[3], vec![0.0, 6.0]);
    }

    #[test]
    fn points_agree_with_coords_when_values_repeat() {
        let vecs = [array![0.0, 0.0, 1.0], array![5.0, 6.0]];
        for order in [MeshgridOrder::C, MeshgridOrder::F] {
            let grid = Meshgrid::dense(&vecs, order);
            assert_eq!(grid.order(), order);
            assert_eq!(grid.vecs(), vecs.to_vec());

            let points = Points::meshgrid(&grid).unwrap();
            let x = points.coord(0);
            let y = points.coord(1);
            let listed: Vec<Vec<f64>> = points.iter().collect();
            let expected: Vec<Vec<f64>> = x.iter().zip(&y).map(|(&a, &b)| vec![a, b]).collect();
            assert_eq!(listed, expected, "{order:?}");
        }

        let f = Meshgrid::dense(&vecs, MeshgridOrder::F);
        let points: Vec<Vec<f64>> = f.points().collect();
        assert_eq!(points[1], vec![0.0, 5.0]);
        assert_eq!(points[2], vec![1.0, 5.0]);
        assert_eq!(points[5], vec![1.0, 6.0]);
    }

    #[test]
    fn constant_component_keeps_grid_order() {
        let grid = Meshgrid::dense(&[array![2.0, 2.0], array![5.0, 6.0, 7.0]], MeshgridOrder::F);
        assert_eq!(grid.shape(), Some(vec![3, 2]));
        assert_eq!(grid.order(), MeshgridOrder::F);
        assert_eq!(grid.vecs()[0], array![2.0, 2.0]);
    }

    #[test]
    fn sparse_components_have_one_long_axis() {
        let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![5.0, 6.0, 7.0], array![9.0]]);
        let shapes: Vec<&[usize]> = grid.components().iter().map(|c| c.shape()).collect();
        assert_eq!(shapes, vec![&[2, 1, 1][..], &[1, 3, 1][..], &[1, 1, 1][..]]);
        assert_eq!(grid.shape(), Some(vec![2, 3, 1]));
        assert_eq!(grid.points().count(), 6);
    }

    #[test]
    fn non_broadcastable_meshgrid_is_rejected() {
        let a = ArrayD::zeros(IxDyn(&[3, 1]));
        let b = ArrayD::zeros(IxDyn(&[2, 2]));
        let grid = Meshgrid::new(vec![CowArray::from(a), CowArray::from(b)]);
        assert_eq!(grid.shape(), None);
        assert!(!is_valid_input_meshgrid(&grid, 2));
        assert!(Points::meshgrid(&grid).is_err());
    }

    #[test]
    fn array_validity_and_shapes() {
        let x = array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]].into_dyn();
        assert!(is_valid_input_array(&x.view(), 2));
        assert!(!is_valid_input_array(&x.view(), 3));
        assert_eq!(out_shape_from_array(&x.view()), vec![3]);

        let flat = array![0.0, 0.5, 1.0].into_dyn();
        assert!(is_valid_input_array(&flat.view(), 1));
        assert!(!is_valid_input_array(&flat.view(), 2));
        assert_eq!(out_shape_from_array(&flat.view()), vec![3]);
    }

    #[test]
    fn flat_array_becomes_single_row() {
        let flat = array![0.0, 0.5, 1.0].into_dyn();
        let view = flat.view();
        let points = Points::from_array(&view, 1).unwrap();
        assert_eq!(points.ndim(), 1);
        assert_eq!(points.out_shape(), vec![3]);
        assert_eq!(points.coord(0), flat);
    }

    #[test]
    fn infer_uses_input_dimension() {
        let x = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let input = Input::from(&x);
        let points = Points::infer(&input).unwrap();
        assert_eq!(points.ndim(), 3);
        assert_eq!(points.out_shape(), vec![2]);

        let point = Input::point([1.0, 2.0]);
        assert!(Points::infer(&point).is_err());
    }

    #[test]
    fn coord_broadcasts_meshgrid_component() {
        let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![5.0, 6.0, 7.0]]);
        let points = Points::meshgrid(&grid).unwrap();
        let y = points.coord(1);
        assert_eq!(y.shape(), &[2, 3]);
        assert_eq!(y[[1, 2]], 7.0);
    }
}
