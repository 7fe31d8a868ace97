use std::fmt;

use ndarray::Axis;

use super::{Domain, Interval, Set};
use crate::Points;

/// An n-dimensional box `[min_0, max_0] x ... x [min_{n-1}, max_{n-1}]`.
///
/// This is the usual domain of functions sampled on rectangular grids.
///
/// # Example
///
/// ```
/// use fnspace_core::set::{Domain, IntervalProd, Set};
///
/// let square = IntervalProd::rectangle([0.0, 0.0], [1.0, 2.0]);
/// assert_eq!(square.ndim(), 2);
/// assert!(square.contains(&[0.5, 1.5]));
/// assert!(!square.contains(&[0.5, 2.5]));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalProd {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl IntervalProd {
    /// Creates a box from its corner points.
    ///
    /// Returns `None` if the corners differ in length, are empty, contain
    /// `NaN`, or if any `min` exceeds the corresponding `max`.
    #[must_use]
    pub fn new(min: impl Into<Vec<f64>>, max: impl Into<Vec<f64>>) -> Option<Self> {
        let (min, max) = (min.into(), max.into());
        let valid = !min.is_empty()
            && min.len() == max.len()
            && min.iter().zip(&max).all(|(lo, hi)| lo <= hi);
        valid.then_some(Self { min, max })
    }

    /// A 1-D interval `[a, b]`.
    ///
    /// # Panics
    ///
    /// Panics if `a > b` or either bound is `NaN`.
    #[must_use]
    pub fn interval(a: f64, b: f64) -> Self {
        Self::new([a], [b]).unwrap_or_else(|| panic!("invalid interval bounds [{a}, {b}]"))
    }

    /// A 2-D rectangle.
    ///
    /// # Panics
    ///
    /// Panics if any `min` exceeds the corresponding `max`.
    #[must_use]
    pub fn rectangle(min: [f64; 2], max: [f64; 2]) -> Self {
        Self::new(min, max).unwrap_or_else(|| panic!("invalid rectangle {min:?} to {max:?}"))
    }

    /// A 3-D cuboid.
    ///
    /// # Panics
    ///
    /// Panics if any `min` exceeds the corresponding `max`.
    #[must_use]
    pub fn cuboid(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(min, max).unwrap_or_else(|| panic!("invalid cuboid {min:?} to {max:?}"))
    }

    /// The lower corner.
    #[must_use]
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// The upper corner.
    #[must_use]
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// The center of the box.
    #[must_use]
    pub fn midpoint(&self) -> Vec<f64> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    /// The n-dimensional volume of the box.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.min.iter().zip(&self.max).map(|(lo, hi)| hi - lo).product()
    }

    /// The 1-D factor along axis `i`.
    #[must_use]
    pub fn factor(&self, i: usize) -> Option<Interval> {
        Interval::new(*self.min.get(i)?, *self.max.get(i)?)
    }

    /// Converts raw coordinates into an element of the ambient space.
    ///
    /// Succeeds whenever the number of coordinates matches; bounds are not
    /// checked here.
    #[must_use]
    pub fn element(&self, coords: &[f64]) -> Option<Vec<f64>> {
        (coords.len() == self.ndim()).then(|| coords.to_vec())
    }

    fn axis_contains(&self, axis: usize, value: f64) -> bool {
        self.min[axis] <= value && value <= self.max[axis]
    }
}

impl Set for IntervalProd {
    type Element = [f64];

    fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.ndim()
            && point
                .iter()
                .enumerate()
                .all(|(axis, &value)| self.axis_contains(axis, value))
    }
}

impl Domain for IntervalProd {
    fn ndim(&self) -> usize {
        self.min.len()
    }

    fn contains_all(&self, points: &Points<'_>) -> Option<bool> {
        if points.ndim() != self.ndim() {
            return Some(false);
        }
        let inside = match points {
            Points::Array(x) => x
                .axis_iter(Axis(0))
                .enumerate()
                .all(|(axis, row)| row.iter().all(|&v| self.axis_contains(axis, v))),
            // A box is a product set, so each component can be checked on its own.
            Points::Meshgrid { grid, .. } => grid
                .components()
                .iter()
                .enumerate()
                .all(|(axis, c)| c.iter().all(|&v| self.axis_contains(axis, v))),
        };
        Some(inside)
    }
}

impl fmt::Display for IntervalProd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let factors: Vec<String> = self
            .min
            .iter()
            .zip(&self.max)
            .map(|(lo, hi)| format!("[{lo}, {hi}]"))
            .collect();
        write!(f, "{}", factors.join(" x "))
    }
}

impl From<Interval> for IntervalProd {
    fn from(interval: Interval) -> Self {
        Self {
            min: vec![interval.min()],
            max: vec![interval.max()],
        }
    }
}
