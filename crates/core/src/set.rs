//! Sets used as function domains and ranges.
//!
//! A [`Set`] is a membership predicate over some element type, compared by
//! value. Function domains are sets of coordinate tuples ([`Domain`]), and
//! function ranges are sets of field scalars ([`Range`]).
//!
//! # Provided Sets
//!
//! - [`IntervalProd`]: an n-dimensional box, the usual domain
//! - [`EuclideanSpace`]: all of `R^n`
//! - [`Interval`]: a closed interval of reals, usable as a range
//! - [`RealNumbers`] and [`ComplexNumbers`]: the two scalar [`Field`]s
//!
//! # Bulk membership
//!
//! Bounds checking of vectorized evaluations needs to test many points at
//! once. Sets opt in by overriding `contains_all`; the default returns
//! `None`, which callers treat as a missing capability.

mod euclidean;
mod field;
mod interval;
mod interval_prod;

use std::fmt;

use ndarray::ArrayViewD;

use crate::{Points, Scalar};

pub use euclidean::EuclideanSpace;
pub use field::{ComplexNumbers, Field, FieldKind, RealNumbers};
pub use interval::Interval;
pub use interval_prod::IntervalProd;

/// A set defined by a membership predicate.
///
/// Equality is value equality: two sets are equal when they describe the same
/// members, as decided by `PartialEq`.
pub trait Set: fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static {
    /// The type of the set's members.
    type Element: ?Sized;

    /// Returns `true` if `element` is a member of this set.
    fn contains(&self, element: &Self::Element) -> bool;
}

/// A set of points in `R^d` that can serve as a function domain.
pub trait Domain: Set<Element = [f64]> {
    /// Number of coordinates of each point.
    fn ndim(&self) -> usize;

    /// Tests whether every point of a batch lies in the set.
    ///
    /// Returns `None` if the set does not support bulk membership tests.
    fn contains_all(&self, _points: &Points<'_>) -> Option<bool> {
        None
    }
}

/// A set of scalars that can serve as a function range.
pub trait Range: Set<Element: Scalar> {
    /// Tests whether every value of an evaluated array lies in the set.
    ///
    /// Returns `None` if the set does not support bulk membership tests.
    fn contains_all(&self, _values: ArrayViewD<'_, Self::Element>) -> Option<bool> {
        None
    }
}

/// Type alias for the scalar values of a [`Range`].
pub type ValueOf<R> = <R as Set>::Element;
