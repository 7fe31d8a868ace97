use std::fmt;

use ndarray::ArrayViewD;
use num_complex::Complex64;

use super::{Range, Set};

/// Tag distinguishing the two supported scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    Real,
    Complex,
}

/// A scalar field usable as the range of a function space.
///
/// The field fixes the scalar type of function values and of the
/// coefficients used in linear combinations.
pub trait Field: Range + Default + Copy {
    /// Which field this is.
    const KIND: FieldKind;
}

/// The real numbers, with scalar type `f64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RealNumbers;

/// The complex numbers, with scalar type [`Complex64`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComplexNumbers;

impl Set for RealNumbers {
    type Element = f64;

    fn contains(&self, _element: &f64) -> bool {
        true
    }
}

impl Range for RealNumbers {
    fn contains_all(&self, _values: ArrayViewD<'_, f64>) -> Option<bool> {
        Some(true)
    }
}

impl Field for RealNumbers {
    const KIND: FieldKind = FieldKind::Real;
}

impl fmt::Display for RealNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RealNumbers")
    }
}

impl Set for ComplexNumbers {
    type Element = Complex64;

    fn contains(&self, _element: &Complex64) -> bool {
        true
    }
}

impl Range for ComplexNumbers {
    fn contains_all(&self, _values: ArrayViewD<'_, Complex64>) -> Option<bool> {
        Some(true)
    }
}

impl Field for ComplexNumbers {
    const KIND: FieldKind = FieldKind::Complex;
}

impl fmt::Display for ComplexNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComplexNumbers")
    }
}
