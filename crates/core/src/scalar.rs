use std::{fmt, ops::Neg};

use num_complex::Complex64;
use num_traits::NumAssign;

/// Scalar values of a function space's field.
///
/// Implemented for `f64` (real numbers) and [`Complex64`] (complex numbers).
/// The algebra only needs field arithmetic and real exponentiation.
pub trait Scalar:
    Copy
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + NumAssign
    + Neg<Output = Self>
    + Send
    + Sync
    + 'static
{
    /// Raises `self` to a real power.
    #[must_use]
    fn powf(self, p: f64) -> Self;
}

impl Scalar for f64 {
    fn powf(self, p: f64) -> Self {
        f64::powf(self, p)
    }
}

impl Scalar for Complex64 {
    fn powf(self, p: f64) -> Self {
        Complex64::powf(self, p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn real_powf() {
        assert_relative_eq!(Scalar::powf(4.0_f64, 0.5), 2.0);
    }

    #[test]
    fn complex_powf_squares() {
        let z = Scalar::powf(Complex64::new(0.0, 1.0), 2.0);
        assert_relative_eq!(z.re, -1.0, epsilon = 1e-12);
        assert_relative_eq!(z.im, 0.0, epsilon = 1e-12);
    }
}
