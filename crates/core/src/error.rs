//! Errors raised while building or evaluating functions.
//!
//! Every failure is reported synchronously at the point of detection and is
//! never retried. An in-place evaluation may already have written into the
//! caller's buffer when an error surfaces; no rollback is attempted.

use thiserror::Error;

/// Errors that can occur when constructing, combining, or evaluating functions.
///
/// This enum is marked `#[non_exhaustive]` and may include additional variants
/// in future releases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A callable or vector does not fit the context it was used in.
    #[error("type conflict for `{callable}`: {reason}")]
    TypeConflict { callable: String, reason: String },

    /// The input is not a domain element, a coordinate array, or a meshgrid.
    #[error(
        "invalid input: expected an element of the domain {domain}, a ({ndim}, n) array \
         or a length-{ndim} meshgrid sequence"
    )]
    InvalidInput { domain: String, ndim: usize },

    /// At least one evaluation point lies outside the domain.
    #[error("input contains points outside the domain {domain}")]
    OutOfDomain { domain: String },

    /// At least one evaluated value lies outside the range.
    #[error("output contains values outside the range {range}")]
    OutOfRange { range: String },

    /// Bounds checking was requested but the set cannot test many points at once.
    #[error("vectorized bounds check not possible for {set}: missing `contains_all`")]
    MissingCapability { set: String },

    /// The evaluated output does not have the shape inferred from the input.
    #[error("output shape {actual:?} not equal to shape {expected:?} expected from input")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The call itself was malformed, independent of the input values.
    #[error("invalid usage: {reason}")]
    InvalidUsage { reason: String },

    /// Out-of-place evaluation requested from an in-place-only callable.
    #[error("no out-of-place evaluation method defined for `{callable}`")]
    NotImplemented { callable: String },
}

impl Error {
    pub(crate) fn usage(reason: impl Into<String>) -> Self {
        Self::InvalidUsage {
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

/// A result type alias using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_message() {
        let error = Error::shape(&[3], &[2, 2]);
        assert_eq!(
            error.to_string(),
            "output shape [2, 2] not equal to shape [3] expected from input"
        );
    }

    #[test]
    fn invalid_input_message_names_expected_forms() {
        let error = Error::InvalidInput {
            domain: "[0, 1] x [0, 2]".into(),
            ndim: 2,
        };
        assert_eq!(
            error.to_string(),
            "invalid input: expected an element of the domain [0, 1] x [0, 2], \
             a (2, n) array or a length-2 meshgrid sequence"
        );
    }

    #[test]
    fn missing_capability_message() {
        let error = Error::MissingCapability {
            set: "Lattice".into(),
        };
        assert_eq!(
            error.to_string(),
            "vectorized bounds check not possible for Lattice: missing `contains_all`"
        );
    }
}
