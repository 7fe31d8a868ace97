use std::fmt;

use super::{Domain, Set};
use crate::Points;

/// All of `R^n`.
///
/// Every point with the right number of coordinates is a member, so bulk
/// membership only checks the dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EuclideanSpace {
    ndim: usize,
}

impl EuclideanSpace {
    #[must_use]
    pub fn new(ndim: usize) -> Self {
        Self { ndim }
    }
}

impl Set for EuclideanSpace {
    type Element = [f64];

    fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.ndim
    }
}

impl Domain for EuclideanSpace {
    fn ndim(&self) -> usize {
        self.ndim
    }

    fn contains_all(&self, points: &Points<'_>) -> Option<bool> {
        Some(points.ndim() == self.ndim)
    }
}

impl fmt::Display for EuclideanSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R^{}", self.ndim)
    }
}
