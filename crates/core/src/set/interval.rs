use std::fmt;

use ndarray::ArrayViewD;

use super::{Range, Set};

/// A closed interval of real values `[min, max]`.
///
/// Use this as the range of a function set when function values are known
/// to be bounded. For a domain, convert it into an [`IntervalProd`].
///
/// [`IntervalProd`]: super::IntervalProd
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    min: f64,
    max: f64,
}

impl Interval {
    /// Creates `[min, max]`, or `None` if `min > max` or a bound is `NaN`.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    /// The unit interval `[0, 1]`.
    #[must_use]
    pub fn unit() -> Self {
        Self { min: 0.0, max: 1.0 }
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        self.max - self.min
    }
}

impl Set for Interval {
    type Element = f64;

    fn contains(&self, value: &f64) -> bool {
        self.min <= *value && *value <= self.max
    }
}

impl Range for Interval {
    fn contains_all(&self, values: ArrayViewD<'_, f64>) -> Option<bool> {
        Some(values.iter().all(|v| self.contains(v)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn membership() {
        let unit = Interval::unit();
        assert!(unit.contains(&0.0));
        assert!(unit.contains(&1.0));
        assert!(!unit.contains(&-0.1));
        assert!(!unit.contains(&f64::NAN));

        let values = array![0.0, 0.3, 1.0].into_dyn();
        assert_eq!(unit.contains_all(values.view()), Some(true));

        let values = array![0.0, 1.3].into_dyn();
        assert_eq!(unit.contains_all(values.view()), Some(false));
    }

    #[test]
    fn invalid_bounds() {
        assert!(Interval::new(2.0, 1.0).is_none());
        assert!(Interval::new(f64::NAN, 1.0).is_none());
        assert_eq!(Interval::new(-1.0, 1.0).map(|i| i.length()), Some(2.0));
    }
}
