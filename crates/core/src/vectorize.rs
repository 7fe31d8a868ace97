//! Vectorization of per-point functions.
//!
//! [`Vectorized`] lifts a function of one point to a function of a batch of
//! [`Points`], following an [`OutArg`] policy that decides whether an output
//! buffer is rejected, required, or optional. [`vectorize`] goes one step
//! further and produces a [`Callable`] with the matching convention.

use std::{fmt, str::FromStr, sync::Arc};

use ndarray::{ArrayD, ArrayViewMutD};
use num_traits::Zero;
use tracing::trace;

use crate::{Callable, Error, Points, Result, Scalar, callable::short_type_name};

/// Output-argument policy of a vectorized function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OutArg {
    /// No output buffer is accepted.
    #[default]
    None,
    /// An output buffer is required.
    Positional,
    /// An output buffer may be given.
    Optional,
}

impl OutArg {
    /// The policy's lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Positional => "positional",
            Self::Optional => "optional",
        }
    }
}

impl FromStr for OutArg {
    type Err = Error;

    /// Parses a policy name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "positional" => Ok(Self::Positional),
            "optional" => Ok(Self::Optional),
            _ => Err(Error::usage(format!(
                "output argument policy {s:?} not understood, expected one of \
                 \"none\", \"positional\" or \"optional\""
            ))),
        }
    }
}

impl fmt::Display for OutArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-point function lifted to batches of points.
///
/// # Example
///
/// ```
/// use fnspace_core::{OutArg, Points, Vectorized};
/// use ndarray::array;
///
/// let square = Vectorized::new(|x: &[f64]| x[0] * x[0], OutArg::None);
///
/// let x = array![[1.0, 2.0, 3.0]];
/// let points = Points::array(x.view());
/// let values = square.call(&points, None).unwrap();
/// assert_eq!(values, Some(array![1.0, 4.0, 9.0].into_dyn()));
///
/// // Without a scalar type the results come back as a plain list.
/// let labels = Vectorized::new(|x: &[f64]| x[0] > 1.5, OutArg::None);
/// assert_eq!(labels.collect(&points), vec![false, true, true]);
/// ```
#[derive(Clone)]
pub struct Vectorized<F> {
    func: F,
    outarg: OutArg,
}

impl<F> Vectorized<F> {
    pub fn new(func: F, outarg: OutArg) -> Self {
        Self { func, outarg }
    }

    #[must_use]
    pub fn outarg(&self) -> OutArg {
        self.outarg
    }

    /// Evaluates every point and collects the results in output order.
    pub fn collect<T>(&self, x: &Points<'_>) -> Vec<T>
    where
        F: Fn(&[f64]) -> T,
    {
        let mut values = Vec::with_capacity(x.len());
        values.extend(x.iter().map(|point| (self.func)(&point)));
        values
    }

    /// Evaluates every point, honoring the output-argument policy.
    ///
    /// Returns a new array when `out` is `None`, and `None` after filling a
    /// given buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUsage`] if a buffer is passed under
    /// [`OutArg::None`] or omitted under [`OutArg::Positional`], and
    /// [`Error::ShapeMismatch`] if the buffer does not match the points.
    pub fn call<T>(
        &self,
        x: &Points<'_>,
        out: Option<ArrayViewMutD<'_, T>>,
    ) -> Result<Option<ArrayD<T>>>
    where
        F: Fn(&[f64]) -> T,
        T: Clone + Zero,
    {
        match (self.outarg, out) {
            (OutArg::None, Some(_)) => Err(Error::usage(
                "output parameter not allowed for a vectorized function without output argument",
            )),
            (OutArg::Positional, None) => Err(Error::usage(
                "output parameter required by a positional output argument",
            )),
            (_, Some(out)) => {
                try_fill(x, out, |point| Ok((self.func)(point)))?;
                Ok(None)
            }
            (_, None) => try_evaluate(x, |point| Ok((self.func)(point))).map(Some),
        }
    }
}

impl<F> fmt::Debug for Vectorized<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vectorized")
            .field("func", &std::any::type_name::<F>())
            .field("outarg", &self.outarg)
            .finish()
    }
}

/// Vectorizes a per-point function into a [`Callable`].
///
/// The policy selects the calling convention: [`OutArg::None`] gives an
/// out-of-place callable, [`OutArg::Positional`] an in-place one and
/// [`OutArg::Optional`] a dual-use one.
///
/// # Example
///
/// ```
/// use fnspace_core::{vectorize, OutArg};
///
/// let f = vectorize(OutArg::Optional, |x: &[f64]| x[0] + x[1]);
/// assert!(f.is_vectorized());
/// ```
pub fn vectorize<S, F>(outarg: OutArg, f: F) -> Callable<S>
where
    S: Scalar,
    F: Fn(&[f64]) -> S + Send + Sync + 'static,
{
    let name = short_type_name::<F>();
    let vectorized = Arc::new(Vectorized::new(f, outarg));
    trace!(callable = %name, %outarg, "vectorizing callable");
    let callable = match outarg {
        OutArg::None => Callable::out_of_place(move |x| {
            vectorized
                .call(x, None)?
                .ok_or_else(|| Error::usage("vectorized call returned no value"))
        }),
        OutArg::Positional => {
            Callable::in_place(move |x, out| vectorized.call(x, Some(out)).map(drop))
        }
        OutArg::Optional => Callable::dual_use(move |x, out| vectorized.call(x, out)),
    };
    callable.named(&name)
}

/// Allocates an output array once and fills it point by point.
pub(crate) fn try_evaluate<S, G>(x: &Points<'_>, f: G) -> Result<ArrayD<S>>
where
    S: Clone + Zero,
    G: FnMut(&[f64]) -> Result<S>,
{
    let mut out = x.full(S::zero());
    try_fill(x, out.view_mut(), f)?;
    Ok(out)
}

/// Fills `out` point by point, in output order.
pub(crate) fn try_fill<S, G>(x: &Points<'_>, mut out: ArrayViewMutD<'_, S>, mut f: G) -> Result<()>
where
    G: FnMut(&[f64]) -> Result<S>,
{
    let expected = x.out_shape();
    if out.shape() != expected.as_slice() {
        return Err(Error::shape(&expected, out.shape()));
    }
    for (slot, point) in out.iter_mut().zip(x.iter()) {
        *slot = f(&point)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::{IxDyn, array};

    use crate::{Meshgrid, MeshgridOrder};

    #[test]
    fn parses_policies_case_insensitively() {
        assert_eq!("none".parse::<OutArg>(), Ok(OutArg::None));
        assert_eq!("Positional".parse::<OutArg>(), Ok(OutArg::Positional));
        assert_eq!("OPTIONAL".parse::<OutArg>(), Ok(OutArg::Optional));
        assert!(matches!(
            "sometimes".parse::<OutArg>(),
            Err(Error::InvalidUsage { .. })
        ));
        assert_eq!(OutArg::Positional.to_string(), "positional");
    }

    #[test]
    fn enforces_output_policy() {
        let x = array![[1.0, 2.0]];
        let points = Points::array(x.view());
        let mut buffer = ArrayD::zeros(IxDyn(&[2]));

        let none = Vectorized::new(|p: &[f64]| p[0], OutArg::None);
        assert!(matches!(
            none.call(&points, Some(buffer.view_mut())),
            Err(Error::InvalidUsage { .. })
        ));

        let positional = Vectorized::new(|p: &[f64]| p[0], OutArg::Positional);
        assert!(matches!(
            positional.call::<f64>(&points, None),
            Err(Error::InvalidUsage { .. })
        ));
        assert_eq!(positional.call(&points, Some(buffer.view_mut())), Ok(None));
        assert_eq!(buffer, array![1.0, 2.0].into_dyn());

        let optional = Vectorized::new(|p: &[f64]| 2.0 * p[0], OutArg::Optional);
        assert_eq!(
            optional.call(&points, None),
            Ok(Some(array![2.0, 4.0].into_dyn()))
        );
        assert_eq!(optional.call(&points, Some(buffer.view_mut())), Ok(None));
        assert_eq!(buffer, array![2.0, 4.0].into_dyn());
    }

    #[test]
    fn wrong_buffer_shape_is_rejected() {
        let x = array![[1.0, 2.0, 3.0]];
        let points = Points::array(x.view());
        let mut buffer = ArrayD::zeros(IxDyn(&[2]));

        let f = Vectorized::new(|p: &[f64]| p[0], OutArg::Positional);
        assert_eq!(
            f.call(&points, Some(buffer.view_mut())),
            Err(Error::shape(&[3], &[2]))
        );
    }

    #[test]
    fn meshgrid_output_follows_grid_order() {
        let vecs = [array![0.0, 1.0, 2.0], array![10.0, 20.0]];
        let f = Vectorized::new(|p: &[f64]| p[0] + p[1], OutArg::None);

        let grid = Meshgrid::dense(&vecs, MeshgridOrder::C);
        let points = Points::meshgrid(&grid).unwrap();
        let values = f.call(&points, None).unwrap().unwrap();
        assert_eq!(values.shape(), &[3, 2]);
        assert_eq!(values[[2, 1]], 22.0);
        assert!(values.is_standard_layout());

        // Reversed axes: index [j, i] holds the point (vecs[0][i], vecs[1][j]).
        let grid = Meshgrid::dense(&vecs, MeshgridOrder::F);
        let points = Points::meshgrid(&grid).unwrap();
        let values = f.call(&points, None).unwrap().unwrap();
        assert_eq!(values.shape(), &[2, 3]);
        assert_eq!(values[[1, 2]], 22.0);
        assert_eq!(values[[0, 1]], 11.0);
        assert!(!values.is_standard_layout());
    }

    #[test]
    fn vectorize_picks_calling_convention() {
        let f = |p: &[f64]| p[0];
        assert!(matches!(vectorize(OutArg::None, f), Callable::OutOfPlace { .. }));
        assert!(matches!(vectorize(OutArg::Positional, f), Callable::InPlace { .. }));
        assert!(matches!(vectorize(OutArg::Optional, f), Callable::DualUse { .. }));
    }

    #[test]
    fn collect_keeps_arbitrary_result_types() {
        let x = array![[0.0, 1.0], [2.0, 3.0]];
        let points = Points::array(x.view());
        let f = Vectorized::new(|p: &[f64]| format!("{}-{}", p[0], p[1]), OutArg::None);
        assert_eq!(f.collect(&points), vec!["0-2".to_string(), "1-3".to_string()]);
    }
}
