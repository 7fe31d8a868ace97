//! Evaluation callables and their calling conventions.
//!
//! User code is wrapped into a [`Callable`], which tags the closure with one
//! of four calling conventions:
//!
//! - [`Callable::pointwise`]: `f(point) -> value`, evaluated one point at a
//!   time (a non-vectorized function).
//! - [`Callable::out_of_place`]: `f(points) -> array`.
//! - [`Callable::dual_use`]: `f(points, out)` that writes into `out` when one
//!   is given and returns a new array otherwise.
//! - [`Callable::in_place`]: `f(points, out)` that requires an output buffer.
//!
//! The tag replaces any inspection of the closure itself. When a callable is
//! turned into a function, its convention is resolved exactly once into a
//! [`Dispatch`] holding the in-place and out-of-place entry points.

use std::{any::type_name, fmt, sync::Arc};

use ndarray::{ArrayD, ArrayViewMutD};
use tracing::trace;

use crate::{Error, Points, Result, Scalar};

/// A per-point evaluation closure.
pub type PointFn<S> = Arc<dyn Fn(&[f64]) -> S + Send + Sync>;

/// A vectorized closure returning a newly allocated array.
pub type OutOfPlaceFn<S> = Arc<dyn Fn(&Points<'_>) -> Result<ArrayD<S>> + Send + Sync>;

/// A vectorized closure writing into a caller-supplied buffer.
pub type InPlaceFn<S> = Arc<dyn Fn(&Points<'_>, ArrayViewMutD<'_, S>) -> Result<()> + Send + Sync>;

/// A vectorized closure with an optional output buffer.
///
/// Must return `Some(array)` when called without a buffer and `None` after
/// writing into a given buffer.
pub type DualUseFn<S> = Arc<
    dyn Fn(&Points<'_>, Option<ArrayViewMutD<'_, S>>) -> Result<Option<ArrayD<S>>> + Send + Sync,
>;

/// A user evaluation closure tagged with its calling convention.
///
/// # Example
///
/// ```
/// use fnspace_core::Callable;
///
/// // f(x) = x0 * x1, one point at a time.
/// let product = Callable::pointwise(|x: &[f64]| x[0] * x[1]);
/// assert!(!product.is_vectorized());
///
/// // The same function, vectorized.
/// let product = Callable::out_of_place(|x| Ok(x.coord(0) * x.coord(1)));
/// assert!(product.is_vectorized());
/// ```
#[derive(Clone)]
pub enum Callable<S> {
    Pointwise { name: Arc<str>, call: PointFn<S> },
    OutOfPlace { name: Arc<str>, call: OutOfPlaceFn<S> },
    DualUse { name: Arc<str>, call: DualUseFn<S> },
    InPlace { name: Arc<str>, call: InPlaceFn<S> },
}

impl<S: Scalar> Callable<S> {
    /// Wraps a non-vectorized function evaluated one point at a time.
    pub fn pointwise<F>(f: F) -> Self
    where
        F: Fn(&[f64]) -> S + Send + Sync + 'static,
    {
        Self::Pointwise {
            name: short_type_name::<F>(),
            call: Arc::new(f),
        }
    }

    /// Wraps a vectorized function returning a new array.
    pub fn out_of_place<F>(f: F) -> Self
    where
        F: Fn(&Points<'_>) -> Result<ArrayD<S>> + Send + Sync + 'static,
    {
        Self::OutOfPlace {
            name: short_type_name::<F>(),
            call: Arc::new(f),
        }
    }

    /// Wraps a vectorized function with an optional output buffer.
    pub fn dual_use<F>(f: F) -> Self
    where
        F: Fn(&Points<'_>, Option<ArrayViewMutD<'_, S>>) -> Result<Option<ArrayD<S>>>
            + Send
            + Sync
            + 'static,
    {
        Self::DualUse {
            name: short_type_name::<F>(),
            call: Arc::new(f),
        }
    }

    /// Wraps a vectorized function that requires an output buffer.
    pub fn in_place<F>(f: F) -> Self
    where
        F: Fn(&Points<'_>, ArrayViewMutD<'_, S>) -> Result<()> + Send + Sync + 'static,
    {
        Self::InPlace {
            name: short_type_name::<F>(),
            call: Arc::new(f),
        }
    }

    /// Replaces the name used in messages and `Display` output.
    #[must_use]
    pub fn named(self, name: &str) -> Self {
        let name: Arc<str> = Arc::from(name);
        match self {
            Self::Pointwise { call, .. } => Self::Pointwise { name, call },
            Self::OutOfPlace { call, .. } => Self::OutOfPlace { name, call },
            Self::DualUse { call, .. } => Self::DualUse { name, call },
            Self::InPlace { call, .. } => Self::InPlace { name, call },
        }
    }

    /// The callable's name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Pointwise { name, .. }
            | Self::OutOfPlace { name, .. }
            | Self::DualUse { name, .. }
            | Self::InPlace { name, .. } => name,
        }
    }

    /// Returns `true` unless this is a [`Callable::Pointwise`] function.
    #[must_use]
    pub fn is_vectorized(&self) -> bool {
        !matches!(self, Self::Pointwise { .. })
    }
}

impl<S> fmt::Debug for Callable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, name) = match self {
            Self::Pointwise { name, .. } => ("Pointwise", name),
            Self::OutOfPlace { name, .. } => ("OutOfPlace", name),
            Self::DualUse { name, .. } => ("DualUse", name),
            Self::InPlace { name, .. } => ("InPlace", name),
        };
        write!(f, "{kind}({name})")
    }
}

/// The evaluation strategy of a vectorized callable, resolved once.
///
/// Exactly one mode is active. Both entry points are always available,
/// although [`Dispatch::InPlaceOnly`] without a default adapter fails
/// out-of-place calls with [`Error::NotImplemented`].
#[derive(Clone)]
pub enum Dispatch<S> {
    /// In-place calls evaluate out of place and copy into the buffer.
    OutOfPlaceOnly(OutOfPlaceFn<S>),
    /// Both entry points call the same closure.
    DualUse(DualUseFn<S>),
    /// Out-of-place calls allocate a buffer when `default_out_of_place` is set.
    InPlaceOnly {
        call: InPlaceFn<S>,
        default_out_of_place: bool,
    },
}

impl<S> Dispatch<S> {
    /// Whether the underlying closure accepts an output buffer.
    #[must_use]
    pub fn call_has_out(&self) -> bool {
        !matches!(self, Self::OutOfPlaceOnly(_))
    }

    /// Whether that output buffer is optional.
    #[must_use]
    pub fn call_out_optional(&self) -> bool {
        matches!(self, Self::DualUse(_))
    }

    /// Returns `true` if both dispatches wrap the same closure.
    pub(crate) fn same_callable(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::OutOfPlaceOnly(a), Self::OutOfPlaceOnly(b)) => Arc::ptr_eq(a, b),
            (Self::DualUse(a), Self::DualUse(b)) => Arc::ptr_eq(a, b),
            (
                Self::InPlaceOnly {
                    call: a,
                    default_out_of_place: da,
                },
                Self::InPlaceOnly {
                    call: b,
                    default_out_of_place: db,
                },
            ) => Arc::ptr_eq(a, b) && da == db,
            _ => false,
        }
    }
}

/// A vectorized callable with its resolved dispatch.
#[derive(Clone)]
pub struct Leaf<S> {
    name: Arc<str>,
    dispatch: Dispatch<S>,
}

impl<S: Scalar> Leaf<S> {
    pub(crate) fn new(name: Arc<str>, dispatch: Dispatch<S>) -> Self {
        trace!(
            callable = %name,
            has_out = dispatch.call_has_out(),
            out_optional = dispatch.call_out_optional(),
            "resolved evaluation dispatch",
        );
        Self { name, dispatch }
    }

    /// Evaluates into a newly allocated array.
    pub(crate) fn call_out_of_place(&self, x: &Points<'_>) -> Result<ArrayD<S>> {
        match &self.dispatch {
            Dispatch::OutOfPlaceOnly(call) => call(x),
            Dispatch::DualUse(call) => call(x, None)?.ok_or_else(|| Error::TypeConflict {
                callable: self.name.to_string(),
                reason: "dual-use callable returned no value without an output buffer".into(),
            }),
            Dispatch::InPlaceOnly {
                call,
                default_out_of_place: true,
            } => {
                let mut out = x.full(S::zero());
                call(x, out.view_mut())?;
                Ok(out)
            }
            Dispatch::InPlaceOnly {
                default_out_of_place: false,
                ..
            } => Err(Error::NotImplemented {
                callable: self.name.to_string(),
            }),
        }
    }

    /// Evaluates into `out`, whose shape the caller has already validated.
    pub(crate) fn call_in_place(
        &self,
        x: &Points<'_>,
        mut out: ArrayViewMutD<'_, S>,
    ) -> Result<()> {
        match &self.dispatch {
            Dispatch::OutOfPlaceOnly(call) => {
                let values = call(x)?;
                if values.shape() != out.shape() {
                    return Err(Error::shape(out.shape(), values.shape()));
                }
                out.assign(&values);
                Ok(())
            }
            Dispatch::DualUse(call) => match call(x, Some(out))? {
                None => Ok(()),
                Some(_) => Err(Error::TypeConflict {
                    callable: self.name.to_string(),
                    reason: "dual-use callable returned a value instead of writing the buffer"
                        .into(),
                }),
            },
            Dispatch::InPlaceOnly { call, .. } => call(x, out),
        }
    }
}

impl<S> Leaf<S> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dispatch(&self) -> &Dispatch<S> {
        &self.dispatch
    }
}

/// Returns the last path segment of a closure's type name.
///
/// Closure names look like `crate::module::function::{{closure}}`, so the
/// enclosing function is kept for readability.
pub(crate) fn short_type_name<F>() -> Arc<str> {
    let full = type_name::<F>();
    let trimmed = full.trim_end_matches("::{{closure}}");
    let short = trimmed.rsplit("::").next().unwrap_or(trimmed);
    if trimmed.len() == full.len() {
        Arc::from(short)
    } else {
        Arc::from(format!("{short}::{{closure}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    fn column(values: &[f64]) -> ndarray::Array2<f64> {
        ndarray::Array2::from_shape_vec((1, values.len()), values.to_vec()).unwrap()
    }

    #[test]
    fn out_of_place_only_copies_into_buffer() {
        let Callable::OutOfPlace { name, call } = Callable::out_of_place(|x| Ok(x.coord(0) * 2.0))
        else {
            unreachable!()
        };
        let leaf = Leaf::new(name, Dispatch::OutOfPlaceOnly(call));
        assert!(!leaf.dispatch().call_has_out());

        let x = column(&[1.0, 2.0]);
        let points = Points::array(x.view());
        let mut out = ArrayD::zeros(ndarray::IxDyn(&[2]));
        leaf.call_in_place(&points, out.view_mut()).unwrap();
        assert_eq!(out, array![2.0, 4.0].into_dyn());
    }

    #[test]
    fn in_place_only_without_default_is_not_implemented() {
        let Callable::InPlace { name, call } = Callable::<f64>::in_place(|x, mut out| {
            out.assign(&x.coord(0));
            Ok(())
        })
        .named("copy_first") else {
            unreachable!()
        };
        let leaf = Leaf::new(
            name,
            Dispatch::InPlaceOnly {
                call,
                default_out_of_place: false,
            },
        );
        assert!(leaf.dispatch().call_has_out());
        assert!(!leaf.dispatch().call_out_optional());

        let x = column(&[1.0]);
        let error = leaf.call_out_of_place(&Points::array(x.view())).unwrap_err();
        assert_eq!(
            error,
            Error::NotImplemented {
                callable: "copy_first".into()
            }
        );
    }

    #[test]
    fn in_place_only_with_default_allocates() {
        let Callable::InPlace { name, call } = Callable::<f64>::in_place(|x, mut out| {
            out.assign(&x.coord(0));
            Ok(())
        }) else {
            unreachable!()
        };
        let leaf = Leaf::new(
            name,
            Dispatch::InPlaceOnly {
                call,
                default_out_of_place: true,
            },
        );

        let x = column(&[0.5, 0.25]);
        let values = leaf.call_out_of_place(&Points::array(x.view())).unwrap();
        assert_eq!(values, array![0.5, 0.25].into_dyn());
    }

    #[test]
    fn misbehaving_dual_use_is_a_type_conflict() {
        let Callable::DualUse { name, call } =
            Callable::<f64>::dual_use(|_, _| Ok(None)).named("silent")
        else {
            unreachable!()
        };
        let leaf = Leaf::new(name, Dispatch::DualUse(call));
        let x = column(&[0.0]);
        let error = leaf.call_out_of_place(&Points::array(x.view())).unwrap_err();
        assert!(matches!(error, Error::TypeConflict { callable, .. } if callable == "silent"));
    }

    #[test]
    fn closure_names_keep_enclosing_function() {
        let callable = Callable::pointwise(|x: &[f64]| x[0]);
        assert_eq!(callable.name(), "closure_names_keep_enclosing_function::{closure}");
        assert_eq!(
            format!("{callable:?}"),
            "Pointwise(closure_names_keep_enclosing_function::{closure})"
        );
    }
}
