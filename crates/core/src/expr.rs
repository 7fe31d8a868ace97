//! Expression trees built by function-space arithmetic.
//!
//! Every function-space vector holds an [`Expr`]. Leaves wrap user callables
//! or constants; interior nodes record a linear combination, product,
//! quotient or power of their children. Evaluation walks the tree, so the
//! result of an algebraic operation is independent of what later happens to
//! its operands.
//!
//! A tree is either vectorized or not. Vectorized trees are evaluated on
//! whole batches of points, allocating at most one temporary buffer per
//! binary node. Non-vectorized trees are evaluated one point at a time and,
//! when asked for a batch, are lifted by evaluating every point into a single
//! preallocated array.

use std::{fmt, sync::Arc};

use ndarray::{Array2, ArrayD, ArrayViewMutD};
use tracing::trace;

use crate::{
    Error, Points, Result, Scalar,
    callable::{Callable, Dispatch, Leaf, PointFn},
    vectorize::{try_evaluate, try_fill},
};

/// A shared, immutable expression tree.
///
/// Cloning is cheap and shares the tree.
#[derive(Clone)]
pub struct Expr<S> {
    node: Arc<Node<S>>,
    vectorized: bool,
}

/// A node of an [`Expr`].
pub enum Node<S> {
    /// A non-vectorized user function.
    Pointwise { name: Arc<str>, call: PointFn<S> },
    /// A vectorized user function with its resolved dispatch.
    Vectorized(Leaf<S>),
    /// The constant function.
    Constant(S),
    /// `a * x1 + b * x2`.
    LinComb { a: S, x1: Expr<S>, b: S, x2: Expr<S> },
    /// Pointwise `x1 * x2`.
    Product(Expr<S>, Expr<S>),
    /// Pointwise `x1 / x2`.
    Quotient(Expr<S>, Expr<S>),
    /// Pointwise `x ** p`.
    Power(Expr<S>, f64),
}

impl<S: Scalar> Expr<S> {
    /// Builds a leaf from a callable.
    ///
    /// With `default_out_of_place`, an in-place-only callable gets an
    /// out-of-place entry point that allocates the result.
    pub(crate) fn leaf(callable: Callable<S>, default_out_of_place: bool) -> Self {
        match callable {
            Callable::Pointwise { name, call } => Self::new(Node::Pointwise { name, call }, false),
            Callable::OutOfPlace { name, call } => {
                Self::new(Node::Vectorized(Leaf::new(name, Dispatch::OutOfPlaceOnly(call))), true)
            }
            Callable::DualUse { name, call } => {
                Self::new(Node::Vectorized(Leaf::new(name, Dispatch::DualUse(call))), true)
            }
            Callable::InPlace { name, call } => {
                let dispatch = Dispatch::InPlaceOnly {
                    call,
                    default_out_of_place,
                };
                Self::new(Node::Vectorized(Leaf::new(name, dispatch)), true)
            }
        }
    }

    pub(crate) fn constant(value: S, vectorized: bool) -> Self {
        Self::new(Node::Constant(value), vectorized)
    }

    pub(crate) fn lincomb(a: S, x1: &Self, b: S, x2: &Self) -> Self {
        let vectorized = x1.vectorized || x2.vectorized;
        Self::new(
            Node::LinComb {
                a,
                x1: x1.clone(),
                b,
                x2: x2.clone(),
            },
            vectorized,
        )
    }

    pub(crate) fn product(x1: &Self, x2: &Self) -> Self {
        let vectorized = x1.vectorized || x2.vectorized;
        Self::new(Node::Product(x1.clone(), x2.clone()), vectorized)
    }

    pub(crate) fn quotient(x1: &Self, x2: &Self) -> Self {
        let vectorized = x1.vectorized || x2.vectorized;
        Self::new(Node::Quotient(x1.clone(), x2.clone()), vectorized)
    }

    pub(crate) fn power(x: &Self, p: f64) -> Self {
        Self::new(Node::Power(x.clone(), p), x.vectorized)
    }

    /// The same tree, with an allocating out-of-place entry point added to
    /// an in-place-only root callable that lacks one.
    pub(crate) fn with_default_out_of_place(&self) -> Self {
        match self.node() {
            Node::Vectorized(leaf) => match leaf.dispatch() {
                Dispatch::InPlaceOnly {
                    call,
                    default_out_of_place: false,
                } => {
                    let dispatch = Dispatch::InPlaceOnly {
                        call: Arc::clone(call),
                        default_out_of_place: true,
                    };
                    let name = Arc::from(leaf.name());
                    Self::new(Node::Vectorized(Leaf::new(name, dispatch)), true)
                }
                _ => self.clone(),
            },
            _ => self.clone(),
        }
    }

    fn new(node: Node<S>, vectorized: bool) -> Self {
        Self {
            node: Arc::new(node),
            vectorized,
        }
    }

    /// The root node.
    #[must_use]
    pub fn node(&self) -> &Node<S> {
        &self.node
    }

    /// Whether the tree is evaluated on whole batches.
    #[must_use]
    pub fn is_vectorized(&self) -> bool {
        self.vectorized
    }

    /// Whether the root accepts an output buffer.
    #[must_use]
    pub fn call_has_out(&self) -> bool {
        match &*self.node {
            Node::Pointwise { .. } => false,
            Node::Vectorized(leaf) => leaf.dispatch().call_has_out(),
            _ => self.vectorized,
        }
    }

    /// Whether the root's output buffer is optional.
    #[must_use]
    pub fn call_out_optional(&self) -> bool {
        match &*self.node {
            Node::Pointwise { .. } => false,
            Node::Vectorized(leaf) => leaf.dispatch().call_out_optional(),
            _ => self.vectorized,
        }
    }

    /// Evaluates a single point.
    pub(crate) fn call_point(&self, point: &[f64]) -> Result<S> {
        match &*self.node {
            Node::Pointwise { call, .. } => Ok(call(point)),
            Node::Vectorized(leaf) => {
                let column = Array2::from_shape_vec((point.len(), 1), point.to_vec())
                    .map_err(|_| Error::usage("point cannot be reshaped into a column"))?;
                let values = leaf.call_out_of_place(&Points::array(column))?;
                values
                    .iter()
                    .next()
                    .copied()
                    .ok_or_else(|| Error::shape(&[1], values.shape()))
            }
            Node::Constant(value) => Ok(*value),
            Node::LinComb { a, x1, b, x2 } => {
                let (a, b) = (*a, *b);
                if a.is_zero() && !b.is_zero() {
                    Ok(b * x2.call_point(point)?)
                } else if b.is_zero() {
                    Ok(a * x1.call_point(point)?)
                } else {
                    Ok(a * x1.call_point(point)? + b * x2.call_point(point)?)
                }
            }
            Node::Product(x1, x2) => Ok(x1.call_point(point)? * x2.call_point(point)?),
            Node::Quotient(x1, x2) => Ok(x1.call_point(point)? / x2.call_point(point)?),
            Node::Power(x, p) => {
                let value = x.call_point(point)?;
                Ok(match integer_exponent(*p) {
                    Some(n) => num_traits::pow(value, n),
                    None => value.powf(*p),
                })
            }
        }
    }

    /// Evaluates a batch into a newly allocated array.
    pub(crate) fn call_out_of_place(&self, x: &Points<'_>) -> Result<ArrayD<S>> {
        if !self.vectorized {
            trace!(points = x.len(), "evaluating non-vectorized expression pointwise");
            return try_evaluate(x, |point| self.call_point(point));
        }

        match &*self.node {
            Node::Pointwise { call, .. } => try_evaluate(x, |point| Ok(call(point))),
            Node::Vectorized(leaf) => leaf.call_out_of_place(x),
            Node::Constant(value) => Ok(x.full(*value)),
            Node::LinComb { a, x1, b, x2 } => {
                let (a, b) = (*a, *b);
                if a.is_zero() && !b.is_zero() {
                    let mut out = x2.call_out_of_place(x)?;
                    scale(&mut out.view_mut(), b);
                    Ok(out)
                } else if b.is_zero() {
                    let mut out = x1.call_out_of_place(x)?;
                    scale(&mut out.view_mut(), a);
                    Ok(out)
                } else {
                    let mut out = x1.call_out_of_place(x)?;
                    scale(&mut out.view_mut(), a);
                    let mut tmp = x2.call_out_of_place(x)?;
                    scale(&mut tmp.view_mut(), b);
                    combine(out.view_mut(), &tmp, |o, t| *o += t)?;
                    Ok(out)
                }
            }
            Node::Product(x1, x2) => {
                let mut out = x1.call_out_of_place(x)?;
                let tmp = x2.call_out_of_place(x)?;
                combine(out.view_mut(), &tmp, |o, t| *o *= t)?;
                Ok(out)
            }
            Node::Quotient(x1, x2) => {
                let mut out = x1.call_out_of_place(x)?;
                let tmp = x2.call_out_of_place(x)?;
                combine(out.view_mut(), &tmp, |o, t| *o /= t)?;
                Ok(out)
            }
            Node::Power(base, p) => {
                let mut out = base.call_out_of_place(x)?;
                raise(&mut out.view_mut(), *p);
                Ok(out)
            }
        }
    }

    /// Evaluates a batch into `out`.
    pub(crate) fn call_in_place(
        &self,
        x: &Points<'_>,
        mut out: ArrayViewMutD<'_, S>,
    ) -> Result<()> {
        let expected = x.out_shape();
        if out.shape() != expected.as_slice() {
            return Err(Error::shape(&expected, out.shape()));
        }

        if !self.vectorized {
            return try_fill(x, out, |point| self.call_point(point));
        }

        match &*self.node {
            Node::Pointwise { call, .. } => try_fill(x, out, |point| Ok(call(point))),
            Node::Vectorized(leaf) => leaf.call_in_place(x, out),
            Node::Constant(value) => {
                out.fill(*value);
                Ok(())
            }
            Node::LinComb { a, x1, b, x2 } => {
                let (a, b) = (*a, *b);
                if a.is_zero() && b.is_zero() {
                    out.fill(S::zero());
                } else if a.is_zero() {
                    x2.call_in_place(x, out.view_mut())?;
                    scale(&mut out, b);
                } else if b.is_zero() {
                    x1.call_in_place(x, out.view_mut())?;
                    scale(&mut out, a);
                } else {
                    let mut tmp = ArrayD::zeros(out.raw_dim());
                    x1.call_in_place(x, out.view_mut())?;
                    x2.call_in_place(x, tmp.view_mut())?;
                    scale(&mut out, a);
                    scale(&mut tmp.view_mut(), b);
                    combine(out, &tmp, |o, t| *o += t)?;
                }
                Ok(())
            }
            Node::Product(x1, x2) => {
                let mut tmp = ArrayD::zeros(out.raw_dim());
                x1.call_in_place(x, out.view_mut())?;
                x2.call_in_place(x, tmp.view_mut())?;
                combine(out, &tmp, |o, t| *o *= t)
            }
            Node::Quotient(x1, x2) => {
                let mut tmp = ArrayD::zeros(out.raw_dim());
                x1.call_in_place(x, out.view_mut())?;
                x2.call_in_place(x, tmp.view_mut())?;
                combine(out, &tmp, |o, t| *o /= t)
            }
            Node::Power(base, p) => {
                base.call_in_place(x, out.view_mut())?;
                raise(&mut out, *p);
                Ok(())
            }
        }
    }
}

impl<S: Scalar> PartialEq for Expr<S> {
    /// Trees are equal when they share a root, or are leaves wrapping the
    /// same callable.
    fn eq(&self, other: &Self) -> bool {
        if self.vectorized != other.vectorized {
            return false;
        }
        if Arc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        match (&*self.node, &*other.node) {
            (Node::Pointwise { call: a, .. }, Node::Pointwise { call: b, .. }) => Arc::ptr_eq(a, b),
            (Node::Vectorized(a), Node::Vectorized(b)) => a.dispatch().same_callable(b.dispatch()),
            _ => false,
        }
    }
}

impl<S: fmt::Display> fmt::Display for Expr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.node {
            Node::Pointwise { name, .. } => write!(f, "{name}"),
            Node::Vectorized(leaf) => write!(f, "{}", leaf.name()),
            Node::Constant(value) => write!(f, "{value}"),
            Node::LinComb { a, x1, b, x2 } => write!(f, "({a} * {x1} + {b} * {x2})"),
            Node::Product(x1, x2) => write!(f, "({x1} * {x2})"),
            Node::Quotient(x1, x2) => write!(f, "({x1} / {x2})"),
            Node::Power(x, p) => write!(f, "{x}**{p}"),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Expr<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.vectorized { "Vectorized" } else { "Pointwise" };
        f.debug_tuple(name).field(&*self.node).finish()
    }
}

impl<S: fmt::Debug> fmt::Debug for Node<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointwise { name, .. } => write!(f, "Callable({name})"),
            Self::Vectorized(leaf) => write!(f, "Callable({})", leaf.name()),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::LinComb { a, x1, b, x2 } => f
                .debug_struct("LinComb")
                .field("a", a)
                .field("x1", x1)
                .field("b", b)
                .field("x2", x2)
                .finish(),
            Self::Product(x1, x2) => f.debug_tuple("Product").field(x1).field(x2).finish(),
            Self::Quotient(x1, x2) => f.debug_tuple("Quotient").field(x1).field(x2).finish(),
            Self::Power(x, p) => f.debug_tuple("Power").field(x).field(p).finish(),
        }
    }
}

/// Returns `p` as a count if it is a non-negative integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integer_exponent(p: f64) -> Option<usize> {
    (p >= 0.0 && p.fract() == 0.0 && p <= f64::from(u32::MAX)).then(|| p as usize)
}

/// Multiplies in place, skipping the identity.
fn scale<S: Scalar>(values: &mut ArrayViewMutD<'_, S>, factor: S) {
    if !factor.is_one() {
        values.mapv_inplace(|v| v * factor);
    }
}

/// Combines `out` with an equally shaped array element by element.
fn combine<S: Scalar>(
    mut out: ArrayViewMutD<'_, S>,
    other: &ArrayD<S>,
    op: impl Fn(&mut S, S),
) -> Result<()> {
    if out.shape() != other.shape() {
        return Err(Error::shape(out.shape(), other.shape()));
    }
    out.zip_mut_with(other, |o, &t| op(o, t));
    Ok(())
}

/// Raises every value to the power `p`.
///
/// Non-negative integer powers use repeated squaring, so `x**n` costs about
/// `log2(n)` passes and is exact whenever the intermediate products are.
fn raise<S: Scalar>(values: &mut ArrayViewMutD<'_, S>, p: f64) {
    match integer_exponent(p) {
        Some(0) => values.fill(S::one()),
        Some(n) => square_and_multiply(values, n),
        None => values.mapv_inplace(|v| v.powf(p)),
    }
}

fn square_and_multiply<S: Scalar>(values: &mut ArrayViewMutD<'_, S>, n: usize) {
    if n <= 1 {
        return;
    }
    if n % 2 == 0 {
        values.mapv_inplace(|v| v * v);
        square_and_multiply(values, n / 2);
    } else {
        let base = values.to_owned();
        values.mapv_inplace(|v| v * v);
        square_and_multiply(values, n / 2);
        values.zip_mut_with(&base, |v, &b| *v *= b);
    }
}
