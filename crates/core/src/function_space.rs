//! Vector spaces of functions.
//!
//! A [`FunctionSpace`] is a [`FunctionSet`] whose range is a scalar
//! [`Field`], which makes its elements a vector space. The algebraic
//! operations do not evaluate anything. They store an expression node in the
//! output vector that refers to the operands as they were at the time of the
//! call, so later changes to an operand never reach the result. Updating a
//! vector from its own value, as in `f = 2 * f + g`, works by passing a
//! clone of `f` as the operand.

use std::{
    fmt,
    ops::{Add, Div, Mul, Neg, Sub},
};

use num_traits::{One, Zero};
use tracing::trace;

use crate::{
    Callable, Function, FunctionSet, FunctionSetVector, Result,
    expr::Expr,
    function_set::{not_an_element, write_vector},
    set::{Domain, Field, RealNumbers, ValueOf},
};

/// The space of functions from a domain into a field.
///
/// # Example
///
/// ```
/// use fnspace_core::{Callable, Function, FunctionSpace, Output};
/// use fnspace_core::set::IntervalProd;
///
/// let space = FunctionSpace::new(IntervalProd::interval(0.0, 1.0));
/// let f = space.element(Callable::pointwise(|x: &[f64]| x[0]));
/// let one = space.one(true);
///
/// // (2 f + 1)^2 at x = 0.5
/// let g = (&f.scale(2.0) + &one).pow(2.0);
/// assert_eq!(g.call(&[0.5]).unwrap(), Output::Scalar(4.0));
/// ```
pub struct FunctionSpace<D, F = RealNumbers> {
    set: FunctionSet<D, F>,
}

impl<D: Domain> FunctionSpace<D> {
    /// The space of real-valued functions on `domain`.
    #[must_use]
    pub fn new(domain: D) -> Self {
        Self::with_field(domain, RealNumbers)
    }
}

impl<D: Domain, F: Field> FunctionSpace<D, F> {
    /// The space of functions on `domain` with values in `field`.
    #[must_use]
    pub fn with_field(domain: D, field: F) -> Self {
        Self {
            set: FunctionSet::new(domain, field),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &D {
        self.set.domain()
    }

    #[must_use]
    pub fn field(&self) -> &F {
        self.set.range()
    }

    /// The underlying function set.
    #[must_use]
    pub fn as_set(&self) -> &FunctionSet<D, F> {
        &self.set
    }

    /// Wraps a callable as an element of this space.
    ///
    /// Unlike [`FunctionSet::element`], in-place-only callables also get an
    /// out-of-place entry point that allocates the result.
    #[must_use]
    pub fn element(&self, callable: Callable<ValueOf<F>>) -> FunctionSpaceVector<D, F> {
        self.vector(Expr::leaf(callable, true))
    }

    /// The element created without a callable: the zero function.
    #[must_use]
    pub fn element_default(&self) -> FunctionSpaceVector<D, F> {
        self.zero(true)
    }

    /// Re-wraps an element of this space's function set.
    ///
    /// Like [`FunctionSpace::element`], an in-place-only callable gains an
    /// out-of-place entry point.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if `vector` belongs to a
    /// different set.
    pub fn element_from(
        &self,
        vector: &FunctionSetVector<D, F>,
    ) -> Result<FunctionSpaceVector<D, F>> {
        if vector.space() != &self.set {
            return Err(not_an_element(vector, self));
        }
        Ok(self.vector(vector.expr().with_default_out_of_place()))
    }

    /// The function `x -> 0`.
    #[must_use]
    pub fn zero(&self, vectorized: bool) -> FunctionSpaceVector<D, F> {
        self.vector(Expr::constant(<ValueOf<F> as Zero>::zero(), vectorized))
    }

    /// The function `x -> 1`.
    #[must_use]
    pub fn one(&self, vectorized: bool) -> FunctionSpaceVector<D, F> {
        self.vector(Expr::constant(<ValueOf<F> as One>::one(), vectorized))
    }

    /// Returns `true` if `vector` is an element of this space.
    #[must_use]
    pub fn contains(&self, vector: &FunctionSpaceVector<D, F>) -> bool {
        vector.space == *self
    }

    /// Stores `a * x1 + b * x2` in `out`.
    ///
    /// Zero and unit coefficients skip the corresponding work at evaluation
    /// time. The result is vectorized if either operand is.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if any vector belongs to a
    /// different space.
    pub fn lincomb(
        &self,
        a: ValueOf<F>,
        x1: &FunctionSpaceVector<D, F>,
        b: ValueOf<F>,
        x2: &FunctionSpaceVector<D, F>,
        out: &mut FunctionSpaceVector<D, F>,
    ) -> Result<()> {
        self.check_members(&[x1, x2], out)?;
        trace!(%a, %b, "storing linear combination");
        out.expr = Expr::lincomb(a, &x1.expr, b, &x2.expr);
        Ok(())
    }

    /// Stores the pointwise product `x1 * x2` in `out`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if any vector belongs to a
    /// different space.
    pub fn multiply(
        &self,
        x1: &FunctionSpaceVector<D, F>,
        x2: &FunctionSpaceVector<D, F>,
        out: &mut FunctionSpaceVector<D, F>,
    ) -> Result<()> {
        self.check_members(&[x1, x2], out)?;
        out.expr = Expr::product(&x1.expr, &x2.expr);
        Ok(())
    }

    /// Stores the pointwise quotient `x1 / x2` in `out`.
    ///
    /// Division by zero follows the field's arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if any vector belongs to a
    /// different space.
    pub fn divide(
        &self,
        x1: &FunctionSpaceVector<D, F>,
        x2: &FunctionSpaceVector<D, F>,
        out: &mut FunctionSpaceVector<D, F>,
    ) -> Result<()> {
        self.check_members(&[x1, x2], out)?;
        out.expr = Expr::quotient(&x1.expr, &x2.expr);
        Ok(())
    }

    /// Stores the pointwise power `x ** p` in `out`.
    ///
    /// Non-negative integer exponents are evaluated by repeated squaring and
    /// `p = 0` gives the constant one. Other exponents use the field's real
    /// power.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if either vector belongs to a
    /// different space.
    pub fn scalar_power(
        &self,
        x: &FunctionSpaceVector<D, F>,
        p: f64,
        out: &mut FunctionSpaceVector<D, F>,
    ) -> Result<()> {
        self.check_members(&[x], out)?;
        out.expr = Expr::power(&x.expr, p);
        Ok(())
    }

    fn vector(&self, expr: Expr<ValueOf<F>>) -> FunctionSpaceVector<D, F> {
        FunctionSpaceVector {
            space: self.clone(),
            expr,
        }
    }

    fn check_members(
        &self,
        operands: &[&FunctionSpaceVector<D, F>],
        out: &FunctionSpaceVector<D, F>,
    ) -> Result<()> {
        for vector in operands.iter().copied().chain([out]) {
            if !self.contains(vector) {
                return Err(not_an_element(vector, self));
            }
        }
        Ok(())
    }
}

impl<D, F> Clone for FunctionSpace<D, F> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
        }
    }
}

impl<D: PartialEq, F: PartialEq> PartialEq for FunctionSpace<D, F> {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}

impl<D: fmt::Display, F: fmt::Display> fmt::Display for FunctionSpace<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionSpace({}, {})", self.set.domain(), self.set.range())
    }
}

impl<D: fmt::Debug, F: fmt::Debug> fmt::Debug for FunctionSpace<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpace")
            .field("domain", self.set.domain())
            .field("field", self.set.range())
            .finish()
    }
}

/// An element of a [`FunctionSpace`].
///
/// Arithmetic operators build new vectors without evaluating anything.
/// They panic when the operands belong to different spaces; use the
/// fallible methods on [`FunctionSpace`] to handle that case.
pub struct FunctionSpaceVector<D, F: Field = RealNumbers> {
    space: FunctionSpace<D, F>,
    expr: Expr<ValueOf<F>>,
}

impl<D: Domain, F: Field> FunctionSpaceVector<D, F> {
    #[must_use]
    pub fn space(&self) -> &FunctionSpace<D, F> {
        &self.space
    }

    /// Returns an equal vector.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Makes this vector evaluate like `other`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TypeConflict`] if `other` belongs to a
    /// different space.
    pub fn assign(&mut self, other: &Self) -> Result<()> {
        if other.space != self.space {
            return Err(not_an_element(other, &self.space));
        }
        self.expr = other.expr.clone();
        Ok(())
    }

    /// Converts into an element of the underlying function set.
    #[must_use]
    pub fn to_set_vector(&self) -> FunctionSetVector<D, F> {
        self.space.as_set().element_from_expr(self.expr.clone())
    }

    /// `a * self`.
    #[must_use]
    pub fn scale(&self, a: ValueOf<F>) -> Self {
        self.with_expr(Expr::lincomb(a, &self.expr, <ValueOf<F> as Zero>::zero(), &self.expr))
    }

    /// `self ** p`.
    #[must_use]
    pub fn pow(&self, p: f64) -> Self {
        self.with_expr(Expr::power(&self.expr, p))
    }

    /// Replaces `self` with `self ** p`.
    pub fn pow_assign(&mut self, p: f64) {
        self.expr = Expr::power(&self.expr, p);
    }

    fn with_expr(&self, expr: Expr<ValueOf<F>>) -> Self {
        Self {
            space: self.space.clone(),
            expr,
        }
    }

    fn binary<B>(&self, other: &Self, op: &str, build: B) -> Self
    where
        B: Fn(&Expr<ValueOf<F>>, &Expr<ValueOf<F>>) -> Expr<ValueOf<F>>,
    {
        assert!(
            self.space == other.space,
            "cannot apply `{op}` to elements of {} and {}",
            self.space,
            other.space,
        );
        self.with_expr(build(&self.expr, &other.expr))
    }
}

impl<D: Domain, F: Field> Function for FunctionSpaceVector<D, F> {
    type Domain = D;
    type Range = F;

    fn function_set(&self) -> &FunctionSet<D, F> {
        &self.space.set
    }

    fn expr(&self) -> &Expr<ValueOf<F>> {
        &self.expr
    }
}

impl<D, F: Field> Clone for FunctionSpaceVector<D, F> {
    fn clone(&self) -> Self {
        Self {
            space: self.space.clone(),
            expr: self.expr.clone(),
        }
    }
}

impl<D: Domain, F: Field> PartialEq for FunctionSpaceVector<D, F> {
    fn eq(&self, other: &Self) -> bool {
        self.space == other.space && self.expr == other.expr
    }
}

impl<D: Domain, F: Field> fmt::Display for FunctionSpaceVector<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_vector(f, &self.space, &self.expr)
    }
}

impl<D: Domain, F: Field> fmt::Debug for FunctionSpaceVector<D, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpaceVector")
            .field("space", &self.space)
            .field("expr", &self.expr)
            .finish()
    }
}

/// Implements a binary operator for owned and borrowed vectors.
///
/// # Panics
///
/// The operator panics if the operands belong to different spaces.
macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $symbol:literal, |$x1:ident, $x2:ident| $build:expr) => {
        impl<D: Domain, F: Field> $trait<&FunctionSpaceVector<D, F>>
            for &FunctionSpaceVector<D, F>
        {
            type Output = FunctionSpaceVector<D, F>;

            fn $method(self, other: &FunctionSpaceVector<D, F>) -> Self::Output {
                self.binary(other, $symbol, |$x1, $x2| $build)
            }
        }

        impl<D: Domain, F: Field> $trait for FunctionSpaceVector<D, F> {
            type Output = FunctionSpaceVector<D, F>;

            fn $method(self, other: FunctionSpaceVector<D, F>) -> Self::Output {
                (&self).$method(&other)
            }
        }
    };
}

impl_binary_op!(Add, add, "+", |x1, x2| {
    let one = <ValueOf<F> as One>::one();
    Expr::lincomb(one, x1, one, x2)
});
impl_binary_op!(Sub, sub, "-", |x1, x2| {
    let one = <ValueOf<F> as One>::one();
    Expr::lincomb(one, x1, -one, x2)
});
impl_binary_op!(Mul, mul, "*", |x1, x2| Expr::product(x1, x2));
impl_binary_op!(Div, div, "/", |x1, x2| Expr::quotient(x1, x2));

impl<D: Domain, F: Field> Neg for &FunctionSpaceVector<D, F> {
    type Output = FunctionSpaceVector<D, F>;

    fn neg(self) -> Self::Output {
        self.scale(-<ValueOf<F> as One>::one())
    }
}

impl<D: Domain, F: Field> Neg for FunctionSpaceVector<D, F> {
    type Output = FunctionSpaceVector<D, F>;

    fn neg(self) -> Self::Output {
        -&self
    }
}
