use std::{fmt, sync::Arc};

use crate::{
    Callable, Error, Function, Result, Scalar,
    expr::Expr,
    set::{Domain, Range, Set, ValueOf},
};

/// The set of all functions from a domain to a range.
///
/// Two function sets are equal when their domains and ranges are equal.
/// Cloning is cheap and shares both sets.
pub struct FunctionSet<D, R> {
    domain: Arc<D>,
    range: Arc<R>,
}

impl<D, R> FunctionSet<D, R> {
    #[must_use]
    pub fn domain(&self) -> &D {
        &self.domain
    }

    #[must_use]
    pub fn range(&self) -> &R {
        &self.range
    }
}

impl<D: Domain, R: Range> FunctionSet<D, R> {
    #[must_use]
    pub fn new(domain: D, range: R) -> Self {
        Self {
            domain: Arc::new(domain),
            range: Arc::new(range),
        }
    }

    /// Wraps a callable as an element of this set.
    ///
    /// Non-vectorized callables are evaluated one point at a time. An
    /// in-place-only callable cannot be evaluated out of place.
    #[must_use]
    pub fn element(&self, callable: Callable<ValueOf<R>>) -> FunctionSetVector<D, R> {
        FunctionSetVector {
            set: self.clone(),
            expr: Expr::leaf(callable, false),
        }
    }

    /// Re-wraps a vector of an equal set as an element of this one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeConflict`] if `vector` belongs to a different set.
    pub fn element_from(
        &self,
        vector: &FunctionSetVector<D, R>,
    ) -> Result<FunctionSetVector<D, R>> {
        if !self.contains(vector) {
            return Err(not_an_element(vector, self));
        }
        Ok(FunctionSetVector {
            set: self.clone(),
            expr: vector.expr.clone(),
        })
    }
}

impl<D: Domain, R: Range> FunctionSet<D, R> {
    pub(crate) fn element_from_expr(&self, expr: Expr<ValueOf<R>>) -> FunctionSetVector<D, R> {
        FunctionSetVector {
            set: self.clone(),
            expr,
        }
    }
}

impl<D, R> Clone for FunctionSet<D, R> {
    fn clone(&self) -> Self {
        Self {
            domain: Arc::clone(&self.domain),
            range: Arc::clone(&self.range),
        }
    }
}

impl<D: PartialEq, R: PartialEq> PartialEq for FunctionSet<D, R> {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.domain, &other.domain) || self.domain == other.domain)
            && (Arc::ptr_eq(&self.range, &other.range) || self.range == other.range)
    }
}

impl<D: Domain, R: Range> Set for FunctionSet<D, R> {
    type Element = FunctionSetVector<D, R>;

    fn contains(&self, vector: &FunctionSetVector<D, R>) -> bool {
        vector.set == *self
    }
}

impl<D: fmt::Display, R: fmt::Display> fmt::Display for FunctionSet<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionSet({}, {})", self.domain, self.range)
    }
}

impl<D: fmt::Debug, R: fmt::Debug> fmt::Debug for FunctionSet<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSet")
            .field("domain", &self.domain)
            .field("range", &self.range)
            .finish()
    }
}

/// An element of a [`FunctionSet`].
///
/// Holds the set it belongs to and the expression evaluated on calls; see
/// [`Function`] for evaluation.
pub struct FunctionSetVector<D, R: Range> {
    set: FunctionSet<D, R>,
    expr: Expr<ValueOf<R>>,
}

impl<D: Domain, R: Range> FunctionSetVector<D, R> {
    #[must_use]
    pub fn space(&self) -> &FunctionSet<D, R> {
        &self.set
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
    /// Returns [`Error::TypeConflict`] if `other` belongs to a different set.
    pub fn assign(&mut self, other: &Self) -> Result<()> {
        if other.set != self.set {
            return Err(not_an_element(other, &self.set));
        }
        self.expr = other.expr.clone();
        Ok(())
    }
}

impl<D: Domain, R: Range> Function for FunctionSetVector<D, R> {
    type Domain = D;
    type Range = R;

    fn function_set(&self) -> &FunctionSet<D, R> {
        &self.set
    }

    fn expr(&self) -> &Expr<ValueOf<R>> {
        &self.expr
    }
}

impl<D, R: Range> Clone for FunctionSetVector<D, R> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
            expr: self.expr.clone(),
        }
    }
}

impl<D: Domain, R: Range> PartialEq for FunctionSetVector<D, R> {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set && self.expr == other.expr
    }
}

impl<D: Domain, R: Range> fmt::Display for FunctionSetVector<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_vector(f, &self.set, &self.expr)
    }
}

impl<D: Domain, R: Range> fmt::Debug for FunctionSetVector<D, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSetVector")
            .field("set", &self.set)
            .field("expr", &self.expr)
            .finish()
    }
}

/// Writes `set.element(expr)`, flagging non-vectorized expressions.
pub(crate) fn write_vector<S: Scalar>(
    f: &mut fmt::Formatter<'_>,
    set: &impl fmt::Display,
    expr: &Expr<S>,
) -> fmt::Result {
    if expr.is_vectorized() {
        write!(f, "{set}.element({expr})")
    } else {
        write!(f, "{set}.element({expr}, vectorized=false)")
    }
}

pub(crate) fn not_an_element(vector: &impl fmt::Display, set: &impl fmt::Display) -> Error {
    Error::TypeConflict {
        callable: vector.to_string(),
        reason: format!("not an element of {set}"),
    }
}
