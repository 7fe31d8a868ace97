//! Function sets, function spaces and their lazy algebra.
//!
//! This crate models functions on a domain as elements of sets and vector
//! spaces:
//!
//! - [`set`]: domains and ranges such as [`set::IntervalProd`] and the scalar
//!   fields [`set::RealNumbers`] and [`set::ComplexNumbers`]
//! - [`Callable`]: user code tagged with a calling convention, optionally
//!   produced by [`vectorize`]
//! - [`FunctionSet`]: all functions from a domain to a range, whose elements
//!   are evaluated through the [`Function`] protocol with input classification,
//!   shape inference and bounds checks
//! - [`FunctionSpace`]: functions into a field, with linear combinations,
//!   pointwise products, quotients and powers recorded as expression trees
//! - [`Observer`]: the hook through which iterative algorithms report progress
//!
//! # Example
//!
//! ```
//! use fnspace_core::{Callable, Function, FunctionSpace, Meshgrid};
//! use fnspace_core::set::IntervalProd;
//! use ndarray::array;
//!
//! let space = FunctionSpace::new(IntervalProd::rectangle([0.0, 0.0], [1.0, 1.0]));
//! let x = space.element(Callable::out_of_place(|p| Ok(p.coord(0))));
//! let y = space.element(Callable::out_of_place(|p| Ok(p.coord(1))));
//!
//! let product = &x * &y;
//! let grid = Meshgrid::sparse(&[array![0.0, 1.0], array![0.5, 1.0]]);
//! let values = product.call(grid).unwrap().array().unwrap();
//! assert_eq!(values, array![[0.0, 0.0], [0.5, 1.0]].into_dyn());
//! ```

mod callable;
mod error;
mod expr;
mod function;
mod function_set;
mod function_space;
mod observer;
mod points;
mod scalar;
mod vectorize;

pub mod set;

pub use callable::{Callable, Dispatch, DualUseFn, InPlaceFn, Leaf, OutOfPlaceFn, PointFn};
pub use error::{Error, Result};
pub use expr::{Expr, Node};
pub use function::{CallOptions, Function, Output};
pub use function_set::{FunctionSet, FunctionSetVector};
pub use function_space::{FunctionSpace, FunctionSpaceVector};
pub use observer::Observer;
pub use points::{
    Input, Meshgrid, MeshgridOrder, Points, is_valid_input_array, is_valid_input_meshgrid,
    out_shape_from_array, out_shape_from_meshgrid,
};
pub use scalar::Scalar;
pub use vectorize::{OutArg, Vectorized, vectorize};
