//! Dense-matrix support for the factorization engine.

pub mod dense;
pub use dense::{Axis, DenseOps, concat, split};
