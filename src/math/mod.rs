//! Mathematical utilities: least squares via the normal equations.

pub mod ols;

pub use ols::*;
