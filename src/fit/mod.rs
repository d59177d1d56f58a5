//! Load-shape fitting.
//!
//! Responsibilities:
//!
//! - build the per-end-use design over included hours (`design`)
//! - solve each design and collect per-end-use outcomes (parallel) (`fitter`)
//! - map coefficients back onto hourly shapes and sensitivities (`extract`)

pub mod design;
pub mod extract;
pub mod fitter;

pub use design::*;
pub use extract::*;
pub use fitter::*;
