//! `ceus-loadshape` library crate.
//!
//! The binary (`ceus`) is a thin wrapper around this library so that:
//!
//! - the regression engine is testable without spawning processes
//! - I/O, fitting and reporting stay in separate modules
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod profile;
pub mod report;
pub mod weather;
