//! Reporting: batch outcomes, the run manifest, and terminal summaries.

pub mod format;
pub mod manifest;

pub use format::*;
pub use manifest::*;
