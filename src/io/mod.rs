//! Input/output helpers.
//!
//! - weather zone table, LCD export and normalized series (`weather`)
//! - survey segment info, hourly end-use rows, holidays (`survey`)
//! - fitted load-shape files (`loadshape`)
//! - monthly day-type profiles (`profile`)
//!
//! Readers return `AppError` with exit code 2 on malformed input; nothing here
//! does any fitting.

pub mod loadshape;
pub mod profile;
pub mod survey;
pub mod table;
pub mod weather;

pub use loadshape::*;
pub use profile::*;
pub use survey::*;
pub use weather::*;
