//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - survey and weather inputs (`EndUseRecord`, `WeatherSample`, `WeatherSeries`)
//! - the fixed end-use category set and its lookup tables (`EndUse`, `EndUseCatalog`)
//! - fit outputs (`LoadShapeResult`) and the resolved `RunConfig`

pub mod catalog;
pub mod types;

pub use catalog::*;
pub use types::*;
