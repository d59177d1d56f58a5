//! Per-segment fitting.
//!
//! Given:
//! - a segment's survey rows
//! - the zone's normalized weather series
//!
//! we build one design per end-use and, for each (in parallel):
//! - solve the normal equations over the pruned design
//! - map the coefficients back onto weekday/weekend shapes and sensitivities
//! - on failure, hand the design to the failure sink and report a typed error
//!
//! Errors local to one end-use never abort its siblings. Errors in the shared
//! design scan (unknown label, bad date) abandon the whole segment.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::diagnostics::FailureSink;
use crate::domain::{EndUse, EndUseCatalog, EndUseRecord, LoadShapeResult, SegmentId, WeatherSeries};
use crate::error::EngineError;
use crate::fit::design::{EndUseDesign, build_segment_design};
use crate::fit::extract::{expand_coefficients, extract_load_shape};
use crate::math::solve_normal_equations;

/// Outcome of fitting every end-use of one segment.
#[derive(Debug)]
pub struct SegmentFit {
    pub segment: SegmentId,
    pub results: BTreeMap<EndUse, Result<LoadShapeResult, EngineError>>,
    /// End-uses present in the survey with no positive electric load.
    pub skipped: Vec<EndUse>,
}

impl SegmentFit {
    pub fn successes(&self) -> impl Iterator<Item = (EndUse, &LoadShapeResult)> {
        self.results
            .iter()
            .filter_map(|(e, r)| r.as_ref().ok().map(|shape| (*e, shape)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (EndUse, &EngineError)> {
        self.results
            .iter()
            .filter_map(|(e, r)| r.as_ref().err().map(|err| (*e, err)))
    }
}

/// Fit a single end-use design.
pub fn fit_end_use(
    segment: &SegmentId,
    design: &EndUseDesign,
    sink: &dyn FailureSink,
) -> Result<LoadShapeResult, EngineError> {
    let pruned = design.pruned();

    match solve_normal_equations(&pruned.a, &pruned.y) {
        Ok(fit) => {
            let coefficients = expand_coefficients(&pruned.columns, &fit.coefficients);
            debug!(
                segment = %segment,
                end_use = %design.end_use,
                rows = pruned.a.nrows(),
                cols = pruned.a.ncols(),
                rms = fit.residual_rms,
                "fit solved"
            );
            Ok(extract_load_shape(
                &coefficients,
                design.sensitivity,
                fit.residual_rms,
                design.observations(),
            ))
        }
        Err(solve_err) => {
            let dump = match sink.persist(segment, design.end_use, &pruned) {
                Ok(path) => path,
                Err(e) => {
                    warn!(segment = %segment, end_use = %design.end_use, "could not dump design: {e}");
                    None
                }
            };
            Err(EngineError::SolverSingular {
                segment: segment.name(),
                end_use: design.end_use,
                rows: pruned.a.nrows(),
                cols: pruned.a.ncols(),
                reason: solve_err.to_string(),
                dump,
            })
        }
    }
}

/// Build designs for a segment and fit every end-use with observations.
pub fn fit_segment(
    segment: &SegmentId,
    year: i32,
    records: &[EndUseRecord],
    weather: &WeatherSeries,
    catalog: &EndUseCatalog,
    sink: &dyn FailureSink,
) -> Result<SegmentFit, EngineError> {
    if weather.year() != year {
        warn!(
            segment = %segment,
            survey_year = year,
            weather_year = weather.year(),
            "weather year differs from survey year"
        );
    }

    let designs = build_segment_design(segment, year, records, weather, catalog)?;

    let (fittable, empty): (Vec<&EndUseDesign>, Vec<&EndUseDesign>) =
        designs.values().partition(|d| d.observations() > 0);

    let results: BTreeMap<EndUse, Result<LoadShapeResult, EngineError>> = fittable
        .par_iter()
        .map(|design| (design.end_use, fit_end_use(segment, design, sink)))
        .collect();

    Ok(SegmentFit {
        segment: segment.clone(),
        results,
        skipped: empty.iter().map(|d| d.end_use).collect(),
    })
}
