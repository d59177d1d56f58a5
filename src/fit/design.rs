//! Design matrix construction for the hour-of-week + degree-hour model.
//!
//! Column layout (fixed 50-slot coefficient space):
//!
//! | column  | meaning                                                        |
//! |---------|----------------------------------------------------------------|
//! | 0       | intercept: the level of the reference hour-of-week slot        |
//! | 1..=47  | hour-of-week dummy for slot `c` (weekday 1..23, weekend 24..47)|
//! | 48      | heating degrees `T - 55` when `T < 55`, else 0                 |
//! | 49      | cooling degrees `65 - T` when `T > 65`, else 0                 |
//!
//! Hour-of-week slots are `0..48`: weekday hours 0..23 map to slots 0..23,
//! weekend/holiday hours 0..23 to slots 24..47. Slot 0 (weekday 00:00) has no
//! dummy of its own; it is the reference level carried by the intercept. If a
//! category never draws load at weekday 00:00, the lowest observed slot becomes
//! the reference instead and its dummy is dropped, so the intercept never
//! duplicates a sum of dummies.
//!
//! Only hours with strictly positive electric load become rows. We keep one
//! compact row per included hour (slot + degree values) and materialize the
//! dense pruned matrix just before the solve.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use nalgebra::{DMatrix, DVector};

use crate::domain::{
    COOLING_BALANCE_F, EndUse, EndUseCatalog, EndUseRecord, HEATING_BALANCE_F, HOURS_PER_YEAR,
    SegmentId, Sensitivity, WeatherSeries,
};
use crate::error::EngineError;

/// Number of hour-of-week slots (24 weekday + 24 weekend).
pub const WEEK_SLOTS: usize = 48;
/// Size of the fixed coefficient space.
pub const COEFFICIENT_SLOTS: usize = 50;
pub const INTERCEPT_COL: usize = 0;
pub const HEATING_COL: usize = 48;
pub const COOLING_COL: usize = 49;

/// One included hour of one end-use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DesignRow {
    /// Hour of year, 0..8760.
    pub hour: usize,
    /// Hour-of-week slot, 0..48.
    pub slot: usize,
    pub heating: f64,
    pub cooling: f64,
    pub load: f64,
}

impl DesignRow {
    /// Value of fixed column `col` for this row.
    fn value(&self, col: usize) -> f64 {
        match col {
            INTERCEPT_COL => 1.0,
            HEATING_COL => self.heating,
            COOLING_COL => self.cooling,
            c if c == self.slot => 1.0,
            _ => 0.0,
        }
    }
}

/// Included observations for one end-use, keyed by hour of year.
#[derive(Debug, Clone)]
pub struct EndUseDesign {
    pub end_use: EndUse,
    pub sensitivity: Sensitivity,
    rows: BTreeMap<usize, DesignRow>,
}

/// Dense design restricted to included rows and active columns.
#[derive(Debug, Clone, PartialEq)]
pub struct PrunedDesign {
    /// Fixed-layout column index of each dense column, ascending.
    pub columns: Vec<usize>,
    /// Hour of year of each dense row, ascending.
    pub hours: Vec<usize>,
    pub a: DMatrix<f64>,
    pub y: DVector<f64>,
}

impl EndUseDesign {
    fn new(end_use: EndUse, sensitivity: Sensitivity) -> Self {
        Self {
            end_use,
            sensitivity,
            rows: BTreeMap::new(),
        }
    }

    pub fn observations(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = &DesignRow> {
        self.rows.values()
    }

    /// Slot whose level the intercept represents.
    pub fn reference_slot(&self) -> Option<usize> {
        self.rows.values().map(|r| r.slot).min()
    }

    /// Fixed-layout columns that survive pruning, ascending.
    ///
    /// The intercept and every observed slot except the reference are kept;
    /// degree columns are kept whenever the category defines them, even if
    /// they are all zero, so the output schema does not depend on the weather.
    pub fn active_columns(&self) -> Vec<usize> {
        let Some(reference) = self.reference_slot() else {
            return Vec::new();
        };

        let mut observed = [false; WEEK_SLOTS];
        for row in self.rows.values() {
            observed[row.slot] = true;
        }

        let mut cols = vec![INTERCEPT_COL];
        cols.extend((1..WEEK_SLOTS).filter(|&s| observed[s] && s != reference));
        if self.sensitivity.heating {
            cols.push(HEATING_COL);
        }
        if self.sensitivity.cooling {
            cols.push(COOLING_COL);
        }
        cols
    }

    /// Materialize `(A, y)` over included rows and active columns.
    pub fn pruned(&self) -> PrunedDesign {
        let columns = self.active_columns();
        let n = self.rows.len();
        let k = columns.len();

        let mut a = DMatrix::<f64>::zeros(n, k);
        let mut y = DVector::<f64>::zeros(n);
        let mut hours = Vec::with_capacity(n);

        for (i, row) in self.rows.values().enumerate() {
            for (j, &col) in columns.iter().enumerate() {
                a[(i, j)] = row.value(col);
            }
            y[i] = row.load;
            hours.push(row.hour);
        }

        PrunedDesign { columns, hours, a, y }
    }

    fn set(&mut self, row: DesignRow) {
        self.rows.insert(row.hour, row);
    }

    fn clear(&mut self, hour: usize) {
        self.rows.remove(&hour);
    }
}

/// Scan a segment's survey rows and build one design per electric end-use.
///
/// Fails for the whole segment on an unknown end-use label or a row whose
/// date does not fit the survey year. Non-electric rows are validated for
/// their label and otherwise ignored. A later row for the same end-use and day
/// replaces the earlier one.
pub fn build_segment_design(
    segment: &SegmentId,
    year: i32,
    records: &[EndUseRecord],
    weather: &WeatherSeries,
    catalog: &EndUseCatalog,
) -> Result<BTreeMap<EndUse, EndUseDesign>, EngineError> {
    let mut designs: BTreeMap<EndUse, EndUseDesign> = BTreeMap::new();

    for record in records {
        let end_use = catalog
            .resolve(&record.label)
            .ok_or_else(|| EngineError::UnknownEndUse {
                segment: segment.name(),
                label: record.label.clone(),
                month: record.month,
                day: record.day,
            })?;
        if !record.fuel.is_electric() {
            continue;
        }

        let mismatch = |reason: String| EngineError::ScheduleMismatch {
            segment: segment.name(),
            label: record.label.clone(),
            month: record.month,
            day: record.day,
            reason,
        };

        let date = NaiveDate::from_ymd_opt(year, record.month, record.day)
            .ok_or_else(|| mismatch(format!("not a calendar date in {year}")))?;
        let first_hour = date.ordinal0() as usize * 24;
        if first_hour + 24 > HOURS_PER_YEAR {
            return Err(mismatch(format!(
                "{date} falls outside the {HOURS_PER_YEAR}-hour year"
            )));
        }

        let weekend = date.weekday().number_from_monday() > 5 || catalog.is_holiday(date);
        let slot0 = if weekend { 24 } else { 0 };
        let sensitivity = catalog.sensitivity(end_use);
        let design = designs
            .entry(end_use)
            .or_insert_with(|| EndUseDesign::new(end_use, sensitivity));

        for (h, &load) in record.loads.iter().enumerate() {
            let hour = first_hour + h;
            if !(load.is_finite() && load > 0.0) {
                design.clear(hour);
                continue;
            }
            let t = weather
                .at(hour)
                .ok_or_else(|| mismatch(format!("no weather for hour {hour}")))?;
            design.set(DesignRow {
                hour,
                slot: slot0 + h,
                heating: heating_degrees(sensitivity, t),
                cooling: cooling_degrees(sensitivity, t),
                load,
            });
        }
    }

    Ok(designs)
}

fn heating_degrees(sensitivity: Sensitivity, t: f64) -> f64 {
    if sensitivity.heating && t < HEATING_BALANCE_F {
        t - HEATING_BALANCE_F
    } else {
        0.0
    }
}

fn cooling_degrees(sensitivity: Sensitivity, t: f64) -> f64 {
    if sensitivity.cooling && t > COOLING_BALANCE_F {
        COOLING_BALANCE_F - t
    } else {
        0.0
    }
}
