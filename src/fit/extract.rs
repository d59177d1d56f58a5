//! Map solved coefficients back onto the load-shape result.
//!
//! The solve happens over the pruned column set. We scatter it into the fixed
//! 50-slot coefficient space (pruned columns read as zero) and restore absolute
//! hour-of-week levels by adding the intercept to every slot dummy:
//!
//! - weekday `h`: `coef[0] + coef[h]` for `h` in 1..24, `coef[0]` for `h = 0`
//! - weekend `h`: `coef[0] + coef[24 + h]`
//!
//! That is, the intercept correction applies to fixed columns 1..=47. The
//! reference slot and any never-observed slot carry a zero dummy and therefore
//! report the intercept level.

use nalgebra::DVector;

use crate::domain::{LoadShapeResult, Sensitivity};
use crate::fit::design::{COEFFICIENT_SLOTS, COOLING_COL, HEATING_COL, INTERCEPT_COL, WEEK_SLOTS};

/// Scatter pruned coefficients into the fixed layout.
///
/// # Panics
/// Panics if `columns` and `x` differ in length or a column index is out of
/// the fixed layout. Both come from the same `PrunedDesign`.
pub fn expand_coefficients(columns: &[usize], x: &DVector<f64>) -> [f64; COEFFICIENT_SLOTS] {
    assert_eq!(columns.len(), x.len(), "coefficient/column mismatch");
    let mut full = [0.0; COEFFICIENT_SLOTS];
    for (&col, &value) in columns.iter().zip(x.iter()) {
        full[col] = value;
    }
    full
}

/// Build the result from the fixed-layout coefficients.
pub fn extract_load_shape(
    coefficients: &[f64; COEFFICIENT_SLOTS],
    sensitivity: Sensitivity,
    residual_rms: f64,
    observations: usize,
) -> LoadShapeResult {
    let intercept = coefficients[INTERCEPT_COL];
    let level = |slot: usize| {
        if slot == 0 {
            intercept
        } else {
            intercept + coefficients[slot]
        }
    };

    let mut weekday = [0.0; 24];
    let mut weekend = [0.0; 24];
    for h in 0..24 {
        weekday[h] = level(h);
        weekend[h] = level(WEEK_SLOTS / 2 + h);
    }

    LoadShapeResult {
        weekday,
        weekend,
        heating_sensitivity: if sensitivity.heating {
            coefficients[HEATING_COL]
        } else {
            0.0
        },
        cooling_sensitivity: if sensitivity.cooling {
            coefficients[COOLING_COL]
        } else {
            0.0
        },
        residual_rms,
        observations,
    }
}
