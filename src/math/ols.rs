//! Ordinary least squares via the normal equations.
//!
//! We solve `y ≈ A·x` as `x = (AᵗA)⁻¹ Aᵗy`.
//!
//! Implementation choices:
//! - `AᵗA` is symmetric positive definite whenever `A` has full column rank, so
//!   we factor it with Cholesky instead of forming an explicit inverse.
//! - Cholesky rejects matrices that are not positive definite (e.g. an all-zero
//!   column). Exactly collinear columns often pass the factorization anyway,
//!   leaving a pivot that is round-off relative to its own column, so each
//!   squared pivot is also checked against the matching diagonal of `AᵗA`.
//! - The solver is a pure function: no I/O, no shared state. Failures are
//!   reported as [`SolveError`] and the caller decides what to persist.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Smallest accepted `L_jj² / (AᵗA)_jj`.
///
/// `L_jj²` is the squared norm of column `j` left over after projecting out
/// the columns before it, so the ratio is the share of the column that is not
/// a combination of earlier ones. It is scale-free per column.
const MIN_RELATIVE_PIVOT: f64 = 1e-10;

/// Why a least-squares problem could not be solved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// No rows or no columns.
    #[error("empty system")]
    Empty,
    /// Fewer observations than coefficients.
    #[error("underdetermined: {rows} observations for {cols} coefficients")]
    Underdetermined { rows: usize, cols: usize },
    /// `AᵗA` is singular or numerically so.
    #[error("normal-equations matrix is singular (column {column})")]
    Singular { column: usize },
    /// `AᵗA` is not positive definite.
    #[error("normal-equations matrix is not positive definite")]
    NotPositiveDefinite,
    /// The factorization succeeded but produced non-finite coefficients.
    #[error("non-finite coefficients")]
    NonFinite,
}

/// Coefficients plus goodness of fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub coefficients: DVector<f64>,
    /// `sqrt(mean((A·x - y)²))`.
    pub residual_rms: f64,
}

/// Solve `y ≈ A·x` in the least-squares sense.
pub fn solve_normal_equations(a: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, SolveError> {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 || y.len() != rows {
        return Err(SolveError::Empty);
    }
    if rows < cols {
        return Err(SolveError::Underdetermined { rows, cols });
    }

    let ata = a.tr_mul(a);
    let aty = a.tr_mul(y);

    let scale = ata.diagonal();

    let chol = ata.cholesky().ok_or(SolveError::NotPositiveDefinite)?;
    let pivots = chol.l_dirty().diagonal();
    for (column, (&pivot, &norm)) in pivots.iter().zip(scale.iter()).enumerate() {
        if !(norm > 0.0 && pivot.is_finite() && pivot * pivot > MIN_RELATIVE_PIVOT * norm) {
            return Err(SolveError::Singular { column });
        }
    }

    let x = chol.solve(&aty);
    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let residual = a * &x - y;
    let residual_rms = (residual.norm_squared() / rows as f64).sqrt();

    Ok(OlsFit {
        coefficients: x,
        residual_rms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let fit = solve_normal_equations(&a, &y).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-10);
        assert!((fit.coefficients[1] - 3.0).abs() < 1e-10);
        assert!(fit.residual_rms < 1e-10);
    }

    #[test]
    fn residual_rms_matches_definition() {
        // Intercept-only fit of [1, 3]: mean 2, residuals ±1.
        let a = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0, 3.0]);
        let fit = solve_normal_equations(&a, &y).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-12);
        assert!((fit.residual_rms - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_column_is_singular() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_normal_equations(&a, &y).is_err());
    }

    #[test]
    fn collinear_columns_are_singular() {
        // Second column is -10 × the first.
        let a = DMatrix::from_row_slice(4, 2, &[1.0, -10.0, 1.0, -10.0, 1.0, -10.0, 1.0, -10.0]);
        let y = DVector::from_row_slice(&[20.0, 20.0, 20.0, 20.0]);
        assert!(solve_normal_equations(&a, &y).is_err());
    }

    #[test]
    fn collinearity_hidden_behind_dummies_is_singular() {
        // Intercept, 23 hour dummies and a constant -10 column: the last column
        // is exactly -10 × the intercept but round-off can leave it a small
        // nonzero pivot.
        let rows = 24 * 261;
        let a = DMatrix::from_fn(rows, 25, |i, j| match j {
            0 => 1.0,
            24 => -10.0,
            _ => if i % 24 == j { 1.0 } else { 0.0 },
        });
        let y = DVector::from_element(rows, 20.0);
        assert!(solve_normal_equations(&a, &y).is_err());
    }

    #[test]
    fn columns_of_very_different_scale_still_solve() {
        // y = 1 + 1e-4·x with x in thousands: tiny and large columns side by side.
        let a = DMatrix::from_fn(20, 2, |i, j| if j == 0 { 1.0 } else { 1000.0 * i as f64 });
        let y = DVector::from_fn(20, |i, _| 1.0 + 0.1 * i as f64);
        let fit = solve_normal_equations(&a, &y).unwrap();
        assert!((fit.coefficients[1] - 1e-4).abs() < 1e-12);
    }

    #[test]
    fn too_few_rows_is_underdetermined() {
        let a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let y = DVector::from_row_slice(&[1.0]);
        assert_eq!(
            solve_normal_equations(&a, &y),
            Err(SolveError::Underdetermined { rows: 1, cols: 2 })
        );
    }

    #[test]
    fn errors_describe_the_failure() {
        let err = SolveError::Underdetermined { rows: 1, cols: 2 };
        assert_eq!(err.to_string(), "underdetermined: 1 observations for 2 coefficients");
        let err: Box<dyn std::error::Error> = Box::new(SolveError::Singular { column: 24 });
        assert!(err.to_string().contains("column 24"));
    }

    #[test]
    fn repeated_solves_are_identical() {
        let a = DMatrix::from_fn(50, 3, |i, j| ((i * (j + 3)) % 7) as f64 + if j == 0 { 1.0 } else { 0.0 });
        let y = DVector::from_fn(50, |i, _| (i % 5) as f64 * 1.5 + 2.0);
        let first = solve_normal_equations(&a, &y);
        let second = solve_normal_equations(&a, &y);
        assert_eq!(first, second);
    }
}
