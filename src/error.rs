//! Error types.
//!
//! Two layers:
//!
//! - [`EngineError`]: typed failures of the regression engine (normalization,
//!   design matrix construction, solve). Each variant carries enough context
//!   (segment, end-use, date) to diagnose a failure without re-running.
//! - [`AppError`]: the binary boundary, an exit code plus a message.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::EndUse;

/// Failures raised by the regression engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A weather zone has no usable temperature samples.
    #[error("weather zone '{zone}': no usable temperature samples")]
    NoData { zone: String },

    /// A survey row names an end-use outside the known category set.
    #[error("{segment}: end-use '{label}' on {month:02}/{day:02} is not a known category")]
    UnknownEndUse {
        segment: String,
        label: String,
        month: u32,
        day: u32,
    },

    /// The normal-equations matrix could not be inverted.
    #[error(
        "{segment}.{end_use}: least-squares solve failed ({reason}; A is {rows}x{cols}){}",
        .dump.as_ref().map(|p| format!(", design dumped to {}", p.display())).unwrap_or_default()
    )]
    SolverSingular {
        segment: String,
        end_use: EndUse,
        rows: usize,
        cols: usize,
        reason: String,
        dump: Option<PathBuf>,
    },

    /// A survey row does not map onto the 8760-hour calendar of its year.
    #[error("{segment}.{label}({month},{day}): {reason}")]
    ScheduleMismatch {
        segment: String,
        label: String,
        month: u32,
        day: u32,
        reason: String,
    },
}

impl EngineError {
    /// Whether the error abandons the whole segment rather than one end-use.
    pub fn is_segment_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownEndUse { .. } | EngineError::ScheduleMismatch { .. }
        )
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let exit_code = match err {
            EngineError::NoData { .. } => 3,
            EngineError::UnknownEndUse { .. } | EngineError::ScheduleMismatch { .. } => 2,
            EngineError::SolverSingular { .. } => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_carry_context_in_message() {
        let err = EngineError::UnknownEndUse {
            segment: "FCZ01_AOFF".to_string(),
            label: "Lasers".to_string(),
            month: 3,
            day: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("FCZ01_AOFF"));
        assert!(msg.contains("Lasers"));
        assert!(msg.contains("03/07"));
        assert!(err.is_segment_fatal());
    }

    #[test]
    fn singular_error_mentions_dump_path() {
        let err = EngineError::SolverSingular {
            segment: "FCZ02_RETL".to_string(),
            end_use: EndUse::Heating,
            rows: 10,
            cols: 12,
            reason: "underdetermined".to_string(),
            dump: Some(PathBuf::from("dump/FCZ02_RETL_Heating_A.csv")),
        };
        assert!(err.to_string().contains("dump/FCZ02_RETL_Heating_A.csv"));
        assert!(!err.is_segment_fatal());
        assert_eq!(AppError::from(err).exit_code(), 4);
    }
}
