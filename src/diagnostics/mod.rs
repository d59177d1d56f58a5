//! Failure dumps for fits that could not be solved.
//!
//! When a solve fails, the pruned design matrix and response vector are written
//! out so the failure can be inspected offline:
//!
//! - `<dir>/<SEGMENT>_<EndUse>_A.csv`: header `hour,<fixed column ids>`, one row per observation
//! - `<dir>/<SEGMENT>_<EndUse>_y.csv`: header `hour,load`
//!
//! The solver itself never touches the filesystem; the fitter hands the design
//! to a [`FailureSink`].

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::{EndUse, SegmentId};
use crate::error::AppError;
use crate::fit::design::PrunedDesign;

/// Destination for designs whose solve failed.
pub trait FailureSink: Send + Sync {
    /// Persist the design. Returns the location written, if any.
    fn persist(&self, segment: &SegmentId, end_use: EndUse, design: &PrunedDesign)
    -> Result<Option<PathBuf>, AppError>;
}

/// Writes dumps as CSV files into a directory.
#[derive(Debug, Clone)]
pub struct DumpDir {
    dir: PathBuf,
}

impl DumpDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn matrix_path(&self, segment: &SegmentId, end_use: EndUse) -> PathBuf {
        self.dir.join(format!("{segment}_{end_use}_A.csv"))
    }

    pub fn response_path(&self, segment: &SegmentId, end_use: EndUse) -> PathBuf {
        self.dir.join(format!("{segment}_{end_use}_y.csv"))
    }
}

impl FailureSink for DumpDir {
    fn persist(
        &self,
        segment: &SegmentId,
        end_use: EndUse,
        design: &PrunedDesign,
    ) -> Result<Option<PathBuf>, AppError> {
        create_dir_all(&self.dir)
            .map_err(|e| AppError::new(4, format!("Failed to create dump dir '{}': {e}", self.dir.display())))?;

        let a_path = self.matrix_path(segment, end_use);
        write_matrix(&a_path, design)?;
        write_response(&self.response_path(segment, end_use), design)?;

        warn!(
            segment = %segment,
            end_use = %end_use,
            rows = design.a.nrows(),
            cols = design.a.ncols(),
            path = %a_path.display(),
            "fit failed, design dumped"
        );
        Ok(Some(a_path))
    }
}

/// Discards dumps. Useful when the caller only wants the typed error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDump;

impl FailureSink for NoDump {
    fn persist(&self, _: &SegmentId, _: EndUse, _: &PrunedDesign) -> Result<Option<PathBuf>, AppError> {
        Ok(None)
    }
}

fn write_matrix(path: &Path, design: &PrunedDesign) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;

    let mut header = vec!["hour".to_string()];
    header.extend(design.columns.iter().map(|c| c.to_string()));
    writer.write_record(&header).map_err(|e| write_error(path, e))?;

    for (i, hour) in design.hours.iter().enumerate() {
        let mut record = vec![hour.to_string()];
        record.extend(design.a.row(i).iter().map(|v| v.to_string()));
        writer.write_record(&record).map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

fn write_response(path: &Path, design: &PrunedDesign) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;
    writer
        .write_record(["hour", "load"])
        .map_err(|e| write_error(path, e))?;
    for (hour, value) in design.hours.iter().zip(design.y.iter()) {
        writer
            .write_record([hour.to_string(), value.to_string()])
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

fn open_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create dump '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(file))
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to write dump '{}': {e}", path.display()))
}
