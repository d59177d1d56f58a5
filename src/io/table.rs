//! Shared CSV plumbing for the readers in this module.
//!
//! Every input is read the same way: flexible record lengths, whitespace
//! trimmed, headers matched case-insensitively with any UTF-8 BOM stripped.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::error::AppError;

/// An open CSV file plus a lookup from normalized header name to column index.
pub struct Table {
    pub reader: csv::Reader<File>,
    pub headers: HashMap<String, usize>,
}

impl Table {
    /// Open a CSV with a header row.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
            .clone();

        Ok(Self {
            reader,
            headers: build_header_map(&headers),
        })
    }

    /// Index of a column that must be present.
    pub fn require(&self, path: &Path, name: &str) -> Result<usize, AppError> {
        self.headers
            .get(&normalize_header_name(name))
            .copied()
            .ok_or_else(|| AppError::new(2, format!("'{}': missing required column `{name}`", path.display())))
    }
}

/// Open a headerless CSV (e.g. `key,value` files).
pub fn open_headerless(path: &Path) -> Result<csv::Reader<File>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Non-empty trimmed cell.
pub fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a whole number that may have been exported as a float (`7` or `7.0`).
pub fn parse_whole(s: &str) -> Option<u32> {
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}

/// Parse a finite float; blank cells read as `None`.
pub fn parse_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD, DD-MM-YYYY."
    ))
}

pub fn write_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(2, format!("Failed to write '{}': {e}", path.display()))
}

/// Create `path`'s parent directory if needed.
pub fn ensure_parent(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display())))?;
    }
    Ok(())
}
