//! Survey exports, one directory per segment under `survey/`.
//!
//! - `seginfo.csv`: headerless `key,value` rows (`SegID`, `AnalysisYear`, `Description`)
//! - `enduse8760.csv`: `SegID,EndUse,Fuel,Mth,Dy,Hr01..Hr24`
//!
//! Plus the optional root-level `holidays.csv` (single `date` column).

use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{EndUseRecord, FuelType, SegmentId};
use crate::error::AppError;
use crate::io::table::{Table, cell, open_headerless, parse_date, parse_f64, parse_whole};

pub const SEGINFO_FILE: &str = "seginfo.csv";
pub const ENDUSE8760_FILE: &str = "enduse8760.csv";

/// Segment metadata from `seginfo.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInfo {
    pub id: SegmentId,
    pub analysis_year: i32,
    pub description: Option<String>,
}

pub fn read_segment_info(path: &Path) -> Result<SegmentInfo, AppError> {
    let mut reader = open_headerless(path)?;

    let mut seg_id = None;
    let mut year = None;
    let mut description = None;
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 1;
        let record = result.map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        let (Some(key), value) = (cell(&record, 0), cell(&record, 1)) else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "segid" => seg_id = value.map(str::to_string),
            "analysisyear" => {
                let v = value
                    .and_then(parse_whole)
                    .ok_or_else(|| AppError::new(2, format!("'{}' line {line}: invalid AnalysisYear", path.display())))?;
                year = Some(v as i32);
            }
            "description" => description = value.map(str::to_string),
            _ => {}
        }
    }

    let seg_id = seg_id.ok_or_else(|| AppError::new(2, format!("'{}': missing SegID", path.display())))?;
    let id = SegmentId::parse(&seg_id)
        .ok_or_else(|| AppError::new(2, format!("'{}': SegID '{seg_id}' is not ZONE_BTYPE", path.display())))?;
    let analysis_year = year.ok_or_else(|| AppError::new(2, format!("'{}': missing AnalysisYear", path.display())))?;

    Ok(SegmentInfo {
        id,
        analysis_year,
        description,
    })
}

/// Read all hourly survey rows. Blank hourly cells read as zero load.
pub fn read_enduse_records(path: &Path) -> Result<Vec<EndUseRecord>, AppError> {
    let mut table = Table::open(path)?;
    let label_idx = table.require(path, "EndUse")?;
    let fuel_idx = table.require(path, "Fuel")?;
    let month_idx = table.require(path, "Mth")?;
    let day_idx = table.require(path, "Dy")?;
    let hour_idx = (1..=24)
        .map(|h| table.require(path, &format!("Hr{h:02}")))
        .collect::<Result<Vec<usize>, AppError>>()?;

    let mut records = Vec::new();
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let bad = |msg: String| AppError::new(2, format!("'{}' line {line}: {msg}", path.display()));
        let record = result.map_err(|e| bad(e.to_string()))?;

        let label = cell(&record, label_idx).ok_or_else(|| bad("missing EndUse".to_string()))?;
        let fuel = cell(&record, fuel_idx).unwrap_or("");
        let month = cell(&record, month_idx)
            .and_then(parse_whole)
            .ok_or_else(|| bad("invalid Mth".to_string()))?;
        let day = cell(&record, day_idx)
            .and_then(parse_whole)
            .ok_or_else(|| bad("invalid Dy".to_string()))?;

        let mut loads = [0.0; 24];
        for (h, (&col, load)) in hour_idx.iter().zip(loads.iter_mut()).enumerate() {
            match cell(&record, col) {
                None => {}
                raw => *load = parse_f64(raw).ok_or_else(|| bad(format!("invalid Hr{:02}", h + 1)))?,
            }
        }

        records.push(EndUseRecord {
            label: label.to_string(),
            fuel: FuelType::parse(fuel),
            month,
            day,
            loads,
        });
    }
    Ok(records)
}

/// Holiday dates. A missing file means no holidays.
pub fn read_holidays(path: &Path) -> Result<Vec<NaiveDate>, AppError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut table = Table::open(path)?;
    let date_idx = table.require(path, "date")?;

    let mut dates = Vec::new();
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        let Some(raw) = cell(&record, date_idx) else {
            continue;
        };
        let date = parse_date(raw).map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        dates.push(date);
    }
    Ok(dates)
}

/// Segment directories under `survey_dir`, sorted by name.
///
/// Directories whose name is not `ZONE_BTYPE` or that lack an
/// `enduse8760.csv` are ignored.
pub fn list_segments(survey_dir: &Path) -> Result<Vec<SegmentId>, AppError> {
    let entries = std::fs::read_dir(survey_dir)
        .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", survey_dir.display())))?;

    let mut segments = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", survey_dir.display())))?;
        let path = entry.path();
        if !path.is_dir() || !path.join(ENDUSE8760_FILE).is_file() {
            continue;
        }
        if let Some(segment) = path.file_name().and_then(|n| n.to_str()).and_then(SegmentId::parse) {
            segments.push(segment);
        }
    }
    segments.sort();
    Ok(segments)
}
