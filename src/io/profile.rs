//! Monthly profile files.
//!
//! Inputs (per segment directory):
//! - `monthly.csv`: `SegID,Mth,Dy,Hr,<end-use columns>`, `Dy` is a day-type code
//! - `summary.csv`: `EndUse,FloorArea`
//!
//! Output: `enduse/<ZONE>_<BTYPE>.csv` with `Month,Daytype,Hour,<active end-uses>`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::domain::EndUse;
use crate::error::AppError;
use crate::io::table::{Table, cell, ensure_parent, parse_f64, parse_whole, write_error};
use crate::profile::{DayType, MonthlyRecord, ProfileTable, build_profile_table};

pub const MONTHLY_FILE: &str = "monthly.csv";
pub const SUMMARY_FILE: &str = "summary.csv";

/// Read the monthly export. Rows whose `Dy` is not a day-type code are skipped.
pub fn read_monthly(path: &Path) -> Result<Vec<MonthlyRecord>, AppError> {
    let mut table = Table::open(path)?;
    let month_idx = table.require(path, "Mth")?;
    let daytype_idx = table.require(path, "Dy")?;
    let hour_idx = table.require(path, "Hr")?;
    let load_idx = EndUse::ALL
        .iter()
        .map(|e| table.require(path, e.name()))
        .collect::<Result<Vec<usize>, AppError>>()?;

    let mut records = Vec::new();
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let bad = |msg: &str| AppError::new(2, format!("'{}' line {line}: {msg}", path.display()));
        let record = result.map_err(|e| bad(&e.to_string()))?;

        let Some(day_type) = cell(&record, daytype_idx).and_then(parse_whole).and_then(DayType::from_code) else {
            continue;
        };
        let month = cell(&record, month_idx)
            .and_then(parse_whole)
            .filter(|m| (1..=12).contains(m))
            .ok_or_else(|| bad("invalid Mth"))?;
        let hour = cell(&record, hour_idx)
            .and_then(parse_whole)
            .filter(|h| (1..=24).contains(h))
            .ok_or_else(|| bad("invalid Hr"))?;

        let mut loads = [0.0; 13];
        for (load, &col) in loads.iter_mut().zip(&load_idx) {
            *load = parse_f64(cell(&record, col)).unwrap_or(0.0);
        }
        records.push(MonthlyRecord {
            month,
            day_type,
            hour,
            loads,
        });
    }
    Ok(records)
}

/// Read per-end-use floor areas. `EndUse` may be the short or descriptive name.
pub fn read_floor_areas(path: &Path) -> Result<BTreeMap<EndUse, f64>, AppError> {
    let mut table = Table::open(path)?;
    let label_idx = table.require(path, "EndUse")?;
    let area_idx = table.require(path, "FloorArea")?;

    let mut areas = BTreeMap::new();
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        let Some(label) = cell(&record, label_idx) else {
            continue;
        };
        let end_use = EndUse::from_name(label).ok_or_else(|| {
            AppError::new(2, format!("'{}' line {line}: unknown end-use '{label}'", path.display()))
        })?;
        let area = parse_f64(cell(&record, area_idx)).unwrap_or(0.0);
        areas.insert(end_use, area);
    }
    Ok(areas)
}

/// Write the normalized table with 4-decimal values.
pub fn write_profile_csv(path: &Path, table: &ProfileTable) -> Result<(), AppError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["Month".to_string(), "Daytype".to_string(), "Hour".to_string()];
    header.extend(table.columns.iter().map(|e| e.column_label()));
    writer.write_record(&header).map_err(|e| write_error(path, e))?;

    for row in &table.rows {
        let mut record = vec![row.month.to_string(), row.day_type.to_string(), row.hour.to_string()];
        record.extend(row.values.iter().map(|v| format!("{v:.4}")));
        writer.write_record(&record).map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

/// Read a segment's monthly and summary tables and write its profile.
/// Returns the number of rows written.
pub fn convert_monthly_profile(monthly: &Path, summary: &Path, out: &Path) -> Result<usize, AppError> {
    let records = read_monthly(monthly)?;
    let areas = read_floor_areas(summary)?;
    let table = build_profile_table(&records, &areas);
    write_profile_csv(out, &table)?;
    Ok(table.rows.len())
}
