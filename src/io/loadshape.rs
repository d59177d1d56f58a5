//! Load-shape result files: `loadshape/<ZONE>/<BTYPE>/<EndUse>.csv`.
//!
//! One row per hour of day. The scalar fields (sensitivities, residual) repeat
//! on every row so each file is a flat table.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{EndUse, LoadShapeResult, SegmentId};
use crate::error::AppError;
use crate::io::table::{ensure_parent, write_error};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadShapeRow {
    hour_of_day: usize,
    weekday_load: f64,
    weekend_load: f64,
    heating_sensitivity: f64,
    cooling_sensitivity: f64,
    residual_error: f64,
}

pub fn write_loadshape_csv(path: &Path, result: &LoadShapeResult) -> Result<(), AppError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    for hour in 0..24 {
        writer
            .serialize(LoadShapeRow {
                hour_of_day: hour,
                weekday_load: result.weekday[hour],
                weekend_load: result.weekend[hour],
                heating_sensitivity: result.heating_sensitivity,
                cooling_sensitivity: result.cooling_sensitivity,
                residual_error: result.residual_rms,
            })
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

/// Read a result file back. The observation count is not stored and reads as 0.
pub fn read_loadshape_csv(path: &Path) -> Result<LoadShapeResult, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut result = LoadShapeResult {
        weekday: [0.0; 24],
        weekend: [0.0; 24],
        heating_sensitivity: 0.0,
        cooling_sensitivity: 0.0,
        residual_rms: 0.0,
        observations: 0,
    };
    let mut seen = [false; 24];
    for (idx, row) in reader.deserialize::<LoadShapeRow>().enumerate() {
        let line = idx + 2;
        let row = row.map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        if row.hour_of_day >= 24 {
            return Err(AppError::new(
                2,
                format!("'{}' line {line}: HourOfDay {} out of range", path.display(), row.hour_of_day),
            ));
        }
        result.weekday[row.hour_of_day] = row.weekday_load;
        result.weekend[row.hour_of_day] = row.weekend_load;
        result.heating_sensitivity = row.heating_sensitivity;
        result.cooling_sensitivity = row.cooling_sensitivity;
        result.residual_rms = row.residual_error;
        seen[row.hour_of_day] = true;
    }
    if !seen.iter().all(|&s| s) {
        return Err(AppError::new(2, format!("'{}': expected 24 hours of day", path.display())));
    }
    Ok(result)
}

/// A result file found on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoredLoadShape {
    pub segment: SegmentId,
    pub end_use: EndUse,
    pub path: PathBuf,
}

/// Walk `loadshape/<ZONE>/<BTYPE>/<EndUse>.csv`, sorted by segment then end-use.
///
/// Files whose stem is not a known end-use are ignored. A missing root yields
/// an empty list.
pub fn list_loadshapes(root: &Path) -> Result<Vec<StoredLoadShape>, AppError> {
    let mut out = Vec::new();
    if !root.is_dir() {
        return Ok(out);
    }
    for zone_dir in subdirs(root)? {
        for btype_dir in subdirs(&zone_dir)? {
            let (Some(zone), Some(btype)) = (dir_name(&zone_dir), dir_name(&btype_dir)) else {
                continue;
            };
            for path in read_dir_paths(&btype_dir)? {
                let is_csv = path.extension().is_some_and(|ext| ext == "csv");
                let end_use = path.file_stem().and_then(|s| s.to_str()).and_then(EndUse::from_name);
                if let (true, Some(end_use)) = (is_csv, end_use) {
                    out.push(StoredLoadShape {
                        segment: SegmentId {
                            zone: zone.clone(),
                            building_type: btype.clone(),
                        },
                        end_use,
                        path,
                    });
                }
            }
        }
    }
    out.sort();
    Ok(out)
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    Ok(read_dir_paths(dir)?.into_iter().filter(|p| p.is_dir()).collect())
}

fn read_dir_paths(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?;
    entries
        .map(|entry| {
            entry
                .map(|e| e.path())
                .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))
        })
        .collect()
}

fn dir_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}
