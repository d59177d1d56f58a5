//! Weather files.
//!
//! - `weather_zones.csv`: `AREA,STATION`, one zone per row
//! - `weather/lcd.csv`: raw station observations (`STATION,DATE,HOURLYDRYBULBTEMPF`)
//! - `weather/<ZONE>.csv`: the normalized 8760-hour series (`hour,drybulb`)

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::domain::{HOURS_PER_YEAR, WeatherSample, WeatherSeries};
use crate::error::AppError;
use crate::io::table::{Table, cell, ensure_parent, parse_f64, write_error};

const HOUR_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the zone table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherZone {
    pub area: String,
    pub station: String,
}

/// Raw observations grouped by station.
#[derive(Debug, Clone, Default)]
pub struct LcdData {
    pub by_station: HashMap<String, Vec<WeatherSample>>,
    pub rows_read: usize,
    /// Rows without a parseable timestamp or temperature.
    pub rows_dropped: usize,
}

impl LcdData {
    /// Samples for `station`, in file order. Empty when the station is absent.
    pub fn samples(&self, station: &str) -> &[WeatherSample] {
        self.by_station.get(station).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn read_weather_zones(path: &Path) -> Result<Vec<WeatherZone>, AppError> {
    let mut table = Table::open(path)?;
    let area_idx = table.require(path, "AREA")?;
    let station_idx = table.require(path, "STATION")?;

    let mut zones = Vec::new();
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("'{}' line {line}: {e}", path.display())))?;
        let (Some(area), Some(station)) = (cell(&record, area_idx), cell(&record, station_idx)) else {
            return Err(AppError::new(
                2,
                format!("'{}' line {line}: AREA and STATION are required", path.display()),
            ));
        };
        zones.push(WeatherZone {
            area: area.to_string(),
            station: station.to_string(),
        });
    }
    Ok(zones)
}

/// Read every observation in an LCD export.
///
/// Rows with a missing or unparseable timestamp or temperature are dropped and
/// counted; they never fail the read.
pub fn read_lcd(path: &Path) -> Result<LcdData, AppError> {
    let mut table = Table::open(path)?;
    let station_idx = table.require(path, "STATION")?;
    let date_idx = table.require(path, "DATE")?;
    let temp_idx = table.require(path, "HOURLYDRYBULBTEMPF")?;

    let mut data = LcdData::default();
    for result in table.reader.records() {
        data.rows_read += 1;
        let Ok(record) = result else {
            data.rows_dropped += 1;
            continue;
        };
        let sample = cell(&record, date_idx)
            .and_then(parse_lcd_timestamp)
            .zip(parse_lcd_temperature(cell(&record, temp_idx)));
        match (cell(&record, station_idx), sample) {
            (Some(station), Some((timestamp, drybulb_f))) => {
                data.by_station
                    .entry(station.to_string())
                    .or_default()
                    .push(WeatherSample { timestamp, drybulb_f });
            }
            _ => data.rows_dropped += 1,
        }
    }

    debug!(
        path = %path.display(),
        rows = data.rows_read,
        dropped = data.rows_dropped,
        stations = data.by_station.len(),
        "read LCD export"
    );
    Ok(data)
}

fn parse_lcd_timestamp(s: &str) -> Option<NaiveDateTime> {
    const FMTS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    FMTS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// LCD flags suspect readings with a trailing `s`; the value itself is kept.
fn parse_lcd_temperature(s: Option<&str>) -> Option<f64> {
    parse_f64(s.map(|v| v.trim_end_matches('s')))
}

/// Write a normalized series as `hour,drybulb` with one decimal.
pub fn write_weather_csv(path: &Path, series: &WeatherSeries) -> Result<(), AppError> {
    ensure_parent(path)?;
    let start = year_start(series.year())
        .ok_or_else(|| AppError::new(2, format!("Year {} is out of range", series.year())))?;

    let file = File::create(path).map_err(|e| write_error(path, e))?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(["hour", "drybulb"]).map_err(|e| write_error(path, e))?;
    for (hour, t) in series.iter() {
        let stamp = start + Duration::hours(hour as i64);
        writer
            .write_record([stamp.format(HOUR_FORMAT).to_string(), format!("{t:.1}")])
            .map_err(|e| write_error(path, e))?;
    }
    writer.flush().map_err(|e| write_error(path, e))
}

/// Read a normalized series back.
///
/// The file must hold exactly 8760 contiguous hours starting at January 1,
/// 00:00 of a single year.
pub fn read_weather_csv(path: &Path) -> Result<WeatherSeries, AppError> {
    let mut table = Table::open(path)?;
    let hour_idx = table.require(path, "hour")?;
    let temp_idx = table.require(path, "drybulb")?;

    let mut start: Option<NaiveDateTime> = None;
    let mut year = 0;
    let mut values = Vec::with_capacity(HOURS_PER_YEAR);
    for (idx, result) in table.reader.records().enumerate() {
        let line = idx + 2;
        let bad = |msg: &str| AppError::new(2, format!("'{}' line {line}: {msg}", path.display()));
        let record = result.map_err(|e| bad(&e.to_string()))?;

        let stamp = cell(&record, hour_idx)
            .and_then(|s| NaiveDateTime::parse_from_str(s, HOUR_FORMAT).ok())
            .ok_or_else(|| bad("invalid hour timestamp"))?;
        let t = parse_f64(cell(&record, temp_idx)).ok_or_else(|| bad("invalid drybulb"))?;

        let first = match start {
            Some(first) => first,
            None => {
                year = stamp.year();
                let first = year_start(year).ok_or_else(|| bad("year out of range"))?;
                start = Some(first);
                first
            }
        };
        if stamp != first + Duration::hours(values.len() as i64) {
            return Err(bad("hours are not contiguous from January 1, 00:00"));
        }
        values.push(t);
    }

    let rows = values.len();
    WeatherSeries::from_hourly(year, values).ok_or_else(|| {
        AppError::new(
            2,
            format!("'{}': expected {HOURS_PER_YEAR} hours, found {rows}", path.display()),
        )
    })
}

fn year_start(year: i32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)
}
