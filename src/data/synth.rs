//! Synthetic data root generation.
//!
//! Writes everything the pipeline reads for one zone and one building type:
//!
//! - an LCD export with irregular, roughly hourly readings and noise
//! - the zone table
//! - `seginfo.csv`, `enduse8760.csv`, `monthly.csv` and `summary.csv`
//!
//! Loads are built from hour-of-week shapes plus known heating/cooling slopes.
//! The degree columns hold `T - 55` and `65 - T` (both ≤ 0), so a fit over the
//! generated root recovers the negated slopes: about `-HEATING_SLOPE` for
//! heating and `-COOLING_SLOPE` for cooling. Everything is driven by a seeded
//! `StdRng`; the same config always produces byte-identical files.

use std::f64::consts::TAU;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{COOLING_BALANCE_F, EndUse, HEATING_BALANCE_F, HOURS_PER_YEAR, SegmentId};
use crate::error::AppError;
use crate::io::table::{ensure_parent, write_error};
use crate::io::{ENDUSE8760_FILE, MONTHLY_FILE, SEGINFO_FILE, SUMMARY_FILE};

/// Load added per °F below the heating balance point. Fits report `-HEATING_SLOPE`.
pub const HEATING_SLOPE: f64 = 0.8;
/// Load added per °F above the cooling balance point. Fits report `-COOLING_SLOPE`.
pub const COOLING_SLOPE: f64 = 1.2;

/// Chance that an hour has no LCD reading at all.
const MISSING_READING_PROB: f64 = 0.03;
/// Chance that an hour has an extra special observation.
const EXTRA_READING_PROB: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SynthConfig {
    pub root: PathBuf,
    pub seed: u64,
    pub zone: String,
    pub building_type: String,
    pub year: i32,
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthSummary {
    pub segment: SegmentId,
    pub station: String,
    pub weather_samples: usize,
    pub survey_rows: usize,
}

/// How one end-use is generated.
struct EndUseProfile {
    end_use: EndUse,
    /// Label written to the survey, including the usual misspellings.
    label: &'static str,
    fuel: &'static str,
    floor_area: f64,
    weekday: fn(usize) -> f64,
    weekend: fn(usize) -> f64,
    heating: f64,
    cooling: f64,
}

fn occupied(h: usize) -> bool {
    (7..19).contains(&h)
}

fn profiles() -> Vec<EndUseProfile> {
    vec![
        EndUseProfile {
            end_use: EndUse::Heating,
            label: "Heat",
            fuel: "Elec",
            floor_area: 40_000.0,
            weekday: |h| if occupied(h) { 2.0 } else { 0.5 },
            weekend: |_| 0.5,
            heating: HEATING_SLOPE,
            cooling: 0.0,
        },
        EndUseProfile {
            end_use: EndUse::Cooling,
            label: "Cool",
            fuel: "Elec",
            floor_area: 60_000.0,
            weekday: |h| if occupied(h) { 3.0 } else { 0.5 },
            weekend: |_| 0.5,
            heating: 0.0,
            cooling: COOLING_SLOPE,
        },
        EndUseProfile {
            end_use: EndUse::Vent,
            label: "Vent",
            fuel: "Elec",
            floor_area: 60_000.0,
            weekday: |h| if occupied(h) { 4.0 } else { 1.0 },
            weekend: |_| 1.0,
            heating: 0.2,
            cooling: 0.3,
        },
        EndUseProfile {
            end_use: EndUse::IntLight,
            label: "IntLight",
            fuel: "Elec",
            floor_area: 60_000.0,
            weekday: |h| if occupied(h) { 6.0 } else { 1.5 },
            weekend: |h| if occupied(h) { 2.0 } else { 1.5 },
            heating: 0.0,
            cooling: 0.0,
        },
        EndUseProfile {
            end_use: EndUse::OfficeEquip,
            label: "OffEquip",
            fuel: "Elec",
            floor_area: 60_000.0,
            weekday: |h| if occupied(h) { 5.0 } else { 2.0 },
            weekend: |_| 2.0,
            heating: 0.0,
            cooling: 0.0,
        },
        EndUseProfile {
            end_use: EndUse::Refrig,
            label: "Refrig",
            fuel: "Elec",
            floor_area: 60_000.0,
            weekday: |_| 1.0,
            weekend: |_| 1.0,
            heating: 0.0,
            cooling: 0.0,
        },
        EndUseProfile {
            end_use: EndUse::WaterHeat,
            label: "HotWater",
            fuel: "Gas",
            floor_area: 0.0,
            weekday: |h| if occupied(h) { 1.0 } else { 0.2 },
            weekend: |_| 0.2,
            heating: 0.0,
            cooling: 0.0,
        },
    ]
}

/// "True" temperature at a fractional hour of the year.
fn true_temperature(hour: f64, days_in_year: f64) -> f64 {
    let seasonal = (hour / (24.0 * days_in_year) * TAU).cos();
    let diurnal = ((hour - 9.0) / 24.0 * TAU).sin();
    57.0 - 22.0 * seasonal + 9.0 * diurnal
}

pub fn generate(config: &SynthConfig) -> Result<SynthSummary, AppError> {
    let start = NaiveDate::from_ymd_opt(config.year, 1, 1)
        .ok_or_else(|| AppError::new(2, format!("Invalid year {}", config.year)))?;
    let end = NaiveDate::from_ymd_opt(config.year + 1, 1, 1)
        .ok_or_else(|| AppError::new(2, format!("Invalid year {}", config.year)))?;
    if config.zone.contains('_') || config.zone.is_empty() || config.building_type.is_empty() {
        return Err(AppError::new(2, "Zone must be non-empty without '_' and building type non-empty."));
    }
    let segment = SegmentId {
        zone: config.zone.clone(),
        building_type: config.building_type.clone(),
    };
    // The survey calendar stops at hour 8760, dropping Dec 31 in leap years.
    let days = ((end - start).num_days() as usize).min(HOURS_PER_YEAR / 24);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 1.5).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let load_noise =
        Normal::new(0.0, 0.05).map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let station = format!("SYNTH:{}", config.zone);
    let root = &config.root;

    // Zone table.
    let zones_path = root.join("weather_zones.csv");
    let mut zones = open_writer(&zones_path)?;
    write_row(&mut zones, &zones_path, ["AREA", "STATION"])?;
    write_row(&mut zones, &zones_path, [config.zone.as_str(), station.as_str()])?;
    flush(zones, &zones_path)?;

    // LCD export.
    let lcd_path = root.join("weather").join("lcd.csv");
    let mut lcd = open_writer(&lcd_path)?;
    write_row(&mut lcd, &lcd_path, ["STATION", "DATE", "HOURLYDRYBULBTEMPF"])?;
    let midnight = start.and_hms_opt(0, 0, 0).ok_or_else(|| AppError::new(4, "Invalid start time"))?;
    let mut weather_samples = 0;
    for hour in 0..days * 24 {
        if rng.r#gen::<f64>() < MISSING_READING_PROB {
            continue;
        }
        let mut minutes = vec![rng.gen_range(45..60)];
        if rng.r#gen::<f64>() < EXTRA_READING_PROB {
            minutes.push(rng.gen_range(5..40));
            minutes.sort_unstable();
        }
        for minute in minutes {
            let stamp = midnight + Duration::hours(hour as i64) + Duration::minutes(minute);
            let t = true_temperature(hour as f64 + minute as f64 / 60.0, days as f64) + noise.sample(&mut rng);
            write_row(
                &mut lcd,
                &lcd_path,
                [
                    station.clone(),
                    stamp.format("%Y-%m-%d %H:%M").to_string(),
                    format!("{:.0}", t),
                ],
            )?;
            weather_samples += 1;
        }
    }
    flush(lcd, &lcd_path)?;

    // Segment files.
    let seg_dir = root.join("survey").join(segment.name());
    write_seginfo(&seg_dir.join(SEGINFO_FILE), &segment, config.year)?;

    let profiles = profiles();
    // Monthly accumulators: [month][daytype][hour][end-use] -> (sum, count)
    let mut monthly = vec![[[[(0.0_f64, 0usize); 13]; 24]; 3]; 12];

    let enduse_path = seg_dir.join(ENDUSE8760_FILE);
    let mut survey = open_writer(&enduse_path)?;
    let mut header = vec!["SegID".to_string(), "EndUse".into(), "Fuel".into(), "Mth".into(), "Dy".into()];
    header.extend((1..=24).map(|h| format!("Hr{h:02}")));
    write_row(&mut survey, &enduse_path, &header)?;

    let mut survey_rows = 0;
    for profile in &profiles {
        let column = EndUse::ALL.iter().position(|e| *e == profile.end_use).unwrap_or(0);
        for day in 0..days {
            let date = start + Duration::days(day as i64);
            let weekday = date.weekday().number_from_monday();
            let mut record = vec![
                segment.name(),
                profile.label.to_string(),
                profile.fuel.to_string(),
                date.month().to_string(),
                date.day().to_string(),
            ];
            for h in 0..24 {
                let t = true_temperature((date.ordinal0() as usize * 24 + h) as f64, days as f64);
                let base = if weekday <= 5 { (profile.weekday)(h) } else { (profile.weekend)(h) };
                let load = base
                    + profile.heating * (HEATING_BALANCE_F - t).max(0.0)
                    + profile.cooling * (t - COOLING_BALANCE_F).max(0.0)
                    + load_noise.sample(&mut rng);
                let load = load.max(0.0);
                record.push(format!("{load:.4}"));

                let daytype = match weekday {
                    6 => 1,
                    7 => 2,
                    _ => 0,
                };
                let cell = &mut monthly[date.month0() as usize][daytype][h][column];
                cell.0 += load;
                cell.1 += 1;
            }
            write_row(&mut survey, &enduse_path, &record)?;
            survey_rows += 1;
        }
    }
    flush(survey, &enduse_path)?;

    write_monthly(&seg_dir.join(MONTHLY_FILE), &segment, &monthly)?;
    write_summary(&seg_dir.join(SUMMARY_FILE), &profiles)?;

    Ok(SynthSummary {
        segment,
        station,
        weather_samples,
        survey_rows,
    })
}

fn write_seginfo(path: &Path, segment: &SegmentId, year: i32) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;
    write_row(&mut writer, path, ["SegID".to_string(), segment.name()])?;
    write_row(&mut writer, path, ["Description".to_string(), format!("Synthetic {}", segment.building_type)])?;
    write_row(&mut writer, path, ["AnalysisYear".to_string(), year.to_string()])?;
    flush(writer, path)
}

fn write_monthly(path: &Path, segment: &SegmentId, monthly: &[[[[(f64, usize); 13]; 24]; 3]]) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;
    let mut header = vec!["SegID".to_string(), "Mth".into(), "Dy".into(), "Hr".into()];
    header.extend(EndUse::ALL.iter().map(|e| e.name().to_string()));
    write_row(&mut writer, path, &header)?;

    for (month, by_daytype) in monthly.iter().enumerate() {
        for (daytype, by_hour) in by_daytype.iter().enumerate() {
            for (hour, cells) in by_hour.iter().enumerate() {
                let mut record = vec![
                    segment.name(),
                    (month + 1).to_string(),
                    (10 + daytype).to_string(),
                    (hour + 1).to_string(),
                ];
                record.extend(cells.iter().map(|&(sum, n)| {
                    let mean = if n > 0 { sum / n as f64 } else { 0.0 };
                    format!("{mean:.4}")
                }));
                write_row(&mut writer, path, &record)?;
            }
        }
    }
    flush(writer, path)
}

fn write_summary(path: &Path, profiles: &[EndUseProfile]) -> Result<(), AppError> {
    let mut writer = open_writer(path)?;
    write_row(&mut writer, path, ["EndUse", "FloorArea"])?;
    for end_use in EndUse::ALL {
        let area = profiles
            .iter()
            .find(|p| p.end_use == end_use)
            .map(|p| p.floor_area)
            .unwrap_or(0.0);
        write_row(&mut writer, path, [end_use.long_name().to_string(), format!("{area}")])?;
    }
    flush(writer, path)
}

fn open_writer(path: &Path) -> Result<csv::Writer<File>, AppError> {
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| write_error(path, e))?;
    Ok(csv::Writer::from_writer(file))
}

fn write_row<I, T>(writer: &mut csv::Writer<File>, path: &Path, record: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    writer.write_record(record).map_err(|e| write_error(path, e))
}

fn flush(mut writer: csv::Writer<File>, path: &Path) -> Result<(), AppError> {
    writer.flush().map_err(|e| write_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use crate::io::{read_enduse_records, read_lcd, read_segment_info, read_weather_zones};

    fn config(root: &Path, seed: u64) -> SynthConfig {
        SynthConfig {
            root: root.to_path_buf(),
            seed,
            zone: "FCZ09".to_string(),
            building_type: "SOFF".to_string(),
            year: 2002,
        }
    }

    #[test]
    fn generated_root_is_readable() {
        let tmp = tempfile::tempdir().unwrap();
        let summary = generate(&config(tmp.path(), 7)).unwrap();
        assert_eq!(summary.segment.name(), "FCZ09_SOFF");
        assert_eq!(summary.survey_rows, 7 * 365);

        let zones = read_weather_zones(&tmp.path().join("weather_zones.csv")).unwrap();
        assert_eq!(zones[0].station, summary.station);

        let lcd = read_lcd(&tmp.path().join("weather").join("lcd.csv")).unwrap();
        assert_eq!(lcd.rows_dropped, 0);
        let samples = lcd.samples(&summary.station);
        assert_eq!(samples.len(), summary.weather_samples);
        // Readings are off the hour boundary.
        assert!(samples.iter().any(|s| s.timestamp.hour() == 0 && s.timestamp.minute() != 0));

        let seg_dir = tmp.path().join("survey").join("FCZ09_SOFF");
        let info = read_segment_info(&seg_dir.join(SEGINFO_FILE)).unwrap();
        assert_eq!(info.analysis_year, 2002);
        let records = read_enduse_records(&seg_dir.join(ENDUSE8760_FILE)).unwrap();
        assert_eq!(records.len(), summary.survey_rows);
        assert!(records.iter().all(|r| r.loads.iter().all(|&l| l >= 0.0)));
    }

    #[test]
    fn same_seed_same_files() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        generate(&config(a.path(), 42)).unwrap();
        generate(&config(b.path(), 42)).unwrap();
        let lcd = |root: &Path| std::fs::read(root.join("weather").join("lcd.csv")).unwrap();
        assert_eq!(lcd(a.path()), lcd(b.path()));

        let c = tempfile::tempdir().unwrap();
        generate(&config(c.path(), 43)).unwrap();
        assert_ne!(lcd(a.path()), lcd(c.path()));
    }

    #[test]
    fn zone_names_with_separator_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = config(tmp.path(), 1);
        cfg.zone = "FCZ_09".to_string();
        assert_eq!(generate(&cfg).unwrap_err().exit_code(), 2);
    }
}
