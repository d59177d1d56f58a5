//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during normalization and fitting
//! - exported to CSV/JSON
//! - reloaded later for summaries

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hours in the (non-leap) survey year.
pub const HOURS_PER_YEAR: usize = 8760;

/// Heating balance point (°F). Heating degrees accumulate below it.
pub const HEATING_BALANCE_F: f64 = 55.0;

/// Cooling balance point (°F). Cooling degrees accumulate above it.
pub const COOLING_BALANCE_F: f64 = 65.0;

/// The fixed set of electrical end-use categories in the survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EndUse {
    Heating,
    Cooling,
    Vent,
    WaterHeat,
    Cooking,
    Refrig,
    ExtLight,
    IntLight,
    OfficeEquip,
    Misc,
    Process,
    Motors,
    AirComp,
}

impl EndUse {
    /// All categories in survey column order.
    pub const ALL: [EndUse; 13] = [
        EndUse::Heating,
        EndUse::Cooling,
        EndUse::Vent,
        EndUse::WaterHeat,
        EndUse::Cooking,
        EndUse::Refrig,
        EndUse::ExtLight,
        EndUse::IntLight,
        EndUse::OfficeEquip,
        EndUse::Misc,
        EndUse::Process,
        EndUse::Motors,
        EndUse::AirComp,
    ];

    /// Short survey label, also used for output file names.
    pub fn name(self) -> &'static str {
        match self {
            EndUse::Heating => "Heating",
            EndUse::Cooling => "Cooling",
            EndUse::Vent => "Vent",
            EndUse::WaterHeat => "WaterHeat",
            EndUse::Cooking => "Cooking",
            EndUse::Refrig => "Refrig",
            EndUse::ExtLight => "ExtLight",
            EndUse::IntLight => "IntLight",
            EndUse::OfficeEquip => "OfficeEquip",
            EndUse::Misc => "Misc",
            EndUse::Process => "Process",
            EndUse::Motors => "Motors",
            EndUse::AirComp => "AirComp",
        }
    }

    /// Descriptive name as it appears in the survey summary sheet.
    pub fn long_name(self) -> &'static str {
        match self {
            EndUse::Heating => "Heating",
            EndUse::Cooling => "Cooling",
            EndUse::Vent => "Ventilation",
            EndUse::WaterHeat => "Water Heating",
            EndUse::Cooking => "Cooking",
            EndUse::Refrig => "Refrigeration",
            EndUse::ExtLight => "Exterior Lighting",
            EndUse::IntLight => "Interior Lighting",
            EndUse::OfficeEquip => "Office Equipment",
            EndUse::Misc => "Miscellaneous",
            EndUse::Process => "Process",
            EndUse::Motors => "Motors",
            EndUse::AirComp => "Air Compressors",
        }
    }
}

impl EndUse {
    /// Look up a category by its short or descriptive name (case-insensitive).
    pub fn from_name(label: &str) -> Option<EndUse> {
        let label = label.trim();
        EndUse::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(label) || e.long_name().eq_ignore_ascii_case(label))
    }

    /// Descriptive name with spaces replaced, for CSV headers.
    pub fn column_label(self) -> String {
        self.long_name().replace(' ', "_")
    }
}

impl fmt::Display for EndUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fuel type of a survey row. Only electric rows feed the regression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuelType {
    Electric,
    Other(String),
}

impl FuelType {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("elec") || label.eq_ignore_ascii_case("electric") {
            FuelType::Electric
        } else {
            FuelType::Other(label.to_string())
        }
    }

    pub fn is_electric(&self) -> bool {
        matches!(self, FuelType::Electric)
    }
}

/// One raw dry-bulb observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    pub timestamp: NaiveDateTime,
    pub drybulb_f: f64,
}

/// A complete hourly temperature series for one calendar year.
///
/// Invariant: exactly [`HOURS_PER_YEAR`] values; index `h` is hour `h` after
/// January 1, 00:00 of `year`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSeries {
    year: i32,
    drybulb_f: Vec<f64>,
}

impl WeatherSeries {
    /// Wrap an hourly vector. Returns `None` unless it has exactly 8760 values.
    pub fn from_hourly(year: i32, drybulb_f: Vec<f64>) -> Option<Self> {
        if drybulb_f.len() != HOURS_PER_YEAR {
            return None;
        }
        Some(Self { year, drybulb_f })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Temperature at hour-of-year `hour`, if in range.
    pub fn at(&self, hour: usize) -> Option<f64> {
        self.drybulb_f.get(hour).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.drybulb_f
    }

    /// `(hour_index, temperature)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.drybulb_f.iter().copied().enumerate()
    }
}

/// One survey row: an end-use's 24 hourly loads for a single calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct EndUseRecord {
    /// Raw end-use label as spelled in the survey.
    pub label: String,
    pub fuel: FuelType,
    pub month: u32,
    pub day: u32,
    pub loads: [f64; 24],
}

/// A building segment: one forecast climate zone × one building type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId {
    pub zone: String,
    pub building_type: String,
}

impl SegmentId {
    /// Parse `FCZ01_AOFF` style names.
    pub fn parse(name: &str) -> Option<Self> {
        let (zone, building_type) = name.trim().split_once('_')?;
        if zone.is_empty() || building_type.is_empty() {
            return None;
        }
        Some(Self {
            zone: zone.to_string(),
            building_type: building_type.to_string(),
        })
    }

    pub fn name(&self) -> String {
        format!("{}_{}", self.zone, self.building_type)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.zone, self.building_type)
    }
}

/// Fitted load model for one (segment, end-use).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadShapeResult {
    pub weekday: [f64; 24],
    pub weekend: [f64; 24],
    /// Coefficient on the `T - 55°F` heating-degree column (0 when not modeled).
    pub heating_sensitivity: f64,
    /// Coefficient on the `65°F - T` cooling-degree column (0 when not modeled).
    pub cooling_sensitivity: f64,
    pub residual_rms: f64,
    /// Number of hourly observations used in the fit.
    pub observations: usize,
}

/// Resolved run configuration.
///
/// Built once from CLI arguments (plus `.env`) and passed by reference to every
/// pipeline stage.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub root: PathBuf,
    /// 0 means "use all cores".
    pub threads: usize,
    /// Reprocess even when outputs already exist.
    pub force: bool,
}

impl RunConfig {
    pub fn zones_csv(&self) -> PathBuf {
        self.root.join("weather_zones.csv")
    }

    pub fn lcd_csv(&self) -> PathBuf {
        self.root.join("weather").join("lcd.csv")
    }

    pub fn weather_dir(&self) -> PathBuf {
        self.root.join("weather")
    }

    pub fn weather_csv(&self, zone: &str) -> PathBuf {
        self.weather_dir().join(format!("{zone}.csv"))
    }

    pub fn survey_dir(&self) -> PathBuf {
        self.root.join("survey")
    }

    pub fn segment_dir(&self, segment: &SegmentId) -> PathBuf {
        self.survey_dir().join(segment.name())
    }

    pub fn holidays_csv(&self) -> PathBuf {
        self.root.join("holidays.csv")
    }

    pub fn enduse_dir(&self) -> PathBuf {
        self.root.join("enduse")
    }

    pub fn enduse_csv(&self, segment: &SegmentId) -> PathBuf {
        self.enduse_dir().join(format!("{segment}.csv"))
    }

    pub fn loadshape_dir(&self) -> PathBuf {
        self.root.join("loadshape")
    }

    pub fn manifest_json(&self) -> PathBuf {
        self.loadshape_dir().join("run_manifest.json")
    }

    pub fn loadshape_csv(&self, segment: &SegmentId, end_use: EndUse) -> PathBuf {
        self.loadshape_dir()
            .join(&segment.zone)
            .join(&segment.building_type)
            .join(format!("{}.csv", end_use.name()))
    }

    pub fn dump_dir(&self) -> PathBuf {
        self.root.join("dump")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_id_parses_zone_and_type() {
        let seg = SegmentId::parse("FCZ07_LOFF").unwrap();
        assert_eq!(seg.zone, "FCZ07");
        assert_eq!(seg.building_type, "LOFF");
        assert_eq!(seg.to_string(), "FCZ07_LOFF");
        assert!(SegmentId::parse("FCZ07").is_none());
    }

    #[test]
    fn weather_series_rejects_wrong_length() {
        assert!(WeatherSeries::from_hourly(2002, vec![50.0; 10]).is_none());
        let series = WeatherSeries::from_hourly(2002, vec![50.0; HOURS_PER_YEAR]).unwrap();
        assert_eq!(series.iter().count(), HOURS_PER_YEAR);
        assert_eq!(series.at(8759), Some(50.0));
        assert_eq!(series.at(8760), None);
    }

    #[test]
    fn end_use_names_resolve_both_ways() {
        assert_eq!(EndUse::from_name("WaterHeat"), Some(EndUse::WaterHeat));
        assert_eq!(EndUse::from_name("water heating"), Some(EndUse::WaterHeat));
        assert_eq!(EndUse::from_name("Lasers"), None);
        assert_eq!(EndUse::ExtLight.column_label(), "Exterior_Lighting");
    }

    #[test]
    fn run_config_lays_out_outputs_per_segment() {
        let config = RunConfig {
            root: PathBuf::from("/data"),
            threads: 0,
            force: false,
        };
        let seg = SegmentId::parse("FCZ03_REST").unwrap();
        assert_eq!(
            config.loadshape_csv(&seg, EndUse::Refrig),
            PathBuf::from("/data/loadshape/FCZ03/REST/Refrig.csv")
        );
        assert_eq!(config.enduse_csv(&seg), PathBuf::from("/data/enduse/FCZ03_REST.csv"));
        assert_eq!(config.segment_dir(&seg), PathBuf::from("/data/survey/FCZ03_REST"));
    }

    #[test]
    fn fuel_type_accepts_survey_spellings() {
        assert!(FuelType::parse("Elec").is_electric());
        assert!(FuelType::parse(" electric ").is_electric());
        assert!(!FuelType::parse("Gas").is_electric());
    }
}
