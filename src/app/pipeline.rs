//! Batch pipeline shared by the `weather`, `profiles`, `sensitivity` and `run`
//! subcommands.
//!
//! weather (per zone) -> profiles (per segment) -> sensitivity (per segment × end-use)
//!
//! Every zone's weather is fully normalized (or loaded from cache) before any
//! fit starts, then shared read-only. Segments are fitted in parallel on a pool
//! sized by `--threads`; each unit of work reports an [`Outcome`] and nothing
//! short of a configuration error stops the batch.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::diagnostics::{DumpDir, FailureSink};
use crate::domain::{EndUseCatalog, EndUseRecord, RunConfig, SegmentId, WeatherSeries};
use crate::error::{AppError, EngineError};
use crate::fit::fit_segment;
use crate::io::{
    ENDUSE8760_FILE, LcdData, MONTHLY_FILE, SEGINFO_FILE, SUMMARY_FILE, convert_monthly_profile, list_segments,
    read_enduse_records, read_holidays, read_lcd, read_segment_info, read_weather_csv, read_weather_zones,
    write_loadshape_csv, write_weather_csv,
};
use crate::report::{Outcome, RunManifest, Stage, write_manifest};
use crate::weather::normalize_weather;

/// Normalized weather by zone, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct WeatherSet {
    series: HashMap<String, Arc<WeatherSeries>>,
}

impl WeatherSet {
    pub fn get(&self, zone: &str) -> Option<Arc<WeatherSeries>> {
        self.series.get(zone).cloned()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Run the requested stages in order and write the run manifest.
pub fn run_batch(config: &RunConfig, stages: &[Stage]) -> Result<RunManifest, AppError> {
    let started_at = Utc::now();
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build worker pool: {e}")))?;

    let mut outcomes = Vec::new();

    let needs_segments = stages.iter().any(|s| matches!(s, Stage::Profiles | Stage::Sensitivity));
    let segments = if needs_segments {
        list_segments(&config.survey_dir())?
    } else {
        Vec::new()
    };

    let mut weather = None;
    if stages.contains(&Stage::Weather) {
        let (set, weather_outcomes) = pool.install(|| prepare_weather(config, config.force))?;
        outcomes.extend(weather_outcomes);
        weather = Some(set);
    }

    if stages.contains(&Stage::Profiles) {
        outcomes.extend(pool.install(|| run_profiles(config, &segments)));
    }

    if stages.contains(&Stage::Sensitivity) {
        // Running sensitivity alone still needs every zone's series; reuse the
        // cache and only normalize what is missing.
        let weather = match weather {
            Some(set) => set,
            None => {
                let (set, weather_outcomes) = pool.install(|| prepare_weather(config, false))?;
                outcomes.extend(weather_outcomes);
                set
            }
        };
        if weather.is_empty() && !segments.is_empty() {
            warn!(segments = segments.len(), "no zone has usable weather; every segment will be skipped");
        }
        let catalog = EndUseCatalog::standard().with_holidays(read_holidays(&config.holidays_csv())?);
        let sink = DumpDir::new(config.dump_dir());
        outcomes.extend(pool.install(|| run_sensitivity(config, &catalog, &weather, &segments, &sink)));
    }

    let manifest = RunManifest::new(&config.root, started_at, outcomes);
    write_manifest(&config.manifest_json(), &manifest)?;
    info!(
        ok = manifest.ok,
        failed = manifest.failed,
        skipped = manifest.skipped,
        manifest = %config.manifest_json().display(),
        "batch finished"
    );
    Ok(manifest)
}

/// Load or normalize the series of every zone in the zone table.
///
/// Cached `weather/<ZONE>.csv` files are reused unless `force`. A zone without
/// usable samples is skipped; other zones continue.
pub fn prepare_weather(config: &RunConfig, force: bool) -> Result<(WeatherSet, Vec<Outcome>), AppError> {
    let zones = read_weather_zones(&config.zones_csv())?;

    let needs_lcd = force || zones.iter().any(|z| !config.weather_csv(&z.area).is_file());
    let lcd = if needs_lcd {
        read_lcd(&config.lcd_csv())?
    } else {
        LcdData::default()
    };

    let results: Vec<(String, Option<WeatherSeries>, Outcome)> = zones
        .par_iter()
        .map(|zone| {
            let path = config.weather_csv(&zone.area);
            let loaded = if path.is_file() && !force {
                debug!(zone = %zone.area, path = %path.display(), "using cached weather");
                read_weather_csv(&path).map_err(|e| Outcome::failed(Stage::Weather, &zone.area, None, e.to_string()))
            } else {
                normalize_zone(&zone.area, &zone.station, &lcd, &path)
            };
            match loaded {
                Ok(series) => (zone.area.clone(), Some(series), Outcome::ok(Stage::Weather, &zone.area, None)),
                Err(outcome) => (zone.area.clone(), None, outcome),
            }
        })
        .collect();

    let mut set = WeatherSet::default();
    let mut outcomes = Vec::with_capacity(results.len());
    for (zone, series, outcome) in results {
        if let Some(series) = series {
            set.series.insert(zone, Arc::new(series));
        }
        outcomes.push(outcome);
    }
    info!(zones = zones.len(), ready = set.len(), "weather ready");
    Ok((set, outcomes))
}

fn normalize_zone(zone: &str, station: &str, lcd: &LcdData, path: &Path) -> Result<WeatherSeries, Outcome> {
    match normalize_weather(zone, lcd.samples(station)) {
        Ok(series) => {
            write_weather_csv(path, &series).map_err(|e| Outcome::failed(Stage::Weather, zone, None, e.to_string()))?;
            info!(zone, station, year = series.year(), "weather normalized");
            Ok(series)
        }
        Err(err @ EngineError::NoData { .. }) => {
            warn!(zone, station, "{err}");
            Err(Outcome::skipped(Stage::Weather, zone, None, err.to_string()))
        }
        Err(err) => Err(Outcome::failed(Stage::Weather, zone, None, err.to_string())),
    }
}

/// Write `enduse/<SEG>.csv` for every segment with monthly inputs.
pub fn run_profiles(config: &RunConfig, segments: &[SegmentId]) -> Vec<Outcome> {
    segments
        .par_iter()
        .map(|segment| {
            let out = config.enduse_csv(segment);
            if out.is_file() && !config.force {
                return Outcome::skipped(Stage::Profiles, segment.name(), None, "up to date");
            }
            let dir = config.segment_dir(segment);
            let (monthly, summary) = (dir.join(MONTHLY_FILE), dir.join(SUMMARY_FILE));
            if !monthly.is_file() || !summary.is_file() {
                return Outcome::skipped(Stage::Profiles, segment.name(), None, "no monthly inputs");
            }
            match convert_monthly_profile(&monthly, &summary, &out) {
                Ok(rows) => {
                    info!(segment = %segment, rows, "profile written");
                    Outcome::ok(Stage::Profiles, segment.name(), None)
                }
                Err(e) => Outcome::failed(Stage::Profiles, segment.name(), None, e.to_string()),
            }
        })
        .collect()
}

/// Fit every stale segment.
pub fn run_sensitivity(
    config: &RunConfig,
    catalog: &EndUseCatalog,
    weather: &WeatherSet,
    segments: &[SegmentId],
    sink: &dyn FailureSink,
) -> Vec<Outcome> {
    segments
        .par_iter()
        .flat_map_iter(|segment| fit_one_segment(config, catalog, weather, segment, sink))
        .collect()
}

fn fit_one_segment(
    config: &RunConfig,
    catalog: &EndUseCatalog,
    weather: &WeatherSet,
    segment: &SegmentId,
    sink: &dyn FailureSink,
) -> Vec<Outcome> {
    let name = segment.name();
    let failed = |e: AppError| vec![Outcome::failed(Stage::Sensitivity, &name, None, e.to_string())];

    let Some(series) = weather.get(&segment.zone) else {
        warn!(segment = %segment, "no weather for zone, skipping segment");
        return vec![Outcome::skipped(
            Stage::Sensitivity,
            &name,
            None,
            format!("no weather for zone {}", segment.zone),
        )];
    };

    let dir = config.segment_dir(segment);
    let info = match read_segment_info(&dir.join(SEGINFO_FILE)) {
        Ok(info) => info,
        Err(e) => return failed(e),
    };
    if info.id != *segment {
        warn!(segment = %segment, seg_id = %info.id, "SegID differs from directory name");
    }
    debug!(
        segment = %segment,
        year = info.analysis_year,
        description = info.description.as_deref().unwrap_or(""),
        "segment info"
    );
    let records = match read_enduse_records(&dir.join(ENDUSE8760_FILE)) {
        Ok(records) => records,
        Err(e) => return failed(e),
    };

    if !config.force && is_fresh(config, catalog, segment, &records) {
        debug!(segment = %segment, "load shapes up to date");
        return vec![Outcome::skipped(Stage::Sensitivity, &name, None, "up to date")];
    }

    let fit = match fit_segment(segment, info.analysis_year, &records, &series, catalog, sink) {
        Ok(fit) => fit,
        Err(err) => {
            warn!(segment = %segment, "segment abandoned: {err}");
            return vec![Outcome::failed(Stage::Sensitivity, &name, None, err.to_string())];
        }
    };

    let mut outcomes = Vec::new();
    for (end_use, result) in &fit.results {
        let outcome = match result {
            Ok(shape) => match write_loadshape_csv(&config.loadshape_csv(segment, *end_use), shape) {
                Ok(()) => Outcome::ok(Stage::Sensitivity, &name, Some(*end_use)),
                Err(e) => Outcome::failed(Stage::Sensitivity, &name, Some(*end_use), e.to_string()),
            },
            Err(err) => Outcome::failed(Stage::Sensitivity, &name, Some(*end_use), err.to_string()),
        };
        outcomes.push(outcome);
    }
    for end_use in &fit.skipped {
        outcomes.push(Outcome::skipped(
            Stage::Sensitivity,
            &name,
            Some(*end_use),
            "no positive electric load",
        ));
    }
    info!(
        segment = %segment,
        ok = fit.successes().count(),
        failed = fit.failures().count(),
        "segment fitted"
    );
    outcomes
}

/// Every end-use with positive electric load already has a load-shape file.
fn is_fresh(
    config: &RunConfig,
    catalog: &EndUseCatalog,
    segment: &SegmentId,
    records: &[EndUseRecord],
) -> bool {
    let mut expected = BTreeSet::new();
    for record in records {
        if !record.fuel.is_electric() || !record.loads.iter().any(|&l| l > 0.0) {
            continue;
        }
        match catalog.resolve(&record.label) {
            Some(end_use) => {
                expected.insert(end_use);
            }
            // Let the fit report the unknown label.
            None => return false,
        }
    }
    !expected.is_empty() && expected.iter().all(|e| config.loadshape_csv(segment, *e).is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{HEATING_SLOPE, SynthConfig, generate};
    use crate::domain::EndUse;
    use crate::io::read_loadshape_csv;
    use crate::report::Status;

    fn synth_root(root: &Path) {
        generate(&SynthConfig {
            root: root.to_path_buf(),
            seed: 11,
            zone: "FCZ05".to_string(),
            building_type: "LOFF".to_string(),
            year: 2002,
        })
        .unwrap();
    }

    fn config(root: &Path, force: bool) -> RunConfig {
        RunConfig {
            root: root.to_path_buf(),
            threads: 2,
            force,
        }
    }

    #[test]
    fn full_run_writes_every_output() {
        let tmp = tempfile::tempdir().unwrap();
        synth_root(tmp.path());
        let cfg = config(tmp.path(), false);

        let manifest = run_batch(&cfg, &[Stage::Weather, Stage::Profiles, Stage::Sensitivity]).unwrap();
        assert!(manifest.all_succeeded(), "{:?}", manifest.outcomes);
        assert!(cfg.weather_csv("FCZ05").is_file());
        assert!(cfg.manifest_json().is_file());

        let seg = SegmentId::parse("FCZ05_LOFF").unwrap();
        assert!(cfg.enduse_csv(&seg).is_file());
        for end_use in [EndUse::Heating, EndUse::Cooling, EndUse::Vent, EndUse::IntLight, EndUse::OfficeEquip] {
            assert!(cfg.loadshape_csv(&seg, end_use).is_file(), "{end_use}");
        }
        // Gas water heating is never fitted.
        assert!(!cfg.loadshape_csv(&seg, EndUse::WaterHeat).exists());

        // Heating load rises as it gets colder: negative coefficient on T - 55.
        let heating = read_loadshape_csv(&cfg.loadshape_csv(&seg, EndUse::Heating)).unwrap();
        assert!(heating.heating_sensitivity < 0.0);
        assert!(
            (heating.heating_sensitivity + HEATING_SLOPE).abs() < 0.25,
            "{}",
            heating.heating_sensitivity
        );
        assert_eq!(heating.cooling_sensitivity, 0.0);
        // Occupied hours draw more than the night.
        assert!(heating.weekday[12] > heating.weekday[2]);
    }

    #[test]
    fn second_run_skips_fresh_segments() {
        let tmp = tempfile::tempdir().unwrap();
        synth_root(tmp.path());
        let cfg = config(tmp.path(), false);
        run_batch(&cfg, &[Stage::Weather, Stage::Sensitivity]).unwrap();

        let seg = SegmentId::parse("FCZ05_LOFF").unwrap();
        let path = cfg.loadshape_csv(&seg, EndUse::Refrig);
        let before = std::fs::read(&path).unwrap();

        let manifest = run_batch(&cfg, &[Stage::Sensitivity]).unwrap();
        let fits: Vec<&Outcome> = manifest
            .outcomes
            .iter()
            .filter(|o| o.stage == Stage::Sensitivity)
            .collect();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].status, Status::Skipped);
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let forced = run_batch(&config(tmp.path(), true), &[Stage::Sensitivity]).unwrap();
        assert!(forced.outcomes.iter().any(|o| o.status == Status::Ok && o.end_use == Some(EndUse::Refrig)));
    }

    #[test]
    fn zone_without_samples_skips_its_segments() {
        let tmp = tempfile::tempdir().unwrap();
        synth_root(tmp.path());
        // Point the zone at a station with no rows in the LCD export.
        std::fs::write(tmp.path().join("weather_zones.csv"), "AREA,STATION\nFCZ05,NOWHERE\n").unwrap();
        let cfg = config(tmp.path(), false);

        let manifest = run_batch(&cfg, &[Stage::Weather, Stage::Sensitivity]).unwrap();
        assert!(manifest.all_succeeded());
        let statuses: Vec<(Stage, Status)> = manifest.outcomes.iter().map(|o| (o.stage, o.status)).collect();
        assert_eq!(
            statuses,
            vec![(Stage::Weather, Status::Skipped), (Stage::Sensitivity, Status::Skipped)]
        );
        assert!(!cfg.loadshape_dir().join("FCZ05").exists());
    }

    #[test]
    fn empty_zone_leaves_other_zones_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        // Two segments under one root; the second generate call owns the LCD export.
        for (zone, seed) in [("FCZ06", 12), ("FCZ05", 11)] {
            generate(&SynthConfig {
                root: tmp.path().to_path_buf(),
                seed,
                zone: zone.to_string(),
                building_type: "LOFF".to_string(),
                year: 2002,
            })
            .unwrap();
        }
        std::fs::write(
            tmp.path().join("weather_zones.csv"),
            "AREA,STATION\nFCZ05,SYNTH:FCZ05\nFCZ06,NOWHERE\n",
        )
        .unwrap();
        let cfg = config(tmp.path(), false);

        let manifest = run_batch(&cfg, &[Stage::Weather, Stage::Sensitivity]).unwrap();
        assert!(manifest.all_succeeded(), "{:?}", manifest.outcomes);

        let status_of = |stage: Stage, subject: &str| -> Vec<Status> {
            manifest
                .outcomes
                .iter()
                .filter(|o| o.stage == stage && o.subject == subject)
                .map(|o| o.status)
                .collect()
        };
        assert_eq!(status_of(Stage::Weather, "FCZ06"), vec![Status::Skipped]);
        assert_eq!(status_of(Stage::Weather, "FCZ05"), vec![Status::Ok]);
        assert_eq!(status_of(Stage::Sensitivity, "FCZ06_LOFF"), vec![Status::Skipped]);
        let fcz05 = status_of(Stage::Sensitivity, "FCZ05_LOFF");
        assert!(!fcz05.is_empty());
        assert!(fcz05.iter().all(|s| *s == Status::Ok));

        assert!(cfg.weather_csv("FCZ05").is_file());
        assert!(!cfg.weather_csv("FCZ06").exists());
        let fcz05_seg = SegmentId::parse("FCZ05_LOFF").unwrap();
        for end_use in [EndUse::Heating, EndUse::Cooling, EndUse::Refrig] {
            assert!(cfg.loadshape_csv(&fcz05_seg, end_use).is_file(), "{end_use}");
        }
        assert!(!cfg.loadshape_dir().join("FCZ06").exists());
    }

    #[test]
    fn unknown_label_fails_segment_without_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        synth_root(tmp.path());
        let cfg = config(tmp.path(), false);
        let seg = SegmentId::parse("FCZ05_LOFF").unwrap();
        let survey = cfg.segment_dir(&seg).join(ENDUSE8760_FILE);
        let text = std::fs::read_to_string(&survey).unwrap().replacen(",Refrig,", ",Lasers,", 1);
        std::fs::write(&survey, text).unwrap();

        let manifest = run_batch(&cfg, &[Stage::Weather, Stage::Sensitivity]).unwrap();
        assert!(!manifest.all_succeeded());
        let failure = manifest.outcomes.iter().find(|o| o.status == Status::Failed).unwrap();
        assert_eq!(failure.end_use, None);
        assert!(failure.message.as_deref().unwrap().contains("Lasers"));
        assert!(!cfg.loadshape_dir().join("FCZ05").exists());
    }
}
