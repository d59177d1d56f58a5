//! Formatted terminal output.
//!
//! We keep formatting code in one place so the pipeline stays free of layout
//! details and output changes are localized.

use crate::domain::{EndUse, LoadShapeResult, SegmentId};
use crate::report::manifest::{RunManifest, Stage, Status};

/// One line of the `summary` report.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadShapeSummary {
    pub segment: SegmentId,
    pub end_use: EndUse,
    pub peak_weekday_hour: usize,
    pub peak_weekday_load: f64,
    pub heating_sensitivity: f64,
    pub cooling_sensitivity: f64,
    pub residual_rms: f64,
}

impl LoadShapeSummary {
    pub fn new(segment: SegmentId, end_use: EndUse, shape: &LoadShapeResult) -> Self {
        let (peak_weekday_hour, peak_weekday_load) = shape
            .weekday
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (h, v)| if v > best.1 { (h, v) } else { best });
        Self {
            segment,
            end_use,
            peak_weekday_hour,
            peak_weekday_load,
            heating_sensitivity: shape.heating_sensitivity,
            cooling_sensitivity: shape.cooling_sensitivity,
            residual_rms: shape.residual_rms,
        }
    }
}

pub fn format_loadshape_summary(rows: &[LoadShapeSummary]) -> String {
    if rows.is_empty() {
        return "No load shapes found.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{:<14} {:<12} {:>5} {:>12} {:>10} {:>10} {:>10}\n",
        "Segment", "EndUse", "Peak", "PeakLoad", "HeatSens", "CoolSens", "RMS"
    ));
    out.push_str(&format!("{}\n", "-".repeat(79)));
    for r in rows {
        out.push_str(&format!(
            "{:<14} {:<12} {:>5} {:>12.4} {:>10.4} {:>10.4} {:>10.4}\n",
            r.segment.name(),
            r.end_use.name(),
            format!("{:02}:00", r.peak_weekday_hour),
            r.peak_weekday_load,
            r.heating_sensitivity,
            r.cooling_sensitivity,
            r.residual_rms,
        ));
    }
    out
}

/// Counts per stage followed by every failure and skip.
pub fn format_batch_summary(manifest: &RunManifest) -> String {
    let mut out = String::new();
    out.push_str("=== ceus - batch summary ===\n");
    out.push_str(&format!("Root: {}\n", manifest.root.display()));
    out.push_str(&format!(
        "Elapsed: {:.1}s\n",
        (manifest.finished_at - manifest.started_at).num_milliseconds() as f64 / 1000.0
    ));

    for stage in [Stage::Weather, Stage::Profiles, Stage::Sensitivity] {
        let of_stage = || manifest.outcomes.iter().filter(move |o| o.stage == stage);
        if of_stage().next().is_none() {
            continue;
        }
        let count = |status: Status| of_stage().filter(|o| o.status == status).count();
        out.push_str(&format!(
            "{:<12} ok={:<5} failed={:<5} skipped={}\n",
            stage_label(stage),
            count(Status::Ok),
            count(Status::Failed),
            count(Status::Skipped),
        ));
    }

    let notable: Vec<_> = manifest
        .outcomes
        .iter()
        .filter(|o| o.status != Status::Ok)
        .collect();
    if !notable.is_empty() {
        out.push('\n');
        for o in notable {
            let subject = match o.end_use {
                Some(end_use) => format!("{}.{}", o.subject, end_use),
                None => o.subject.clone(),
            };
            let status = match o.status {
                Status::Failed => "FAILED",
                _ => "skipped",
            };
            out.push_str(&format!(
                "{status:<8} {:<12} {subject}: {}\n",
                stage_label(o.stage),
                o.message.as_deref().unwrap_or("")
            ));
        }
    }
    out
}

/// One line describing the most recent batch, printed above the `summary` table.
pub fn format_last_run(manifest: &RunManifest) -> String {
    format!(
        "Last run: {} (ok={} failed={} skipped={})\n",
        manifest.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
        manifest.ok,
        manifest.failed,
        manifest.skipped
    )
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Weather => "weather",
        Stage::Profiles => "profiles",
        Stage::Sensitivity => "sensitivity",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::manifest::Outcome;
    use chrono::Utc;
    use std::path::Path;

    #[test]
    fn summary_reports_peak_weekday_hour() {
        let mut weekday = [1.0; 24];
        weekday[14] = 9.5;
        let shape = LoadShapeResult {
            weekday,
            weekend: [0.5; 24],
            heating_sensitivity: 0.0,
            cooling_sensitivity: -1.25,
            residual_rms: 0.3,
            observations: 0,
        };
        let row = LoadShapeSummary::new(SegmentId::parse("FCZ01_AOFF").unwrap(), EndUse::Cooling, &shape);
        assert_eq!(row.peak_weekday_hour, 14);
        assert_eq!(row.peak_weekday_load, 9.5);

        let text = format_loadshape_summary(&[row]);
        assert!(text.contains("FCZ01_AOFF"));
        assert!(text.contains("14:00"));
        assert!(text.contains("-1.2500"));
    }

    #[test]
    fn last_run_line_carries_counts() {
        let m = RunManifest::new(
            Path::new("/data"),
            Utc::now(),
            vec![
                Outcome::ok(Stage::Weather, "FCZ01", None),
                Outcome::skipped(Stage::Sensitivity, "FCZ01_AOFF", None, "up to date"),
            ],
        );
        let line = format_last_run(&m);
        assert!(line.starts_with("Last run: "));
        assert!(line.ends_with("(ok=1 failed=0 skipped=1)\n"), "{line}");
    }

    #[test]
    fn batch_summary_lists_failures() {
        let m = RunManifest::new(
            Path::new("/data"),
            Utc::now(),
            vec![
                Outcome::ok(Stage::Sensitivity, "FCZ01_AOFF", Some(EndUse::Vent)),
                Outcome::failed(Stage::Sensitivity, "FCZ01_AOFF", Some(EndUse::Heating), "singular"),
            ],
        );
        let text = format_batch_summary(&m);
        assert!(text.contains("sensitivity  ok=1     failed=1     skipped=0"));
        assert!(text.contains("FAILED   sensitivity  FCZ01_AOFF.Heating: singular"));
        assert!(!text.contains("weather "));
    }
}
