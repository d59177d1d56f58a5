//! Irregular weather observations → uniform 8760-hour series.
//!
//! Steps:
//! 1. The survey year is taken from the first sample's timestamp.
//! 2. Each sample becomes a fractional hour offset from January 1, 00:00.
//! 3. Samples are ordered by offset; duplicate offsets keep the last sample.
//! 4. Each integer hour 0..8759 is linearly interpolated between the bracketing
//!    samples. Hours outside the sampled span follow the line through the two
//!    nearest boundary samples.
//! 5. Values are rounded to 0.1°F (ties to even) for reproducibility.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::domain::{HOURS_PER_YEAR, WeatherSample, WeatherSeries};
use crate::error::EngineError;

/// Normalize one zone's raw samples into a complete hourly series.
pub fn normalize_weather(zone: &str, samples: &[WeatherSample]) -> Result<WeatherSeries, EngineError> {
    let no_data = || EngineError::NoData {
        zone: zone.to_string(),
    };

    let first = samples.first().ok_or_else(no_data)?;
    let year = first.timestamp.year();
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(no_data)?;

    let mut points: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.drybulb_f.is_finite())
        .map(|s| {
            let offset = (s.timestamp - start).num_seconds() as f64 / 3600.0;
            (offset, s.drybulb_f)
        })
        .collect();
    if points.is_empty() {
        return Err(no_data());
    }

    // Stable sort keeps input order among equal timestamps, so "last wins"
    // below means last as supplied.
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let points = dedup_keep_last(points);

    debug!(zone, year, samples = points.len(), "normalizing weather");

    let hourly: Vec<f64> = (0..HOURS_PER_YEAR)
        .map(|h| round_tenth(interpolate(&points, h as f64)))
        .collect();

    WeatherSeries::from_hourly(year, hourly).ok_or_else(no_data)
}

fn dedup_keep_last(points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        match out.last_mut() {
            Some(last) if last.0 == p.0 => *last = p,
            _ => out.push(p),
        }
    }
    out
}

/// Linear interpolation over `points` (sorted, unique x).
fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    if points.len() == 1 {
        return points[0].1;
    }

    // Index of the first point strictly to the right of `x`, clamped so that
    // (i-1, i) is always a valid segment. Outside the span this selects the
    // boundary segment, which extends its line.
    let i = points.partition_point(|p| p.0 <= x).clamp(1, points.len() - 1);
    let (x0, y0) = points[i - 1];
    let (x1, y1) = points[i];
    if x == x0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn sample(s: &str, t: f64) -> WeatherSample {
        WeatherSample {
            timestamp: ts(s),
            drybulb_f: t,
        }
    }

    #[test]
    fn two_samples_interpolate_midpoint() {
        let samples = [sample("2007-01-01 00:00", 40.0), sample("2007-01-01 02:00", 44.0)];
        let series = normalize_weather("FCZ01", &samples).unwrap();
        assert_eq!(series.year(), 2007);
        assert_eq!(series.at(0), Some(40.0));
        assert_eq!(series.at(1), Some(42.0));
        assert_eq!(series.at(2), Some(44.0));
    }

    #[test]
    fn output_is_complete_and_contiguous() {
        let samples = [
            sample("2002-01-01 00:20", 31.0),
            sample("2002-03-05 13:51", 52.0),
            sample("2002-07-19 16:05", 91.0),
            sample("2002-12-31 22:40", 35.0),
        ];
        let series = normalize_weather("FCZ03", &samples).unwrap();
        let idx: Vec<usize> = series.iter().map(|(h, _)| h).collect();
        assert_eq!(idx.len(), HOURS_PER_YEAR);
        assert!(idx.iter().enumerate().all(|(i, &h)| i == h));
        assert!(series.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn hourly_samples_round_trip_exactly() {
        let start = ts("2003-01-01 00:00");
        let samples: Vec<WeatherSample> = (0..HOURS_PER_YEAR)
            .map(|h| WeatherSample {
                timestamp: start + chrono::Duration::hours(h as i64),
                drybulb_f: 50.0 + ((h % 240) as f64) * 0.1 - 12.0,
            })
            .collect();
        let series = normalize_weather("FCZ05", &samples).unwrap();
        for (h, v) in series.iter() {
            let expected = round_tenth(samples[h].drybulb_f);
            assert!((v - expected).abs() < 1e-9, "hour {h}: {v} vs {expected}");
        }
    }

    #[test]
    fn edges_extend_the_boundary_lines() {
        let samples = [sample("2007-01-01 01:00", 40.0), sample("2007-01-01 03:00", 44.0)];
        let series = normalize_weather("FCZ01", &samples).unwrap();
        // Hour 0 lies on the line through the first two samples.
        assert_eq!(series.at(0), Some(38.0));
        assert_eq!(series.at(4), Some(46.0));
    }

    #[test]
    fn duplicate_timestamps_keep_last_sample() {
        let samples = [
            sample("2007-01-01 00:00", 40.0),
            sample("2007-01-01 02:00", 10.0),
            sample("2007-01-01 02:00", 44.0),
        ];
        let series = normalize_weather("FCZ01", &samples).unwrap();
        assert_eq!(series.at(2), Some(44.0));
        assert_eq!(series.at(1), Some(42.0));
    }

    #[test]
    fn unsorted_samples_are_ordered_first() {
        let samples = [sample("2007-01-01 02:00", 44.0), sample("2007-01-01 00:00", 40.0)];
        let series = normalize_weather("FCZ01", &samples).unwrap();
        assert_eq!(series.at(1), Some(42.0));
    }

    #[test]
    fn empty_sample_set_is_no_data() {
        let err = normalize_weather("FCZ09", &[]).unwrap_err();
        assert!(matches!(err, EngineError::NoData { ref zone } if zone == "FCZ09"));
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let samples = [sample("2007-01-01 00:00", f64::NAN)];
        assert!(matches!(
            normalize_weather("FCZ09", &samples),
            Err(EngineError::NoData { .. })
        ));
    }
}
