//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves the run configuration
//! - installs the log subscriber
//! - dispatches to the batch pipeline, the synthetic generator or the summary
//! - prints the user-facing report and maps failures to exit codes

use std::path::PathBuf;

use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalArgs, SynthArgs};
use crate::data::SynthConfig;
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::io::{list_loadshapes, read_loadshape_csv};
use crate::report::{
    LoadShapeSummary, Stage, format_batch_summary, format_last_run, format_loadshape_summary, read_manifest,
};

pub mod pipeline;

/// Environment variable consulted when `--root` is not given.
pub const ROOT_ENV: &str = "CEUS_ROOT";

/// Entry point for the `ceus` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; CEUS_ROOT may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.global.log_level);
    let config = run_config_from_args(&cli.global);

    match cli.command {
        Command::Weather => handle_batch(&config, &[Stage::Weather]),
        Command::Profiles => handle_batch(&config, &[Stage::Profiles]),
        Command::Sensitivity => handle_batch(&config, &[Stage::Sensitivity]),
        Command::Run => handle_batch(&config, &[Stage::Weather, Stage::Profiles, Stage::Sensitivity]),
        Command::Synth(args) => handle_synth(&config, &args),
        Command::Summary => handle_summary(&config),
    }
}

fn init_logging(level: tracing::Level) {
    // Logs go to stderr so stdout carries only the report.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_config_from_args(args: &GlobalArgs) -> RunConfig {
    let root = args
        .root
        .clone()
        .or_else(|| std::env::var_os(ROOT_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    RunConfig {
        root,
        threads: args.threads,
        force: args.force,
    }
}

fn handle_batch(config: &RunConfig, stages: &[Stage]) -> Result<(), AppError> {
    let started = Utc::now();
    info!(root = %config.root.display(), ?stages, force = config.force, "starting batch");

    let manifest = pipeline::run_batch(config, stages)?;
    println!("{}", format_batch_summary(&manifest));

    if manifest.all_succeeded() {
        Ok(())
    } else {
        Err(AppError::new(
            4,
            format!(
                "{} of {} outcomes failed (started {}); see {}",
                manifest.failed,
                manifest.outcomes.len(),
                started.format("%Y-%m-%d %H:%M:%S UTC"),
                config.manifest_json().display()
            ),
        ))
    }
}

fn handle_synth(config: &RunConfig, args: &SynthArgs) -> Result<(), AppError> {
    let summary = crate::data::generate(&SynthConfig {
        root: config.root.clone(),
        seed: args.seed,
        zone: args.zone.clone(),
        building_type: args.building_type.clone(),
        year: args.year,
    })?;
    println!(
        "Wrote synthetic data root '{}': segment {}, station {}, {} weather samples, {} survey rows",
        config.root.display(),
        summary.segment,
        summary.station,
        summary.weather_samples,
        summary.survey_rows
    );
    Ok(())
}

fn handle_summary(config: &RunConfig) -> Result<(), AppError> {
    let manifest_path = config.manifest_json();
    if manifest_path.is_file() {
        print!("{}", format_last_run(&read_manifest(&manifest_path)?));
    }
    let stored = list_loadshapes(&config.loadshape_dir())?;
    let rows = stored
        .into_iter()
        .map(|s| {
            let shape = read_loadshape_csv(&s.path)?;
            Ok(LoadShapeSummary::new(s.segment, s.end_use, &shape))
        })
        .collect::<Result<Vec<_>, AppError>>()?;
    print!("{}", format_loadshape_summary(&rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_wins() {
        let cli = Cli::parse_from(["ceus", "--root", "/tmp/ceus", "--threads", "3", "run"]);
        let config = run_config_from_args(&cli.global);
        assert_eq!(config.root, PathBuf::from("/tmp/ceus"));
        assert_eq!(config.threads, 3);
        assert!(!config.force);
    }
}
