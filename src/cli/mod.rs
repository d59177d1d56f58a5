//! Command-line parsing for the CEUS load-shape pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline and fitting code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "ceus",
    version,
    about = "Commercial end-use load shapes and weather sensitivity"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// Data root. Defaults to `CEUS_ROOT` (environment or `.env`), then the
    /// current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Worker threads for segment fits (0 = all cores).
    #[arg(long, global = true, default_value_t = 0)]
    pub threads: usize,

    /// Reprocess even when outputs already exist.
    #[arg(long, global = true)]
    pub force: bool,

    /// Log level (error, warn, info, debug, trace). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: tracing::Level,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize station weather into 8760-hour series per zone.
    Weather,
    /// Convert monthly day-type tables into per-floor-area profiles.
    Profiles,
    /// Fit hourly load shapes and temperature sensitivities.
    Sensitivity,
    /// Run weather, profiles and sensitivity in order.
    Run,
    /// Write a synthetic data root (weather + one segment).
    Synth(SynthArgs),
    /// Print peak load, sensitivities and residual for every fitted load shape.
    Summary,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Random seed; the same seed writes identical files.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Forecast climate zone name.
    #[arg(long, default_value = "FCZ01")]
    pub zone: String,

    /// Building type code.
    #[arg(long = "btype", default_value = "AOFF")]
    pub building_type: String,

    /// Survey year.
    #[arg(long, default_value_t = 2002)]
    pub year: i32,
}
