//! Batch outcome records and the JSON run manifest.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EndUse;
use crate::error::AppError;
use crate::io::table::ensure_parent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Weather,
    Profiles,
    Sensitivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
    Skipped,
}

/// What happened to one zone, segment or (segment, end-use) in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub stage: Stage,
    /// Zone name for the weather stage, segment name otherwise.
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_use: Option<EndUse>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Outcome {
    pub fn ok(stage: Stage, subject: impl Into<String>, end_use: Option<EndUse>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            end_use,
            status: Status::Ok,
            message: None,
        }
    }

    pub fn failed(stage: Stage, subject: impl Into<String>, end_use: Option<EndUse>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            end_use,
            status: Status::Failed,
            message: Some(message.into()),
        }
    }

    pub fn skipped(stage: Stage, subject: impl Into<String>, end_use: Option<EndUse>, message: impl Into<String>) -> Self {
        Self {
            stage,
            subject: subject.into(),
            end_use,
            status: Status::Skipped,
            message: Some(message.into()),
        }
    }
}

/// Everything one batch run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub tool: String,
    pub version: String,
    pub root: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<Outcome>,
}

impl RunManifest {
    pub fn new(root: &Path, started_at: DateTime<Utc>, mut outcomes: Vec<Outcome>) -> Self {
        outcomes.sort_by(|a, b| (a.stage, &a.subject, a.end_use).cmp(&(b.stage, &b.subject, b.end_use)));
        let count = |status: Status| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            tool: "ceus".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            root: root.to_path_buf(),
            started_at,
            finished_at: Utc::now(),
            ok: count(Status::Ok),
            failed: count(Status::Failed),
            skipped: count(Status::Skipped),
            outcomes,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<(), AppError> {
    ensure_parent(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create manifest '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, manifest)
        .map_err(|e| AppError::new(2, format!("Failed to write manifest '{}': {e}", path.display())))
}

pub fn read_manifest(path: &Path) -> Result<RunManifest, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open manifest '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Failed to parse manifest '{}': {e}", path.display())))
}
