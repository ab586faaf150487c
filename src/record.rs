//! # Photo Records Module
//!
//! Strutture dati che descrivono un file durante e dopo la pipeline.
//!
//! ## Strutture dati:
//! - `PhotoRecord`: file scoperto, datato e con formato rilevato dal contenuto
//! - `FileOutcome`: esito finale per file (nome, decisione, stato)
//! - `OutcomeStatus`: `Copied` | `Encoded` | `Planned` (dry run) | `Failed`
//!
//! ## Ciclo di vita per file:
//! `Discovered → Dated → Named → {Copied | Encoded | Planned | Failed}`

use crate::date_resolver::CaptureTime;
use crate::format::PhotoFormat;
use crate::naming::NamePlan;
use crate::planner::ConversionDecision;
use serde::Serialize;
use std::path::PathBuf;

/// One discovered input file
#[derive(Debug, Clone, Serialize)]
pub struct PhotoRecord {
    pub source_path: PathBuf,
    pub capture: CaptureTime,
    pub detected_format: PhotoFormat,
    /// Position in path-sorted discovery order
    pub discovery_index: usize,
}

impl PhotoRecord {
    /// Sort key: resolved records by capture time, unresolved ones last,
    /// ties broken by discovery order
    pub fn order_key(&self) -> (bool, chrono::NaiveDateTime, usize) {
        (
            self.capture.is_fallback(),
            self.capture.timestamp,
            self.discovery_index,
        )
    }
}

/// Final state of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Copied { bytes: u64 },
    Encoded { bytes: u64 },
    /// Dry run: nothing was written
    Planned,
    Failed { error: String },
}

impl OutcomeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-file result of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub capture: Option<CaptureTime>,
    pub format: Option<PhotoFormat>,
    pub name: Option<NamePlan>,
    /// Absolute destination path
    pub destination: Option<PathBuf>,
    pub decision: Option<ConversionDecision>,
    pub status: OutcomeStatus,
}

impl FileOutcome {
    /// Failure before the file could be dated or named
    pub fn failed_early(source: PathBuf, error: String) -> Self {
        Self {
            source,
            capture: None,
            format: None,
            name: None,
            destination: None,
            decision: None,
            status: OutcomeStatus::Failed { error },
        }
    }

    /// One line plan listing: `SRC -> DEST [YYYY-MM-DD HH:MM:SS] ACTION`
    pub fn plan_line(&self) -> String {
        let destination = self
            .destination
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        let when = self
            .capture
            .map(|c| c.timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let action = match (&self.status, &self.decision) {
            (OutcomeStatus::Failed { error }, _) => format!("FAILED: {}", error),
            (_, Some(decision)) => decision.label(),
            (_, None) => "-".to_string(),
        };
        format!("{} -> {} [{}] {}", self.source.display(), destination, when, action)
    }
}
