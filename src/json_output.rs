//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico (`--json`).
//!
//! ## Responsabilità:
//! - Emette messaggi JSON strutturati per eventi di progresso, una riga per messaggio
//! - Riutilizza `FileOutcome` e `BatchStats` invece di duplicare i campi
//! - Fornisce interfaccia standardizzata per comunicazione inter-processo
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch con la configurazione effettiva
//! - `file_complete`: Esito di un singolo file
//! - `progress`: Progresso corrente (file processati, contatori)
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore fatale

use crate::config::Config;
use crate::format::OutputFormat;
use crate::normalizer::path_resolver::Subfolders;
use crate::progress::BatchStats;
use crate::record::FileOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: PathBuf,
        config: JsonConfig,
    },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        source: PathBuf,
        destination: Option<PathBuf>,
        capture_time: Option<String>,
        timestamp_source: Option<String>,
        action: Option<String>,
        error: Option<String>,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        current: usize,
        total: usize,
        percentage: f64,
        copied: usize,
        encoded: usize,
        errors: usize,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        copied: usize,
        encoded: usize,
        planned: usize,
        errors: usize,
        bytes_written: u64,
        duration_seconds: f64,
    },

    /// Errore fatale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub output_format: OutputFormat,
    pub quality: u8,
    pub keep_metadata: bool,
    pub subfolders: Subfolders,
    pub copy_unchanged: bool,
    pub recursive: bool,
    pub dry_run: bool,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(input_dir: PathBuf, output_dir: PathBuf, config: JsonConfig) -> Self {
        Self::Start {
            input_dir,
            output_dir,
            config,
        }
    }

    /// Crea un messaggio di completamento file a partire dall'esito
    pub fn file_complete(outcome: &FileOutcome) -> Self {
        let error = match &outcome.status {
            crate::record::OutcomeStatus::Failed { error } => Some(error.clone()),
            _ => None,
        };

        Self::FileComplete {
            source: outcome.source.clone(),
            destination: outcome.destination.clone(),
            capture_time: outcome
                .capture
                .map(|c| c.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            timestamp_source: outcome.capture.map(|c| c.source.to_string()),
            action: outcome.decision.as_ref().map(|d| d.label()),
            error,
        }
    }

    pub fn progress(current: usize, total: usize, stats: &BatchStats) -> Self {
        let percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self::Progress {
            current,
            total,
            percentage,
            copied: stats.files_copied,
            encoded: stats.files_encoded,
            errors: stats.errors,
        }
    }

    pub fn complete(stats: &BatchStats, duration_seconds: f64) -> Self {
        Self::Complete {
            files_processed: stats.files_processed,
            copied: stats.files_copied,
            encoded: stats.files_encoded,
            planned: stats.files_planned,
            errors: stats.errors,
            bytes_written: stats.bytes_written,
            duration_seconds,
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            output_format: config.output_format,
            quality: config.quality,
            keep_metadata: config.keep_metadata,
            subfolders: config.subfolders,
            copy_unchanged: config.copy_unchanged,
            recursive: config.recursive,
            dry_run: config.dry_run,
        }
    }
}
