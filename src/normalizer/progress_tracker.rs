//! # Progress Tracking Module
//!
//! Definisce il punto di aggancio `ProgressObserver` usato dall'orchestratore e
//! il tracker da console che unisce progress bar e output JSON.
//!
//! Gli osservatori ricevono gli eventi nello stesso ordine in cui il batch li
//! produce: `scan_started → scan_completed → processing_started → (file_started → file_finished)*`.
//! Anche il `JobTracker` del modulo `job` implementa questo trait.

use crate::{
    json_output::JsonMessage,
    progress::{BatchStats, ProgressManager},
    record::{FileOutcome, OutcomeStatus},
};
use std::path::Path;
use std::sync::Mutex;

/// Receives batch lifecycle events. Every method defaults to a no-op.
pub trait ProgressObserver: Send + Sync {
    fn scan_started(&self) {}

    /// Enumeration and sniffing are done; `total` images will be processed
    fn scan_completed(&self, _total: usize) {}

    fn processing_started(&self) {}

    fn file_started(&self, _index: usize, _source: &Path) {}

    fn file_finished(&self, _index: usize, _outcome: &FileOutcome) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Tracker da console: progress bar `indicatif` oppure righe JSON
pub struct ProgressTracker {
    json_output: bool,
    total_files: Mutex<usize>,
    progress_manager: Mutex<Option<ProgressManager>>,
    stats: Mutex<BatchStats>,
}

impl ProgressTracker {
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            total_files: Mutex::new(0),
            progress_manager: Mutex::new(None),
            stats: Mutex::new(BatchStats::new()),
        }
    }

    /// Finalizza progress bar con il riepilogo degli esiti ricevuti
    pub fn finish(&self) {
        let summary = self.stats().format_summary();
        if let Ok(guard) = self.progress_manager.lock() {
            if let Some(manager) = guard.as_ref() {
                manager.finish(&summary);
            }
        }
    }

    fn stats(&self) -> BatchStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    fn status_message(outcome: &FileOutcome) -> String {
        let name = outcome
            .source
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        match &outcome.status {
            OutcomeStatus::Copied { .. } => format!("[COPY] {}", name),
            OutcomeStatus::Encoded { .. } => format!("[OK] {}", name),
            OutcomeStatus::Planned => format!("[PLAN] {}", name),
            OutcomeStatus::Failed { .. } => format!("[ERROR] {}", name),
        }
    }
}

impl ProgressObserver for ProgressTracker {
    fn scan_completed(&self, total: usize) {
        if let Ok(mut total_files) = self.total_files.lock() {
            *total_files = total;
        }
        if !self.json_output && total > 0 {
            if let Ok(mut manager) = self.progress_manager.lock() {
                *manager = Some(ProgressManager::new(total as u64));
            }
        }
    }

    fn file_finished(&self, index: usize, outcome: &FileOutcome) {
        let stats = match self.stats.lock() {
            Ok(mut stats) => {
                stats.record(&outcome.status);
                stats.clone()
            }
            Err(_) => return,
        };

        if self.json_output {
            let total = self.total_files.lock().map(|t| *t).unwrap_or(0);
            JsonMessage::file_complete(outcome).emit();
            JsonMessage::progress(index + 1, total, &stats).emit();
        } else if let Ok(guard) = self.progress_manager.lock() {
            if let Some(manager) = guard.as_ref() {
                manager.update(&Self::status_message(outcome));
            }
        }
    }
}
