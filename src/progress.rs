//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce la progress bar e le statistiche del batch.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` per feedback real-time
//! - Tracking statistiche (file copiati, ri-codificati, pianificati, errori)
//! - Report finale con byte scritti
//!
//! ## Componenti principali:
//! - `ProgressManager`: Gestisce progress bar principale
//! - `BatchStats`: Traccia statistiche cumulative
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================] 150/150 (100%) [OK] IMG_0001.HEIC
//! ```
//!
//! ## Esempio:
//! ```ignore
//! let progress = ProgressManager::new(total_files);
//! let mut stats = BatchStats::new();
//!
//! // Per ogni file processato:
//! stats.record(&outcome.status);
//! progress.update("IMG_0001.jpg");
//!
//! // Alla fine:
//! progress.finish(&stats.format_summary());
//! ```

use crate::file_manager::FileManager;
use crate::record::OutcomeStatus;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages progress reporting for a batch
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// Statistics tracker for batch results
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_copied: usize,
    pub files_encoded: usize,
    pub files_planned: usize,
    pub errors: usize,
    pub bytes_written: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, status: &OutcomeStatus) {
        self.files_processed += 1;
        match status {
            OutcomeStatus::Copied { bytes } => {
                self.files_copied += 1;
                self.bytes_written += bytes;
            }
            OutcomeStatus::Encoded { bytes } => {
                self.files_encoded += 1;
                self.bytes_written += bytes;
            }
            OutcomeStatus::Planned => self.files_planned += 1,
            OutcomeStatus::Failed { .. } => self.errors += 1,
        }
    }

    /// Files that reached a non-failed terminal state
    pub fn succeeded(&self) -> usize {
        self.files_copied + self.files_encoded + self.files_planned
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Copied: {} | Encoded: {} | Planned: {} | Errors: {} | Written: {}",
            self.files_processed,
            self.files_copied,
            self.files_encoded,
            self.files_planned,
            self.errors,
            FileManager::format_size(self.bytes_written),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record() {
        let mut stats = BatchStats::new();
        stats.record(&OutcomeStatus::Copied { bytes: 1024 });
        stats.record(&OutcomeStatus::Encoded { bytes: 1024 });
        stats.record(&OutcomeStatus::Failed {
            error: "corrupt".to_string(),
        });

        assert_eq!(stats.files_processed, 3);
        assert_eq!(stats.succeeded(), 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.bytes_written, 2048);
        assert!(stats.format_summary().contains("Written: 2.00 KB"));
    }
}
