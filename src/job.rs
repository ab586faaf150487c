//! # Job Tracking Module
//!
//! Questo modulo permette di eseguire batch in background e di interrogarne lo stato.
//!
//! ## Responsabilità:
//! - `JobTracker`: unico scrittore dello stato di un job, pubblicato su un canale `watch`
//! - `JobRegistry`: archivio dei job del processo (singleton `global()` o istanza esplicita)
//! - Snapshot consistenti e non bloccanti (`snapshot`) oppure notifiche push (`subscribe`)
//! - Cancellazione cooperativa tra un file e l'altro
//! - Pulizia dei job terminati più vecchi della finestra di retention
//!
//! ## Macchina a stati:
//! `Pending → Scanning → Processing → {Completed | Failed}`
//!
//! Lo stato non torna mai indietro e i contatori non diminuiscono. Dopo uno
//! stato terminale gli aggiornamenti vengono ignorati.
//!
//! ## Esempio:
//! ```ignore
//! let registry = JobRegistry::global();
//! let id = registry.submit(input, output, Config::default()).await?;
//! let state = registry.snapshot(id).await?;
//! println!("{:?} {}/{:?}", state.status, state.completed_count, state.total);
//! ```

use crate::{
    config::Config,
    error::{NormalizeError, Result},
    normalizer::{BatchNormalizer, ProgressObserver},
    progress::BatchStats,
    record::FileOutcome,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long finished jobs stay queryable by default
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60 * 60);

pub type JobId = Uuid;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Scanning,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Scanning => 1,
            Self::Processing => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Point-in-time view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub id: JobId,
    pub status: JobStatus,
    /// `None` until enumeration finishes
    pub total: Option<usize>,
    /// Files that reached a final state, failures included
    pub completed_count: usize,
    pub failed_count: usize,
    pub current_file: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<i64>,
    pub error: Option<String>,
}

impl JobState {
    fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            total: None,
            completed_count: 0,
            failed_count: 0,
            current_file: None,
            started_at: Utc::now(),
            finished_at: None,
            elapsed_seconds: Some(0),
            error: None,
        }
    }

    fn refresh_elapsed(&mut self) {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        self.elapsed_seconds = Some((end - self.started_at).num_seconds());
    }

    fn advance(&mut self, status: JobStatus) {
        if status.rank() > self.status.rank() {
            self.status = status;
        }
    }
}

/// Single writer for one job's state
pub struct JobTracker {
    sender: watch::Sender<JobState>,
}

impl JobTracker {
    pub fn new(id: JobId) -> (Self, watch::Receiver<JobState>) {
        let (sender, receiver) = watch::channel(JobState::new(id));
        (Self { sender }, receiver)
    }

    /// Apply `change` unless the job already finished
    fn update(&self, change: impl FnOnce(&mut JobState)) {
        self.sender.send_modify(|state| {
            if state.status.is_terminal() {
                return;
            }
            change(state);
            state.refresh_elapsed();
        });
    }

    pub fn complete(&self, summary: &BatchStats) {
        self.update(|state| {
            state.advance(JobStatus::Completed);
            state.finished_at = Some(Utc::now());
            if state.total.is_none() {
                state.total = Some(summary.files_processed);
            }
        });
    }

    /// Record a fatal error. Only the first one is kept.
    pub fn fail(&self, error: &NormalizeError) {
        self.update(|state| {
            state.advance(JobStatus::Failed);
            state.finished_at = Some(Utc::now());
            state.error = Some(error.to_string());
        });
    }

    pub fn state(&self) -> JobState {
        self.sender.borrow().clone()
    }
}

impl ProgressObserver for JobTracker {
    fn scan_started(&self) {
        self.update(|state| state.advance(JobStatus::Scanning));
    }

    fn scan_completed(&self, total: usize) {
        self.update(|state| {
            state.advance(JobStatus::Scanning);
            state.total = Some(total);
        });
    }

    fn processing_started(&self) {
        self.update(|state| state.advance(JobStatus::Processing));
    }

    fn file_started(&self, _index: usize, source: &Path) {
        let name = source.display().to_string();
        self.update(|state| state.current_file = Some(name));
    }

    fn file_finished(&self, _index: usize, outcome: &FileOutcome) {
        let failed = outcome.status.is_failure();
        let name = outcome.source.display().to_string();
        self.update(|state| {
            state.completed_count += 1;
            if failed {
                state.failed_count += 1;
            }
            state.current_file = Some(name);
        });
    }
}

struct JobEntry {
    state: watch::Receiver<JobState>,
    stop_sender: broadcast::Sender<()>,
}

/// Store of background jobs
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, JobEntry>>,
    retention: Duration,
}

static GLOBAL_REGISTRY: OnceLock<JobRegistry> = OnceLock::new();

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Process-wide registry
    pub fn global() -> &'static JobRegistry {
        GLOBAL_REGISTRY.get_or_init(JobRegistry::default)
    }

    /// Start a batch on the tokio runtime and return its id immediately
    pub async fn submit(
        &self,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        config: Config,
    ) -> Result<JobId> {
        config.validate()?;
        self.cleanup_expired().await;

        let id = Uuid::new_v4();
        let (tracker, state) = JobTracker::new(id);
        let tracker = Arc::new(tracker);
        let (stop_sender, stop_receiver) = broadcast::channel(1);
        let input_root = input_root.into();
        let output_root = output_root.into();

        self.jobs.write().await.insert(
            id,
            JobEntry {
                state,
                stop_sender,
            },
        );
        info!("Job {} submitted: {}", id, input_root.display());

        tokio::spawn(async move {
            let observer: Arc<dyn ProgressObserver> = tracker.clone();
            let result = match BatchNormalizer::new(config) {
                Ok(normalizer) => {
                    let mut normalizer = normalizer
                        .with_observer(observer)
                        .with_cancellation(stop_receiver);
                    normalizer.run(&input_root, &output_root).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(report) if report.outcomes.is_empty() => {
                    warn!("Job {}: no supported images in {}", id, input_root.display());
                    tracker.fail(&NormalizeError::NoImagesFound);
                }
                Ok(report) => {
                    info!("Job {} completed: {}", id, report.summary.format_summary());
                    tracker.complete(&report.summary);
                }
                Err(e) => {
                    warn!("Job {} failed: {}", id, e);
                    tracker.fail(&e);
                }
            }
        });

        Ok(id)
    }

    /// Latest published state of a job
    pub async fn snapshot(&self, id: JobId) -> Result<JobState> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&id).ok_or(NormalizeError::JobNotFound(id))?;
        let mut state = entry.state.borrow().clone();
        state.refresh_elapsed();
        Ok(state)
    }

    /// Receiver notified on every state change
    pub async fn subscribe(&self, id: JobId) -> Result<watch::Receiver<JobState>> {
        let jobs = self.jobs.read().await;
        jobs.get(&id)
            .map(|entry| entry.state.clone())
            .ok_or(NormalizeError::JobNotFound(id))
    }

    /// Ask a running job to stop before its next file
    pub async fn cancel(&self, id: JobId) -> Result<()> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&id).ok_or(NormalizeError::JobNotFound(id))?;
        if entry.stop_sender.send(()).is_err() {
            debug!("Job {} is no longer listening for cancellation", id);
        }
        Ok(())
    }

    /// Forget a job. A running job keeps running but is no longer queryable.
    pub async fn remove(&self, id: JobId) -> Result<()> {
        self.jobs
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(NormalizeError::JobNotFound(id))
    }

    /// Drop finished jobs older than the retention window; returns how many
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();

        jobs.retain(|_, entry| {
            let state = entry.state.borrow();
            match state.finished_at {
                Some(finished) if state.status.is_terminal() => (now - finished)
                    .to_std()
                    .map_or(true, |age| age < self.retention),
                _ => true,
            }
        });

        let removed = before - jobs.len();
        if removed > 0 {
            debug!("Removed {} expired jobs", removed);
        }
        removed
    }

    pub async fn job_ids(&self) -> Vec<JobId> {
        self.jobs.read().await.keys().copied().collect()
    }
}
