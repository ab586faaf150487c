//! # Batch Normalizer Main Orchestrator
//!
//! Orchestratore principale che delega responsabilità ai moduli specializzati.
//!
//! ## Fasi del batch:
//! 1. Validazione della directory di input (e preparazione dell'output, se non dry run)
//! 2. Scansione in ordine di path + riconoscimento del formato dal contenuto
//! 3. Risoluzione delle date e ordinamento stabile per data di scatto
//! 4. Allocazione di tutti i nomi e delle decisioni prima di qualsiasi scrittura
//! 5. Esecuzione sequenziale file per file (copia o re-encode), con controllo
//!    di cancellazione tra un file e l'altro
//!
//! Gli errori del singolo file finiscono nell'esito e non fermano il batch.
//! I file illeggibili in fase di scansione contano nel totale e passano
//! dall'observer come qualsiasi altro esito.

use crate::{
    codec::{ImageCodec, StandardCodec},
    config::Config,
    date_resolver::DateResolver,
    error::{NormalizeError, Result},
    file_manager::FileManager,
    metadata::{ExifMetadataReader, MetadataReader},
    naming::{NameAllocator, NamePlan},
    normalizer::{
        path_resolver::PathResolver,
        progress_tracker::{NoopObserver, ProgressObserver},
        task_normalizer::TaskNormalizer,
    },
    planner::{plan_conversion, ConversionDecision},
    progress::BatchStats,
    record::{FileOutcome, OutcomeStatus, PhotoRecord},
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Result of a completed batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One entry per discovered image, in processing order
    pub outcomes: Vec<FileOutcome>,
    pub summary: BatchStats,
    pub duration: Duration,
}

/// Output of the scan phase
struct ScanResult {
    records: Vec<PhotoRecord>,
    failures: Vec<FileOutcome>,
}

/// A record with its name and decision fixed, ready to execute
struct PlannedFile {
    record: PhotoRecord,
    name: Result<NamePlan>,
    decision: ConversionDecision,
}

/// Orchestratore principale
pub struct BatchNormalizer {
    config: Config,
    codec: Arc<dyn ImageCodec>,
    metadata: Arc<dyn MetadataReader>,
    observer: Arc<dyn ProgressObserver>,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl BatchNormalizer {
    /// Crea nuova istanza con codec e lettore EXIF di default
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            codec: Arc::new(StandardCodec::new()),
            metadata: Arc::new(ExifMetadataReader::new()),
            observer: Arc::new(NoopObserver),
            stop_receiver: None,
        })
    }

    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_metadata_reader(mut self, metadata: Arc<dyn MetadataReader>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Enable cooperative cancellation, checked between files
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    /// Esegue il batch completo
    pub async fn run(&mut self, input_root: &Path, output_root: &Path) -> Result<BatchReport> {
        let start_time = Instant::now();

        FileManager::check_input_root(input_root)?;
        if !self.config.dry_run {
            FileManager::prepare_output_root(output_root)?;
        }

        info!(
            "Normalizing {} -> {} (format: {}, subfolders: {:?}, dry run: {})",
            input_root.display(),
            output_root.display(),
            self.config.output_format,
            self.config.subfolders,
            self.config.dry_run
        );

        self.observer.scan_started();
        let scan = self.scan(input_root, output_root).await?;
        info!(
            "Found {} images ({} unreadable)",
            scan.records.len(),
            scan.failures.len()
        );
        self.observer.scan_completed(scan.records.len() + scan.failures.len());

        let planned = self.plan(scan.records, output_root);

        self.observer.processing_started();
        let mut outcomes = Vec::with_capacity(planned.len() + scan.failures.len());
        let mut summary = BatchStats::new();

        for (index, file) in planned.into_iter().enumerate() {
            if self.should_stop() {
                warn!("Stop signal received after {} files", index);
                return Err(NormalizeError::Cancelled);
            }

            self.observer.file_started(index, &file.record.source_path);
            let outcome = self.process_file(file, output_root).await;
            self.observer.file_finished(index, &outcome);

            summary.record(&outcome.status);
            outcomes.push(outcome);
        }

        let offset = outcomes.len();
        for (position, failure) in scan.failures.into_iter().enumerate() {
            let index = offset + position;
            self.observer.file_started(index, &failure.source);
            self.observer.file_finished(index, &failure);

            summary.record(&failure.status);
            outcomes.push(failure);
        }

        let duration = start_time.elapsed();
        info!("{} in {:.1}s", summary.format_summary(), duration.as_secs_f64());

        Ok(BatchReport {
            outcomes,
            summary,
            duration,
        })
    }

    /// Enumerate, sniff and date every candidate file on a blocking thread
    async fn scan(&self, input_root: &Path, output_root: &Path) -> Result<ScanResult> {
        let input = input_root
            .canonicalize()
            .map_err(|e| NormalizeError::InputRoot {
                path: input_root.to_path_buf(),
                reason: e.to_string(),
            })?;
        // Outputs written inside the input tree must not be picked up again
        let exclude = output_root
            .canonicalize()
            .ok()
            .filter(|out| out.starts_with(&input) && *out != input);

        let recursive = self.config.recursive;
        let codec = Arc::clone(&self.codec);
        let resolver = DateResolver::new(Arc::clone(&self.metadata));

        tokio::task::spawn_blocking(move || {
            let (files, scan_errors) =
                FileManager::find_candidate_files(&input, recursive, exclude.as_deref());

            let mut candidates = Vec::new();
            let mut failures: Vec<FileOutcome> = scan_errors
                .into_iter()
                .map(|(path, reason)| FileOutcome::failed_early(path, reason))
                .collect();
            for path in files {
                match codec.sniff_format(&path) {
                    Ok(Some(format)) => candidates.push((path, format)),
                    Ok(None) => debug!("not an image, skipping: {}", path.display()),
                    Err(e) => {
                        warn!("cannot read {}: {}", path.display(), e);
                        failures.push(FileOutcome::failed_early(path, e.to_string()));
                    }
                }
            }

            let records = candidates
                .into_iter()
                .enumerate()
                .map(|(discovery_index, (source_path, detected_format))| {
                    let capture = resolver.resolve(&source_path);
                    debug!(
                        "{}: {} ({})",
                        source_path.display(),
                        capture.timestamp,
                        capture.source
                    );
                    PhotoRecord {
                        source_path,
                        capture,
                        detected_format,
                        discovery_index,
                    }
                })
                .collect();

            ScanResult { records, failures }
        })
        .await
        .map_err(|e| NormalizeError::Task(e.to_string()))
    }

    /// Fix names and decisions for every record before anything is written
    fn plan(&self, mut records: Vec<PhotoRecord>, output_root: &Path) -> Vec<PlannedFile> {
        records.sort_by_key(|record| record.order_key());

        let extension = self.config.output_format.extension();
        let mut allocator = NameAllocator::new(output_root);

        records
            .into_iter()
            .map(|record| {
                let subdirectory =
                    PathResolver::subdirectory(record.capture.timestamp, self.config.subfolders);
                let name = allocator.allocate(record.capture.timestamp, &subdirectory, extension);
                let decision = plan_conversion(
                    record.detected_format,
                    self.config.output_format,
                    self.config.quality,
                    self.config.copy_unchanged,
                    self.config.keep_metadata,
                );
                PlannedFile {
                    record,
                    name,
                    decision,
                }
            })
            .collect()
    }

    /// Processa un singolo file pianificato
    async fn process_file(&self, file: PlannedFile, output_root: &Path) -> FileOutcome {
        let PlannedFile {
            record,
            name,
            decision,
        } = file;

        let mut outcome = FileOutcome {
            source: record.source_path.clone(),
            capture: Some(record.capture),
            format: Some(record.detected_format),
            name: None,
            destination: None,
            decision: Some(decision.clone()),
            status: OutcomeStatus::Planned,
        };

        let name = match name {
            Ok(name) => name,
            Err(e) => {
                warn!("{}: {}", record.source_path.display(), e);
                outcome.status = OutcomeStatus::Failed {
                    error: e.to_string(),
                };
                return outcome;
            }
        };

        let destination = PathResolver::destination(output_root, &name);
        outcome.name = Some(name);
        outcome.destination = Some(destination.clone());

        if self.config.dry_run {
            return outcome;
        }

        let worker = TaskNormalizer::new(Arc::clone(&self.codec), Arc::clone(&self.metadata));
        let source = record.source_path;
        let result = tokio::task::spawn_blocking(move || {
            worker.execute(&source, &destination, &decision)
        })
        .await
        .map_err(|e| NormalizeError::Task(e.to_string()))
        .and_then(|result| result);

        outcome.status = match result {
            Ok(status) => status,
            Err(e) => {
                warn!("{}: {}", outcome.source.display(), e);
                OutcomeStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        outcome
    }

    /// Checks if a stop signal has been received
    fn should_stop(&mut self) -> bool {
        if let Some(ref mut receiver) = self.stop_receiver {
            return match receiver.try_recv() {
                Ok(_) => true,
                Err(broadcast::error::TryRecvError::Empty) => false,
                // Signal was sent but missed, treat as stop
                Err(broadcast::error::TryRecvError::Lagged(_)) => true,
                Err(broadcast::error::TryRecvError::Closed) => false,
            };
        }
        false
    }
}
