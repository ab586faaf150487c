//! # Normalizer Module
//!
//! Modulo che separa le responsabilità in sottomoduli:
//! - `batch_normalizer`: Orchestratore principale
//! - `task_normalizer`: Worker per singoli file
//! - `progress_tracker`: Punto di aggancio per il progresso + tracker da console
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod batch_normalizer;
pub mod path_resolver;
pub mod progress_tracker;
pub mod task_normalizer;

pub use batch_normalizer::{BatchNormalizer, BatchReport};
pub use path_resolver::{PathResolver, Subfolders};
pub use progress_tracker::{NoopObserver, ProgressObserver, ProgressTracker};
pub use task_normalizer::TaskNormalizer;
