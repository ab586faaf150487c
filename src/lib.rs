//! # Photo Normalizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `format`: Formati riconosciuti, formati di output e metadata supportati
//! - `metadata`: Lettura EXIF (date di scatto, orientamento, blocco raw)
//! - `codec`: Decode/encode delle immagini
//! - `date_resolver`: Data di scatto con fallback EXIF → nome file → filesystem
//! - `naming`: Nomi canonici e risoluzione delle collisioni
//! - `planner`: Decisione copia vs re-encode
//! - `record`: Record per file ed esiti
//! - `file_manager`: Scansione directory e scritture atomiche senza sovrascrittura
//! - `normalizer`: Orchestratore del batch
//! - `job`: Esecuzione in background e snapshot dello stato
//! - `progress` / `json_output`: Progress bar e output JSON
//!
//! ## Utilizzo:
//! ```ignore
//! use photo_normalizer::{BatchNormalizer, Config};
//!
//! let mut normalizer = BatchNormalizer::new(Config::default())?;
//! let report = normalizer.run(&input, &output).await?;
//! ```

pub mod codec;
pub mod config;
pub mod date_resolver;
pub mod error;
pub mod file_manager;
pub mod format;
pub mod job;
pub mod json_output;
pub mod metadata;
pub mod naming;
pub mod normalizer;
pub mod planner;
pub mod progress;
pub mod record;

pub use config::Config;
pub use date_resolver::{CaptureTime, TimestampSource};
pub use error::NormalizeError;
pub use format::{OutputFormat, PhotoFormat};
pub use job::{JobRegistry, JobState, JobStatus};
pub use normalizer::{BatchNormalizer, BatchReport, Subfolders};
pub use record::{FileOutcome, OutcomeStatus};
