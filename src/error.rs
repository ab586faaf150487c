//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `NormalizeError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori fatali per il batch da errori per singolo file
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - **Fatali per il batch**: `InputRoot`, `OutputRoot`, `Cancelled`, `Task`
//! - **Fatale per il job**: `NoImagesFound` (input senza immagini riconosciute)
//! - **Per singolo file**: `Io`, `Image`, `Decode`, `Encode`, `UnsupportedFormat`, `NameExhausted`
//! - **Job control**: `JobNotFound`
//! - **Configurazione**: `Validation`
//!
//! Gli errori per singolo file vengono registrati nell'outcome list e non
//! interrompono il batch; solo quelli fatali fanno fallire il job.
//!
//! ## Esempio:
//! ```ignore
//! if !input_root.is_dir() {
//!     return Err(NormalizeError::InputRoot {
//!         path: input_root.to_path_buf(),
//!         reason: "not a directory".to_string(),
//!     });
//! }
//! ```

use std::path::PathBuf;
use uuid::Uuid;

/// Custom error types for photo normalization
#[derive(thiserror::Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Input directory {} is not usable: {reason}", path.display())]
    InputRoot { path: PathBuf, reason: String },

    #[error("Output directory {} is not writable: {reason}", path.display())]
    OutputRoot { path: PathBuf, reason: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Cannot encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("No free output name for {base_name} after {attempts} attempts")]
    NameExhausted { base_name: String, attempts: u32 },

    #[error("Batch cancelled")]
    Cancelled,

    #[error("No supported images found")]
    NoImagesFound,

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Configuration error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_path() {
        let err = NormalizeError::OutputRoot {
            path: PathBuf::from("/ro/out"),
            reason: "permission denied".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("/ro/out"));
        assert!(message.contains("permission denied"));
    }

    #[test]
    fn test_job_not_found_message() {
        let id = Uuid::nil();
        assert_eq!(
            NormalizeError::JobNotFound(id).to_string(),
            format!("Job not found: {}", id)
        );
    }
}
