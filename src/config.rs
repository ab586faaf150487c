//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della normalizzazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del batch
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `output_format`: Formato di output (jpeg, png, webp, tiff; default: jpeg)
//! - `quality`: Qualità per formati lossy (1-100, default: 90)
//! - `keep_metadata`: Conserva i metadata quando il formato lo supporta (default: true)
//! - `subfolders`: Sottocartelle per data (none, day, month, year; default: none)
//! - `copy_unchanged`: Copia i file già nel formato richiesto (default: true)
//! - `recursive`: Scansione ricorsiva delle sottodirectory (default: false)
//! - `dry_run`: Pianifica senza scrivere nulla (default: false)
//! - `json_output`: Eventi JSON su stdout invece della progress bar (default: false)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     output_format: OutputFormat::WebP,
//!     subfolders: Subfolders::Month,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::NormalizeError;
use crate::format::OutputFormat;
use crate::normalizer::path_resolver::Subfolders;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for one normalization batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target encoding for every output file
    pub output_format: OutputFormat,
    /// Quality for lossy formats (1-100)
    pub quality: u8,
    /// Carry metadata over when the target format supports it
    pub keep_metadata: bool,
    /// Date-based output layout
    pub subfolders: Subfolders,
    /// Copy files already in the target format instead of re-encoding
    pub copy_unchanged: bool,
    /// Recurse into subdirectories of the input root
    pub recursive: bool,
    /// Plan names and decisions without touching the filesystem
    pub dry_run: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Jpeg,
            quality: 90,
            keep_metadata: true,
            subfolders: Subfolders::Flat,
            copy_unchanged: true,
            recursive: false,
            dry_run: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> std::result::Result<(), NormalizeError> {
        if self.quality == 0 || self.quality > 100 {
            return Err(NormalizeError::Validation(
                "Quality must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        tokio_test::assert_ok!(config.validate());

        config.quality = 0;
        tokio_test::assert_err!(config.validate());

        config.quality = 101;
        tokio_test::assert_err!(config.validate());

        config.quality = 100;
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.quality, 90);
        assert!(config.keep_metadata);
        assert_eq!(config.subfolders, Subfolders::Flat);
        assert!(config.copy_unchanged);
        assert!(!config.recursive);
        assert!(!config.dry_run);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            output_format: OutputFormat::WebP,
            quality: 70,
            keep_metadata: false,
            subfolders: Subfolders::Month,
            recursive: true,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config, original_config);
    }

    #[tokio::test]
    async fn test_config_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        tokio::fs::write(&config_path, r#"{"output_format": "png", "subfolders": "day"}"#)
            .await
            .unwrap();

        let loaded = Config::from_file(&config_path).await.unwrap();
        assert_eq!(loaded.output_format, OutputFormat::Png);
        assert_eq!(loaded.subfolders, Subfolders::Day);
        assert_eq!(loaded.quality, 90);
    }

    #[tokio::test]
    async fn test_config_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::from_file(&temp_dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(loaded, Config::default());
    }
}
