//! # Photo Normalizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Unione di file di configurazione e flag CLI (i flag vincono)
//! - Avvio del batch e stampa del piano / riepilogo
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI
//! 2. Configura il logging (`RUST_LOG`, altrimenti INFO o DEBUG con `--verbose`;
//!    su stderr con `--json`)
//! 3. Carica l'eventuale `--config` e applica i flag
//! 4. Esegue `BatchNormalizer` con la progress bar o l'output JSON
//! 5. Stampa una riga per file in dry run (o con `--verbose`) e il riepilogo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! photo-normalizer ~/Pictures/inbox -o ~/Pictures/sorted --format webp --subfolders month -r
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use photo_normalizer::{
    json_output::{JsonConfig, JsonMessage},
    normalizer::ProgressTracker,
    BatchNormalizer, Config, OutputFormat, Subfolders,
};

#[derive(Parser)]
#[command(name = "photo-normalizer")]
#[command(about = "Convert photos to a uniform format and order them by capture date")]
struct Args {
    /// Directory containing the photos to normalize
    input_dir: PathBuf,

    /// Output directory
    #[arg(short, long = "output")]
    output_dir: PathBuf,

    /// Output format
    #[arg(long = "format", value_enum)]
    output_format: Option<OutputFormat>,

    /// Quality for compressed formats (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Keep metadata when the output format supports it
    #[arg(long, overrides_with = "strip_metadata")]
    keep_metadata: bool,

    /// Strip all metadata
    #[arg(long, overrides_with = "keep_metadata")]
    strip_metadata: bool,

    /// Date-based subfolders
    #[arg(long, value_enum)]
    subfolders: Option<Subfolders>,

    /// Copy images that already match the target format instead of re-encoding
    #[arg(long, overrides_with = "reencode")]
    copy_unchanged: bool,

    /// Re-encode every image, even when it already matches the target format
    #[arg(long, overrides_with = "copy_unchanged")]
    reencode: bool,

    /// Recurse into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Show planned actions without writing files
    #[arg(long)]
    dry_run: bool,

    /// Output progress and status as JSON lines
    #[arg(long)]
    json: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Apply explicit flags on top of a base configuration
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(format) = self.output_format {
            config.output_format = format;
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if self.strip_metadata {
            config.keep_metadata = false;
        } else if self.keep_metadata {
            config.keep_metadata = true;
        }
        if let Some(subfolders) = self.subfolders {
            config.subfolders = subfolders;
        }
        if self.reencode {
            config.copy_unchanged = false;
        } else if self.copy_unchanged {
            config.copy_unchanged = true;
        }
        config.recursive |= self.recursive;
        config.dry_run |= self.dry_run;
        config.json_output |= self.json;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if args.json {
        tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let base = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    let config = args.apply_to(base);
    let json = config.json_output;
    let dry_run = config.dry_run;

    if json {
        JsonMessage::start(
            args.input_dir.clone(),
            args.output_dir.clone(),
            JsonConfig::from(&config),
        )
        .emit();
    }

    let tracker = Arc::new(ProgressTracker::new(json));
    let mut normalizer = BatchNormalizer::new(config)?.with_observer(tracker.clone());

    let report = match normalizer.run(&args.input_dir, &args.output_dir).await {
        Ok(report) => report,
        Err(e) => {
            if json {
                JsonMessage::error(e.to_string(), None).emit();
            }
            return Err(e.into());
        }
    };
    tracker.finish();

    if report.outcomes.is_empty() {
        if json {
            JsonMessage::error("No supported images found.".to_string(), None).emit();
        } else {
            println!("No supported images found.");
        }
        std::process::exit(1);
    }

    if json {
        JsonMessage::complete(&report.summary, report.duration.as_secs_f64()).emit();
        return Ok(());
    }

    if dry_run || args.verbose {
        for outcome in &report.outcomes {
            println!("{}", outcome.plan_line());
        }
    }

    info!("Done in {:.1}s", report.duration.as_secs_f64());
    println!("{}", report.summary.format_summary());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "photo-normalizer",
            "in",
            "-o",
            "out",
            "--format",
            "webp",
            "--strip-metadata",
            "--reencode",
            "--subfolders",
            "none",
        ]);
        let base = Config {
            subfolders: Subfolders::Year,
            ..Default::default()
        };

        let config = args.apply_to(base);
        assert_eq!(config.output_format, OutputFormat::WebP);
        assert!(!config.keep_metadata);
        assert!(!config.copy_unchanged);
        assert_eq!(config.subfolders, Subfolders::Flat);
        assert_eq!(config.quality, 90);
    }

    #[test]
    fn test_paired_flags_last_wins() {
        let args = Args::parse_from([
            "photo-normalizer",
            "in",
            "-o",
            "out",
            "--strip-metadata",
            "--keep-metadata",
        ]);
        assert!(args.apply_to(Config::default()).keep_metadata);
    }

    #[test]
    fn test_quality_range_enforced() {
        assert!(Args::try_parse_from(["photo-normalizer", "in", "-o", "out", "--quality", "0"]).is_err());
    }
}
