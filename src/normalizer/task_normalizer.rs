//! # Task Normalizer Module
//!
//! Worker per la scrittura di un singolo file già pianificato.
//! Separato dall'orchestratore: riceve sorgente, destinazione e decisione e
//! produce lo stato finale del file. Il codice è sincrono e gira dentro
//! `spawn_blocking`.

use crate::{
    codec::{apply_orientation, ImageCodec},
    error::{NormalizeError, Result},
    file_manager::FileManager,
    format::MetadataBlock,
    metadata::{reset_orientation, MetadataReader},
    planner::ConversionDecision,
    record::OutcomeStatus,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Worker per elaborazione singoli file
#[derive(Clone)]
pub struct TaskNormalizer {
    codec: Arc<dyn ImageCodec>,
    metadata: Arc<dyn MetadataReader>,
}

impl TaskNormalizer {
    pub fn new(codec: Arc<dyn ImageCodec>, metadata: Arc<dyn MetadataReader>) -> Self {
        Self { codec, metadata }
    }

    /// Produce `destination` from `source` according to `decision`
    pub fn execute(
        &self,
        source: &Path,
        destination: &Path,
        decision: &ConversionDecision,
    ) -> Result<OutcomeStatus> {
        match decision {
            ConversionDecision::CopyUnchanged => {
                let bytes = FileManager::copy_no_clobber(source, destination)?;
                debug!("copied {} -> {}", source.display(), destination.display());
                Ok(OutcomeStatus::Copied { bytes })
            }
            ConversionDecision::Reencode {
                format,
                quality,
                metadata,
            } => {
                let pixels = self.codec.decode(source)?;
                let upright = apply_orientation(pixels, self.metadata.read_orientation(source));

                let exif = if metadata.carries(MetadataBlock::Exif) {
                    self.metadata.read_exif_block(source).map(|mut block| {
                        reset_orientation(&mut block);
                        block
                    })
                } else {
                    None
                };

                let bytes = self
                    .codec
                    .encode(&upright, *format, *quality, exif.as_deref())
                    .map_err(|e| NormalizeError::Encode {
                        path: source.to_path_buf(),
                        reason: e.to_string(),
                    })?;

                FileManager::write_no_clobber(destination, &bytes)?;
                debug!(
                    "encoded {} -> {} ({}, exif: {})",
                    source.display(),
                    destination.display(),
                    format,
                    exif.is_some()
                );
                Ok(OutcomeStatus::Encoded {
                    bytes: bytes.len() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::StandardCodec;
    use crate::format::{OutputFormat, PhotoFormat};
    use crate::metadata::ExifMetadataReader;
    use crate::planner::MetadataPolicy;
    use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Reports a fixed orientation for every file
    struct RotatedReader(u16);

    impl MetadataReader for RotatedReader {
        fn read_capture_fields(&self, _path: &Path) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
        fn read_orientation(&self, _path: &Path) -> Option<u16> {
            Some(self.0)
        }
        fn read_exif_block(&self, _path: &Path) -> Option<Vec<u8>> {
            None
        }
    }

    fn worker() -> TaskNormalizer {
        TaskNormalizer::new(Arc::new(StandardCodec::new()), Arc::new(ExifMetadataReader::new()))
    }

    fn write_png(path: &Path) {
        DynamicImage::ImageRgb8(RgbImage::new(4, 3))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_copy_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.png");
        let dest = dir.path().join("out").join("2024-01-01_00-00-00_0001.png");
        write_png(&src);

        let status = worker()
            .execute(&src, &dest, &ConversionDecision::CopyUnchanged)
            .unwrap();

        assert!(matches!(status, OutcomeStatus::Copied { .. }));
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&dest).unwrap());
    }

    #[test]
    fn test_reencode_png_to_jpeg() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.png");
        let dest = dir.path().join("out.jpg");
        write_png(&src);

        let decision = ConversionDecision::Reencode {
            format: OutputFormat::Jpeg,
            quality: Some(80),
            metadata: MetadataPolicy::Carry(vec![MetadataBlock::Exif]),
        };
        let status = worker().execute(&src, &dest, &decision).unwrap();

        assert!(matches!(status, OutcomeStatus::Encoded { .. }));
        let header = std::fs::read(&dest).unwrap();
        assert_eq!(PhotoFormat::sniff(&header), Some(PhotoFormat::Jpeg));
    }

    #[test]
    fn test_existing_destination_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.png");
        let dest = dir.path().join("taken.png");
        write_png(&src);
        std::fs::write(&dest, b"keep me").unwrap();

        let result = worker().execute(&src, &dest, &ConversionDecision::CopyUnchanged);

        assert!(result.is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"keep me");
    }

    #[test]
    fn test_corrupt_source_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("broken.jpg");
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&src, bytes).unwrap();

        let decision = ConversionDecision::Reencode {
            format: OutputFormat::Png,
            quality: None,
            metadata: MetadataPolicy::Strip,
        };
        let result = worker().execute(&src, &dir.path().join("out.png"), &decision);

        assert!(matches!(result, Err(NormalizeError::Decode { .. })));
        assert!(!dir.path().join("out.png").exists());
    }

    #[test]
    fn test_orientation_comes_from_metadata_reader() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.png");
        let dest = dir.path().join("out.png");
        write_png(&src);

        let worker =
            TaskNormalizer::new(Arc::new(StandardCodec::new()), Arc::new(RotatedReader(6)));
        let decision = ConversionDecision::Reencode {
            format: OutputFormat::Png,
            quality: None,
            metadata: MetadataPolicy::Strip,
        };
        worker.execute(&src, &dest, &decision).unwrap();

        assert_eq!(image::open(&dest).unwrap().dimensions(), (3, 4));
    }
}
