//! # Conversion Planner Module
//!
//! Decide per ogni file se copiarlo così com'è o ri-codificarlo.
//!
//! ## Regole:
//! - `copy_unchanged` attivo **e** formato rilevato == formato richiesto → `CopyUnchanged`
//!   (bytes copiati verbatim: metadata e profilo colore restano intatti)
//! - altrimenti → `Reencode` nel formato richiesto:
//!   - la qualità vale solo per target lossy (JPEG), ignorata per gli altri
//!   - i metadata sono conservati solo se richiesto **e** se il formato target
//!     li supporta secondo la tabella in `format::supported_metadata`
//!
//! La funzione è pura: nessun I/O, nessun side effect.

use crate::format::{supported_metadata, MetadataBlock, OutputFormat, PhotoFormat};
use serde::Serialize;

/// Which metadata blocks travel with a re-encoded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataPolicy {
    Strip,
    Carry(Vec<MetadataBlock>),
}

impl MetadataPolicy {
    pub fn carries(&self, block: MetadataBlock) -> bool {
        match self {
            Self::Strip => false,
            Self::Carry(blocks) => blocks.contains(&block),
        }
    }
}

/// Copy-vs-reencode decision for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionDecision {
    CopyUnchanged,
    Reencode {
        format: OutputFormat,
        /// Only set for lossy targets
        quality: Option<u8>,
        metadata: MetadataPolicy,
    },
}

impl ConversionDecision {
    /// Short label for plan listings, e.g. `COPY` or `ENCODE->jpeg`
    pub fn label(&self) -> String {
        match self {
            Self::CopyUnchanged => "COPY".to_string(),
            Self::Reencode { format, .. } => format!("ENCODE->{}", format),
        }
    }
}

/// Decide how to produce the output for one file
pub fn plan_conversion(
    detected: PhotoFormat,
    requested: OutputFormat,
    quality: u8,
    copy_unchanged: bool,
    keep_metadata: bool,
) -> ConversionDecision {
    if copy_unchanged && detected.as_output() == Some(requested) {
        return ConversionDecision::CopyUnchanged;
    }

    let quality = requested.is_lossy().then_some(quality);
    let metadata = if keep_metadata {
        let blocks = supported_metadata(requested);
        if blocks.is_empty() {
            MetadataPolicy::Strip
        } else {
            MetadataPolicy::Carry(blocks.to_vec())
        }
    } else {
        MetadataPolicy::Strip
    };

    ConversionDecision::Reencode {
        format: requested,
        quality,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_only_when_formats_match_and_enabled() {
        assert_eq!(
            plan_conversion(PhotoFormat::Jpeg, OutputFormat::Jpeg, 90, true, true),
            ConversionDecision::CopyUnchanged
        );

        let inputs = [
            PhotoFormat::Jpeg,
            PhotoFormat::Png,
            PhotoFormat::WebP,
            PhotoFormat::Tiff,
            PhotoFormat::Heic,
        ];
        let outputs = [
            OutputFormat::Jpeg,
            OutputFormat::Png,
            OutputFormat::WebP,
            OutputFormat::Tiff,
        ];
        for detected in inputs {
            for requested in outputs {
                for copy_unchanged in [true, false] {
                    let decision = plan_conversion(detected, requested, 90, copy_unchanged, true);
                    let expect_copy = copy_unchanged && detected.as_output() == Some(requested);
                    assert_eq!(
                        decision == ConversionDecision::CopyUnchanged,
                        expect_copy,
                        "{detected} -> {requested}, copy_unchanged={copy_unchanged}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_quality_only_for_lossy() {
        match plan_conversion(PhotoFormat::Png, OutputFormat::Jpeg, 75, true, false) {
            ConversionDecision::Reencode { quality, .. } => assert_eq!(quality, Some(75)),
            other => panic!("unexpected decision {other:?}"),
        }
        match plan_conversion(PhotoFormat::Jpeg, OutputFormat::Png, 75, true, false) {
            ConversionDecision::Reencode { quality, .. } => assert_eq!(quality, None),
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_metadata_follows_capability_table() {
        match plan_conversion(PhotoFormat::Png, OutputFormat::Jpeg, 90, false, true) {
            ConversionDecision::Reencode { metadata, .. } => {
                assert!(metadata.carries(MetadataBlock::Exif))
            }
            other => panic!("unexpected decision {other:?}"),
        }
        match plan_conversion(PhotoFormat::Jpeg, OutputFormat::WebP, 90, false, true) {
            ConversionDecision::Reencode { metadata, .. } => {
                assert_eq!(metadata, MetadataPolicy::Strip)
            }
            other => panic!("unexpected decision {other:?}"),
        }
        match plan_conversion(PhotoFormat::Jpeg, OutputFormat::Jpeg, 90, false, false) {
            ConversionDecision::Reencode { metadata, .. } => {
                assert_eq!(metadata, MetadataPolicy::Strip)
            }
            other => panic!("unexpected decision {other:?}"),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(ConversionDecision::CopyUnchanged.label(), "COPY");
        let decision = plan_conversion(PhotoFormat::Heic, OutputFormat::Jpeg, 90, true, true);
        assert_eq!(decision.label(), "ENCODE->jpeg");
    }
}
