//! # Formats and Capabilities Module
//!
//! Definisce i formati immagine riconosciuti in input, i formati di output
//! supportati e la tabella delle capability dei metadata per formato.
//!
//! ## Responsabilità:
//! - `PhotoFormat`: formato rilevato dal contenuto del file (magic bytes), mai dall'estensione
//! - `OutputFormat`: formati target selezionabili dall'utente
//! - `MetadataBlock` + `supported_metadata()`: quali blocchi di metadata sopravvivono
//!   al re-encode per ogni formato target
//!
//! ## Formati Supportati
//!
//! | Formato | Input | Output | Metadata conservati |
//! |---------|-------|--------|---------------------|
//! | JPEG    | ✅    | ✅     | EXIF                |
//! | PNG     | ✅    | ✅     | -                   |
//! | WebP    | ✅    | ✅     | -                   |
//! | TIFF    | ✅    | ✅     | -                   |
//! | HEIC    | ✅    | ❌     | -                   |
//!
//! La tabella è separata dal planner così può essere aggiornata senza toccare
//! la logica di decisione.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input container/codec detected from file content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    Jpeg,
    Png,
    WebP,
    Tiff,
    Heic,
}

/// Number of leading bytes needed to recognize every supported format
pub const SNIFF_LEN: usize = 16;

const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

impl PhotoFormat {
    /// Detect the format from the first bytes of a file
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.len() >= 12 && &header[4..8] == b"ftyp" {
            let brand = &header[8..12];
            if HEIF_BRANDS.iter().any(|b| b.as_slice() == brand) {
                return Some(Self::Heic);
            }
        }

        match image::guess_format(header).ok()? {
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::WebP => Some(Self::WebP),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            _ => None,
        }
    }

    /// The output format with the same encoding, if this format can be written
    pub fn as_output(&self) -> Option<OutputFormat> {
        match self {
            Self::Jpeg => Some(OutputFormat::Jpeg),
            Self::Png => Some(OutputFormat::Png),
            Self::WebP => Some(OutputFormat::WebP),
            Self::Tiff => Some(OutputFormat::Tiff),
            Self::Heic => None,
        }
    }
}

impl fmt::Display for PhotoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
            Self::Heic => "heic",
        };
        f.write_str(name)
    }
}

/// Target encoding requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    #[value(name = "webp")]
    WebP,
    Tiff,
}

impl OutputFormat {
    /// File extension written on disk (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
        }
    }

    /// Whether a quality parameter affects the encoder for this format.
    /// The available WebP encoder is lossless only.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Tiff => "tiff",
        };
        f.write_str(name)
    }
}

/// A metadata block that may be carried across a re-encode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBlock {
    Exif,
}

/// Metadata blocks each output format can embed on re-encode
const METADATA_CAPABILITIES: &[(OutputFormat, &[MetadataBlock])] = &[
    (OutputFormat::Jpeg, &[MetadataBlock::Exif]),
    (OutputFormat::Png, &[]),
    (OutputFormat::WebP, &[]),
    (OutputFormat::Tiff, &[]),
];

/// Look up the metadata blocks the encoder can carry for `format`
pub fn supported_metadata(format: OutputFormat) -> &'static [MetadataBlock] {
    METADATA_CAPABILITIES
        .iter()
        .find(|(f, _)| *f == format)
        .map(|(_, blocks)| *blocks)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_jpeg_and_png() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0, 1];
        assert_eq!(PhotoFormat::sniff(&jpeg), Some(PhotoFormat::Jpeg));

        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        assert_eq!(PhotoFormat::sniff(&png), Some(PhotoFormat::Png));
    }

    #[test]
    fn test_sniff_heic_brand() {
        let mut header = vec![0, 0, 0, 0x18];
        header.extend_from_slice(b"ftypheic");
        header.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(PhotoFormat::sniff(&header), Some(PhotoFormat::Heic));
    }

    #[test]
    fn test_sniff_ignores_text() {
        assert_eq!(PhotoFormat::sniff(b"just some text, no image"), None);
        assert_eq!(PhotoFormat::sniff(b""), None);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Tiff.extension(), "tiff");
        assert_eq!(PhotoFormat::Heic.as_output(), None);
        assert_eq!(PhotoFormat::WebP.as_output(), Some(OutputFormat::WebP));
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(supported_metadata(OutputFormat::Jpeg), &[MetadataBlock::Exif]);
        assert!(supported_metadata(OutputFormat::Png).is_empty());
        assert!(supported_metadata(OutputFormat::WebP).is_empty());
    }
}
