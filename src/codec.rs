//! # Image Codec Module
//!
//! Questo modulo incapsula decode ed encode delle immagini dietro il trait
//! `ImageCodec`, così la pipeline non dipende direttamente dalla libreria di imaging.
//!
//! ## Responsabilità:
//! - `sniff_format()`: riconosce il formato dai primi byte del file
//! - `decode()`: pixel buffer (l'orientamento arriva dal `MetadataReader` del chiamante)
//! - `encode()`: bytes nel formato target, con qualità e blocco EXIF opzionali
//! - `apply_orientation()`: raddrizza i pixel prima del re-encode
//!
//! ## Implementazione di default
//!
//! `StandardCodec` usa il crate `image` (JPEG, PNG, WebP lossless, TIFF).
//! HEIC viene riconosciuto ma non decodificato:
//! il decode restituisce `UnsupportedFormat` e il file fallisce singolarmente.
//!
//! ## Esempio:
//! ```ignore
//! let codec = StandardCodec::new();
//! let pixels = codec.decode(&path)?;
//! let upright = apply_orientation(pixels, metadata.read_orientation(&path));
//! let bytes = codec.encode(&upright, OutputFormat::Jpeg, Some(90), None)?;
//! ```

use crate::error::{NormalizeError, Result};
use crate::format::{OutputFormat, PhotoFormat, SNIFF_LEN};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use image::DynamicImage;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::warn;

/// JPEG quality used when the caller does not provide one
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Capability for pixel decode/encode and content sniffing
pub trait ImageCodec: Send + Sync {
    /// Detect the image format from file content. `Ok(None)` means not an image.
    fn sniff_format(&self, path: &Path) -> Result<Option<PhotoFormat>>;

    /// Decode pixels as stored, without applying any orientation
    fn decode(&self, path: &Path) -> Result<DynamicImage>;

    fn encode(
        &self,
        pixels: &DynamicImage,
        format: OutputFormat,
        quality: Option<u8>,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>>;
}

/// Codec backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCodec;

impl StandardCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for StandardCodec {
    fn sniff_format(&self, path: &Path) -> Result<Option<PhotoFormat>> {
        let file = std::fs::File::open(path)?;
        let mut header = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
        Ok(PhotoFormat::sniff(&header))
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage> {
        if self.sniff_format(path)? == Some(PhotoFormat::Heic) {
            return Err(NormalizeError::UnsupportedFormat(format!(
                "no HEIC decoder available for {}",
                path.display()
            )));
        }

        image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| NormalizeError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn encode(
        &self,
        pixels: &DynamicImage,
        format: OutputFormat,
        quality: Option<u8>,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        // Every target gets 8-bit RGB, as JPEG cannot carry alpha
        let rgb = DynamicImage::ImageRgb8(pixels.to_rgb8());
        let mut buf = Vec::new();

        match format {
            OutputFormat::Jpeg => {
                let quality = quality.unwrap_or(DEFAULT_JPEG_QUALITY).clamp(1, 100);
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
            }
            OutputFormat::Png => {
                rgb.write_with_encoder(PngEncoder::new(&mut buf))?;
            }
            OutputFormat::WebP => {
                rgb.write_with_encoder(WebPEncoder::new_lossless(&mut buf))?;
            }
            OutputFormat::Tiff => {
                rgb.write_with_encoder(TiffEncoder::new(Cursor::new(&mut buf)))?;
            }
        }

        match (format, exif) {
            (OutputFormat::Jpeg, Some(block)) => Ok(embed_exif(buf, block)),
            _ => Ok(buf),
        }
    }
}

/// Rotate/flip pixels so that orientation 1 (upright) describes them
pub fn apply_orientation(pixels: DynamicImage, orientation: Option<u16>) -> DynamicImage {
    match orientation.unwrap_or(1) {
        2 => pixels.fliph(),
        3 => pixels.rotate180(),
        4 => pixels.flipv(),
        5 => pixels.rotate90().fliph(),
        6 => pixels.rotate90(),
        7 => pixels.rotate270().fliph(),
        8 => pixels.rotate270(),
        _ => pixels,
    }
}

/// Insert an APP1 Exif segment right after the JPEG SOI marker.
///
/// Blocks that do not fit a single segment are dropped and the JPEG is
/// returned unchanged.
pub fn embed_exif(jpeg: Vec<u8>, tiff: &[u8]) -> Vec<u8> {
    if jpeg.len() < 2 || jpeg[0..2] != [0xFF, 0xD8] {
        return jpeg;
    }

    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    let Ok(segment_len) = u16::try_from(segment_len) else {
        warn!("EXIF block of {} bytes too large to embed, dropping it", tiff.len());
        return jpeg;
    };

    let mut out = Vec::with_capacity(jpeg.len() + segment_len as usize + 2);
    out.extend_from_slice(&jpeg[0..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}
