//! # Metadata Reader Module
//!
//! Lettura dei metadata EXIF necessari alla pipeline: campi data di scatto,
//! orientamento e blocco EXIF grezzo da riportare nel file ri-codificato.
//!
//! ## Responsabilità:
//! - Trait `MetadataReader`: capability esterna consumata dal Date Resolver e dal codec
//! - `ExifMetadataReader`: implementazione basata su `kamadak-exif`
//! - `reset_orientation()`: riscrive il tag Orientation a 1 in un blocco TIFF
//!
//! ## Gestione errori:
//! Nessuna funzione di lettura fallisce: file illeggibili, corrotti o senza
//! EXIF producono un risultato vuoto, mai un errore.

use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Capture-time fields in resolution priority order
pub const CAPTURE_FIELDS: &[&str] = &["DateTimeOriginal", "DateTime", "DateTimeDigitized"];

const ORIENTATION_TAG: u16 = 0x0112;
const TIFF_SHORT: u16 = 3;

/// Capability for reading photo metadata.
///
/// Implementations must never fail: anything unreadable is reported as absent.
pub trait MetadataReader: Send + Sync {
    /// Raw values of the capture fields present in the file, keyed by field name
    fn read_capture_fields(&self, path: &Path) -> BTreeMap<String, String>;

    /// EXIF orientation (1-8) if present
    fn read_orientation(&self, path: &Path) -> Option<u16>;

    /// The raw TIFF-structured EXIF block, suitable for re-embedding
    fn read_exif_block(&self, path: &Path) -> Option<Vec<u8>>;
}

/// EXIF reader backed by `kamadak-exif`
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn new() -> Self {
        Self
    }

    fn load(path: &Path) -> Option<exif::Exif> {
        match std::panic::catch_unwind(|| Self::load_inner(path)) {
            Ok(exif) => exif,
            Err(_) => {
                warn!("panic while reading EXIF from {}", path.display());
                None
            }
        }
    }

    fn load_inner(path: &Path) -> Option<exif::Exif> {
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) => {
                debug!("cannot open {}: {}", path.display(), e);
                return None;
            }
        };
        let mut reader = BufReader::new(file);
        match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => Some(exif),
            Err(e) => {
                debug!("no EXIF in {}: {}", path.display(), e);
                None
            }
        }
    }

    fn tag_for(field: &str) -> Option<exif::Tag> {
        match field {
            "DateTimeOriginal" => Some(exif::Tag::DateTimeOriginal),
            "DateTime" => Some(exif::Tag::DateTime),
            "DateTimeDigitized" => Some(exif::Tag::DateTimeDigitized),
            _ => None,
        }
    }
}

fn ascii_value(field: &exif::Field) -> Option<String> {
    match &field.value {
        exif::Value::Ascii(parts) => {
            let raw = parts.first()?;
            Some(String::from_utf8_lossy(raw).into_owned())
        }
        _ => None,
    }
}

impl MetadataReader for ExifMetadataReader {
    fn read_capture_fields(&self, path: &Path) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let Some(exif) = Self::load(path) else {
            return fields;
        };

        for name in CAPTURE_FIELDS {
            let Some(tag) = Self::tag_for(name) else {
                continue;
            };
            if let Some(value) = exif
                .get_field(tag, exif::In::PRIMARY)
                .and_then(ascii_value)
            {
                fields.insert((*name).to_string(), value);
            }
        }

        fields
    }

    fn read_orientation(&self, path: &Path) -> Option<u16> {
        let exif = Self::load(path)?;
        let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
        field
            .value
            .get_uint(0)
            .and_then(|v| u16::try_from(v).ok())
            .filter(|v| (1..=8).contains(v))
    }

    fn read_exif_block(&self, path: &Path) -> Option<Vec<u8>> {
        let exif = Self::load(path)?;
        let buf = exif.buf();
        if buf.is_empty() {
            None
        } else {
            Some(buf.to_vec())
        }
    }
}

/// Set the IFD0 Orientation tag of a TIFF-structured EXIF block to 1 (upright).
///
/// Returns true when the tag was found and rewritten.
pub fn reset_orientation(tiff: &mut [u8]) -> bool {
    reset_orientation_inner(tiff).unwrap_or(false)
}

fn reset_orientation_inner(tiff: &mut [u8]) -> Option<bool> {
    let big_endian = match tiff.get(0..2)? {
        b"II" => false,
        b"MM" => true,
        _ => return Some(false),
    };

    let read_u16 = |buf: &[u8], at: usize| -> Option<u16> {
        let b = buf.get(at..at + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let read_u32 = |buf: &[u8], at: usize| -> Option<u32> {
        let b = buf.get(at..at + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    let ifd = read_u32(tiff, 4)? as usize;
    let count = read_u16(tiff, ifd)? as usize;

    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        if read_u16(tiff, entry)? != ORIENTATION_TAG {
            continue;
        }
        if read_u16(tiff, entry + 2)? != TIFF_SHORT {
            return Some(false);
        }
        let upright: u16 = 1;
        let bytes = if big_endian {
            upright.to_be_bytes()
        } else {
            upright.to_le_bytes()
        };
        tiff.get_mut(entry + 8..entry + 10)?.copy_from_slice(&bytes);
        return Some(true);
    }

    Some(false)
}
