//! # Date Resolver Module
//!
//! Determina il momento di scatto di una foto con una catena di fallback a priorità fissa.
//!
//! ## Priorità (la prima che riesce vince):
//! 1. **EXIF**: `DateTimeOriginal`, `DateTime`, `DateTimeDigitized` (in quest'ordine)
//! 2. **Nome file**: pattern tipo `IMG_20240115_143045`, `2024-01-15 14.30.45`,
//!    `IMG-20240115-WA0001` (solo data, ora a mezzanotte)
//! 3. **Filesystem**: birth time se la piattaforma la espone, altrimenti mtime
//!
//! Se anche il filesystem non è leggibile il record riceve l'epoch come
//! timestamp con provenienza `Unresolved`, e viene ordinato per ultimo.
//!
//! ## Gestione errori:
//! Metadata illeggibili equivalgono ad assenza di metadata: il resolver non
//! fallisce mai.

use crate::metadata::{MetadataReader, CAPTURE_FIELDS};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

const EXIF_DATETIME_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Where a capture timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    Exif,
    Filename,
    Filesystem,
    /// Every source failed; the timestamp is the epoch placeholder
    Unresolved,
}

impl std::fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Exif => "exif",
            Self::Filename => "filename",
            Self::Filesystem => "filesystem",
            Self::Unresolved => "unresolved",
        };
        f.write_str(name)
    }
}

/// Resolved capture moment, second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureTime {
    pub timestamp: NaiveDateTime,
    pub source: TimestampSource,
}

impl CaptureTime {
    pub fn new(timestamp: NaiveDateTime, source: TimestampSource) -> Self {
        Self {
            timestamp: truncate_to_second(timestamp),
            source,
        }
    }

    /// Placeholder used when no source yields a timestamp
    pub fn unresolved() -> Self {
        Self {
            // 1970-01-01 00:00:00
            timestamp: NaiveDateTime::default(),
            source: TimestampSource::Unresolved,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == TimestampSource::Unresolved
    }
}

/// Resolves capture timestamps through EXIF, filename and filesystem fallbacks
#[derive(Clone)]
pub struct DateResolver {
    metadata: Arc<dyn MetadataReader>,
}

impl DateResolver {
    pub fn new(metadata: Arc<dyn MetadataReader>) -> Self {
        Self { metadata }
    }

    /// Resolve the capture time of one file
    pub fn resolve(&self, path: &Path) -> CaptureTime {
        if let Some(ts) = self.from_metadata(path) {
            debug!("{}: EXIF capture time {}", path.display(), ts);
            return CaptureTime::new(ts, TimestampSource::Exif);
        }

        if let Some(ts) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_filename_datetime)
        {
            debug!("{}: filename capture time {}", path.display(), ts);
            return CaptureTime::new(ts, TimestampSource::Filename);
        }

        match filesystem_time(path) {
            Some(ts) => {
                debug!("{}: filesystem capture time {}", path.display(), ts);
                CaptureTime::new(ts, TimestampSource::Filesystem)
            }
            None => {
                debug!("{}: no usable capture time", path.display());
                CaptureTime::unresolved()
            }
        }
    }

    fn from_metadata(&self, path: &Path) -> Option<NaiveDateTime> {
        let fields = self.metadata.read_capture_fields(path);
        CAPTURE_FIELDS
            .iter()
            .filter_map(|name| fields.get(*name))
            .find_map(|raw| parse_exif_datetime(raw))
    }
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Parse an EXIF-style timestamp such as `2024:01:15 14:30:45`
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .replace('/', ":");
    EXIF_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
}

struct FilenamePattern {
    regex: Regex,
    has_time: bool,
}

fn filename_patterns() -> &'static [FilenamePattern] {
    static PATTERNS: OnceLock<Vec<FilenamePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // IMG_20240115_143045, 2024-01-15 14.30.45, PXL_20240115_143045123
            FilenamePattern {
                regex: Regex::new(
                    r"(?P<y>(?:19|20)\d{2})[-_.]?(?P<m>0[1-9]|1[0-2])[-_.]?(?P<d>0[1-9]|[12]\d|3[01])[-_.\s]?(?P<h>[01]\d|2[0-3])[-_.:]?(?P<mi>[0-5]\d)[-_.:]?(?P<s>[0-5]\d)",
                )
                .expect("valid date-time filename pattern"),
                has_time: true,
            },
            // IMG-20240115-WA0001
            FilenamePattern {
                regex: Regex::new(
                    r"(?P<y>(?:19|20)\d{2})-?(?P<m>0[1-9]|1[0-2])-?(?P<d>0[1-9]|[12]\d|3[01])-WA\d+",
                )
                .expect("valid messenger filename pattern"),
                has_time: false,
            },
        ]
    })
}

/// Extract a capture timestamp embedded in a file name
pub fn parse_filename_datetime(name: &str) -> Option<NaiveDateTime> {
    filename_patterns().iter().find_map(|pattern| {
        pattern.regex.captures_iter(name).find_map(|caps| {
            let num = |key: &str| caps.name(key)?.as_str().parse::<u32>().ok();
            let date = NaiveDate::from_ymd_opt(num("y")? as i32, num("m")?, num("d")?)?;
            if pattern.has_time {
                date.and_hms_opt(num("h")?, num("mi")?, num("s")?)
            } else {
                date.and_hms_opt(0, 0, 0)
            }
        })
    })
}

/// Birth time where the platform exposes it, else modification time, in local time
pub fn filesystem_time(path: &Path) -> Option<NaiveDateTime> {
    let metadata = std::fs::metadata(path).ok()?;
    let time = metadata.created().or_else(|_| metadata.modified()).ok()?;
    Some(truncate_to_second(DateTime::<Local>::from(time).naive_local()))
}
