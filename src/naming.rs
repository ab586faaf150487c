//! # Name Allocator Module
//!
//! Converte un timestamp di scatto nel nome file canonico e risolve le collisioni
//! in modo deterministico.
//!
//! ## Formato:
//! `YYYY-MM-DD_HH-MM-SS_####.ext`, con suffisso `__N` (N ≥ 2) prima dell'estensione
//! solo quando il nome è già occupato, es. `2024-01-15_14-30-45_0001__2.jpg`.
//!
//! ## Regole:
//! - Il contatore `####` riparte da 1 a ogni nuovo secondo e incrementa per
//!   record consecutivi con lo stesso secondo: è il disambiguatore primario
//! - Il suffisso `__N` è solo una rete di sicurezza per file già presenti nella
//!   directory di output (run precedenti) o nomi già assegnati in questo run
//! - Un nome assegnato non viene mai riassegnato
//!
//! I record vanno passati in ordine di scatto: l'allocatore non riordina.

use crate::error::{NormalizeError, Result};
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on `__N` suffixes tried before giving up on a file
pub const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Output identity of one photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamePlan {
    /// `YYYY-MM-DD_HH-MM-SS_####`
    pub base_name: String,
    pub sequence: u32,
    pub collision_suffix: Option<u32>,
    pub extension: &'static str,
    /// Directory relative to the output root (empty for a flat layout)
    pub subdirectory: PathBuf,
}

impl NamePlan {
    pub fn file_name(&self) -> String {
        match self.collision_suffix {
            Some(n) => format!("{}__{}.{}", self.base_name, n, self.extension),
            None => format!("{}.{}", self.base_name, self.extension),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        self.subdirectory.join(self.file_name())
    }
}

/// Canonical base name for a timestamp and per-second sequence number
pub fn canonical_base_name(timestamp: NaiveDateTime, sequence: u32) -> String {
    format!("{}_{:04}", timestamp.format("%Y-%m-%d_%H-%M-%S"), sequence)
}

/// Hands out unique output names for one batch run
pub struct NameAllocator {
    output_root: PathBuf,
    last_second: Option<NaiveDateTime>,
    sequence: u32,
    allocated: HashSet<PathBuf>,
}

impl NameAllocator {
    pub fn new(output_root: &Path) -> Self {
        Self {
            output_root: output_root.to_path_buf(),
            last_second: None,
            sequence: 0,
            allocated: HashSet::new(),
        }
    }

    /// Allocate the next name. Calls must follow capture-time order.
    pub fn allocate(
        &mut self,
        timestamp: NaiveDateTime,
        subdirectory: &Path,
        extension: &'static str,
    ) -> Result<NamePlan> {
        let second = timestamp.with_nanosecond(0).unwrap_or(timestamp);
        if self.last_second == Some(second) {
            self.sequence += 1;
        } else {
            self.last_second = Some(second);
            self.sequence = 1;
        }

        let mut plan = NamePlan {
            base_name: canonical_base_name(second, self.sequence),
            sequence: self.sequence,
            collision_suffix: None,
            extension,
            subdirectory: subdirectory.to_path_buf(),
        };

        let mut suffix = 1;
        while self.is_taken(&plan.relative_path()) {
            suffix += 1;
            if suffix > MAX_COLLISION_SUFFIX {
                return Err(NormalizeError::NameExhausted {
                    base_name: plan.base_name,
                    attempts: MAX_COLLISION_SUFFIX,
                });
            }
            plan.collision_suffix = Some(suffix);
        }

        if plan.collision_suffix.is_some() {
            debug!("Name collision resolved: {}", plan.relative_path().display());
        }
        self.allocated.insert(plan.relative_path());
        Ok(plan)
    }

    fn is_taken(&self, relative: &Path) -> bool {
        self.allocated.contains(relative)
            || std::fs::symlink_metadata(self.output_root.join(relative)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_same_second_gets_consecutive_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let mut allocator = NameAllocator::new(tmp.path());
        let ts = dt("2024-01-15 14:30:45");

        let first = allocator.allocate(ts, Path::new(""), "jpg").unwrap();
        let second = allocator.allocate(ts, Path::new(""), "jpg").unwrap();
        let later = allocator
            .allocate(dt("2024-01-15 14:30:46"), Path::new(""), "jpg")
            .unwrap();

        assert_eq!(first.file_name(), "2024-01-15_14-30-45_0001.jpg");
        assert_eq!(second.file_name(), "2024-01-15_14-30-45_0002.jpg");
        assert_eq!(later.file_name(), "2024-01-15_14-30-46_0001.jpg");
        assert!(first.collision_suffix.is_none());
        assert!(second.collision_suffix.is_none());
    }

    #[test]
    fn test_existing_file_gets_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("2024-01-15_14-30-45_0001.jpg"), b"old").unwrap();
        std::fs::write(tmp.path().join("2024-01-15_14-30-45_0001__2.jpg"), b"old").unwrap();

        let mut allocator = NameAllocator::new(tmp.path());
        let plan = allocator
            .allocate(dt("2024-01-15 14:30:45"), Path::new(""), "jpg")
            .unwrap();
        assert_eq!(plan.file_name(), "2024-01-15_14-30-45_0001__3.jpg");
        assert_eq!(plan.collision_suffix, Some(3));
    }

    #[test]
    fn test_collision_checked_in_subdirectory() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = Path::new("2024").join("01");
        std::fs::create_dir_all(tmp.path().join(&sub)).unwrap();
        std::fs::write(tmp.path().join(&sub).join("2024-01-15_14-30-45_0001.png"), b"old").unwrap();

        let mut allocator = NameAllocator::new(tmp.path());
        let flat = allocator
            .allocate(dt("2024-01-15 14:30:45"), Path::new(""), "png")
            .unwrap();
        assert!(flat.collision_suffix.is_none());

        let mut allocator = NameAllocator::new(tmp.path());
        let nested = allocator
            .allocate(dt("2024-01-15 14:30:45"), &sub, "png")
            .unwrap();
        assert_eq!(
            nested.relative_path(),
            sub.join("2024-01-15_14-30-45_0001__2.png")
        );
    }

    #[test]
    fn test_extension_is_part_of_identity() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("2024-01-15_14-30-45_0001.png"), b"old").unwrap();

        let mut allocator = NameAllocator::new(tmp.path());
        let plan = allocator
            .allocate(dt("2024-01-15 14:30:45"), Path::new(""), "jpg")
            .unwrap();
        assert!(plan.collision_suffix.is_none());
    }

    #[test]
    fn test_missing_output_root_is_empty_namespace() {
        let mut allocator = NameAllocator::new(Path::new("/nonexistent/output/root"));
        let plan = allocator
            .allocate(dt("2001-02-03 04:05:06"), Path::new(""), "tiff")
            .unwrap();
        assert_eq!(plan.file_name(), "2001-02-03_04-05-06_0001.tiff");
    }
}
