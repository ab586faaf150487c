//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery delle foto.
//!
//! ## Responsabilità:
//! - Validazione della directory di input e preparazione di quella di output
//! - Discovery (opzionalmente ricorsiva) dei file candidati, in ordine di path
//! - Scritture atomiche senza sovrascrittura (temp file + persist no-clobber)
//! - Formattazione human-readable delle dimensioni
//!
//! ## Sicurezza operazioni:
//! - Ogni output viene scritto in un file temporaneo nella directory di destinazione
//!   e poi rinominato: un file parziale non appare mai col nome finale
//! - Se il nome finale esiste già la scrittura fallisce: nessun output di run
//!   precedenti viene sovrascritto silenziosamente
//! - La copia verbatim conserva il modification time dell'originale
//!
//! ## Esempio:
//! ```ignore
//! FileManager::check_input_root(&input)?;
//! let (files, skipped) = FileManager::find_candidate_files(&input, true, None);
//! FileManager::write_no_clobber(&dest, &bytes)?;
//! ```

use crate::error::{NormalizeError, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Fail unless `root` is a readable directory
    pub fn check_input_root(root: &Path) -> Result<()> {
        let metadata = std::fs::metadata(root).map_err(|e| NormalizeError::InputRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !metadata.is_dir() {
            return Err(NormalizeError::InputRoot {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        std::fs::read_dir(root).map_err(|e| NormalizeError::InputRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Create the output root if needed and verify files can be created in it
    pub fn prepare_output_root(root: &Path) -> Result<()> {
        let output_error = |e: std::io::Error| NormalizeError::OutputRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        };

        std::fs::create_dir_all(root).map_err(output_error)?;
        if !root.is_dir() {
            return Err(NormalizeError::OutputRoot {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        NamedTempFile::new_in(root).map_err(output_error)?;
        Ok(())
    }

    /// Find every regular file under `root`, sorted by path.
    ///
    /// `exclude` prunes one directory from the walk (the output root when it
    /// lives inside the input root). Unreadable entries are logged and returned
    /// separately with the path that failed (the root when walkdir has none).
    pub fn find_candidate_files(
        root: &Path,
        recursive: bool,
        exclude: Option<&Path>,
    ) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
        let mut files = Vec::new();
        let mut errors = Vec::new();
        let max_depth = if recursive { usize::MAX } else { 1 };

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| exclude.map_or(true, |ex| e.path() != ex))
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    files.push(entry.path().to_path_buf());
                }
                Ok(entry) => {
                    debug!("skipping non-file entry: {}", entry.path().display());
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    warn!("scan error: {}", e);
                    errors.push((path, format!("scan error: {}", e)));
                }
            }
        }

        debug!(
            "find_candidate_files {}: {} files, {} errors",
            root.display(),
            files.len(),
            errors.len()
        );
        (files, errors)
    }

    /// Copy `src` to `dest` verbatim, never replacing an existing `dest`
    pub fn copy_no_clobber(src: &Path, dest: &Path) -> Result<u64> {
        let mut temp = Self::temp_beside(dest)?;
        let mut input = File::open(src)?;
        let bytes = std::io::copy(&mut input, temp.as_file_mut())?;

        if let Ok(modified) = input.metadata().and_then(|m| m.modified()) {
            if let Err(e) = temp.as_file().set_modified(modified) {
                debug!("cannot preserve mtime for {}: {}", dest.display(), e);
            }
        }

        temp.persist_noclobber(dest).map_err(|e| e.error)?;
        Ok(bytes)
    }

    /// Write `bytes` to `dest`, never replacing an existing `dest`
    pub fn write_no_clobber(dest: &Path, bytes: &[u8]) -> Result<()> {
        let mut temp = Self::temp_beside(dest)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist_noclobber(dest).map_err(|e| e.error)?;
        Ok(())
    }

    fn temp_beside(dest: &Path) -> Result<NamedTempFile> {
        let parent = dest.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;
        Ok(NamedTempFile::new_in(parent)?)
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, b"data").unwrap();
        p
    }

    #[test]
    fn test_find_files_sorted_and_depth() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "b.jpg");
        touch(tmp.path(), "a.jpg");
        touch(tmp.path(), "nested/c.jpg");

        let (flat, errors) = FileManager::find_candidate_files(tmp.path(), false, None);
        assert!(errors.is_empty());
        assert_eq!(flat, vec![tmp.path().join("a.jpg"), tmp.path().join("b.jpg")]);

        let (deep, _) = FileManager::find_candidate_files(tmp.path(), true, None);
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&tmp.path().join("nested").join("c.jpg")));
    }

    #[test]
    fn test_find_files_excludes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.jpg");
        touch(tmp.path(), "out/2024-01-15_14-30-45_0001.jpg");

        let out = tmp.path().join("out");
        let (files, _) = FileManager::find_candidate_files(tmp.path(), true, Some(&out));
        assert_eq!(files, vec![tmp.path().join("a.jpg")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_reported_with_path() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "a.jpg");
        touch(tmp.path(), "locked/b.jpg");
        let locked = tmp.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (files, errors) = FileManager::find_candidate_files(tmp.path(), true, None);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(files, vec![tmp.path().join("a.jpg")]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, locked);
        assert!(errors[0].1.starts_with("scan error"));
    }

    #[test]
    fn test_check_input_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(FileManager::check_input_root(tmp.path()).is_ok());

        let missing = FileManager::check_input_root(&tmp.path().join("missing"));
        assert!(matches!(missing, Err(NormalizeError::InputRoot { .. })));

        let file = touch(tmp.path(), "file.jpg");
        assert!(FileManager::check_input_root(&file).is_err());
    }

    #[test]
    fn test_prepare_output_root_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("a").join("b");
        FileManager::prepare_output_root(&out).unwrap();
        assert!(out.is_dir());
        // The writability probe leaves nothing behind
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_output_root_rejects_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = touch(tmp.path(), "occupied");
        let result = FileManager::prepare_output_root(&file);
        assert!(matches!(result, Err(NormalizeError::OutputRoot { .. })));
    }

    #[test]
    fn test_no_clobber_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let src = touch(tmp.path(), "src.jpg");
        let dest = tmp.path().join("2024").join("copy.jpg");

        assert_eq!(FileManager::copy_no_clobber(&src, &dest).unwrap(), 4);
        assert_eq!(fs::read(&dest).unwrap(), b"data");

        // A second write to the same destination must not replace it
        assert!(FileManager::write_no_clobber(&dest, b"new").is_err());
        assert!(FileManager::copy_no_clobber(&src, &dest).is_err());
        assert_eq!(fs::read(&dest).unwrap(), b"data");

        // No temp files left behind
        assert_eq!(fs::read_dir(dest.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_copy_preserves_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        let src = touch(tmp.path(), "src.jpg");
        let dest = tmp.path().join("dest.jpg");
        FileManager::copy_no_clobber(&src, &dest).unwrap();

        let src_time = fs::metadata(&src).unwrap().modified().unwrap();
        let dest_time = fs::metadata(&dest).unwrap().modified().unwrap();
        assert_eq!(src_time, dest_time);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(512), "512 B");
        assert_eq!(FileManager::format_size(2048), "2.00 KB");
    }
}
