//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei file sorgente e le operazioni
//! di copia verso l'albero di destinazione.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva di tutti i file regolari sotto la radice sorgente,
//!   symlink inclusi (risolti al loro target)
//! - Normalizzazione dei percorsi relativi al separatore `/`
//! - Copia verbatim con creazione delle directory di destinazione
//! - Utilità per dimensioni file e percentuali di riduzione
//!
//! ## Percorsi relativi:
//! - Calcolati rispetto alla radice sorgente
//! - Sempre con `/` come separatore, anche su Windows
//! - Sono la stringa su cui le regole vengono valutate
//!
//! ## Esempio:
//! ```rust,ignore
//! let files = FileManager::find_source_files(Path::new("static/media"))?;
//! for file in &files {
//!     let rel = FileManager::relative_media_path(source_root, file)?;
//!     println!("{rel}");
//! }
//! ```

use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use walkdir::WalkDir;

/// Manages file discovery and destination-tree operations
pub struct FileManager;

impl FileManager {
    /// Recursively find every regular file under the source root.
    ///
    /// Directory entries are visited in name order so the discovery list is
    /// deterministic for a given tree. Symlinks are followed, so a link to
    /// a file is listed under its link path; broken links and link cycles
    /// are logged and skipped like any unreadable entry. A missing root is
    /// a fatal error.
    pub fn find_source_files(source_root: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !source_root.is_dir() {
            return Err(PipelineError::SourceMissing(source_root.to_path_buf()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(source_root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }

        Ok(files)
    }

    /// Compute the `/`-separated path of `file` relative to `source_root`.
    ///
    /// This is the string rule patterns are matched against, identical on
    /// every platform. Non-UTF8 components are replaced lossily.
    pub fn relative_media_path(source_root: &Path, file: &Path) -> Result<String, PipelineError> {
        let relative = file.strip_prefix(source_root).map_err(|_| {
            PipelineError::Validation(format!(
                "Path '{}' is outside the source root '{}'",
                file.display(),
                source_root.display()
            ))
        })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(parts.join("/"))
    }

    /// Create the parent directory of `path` if it does not exist yet
    pub async fn ensure_parent_dir(path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Copy a file byte-for-byte into the destination tree.
    ///
    /// Parent directories are created as needed. Returns the number of
    /// bytes copied.
    pub async fn copy_verbatim(source: &Path, dest: &Path) -> Result<u64, PipelineError> {
        Self::ensure_parent_dir(dest).await?;
        Ok(fs::copy(source, dest).await?)
    }

    /// Get the size of a file in bytes
    pub async fn file_size(path: &Path) -> Result<u64, PipelineError> {
        Ok(fs::metadata(path).await?.len())
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

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
