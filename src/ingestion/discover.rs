//! Recursive discovery of dataset files.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{IngestionError, IngestionResult};

/// Extensions recognised as datasets (compared case-insensitively).
pub const DATASET_EXTENSIONS: [&str; 4] = ["csv", "json", "ndjson", "parquet"];

/// List every dataset file under `base_dir`, recursively, sorted by path.
///
/// Symlinks are not followed and unreadable entries are skipped. A missing `base_dir` is an
/// [`IngestionError::Io`] error.
pub fn list_datasets(base_dir: impl AsRef<Path>) -> IngestionResult<Vec<PathBuf>> {
    let base_dir = base_dir.as_ref();
    if !base_dir.is_dir() {
        return Err(IngestionError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset directory not found: {}", base_dir.display()),
        )));
    }

    let mut found: Vec<PathBuf> = WalkDir::new(base_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_dataset(p))
        .collect();
    found.sort();
    Ok(found)
}

fn is_dataset(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DATASET_EXTENSIONS.iter().any(|d| d.eq_ignore_ascii_case(ext)))
}
