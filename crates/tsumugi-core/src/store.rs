//! # Artifact Store
//!
//! Maps logical dataset file names onto a local data directory and decides
//! whether an artifact is already produced. Every cached artifact becomes
//! visible through [`ArtifactStore::commit`], an atomic rename from a
//! `.partial` sibling, so a file at its final path is always complete.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TsumugiError};

const PARTIAL_SUFFIX: &str = ".partial";

/// Local directory holding downloads and derived artifacts for one dataset.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the data directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| TsumugiError::io(&self.root, e))
    }

    /// Joins a logical file name onto the data directory.
    #[must_use]
    pub fn resolve(&self, logical_name: &str) -> PathBuf {
        self.root.join(logical_name)
    }

    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// A regular, non-empty file.
    #[must_use]
    pub fn is_complete(&self, path: &Path) -> bool {
        fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    /// Sibling path an artifact is written to before it is committed.
    #[must_use]
    pub fn partial_path(&self, path: &Path) -> PathBuf {
        with_suffix(path, PARTIAL_SUFFIX)
    }

    /// Atomically moves a finished partial file onto its final path.
    pub fn commit(&self, partial: &Path, path: &Path) -> Result<()> {
        fs::rename(partial, path).map_err(|e| TsumugiError::io(path, e))
    }
}

/// Appends `suffix` to the full file name: `train.en` + `.segmented`
/// gives `train.en.segmented`.
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
