use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while preparing a parallel corpus.
#[derive(Debug, Error)]
pub enum TsumugiError {
    /// The requested dataset name is not present in the registry.
    #[error("unknown dataset: {name:?}")]
    UnknownDataset {
        /// The name that failed to resolve.
        name: String,
    },

    /// A download failed or was truncated.
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The remote resource.
        url: String,
        /// Transport or integrity failure description.
        reason: String,
    },

    /// A corpus file could not be decoded as text.
    #[error("malformed corpus {}: {reason}", path.display())]
    CorpusFormat { path: PathBuf, reason: String },

    /// A vocabulary listing is empty or malformed.
    #[error("malformed vocabulary {}: {reason}", path.display())]
    VocabFormat { path: PathBuf, reason: String },

    /// A side selector other than `source` or `target` was given.
    #[error("invalid mode {0:?}, expected \"source\" or \"target\"")]
    InvalidMode(String),

    /// The subword trainer failed or produced an inconsistent vocabulary.
    #[error("subword training error: {0}")]
    Training(String),

    /// Applying a subword model to a sentence failed.
    #[error("segmentation error: {0}")]
    Segmentation(String),

    /// Invalid pipeline or registry configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Sequences were decoded before the vocabularies were loaded.
    #[error("vocabularies are not loaded, run the pipeline first")]
    NotLoaded,

    /// Filesystem failure with the offending path.
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TsumugiError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for Tsumugi operations.
pub type Result<T> = std::result::Result<T, TsumugiError>;
