//! Canonical line layout for raw corpora.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{Result, TsumugiError};
use crate::store::ArtifactStore;

/// Rewrites a raw corpus in place: trailing whitespace of the whole buffer
/// removed, one sentence per line, lines separated by a single `\n` and no
/// trailing newline.
#[derive(Debug, Clone)]
pub struct CorpusNormalizer {
    store: ArtifactStore,
}

impl CorpusNormalizer {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Normalizes `path` and returns its sentences.
    ///
    /// Whitespace is stripped from the end of the buffer only; inner lines
    /// keep theirs. `\r\n` line endings are folded into `\n`. Running this on
    /// an already normalized file rewrites identical content. An empty or
    /// whitespace-only file holds one empty sentence.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::CorpusFormat`] if the file is not UTF-8 text.
    pub fn normalize(&self, path: &Path) -> Result<Vec<String>> {
        info!(path = %path.display(), "normalizing corpus");
        let bytes = fs::read(path).map_err(|e| TsumugiError::io(path, e))?;
        let text = String::from_utf8(bytes).map_err(|e| TsumugiError::CorpusFormat {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let trimmed = text.trim_end();
        let lines: Vec<String> = if trimmed.is_empty() {
            vec![String::new()]
        } else {
            trimmed.lines().map(str::to_string).collect()
        };

        let partial = self.store.partial_path(path);
        fs::write(&partial, lines.join("\n")).map_err(|e| TsumugiError::io(&partial, e))?;
        self.store.commit(&partial, path)?;

        Ok(lines)
    }
}
