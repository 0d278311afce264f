//! # Segmenter
//!
//! Applies a subword model to every sentence of a corpus and caches the
//! space-joined pieces, one sentence per line. Results are streamed into a
//! `.partial` file while encoding and renamed into place at the end.
//!
//! A cache is trusted when its line count matches the corpus. It is not
//! checked against the model or the sentence contents: replacing a corpus
//! with another of the same length requires deleting the cache by hand.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, info, warn};
use tsumugi_core::{ArtifactStore, Result, TsumugiError};

use crate::backend::SubwordBackend;

const LOG_EVERY: usize = 100_000;

pub struct Segmenter<'a, B: ?Sized> {
    backend: &'a B,
    store: &'a ArtifactStore,
}

impl<'a, B: SubwordBackend + ?Sized> Segmenter<'a, B> {
    pub fn new(backend: &'a B, store: &'a ArtifactStore) -> Self {
        Self { backend, store }
    }

    /// Segments `lines` with the model at `model_path`, or returns the cached
    /// result from `cache_path`.
    pub fn segment<S: AsRef<str>>(
        &self,
        lines: &[S],
        model_path: &Path,
        cache_path: &Path,
    ) -> Result<Vec<String>> {
        if self.store.exists(cache_path) {
            let cached = read_cache(cache_path)?;
            if cached.len() == lines.len() {
                info!(path = %cache_path.display(), "segmented corpus exists, loading");
                return Ok(cached);
            }
            warn!(
                path = %cache_path.display(),
                expected = lines.len(),
                found = cached.len(),
                "segmented corpus does not match the corpus length, segmenting again"
            );
        }

        info!(path = %cache_path.display(), sentences = lines.len(), "segmenting corpus");
        let encoder = self.backend.load_encoder(model_path)?;
        let partial = self.store.partial_path(cache_path);
        let file = File::create(&partial).map_err(|e| TsumugiError::io(&partial, e))?;
        let mut writer = BufWriter::new(file);

        let mut sequences = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            let joined = encoder.encode_as_pieces(line.as_ref())?.join(" ");
            writeln!(writer, "{joined}").map_err(|e| TsumugiError::io(&partial, e))?;
            sequences.push(joined);

            if (i + 1) % LOG_EVERY == 0 {
                debug!(done = i + 1, total = lines.len(), "segmenting");
            }
        }
        writer.flush().map_err(|e| TsumugiError::io(&partial, e))?;
        drop(writer);

        self.store.commit(&partial, cache_path)?;
        Ok(sequences)
    }
}

fn read_cache(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => TsumugiError::CorpusFormat {
            path: path.to_path_buf(),
            reason: "segmented corpus is not valid UTF-8".into(),
        },
        _ => TsumugiError::io(path, e),
    })?;
    Ok(text.lines().map(str::to_string).collect())
}
