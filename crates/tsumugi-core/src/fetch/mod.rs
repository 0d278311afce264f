//! # Fetcher
//!
//! Downloads dataset files into the [`ArtifactStore`] only when they are
//! missing. Bytes are streamed into a `.partial` file and renamed onto the
//! destination once the transfer is complete, so an interrupted download is
//! never mistaken for a cached one.

pub mod http;

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::dataset::DatasetConfig;
use crate::error::{Result, TsumugiError};
use crate::store::ArtifactStore;

pub use http::HttpTransport;

const CHUNK_SIZE: usize = 64 * 1024;

/// An open remote resource.
pub struct Download {
    /// Announced length in bytes, when the server provides one.
    pub total: Option<u64>,
    pub reader: Box<dyn Read>,
}

/// Source of remote bytes ("fetch bytes for URL").
pub trait Transport {
    fn open(&self, url: &str) -> Result<Download>;
}

/// Snapshot of a running transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub transferred: u64,
    pub total: Option<u64>,
}

impl Progress {
    /// Completed fraction in `[0.0, 1.0]`, if the total is known.
    #[must_use]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.transferred as f64 / total as f64).min(1.0)),
            None => None,
        }
    }
}

/// Receives transfer progress on the calling thread.
pub trait FetchProgress {
    fn started(&mut self, _url: &str, _total: Option<u64>) {}

    fn advanced(&mut self, progress: Progress);

    fn finished(&mut self, _url: &str, _bytes: u64) {}
}

/// Default reporter: a debug log line per tenth of the transfer, or per
/// 16 MiB when the size is unknown.
#[derive(Debug, Default)]
pub struct TracingProgress {
    next_report: u64,
}

const UNKNOWN_TOTAL_STEP: u64 = 16 * 1024 * 1024;

impl FetchProgress for TracingProgress {
    fn started(&mut self, url: &str, total: Option<u64>) {
        self.next_report = 0;
        debug!(url, ?total, "download started");
    }

    fn advanced(&mut self, progress: Progress) {
        if progress.transferred < self.next_report {
            return;
        }
        let step = progress
            .total
            .map(|t| (t / 10).max(1))
            .unwrap_or(UNKNOWN_TOTAL_STEP);
        self.next_report = progress.transferred + step;
        match progress.fraction() {
            Some(f) => debug!(
                transferred = progress.transferred,
                "downloaded {:.0}%",
                f * 100.0
            ),
            None => debug!(transferred = progress.transferred, "downloading"),
        }
    }

    fn finished(&mut self, url: &str, bytes: u64) {
        debug!(url, bytes, "download finished");
    }
}

/// Result of a single [`Fetcher::fetch`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed, nothing was transferred.
    Cached,
    Downloaded { bytes: u64 },
}

/// Downloads remote files into an [`ArtifactStore`] unless already present.
pub struct Fetcher {
    store: ArtifactStore,
    transport: Box<dyn Transport>,
    progress: Box<dyn FetchProgress>,
}

impl Fetcher {
    pub fn new(store: ArtifactStore, transport: Box<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            progress: Box::new(TracingProgress::default()),
        }
    }

    /// Replaces the progress reporter.
    pub fn with_progress(mut self, progress: Box<dyn FetchProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Downloads `url` to `dest` unless `dest` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::Fetch`] when the transport fails or the byte
    /// count differs from the announced length. The destination is left
    /// untouched in both cases.
    pub fn fetch(&mut self, url: &str, dest: &Path) -> Result<FetchOutcome> {
        if self.store.exists(dest) {
            debug!(path = %dest.display(), "already downloaded");
            return Ok(FetchOutcome::Cached);
        }

        info!(url, path = %dest.display(), "downloading");
        let mut download = self.transport.open(url)?;
        let partial = self.store.partial_path(dest);
        let file = File::create(&partial).map_err(|e| TsumugiError::io(&partial, e))?;
        let mut writer = BufWriter::new(file);

        self.progress.started(url, download.total);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;
        loop {
            let n = match download.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(TsumugiError::Fetch {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| TsumugiError::io(&partial, e))?;
            transferred += n as u64;
            self.progress.advanced(Progress {
                transferred,
                total: download.total,
            });
        }
        writer.flush().map_err(|e| TsumugiError::io(&partial, e))?;
        drop(writer);

        if let Some(total) = download.total {
            if total != transferred {
                return Err(TsumugiError::Fetch {
                    url: url.to_string(),
                    reason: format!("truncated transfer: got {transferred} of {total} bytes"),
                });
            }
        }

        self.store.commit(&partial, dest)?;
        self.progress.finished(url, transferred);
        Ok(FetchOutcome::Downloaded { bytes: transferred })
    }

    /// Fetches every file listed by `dataset` into `<root>/<basename(url)>`.
    pub fn fetch_all(&mut self, dataset: &DatasetConfig) -> Result<Vec<PathBuf>> {
        self.store.ensure_root()?;
        let mut paths = Vec::new();
        for file in dataset.all_files() {
            let url = dataset.url_for(file);
            let dest = self.store.resolve(basename(&url)?);
            self.fetch(&url, &dest)?;
            paths.push(dest);
        }
        Ok(paths)
    }
}

/// Last path segment of a URL.
pub fn basename(url: &str) -> Result<&str> {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(TsumugiError::Fetch {
            url: url.to_string(),
            reason: "URL has no file name".into(),
        }),
    }
}
