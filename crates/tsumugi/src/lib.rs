//! # Tsumugi
//!
//! Idempotent preparation of parallel corpora for machine translation.
//!
//! A [`Pipeline`] downloads a dataset, normalizes both sides, trains one BPE
//! model per language, and returns every sentence pair as vocabulary ids
//! wrapped in `<s>`/`</s>`. Each stage leaves its result in the data
//! directory, so later runs only read caches.
//!
//! ```rust,no_run
//! use tsumugi::{Pipeline, Side};
//!
//! # fn main() -> tsumugi::Result<()> {
//! let mut pipeline = Pipeline::new("wmt14/en-de", "/var/lib/tsumugi/wmt14", 32_000)?;
//! let (source, _target) = pipeline.load()?;
//!
//! for tokens in pipeline.sequences_to_texts(&source[..1], Side::Source)? {
//!     println!("{}", tokens.join(" "));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pipeline;

pub use config::{DEFAULT_FETCH_TIMEOUT, DEFAULT_VOCAB_SIZE, PipelineConfig};
pub use pipeline::{Pipeline, SideArtifacts, Vocabularies};

pub use tsumugi_core::{
    DatasetConfig, DatasetRegistry, EncodedSequence, FetchProgress, Progress, Result, Side,
    Transport, TsumugiError, VocabularyIndex, WMT14_EN_DE,
};
pub use tsumugi_subword::{BpeBackend, SubwordBackend};
