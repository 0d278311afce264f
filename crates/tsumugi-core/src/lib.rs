//! # Tsumugi Core
//!
//! Building blocks of the parallel-corpus preparation pipeline: the artifact
//! store that every stage consults before doing work, the downloader, corpus
//! normalization, vocabulary loading and the piece/id codec.
//!
//! ## Quick Start
//!
//! ```rust
//! use tsumugi_core::{SequenceCodec, VocabularyIndex};
//!
//! let vocab = VocabularyIndex::from_tokens(["<pad>", "<unk>", "<s>", "</s>", "▁hello"]).unwrap();
//! let codec = SequenceCodec::new(&vocab);
//!
//! assert_eq!(codec.encode_line("▁hello ▁world"), vec![2, 4, 1, 3]);
//! ```
pub mod codec;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod store;
pub mod types;
pub mod vocab;

// Re-export primary API
pub use codec::SequenceCodec;
pub use dataset::{DatasetConfig, DatasetRegistry, WMT14_EN_DE};
pub use error::{Result, TsumugiError};
pub use fetch::{
    FetchOutcome, FetchProgress, Fetcher, HttpTransport, Progress, TracingProgress, Transport,
};
pub use normalize::CorpusNormalizer;
pub use store::ArtifactStore;
pub use types::{CorpusFile, EncodedSequence, Side, Stage};
pub use vocab::VocabularyIndex;
