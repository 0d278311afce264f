//! # Tsumugi Subword
//!
//! Learns a subword vocabulary per language side and applies it to the
//! corpus. Training and segmentation run behind [`SubwordBackend`], with a
//! byte-pair-encoding implementation on top of the `tokenizers` crate.

pub mod backend;
pub mod bpe;
pub mod segment;
pub mod trainer;

pub use backend::{PieceEncoder, SubwordBackend, TrainRequest};
pub use bpe::BpeBackend;
pub use segment::Segmenter;
pub use trainer::{SubwordModel, SubwordModelTrainer};
