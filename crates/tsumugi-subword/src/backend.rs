//! The contract between the pipeline and a subword algorithm.

use std::path::Path;

use tsumugi_core::Result;

/// Everything a backend needs to learn one subword model.
#[derive(Debug, Clone, Copy)]
pub struct TrainRequest<'a> {
    /// Normalized corpus, one sentence per line.
    pub corpus: &'a Path,
    pub model_out: &'a Path,
    pub vocab_out: &'a Path,
    pub vocab_size: usize,
}

/// A subword training and segmentation algorithm.
///
/// Implementations must list the vocabulary one token per line in id order,
/// with `<pad>`, `<unk>`, `<s>` and `</s>` at ids 0 to 3, and must be
/// deterministic for a given corpus and vocabulary size.
pub trait SubwordBackend {
    /// Trains a model on `request.corpus`, writing both artifacts.
    fn train(&self, request: &TrainRequest<'_>) -> Result<()>;

    /// Loads a model written by [`train`](Self::train).
    fn load_encoder(&self, model_path: &Path) -> Result<Box<dyn PieceEncoder>>;
}

/// A loaded subword model.
pub trait PieceEncoder {
    fn encode_as_pieces(&self, sentence: &str) -> Result<Vec<String>>;
}

impl<B: SubwordBackend + ?Sized> SubwordBackend for &B {
    fn train(&self, request: &TrainRequest<'_>) -> Result<()> {
        (**self).train(request)
    }

    fn load_encoder(&self, model_path: &Path) -> Result<Box<dyn PieceEncoder>> {
        (**self).load_encoder(model_path)
    }
}
