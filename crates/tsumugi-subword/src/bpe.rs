//! # BPE Backend
//!
//! Byte-pair encoding on top of the Hugging Face `tokenizers` crate. Words
//! are marked sentencepiece-style with a leading `▁` (Metaspace), so pieces
//! never contain spaces and the vocabulary listing stays whitespace-safe.
//!
//! Every whitespace run collapses to a single space before training and
//! encoding, and the saved model normalizes with NMT + NFKC like
//! sentencepiece's `nmt_nfkc` rule. Reserved token literals in sentence text
//! are plain characters to the encoder.
//!
//! Artifacts:
//! - `.model`: the tokenizer serialized as JSON
//! - `.vocab`: `token<TAB>score` per line, in id order

use std::fs;
use std::path::Path;

use tokenizers::decoders::DecoderWrapper;
use tokenizers::models::ModelWrapper;
use tokenizers::models::bpe::{BPE, BpeTrainerBuilder};
use tokenizers::normalizers::{NFKC, NormalizerWrapper, Nmt, Sequence};
use tokenizers::pre_tokenizers::PreTokenizerWrapper;
use tokenizers::pre_tokenizers::metaspace::Metaspace;
use tokenizers::processors::PostProcessorWrapper;
use tokenizers::{AddedToken, Tokenizer as HfTokenizer, TokenizerBuilder, TokenizerImpl};
use tracing::{debug, info};
use tsumugi_core::vocab::{SPECIAL_TOKENS, UNK_TOKEN};
use tsumugi_core::{Result, TsumugiError};

use crate::backend::{PieceEncoder, SubwordBackend, TrainRequest};

type BpeTokenizer =
    TokenizerImpl<BPE, NormalizerWrapper, PreTokenizerWrapper, PostProcessorWrapper, DecoderWrapper>;

/// A loaded model without the added-token table.
type PieceTokenizer = TokenizerImpl<
    ModelWrapper,
    NormalizerWrapper,
    PreTokenizerWrapper,
    PostProcessorWrapper,
    DecoderWrapper,
>;

/// Byte-pair-encoding backend.
#[derive(Debug, Clone)]
pub struct BpeBackend {
    min_frequency: u64,
    show_progress: bool,
}

impl Default for BpeBackend {
    fn default() -> Self {
        Self {
            min_frequency: 0,
            show_progress: false,
        }
    }
}

impl BpeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum pair count for a merge to be learned.
    pub fn with_min_frequency(mut self, min_frequency: u64) -> Self {
        self.min_frequency = min_frequency;
        self
    }

    /// Let `tokenizers` draw its own training progress bars.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    fn build_tokenizer(&self) -> Result<BpeTokenizer> {
        let model = BPE::builder()
            .unk_token(UNK_TOKEN.to_string())
            .build()
            .map_err(|e| TsumugiError::Training(e.to_string()))?;

        TokenizerBuilder::new()
            .with_model(model)
            .with_normalizer(Some(NormalizerWrapper::from(Sequence::new(vec![
                Nmt.into(),
                NFKC.into(),
            ]))))
            .with_pre_tokenizer(Some(PreTokenizerWrapper::from(Metaspace::default())))
            .with_post_processor(None::<PostProcessorWrapper>)
            .with_decoder(Some(DecoderWrapper::from(Metaspace::default())))
            .build()
            .map_err(|e| TsumugiError::Training(e.to_string()))
    }
}

impl SubwordBackend for BpeBackend {
    fn train(&self, request: &TrainRequest<'_>) -> Result<()> {
        let text = fs::read_to_string(request.corpus)
            .map_err(|e| TsumugiError::io(request.corpus, e))?;
        let sentences: Vec<String> = text.lines().map(collapse_whitespace).collect();

        let mut trainer = BpeTrainerBuilder::new()
            .vocab_size(request.vocab_size)
            .min_frequency(self.min_frequency)
            .show_progress(self.show_progress)
            .special_tokens(
                SPECIAL_TOKENS
                    .iter()
                    .map(|t| AddedToken::from(t.to_string(), true))
                    .collect(),
            )
            .build();

        let mut tokenizer = self.build_tokenizer()?;
        info!(
            corpus = %request.corpus.display(),
            sentences = sentences.len(),
            vocab_size = request.vocab_size,
            "training BPE model"
        );
        tokenizer
            .train(&mut trainer, sentences.iter())
            .map_err(|e| TsumugiError::Training(e.to_string()))?;

        tokenizer
            .save(request.model_out, false)
            .map_err(|e| TsumugiError::Training(e.to_string()))?;
        write_vocab_listing(&tokenizer, request.vocab_out)
    }

    fn load_encoder(&self, model_path: &Path) -> Result<Box<dyn PieceEncoder>> {
        debug!(path = %model_path.display(), "loading BPE model");
        let cannot_load = |e: tokenizers::Error| {
            TsumugiError::Segmentation(format!(
                "cannot load model {}: {e}",
                model_path.display()
            ))
        };
        let saved = HfTokenizer::from_file(model_path).map_err(cannot_load)?;

        // Rebuilt without added tokens so "<s>" in a sentence stays text.
        let tokenizer: PieceTokenizer = TokenizerBuilder::new()
            .with_model(saved.get_model().clone())
            .with_normalizer(saved.get_normalizer().cloned())
            .with_pre_tokenizer(saved.get_pre_tokenizer().cloned())
            .with_post_processor(None::<PostProcessorWrapper>)
            .with_decoder(None::<DecoderWrapper>)
            .build()
            .map_err(cannot_load)?;
        Ok(Box::new(BpeEncoder { tokenizer }))
    }
}

/// Collapses every whitespace run to one space and trims both ends.
fn collapse_whitespace(sentence: &str) -> String {
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Writes the learned vocabulary in id order. Ids must be contiguous from 0
/// with the reserved tokens first.
fn write_vocab_listing(tokenizer: &BpeTokenizer, path: &Path) -> Result<()> {
    let mut entries: Vec<(String, u32)> = tokenizer.get_vocab(true).into_iter().collect();
    entries.sort_by_key(|(_, id)| *id);

    let reserved = SPECIAL_TOKENS.len() as i64;
    let mut listing = String::new();
    for (position, (token, id)) in entries.iter().enumerate() {
        if *id as usize != position {
            return Err(TsumugiError::Training(format!(
                "vocabulary ids are not contiguous: expected {position}, found {id} for {token:?}"
            )));
        }
        if let Some(expected) = SPECIAL_TOKENS.get(position) {
            if token != expected {
                return Err(TsumugiError::Training(format!(
                    "reserved id {position} holds {token:?} instead of {expected:?}"
                )));
            }
        }
        if token.chars().any(char::is_whitespace) {
            return Err(TsumugiError::Training(format!(
                "piece {token:?} contains whitespace"
            )));
        }
        let score = (reserved - i64::from(*id)).min(0);
        listing.push_str(&format!("{token}\t{score}\n"));
    }

    fs::write(path, listing).map_err(|e| TsumugiError::io(path, e))
}

struct BpeEncoder {
    tokenizer: PieceTokenizer,
}

impl PieceEncoder for BpeEncoder {
    fn encode_as_pieces(&self, sentence: &str) -> Result<Vec<String>> {
        let sentence = collapse_whitespace(sentence);
        let encoding = self
            .tokenizer
            .encode(sentence.as_str(), false)
            .map_err(|e| TsumugiError::Segmentation(e.to_string()))?;
        Ok(encoding.get_tokens().to_vec())
    }
}
