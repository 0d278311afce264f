//! # Sequence Codec
//!
//! Converts whitespace-joined piece lines into id sequences and back.
//!
//! Encoding substitutes the id of `<unk>` looked up by name, while decoding
//! falls back to whatever token sits at the literal id 1. Both agree for
//! vocabularies produced by the subword trainer, which pins `<unk>` to id 1.

use crate::types::EncodedSequence;
use crate::vocab::{BOS_TOKEN, EOS_TOKEN, UNK_ID, VocabularyIndex};

/// Piece/id conversion against one side's vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct SequenceCodec<'a> {
    vocab: &'a VocabularyIndex,
}

impl<'a> SequenceCodec<'a> {
    pub fn new(vocab: &'a VocabularyIndex) -> Self {
        Self { vocab }
    }

    /// Encodes one piece line as `<s> pieces... </s>`.
    #[must_use]
    pub fn encode_line(&self, pieces: &str) -> EncodedSequence {
        let unk = self.vocab.unk_id();
        std::iter::once(BOS_TOKEN)
            .chain(pieces.split_whitespace())
            .chain(std::iter::once(EOS_TOKEN))
            .map(|token| self.vocab.token_to_id(token).unwrap_or(unk))
            .collect()
    }

    /// Encodes every piece line.
    pub fn encode<S: AsRef<str>>(&self, piece_lines: &[S]) -> Vec<EncodedSequence> {
        piece_lines
            .iter()
            .map(|line| self.encode_line(line.as_ref()))
            .collect()
    }

    /// Maps ids back to tokens, boundary markers included.
    #[must_use]
    pub fn decode_sequence(&self, sequence: &[u32]) -> Vec<String> {
        sequence
            .iter()
            .map(|&id| {
                self.vocab
                    .id_to_token(id)
                    .or_else(|| self.vocab.id_to_token(UNK_ID))
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    pub fn decode(&self, sequences: &[EncodedSequence]) -> Vec<Vec<String>> {
        sequences
            .iter()
            .map(|sequence| self.decode_sequence(sequence))
            .collect()
    }
}
