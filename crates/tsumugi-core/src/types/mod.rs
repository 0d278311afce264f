pub mod corpus;
pub mod side;

pub use corpus::{CorpusFile, Stage};
pub use side::Side;

/// One sentence as vocabulary ids, bracketed by `<s>` and `</s>`.
pub type EncodedSequence = Vec<u32>;
