//! # Vocabulary Index
//!
//! Bidirectional token/id mapping loaded from a vocabulary listing. The
//! listing has one entry per line; the first whitespace-delimited field is
//! the token and the 0-based line number is its id.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TsumugiError};

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const BOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";

pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;
pub const BOS_ID: u32 = 2;
pub const EOS_ID: u32 = 3;

/// Reserved tokens in id order. Every subword model must assign these
/// exactly ids 0 to 3.
pub const SPECIAL_TOKENS: [&str; 4] = [PAD_TOKEN, UNK_TOKEN, BOS_TOKEN, EOS_TOKEN];

/// Token to id and id to token mapping for one language side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyIndex {
    token2idx: HashMap<String, u32>,
    idx2token: Vec<String>,
}

impl VocabularyIndex {
    /// Loads a vocabulary listing.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::VocabFormat`] if the file is empty, a line has
    /// no token, a token is listed twice, or `<unk>` is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => TsumugiError::VocabFormat {
                path: path.to_path_buf(),
                reason: "not valid UTF-8".into(),
            },
            _ => TsumugiError::io(path, e),
        })?;

        let mut tokens = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let token = line
                .split_whitespace()
                .next()
                .ok_or_else(|| format_error(path, format!("line {} has no token", line_no + 1)))?;
            tokens.push(token);
        }

        Self::build(tokens, path)
    }

    /// Builds an index from tokens listed in id order.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owned: Vec<S> = tokens.into_iter().collect();
        Self::build(owned.iter().map(|s| s.as_ref()), Path::new("<memory>"))
    }

    fn build<'a>(tokens: impl IntoIterator<Item = &'a str>, path: &Path) -> Result<Self> {
        let mut token2idx = HashMap::new();
        let mut idx2token = Vec::new();

        for token in tokens {
            let id = u32::try_from(idx2token.len())
                .map_err(|_| format_error(path, "more entries than fit in u32 ids".into()))?;
            if token2idx.insert(token.to_string(), id).is_some() {
                return Err(format_error(
                    path,
                    format!("token {token:?} is listed more than once"),
                ));
            }
            idx2token.push(token.to_string());
        }

        if idx2token.is_empty() {
            return Err(format_error(path, "vocabulary is empty".into()));
        }
        if !token2idx.contains_key(UNK_TOKEN) {
            return Err(format_error(path, format!("missing {UNK_TOKEN} entry")));
        }
        if idx2token.len() <= UNK_ID as usize {
            return Err(format_error(path, "reserved ids are not all present".into()));
        }

        Ok(Self {
            token2idx,
            idx2token,
        })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.idx2token.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.idx2token.is_empty()
    }

    #[must_use]
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.token2idx.get(token).copied()
    }

    #[must_use]
    pub fn id_to_token(&self, id: u32) -> Option<&str> {
        self.idx2token.get(id as usize).map(String::as_str)
    }

    /// Id of the `<unk>` entry, looked up by name.
    #[must_use]
    pub fn unk_id(&self) -> u32 {
        self.token2idx[UNK_TOKEN]
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.idx2token.iter().map(String::as_str)
    }
}

fn format_error(path: &Path, reason: String) -> TsumugiError {
    TsumugiError::VocabFormat {
        path: PathBuf::from(path),
        reason,
    }
}
