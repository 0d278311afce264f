use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::side::Side;

/// Processing stage a corpus file has reached.
///
/// Stages only move forward: a raw download is normalized in place, and the
/// segmented form lives in a separate cache file next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Raw,
    Normalized,
    Segmented,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Normalized => write!(f, "normalized"),
            Self::Segmented => write!(f, "segmented"),
        }
    }
}

/// A corpus file on disk together with its language side and stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub path: PathBuf,
    pub side: Side,
    pub stage: Stage,
}

impl CorpusFile {
    /// A freshly downloaded file.
    #[must_use]
    pub fn raw(path: impl Into<PathBuf>, side: Side) -> Self {
        Self {
            path: path.into(),
            side,
            stage: Stage::Raw,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks the file as having reached `stage`. Earlier stages are ignored.
    pub fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }
}
