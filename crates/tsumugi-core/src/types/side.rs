use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TsumugiError;

/// One of the two language streams of a parallel corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    /// Both sides in pipeline order.
    pub const BOTH: [Side; 2] = [Side::Source, Side::Target];

    /// Position of this side's file in a dataset's `train_files`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Source => 0,
            Self::Target => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = TsumugiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Self::Source),
            "target" => Ok(Self::Target),
            other => Err(TsumugiError::InvalidMode(other.to_string())),
        }
    }
}
