use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a single record was dropped. Never fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkipReason {
    InvalidUrl,
    DuplicateKey,
    MalformedRecord,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "InvalidUrl",
            Self::DuplicateKey => "DuplicateKey",
            Self::MalformedRecord => "MalformedRecord",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-level failure: the input as a whole is unusable.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max note length must be greater than zero")]
    InvalidMaxNoteLength,
    #[error("unknown {field} value: {value:?}")]
    UnknownValue { field: &'static str, value: String },
    #[error("invalid {field} value: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}
