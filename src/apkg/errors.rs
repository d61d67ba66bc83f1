//! Decode error types

use thiserror::Error;

use super::progress::Stage;

/// Fatal errors that abort an `.apkg` decode
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Archive is corrupt ({stage}): {summary}: {detail}")]
    ArchiveCorrupt {
        stage: Stage,
        summary: String,
        detail: String,
    },

    #[error("No collection database found in package (expected {current} or {legacy})")]
    StoreNotFound {
        current: &'static str,
        legacy: &'static str,
    },

    #[error("Failed to read collection database {entry}: {summary}: {detail}")]
    StoreQueryFailed {
        entry: String,
        summary: String,
        detail: String,
    },

    #[error("Decode cancelled during {0}")]
    Cancelled(Stage),

    #[error("IO error ({stage}) on {target}: {source}")]
    Io {
        stage: Stage,
        target: String,
        #[source]
        source: std::io::Error,
    },
}

impl DecodeError {
    pub(crate) fn corrupt(stage: Stage, summary: impl Into<String>, err: impl ToString) -> Self {
        Self::ArchiveCorrupt {
            stage,
            summary: summary.into(),
            detail: err.to_string(),
        }
    }

    pub(crate) fn io(stage: Stage, target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            target: target.into(),
            source,
        }
    }

    pub(crate) fn query(entry: &str, summary: impl Into<String>, err: impl ToString) -> Self {
        Self::StoreQueryFailed {
            entry: entry.to_string(),
            summary: summary.into(),
            detail: err.to_string(),
        }
    }
}

impl From<DecodeError> for String {
    fn from(err: DecodeError) -> Self {
        err.to_string()
    }
}

/// Result type alias for decode operations
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Non-fatal problems absorbed during a decode.
///
/// The affected feature degrades (no schema names, no media) and the deck is
/// still returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    SchemaParseFailed { entry: String, detail: String },
    MediaIndexParseFailed { detail: String },
}

impl std::fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaParseFailed { entry, detail } => write!(
                f,
                "Note type definitions in {} could not be read, using generic field names ({})",
                entry, detail
            ),
            Self::MediaIndexParseFailed { detail } => write!(
                f,
                "Media index could not be read, media will be unavailable ({})",
                detail
            ),
        }
    }
}
