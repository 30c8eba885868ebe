use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Malformed record in {source_id}: expected {expected} cells, found {found}")]
    MalformedRecord {
        source_id: String,
        expected: usize,
        found: usize,
    },
    #[error(
        "Presence bitmap of {source_id} marks {expected} columns but the record has {found} cells"
    )]
    PresenceMismatch {
        source_id: String,
        expected: usize,
        found: usize,
    },
    #[error("Column '{column}' appears more than once in the header of {source_id}")]
    DuplicateColumn { source_id: String, column: String },
    #[error("No columns found in the header of {source_id}")]
    EmptyHeader { source_id: String },
    #[error("No sources left to merge")]
    NoSources,
    #[error("Expected {expected} record streams (one per source), got {found}")]
    SourceCountMismatch { expected: usize, found: usize },
    #[error("Failed to read a record from {origin}: {message}")]
    Read { origin: String, message: String },
}

impl MergeError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn read(origin: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Read {
            origin: origin.into(),
            message: error.to_string(),
        }
    }

    /// Record-shape violations, which must halt a run instead of being skipped.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::PresenceMismatch { .. }
        )
    }
}
