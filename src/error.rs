use column_merge::MergeError;
use std::path::PathBuf;
use thiserror::Error;

pub type TabmergeResult<T> = std::result::Result<T, TabmergeError>;

#[derive(Debug, Error)]
pub enum TabmergeError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("The extension '{extension}' is not supported")]
    UnsupportedFormat { extension: String },
    #[error("Failed to create result directory {}: {source}", path.display())]
    ResultDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("There are no .csv, .json or .xml files in {}", dir.display())]
    NoSourceFiles { dir: PathBuf },
}

impl TabmergeError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn unsupported(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Record-shape violations end the process; everything else returns to the menu.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Merge(error) if error.is_integrity())
    }
}

#[macro_export]
macro_rules! tabmerge_error {
    ($($arg:tt)*) => {
        $crate::error::TabmergeError::message(format!($($arg)*))
    };
}
