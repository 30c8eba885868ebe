use crate::{MergeError, Result};

pub const DEFAULT_FLUSH_THRESHOLD: usize = 52_000;
pub const DEFAULT_PARTIAL_KEY_COLUMNS: usize = 2;
pub const DEFAULT_FINAL_KEY_COLUMNS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConfig {
    /// Buffered record count above which a partial batch is flushed.
    pub flush_threshold: usize,
    pub partial_key_columns: usize,
    pub final_key_columns: usize,
}

impl MergeConfig {
    pub fn new(
        flush_threshold: usize,
        partial_key_columns: usize,
        final_key_columns: usize,
    ) -> Result<Self> {
        if flush_threshold == 0 {
            return Err(MergeError::message("flush-threshold must be >= 1"));
        }
        if partial_key_columns == 0 {
            return Err(MergeError::message("partial-key-columns must be >= 1"));
        }
        if final_key_columns == 0 {
            return Err(MergeError::message("final-key-columns must be >= 1"));
        }

        Ok(Self {
            flush_threshold,
            partial_key_columns,
            final_key_columns,
        })
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            partial_key_columns: DEFAULT_PARTIAL_KEY_COLUMNS,
            final_key_columns: DEFAULT_FINAL_KEY_COLUMNS,
        }
    }
}
