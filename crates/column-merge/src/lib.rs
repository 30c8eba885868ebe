#[cfg(feature = "logging")]
macro_rules! merge_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! merge_debug {
    ($($arg:tt)*) => {{
        if false {
            let _ = format_args!($($arg)*);
        }
    }};
}

#[cfg(feature = "logging")]
macro_rules! merge_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! merge_info {
    ($($arg:tt)*) => {{
        if false {
            let _ = format_args!($($arg)*);
        }
    }};
}

pub mod error;
pub mod merge;

pub use error::{MergeError, Result};
pub use merge::{
    alphanumeric_key, compare_columns, complete, realign, sort_columns, unify_schema, Cell,
    EngineState, KeyToken, MergeConfig, MergeEngine, MergeOutcome, MergeStats, RawRecord, Record,
    RecordStream, SchemaPlan, SchemaReconciler, SourceDescriptor,
};
