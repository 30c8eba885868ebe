mod config;
mod engine;
mod keys;
mod realign;
mod record;
mod schema;

const LOG_PREFIX: &str = "column-merge";

pub use config::{
    MergeConfig, DEFAULT_FINAL_KEY_COLUMNS, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PARTIAL_KEY_COLUMNS,
};
pub use engine::{EngineState, MergeEngine, MergeOutcome, MergeStats, RecordStream};
pub use keys::{alphanumeric_key, compare_columns, sort_columns, AlphanumericKey, KeyToken};
pub use realign::{complete, realign};
pub use record::{Cell, RawRecord, Record};
pub use schema::{
    build_descriptor, build_descriptors, unify_schema, SchemaPlan, SchemaReconciler,
    SourceDescriptor,
};
