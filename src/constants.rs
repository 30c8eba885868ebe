pub use column_merge::merge::{
    DEFAULT_FINAL_KEY_COLUMNS, DEFAULT_FLUSH_THRESHOLD, DEFAULT_PARTIAL_KEY_COLUMNS,
};

pub const DEFAULT_DATA_DIR: &str = "../data/";
pub const RESULT_DIR_NAME: &str = "result";
pub const DEFAULT_OUTPUT_NAME: &str = "result";
pub const DEFAULT_OUTPUT_EXTENSION: &str = "tsv";

/// Discovery order of source formats; files are grouped by format in this order.
pub const SOURCE_EXTENSIONS: [&str; 3] = ["csv", "json", "xml"];
pub const GZIP_SUFFIX: &str = "gz";

pub const DEFAULT_XML_PARENT_TAG: &str = "objects";
pub const DEFAULT_XML_ELEMENT_TAG: &str = "object";
pub const DEFAULT_XML_ATTRIBUTE: &str = "name";
pub const DEFAULT_XML_VALUE_TAG: &str = "value";

pub const DEFAULT_JSON_RECORDS_KEY: &str = "fields";
