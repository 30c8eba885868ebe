pub mod cli;
pub mod commands;
pub mod error;

pub mod io {
    pub mod csv_reader;
    pub mod discovery;
    pub mod json_reader;
    pub mod readers;
    pub mod tsv_writer;
    pub mod xml_reader;
}

pub mod utils {
    pub mod util;
    pub mod util_intern;
}

pub mod constants;

pub use constants::*;
