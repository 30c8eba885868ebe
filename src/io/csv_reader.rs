use super::readers::{open_source_reader, source_id, RecordStream, SourceReader};
use crate::utils::util::Result;
use column_merge::{Cell, MergeError};
use std::{
    io::{BufReader, Read as ioRead},
    path::{Path, PathBuf},
};

/// Comma-separated source whose first line is the header.
#[derive(Debug)]
pub struct CsvSourceReader {
    path: PathBuf,
    source_id: String,
    columns: Option<Vec<String>>,
}

impl CsvSourceReader {
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            source_id: source_id(path),
            columns: None,
        })
    }

    fn csv_reader(&self) -> Result<csv::Reader<BufReader<Box<dyn ioRead>>>> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            // Short and long rows reach the engine, which owns the shape check.
            .flexible(true)
            .from_reader(open_source_reader(&self.path)?))
    }
}

impl SourceReader for CsvSourceReader {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn discover_columns(&mut self) -> Result<Vec<String>> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let mut reader = self.csv_reader()?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        self.columns = Some(columns.clone());
        Ok(columns)
    }

    fn stream_records(&self, _hint: usize) -> Result<RecordStream> {
        let reader = self.csv_reader()?;
        let origin = self.source_id.clone();
        Ok(Box::new(reader.into_records().map(move |record| {
            record
                .map(|record| record.iter().map(Cell::present).collect())
                .map_err(|error| MergeError::read(origin.as_str(), error))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("a.csv");
        fs::write(&path, contents).expect("fixture should be written");
        (temp_dir, path)
    }

    #[test]
    fn header_and_records() {
        let (_dir, path) = fixture("D2,D1,M1\nb,1,x\na,2,y\n");
        let mut reader = CsvSourceReader::new(&path).expect("reader");
        assert_eq!(reader.source_id(), "a.csv");
        assert_eq!(
            reader.discover_columns().expect("header"),
            vec!["D2", "D1", "M1"]
        );

        let records: Vec<_> = reader
            .stream_records(3)
            .expect("stream")
            .collect::<column_merge::Result<_>>()
            .expect("records");
        assert_eq!(
            records,
            vec![
                vec![Cell::present("b"), Cell::present("1"), Cell::present("x")],
                vec![Cell::present("a"), Cell::present("2"), Cell::present("y")],
            ]
        );
    }

    #[test]
    fn ragged_rows_are_passed_through() {
        let (_dir, path) = fixture("D1,D2\n1\n1,2,3\r\n");
        let reader = CsvSourceReader::new(&path).expect("reader");
        let lengths: Vec<usize> = reader
            .stream_records(2)
            .expect("stream")
            .map(|record| record.expect("record").len())
            .collect();
        assert_eq!(lengths, vec![1, 3]);
    }

    #[test]
    fn empty_file_has_no_columns() {
        let (_dir, path) = fixture("");
        let mut reader = CsvSourceReader::new(&path).expect("reader");
        assert!(reader.discover_columns().expect("header").is_empty());
        assert_eq!(reader.stream_records(0).expect("stream").count(), 0);
    }

    #[test]
    fn empty_cells_are_present() {
        let (_dir, path) = fixture("D1,M1\n,x\n");
        let reader = CsvSourceReader::new(&path).expect("reader");
        let record = reader
            .stream_records(2)
            .expect("stream")
            .next()
            .expect("one record")
            .expect("valid record");
        assert_eq!(record, vec![Cell::present(""), Cell::present("x")]);
    }
}
