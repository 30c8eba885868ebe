use super::readers::{open_source_reader, source_id, RecordStream, SourceReader};
use crate::{constants::DEFAULT_JSON_RECORDS_KEY, utils::util::Result};
use column_merge::{Cell, MergeError, RawRecord};
use serde::{
    de::{DeserializeOwned, IgnoredAny},
    Deserialize,
};
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader, Read as ioRead},
    path::{Path, PathBuf},
};

/// JSON source shaped as `{"fields": [{"D1": "1", "M1": "x"}, ...]}`.
///
/// The key order of the first object is the header. Objects are pulled off
/// the array one at a time, so the whole document is never held in memory.
#[derive(Debug)]
pub struct JsonSourceReader {
    path: PathBuf,
    source_id: String,
    records_key: String,
    columns: Option<Vec<String>>,
}

impl JsonSourceReader {
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_records_key(path, DEFAULT_JSON_RECORDS_KEY)
    }

    pub fn with_records_key(path: &Path, records_key: &str) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            source_id: source_id(path),
            records_key: records_key.to_string(),
            columns: None,
        })
    }

    fn open_records(&self) -> Result<JsonCursor<BufReader<Box<dyn ioRead>>>> {
        let mut cursor = JsonCursor::new(open_source_reader(&self.path)?, &self.source_id);
        if !cursor.seek_array(&self.records_key)? {
            return Err(crate::tabmerge_error!(
                "{}: no '{}' array in the top-level object",
                self.source_id,
                self.records_key
            ));
        }
        Ok(cursor)
    }

    fn read_columns(&self) -> Result<Vec<String>> {
        let mut cursor = self.open_records()?;
        Ok(cursor
            .next_object()?
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default())
    }
}

impl SourceReader for JsonSourceReader {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn discover_columns(&mut self) -> Result<Vec<String>> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let columns = self.read_columns()?;
        self.columns = Some(columns.clone());
        Ok(columns)
    }

    fn stream_records(&self, hint: usize) -> Result<RecordStream> {
        let columns = match &self.columns {
            Some(columns) => columns.clone(),
            None => self.read_columns()?,
        };
        Ok(Box::new(JsonRecords {
            cursor: self.open_records()?,
            positions: columns
                .iter()
                .enumerate()
                .map(|(index, column)| (column.clone(), index))
                .collect(),
            width: columns.len().max(hint),
            columns: columns.len(),
        }))
    }
}

/// Each object is projected onto the header order. Missing keys and `null`
/// become absent cells; a key outside the header is a read error.
struct JsonRecords<R> {
    cursor: JsonCursor<R>,
    positions: HashMap<String, usize>,
    width: usize,
    columns: usize,
}

impl<R: BufRead> JsonRecords<R> {
    fn project(&self, object: Map<String, Value>) -> column_merge::Result<RawRecord> {
        let mut cells = Vec::with_capacity(self.width);
        cells.resize(self.columns, Cell::Absent);
        for (key, value) in object {
            let index = self.positions.get(&key).copied().ok_or_else(|| {
                MergeError::read(
                    self.cursor.origin.as_str(),
                    format!("key '{key}' is not part of the header"),
                )
            })?;
            cells[index] = value_to_cell(value);
        }
        Ok(cells)
    }
}

impl<R: BufRead> Iterator for JsonRecords<R> {
    type Item = column_merge::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next_object() {
            Ok(None) => None,
            Ok(Some(object)) => Some(self.project(object)),
            Err(error) => {
                self.cursor.done = true;
                Some(Err(MergeError::read(self.cursor.origin.as_str(), error)))
            }
        }
    }
}

fn value_to_cell(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Absent,
        Value::String(text) => Cell::Present(text),
        other => Cell::Present(other.to_string()),
    }
}

/// Byte-level walker over the outer document. Every nested value it hands to
/// serde_json ends on a closing delimiter, so the deserializer never needs to
/// consume a byte past the value. Bare numbers are skipped by hand.
struct JsonCursor<R> {
    reader: R,
    origin: String,
    started: bool,
    done: bool,
}

impl<R: BufRead> JsonCursor<R> {
    fn new(reader: R, origin: &str) -> Self {
        Self {
            reader,
            origin: origin.to_string(),
            started: false,
            done: false,
        }
    }

    fn peek(&mut self) -> Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    fn bump(&mut self) {
        self.reader.consume(1);
    }

    fn skip_whitespace(&mut self) -> Result<Option<u8>> {
        loop {
            match self.peek()? {
                Some(byte) if byte.is_ascii_whitespace() => self.bump(),
                other => return Ok(other),
            }
        }
    }

    fn expect(&mut self, wanted: u8) -> Result<()> {
        match self.skip_whitespace()? {
            Some(byte) if byte == wanted => {
                self.bump();
                Ok(())
            }
            found => Err(self.unexpected(&format!("'{}'", wanted as char), found)),
        }
    }

    fn unexpected(&self, wanted: &str, found: Option<u8>) -> crate::error::TabmergeError {
        match found {
            Some(byte) => crate::tabmerge_error!(
                "{}: expected {wanted}, found '{}'",
                self.origin,
                byte as char
            ),
            None => crate::tabmerge_error!(
                "{}: expected {wanted}, found end of file",
                self.origin
            ),
        }
    }

    fn deserialize<T: DeserializeOwned>(&mut self) -> Result<T> {
        let mut deserializer = serde_json::Deserializer::from_reader(&mut self.reader);
        Ok(<T as Deserialize>::deserialize(&mut deserializer)?)
    }

    fn skip_value(&mut self) -> Result<()> {
        match self.skip_whitespace()? {
            Some(b'{' | b'[' | b'"' | b't' | b'f' | b'n') => {
                self.deserialize::<IgnoredAny>()?;
            }
            Some(byte) if byte == b'-' || byte.is_ascii_digit() => {
                while let Some(byte) = self.peek()? {
                    if !matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                        break;
                    }
                    self.bump();
                }
            }
            found => return Err(self.unexpected("a value", found)),
        }
        Ok(())
    }

    /// Walks the top-level object up to the opening bracket of `key`.
    /// Returns false when the object has no such key.
    fn seek_array(&mut self, key: &str) -> Result<bool> {
        self.expect(b'{')?;
        loop {
            match self.skip_whitespace()? {
                Some(b'}') => return Ok(false),
                Some(b',') => {
                    self.bump();
                    continue;
                }
                Some(b'"') => {}
                found => return Err(self.unexpected("an object key", found)),
            }
            let name: String = self.deserialize()?;
            self.expect(b':')?;
            if name == key {
                self.expect(b'[')?;
                return Ok(true);
            }
            self.skip_value()?;
        }
    }

    fn next_object(&mut self) -> Result<Option<Map<String, Value>>> {
        if self.done {
            return Ok(None);
        }
        let mut next = self.skip_whitespace()?;
        if self.started {
            match next {
                Some(b',') => {
                    self.bump();
                    next = self.skip_whitespace()?;
                }
                Some(b']') => {
                    self.bump();
                    self.done = true;
                    return Ok(None);
                }
                found => return Err(self.unexpected("',' or ']'", found)),
            }
        } else if next == Some(b']') {
            self.bump();
            self.done = true;
            return Ok(None);
        }
        self.started = true;
        match next {
            Some(b'{') => Ok(Some(self.deserialize()?)),
            found => Err(self.unexpected("an object", found)),
        }
    }
}
