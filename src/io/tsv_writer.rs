use crate::{error::TabmergeError, utils::util::Result};
use column_merge::Record;
use std::{
    collections::HashMap,
    fmt,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Destination of the merged table.
pub trait OutputSink {
    fn path(&self) -> &Path;

    /// Creates (or truncates) the output and writes the unified header.
    fn write_header(&mut self, columns: &[String]) -> Result<()>;

    /// Appends a sorted batch. Called once per partial flush and once for the
    /// final batch; an empty batch writes nothing.
    fn append_batch(&mut self, records: &[Record]) -> Result<()>;
}

pub type WriterConstructor = Box<dyn Fn(&Path) -> Result<Box<dyn OutputSink>>>;

/// Output sinks keyed by file extension.
pub struct WriterRegistry {
    formats: HashMap<String, WriterConstructor>,
}

impl WriterRegistry {
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, constructor: WriterConstructor) {
        self.formats
            .insert(extension.to_ascii_lowercase(), constructor);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.formats.contains_key(&extension.to_ascii_lowercase())
    }

    /// Sink for `<result_dir>/<file_name>.<extension>`. Nothing is created on disk
    /// until the header is written.
    pub fn open(
        &self,
        result_dir: &Path,
        file_name: &str,
        extension: &str,
    ) -> Result<Box<dyn OutputSink>> {
        let extension = extension.to_ascii_lowercase();
        let constructor = self
            .formats
            .get(&extension)
            .ok_or_else(|| TabmergeError::unsupported(extension.as_str()))?;
        constructor(&output_path(result_dir, file_name, &extension))
    }
}

impl Default for WriterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("tsv", Box::new(open_tsv));
        registry
    }
}

fn open_tsv(path: &Path) -> Result<Box<dyn OutputSink>> {
    Ok(Box::new(TsvWriter::new(path)))
}

impl fmt::Debug for WriterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        formats.sort_unstable();
        f.debug_struct("WriterRegistry")
            .field("formats", &formats)
            .finish()
    }
}

pub fn output_path(result_dir: &Path, file_name: &str, extension: &str) -> PathBuf {
    result_dir.join(format!("{file_name}.{extension}"))
}

/// Tab-separated output. Header cells are joined by tabs and end the line;
/// every record cell is followed by a tab, absent cells write nothing, and
/// records are separated by newlines with none after the last record.
#[derive(Debug)]
pub struct TsvWriter {
    path: PathBuf,
    records_written: usize,
}

impl TsvWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            records_written: 0,
        }
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    fn create_result_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| TabmergeError::ResultDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

impl OutputSink for TsvWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.create_result_dir()?;
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writeln!(writer, "{}", columns.join("\t"))?;
        writer.flush()?;
        self.records_written = 0;
        log::debug!("Wrote header of {} columns to {}", columns.len(), self.path.display());
        Ok(())
    }

    fn append_batch(&mut self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for record in records {
            if self.records_written > 0 {
                writer.write_all(b"\n")?;
            }
            for cell in record {
                write!(writer, "{cell}\t")?;
            }
            self.records_written += 1;
        }
        writer.flush()?;
        Ok(())
    }
}
