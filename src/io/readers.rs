use super::{csv_reader::CsvSourceReader, json_reader::JsonSourceReader, xml_reader::XmlSourceReader};
use crate::{constants::GZIP_SUFFIX, error::TabmergeError, utils::util::Result};
use flate2::read::MultiGzDecoder;
use std::{
    collections::HashMap,
    fmt,
    fs::File,
    io::{BufReader, Read as ioRead},
    path::Path,
};

pub type RecordStream = column_merge::RecordStream<'static>;

/// One input file of a supported format.
///
/// Header discovery reads only the first structural unit of the file and
/// trusts it to be representative. Every call opens its own handle, which is
/// released when the call (or the returned stream) is done with it.
pub trait SourceReader {
    /// File name, used to tag log lines and errors.
    fn source_id(&self) -> &str;

    fn discover_columns(&mut self) -> Result<Vec<String>>;

    /// Lazy records in raw column order. `hint` is the expected cell count per
    /// record; formats that do not need it ignore it.
    fn stream_records(&self, hint: usize) -> Result<RecordStream>;
}

pub type ReaderConstructor = Box<dyn Fn(&Path) -> Result<Box<dyn SourceReader>>>;

/// Source readers keyed by file extension (without the dot).
pub struct ReaderRegistry {
    formats: HashMap<String, ReaderConstructor>,
}

impl ReaderRegistry {
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, constructor: ReaderConstructor) {
        self.formats
            .insert(extension.to_ascii_lowercase(), constructor);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.formats.contains_key(&extension.to_ascii_lowercase())
    }

    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn open(&self, path: &Path) -> Result<Box<dyn SourceReader>> {
        let (extension, _) = format_tag(path);
        let constructor = self
            .formats
            .get(&extension)
            .ok_or_else(|| TabmergeError::unsupported(extension.as_str()))?;
        log::trace!("Opening {} with the '{}' reader", path.display(), extension);
        constructor(path)
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("csv", Box::new(open_csv));
        registry.register("json", Box::new(open_json));
        registry.register("xml", Box::new(open_xml));
        registry
    }
}

fn open_csv(path: &Path) -> Result<Box<dyn SourceReader>> {
    Ok(Box::new(CsvSourceReader::new(path)?))
}

fn open_json(path: &Path) -> Result<Box<dyn SourceReader>> {
    Ok(Box::new(JsonSourceReader::new(path)?))
}

fn open_xml(path: &Path) -> Result<Box<dyn SourceReader>> {
    Ok(Box::new(XmlSourceReader::new(path)?))
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("formats", &self.extensions())
            .finish()
    }
}

/// Lowercased format extension of `path` and whether it carries a `.gz` suffix.
///
/// `data/a.CSV` gives `("csv", false)`, `data/a.json.gz` gives `("json", true)`.
pub fn format_tag(path: &Path) -> (String, bool) {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    let gz_suffix = format!(".{GZIP_SUFFIX}");
    let (stem, is_gzipped) = match name.strip_suffix(gz_suffix.as_str()) {
        Some(stem) => (stem.to_string(), true),
        None => (name, false),
    };
    let extension = stem
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_string())
        .unwrap_or_default();
    (extension, is_gzipped)
}

pub fn source_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Buffered reader over a source file, transparently gunzipping `*.gz`.
pub fn open_source_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    let file = File::open(path).map_err(|error| {
        crate::tabmerge_error!("Failed to open file {}: {error}", path.display())
    })?;
    let (_, is_gzipped) = format_tag(path);
    if is_gzipped {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(crate::tabmerge_error!(
                "Invalid gzip header: {}",
                path.display()
            ))
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::{io::Write, path::PathBuf};

    #[test]
    fn format_tag_strips_gzip_suffix() {
        assert_eq!(format_tag(Path::new("data/a.csv")), ("csv".to_string(), false));
        assert_eq!(format_tag(Path::new("data/b.JSON")), ("json".to_string(), false));
        assert_eq!(format_tag(Path::new("c.xml.gz")), ("xml".to_string(), true));
        assert_eq!(format_tag(Path::new("README")), (String::new(), false));
    }

    #[test]
    fn registry_rejects_unknown_extensions() {
        let registry = ReaderRegistry::default();
        assert_eq!(registry.extensions(), vec!["csv", "json", "xml"]);
        assert!(registry.supports("CSV"));

        let error = registry
            .open(&PathBuf::from("notes.yaml"))
            .err()
            .expect("yaml should not be supported");
        assert!(matches!(
            error,
            TabmergeError::UnsupportedFormat { ref extension } if extension == "yaml"
        ));
    }

    #[test]
    fn registry_accepts_custom_formats() {
        let mut registry = ReaderRegistry::empty();
        assert!(!registry.supports("csv"));
        registry.register(
            "txt",
            Box::new(|path: &Path| -> Result<Box<dyn SourceReader>> {
                Ok(Box::new(CsvSourceReader::new(path)?))
            }),
        );

        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("table.txt");
        std::fs::write(&path, "D1,D2\n1,2\n").expect("fixture should be written");
        let mut reader = registry.open(&path).expect("txt reader should open");
        assert_eq!(reader.source_id(), "table.txt");
        assert_eq!(reader.discover_columns().expect("header"), vec!["D1", "D2"]);
    }

    #[test]
    fn open_source_reader_gunzips() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("a.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"D1\n7\n").expect("gzip write");
        std::fs::write(&path, encoder.finish().expect("gzip finish")).expect("fixture");

        let mut contents = String::new();
        open_source_reader(&path)
            .expect("gzip source should open")
            .read_to_string(&mut contents)
            .expect("gzip source should decode");
        assert_eq!(contents, "D1\n7\n");
    }

    #[test]
    fn open_source_reader_rejects_bad_gzip() {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("a.csv.gz");
        std::fs::write(&path, "D1\n7\n").expect("fixture");
        let error = open_source_reader(&path)
            .err()
            .expect("plain text is not gzip");
        assert!(error.to_string().contains("Invalid gzip header"));
    }
}
