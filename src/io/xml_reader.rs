use super::readers::{open_source_reader, source_id, RecordStream, SourceReader};
use crate::{
    constants::{
        DEFAULT_XML_ATTRIBUTE, DEFAULT_XML_ELEMENT_TAG, DEFAULT_XML_PARENT_TAG,
        DEFAULT_XML_VALUE_TAG,
    },
    utils::util::Result,
};
use column_merge::{Cell, MergeError, RawRecord};
use quick_xml::{
    events::{BytesStart, Event},
    reader::Reader,
};
use std::{
    io::{BufReader, Read as ioRead},
    path::{Path, PathBuf},
};

/// Tag names of an XML source:
///
/// ```xml
/// <objects>
///   <object name="D1"><value>1</value></object>
///   <object name="M1"><value>x</value></object>
/// </objects>
/// ```
///
/// Each `objects` element is one record, each `object` one cell, and the
/// `name` attributes of the first record make up the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlLayout {
    pub parent_tag: String,
    pub element_tag: String,
    pub attribute: String,
    pub value_tag: String,
}

impl Default for XmlLayout {
    fn default() -> Self {
        Self {
            parent_tag: DEFAULT_XML_PARENT_TAG.to_string(),
            element_tag: DEFAULT_XML_ELEMENT_TAG.to_string(),
            attribute: DEFAULT_XML_ATTRIBUTE.to_string(),
            value_tag: DEFAULT_XML_VALUE_TAG.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct XmlSourceReader {
    path: PathBuf,
    source_id: String,
    layout: XmlLayout,
    columns: Option<Vec<String>>,
}

impl XmlSourceReader {
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_layout(path, XmlLayout::default())
    }

    pub fn with_layout(path: &Path, layout: XmlLayout) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            source_id: source_id(path),
            layout,
            columns: None,
        })
    }

    fn xml_reader(&self) -> Result<Reader<BufReader<Box<dyn ioRead>>>> {
        let mut reader = Reader::from_reader(open_source_reader(&self.path)?);
        reader.config_mut().trim_text(true);
        Ok(reader)
    }

    fn column_name(&self, element: &BytesStart) -> Result<String> {
        let attribute = element
            .try_get_attribute(self.layout.attribute.as_bytes())
            .map_err(quick_xml::Error::from)?
            .ok_or_else(|| {
                crate::tabmerge_error!(
                    "{}: <{}> without a '{}' attribute",
                    self.source_id,
                    self.layout.element_tag,
                    self.layout.attribute
                )
            })?;
        let value = attribute
            .unescape_value()
            .map_err(quick_xml::Error::from)?;
        Ok(value.into_owned())
    }
}

impl SourceReader for XmlSourceReader {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn discover_columns(&mut self) -> Result<Vec<String>> {
        if let Some(columns) = &self.columns {
            return Ok(columns.clone());
        }
        let parent = self.layout.parent_tag.as_bytes();
        let element = self.layout.element_tag.as_bytes();

        let mut reader = self.xml_reader()?;
        let mut buf = Vec::new();
        let mut columns = Vec::new();
        let mut in_parent = false;
        loop {
            buf.clear();
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == parent => in_parent = true,
                Event::Empty(e) if e.name().as_ref() == parent => break,
                Event::Start(e) | Event::Empty(e) if in_parent && e.name().as_ref() == element => {
                    columns.push(self.column_name(&e)?);
                }
                Event::End(e) if e.name().as_ref() == parent => break,
                Event::Eof => break,
                _ => {}
            }
        }
        self.columns = Some(columns.clone());
        Ok(columns)
    }

    fn stream_records(&self, hint: usize) -> Result<RecordStream> {
        Ok(Box::new(XmlRecords {
            reader: self.xml_reader()?,
            buf: Vec::new(),
            layout: self.layout.clone(),
            origin: self.source_id.clone(),
            hint,
            done: false,
        }))
    }
}

struct XmlRecords {
    reader: Reader<BufReader<Box<dyn ioRead>>>,
    buf: Vec<u8>,
    layout: XmlLayout,
    origin: String,
    hint: usize,
    done: bool,
}

impl XmlRecords {
    /// Reads up to the end of the next parent element. An element without a
    /// value tag is an absent cell; an empty value tag is an empty string.
    fn read_record(&mut self) -> Result<Option<RawRecord>> {
        let parent = self.layout.parent_tag.as_bytes();
        let element = self.layout.element_tag.as_bytes();
        let value = self.layout.value_tag.as_bytes();

        let mut cells: Option<RawRecord> = None;
        let mut cell: Option<Cell> = None;
        let mut text: Option<String> = None;
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.name().as_ref() == parent => {
                    cells = Some(Vec::with_capacity(self.hint));
                }
                Event::Empty(e) if e.name().as_ref() == parent => return Ok(Some(Vec::new())),
                Event::End(e) if e.name().as_ref() == parent => return Ok(cells.take()),
                Event::Start(e) if cells.is_some() && e.name().as_ref() == element => {
                    cell = Some(Cell::Absent);
                }
                Event::Empty(e) if e.name().as_ref() == element => {
                    if let Some(cells) = cells.as_mut() {
                        cells.push(Cell::Absent);
                    }
                }
                Event::End(e) if e.name().as_ref() == element => {
                    if let (Some(cells), Some(cell)) = (cells.as_mut(), cell.take()) {
                        cells.push(cell);
                    }
                }
                Event::Start(e) if cell.is_some() && e.name().as_ref() == value => {
                    text = Some(String::new());
                }
                Event::Empty(e) if cell.is_some() && e.name().as_ref() == value => {
                    cell = Some(Cell::present(""));
                }
                Event::End(e) if e.name().as_ref() == value => {
                    if let Some(text) = text.take() {
                        cell = Some(Cell::Present(text));
                    }
                }
                Event::Text(t) => {
                    if let Some(text) = text.as_mut() {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(text) = text.as_mut() {
                        text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => {
                    if cells.is_some() {
                        return Err(crate::tabmerge_error!(
                            "unexpected end of document inside <{}>",
                            self.layout.parent_tag
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl Iterator for XmlRecords {
    type Item = column_merge::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(error) => {
                self.done = true;
                Some(Err(MergeError::read(self.origin.as_str(), error)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().expect("temp dir should be created");
        let path = temp_dir.path().join("c.xml");
        fs::write(&path, contents).expect("fixture should be written");
        (temp_dir, path)
    }

    fn collect(reader: &XmlSourceReader) -> Vec<RawRecord> {
        reader
            .stream_records(0)
            .expect("stream")
            .collect::<column_merge::Result<_>>()
            .expect("records")
    }

    const TWO_RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root>
    <objects>
        <object name="D2"><value>b</value></object>
        <object name="D1"><value>1</value></object>
        <object name="M1"><value>x &amp; y</value></object>
    </objects>
    <objects>
        <object name="D2"><value>a</value></object>
        <object name="D1"><value>2</value></object>
        <object name="M1"><value><![CDATA[<z>]]></value></object>
    </objects>
</root>
"#;

    #[test]
    fn header_comes_from_the_first_parent() {
        let (_dir, path) = fixture(TWO_RECORDS);
        let mut reader = XmlSourceReader::new(&path).expect("reader");
        assert_eq!(reader.source_id(), "c.xml");
        assert_eq!(
            reader.discover_columns().expect("header"),
            vec!["D2", "D1", "M1"]
        );
    }

    #[test]
    fn records_follow_element_order() {
        let (_dir, path) = fixture(TWO_RECORDS);
        let reader = XmlSourceReader::new(&path).expect("reader");
        assert_eq!(
            collect(&reader),
            vec![
                vec![Cell::present("b"), Cell::present("1"), Cell::present("x & y")],
                vec![Cell::present("a"), Cell::present("2"), Cell::present("<z>")],
            ]
        );
    }

    #[test]
    fn missing_and_empty_values() {
        let (_dir, path) = fixture(
            r#"<objects>
                <object name="D1"><value/></object>
                <object name="M1"></object>
                <object name="M2"/>
            </objects>"#,
        );
        let reader = XmlSourceReader::new(&path).expect("reader");
        assert_eq!(
            collect(&reader),
            vec![vec![Cell::present(""), Cell::Absent, Cell::Absent]]
        );
    }

    #[test]
    fn custom_layout() {
        let (_dir, path) = fixture(
            r#"<rows><row><col key="D1"><v>7</v></col></row><row><col key="D1"><v>8</v></col></row></rows>"#,
        );
        let layout = XmlLayout {
            parent_tag: "row".to_string(),
            element_tag: "col".to_string(),
            attribute: "key".to_string(),
            value_tag: "v".to_string(),
        };
        let mut reader = XmlSourceReader::with_layout(&path, layout).expect("reader");
        assert_eq!(reader.discover_columns().expect("header"), vec!["D1"]);
        assert_eq!(
            collect(&reader),
            vec![vec![Cell::present("7")], vec![Cell::present("8")]]
        );
    }

    #[test]
    fn element_without_attribute_fails_discovery() {
        let (_dir, path) = fixture(r#"<objects><object><value>1</value></object></objects>"#);
        let mut reader = XmlSourceReader::new(&path).expect("reader");
        let error = reader.discover_columns().expect_err("name attribute is required");
        assert!(error.to_string().contains("'name'"));
    }

    #[test]
    fn truncated_document_is_a_read_error() {
        let (_dir, path) = fixture(r#"<objects><object name="D1"><value>1</value></object>"#);
        let reader = XmlSourceReader::new(&path).expect("reader");
        let results: Vec<_> = reader.stream_records(1).expect("stream").collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(MergeError::Read { .. })));
    }

    #[test]
    fn document_without_records() {
        let (_dir, path) = fixture("<root/>");
        let mut reader = XmlSourceReader::new(&path).expect("reader");
        assert!(reader.discover_columns().expect("header").is_empty());
        assert!(collect(&reader).is_empty());
    }
}
