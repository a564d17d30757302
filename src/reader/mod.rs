//! Streaming DFXML/RegXML reader.
//!
//! `quick-xml` tokenizes the input and pushes element events into an
//! [`ElementHandler`]; [`DocumentReader`] turns that push interface into an
//! iterator that yields one completed [`Object`] at a time. Memory use is
//! bounded by the nesting depth of the document, not its length.
//!
//! # Example
//!
//! ```rust,no_run
//! use dfxml_tools::reader::{DocumentReader, Object};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("fiwalk_output.xml").unwrap();
//! for result in DocumentReader::from_reader(BufReader::new(file)) {
//!     match result {
//!         Ok(Object::File(file)) => println!("File: {:?}", file.filename),
//!         Ok(Object::Cell(cell)) => println!("Cell: {}", cell.cellpath),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

mod dfxml;
mod regxml;

pub use dfxml::DfxmlHandler;
pub use regxml::{RegElement, RegXmlDispatcher, NONCE_PREFIX};

use crate::error::{Error, Result};
use crate::objects::{CellObject, FileObject, Provenance, RegistryObject};
use quick_xml::events::BytesStart;
use quick_xml::events::Event as XmlEvent;
use quick_xml::Reader;
use std::io::BufRead;
use std::str;
use tracing::trace;

/// Owned attribute list of one element, in document order.
pub type Attributes = Vec<(String, String)>;

/// Looks up an attribute by name.
pub fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// A completed object produced by the reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// A `fileobject` from DFXML
    File(FileObject),
    /// A `key` or `value` from RegXML
    Cell(CellObject),
}

impl Object {
    /// Returns the file object, if this is one.
    pub fn into_file(self) -> Option<FileObject> {
        match self {
            Object::File(f) => Some(f),
            Object::Cell(_) => None,
        }
    }

    /// Returns the cell object, if this is one.
    pub fn into_cell(self) -> Option<CellObject> {
        match self {
            Object::Cell(c) => Some(c),
            Object::File(_) => None,
        }
    }
}

/// Receives element events from the tokenizer.
///
/// Element names are local names (namespace prefix stripped). Self-closing
/// elements are delivered as `start` immediately followed by `end`.
pub trait ElementHandler {
    /// An element opened.
    fn start(&mut self, name: &str, attrs: Attributes) -> Result<()>;

    /// Character data inside the current element.
    fn text(&mut self, text: &str);

    /// An element closed. Returns the object it completed, if any.
    fn end(&mut self, name: &str) -> Result<Option<Object>>;
}

/// Which dispatcher a [`DocumentReader`] drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderKind {
    /// Decide from the document's root element
    #[default]
    Auto,
    /// fiwalk-style DFXML
    Dfxml,
    /// RegXML
    RegXml,
}

impl ReaderKind {
    /// Selects a dispatcher for a document root element.
    pub fn from_root(name: &str) -> Result<Self> {
        match name {
            "dfxml" | "fiwalk" => Ok(ReaderKind::Dfxml),
            "hive" | "msregistry" | "regxml" => Ok(ReaderKind::RegXml),
            other => Err(Error::UnexpectedElement {
                element: other.to_string(),
                context: "document root".to_string(),
            }),
        }
    }
}

enum Dispatcher {
    Dfxml(DfxmlHandler),
    RegXml(RegXmlDispatcher),
}

impl Dispatcher {
    fn new(kind: ReaderKind) -> Option<Self> {
        match kind {
            ReaderKind::Auto => None,
            ReaderKind::Dfxml => Some(Dispatcher::Dfxml(DfxmlHandler::new())),
            ReaderKind::RegXml => Some(Dispatcher::RegXml(RegXmlDispatcher::new())),
        }
    }

    fn handler(&mut self) -> &mut dyn ElementHandler {
        match self {
            Dispatcher::Dfxml(h) => h,
            Dispatcher::RegXml(h) => h,
        }
    }
}

/// Intermediate parsed event data (owned, to avoid borrow conflicts).
enum ParsedEvent {
    Start { name: String, attrs: Attributes },
    End { name: String },
    Empty { name: String, attrs: Attributes },
    Text { text: String },
    Eof,
}

/// A pull-style reader over DFXML or RegXML documents.
///
/// Single-pass: objects are yielded in document order as their closing tags
/// are seen. After the first error the iterator is exhausted.
pub struct DocumentReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    dispatcher: Option<Dispatcher>,
    depth: usize,
    peeked: Option<Result<Object>>,
    done: bool,
}

impl<R: BufRead> DocumentReader<R> {
    /// Creates a reader that picks its dispatcher from the root element.
    pub fn from_reader(reader: R) -> Self {
        Self::with_kind(reader, ReaderKind::Auto)
    }

    /// Creates a reader with an explicit dispatcher.
    pub fn with_kind(reader: R, kind: ReaderKind) -> Self {
        // Text is passed through untrimmed; DFXML fields are trimmed by their handler
        let xml_reader = Reader::from_reader(reader);

        Self {
            reader: xml_reader,
            buf: Vec::with_capacity(4096),
            dispatcher: Dispatcher::new(kind),
            depth: 0,
            peeked: None,
            done: false,
        }
    }

    /// Number of completed objects held by the reader (0 or 1).
    pub fn buffered(&self) -> usize {
        usize::from(self.peeked.is_some())
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns the next object without consuming it.
    pub fn peek(&mut self) -> Option<&Result<Object>> {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.as_ref()
    }

    /// Document provenance collected so far (DFXML only).
    pub fn provenance(&self) -> Option<&Provenance> {
        match &self.dispatcher {
            Some(Dispatcher::Dfxml(h)) => Some(h.provenance()),
            _ => None,
        }
    }

    /// Source image names collected so far (DFXML only).
    pub fn sources(&self) -> &[String] {
        match &self.dispatcher {
            Some(Dispatcher::Dfxml(h)) => h.sources(),
            _ => &[],
        }
    }

    /// The most recently closed registry index (RegXML only).
    pub fn last_registry(&self) -> Option<&RegistryObject> {
        match &self.dispatcher {
            Some(Dispatcher::RegXml(d)) => d.last_registry(),
            _ => None,
        }
    }

    fn advance(&mut self) -> Option<Result<Object>> {
        if self.done {
            return None;
        }
        match self.parse_next() {
            Ok(Some(obj)) => Some(Ok(obj)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn parse_next(&mut self) -> Result<Option<Object>> {
        loop {
            self.buf.clear();

            let event_data = {
                let event = self.reader.read_event_into(&mut self.buf)?;
                match event {
                    XmlEvent::Start(ref e) => Some(ParsedEvent::Start {
                        name: local_name(e)?,
                        attrs: extract_attrs(e)?,
                    }),
                    XmlEvent::End(ref e) => {
                        let local = e.local_name();
                        let name = str::from_utf8(local.as_ref())?.to_string();
                        Some(ParsedEvent::End { name })
                    }
                    XmlEvent::Empty(ref e) => Some(ParsedEvent::Empty {
                        name: local_name(e)?,
                        attrs: extract_attrs(e)?,
                    }),
                    XmlEvent::Text(ref e) => Some(ParsedEvent::Text {
                        text: e.unescape()?.to_string(),
                    }),
                    XmlEvent::CData(ref e) => Some(ParsedEvent::Text {
                        text: str::from_utf8(e.as_ref())?.to_string(),
                    }),
                    XmlEvent::Eof => Some(ParsedEvent::Eof),
                    _ => None,
                }
            };

            match event_data {
                Some(ParsedEvent::Start { name, attrs }) => {
                    self.depth += 1;
                    self.dispatcher_for(&name)?.handler().start(&name, attrs)?;
                }
                Some(ParsedEvent::End { name }) => {
                    self.depth = self.depth.saturating_sub(1);
                    if let Some(obj) = self.dispatcher_for(&name)?.handler().end(&name)? {
                        return Ok(Some(obj));
                    }
                }
                Some(ParsedEvent::Empty { name, attrs }) => {
                    let handler = self.dispatcher_for(&name)?.handler();
                    handler.start(&name, attrs)?;
                    if let Some(obj) = handler.end(&name)? {
                        return Ok(Some(obj));
                    }
                }
                Some(ParsedEvent::Text { text }) => {
                    if let Some(d) = self.dispatcher.as_mut() {
                        d.handler().text(&text);
                    }
                }
                Some(ParsedEvent::Eof) => {
                    if self.depth > 0 {
                        return Err(Error::MissingField(format!(
                            "closing tags for {} open element(s) at end of document",
                            self.depth
                        )));
                    }
                    return Ok(None);
                }
                None => {}
            }
        }
    }

    fn dispatcher_for(&mut self, name: &str) -> Result<&mut Dispatcher> {
        if self.dispatcher.is_none() {
            let kind = ReaderKind::from_root(name)?;
            trace!(root = name, ?kind, "selected dispatcher");
            self.dispatcher = Dispatcher::new(kind);
        }
        self.dispatcher
            .as_mut()
            .ok_or_else(|| Error::MissingField("document root element".to_string()))
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.peeked.take() {
            return Some(item);
        }
        self.advance()
    }
}

fn local_name(e: &BytesStart<'_>) -> Result<String> {
    let local = e.local_name();
    Ok(str::from_utf8(local.as_ref())?.to_string())
}

/// Extracts attributes from a BytesStart element as owned data.
fn extract_attrs(e: &BytesStart<'_>) -> Result<Attributes> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = str::from_utf8(attr.key.local_name().as_ref())?.to_string();
        let value = attr.unescape_value()?.to_string();
        attrs.push((key, value));
    }
    Ok(attrs)
}

/// Reads a RegXML document, calling `callback` once per completed cell in
/// document order.
///
/// Returns the registry index of the last hive in the document.
pub fn read_regxml<R, F>(reader: R, mut callback: F) -> Result<Option<RegistryObject>>
where
    R: BufRead,
    F: FnMut(CellObject),
{
    let mut doc = DocumentReader::with_kind(reader, ReaderKind::RegXml);
    for obj in doc.by_ref() {
        if let Object::Cell(cell) = obj? {
            callback(cell);
        }
    }
    Ok(doc.last_registry().cloned())
}

/// Convenience function to parse a DFXML file and collect all file objects.
///
/// This loads all files into memory, so it's not suitable for very large
/// DFXML files. For large files, use [`DocumentReader`] directly.
pub fn parse_file_objects<R: BufRead>(reader: R) -> Result<Vec<FileObject>> {
    let mut files = Vec::new();
    for obj in DocumentReader::with_kind(reader, ReaderKind::Dfxml) {
        if let Object::File(file) = obj? {
            files.push(file);
        }
    }
    Ok(files)
}

/// Collects every cell of a RegXML document.
pub fn parse_cells<R: BufRead>(reader: R) -> Result<Vec<CellObject>> {
    let mut cells = Vec::new();
    read_regxml(reader, |cell| cells.push(cell))?;
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    const FIWALK: &str = r#"<?xml version="1.0"?>
<dfxml version="1.0">
  <fileobject>
    <filename>WINDOWS/system32/config/SYSTEM</filename>
    <filesize>10</filesize>
  </fileobject>
</dfxml>"#;

    const HIVE: &str = r#"<hive>
  <key root="1" name="ROOT">
    <value name="v1" type="int32" value="1"/>
  </key>
</hive>"#;

    #[test]
    fn test_auto_detect_dfxml() {
        let objects: Vec<_> = DocumentReader::from_reader(Cursor::new(FIWALK))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(objects.len(), 1);
        assert!(matches!(objects[0], Object::File(_)));
    }

    #[test]
    fn test_auto_detect_regxml() {
        let objects: Vec<_> = DocumentReader::from_reader(Cursor::new(HIVE))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let paths: Vec<_> = objects
            .into_iter()
            .filter_map(Object::into_cell)
            .map(|c| c.cellpath)
            .collect();
        assert_eq!(paths, ["\\ROOT\\v1", "\\ROOT"]);
    }

    #[test]
    fn test_unknown_root() {
        let mut reader = DocumentReader::from_reader(Cursor::new("<html><body/></html>"));
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.is_structural());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_stops_after_first_error() {
        let xml = r#"<hive>
  <key root="1" name="A"><bogus/></key>
  <key root="1" name="B"/>
</hive>"#;
        let results: Vec<_> = DocumentReader::from_reader(Cursor::new(xml)).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_truncated_document_is_error() {
        let xml = "<dfxml><fileobject><filename>a</filename>";
        let results: Vec<_> = DocumentReader::from_reader(Cursor::new(xml)).collect();
        assert!(results.last().is_some_and(|r| r.is_err()));
    }

    #[test]
    fn test_peek() {
        let mut reader = DocumentReader::from_reader(Cursor::new(FIWALK));
        assert_eq!(reader.buffered(), 0);
        assert!(matches!(reader.peek(), Some(Ok(Object::File(_)))));
        assert_eq!(reader.buffered(), 1);
        assert!(matches!(reader.next(), Some(Ok(Object::File(_)))));
        assert_eq!(reader.buffered(), 0);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_regxml_callback() {
        let mut seen = Vec::new();
        let registry = read_regxml(Cursor::new(HIVE), |cell| seen.push(cell.basename))
            .unwrap()
            .unwrap();
        assert_eq!(seen, ["v1", "ROOT"]);
        assert!(registry.get("\\ROOT").is_some());
    }

    /// Generates a flat DFXML document with `count` fileobjects on demand.
    struct LazyDfxml {
        count: usize,
        next: usize,
        chunk: Vec<u8>,
        pos: usize,
        finished: bool,
    }

    impl LazyDfxml {
        fn new(count: usize) -> Self {
            Self {
                count,
                next: 0,
                chunk: b"<?xml version=\"1.0\"?>\n<dfxml version=\"1.1.1\">\n".to_vec(),
                pos: 0,
                finished: false,
            }
        }

        fn refill(&mut self) {
            self.pos = 0;
            self.chunk.clear();
            if self.next < self.count {
                self.chunk = format!(
                    "<fileobject><filename>dir/file{0}.txt</filename><filesize>{0}</filesize>\
                     <byte_runs><byte_run img_offset=\"{0}\" len=\"1\"/></byte_runs></fileobject>\n",
                    self.next
                )
                .into_bytes();
                self.next += 1;
            } else if !self.finished {
                self.chunk = b"</dfxml>\n".to_vec();
                self.finished = true;
            }
        }
    }

    impl Read for LazyDfxml {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.chunk.len() {
                self.refill();
            }
            let n = out.len().min(self.chunk.len() - self.pos);
            out[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_streaming_memory_bound() {
        const COUNT: usize = 100_000;
        let source = std::io::BufReader::new(LazyDfxml::new(COUNT));
        let mut reader = DocumentReader::from_reader(source);

        let mut seen = 0usize;
        let mut max_depth = 0usize;
        while let Some(obj) = reader.next() {
            let file = obj.unwrap().into_file().unwrap();
            assert_eq!(file.filesize, Some(seen as u64));
            assert!(reader.buffered() <= 1);
            max_depth = max_depth.max(reader.depth());
            seen += 1;
        }
        assert_eq!(seen, COUNT);
        assert!(max_depth <= 2);
    }
}
