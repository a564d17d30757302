//! XML writers for DFXML and RegXML reports.
//!
//! Both formats open with the same provenance block (Dublin Core metadata,
//! then a `creator` element describing the program and the host it ran on)
//! followed by the report's objects in order.
//!
//! # Example
//!
//! ```rust
//! use dfxml_tools::objects::{DFXMLObject, FileObject, HashType, Provenance};
//! use dfxml_tools::writer::DFXMLWriter;
//!
//! let mut doc = DFXMLObject::with_provenance(
//!     Provenance::new("my-tool", "1.0.0").with_dc_type("Hash List"),
//! );
//! doc.add_source("image.raw");
//!
//! let mut file = FileObject::with_filename("test.txt");
//! file.filesize = Some(1024);
//! file.hashes.set(HashType::Md5, "d41d8cd98f00b204e9800998ecf8427e".to_string());
//! doc.append_file(file);
//!
//! let xml = DFXMLWriter::new().write_to_string(&doc).unwrap();
//! assert!(xml.contains("<filename>test.txt</filename>"));
//! ```

use crate::error::Result;
use crate::objects::{
    ByteRun, ByteRunFacet, ByteRuns, CellObject, DFXMLObject, FileObject, Hashes, HiveObject,
    Provenance, RegXMLObject, Timestamp, TimestampName, XMLNS_DC, XMLNS_DFXML, XMLNS_REGXML,
};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Configuration options for the XML writers.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Whether to indent the output for readability
    pub indent: bool,
    /// Spaces per indentation level
    pub indent_width: usize,
    /// Whether to include the XML declaration
    pub xml_declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: true,
            indent_width: 2,
            xml_declaration: true,
        }
    }
}

impl WriterConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compact configuration (no indentation).
    pub fn compact() -> Self {
        Self {
            indent: false,
            indent_width: 0,
            xml_declaration: true,
        }
    }

    /// Sets whether to indent the output.
    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the number of spaces per indentation level.
    pub fn with_indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    /// Sets whether to emit the XML declaration.
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.xml_declaration = declaration;
        self
    }

    fn open<W: Write>(&self, writer: W) -> Result<Writer<W>> {
        let mut xml_writer = if self.indent {
            Writer::new_with_indent(writer, b' ', self.indent_width)
        } else {
            Writer::new(writer)
        };
        if self.xml_declaration {
            xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            if self.indent {
                xml_writer.get_mut().write_all(b"\n")?;
            }
        }
        Ok(xml_writer)
    }
}

/// DFXML writer.
pub struct DFXMLWriter {
    config: WriterConfig,
}

impl DFXMLWriter {
    /// Creates a new writer with default configuration.
    pub fn new() -> Self {
        Self {
            config: WriterConfig::default(),
        }
    }

    /// Creates a new writer with the specified configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Writes a DFXMLObject to a string.
    pub fn write_to_string(&self, doc: &DFXMLObject) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(doc, &mut buffer)?;
        Ok(String::from_utf8(buffer).map_err(|e| e.utf8_error())?)
    }

    /// Writes a DFXMLObject to any Write implementation.
    pub fn write<W: Write>(&self, doc: &DFXMLObject, writer: W) -> Result<()> {
        let mut xml_writer = self.config.open(writer)?;

        let mut root = BytesStart::new("dfxml");
        root.push_attribute(("version", doc.version.as_str()));
        root.push_attribute(("xmlns", XMLNS_DFXML));
        root.push_attribute(("xmlns:dc", XMLNS_DC));
        xml_writer.write_event(Event::Start(root))?;

        write_provenance(&mut xml_writer, &doc.provenance)?;

        if !doc.sources.is_empty() {
            xml_writer.write_event(Event::Start(BytesStart::new("source")))?;
            for source in &doc.sources {
                write_simple_element(&mut xml_writer, "image_filename", source)?;
            }
            xml_writer.write_event(Event::End(BytesEnd::new("source")))?;
        }

        for file in doc.files() {
            self.write_file(&mut xml_writer, file)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("dfxml")))?;
        xml_writer.get_mut().flush()?;
        Ok(())
    }

    /// Writes a file object element.
    fn write_file<W: Write>(&self, writer: &mut Writer<W>, file: &FileObject) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("fileobject")))?;

        if let Some(ref filename) = file.filename {
            write_simple_element(writer, "filename", filename)?;
        }
        if let Some(id) = file.id {
            write_simple_element(writer, "id", &id.to_string())?;
        }
        if let Some(partition) = file.partition {
            write_simple_element(writer, "partition", &partition.to_string())?;
        }
        if let Some(ref name_type) = file.name_type {
            write_simple_element(writer, "name_type", name_type.as_str())?;
        }
        if let Some(filesize) = file.filesize {
            write_simple_element(writer, "filesize", &filesize.to_string())?;
        }

        let alloc = [
            ("alloc", file.alloc),
            ("alloc_inode", file.alloc_inode),
            ("alloc_name", file.alloc_name),
        ];
        for (name, value) in alloc {
            if let Some(value) = value {
                write_simple_element(writer, name, bool_text(value))?;
            }
        }

        if let Some(inode) = file.inode {
            write_simple_element(writer, "inode", &inode.to_string())?;
        }
        if let Some(mode) = file.mode {
            write_simple_element(writer, "mode", &mode.to_string())?;
        }
        if let Some(nlink) = file.nlink {
            write_simple_element(writer, "nlink", &nlink.to_string())?;
        }
        if let Some(uid) = file.uid {
            write_simple_element(writer, "uid", &uid.to_string())?;
        }
        if let Some(gid) = file.gid {
            write_simple_element(writer, "gid", &gid.to_string())?;
        }

        for name in TimestampName::ALL {
            if let Some(ts) = file.get_timestamp(name) {
                write_timestamp(writer, name.as_str(), ts)?;
            }
        }

        if let Some(ref brs) = file.byte_runs {
            write_byte_runs(writer, brs, brs.facet)?;
        }

        write_hashes(writer, &file.hashes)?;

        if let Some(ref error) = file.error {
            write_simple_element(writer, "error", error)?;
        }

        writer.write_event(Event::End(BytesEnd::new("fileobject")))?;
        Ok(())
    }
}

impl Default for DFXMLWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// RegXML writer for flattened hives.
///
/// Each hive becomes a `hive` element holding one `cellobject` per cell.
pub struct RegXMLWriter {
    config: WriterConfig,
}

impl RegXMLWriter {
    /// Creates a new writer with default configuration.
    pub fn new() -> Self {
        Self {
            config: WriterConfig::default(),
        }
    }

    /// Creates a new writer with the specified configuration.
    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Writes a RegXMLObject to a string.
    pub fn write_to_string(&self, doc: &RegXMLObject) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(doc, &mut buffer)?;
        Ok(String::from_utf8(buffer).map_err(|e| e.utf8_error())?)
    }

    /// Writes a RegXMLObject to any Write implementation.
    pub fn write<W: Write>(&self, doc: &RegXMLObject, writer: W) -> Result<()> {
        let mut xml_writer = self.config.open(writer)?;

        let mut root = BytesStart::new("regxml");
        root.push_attribute(("version", doc.version.as_str()));
        root.push_attribute(("xmlns", XMLNS_REGXML));
        root.push_attribute(("xmlns:dc", XMLNS_DC));
        xml_writer.write_event(Event::Start(root))?;

        write_provenance(&mut xml_writer, &doc.provenance)?;

        for hive in doc.hives() {
            self.write_hive(&mut xml_writer, hive)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("regxml")))?;
        xml_writer.get_mut().flush()?;
        Ok(())
    }

    fn write_hive<W: Write>(&self, writer: &mut Writer<W>, hive: &HiveObject) -> Result<()> {
        let mut elem = BytesStart::new("hive");
        if let Some(ref filename) = hive.filename {
            elem.push_attribute(("filename", filename.as_str()));
        }
        if hive.cells.is_empty() {
            writer.write_event(Event::Empty(elem))?;
            return Ok(());
        }
        writer.write_event(Event::Start(elem))?;
        for cell in &hive.cells {
            self.write_cell(writer, cell)?;
        }
        writer.write_event(Event::End(BytesEnd::new("hive")))?;
        Ok(())
    }

    fn write_cell<W: Write>(&self, writer: &mut Writer<W>, cell: &CellObject) -> Result<()> {
        let mut elem = BytesStart::new("cellobject");
        if cell.root {
            elem.push_attribute(("root", "1"));
        }
        writer.write_event(Event::Start(elem))?;

        write_simple_element(writer, "cellpath", &cell.cellpath)?;
        write_simple_element(writer, "basename", &cell.basename)?;
        write_simple_element(writer, "name_type", cell.kind.as_str())?;
        if let Some(ref parent) = cell.parent {
            write_simple_element(writer, "parent", parent)?;
        }
        if let Some(ref mtime) = cell.mtime {
            write_timestamp(writer, "mtime", mtime)?;
        }
        if let Some(ref data_type) = cell.data_type {
            write_simple_element(writer, "data_type", data_type.as_str())?;
        }
        if let Some(ref data) = cell.data {
            let mut data_elem = BytesStart::new("data");
            if let Some(ref encoding) = cell.data_encoding {
                data_elem.push_attribute(("encoding", encoding.as_str()));
            }
            writer.write_event(Event::Start(data_elem))?;
            writer.write_event(Event::Text(BytesText::new(data)))?;
            writer.write_event(Event::End(BytesEnd::new("data")))?;
        }
        if let Some(ref strings) = cell.strings {
            writer.write_event(Event::Start(BytesStart::new("strings")))?;
            for s in strings {
                write_simple_element(writer, "string", s)?;
            }
            writer.write_event(Event::End(BytesEnd::new("strings")))?;
        }
        if let Some(ref brs) = cell.byte_runs {
            write_byte_runs(writer, brs, None)?;
        }

        writer.write_event(Event::End(BytesEnd::new("cellobject")))?;
        Ok(())
    }
}

impl Default for RegXMLWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Writes the metadata and creator blocks.
fn write_provenance<W: Write>(writer: &mut Writer<W>, prov: &Provenance) -> Result<()> {
    if let Some(ref dc_type) = prov.dc_type {
        writer.write_event(Event::Start(BytesStart::new("metadata")))?;
        write_simple_element(writer, "dc:type", dc_type)?;
        writer.write_event(Event::End(BytesEnd::new("metadata")))?;
    }

    if prov.program.is_none()
        && prov.program_version.is_none()
        && prov.command_line.is_none()
        && prov.start_time.is_none()
        && prov.host.is_none()
    {
        return Ok(());
    }

    let mut creator = BytesStart::new("creator");
    creator.push_attribute(("version", "1.0"));
    writer.write_event(Event::Start(creator))?;

    if let Some(ref program) = prov.program {
        write_simple_element(writer, "program", program)?;
    }
    if let Some(ref version) = prov.program_version {
        write_simple_element(writer, "version", version)?;
    }

    writer.write_event(Event::Start(BytesStart::new("execution_environment")))?;
    if let Some(ref host) = prov.host {
        for (name, value) in host.fields() {
            write_simple_element(writer, name, value)?;
        }
    }
    if let Some(ref cmd) = prov.command_line {
        write_simple_element(writer, "command_line", cmd)?;
    }
    if let Some(ref start) = prov.start_time {
        write_simple_element(writer, "start_time", &start.to_rfc3339())?;
    }
    writer.write_event(Event::End(BytesEnd::new("execution_environment")))?;

    writer.write_event(Event::End(BytesEnd::new("creator")))?;
    Ok(())
}

/// Writes a timestamp element.
fn write_timestamp<W: Write>(writer: &mut Writer<W>, name: &str, ts: &Timestamp) -> Result<()> {
    let mut elem = BytesStart::new(name);
    if let Some(ref prec) = ts.prec {
        elem.push_attribute(("prec", prec.to_string().as_str()));
    }
    writer.write_event(Event::Start(elem))?;
    writer.write_event(Event::Text(BytesText::new(&ts.time.to_rfc3339())))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Writes byte runs with an optional facet.
fn write_byte_runs<W: Write>(
    writer: &mut Writer<W>,
    brs: &ByteRuns,
    facet: Option<ByteRunFacet>,
) -> Result<()> {
    if brs.is_empty() {
        return Ok(());
    }

    let mut elem = BytesStart::new("byte_runs");
    if let Some(f) = facet {
        elem.push_attribute(("facet", f.as_str()));
    }
    writer.write_event(Event::Start(elem))?;

    for br in brs.iter() {
        write_byte_run(writer, br)?;
    }

    writer.write_event(Event::End(BytesEnd::new("byte_runs")))?;
    Ok(())
}

/// Writes a single byte run.
fn write_byte_run<W: Write>(writer: &mut Writer<W>, br: &ByteRun) -> Result<()> {
    let mut elem = BytesStart::new("byte_run");

    let attrs = [
        ("file_offset", br.file_offset),
        ("fs_offset", br.fs_offset),
        ("img_offset", br.img_offset),
        ("len", br.len),
        ("fill", br.fill.map(u64::from)),
        ("uncompressed_len", br.uncompressed_len),
    ];
    for (key, value) in attrs {
        if let Some(value) = value {
            elem.push_attribute((key, value.to_string().as_str()));
        }
    }

    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Writes hash elements, MD5 first.
fn write_hashes<W: Write>(writer: &mut Writer<W>, hashes: &Hashes) -> Result<()> {
    for (hash_type, value) in hashes.iter() {
        let mut elem = BytesStart::new("hashdigest");
        elem.push_attribute(("type", hash_type.as_str()));
        writer.write_event(Event::Start(elem))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("hashdigest")))?;
    }
    Ok(())
}

/// Writes a simple text element.
fn write_simple_element<W: Write>(writer: &mut Writer<W>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Convenience function to write a DFXMLObject to a string.
pub fn to_string(doc: &DFXMLObject) -> Result<String> {
    DFXMLWriter::new().write_to_string(doc)
}

/// Convenience function to write a DFXMLObject to a string without indentation.
pub fn to_string_compact(doc: &DFXMLObject) -> Result<String> {
    DFXMLWriter::with_config(WriterConfig::compact()).write_to_string(doc)
}

/// Convenience function to write a DFXMLObject to a writer.
pub fn write<W: Write>(doc: &DFXMLObject, writer: W) -> Result<()> {
    DFXMLWriter::new().write(doc, writer)
}

/// Convenience function to write a RegXMLObject to a writer.
pub fn write_regxml<W: Write>(doc: &RegXMLObject, writer: W) -> Result<()> {
    RegXMLWriter::new().write(doc, writer)
}
