//! Dispatcher for fiwalk-style DFXML.
//!
//! fiwalk output carries volumes, partitions, libraries and other detail
//! this crate does not model, so unknown elements are skipped. Values that
//! are present but cannot be decoded are still errors.

use super::{attr, Attributes, ElementHandler, Object};
use crate::error::{Error, Result};
use crate::objects::{
    ByteRun, ByteRunFacet, ByteRuns, FileObject, HashType, HostInfo, Provenance, Timestamp,
    TimestampName,
};
use std::str::FromStr;
use tracing::trace;

/// Context for tracking nested element parsing.
#[derive(Debug, Default)]
struct ElementContext {
    /// Current element path (e.g., ["dfxml", "fileobject", "filename"])
    path: Vec<String>,
    /// Accumulated text content
    text: String,
    /// Attributes of the innermost open element
    attrs: Attributes,
}

impl ElementContext {
    fn push(&mut self, name: String, attrs: Attributes) {
        self.path.push(name);
        self.text.clear();
        self.attrs = attrs;
    }

    fn pop(&mut self) -> Option<String> {
        self.text.clear();
        self.attrs.clear();
        self.path.pop()
    }

    fn current(&self) -> Option<&str> {
        self.path.last().map(|s| s.as_str())
    }

    fn within(&self, name: &str) -> bool {
        self.path.iter().any(|p| p == name)
    }
}

fn is_file_element(name: &str) -> bool {
    matches!(name, "fileobject" | "file")
}

/// Builds [`FileObject`]s from DFXML element events and collects the
/// document's provenance on the way.
#[derive(Debug, Default)]
pub struct DfxmlHandler {
    context: ElementContext,
    file: Option<FileObject>,
    byte_runs: Option<ByteRuns>,
    provenance: Provenance,
    sources: Vec<String>,
}

impl DfxmlHandler {
    /// Creates a handler with no document state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provenance read from the document's creator block.
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Source image names read from the document.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    fn handle_byte_run(&mut self, attrs: &[(String, String)]) -> Result<()> {
        if let Some(runs) = self.byte_runs.as_mut() {
            runs.push(parse_byte_run(attrs)?);
        }
        Ok(())
    }

    fn handle_file_field(
        &mut self,
        name: &str,
        text: String,
        attrs: &[(String, String)],
    ) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        match name {
            "filename" => file.filename = Some(text),
            "id" => file.id = Some(parse_num(name, &text)?),
            "partition" => file.partition = Some(parse_num(name, &text)?),
            "inode" => file.inode = Some(parse_num(name, &text)?),
            "name_type" => file.name_type = Some(text.parse()?),
            "filesize" => file.filesize = Some(parse_num(name, &text)?),
            "alloc" => file.alloc = Some(parse_bool(name, &text)?),
            "alloc_inode" => file.alloc_inode = Some(parse_bool(name, &text)?),
            "alloc_name" => file.alloc_name = Some(parse_bool(name, &text)?),
            "mode" => file.mode = Some(parse_mode(&text)?),
            "uid" => file.uid = Some(parse_num(name, &text)?),
            "gid" => file.gid = Some(parse_num(name, &text)?),
            "nlink" => file.nlink = Some(parse_num(name, &text)?),
            "error" => file.error = Some(text),
            "mtime" | "atime" | "ctime" | "crtime" => {
                if !text.is_empty() {
                    let ts_name = TimestampName::from_str(name)?;
                    file.set_timestamp(ts_name, parse_timestamp(name, &text, attrs)?);
                }
            }
            "hashdigest" => {
                let type_str = attr(attrs, "type").unwrap_or_default();
                // Digests other than md5/sha1 are outside the model
                if let Ok(hash_type) = type_str.parse::<HashType>() {
                    file.hashes.set(hash_type, text);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_document_field(&mut self, name: &str, text: String) -> Result<()> {
        let in_creator = self.context.within("creator");
        let in_environment = self.context.within("execution_environment");
        let prov = &mut self.provenance;
        match name {
            "program" if in_creator => prov.program = Some(text),
            "version" if in_creator && !in_environment => prov.program_version = Some(text),
            "command_line" => prov.command_line = Some(text),
            "type" if self.context.within("metadata") => prov.dc_type = Some(text),
            "image_filename" => self.sources.push(text),
            "start_time" if in_environment => {
                let time = Timestamp::parse_iso8601(&text)
                    .map_err(|e| Error::decoding(name, text.as_str(), "execution_environment", e))?;
                prov.start_time = Some(time);
            }
            "os_sysname" | "os_release" | "os_version" | "host" | "arch" if in_environment => {
                let host = prov.host.get_or_insert_with(HostInfo::default);
                let slot = match name {
                    "os_sysname" => &mut host.sysname,
                    "os_release" => &mut host.release,
                    "os_version" => &mut host.version,
                    "host" => &mut host.host,
                    _ => &mut host.arch,
                };
                *slot = Some(text);
            }
            _ => {}
        }
        Ok(())
    }
}

impl ElementHandler for DfxmlHandler {
    fn start(&mut self, name: &str, attrs: Attributes) -> Result<()> {
        match name {
            n if is_file_element(n) => {
                self.file = Some(FileObject::new());
            }
            "byte_runs" if self.file.is_some() => {
                let facet = match attr(&attrs, "facet") {
                    Some(f) => f.parse()?,
                    None => ByteRunFacet::Data,
                };
                // Inode and name runs do not locate file content
                if facet == ByteRunFacet::Data {
                    let mut runs = ByteRuns::new();
                    runs.facet = Some(facet);
                    self.byte_runs = Some(runs);
                }
            }
            "byte_run" => self.handle_byte_run(&attrs)?,
            _ => {}
        }
        self.context.push(name.to_string(), attrs);
        Ok(())
    }

    fn text(&mut self, text: &str) {
        self.context.text.push_str(text);
    }

    fn end(&mut self, name: &str) -> Result<Option<Object>> {
        let text = self.context.text.trim().to_string();
        let attrs = std::mem::take(&mut self.context.attrs);
        self.context.pop();

        if is_file_element(name) {
            if let Some(file) = self.file.take() {
                trace!(filename = ?file.filename, "fileobject");
                return Ok(Some(Object::File(file)));
            }
            return Ok(None);
        }

        if name == "byte_runs" {
            if let (Some(runs), Some(file)) = (self.byte_runs.take(), self.file.as_mut()) {
                file.byte_runs = Some(runs);
            }
            return Ok(None);
        }

        // Only direct children of the file element describe the file
        if self.context.current().is_some_and(is_file_element) {
            self.handle_file_field(name, text, &attrs)?;
        } else if self.file.is_none() {
            self.handle_document_field(name, text)?;
        }
        Ok(None)
    }
}

fn parse_num<T>(field: &str, text: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    text.parse()
        .map_err(|e| Error::decoding(field, text, "fileobject", e))
}

/// Parses a boolean value from a string.
///
/// Accepts "1", "0", "true", "false" (case-insensitive).
fn parse_bool(field: &str, text: &str) -> Result<bool> {
    match text.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::decoding(field, text, "fileobject", "expected 0, 1, true or false")),
    }
}

/// Parses a mode, treating a leading zero as octal.
fn parse_mode(text: &str) -> Result<u32> {
    let parsed = if text.len() > 1 && text.starts_with('0') {
        u32::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    };
    parsed.map_err(|e| Error::decoding("mode", text, "fileobject", e))
}

fn parse_timestamp(field: &str, text: &str, attrs: &[(String, String)]) -> Result<Timestamp> {
    let mut ts =
        Timestamp::parse(text).map_err(|e| Error::decoding(field, text, "fileobject", e))?;
    if let Some(prec) = attr(attrs, "prec") {
        ts.prec = Some(
            prec.parse()
                .map_err(|e| Error::decoding("prec", prec, field, e))?,
        );
    }
    Ok(ts)
}

/// Parses byte_run element attributes into a ByteRun.
pub(crate) fn parse_byte_run(attrs: &[(String, String)]) -> Result<ByteRun> {
    let mut br = ByteRun::new();
    for (key, value) in attrs {
        let decode = |e: std::num::ParseIntError| {
            Error::decoding(key.as_str(), value.as_str(), "byte_run", e)
        };
        match key.as_str() {
            "img_offset" => br.img_offset = Some(value.parse().map_err(decode)?),
            "fs_offset" => br.fs_offset = Some(value.parse().map_err(decode)?),
            "file_offset" => br.file_offset = Some(value.parse().map_err(decode)?),
            "len" => br.len = Some(value.parse().map_err(decode)?),
            "fill" => br.fill = Some(value.parse().map_err(decode)?),
            "uncompressed_len" => br.uncompressed_len = Some(value.parse().map_err(decode)?),
            _ => {}
        }
    }
    Ok(br)
}
