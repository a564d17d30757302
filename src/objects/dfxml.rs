//! Report documents: [`DFXMLObject`] and [`RegXMLObject`].
//!
//! Both carry a [`Provenance`] block describing the program run that
//! produced them, followed by the objects the run emitted in order.

use crate::objects::cellobject::CellObject;
use crate::objects::common::{DFXML_VERSION, REGXML_VERSION};
use crate::objects::fileobject::FileObject;
use chrono::{DateTime, FixedOffset, Local};
use sysinfo::System;

/// Operating system details of the host that produced a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostInfo {
    /// OS name, e.g. "Linux"
    pub sysname: Option<String>,
    /// Kernel release
    pub release: Option<String>,
    /// OS version
    pub version: Option<String>,
    /// Host name
    pub host: Option<String>,
    /// Machine architecture
    pub arch: Option<String>,
}

impl HostInfo {
    /// Collects host details from the running system.
    pub fn current() -> Self {
        Self {
            sysname: System::name(),
            release: System::kernel_version(),
            version: System::os_version(),
            host: System::host_name(),
            arch: Some(std::env::consts::ARCH.to_string()),
        }
    }

    /// Iterates over the recorded fields as (element name, value).
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("os_sysname", self.sysname.as_deref()),
            ("os_release", self.release.as_deref()),
            ("os_version", self.version.as_deref()),
            ("host", self.host.as_deref()),
            ("arch", self.arch.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k, v)))
    }
}

/// Who produced a report, when, and how.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Provenance {
    /// Program that created the report
    pub program: Option<String>,
    /// Version of the creating program
    pub program_version: Option<String>,
    /// Command line used to create the report
    pub command_line: Option<String>,
    /// When the run started
    pub start_time: Option<DateTime<FixedOffset>>,
    /// Dublin Core `dc:type`
    pub dc_type: Option<String>,
    /// Execution environment
    pub host: Option<HostInfo>,
}

impl Provenance {
    /// Creates provenance for a program and version.
    pub fn new(program: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
            program_version: Some(version.into()),
            ..Default::default()
        }
    }

    /// Sets the command line.
    pub fn with_command_line(mut self, command_line: impl Into<String>) -> Self {
        self.command_line = Some(command_line.into());
        self
    }

    /// Sets the Dublin Core type.
    pub fn with_dc_type(mut self, dc_type: impl Into<String>) -> Self {
        self.dc_type = Some(dc_type.into());
        self
    }

    /// Records the current time and host environment.
    pub fn capture_environment(mut self) -> Self {
        self.start_time = Some(Local::now().fixed_offset());
        self.host = Some(HostInfo::current());
        self
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        *self == Provenance::default()
    }
}

/// A DFXML report: provenance, sources, and file objects.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DFXMLObject {
    /// DFXML schema version
    pub version: String,
    /// Run metadata
    pub provenance: Provenance,
    /// Source image (or directory) names
    pub sources: Vec<String>,
    files: Vec<FileObject>,
}

impl Default for DFXMLObject {
    fn default() -> Self {
        Self::new()
    }
}

impl DFXMLObject {
    /// Creates an empty document at the current DFXML version.
    pub fn new() -> Self {
        Self {
            version: DFXML_VERSION.to_string(),
            provenance: Provenance::default(),
            sources: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Creates an empty document with the given provenance.
    pub fn with_provenance(provenance: Provenance) -> Self {
        Self {
            provenance,
            ..Self::new()
        }
    }

    /// Adds a source identifier.
    pub fn add_source(&mut self, source: impl Into<String>) {
        self.sources.push(source.into());
    }

    /// Appends a file to the document.
    pub fn append_file(&mut self, file: FileObject) {
        self.files.push(file);
    }

    /// Returns an iterator over files in document order.
    pub fn files(&self) -> impl Iterator<Item = &FileObject> {
        self.files.iter()
    }

    /// Returns the number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// The cells read from one RegXML input.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HiveObject {
    /// Name of the input the cells came from
    pub filename: Option<String>,
    /// Cells in emission order
    pub cells: Vec<CellObject>,
}

impl HiveObject {
    /// Creates an empty hive for the named input.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            cells: Vec::new(),
        }
    }
}

/// A RegXML report: provenance and one flattened hive per input.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegXMLObject {
    /// RegXML schema version
    pub version: String,
    /// Run metadata
    pub provenance: Provenance,
    hives: Vec<HiveObject>,
}

impl Default for RegXMLObject {
    fn default() -> Self {
        Self::new()
    }
}

impl RegXMLObject {
    /// Creates an empty document at the current RegXML version.
    pub fn new() -> Self {
        Self {
            version: REGXML_VERSION.to_string(),
            provenance: Provenance::default(),
            hives: Vec::new(),
        }
    }

    /// Creates an empty document with the given provenance.
    pub fn with_provenance(provenance: Provenance) -> Self {
        Self {
            provenance,
            ..Self::new()
        }
    }

    /// Appends a hive.
    pub fn append_hive(&mut self, hive: HiveObject) {
        self.hives.push(hive);
    }

    /// Returns an iterator over hives.
    pub fn hives(&self) -> impl Iterator<Item = &HiveObject> {
        self.hives.iter()
    }

    /// Returns an iterator over every cell of every hive.
    pub fn iter_cells(&self) -> impl Iterator<Item = &CellObject> {
        self.hives.iter().flat_map(|h| h.cells.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_builder() {
        let prov = Provenance::new("hive_extractor", "0.1.0")
            .with_command_line("hive_extractor image.raw out")
            .with_dc_type("Hash List");
        assert_eq!(prov.program.as_deref(), Some("hive_extractor"));
        assert_eq!(prov.dc_type.as_deref(), Some("Hash List"));
        assert!(prov.host.is_none());
        assert!(Provenance::default().is_empty());

        let prov = prov.capture_environment();
        assert!(prov.start_time.is_some());
        let host = prov.host.unwrap();
        assert!(host.fields().any(|(k, _)| k == "arch"));
    }

    #[test]
    fn test_dfxml_object() {
        let mut doc = DFXMLObject::new();
        assert_eq!(doc.version, DFXML_VERSION);
        doc.add_source("image.raw");
        doc.append_file(FileObject::with_filename("a.txt"));
        doc.append_file(FileObject::with_filename("b.txt"));
        assert_eq!(doc.file_count(), 2);
        let names: Vec<_> = doc.files().filter_map(|f| f.filename.as_deref()).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn test_regxml_object_cells() {
        let mut doc = RegXMLObject::new();
        let mut first = HiveObject::new("SYSTEM.xml");
        first.cells.push(CellObject::new_key("ROOT", None));
        let mut second = HiveObject::new("SOFTWARE.xml");
        second.cells.push(CellObject::new_key("ROOT", None));
        second
            .cells
            .push(CellObject::new_key("Microsoft", Some("\\ROOT")));
        doc.append_hive(first);
        doc.append_hive(second);
        assert_eq!(doc.hives().count(), 2);
        assert_eq!(doc.iter_cells().count(), 3);
    }
}
