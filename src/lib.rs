//! DFXML and RegXML processing for forensic workflows.
//!
//! This crate reads Digital Forensics XML (file system metadata produced by
//! tools such as fiwalk) and RegXML (Windows Registry hive structure) as a
//! stream of objects, and builds small tools on top of that stream.
//!
//! # Features
//!
//! - **Streaming Reader**: one completed [`FileObject`] or [`CellObject`] at a
//!   time, with memory bounded by document depth.
//! - **Extraction**: resolve byte runs against a raw image, write the content
//!   out and verify it against the recorded digests.
//! - **Writers**: DFXML and flattened RegXML reports with provenance.
//! - **Hash lists**: sha1deep and hashdeep output.
//! - **Serde Support**: Optional serialization with the `serde` feature.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dfxml_tools::reader::{DocumentReader, Object};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let file = File::open("fiwalk_output.xml").unwrap();
//! for obj in DocumentReader::from_reader(BufReader::new(file)) {
//!     if let Object::File(file) = obj.unwrap() {
//!         println!("File: {:?}, Size: {:?}", file.filename, file.filesize);
//!     }
//! }
//! ```
//!
//! # Extracting registry hives
//!
//! ```rust,no_run
//! use dfxml_tools::extract::{ExtractConfig, ExtractionReport, HiveExtractor};
//! use dfxml_tools::image::RawImage;
//! use dfxml_tools::reader::DocumentReader;
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let mut image = RawImage::open("image.raw").unwrap();
//! let dfxml = BufReader::new(File::open("image.xml").unwrap());
//! let extractor = HiveExtractor::new(ExtractConfig::new("hives").allocated_only(true));
//! let mut report = ExtractionReport::new();
//! extractor
//!     .run(DocumentReader::from_reader(dfxml), &mut image, &mut report)
//!     .unwrap();
//! println!("{} hives, {} warnings", report.extracted.len(), report.warnings.len());
//! ```
//!
//! # Module Structure
//!
//! - [`objects`] - Data structures
//! - [`reader`] - Streaming XML parser
//! - [`writer`] - XML output
//! - [`image`] - Image sources and byte-run resolution
//! - [`extract`] - Extraction with verification
//! - [`hashing`], [`hashlist`], [`search`], [`flatten`] - Consumers
//! - [`error`] - Error types
//!
//! # Optional Features
//!
//! - `serde` - Enable serde serialization/deserialization support
//! - `cli` - Command-line tools, directory walking and logging setup

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
pub mod flatten;
pub mod hashing;
pub mod hashlist;
pub mod image;
pub mod objects;
pub mod reader;
pub mod search;
pub mod writer;

#[cfg(feature = "cli")]
pub mod logging;
#[cfg(feature = "cli")]
pub mod walk;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};
pub use objects::{
    ByteRun, ByteRuns, CellObject, DFXMLObject, FileObject, HashType, Hashes, Provenance,
    RegXMLObject, RegistryObject, Timestamp,
};
pub use reader::{parse_cells, parse_file_objects, read_regxml, DocumentReader, Object, ReaderKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
