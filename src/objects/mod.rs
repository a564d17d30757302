//! DFXML and RegXML object types.
//!
//! - [`FileObject`] - A file with metadata, hashes and byte runs
//! - [`CellObject`] - A registry key or value
//! - [`RegistryObject`] - The per-hive cellpath index of keys
//! - [`DFXMLObject`] / [`RegXMLObject`] - Report documents
//!
//! Also provides common types:
//! - [`ByteRun`] and [`ByteRuns`] - Disk/file location information
//! - [`Timestamp`] - Forensic timestamps with precision
//! - [`Hashes`] - Cryptographic hash values

mod cellobject;
mod common;
mod dfxml;
mod fileobject;
mod registry;

pub(crate) use cellobject::decode_name;
pub use cellobject::{CellData, CellKind, CellObject, RegDataType, CELLPATH_SEPARATOR};
pub use common::{
    ByteRun, ByteRunFacet, ByteRuns, HashType, Hashes, Precision, TimeUnit, Timestamp,
    TimestampName, DFXML_VERSION, REGXML_VERSION, XMLNS_DC, XMLNS_DFXML, XMLNS_REGXML,
};
pub use dfxml::{DFXMLObject, HiveObject, HostInfo, Provenance, RegXMLObject};
pub use fileobject::{FileObject, NameType};
pub use registry::RegistryObject;
