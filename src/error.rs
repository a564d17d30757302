//! Error types for the DFXML tools library.
//!
//! Errors fall into a few families. Structural errors mean the input does not
//! follow the expected DFXML/RegXML layout and the parse is aborted. Decoding
//! errors carry the raw attribute or text value that could not be decoded
//! together with the element it came from. I/O errors cover both the XML
//! input and image reads during extraction.

use thiserror::Error;

/// Errors that can occur when working with DFXML and RegXML data.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// XML attribute parsing error
    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Invalid timestamp format
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestamp(String),

    /// Invalid hash value
    #[error("Invalid hash value for {hash_type}: {message}")]
    InvalidHash {
        /// The hash algorithm type that was invalid
        hash_type: String,
        /// Description of why the hash was invalid
        message: String,
    },

    /// Invalid byte run
    #[error("Invalid byte run: {0}")]
    InvalidByteRun(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid precision format
    #[error("Invalid precision format: {0}")]
    InvalidPrecision(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Integer parsing error
    #[error("Integer parsing error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// An element the dispatcher has no rule for
    #[error("Unexpected XML element <{element}> (inside {context})")]
    UnexpectedElement {
        /// Local name of the offending element
        element: String,
        /// Path of the enclosing elements
        context: String,
    },

    /// A key closed with a cellpath already present in the registry index
    #[error("Same key path found more than once: {0}")]
    DuplicateCellpath(String),

    /// A key violated the root ⇔ no-parent invariant
    #[error("Root invariant violated for {cellpath}: root={root}, parent={parent:?}")]
    RootInvariant {
        /// Cellpath of the offending key
        cellpath: String,
        /// Value of the key's root flag
        root: bool,
        /// Parent cellpath found on the stack, if any
        parent: Option<String>,
    },

    /// A cell element appeared where it has no valid owner
    #[error("Misplaced <{element}>: {message}")]
    Misplaced {
        /// Local name of the element
        element: String,
        /// What was missing
        message: String,
    },

    /// A `<string>` element inside a value whose type has no string list
    #[error("String element found under {cellpath}, but its type ({data_type}) can't support a string list")]
    StringListUnsupported {
        /// Cellpath of the enclosing value
        cellpath: String,
        /// Data type of the enclosing value
        data_type: String,
    },

    /// An attribute or text value could not be decoded
    #[error("Cannot decode {field}={raw:?} in <{element}>: {message}")]
    Decoding {
        /// Attribute or child element name
        field: String,
        /// The raw, undecoded value
        raw: String,
        /// Element (or cellpath) the value belongs to
        element: String,
        /// Why decoding failed
        message: String,
    },

    /// A read outside the bounds of an image source
    #[error("Image read out of bounds: offset {offset} + len {len} exceeds image size {size}")]
    ImageBounds {
        /// Requested offset
        offset: u64,
        /// Requested length
        len: u64,
        /// Size of the image source
        size: u64,
    },
}

impl Error {
    /// Returns true for errors caused by input that does not follow the
    /// expected document structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedElement { .. }
                | Error::DuplicateCellpath(_)
                | Error::RootInvariant { .. }
                | Error::Misplaced { .. }
                | Error::StringListUnsupported { .. }
        )
    }

    pub(crate) fn decoding(
        field: impl Into<String>,
        raw: impl Into<String>,
        element: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Error::Decoding {
            field: field.into(),
            raw: raw.into(),
            element: element.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for DFXML operations.
pub type Result<T> = std::result::Result<T, Error>;
