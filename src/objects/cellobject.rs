//! CellObject - a registry key or value described by RegXML.

use crate::error::{Error, Result};
use crate::objects::common::{ByteRun, ByteRuns, Timestamp};
use base64::prelude::*;
use std::fmt;

/// Path separator inside a cellpath.
pub const CELLPATH_SEPARATOR: char = '\\';

/// Whether a cell is a key or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKind {
    /// Registry key (node)
    Key,
    /// Registry value
    Value,
}

impl CellKind {
    /// Returns the `name_type` text written for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellKind::Key => "k",
            CellKind::Value => "v",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Windows registry value data types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegDataType {
    /// REG_SZ
    String,
    /// REG_EXPAND_SZ
    ExpandString,
    /// REG_MULTI_SZ
    MultiString,
    /// REG_DWORD
    Dword,
    /// REG_QWORD
    Qword,
    /// REG_BINARY
    Binary,
    /// REG_NONE
    None,
    /// REG_FULL_RESOURCE_DESCRIPTOR
    FullResourceDescriptor,
    /// REG_RESOURCE_LIST
    ResourceList,
    /// A type token with no known mapping, kept verbatim
    Other(String),
}

impl RegDataType {
    /// Maps a RegXML `type` attribute to a data type.
    ///
    /// `type="none"` with base64-encoded content is a string that the
    /// producer could not represent as text.
    pub fn from_regxml(token: &str, encoding: Option<&str>) -> Self {
        match (token, encoding) {
            ("none", Some("base64")) => RegDataType::String,
            ("string", _) => RegDataType::String,
            ("expand", _) => RegDataType::ExpandString,
            ("string-list", _) => RegDataType::MultiString,
            ("int32", _) => RegDataType::Dword,
            ("int64", _) => RegDataType::Qword,
            ("binary", _) => RegDataType::Binary,
            ("unknown", _) => RegDataType::None,
            ("resource-requirements", _) => RegDataType::FullResourceDescriptor,
            ("resource-list", _) => RegDataType::ResourceList,
            (other, _) => RegDataType::Other(other.to_string()),
        }
    }

    /// Returns the Windows name of this type, or the raw token for
    /// unmapped types.
    pub fn as_str(&self) -> &str {
        match self {
            RegDataType::String => "REG_SZ",
            RegDataType::ExpandString => "REG_EXPAND_SZ",
            RegDataType::MultiString => "REG_MULTI_SZ",
            RegDataType::Dword => "REG_DWORD",
            RegDataType::Qword => "REG_QWORD",
            RegDataType::Binary => "REG_BINARY",
            RegDataType::None => "REG_NONE",
            RegDataType::FullResourceDescriptor => "REG_FULL_RESOURCE_DESCRIPTOR",
            RegDataType::ResourceList => "REG_RESOURCE_LIST",
            RegDataType::Other(token) => token,
        }
    }

    /// Returns true if values of this type carry a list of strings.
    pub fn has_string_list(&self) -> bool {
        matches!(self, RegDataType::MultiString)
    }
}

impl fmt::Display for RegDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decoded view of a value's payload. See [`CellObject::value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellData {
    /// Text payload, as recorded
    Text(String),
    /// The members of a multi-string value
    Strings(Vec<String>),
    /// Payload recorded with `encoding="base64"`, decoded
    Bytes(Vec<u8>),
}

/// A registry cell: either a key or a value.
///
/// `parent` holds the parent key's cellpath rather than a reference, so
/// cells can be emitted and dropped independently of their ancestors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellObject {
    /// Backslash-delimited path from the hive root
    pub cellpath: String,
    /// Last path component
    pub basename: String,
    /// Key or value
    pub kind: CellKind,
    /// Cellpath of the enclosing key
    pub parent: Option<String>,
    /// True for the hive's root key
    pub root: bool,
    /// Value data type (values only)
    pub data_type: Option<RegDataType>,
    /// Raw payload text (values only)
    pub data: Option<String>,
    /// `encoding` attribute of the payload, if any
    pub data_encoding: Option<String>,
    /// Members of a multi-string value
    pub strings: Option<Vec<String>>,
    /// Last-written time
    pub mtime: Option<Timestamp>,
    /// Location of the cell in the hive file
    pub byte_runs: Option<ByteRuns>,
}

impl CellObject {
    fn new(kind: CellKind, basename: String, parent: Option<&str>) -> Self {
        let cellpath = match parent {
            Some(parent) => format!("{}{}{}", parent, CELLPATH_SEPARATOR, basename),
            None => format!("{}{}", CELLPATH_SEPARATOR, basename),
        };
        Self {
            cellpath,
            basename,
            kind,
            parent: parent.map(str::to_string),
            root: parent.is_none(),
            data_type: None,
            data: None,
            data_encoding: None,
            strings: None,
            mtime: None,
            byte_runs: None,
        }
    }

    /// Creates a key under `parent` (a cellpath), or a root key when `None`.
    pub fn new_key(basename: impl Into<String>, parent: Option<&str>) -> Self {
        Self::new(CellKind::Key, basename.into(), parent)
    }

    /// Creates a value under the key at `parent`.
    ///
    /// Multi-string types start with an empty string list.
    pub fn new_value(basename: impl Into<String>, parent: &str, data_type: RegDataType) -> Self {
        let mut cell = Self::new(CellKind::Value, basename.into(), Some(parent));
        cell.root = false;
        if data_type.has_string_list() {
            cell.strings = Some(Vec::new());
        }
        cell.data_type = Some(data_type);
        cell
    }

    /// Returns true for keys.
    pub fn is_key(&self) -> bool {
        self.kind == CellKind::Key
    }

    /// Appends one member to a multi-string value.
    pub fn append_string(&mut self, s: String) -> Result<()> {
        match self.strings.as_mut() {
            Some(strings) => {
                strings.push(s);
                Ok(())
            }
            None => Err(Error::StringListUnsupported {
                cellpath: self.cellpath.clone(),
                data_type: self
                    .data_type
                    .as_ref()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "none".to_string()),
            }),
        }
    }

    /// Appends a byte run to the cell's location.
    pub fn push_byte_run(&mut self, run: ByteRun) {
        self.byte_runs.get_or_insert_with(ByteRuns::new).push(run);
    }

    /// Returns the payload decoded according to its recorded encoding.
    ///
    /// The stored `data` is never altered; base64 payloads are decoded on
    /// each call.
    pub fn value(&self) -> Result<Option<CellData>> {
        if let Some(strings) = &self.strings {
            return Ok(Some(CellData::Strings(strings.clone())));
        }
        let Some(data) = &self.data else {
            return Ok(None);
        };
        match self.data_encoding.as_deref() {
            Some("base64") => BASE64_STANDARD
                .decode(data.trim())
                .map(|bytes| Some(CellData::Bytes(bytes)))
                .map_err(|e| Error::decoding("value", data.as_str(), self.cellpath.as_str(), e)),
            _ => Ok(Some(CellData::Text(data.clone()))),
        }
    }
}

/// Decodes a key or value name according to its `*_encoding` attribute.
pub(crate) fn decode_name(
    raw: &str,
    encoding: Option<&str>,
    field: &str,
    element: &str,
) -> Result<String> {
    match encoding {
        Some("base64") => {
            let bytes = BASE64_STANDARD
                .decode(raw.trim())
                .map_err(|e| Error::decoding(field, raw, element, e))?;
            String::from_utf8(bytes).map_err(|e| Error::decoding(field, raw, element, e))
        }
        _ => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_table() {
        assert_eq!(
            RegDataType::from_regxml("string", None),
            RegDataType::String
        );
        assert_eq!(
            RegDataType::from_regxml("none", Some("base64")),
            RegDataType::String
        );
        assert_eq!(
            RegDataType::from_regxml("none", None),
            RegDataType::Other("none".to_string())
        );
        assert_eq!(RegDataType::from_regxml("int32", None).as_str(), "REG_DWORD");
        assert_eq!(RegDataType::from_regxml("int64", None).as_str(), "REG_QWORD");
        assert_eq!(
            RegDataType::from_regxml("resource-requirements", None).as_str(),
            "REG_FULL_RESOURCE_DESCRIPTOR"
        );
        assert_eq!(
            RegDataType::from_regxml("REG_LINK", None).as_str(),
            "REG_LINK"
        );
    }

    #[test]
    fn test_cellpaths() {
        let root = CellObject::new_key("ROOT", None);
        assert_eq!(root.cellpath, "\\ROOT");
        assert!(root.root);
        assert!(root.parent.is_none());

        let child = CellObject::new_key("Software", Some(&root.cellpath));
        assert_eq!(child.cellpath, "\\ROOT\\Software");
        assert_eq!(child.parent.as_deref(), Some("\\ROOT"));
        assert!(!child.root);

        let value = CellObject::new_value("Version", &child.cellpath, RegDataType::String);
        assert_eq!(value.cellpath, "\\ROOT\\Software\\Version");
        assert_eq!(value.kind.as_str(), "v");
        assert!(!value.is_key());
    }

    #[test]
    fn test_string_list() {
        let mut multi = CellObject::new_value("Paths", "\\ROOT", RegDataType::MultiString);
        multi.append_string("a".to_string()).unwrap();
        multi.append_string("b".to_string()).unwrap();
        assert_eq!(
            multi.value().unwrap(),
            Some(CellData::Strings(vec!["a".to_string(), "b".to_string()]))
        );

        let mut dword = CellObject::new_value("Count", "\\ROOT", RegDataType::Dword);
        let err = dword.append_string("x".to_string()).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_decoded_payload() {
        let mut value = CellObject::new_value("Blob", "\\ROOT", RegDataType::Binary);
        assert_eq!(value.value().unwrap(), None);

        value.data = Some("AAEC".to_string());
        assert_eq!(
            value.value().unwrap(),
            Some(CellData::Text("AAEC".to_string()))
        );

        value.data_encoding = Some("base64".to_string());
        assert_eq!(
            value.value().unwrap(),
            Some(CellData::Bytes(vec![0, 1, 2]))
        );
        assert_eq!(value.data.as_deref(), Some("AAEC"));

        value.data = Some("not base64!".to_string());
        assert!(matches!(value.value(), Err(Error::Decoding { .. })));
    }

    #[test]
    fn test_decode_name() {
        assert_eq!(decode_name("Run", None, "name", "key").unwrap(), "Run");
        assert_eq!(
            decode_name("UnVu", Some("base64"), "name", "key").unwrap(),
            "Run"
        );
        assert!(decode_name("%%%", Some("base64"), "name", "key").is_err());
        // 0xff is not valid UTF-8
        assert!(decode_name("/w==", Some("base64"), "name", "key").is_err());
    }
}
