//! FileObject - a file described by fiwalk-style DFXML.
//!
//! Carries the fields the hash converters, search and extraction need:
//! path, size, allocation flags, timestamps, digests and data byte runs.

use crate::objects::common::{ByteRuns, Hashes, Timestamp, TimestampName};

/// File system name type (regular file, directory, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NameType {
    /// Regular file
    Regular,
    /// Directory
    Directory,
    /// Symbolic link
    SymbolicLink,
    /// Block device
    BlockDevice,
    /// Character device
    CharacterDevice,
    /// Named pipe (FIFO)
    Fifo,
    /// Socket
    Socket,
    /// Shadow/whiteout entry
    Shadow,
    /// Virtual file
    Virtual,
    /// Unknown type
    Unknown,
}

impl NameType {
    /// Returns the single-character string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NameType::Regular => "r",
            NameType::Directory => "d",
            NameType::SymbolicLink => "l",
            NameType::BlockDevice => "b",
            NameType::CharacterDevice => "c",
            NameType::Fifo => "p",
            NameType::Socket => "s",
            NameType::Shadow => "w",
            NameType::Virtual => "v",
            NameType::Unknown => "-",
        }
    }
}

impl std::str::FromStr for NameType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // fiwalk emits "r/r", "d/d" etc.; the name half comes first
        let code = s.split('/').next().unwrap_or("");
        Ok(match code.to_lowercase().as_str() {
            "r" | "regular" => NameType::Regular,
            "d" | "directory" => NameType::Directory,
            "l" | "symlink" | "symbolic_link" => NameType::SymbolicLink,
            "b" | "block" => NameType::BlockDevice,
            "c" | "char" | "character" => NameType::CharacterDevice,
            "p" | "fifo" => NameType::Fifo,
            "s" | "socket" => NameType::Socket,
            "w" | "shadow" | "whiteout" => NameType::Shadow,
            "v" | "virtual" => NameType::Virtual,
            _ => NameType::Unknown,
        })
    }
}

/// A file object read from (or written to) DFXML.
///
/// Every field is optional: fiwalk omits what it cannot determine and
/// consumers skip objects missing the fields they need.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileObject {
    // === Identification ===
    /// Unique identifier within the DFXML document
    pub id: Option<u64>,
    /// File path/name
    pub filename: Option<String>,
    /// Partition number
    pub partition: Option<u32>,
    /// Inode number
    pub inode: Option<u64>,
    /// Name type (file, directory, etc.)
    pub name_type: Option<NameType>,

    // === Size ===
    /// Logical file size in bytes
    pub filesize: Option<u64>,

    // === Allocation ===
    /// Overall allocation status
    pub alloc: Option<bool>,
    /// Inode allocation status
    pub alloc_inode: Option<bool>,
    /// Name allocation status
    pub alloc_name: Option<bool>,

    // === Ownership and Permissions ===
    /// File mode/permissions
    pub mode: Option<u32>,
    /// User ID
    pub uid: Option<u32>,
    /// Group ID
    pub gid: Option<u32>,
    /// Number of hard links
    pub nlink: Option<u64>,

    // === Timestamps ===
    /// Modification time
    pub mtime: Option<Timestamp>,
    /// Access time
    pub atime: Option<Timestamp>,
    /// Change time (inode change on Unix)
    pub ctime: Option<Timestamp>,
    /// Creation time
    pub crtime: Option<Timestamp>,

    // === Content ===
    /// Cryptographic hashes of file content
    pub hashes: Hashes,
    /// Data content byte runs, in extraction order
    pub byte_runs: Option<ByteRuns>,

    /// Error message if processing failed
    pub error: Option<String>,
}

impl FileObject {
    /// Creates a new empty FileObject.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a FileObject with a filename.
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    /// Returns the data byte runs, if any were recorded.
    pub fn byte_runs(&self) -> Option<&ByteRuns> {
        self.byte_runs.as_ref()
    }

    /// Returns true if the file is allocated.
    ///
    /// Collapses fiwalk's separate inode/name flags into a single answer.
    /// `None` means nothing was recorded.
    pub fn is_allocated(&self) -> Option<bool> {
        if self.alloc_inode == Some(true) && self.alloc_name == Some(true) {
            return Some(true);
        }

        if self.alloc_inode.is_none() && self.alloc_name.is_none() {
            return self.alloc;
        }

        // Partial allocation information - assume unallocated
        Some(false)
    }

    /// Sets a timestamp by name.
    pub fn set_timestamp(&mut self, name: TimestampName, ts: Timestamp) {
        match name {
            TimestampName::Mtime => self.mtime = Some(ts),
            TimestampName::Atime => self.atime = Some(ts),
            TimestampName::Ctime => self.ctime = Some(ts),
            TimestampName::Crtime => self.crtime = Some(ts),
        }
    }

    /// Gets a timestamp by name.
    pub fn get_timestamp(&self, name: TimestampName) -> Option<&Timestamp> {
        match name {
            TimestampName::Mtime => self.mtime.as_ref(),
            TimestampName::Atime => self.atime.as_ref(),
            TimestampName::Ctime => self.ctime.as_ref(),
            TimestampName::Crtime => self.crtime.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::common::{ByteRun, HashType};

    #[test]
    fn test_file_object_with_filename() {
        let fo = FileObject::with_filename("Windows/System32/config/SYSTEM");
        assert_eq!(
            fo.filename.as_deref(),
            Some("Windows/System32/config/SYSTEM")
        );
        assert!(fo.byte_runs().is_none());
    }

    #[test]
    fn test_is_allocated() {
        let mut fo = FileObject::new();
        assert!(fo.is_allocated().is_none());

        fo.alloc = Some(true);
        assert_eq!(fo.is_allocated(), Some(true));

        fo.alloc_inode = Some(true);
        fo.alloc_name = Some(true);
        assert_eq!(fo.is_allocated(), Some(true));

        fo.alloc_inode = Some(false);
        assert_eq!(fo.is_allocated(), Some(false));

        fo.alloc_inode = None;
        assert_eq!(fo.is_allocated(), Some(false));
    }

    #[test]
    fn test_name_type_from_fiwalk() {
        assert_eq!("r/r".parse::<NameType>().unwrap(), NameType::Regular);
        assert_eq!("d/d".parse::<NameType>().unwrap(), NameType::Directory);
        assert_eq!("?".parse::<NameType>().unwrap(), NameType::Unknown);
    }

    #[test]
    fn test_timestamps_by_name() {
        let mut fo = FileObject::new();
        let ts = Timestamp::parse("2009-01-01T00:00:00Z").unwrap();
        fo.set_timestamp(TimestampName::Crtime, ts.clone());
        assert_eq!(fo.get_timestamp(TimestampName::Crtime), Some(&ts));
        assert!(fo.get_timestamp(TimestampName::Mtime).is_none());
    }

    #[test]
    fn test_file_object_hashes_and_runs() {
        let mut fo = FileObject::new();
        fo.hashes
            .set(HashType::Md5, "d41d8cd98f00b204e9800998ecf8427e".to_string());
        assert!(fo.hashes.has_any());

        let mut runs = ByteRuns::new();
        runs.push(ByteRun::with_img_offset(1024, 512));
        runs.push(ByteRun::with_img_offset(2048, 1024));
        fo.byte_runs = Some(runs);
        assert_eq!(fo.byte_runs().and_then(|r| r.total_len()), Some(1536));
    }
}
