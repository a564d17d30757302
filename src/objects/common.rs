//! Common types shared across DFXML and RegXML objects.
//!
//! This module contains foundational types used throughout the crate:
//! - [`Hashes`] - Recorded hash digests
//! - [`Timestamp`] - Forensic timestamps with precision
//! - [`ByteRun`] - A contiguous run of bytes in the file, file system or image
//! - [`ByteRuns`] - An ordered collection of byte runs

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Namespaces and Constants
// ============================================================================

/// DFXML schema version written by this crate
pub const DFXML_VERSION: &str = "1.1.1";

/// RegXML schema version written by this crate
pub const REGXML_VERSION: &str = "0.2";

/// Dublin Core namespace
pub const XMLNS_DC: &str = "http://purl.org/dc/elements/1.1/";

/// DFXML namespace
pub const XMLNS_DFXML: &str = "http://www.forensicswiki.org/wiki/Category:Digital_Forensics_XML";

/// RegXML namespace
pub const XMLNS_REGXML: &str = "http://www.forensicswiki.org/wiki/RegXML";

// ============================================================================
// Hash Types
// ============================================================================

/// Hash algorithms recorded on file objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HashType {
    /// MD5 (128-bit)
    Md5,
    /// SHA-1 (160-bit)
    Sha1,
}

impl HashType {
    /// Returns the expected length of the hash in hexadecimal characters.
    pub fn expected_hex_len(&self) -> usize {
        match self {
            HashType::Md5 => 32,
            HashType::Sha1 => 40,
        }
    }

    /// Returns the XML attribute value for this hash type.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha1",
        }
    }
}

impl FromStr for HashType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(HashType::Md5),
            "sha1" | "sha-1" => Ok(HashType::Sha1),
            _ => Err(Error::InvalidHash {
                hash_type: s.to_string(),
                message: "Unknown hash type".to_string(),
            }),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recorded hash digests of an object's content.
///
/// All hashes are stored as lowercase hexadecimal strings. An absent digest
/// means "unknown", never "empty".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hashes {
    /// MD5 hash (32 hex characters)
    pub md5: Option<String>,
    /// SHA-1 hash (40 hex characters)
    pub sha1: Option<String>,
}

impl Hashes {
    /// Creates a new empty Hashes collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any hash is set.
    pub fn has_any(&self) -> bool {
        self.md5.is_some() || self.sha1.is_some()
    }

    /// Sets a hash value by type.
    pub fn set(&mut self, hash_type: HashType, value: String) {
        let normalized = value.to_lowercase();
        match hash_type {
            HashType::Md5 => self.md5 = Some(normalized),
            HashType::Sha1 => self.sha1 = Some(normalized),
        }
    }

    /// Gets a hash value by type.
    pub fn get(&self, hash_type: HashType) -> Option<&str> {
        match hash_type {
            HashType::Md5 => self.md5.as_deref(),
            HashType::Sha1 => self.sha1.as_deref(),
        }
    }

    /// Returns the strongest recorded digest, preferring SHA-1 over MD5.
    pub fn preferred(&self) -> Option<(HashType, &str)> {
        self.get(HashType::Sha1)
            .map(|v| (HashType::Sha1, v))
            .or_else(|| self.get(HashType::Md5).map(|v| (HashType::Md5, v)))
    }

    /// Iterates over all set hashes.
    pub fn iter(&self) -> impl Iterator<Item = (HashType, &str)> {
        [
            (HashType::Md5, self.md5.as_deref()),
            (HashType::Sha1, self.sha1.as_deref()),
        ]
        .into_iter()
        .filter_map(|(t, v)| v.map(|val| (t, val)))
    }
}

// ============================================================================
// Timestamp Types
// ============================================================================

/// Time unit for precision specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    /// Days
    Day,
    /// Seconds
    Second,
    /// Milliseconds
    Millisecond,
    /// Nanoseconds
    Nanosecond,
}

impl TimeUnit {
    /// Returns the string representation of this time unit.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "d",
            TimeUnit::Second => "s",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Nanosecond => "ns",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "d" => Ok(TimeUnit::Day),
            "s" | "" => Ok(TimeUnit::Second),
            "ms" => Ok(TimeUnit::Millisecond),
            "ns" => Ok(TimeUnit::Nanosecond),
            _ => Err(Error::InvalidPrecision(format!("Unknown time unit: {}", s))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timestamp precision as (resolution, unit).
///
/// For example, `Precision { resolution: 100, unit: TimeUnit::Nanosecond }`
/// represents 100ns precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Precision {
    /// The numeric resolution value
    pub resolution: i32,
    /// The time unit (seconds, milliseconds, etc.)
    pub unit: TimeUnit,
}

impl Precision {
    /// Creates a new Precision with the given resolution and unit.
    pub fn new(resolution: i32, unit: TimeUnit) -> Self {
        Self { resolution, unit }
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // "100ns", "1s", "1d", or a bare number of seconds
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidPrecision(
                "Empty precision string".to_string(),
            ));
        }

        let digit_end = s
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit() && *c != '-')
            .map(|(i, _)| i)
            .unwrap_or(s.len());

        if digit_end == 0 {
            return Err(Error::InvalidPrecision(format!(
                "No numeric value in precision: {}",
                s
            )));
        }

        let resolution: i32 = s[..digit_end].parse()?;
        let unit = s[digit_end..].parse()?;

        Ok(Precision { resolution, unit })
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.resolution, self.unit)
    }
}

/// The file timestamps tracked on a [`FileObject`](crate::objects::FileObject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimestampName {
    /// Modification time
    Mtime,
    /// Access time
    Atime,
    /// Change time (inode change on Unix)
    Ctime,
    /// Creation time
    Crtime,
}

impl TimestampName {
    /// All timestamp names, in the order they are written.
    pub const ALL: [TimestampName; 4] = [
        TimestampName::Mtime,
        TimestampName::Ctime,
        TimestampName::Atime,
        TimestampName::Crtime,
    ];

    /// Returns the XML element name for this timestamp type.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampName::Mtime => "mtime",
            TimestampName::Atime => "atime",
            TimestampName::Ctime => "ctime",
            TimestampName::Crtime => "crtime",
        }
    }
}

impl FromStr for TimestampName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mtime" => Ok(TimestampName::Mtime),
            "atime" => Ok(TimestampName::Atime),
            "ctime" => Ok(TimestampName::Ctime),
            "crtime" => Ok(TimestampName::Crtime),
            _ => Err(Error::InvalidTimestamp(format!(
                "Unknown timestamp name: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for TimestampName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A forensic timestamp with optional precision.
///
/// Wraps a `DateTime<FixedOffset>` so that both second-resolution `time_t`
/// values and nanosecond ISO 8601 values survive a parse/write cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp {
    /// The actual time value
    pub time: DateTime<FixedOffset>,
    /// Precision information
    pub prec: Option<Precision>,
}

impl Timestamp {
    /// Creates a timestamp without precision information.
    pub fn new(time: DateTime<FixedOffset>) -> Self {
        Self { time, prec: None }
    }

    /// Parses timestamp text as written by fiwalk and RegXML producers.
    ///
    /// Accepts ISO 8601 (with or without an offset, naive values are UTC)
    /// and `time_t` epoch seconds with an optional fractional part.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let time = if is_epoch_seconds(s) {
            Self::parse_time_t(s)?
        } else {
            Self::parse_iso8601(s)?
        };
        Ok(Self::new(time))
    }

    /// Parses `time_t` epoch seconds, e.g. `1424301600` or `1424301600.25`.
    pub fn parse_time_t(s: &str) -> Result<DateTime<FixedOffset>> {
        let invalid = || Error::InvalidTimestamp(format!("Cannot parse time_t: {}", s));
        let (secs, frac) = match s.split_once('.') {
            Some((secs, frac)) => (secs, frac),
            None => (s, ""),
        };
        let secs: i64 = secs.parse().map_err(|_| invalid())?;
        let nanos = if frac.is_empty() {
            0
        } else {
            // Right-pad to nine digits, drop anything finer than a nanosecond
            let digits: String = frac.chars().chain("000000000".chars()).take(9).collect();
            digits.parse::<u32>().map_err(|_| invalid())?
        };
        DateTime::from_timestamp(secs, nanos)
            .map(|dt| dt.fixed_offset())
            .ok_or_else(invalid)
    }

    /// Parses an ISO 8601 timestamp string.
    pub fn parse_iso8601(s: &str) -> Result<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt);
        }

        let formats = [
            "%Y-%m-%dT%H:%M:%S%.fZ",
            "%Y-%m-%dT%H:%M:%SZ",
            "%Y-%m-%dT%H:%M:%S%.f%:z",
            "%Y-%m-%dT%H:%M:%S%:z",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S",
        ];

        for fmt in formats {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(dt);
            }
            // No offset in the text: assume UTC
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
            }
        }

        Err(Error::InvalidTimestamp(format!(
            "Cannot parse timestamp: {}",
            s
        )))
    }

    /// Returns the Unix timestamp (seconds since epoch).
    pub fn timestamp(&self) -> i64 {
        self.time.timestamp()
    }
}

fn is_epoch_seconds(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.time.to_rfc3339())
    }
}

// ============================================================================
// ByteRun Types
// ============================================================================

/// The facet (aspect) of a file that byte runs describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ByteRunFacet {
    /// Data content byte runs (default)
    #[default]
    Data,
    /// Inode/metadata byte runs
    Inode,
    /// Filename byte runs
    Name,
}

impl ByteRunFacet {
    /// Returns the XML attribute value for this facet.
    pub fn as_str(&self) -> &'static str {
        match self {
            ByteRunFacet::Data => "data",
            ByteRunFacet::Inode => "inode",
            ByteRunFacet::Name => "name",
        }
    }
}

impl FromStr for ByteRunFacet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data" | "" => Ok(ByteRunFacet::Data),
            "inode" => Ok(ByteRunFacet::Inode),
            "name" => Ok(ByteRunFacet::Name),
            _ => Err(Error::InvalidByteRun(format!("unknown facet {:?}", s))),
        }
    }
}

/// A contiguous run of bytes representing data location.
///
/// Byte runs can specify locations in multiple coordinate systems:
/// - `img_offset`: Offset from the start of the disk image
/// - `fs_offset`: Offset from the start of the file system
/// - `file_offset`: Offset from the start of the logical file
///
/// A run with a `fill` byte and no offsets describes a sparse region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteRun {
    /// Offset from image start (bytes)
    pub img_offset: Option<u64>,
    /// Offset from file system start (bytes)
    pub fs_offset: Option<u64>,
    /// Offset from file start (bytes)
    pub file_offset: Option<u64>,
    /// Length of the run (bytes)
    pub len: Option<u64>,
    /// Fill byte for sparse regions
    pub fill: Option<u8>,
    /// Uncompressed length (if compressed)
    pub uncompressed_len: Option<u64>,
}

impl ByteRun {
    /// Creates a new empty byte run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a byte run with image offset and length.
    pub fn with_img_offset(img_offset: u64, len: u64) -> Self {
        Self {
            img_offset: Some(img_offset),
            len: Some(len),
            ..Default::default()
        }
    }

    /// Creates a byte run with file offset and length.
    pub fn with_file_offset(file_offset: u64, len: u64) -> Self {
        Self {
            file_offset: Some(file_offset),
            len: Some(len),
            ..Default::default()
        }
    }

    /// Returns the number of content bytes this run contributes.
    ///
    /// Falls back to `uncompressed_len` when `len` is not recorded.
    pub fn effective_len(&self) -> Option<u64> {
        self.len.or(self.uncompressed_len)
    }

    /// Returns true if any offset field is present.
    pub fn has_offset(&self) -> bool {
        self.img_offset.is_some() || self.fs_offset.is_some() || self.file_offset.is_some()
    }
}

/// An ordered collection of byte runs.
///
/// Order is extraction order: concatenating the content of each run in
/// sequence reconstructs the object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteRuns {
    /// The facet these runs describe
    pub facet: Option<ByteRunFacet>,
    runs: Vec<ByteRun>,
}

impl ByteRuns {
    /// Creates a new empty ByteRuns collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of byte runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if there are no byte runs.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Appends a byte run to the collection.
    pub fn push(&mut self, run: ByteRun) {
        self.runs.push(run);
    }

    /// Returns an iterator over the byte runs.
    pub fn iter(&self) -> std::slice::Iter<'_, ByteRun> {
        self.runs.iter()
    }

    /// Returns the total content length of all byte runs.
    pub fn total_len(&self) -> Option<u64> {
        let mut total = 0u64;
        for run in &self.runs {
            total += run.effective_len()?;
        }
        Some(total)
    }

    /// Gets a byte run by index.
    pub fn get(&self, index: usize) -> Option<&ByteRun> {
        self.runs.get(index)
    }
}

impl<'a> IntoIterator for &'a ByteRuns {
    type Item = &'a ByteRun;
    type IntoIter = std::slice::Iter<'a, ByteRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

impl FromIterator<ByteRun> for ByteRuns {
    fn from_iter<I: IntoIterator<Item = ByteRun>>(iter: I) -> Self {
        Self {
            facet: None,
            runs: iter.into_iter().collect(),
        }
    }
}

impl std::ops::Index<usize> for ByteRuns {
    type Output = ByteRun;

    fn index(&self, index: usize) -> &Self::Output {
        &self.runs[index]
    }
}
