//! Image sources and byte-run content resolution.
//!
//! An [`ImageSource`] reads exact byte ranges from a raw image. Byte runs
//! are resolved to image offsets (image offset first, then file system
//! offset, then file offset) with help from an [`OffsetTranslator`], and
//! [`ByteRuns::contents`] yields one chunk per run, in order.

use crate::error::{Error, Result};
use crate::objects::{ByteRun, ByteRuns};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A byte-addressable source such as a raw disk image.
pub trait ImageSource {
    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// Fails with [`Error::ImageBounds`] when the range extends past the
    /// end of the source.
    fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Total size of the source in bytes.
    fn size(&self) -> u64;
}

fn check_bounds(offset: u64, len: u64, size: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::ImageBounds { offset, len, size }),
    }
}

fn buffer_len(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| Error::InvalidByteRun(format!("length {} too large", len)))
}

/// A raw (dd-style) image file.
///
/// The file handle is held for the lifetime of the value and released on
/// drop.
#[derive(Debug)]
pub struct RawImage {
    file: File,
    size: u64,
    path: PathBuf,
}

impl RawImage {
    /// Opens an image file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let size = file.metadata()?.len();
        Ok(Self { file, size, path })
    }

    /// Path the image was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for RawImage {
    fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        check_bounds(offset, len, self.size)?;
        if len == 0 {
            return Ok(Vec::new());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; buffer_len(len)?];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// An image held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    /// Wraps a byte buffer.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl ImageSource for MemoryImage {
    fn read_at(&mut self, offset: u64, len: u64) -> Result<Vec<u8>> {
        check_bounds(offset, len, self.size())?;
        let start = buffer_len(offset)?;
        let end = start + buffer_len(len)?;
        Ok(self.data[start..end].to_vec())
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Maps file system and file offsets to image offsets.
///
/// Returning `None` means the offset cannot be resolved by this translator.
pub trait OffsetTranslator {
    /// Image offset of a file system offset.
    fn fs_to_image(&self, _fs_offset: u64) -> Option<u64> {
        None
    }

    /// Image offset of a file offset.
    fn file_to_image(&self, _file_offset: u64) -> Option<u64> {
        None
    }
}

/// Resolves only runs that carry an image offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTranslation;

impl OffsetTranslator for NoTranslation {}

/// A file system starting at a fixed image offset.
#[derive(Debug, Clone, Copy)]
pub struct PartitionOffset(pub u64);

impl OffsetTranslator for PartitionOffset {
    fn fs_to_image(&self, fs_offset: u64) -> Option<u64> {
        self.0.checked_add(fs_offset)
    }
}

/// The source is the file itself (for example an extracted hive), so file
/// offsets are source offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRelative;

impl OffsetTranslator for FileRelative {
    fn file_to_image(&self, file_offset: u64) -> Option<u64> {
        Some(file_offset)
    }
}

impl ByteRun {
    /// Resolves this run's start to an image offset.
    pub fn resolve(&self, translator: &dyn OffsetTranslator) -> Result<u64> {
        self.img_offset
            .or_else(|| self.fs_offset.and_then(|o| translator.fs_to_image(o)))
            .or_else(|| self.file_offset.and_then(|o| translator.file_to_image(o)))
            .ok_or_else(|| {
                Error::InvalidByteRun(format!(
                    "no resolvable offset (img_offset={:?}, fs_offset={:?}, file_offset={:?})",
                    self.img_offset, self.fs_offset, self.file_offset
                ))
            })
    }

    /// Reads this run's content from `source`.
    pub fn read_content<S: ImageSource + ?Sized>(
        &self,
        source: &mut S,
        translator: &dyn OffsetTranslator,
    ) -> Result<Vec<u8>> {
        let len = self
            .effective_len()
            .ok_or_else(|| Error::InvalidByteRun("run has no len or uncompressed_len".to_string()))?;
        if let Some(fill) = self.fill {
            return Ok(vec![fill; buffer_len(len)?]);
        }
        let offset = self.resolve(translator)?;
        source.read_at(offset, len)
    }
}

/// Lazy sequence of run contents. See [`ByteRuns::contents`].
pub struct ByteRunContents<'a, S: ImageSource + ?Sized> {
    runs: std::slice::Iter<'a, ByteRun>,
    source: &'a mut S,
    translator: &'a dyn OffsetTranslator,
    failed: bool,
}

impl<S: ImageSource + ?Sized> Iterator for ByteRunContents<'_, S> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let run = self.runs.next()?;
        let chunk = run.read_content(self.source, self.translator);
        self.failed = chunk.is_err();
        Some(chunk)
    }
}

impl ByteRuns {
    /// Returns one chunk per run, in order; concatenated they form the
    /// object's content. Zero-length runs yield empty chunks. Stops after
    /// the first error.
    pub fn contents<'a, S: ImageSource + ?Sized>(
        &'a self,
        source: &'a mut S,
        translator: &'a dyn OffsetTranslator,
    ) -> ByteRunContents<'a, S> {
        ByteRunContents {
            runs: self.iter(),
            source,
            translator,
            failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn twenty_bytes() -> MemoryImage {
        MemoryImage::new((0u8..20).collect::<Vec<_>>())
    }

    #[test]
    fn test_concatenation() {
        let runs: ByteRuns = [ByteRun::with_img_offset(0, 4), ByteRun::with_img_offset(10, 6)]
            .into_iter()
            .collect();
        let mut image = twenty_bytes();
        let chunks: Vec<Vec<u8>> = runs
            .contents(&mut image, &NoTranslation)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks.concat(), [0, 1, 2, 3, 10, 11, 12, 13, 14, 15]);
    }

    #[test]
    fn test_zero_length_run_yields_empty_chunk() {
        let runs: ByteRuns = [ByteRun::with_img_offset(5, 0), ByteRun::with_img_offset(1, 1)]
            .into_iter()
            .collect();
        let mut image = twenty_bytes();
        let chunks: Vec<Vec<u8>> = runs
            .contents(&mut image, &NoTranslation)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks, [vec![], vec![1]]);
    }

    #[test]
    fn test_offset_precedence() {
        let run = ByteRun {
            img_offset: Some(2),
            fs_offset: Some(100),
            file_offset: Some(200),
            len: Some(2),
            ..Default::default()
        };
        assert_eq!(run.resolve(&PartitionOffset(1000)).unwrap(), 2);

        let fs_only = ByteRun {
            fs_offset: Some(3),
            file_offset: Some(0),
            len: Some(2),
            ..Default::default()
        };
        assert_eq!(fs_only.resolve(&PartitionOffset(10)).unwrap(), 13);
        assert_eq!(fs_only.resolve(&FileRelative).unwrap(), 0);
        assert!(matches!(
            fs_only.resolve(&NoTranslation),
            Err(Error::InvalidByteRun(_))
        ));
    }

    #[test]
    fn test_fill_run() {
        let run = ByteRun {
            file_offset: Some(0),
            fill: Some(0xAA),
            len: Some(3),
            ..Default::default()
        };
        let mut image = MemoryImage::default();
        assert_eq!(
            run.read_content(&mut image, &NoTranslation).unwrap(),
            [0xAA, 0xAA, 0xAA]
        );
    }

    #[test]
    fn test_out_of_bounds_stops_iteration() {
        let runs: ByteRuns = [
            ByteRun::with_img_offset(18, 4),
            ByteRun::with_img_offset(0, 1),
        ]
        .into_iter()
        .collect();
        let mut image = twenty_bytes();
        let results: Vec<_> = runs.contents(&mut image, &NoTranslation).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(Error::ImageBounds {
                offset: 18,
                len: 4,
                size: 20
            })
        ));
    }

    #[test]
    fn test_raw_image() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let mut image = RawImage::open(tmp.path()).unwrap();
        assert_eq!(image.size(), 10);
        assert_eq!(image.read_at(3, 4).unwrap(), b"3456");
        assert_eq!(image.read_at(10, 0).unwrap(), b"");
        assert!(image.read_at(8, 3).is_err());
    }
}
