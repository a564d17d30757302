//! Streaming MD5/SHA-1 hashing of file and extracted content.

use crate::error::Result;
use crate::objects::{HashType, Hashes};
use digest::Digest;
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

const READ_BUFFER: usize = 1024 * 1024;

/// Computes MD5 and SHA-1 over data fed in pieces.
#[derive(Clone, Default)]
pub struct ContentHasher {
    md5: md5::Md5,
    sha1: sha1::Sha1,
    bytes: u64,
}

impl ContentHasher {
    /// Creates a hasher with no input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next piece of content.
    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.bytes += data.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Consumes the hasher and returns lowercase hex digests.
    pub fn finalize(self) -> Hashes {
        let mut hashes = Hashes::new();
        hashes.set(HashType::Md5, format!("{:x}", self.md5.finalize()));
        hashes.set(HashType::Sha1, format!("{:x}", self.sha1.finalize()));
        hashes
    }
}

impl Write for ContentHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hashes everything readable from `reader`.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<(Hashes, u64)> {
    let mut hasher = ContentHasher::new();
    io::copy(&mut reader, &mut hasher)?;
    let bytes = hasher.bytes();
    Ok((hasher.finalize(), bytes))
}

/// Hashes a file's content.
pub fn hash_file(path: impl AsRef<Path>) -> Result<Hashes> {
    let file = File::open(path)?;
    let (hashes, _) = hash_reader(BufReader::with_capacity(READ_BUFFER, file))?;
    Ok(hashes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_empty_digests() {
        let hashes = ContentHasher::new().finalize();
        assert_eq!(
            hashes.md5.as_deref(),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(
            hashes.sha1.as_deref(),
            Some("da39a3ee5e6b4b0d3255bfef95601890afd80709")
        );
    }

    #[test]
    fn test_incremental_matches_whole() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"ab");
        hasher.update(b"c");
        assert_eq!(hasher.bytes(), 3);
        let hashes = hasher.finalize();
        assert_eq!(
            hashes.md5.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
        assert_eq!(
            hashes.sha1.as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );

        let (whole, n) = hash_reader(Cursor::new(b"abc")).unwrap();
        assert_eq!(n, 3);
        assert_eq!(whole, hashes);
    }

    /// Fails with `Interrupted` before every successful read.
    struct Flaky<R> {
        inner: R,
        interrupt: bool,
    }

    impl<R: Read> Read for Flaky<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_interrupted_reads_retry() {
        let reader = Flaky {
            inner: Cursor::new(b"abc"),
            interrupt: false,
        };
        let (hashes, n) = hash_reader(reader).unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            hashes.md5.as_deref(),
            Some("900150983cd24fb0d6963f7d28e17f72")
        );
    }

    #[test]
    fn test_hash_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        let hashes = hash_file(&path).unwrap();
        assert_eq!(
            hashes.sha1.as_deref(),
            Some("a9993e364706816aba3e25717850c26c9cd0d89d")
        );
        assert!(hash_file(dir.path().join("missing")).is_err());
    }
}
