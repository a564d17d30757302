//! Hash list output in the sha1deep and hashdeep formats.

use crate::error::Result;
use crate::objects::FileObject;
use crate::reader::{DocumentReader, Object};
use std::borrow::Cow;
use std::io::{BufRead, Write};

/// First header line of a hashdeep file.
pub const HASHDEEP_HEADER: &str = "%%%% HASHDEEP-1.0";

/// Writes `<sha1>  <filename>` for every file object that records a SHA-1.
///
/// Returns the number of lines written.
pub fn write_sha1deep<R: BufRead, W: Write>(reader: DocumentReader<R>, mut out: W) -> Result<usize> {
    let mut written = 0;
    for obj in reader {
        let Object::File(file) = obj? else {
            continue;
        };
        let Some(sha1) = file.hashes.sha1.as_deref() else {
            continue;
        };
        writeln!(out, "{}  {}", sha1, file.filename.as_deref().unwrap_or_default())?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// One row of a hashdeep file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashRow {
    /// File size in bytes
    pub size: Option<u64>,
    /// MD5 digest
    pub md5: Option<String>,
    /// SHA-1 digest
    pub sha1: Option<String>,
    /// Recorded path
    pub filename: Option<String>,
}

impl From<&FileObject> for HashRow {
    fn from(file: &FileObject) -> Self {
        Self {
            size: file.filesize,
            md5: file.hashes.md5.clone(),
            sha1: file.hashes.sha1.clone(),
            filename: file.filename.clone(),
        }
    }
}

/// Accumulates file hashes for a hashdeep file.
#[derive(Debug, Clone)]
pub struct HashSet {
    source: String,
    include_sha1: bool,
    rows: Vec<HashRow>,
}

impl HashSet {
    /// Creates an empty set. `source` names the DFXML it is built from.
    pub fn new(source: impl Into<String>, include_sha1: bool) -> Self {
        Self {
            source: source.into(),
            include_sha1,
            rows: Vec::new(),
        }
    }

    /// Adds a file object. Missing values become empty fields.
    pub fn push(&mut self, file: &FileObject) {
        self.rows.push(HashRow::from(file));
    }

    /// Adds every file object from a document.
    pub fn extend_from<R: BufRead>(&mut self, reader: DocumentReader<R>) -> Result<()> {
        for obj in reader {
            if let Object::File(file) = obj? {
                self.push(&file);
            }
        }
        Ok(())
    }

    /// Rows in insertion order.
    pub fn rows(&self) -> &[HashRow] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were added.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the set in hashdeep CSV format.
    pub fn write_hashdeep<W: Write>(&self, mut out: W, creator: &str) -> Result<()> {
        writeln!(out, "{}", HASHDEEP_HEADER)?;
        if self.include_sha1 {
            writeln!(out, "%%%% size,md5,sha1,filename")?;
        } else {
            writeln!(out, "%%%% size,md5,filename")?;
        }
        writeln!(out, "{}", csv_field(&format!("## HashSet created from {}", self.source)))?;
        writeln!(out, "{}", csv_field(&format!("## HashSet created using {}", creator)))?;

        for row in &self.rows {
            let size = row.size.map(|s| s.to_string()).unwrap_or_default();
            let mut fields = vec![Cow::from(size), csv_field(row.md5.as_deref().unwrap_or_default())];
            if self.include_sha1 {
                fields.push(csv_field(row.sha1.as_deref().unwrap_or_default()));
            }
            fields.push(csv_field(row.filename.as_deref().unwrap_or_default()));
            writeln!(out, "{}", fields.join(","))?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Quotes a field if it contains a comma, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DOC: &str = r#"<dfxml>
  <fileobject>
    <filename>a.txt</filename>
    <filesize>3</filesize>
    <hashdigest type="md5">900150983CD24FB0D6963F7D28E17F72</hashdigest>
    <hashdigest type="sha1">a9993e364706816aba3e25717850c26c9cd0d89d</hashdigest>
  </fileobject>
  <fileobject>
    <filename>no hash, really.txt</filename>
    <filesize>0</filesize>
  </fileobject>
</dfxml>"#;

    #[test]
    fn test_sha1deep_skips_missing() {
        let mut out = Vec::new();
        let n = write_sha1deep(DocumentReader::from_reader(Cursor::new(DOC)), &mut out).unwrap();
        assert_eq!(n, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a9993e364706816aba3e25717850c26c9cd0d89d  a.txt\n"
        );
    }

    #[test]
    fn test_hashdeep_without_sha1() {
        let mut set = HashSet::new("image.xml", false);
        set.extend_from(DocumentReader::from_reader(Cursor::new(DOC))).unwrap();
        assert_eq!(set.len(), 2);

        let mut out = Vec::new();
        set.write_hashdeep(&mut out, "dfxml_to_hashdeep").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "%%%% HASHDEEP-1.0",
                "%%%% size,md5,filename",
                "## HashSet created from image.xml",
                "## HashSet created using dfxml_to_hashdeep",
                "3,900150983cd24fb0d6963f7d28e17f72,a.txt",
                "0,,\"no hash, really.txt\"",
            ]
        );
    }

    #[test]
    fn test_hashdeep_with_sha1() {
        let mut set = HashSet::new("x.xml", true);
        let mut file = FileObject::with_filename("say \"hi\".txt");
        file.hashes.sha1 = Some("abc".to_string());
        set.push(&file);

        let mut out = Vec::new();
        set.write_hashdeep(&mut out, "tool").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("%%%% size,md5,sha1,filename\n"));
        assert!(text.ends_with(",,abc,\"say \"\"hi\"\".txt\"\n"));
    }
}
