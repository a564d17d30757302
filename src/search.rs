//! Keyword search over file object paths.

use crate::error::Result;
use crate::extract::PROGRESS_INTERVAL;
use crate::objects::FileObject;
use crate::reader::{DocumentReader, Object};
use std::io::BufRead;
use tracing::{debug, info};

/// Files matching a keyword, in document order.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    keyword: String,
    /// File objects examined
    pub processed: u64,
    /// Matching file objects
    pub matches: Vec<FileObject>,
}

impl SearchResults {
    /// Creates an empty result set. Matching ignores case.
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
            ..Default::default()
        }
    }

    /// The lowercased keyword.
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Returns true if the file's full path contains the keyword.
    pub fn is_match(&self, file: &FileObject) -> bool {
        file.filename
            .as_deref()
            .is_some_and(|f| f.to_lowercase().contains(&self.keyword))
    }

    /// Examines one file object, keeping it if it matches.
    pub fn consider(&mut self, file: FileObject) {
        self.processed += 1;
        if self.processed % PROGRESS_INTERVAL == 0 {
            info!("Processed {} files from target DFXML", self.processed);
        }
        if self.is_match(&file) {
            debug!(filename = ?file.filename, "match");
            self.matches.push(file);
        }
    }
}

/// Searches every file object's path for `keyword`.
pub fn search_filenames<R: BufRead>(reader: DocumentReader<R>, keyword: &str) -> Result<SearchResults> {
    let mut results = SearchResults::new(keyword);
    for obj in reader {
        if let Object::File(file) = obj? {
            results.consider(file);
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_case_insensitive_path_match() {
        let xml = r#"<dfxml>
  <fileobject><filename>Users/Bob/NTUSER.DAT</filename></fileobject>
  <fileobject><filename>Windows/notepad.exe</filename></fileobject>
  <fileobject><filename>bob.txt</filename></fileobject>
  <fileobject><inode>7</inode></fileobject>
</dfxml>"#;
        let results = search_filenames(DocumentReader::from_reader(Cursor::new(xml)), "BOB").unwrap();
        assert_eq!(results.processed, 4);
        assert_eq!(results.keyword(), "bob");
        let names: Vec<_> = results
            .matches
            .iter()
            .filter_map(|f| f.filename.as_deref())
            .collect();
        assert_eq!(names, ["Users/Bob/NTUSER.DAT", "bob.txt"]);
    }

    #[test]
    fn test_error_propagates() {
        let xml = "<dfxml><fileobject><filesize>big</filesize></fileobject></dfxml>";
        assert!(search_filenames(DocumentReader::from_reader(Cursor::new(xml)), "x").is_err());
    }
}
