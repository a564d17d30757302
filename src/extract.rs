//! Extraction of file content from an image, with hash verification.
//!
//! [`HiveExtractor`] selects Windows Registry hives by path suffix and
//! writes each one to the output directory; [`extract_all`] does the same
//! for every file object that has byte runs. Recorded digests are compared
//! with the digest of what was written. A mismatch is reported, not fatal.

use crate::error::Result;
use crate::hashing::ContentHasher;
use crate::image::{ImageSource, NoTranslation, OffsetTranslator};
use crate::objects::{FileObject, HashType, Hashes};
use crate::reader::{DocumentReader, Object};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Hive paths, relative to the Windows directory or user profile.
///
/// From Carvey, *Windows Registry Forensics* (2011), p. 18.
pub const HIVE_NAMES: [&str; 11] = [
    "ntuser.dat",
    "repair/sam",
    "repair/security",
    "repair/software",
    "repair/system",
    "system32/config/sam",
    "system32/config/security",
    "system32/config/software",
    "system32/config/system",
    "system32/config/components",
    "local settings/application data/microsoft/windows/usrclass.dat",
];

/// Suffix appended to extracted hive names.
pub const HIVE_SUFFIX: &str = ".hive";

/// Files processed between progress messages.
pub const PROGRESS_INTERVAL: u64 = 5000;

/// Digest preference when verifying hives.
const PREFER_SHA1: [HashType; 2] = [HashType::Sha1, HashType::Md5];

/// Digest preference when verifying bulk extraction.
const PREFER_MD5: [HashType; 2] = [HashType::Md5, HashType::Sha1];

/// Configuration for hive extraction.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Directory extracted files are written to
    pub output_dir: PathBuf,
    /// Only extract files whose allocation status is known to be allocated
    pub allocated_only: bool,
    /// Suffix appended to output names
    pub suffix: String,
    /// Lowercase path suffixes that select a file
    pub names: Vec<String>,
}

impl ExtractConfig {
    /// Creates a configuration for the standard hive table.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            allocated_only: false,
            suffix: HIVE_SUFFIX.to_string(),
            names: HIVE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Restricts extraction to allocated files.
    pub fn allocated_only(mut self, allocated_only: bool) -> Self {
        self.allocated_only = allocated_only;
        self
    }

    /// Sets the suffix appended to output names.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Replaces the path suffix table.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names = names
            .into_iter()
            .map(|s| s.as_ref().to_lowercase())
            .collect();
        self
    }
}

/// Builds a flat output file name from a recorded path.
///
/// Path separators and spaces become `-`.
pub fn sanitize_output_name(filename: &str, suffix: &str) -> String {
    format!("{}{}", filename, suffix).replace(['/', '\\', ' '], "-")
}

/// A recorded digest that did not match the extracted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationWarning {
    /// Recorded path of the file
    pub filename: String,
    /// Where the content was written
    pub output: PathBuf,
    /// Digest that was compared
    pub hash_type: HashType,
    /// Recorded digest
    pub expected: String,
    /// Digest of the written content
    pub actual: String,
}

/// One file written by an extraction run.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// The file object as read from DFXML
    pub file: FileObject,
    /// Where the content was written
    pub output: PathBuf,
    /// Number of bytes written
    pub bytes: u64,
    /// Digests of the written content
    pub hashes: Hashes,
}

/// Accumulates the outcome of an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    /// File objects examined
    pub processed: u64,
    /// Number of files written
    pub extracted_count: u64,
    /// Files written, in order, when the run keeps them
    pub extracted: Vec<ExtractedFile>,
    /// Digest mismatches
    pub warnings: Vec<VerificationWarning>,
}

impl ExtractionReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// File objects of everything extracted.
    pub fn files(&self) -> impl Iterator<Item = &FileObject> {
        self.extracted.iter().map(|e| &e.file)
    }

    /// Returns true if no digest mismatched.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn tick(&mut self) {
        self.processed += 1;
        if self.processed % PROGRESS_INTERVAL == 0 {
            info!("Processed {} files from target DFXML", self.processed);
        }
    }

    fn record(&mut self, extracted: ExtractedFile, order: &[HashType], retain: bool) {
        if let Some(warning) = verify(&extracted, order) {
            warn!(
                file = %warning.filename,
                output = %warning.output.display(),
                expected = %warning.expected,
                actual = %warning.actual,
                "{} hash mismatch",
                warning.hash_type
            );
            self.warnings.push(warning);
        }
        self.extracted_count += 1;
        if retain {
            self.extracted.push(extracted);
        }
    }
}

/// Writes a file's content to `output`, hashing it as it is written.
///
/// The output file is created (or truncated) even when there is no content.
/// A file without byte runs is written empty.
pub fn extract_file<S: ImageSource + ?Sized>(
    file: &FileObject,
    source: &mut S,
    translator: &dyn OffsetTranslator,
    output: &Path,
) -> Result<ExtractedFile> {
    let mut writer = BufWriter::new(File::create(output)?);
    let mut hasher = ContentHasher::new();

    if let Some(runs) = file.byte_runs() {
        for chunk in runs.contents(source, translator) {
            let chunk = chunk?;
            hasher.update(&chunk);
            writer.write_all(&chunk)?;
        }
    }
    writer.flush()?;

    let bytes = hasher.bytes();
    debug!(output = %output.display(), bytes, "extracted");
    Ok(ExtractedFile {
        file: file.clone(),
        output: output.to_path_buf(),
        bytes,
        hashes: hasher.finalize(),
    })
}

/// Compares the first recorded digest in `order` with the computed one.
fn verify(extracted: &ExtractedFile, order: &[HashType]) -> Option<VerificationWarning> {
    let (hash_type, expected) = order
        .iter()
        .find_map(|t| extracted.file.hashes.get(*t).map(|v| (*t, v)))?;
    let actual = extracted.hashes.get(hash_type)?;
    if actual.eq_ignore_ascii_case(expected) {
        return None;
    }
    Some(VerificationWarning {
        filename: extracted.file.filename.clone().unwrap_or_default(),
        output: extracted.output.clone(),
        hash_type,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Extracts Windows Registry hives named in a DFXML stream.
pub struct HiveExtractor {
    config: ExtractConfig,
    translator: Box<dyn OffsetTranslator>,
}

impl HiveExtractor {
    /// Creates an extractor resolving image offsets only.
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            translator: Box::new(NoTranslation),
        }
    }

    /// Sets the translator used for runs without an image offset.
    pub fn with_translator(mut self, translator: impl OffsetTranslator + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    /// The extractor's configuration.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Returns true if the file should be extracted.
    ///
    /// The path must end with a name from the table (case-insensitive). With
    /// `allocated_only`, the file must also be known to be allocated.
    pub fn matches(&self, file: &FileObject) -> bool {
        let Some(filename) = file.filename.as_deref() else {
            return false;
        };
        let path = filename.replace('\\', "/").to_lowercase();
        let named = self.config.names.iter().any(|n| path.ends_with(n.as_str()));
        named && (!self.config.allocated_only || file.is_allocated() == Some(true))
    }

    /// Output path for a file.
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.config
            .output_dir
            .join(sanitize_output_name(filename, &self.config.suffix))
    }

    /// Examines one file object and extracts it if it matches.
    pub fn process<S: ImageSource + ?Sized>(
        &self,
        file: &FileObject,
        source: &mut S,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        let Some(filename) = file.filename.as_deref() else {
            return Ok(());
        };
        report.tick();
        if !self.matches(file) {
            return Ok(());
        }
        info!("Extracting hive {}", filename);
        let output = self.output_path(filename);
        let extracted = extract_file(file, source, self.translator.as_ref(), &output)?;
        report.record(extracted, &PREFER_SHA1, true);
        Ok(())
    }

    /// Runs over every file object of a DFXML document.
    pub fn run<R: BufRead, S: ImageSource + ?Sized>(
        &self,
        reader: DocumentReader<R>,
        source: &mut S,
        report: &mut ExtractionReport,
    ) -> Result<()> {
        for obj in reader {
            if let Object::File(file) = obj? {
                self.process(&file, source, report)?;
            }
        }
        Ok(())
    }
}

/// Extracts every file object with byte runs into `output_dir`.
///
/// Output names are the recorded paths flattened by
/// [`sanitize_output_name`]. Content is verified against the recorded MD5
/// (falling back to SHA-1). Only counts and warnings are added to `report`;
/// the extracted file objects are not kept.
pub fn extract_all<R: BufRead, S: ImageSource + ?Sized>(
    reader: DocumentReader<R>,
    source: &mut S,
    translator: &dyn OffsetTranslator,
    output_dir: &Path,
    report: &mut ExtractionReport,
) -> Result<()> {
    for obj in reader {
        let Object::File(file) = obj? else {
            continue;
        };
        report.tick();
        let (Some(filename), Some(_)) = (file.filename.as_deref(), file.byte_runs()) else {
            continue;
        };
        if filename.is_empty() {
            continue;
        }
        info!("Processing: {}", filename);
        let output = output_dir.join(sanitize_output_name(filename, ""));
        let extracted = extract_file(&file, source, translator, &output)?;
        report.record(extracted, &PREFER_MD5, false);
    }
    Ok(())
}
