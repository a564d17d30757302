//! hive_extractor - Extract Windows Registry hives from a disk image.
//!
//! Hives are located by path using a fiwalk DFXML report of the image. Two
//! outputs are produced in the output directory: the extracted hive files,
//! and a DFXML report (`<image stem>.xml`) describing them.
//!
//! # Usage
//!
//! ```bash
//! hive_extractor [OPTIONS] <IMAGEFILE> <OUTPUTDIR>
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Use an existing fiwalk report, allocated hives only
//! hive_extractor --dfxml target.xml -a target.raw hives/
//!
//! # Run fiwalk first, clearing any previous output
//! hive_extractor -z target.raw hives/
//! ```

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use tracing::info;

use dfxml_tools::extract::{ExtractConfig, ExtractionReport, HiveExtractor};
use dfxml_tools::image::RawImage;
use dfxml_tools::logging;
use dfxml_tools::objects::{DFXMLObject, Provenance};
use dfxml_tools::reader::DocumentReader;
use dfxml_tools::writer::DFXMLWriter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract Windows Registry hives from a disk image.
#[derive(Parser, Debug)]
#[command(name = "hive_extractor")]
#[command(version = VERSION)]
#[command(about = "Extract Windows Registry hive files from a disk image")]
#[command(long_about = "Extracts Windows Registry hive files from a raw disk image using a \
    DFXML report generated by fiwalk. Produces a directory of hive files and a DFXML report \
    of the extracted hives.")]
struct Args {
    /// Target raw disk image
    imagefile: PathBuf,

    /// Output directory
    outputdir: PathBuf,

    /// Previously generated fiwalk DFXML report (fiwalk is run if omitted)
    #[arg(long, value_name = "DFXML")]
    dfxml: Option<PathBuf>,

    /// Only extract allocated hive files
    #[arg(short = 'a', long)]
    allocated: bool,

    /// Zap (delete) the output directory if it exists
    #[arg(short = 'z', long)]
    zap: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

/// Runs fiwalk to produce a DFXML report next to the image.
fn run_fiwalk(imagefile: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let xmlfile = imagefile.with_extension("xml");
    info!("No fiwalk DFXML report provided, running fiwalk now");
    info!("This may take a long time depending on target disk size");
    let status = Command::new("fiwalk")
        .arg("-X")
        .arg(&xmlfile)
        .arg(imagefile)
        .status()?;
    if !status.success() {
        return Err(format!("fiwalk failed with {}", status).into());
    }
    Ok(xmlfile)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    if args.outputdir.exists() && args.zap {
        fs::remove_dir_all(&args.outputdir)?;
    }
    fs::create_dir_all(&args.outputdir)?;

    let xmlfile = match args.dfxml {
        Some(ref path) => path.clone(),
        None => run_fiwalk(&args.imagefile)?,
    };

    info!("Extracting registry hives from {}", args.imagefile.display());
    let mut image = RawImage::open(&args.imagefile)?;
    let reader = DocumentReader::from_reader(BufReader::new(File::open(&xmlfile)?));
    let extractor = HiveExtractor::new(
        ExtractConfig::new(&args.outputdir).allocated_only(args.allocated),
    );
    let mut report = ExtractionReport::new();
    extractor.run(reader, &mut image, &mut report)?;

    let provenance = Provenance::new("hive_extractor", VERSION)
        .with_command_line(std::env::args().collect::<Vec<_>>().join(" "))
        .with_dc_type("Hash List")
        .capture_environment();
    let mut doc = DFXMLObject::with_provenance(provenance);
    doc.add_source(args.imagefile.to_string_lossy());
    for file in report.files() {
        doc.append_file(file.clone());
    }

    let stem = args
        .imagefile
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let report_path = args.outputdir.join(format!("{}.xml", stem));
    DFXMLWriter::new().write(&doc, BufWriter::new(File::create(&report_path)?))?;

    info!(
        "Extracted {} hives ({} files processed, {} hash mismatches), DFXML report: {}",
        report.extracted_count,
        report.processed,
        report.warnings.len(),
        report_path.display()
    );
    Ok(())
}
