//! dfxml_xtract - Extract every file described by a DFXML report.
//!
//! Each file object with byte runs is copied out of the image into the
//! output directory and checked against its recorded MD5.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use dfxml_tools::extract::{extract_all, ExtractionReport};
use dfxml_tools::image::{NoTranslation, OffsetTranslator, PartitionOffset, RawImage};
use dfxml_tools::logging;
use dfxml_tools::reader::DocumentReader;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract each file object of a DFXML report from an image.
#[derive(Parser, Debug)]
#[command(name = "dfxml_xtract")]
#[command(version = VERSION)]
#[command(about = "Extract each file object of a DFXML report from a raw image")]
struct Args {
    /// Target DFXML file
    dfxml: PathBuf,

    /// Target raw image file
    image: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Image offset of the file system, for runs that only carry fs_offset
    #[arg(long, value_name = "BYTES")]
    partition_offset: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    fs::create_dir_all(&args.output)?;
    info!("Output dir  : {}", args.output.display());
    info!("Target DFXML: {}", args.dfxml.display());
    info!("Target IMAGE: {}", args.image.display());

    let translator: Box<dyn OffsetTranslator> = match args.partition_offset {
        Some(offset) => Box::new(PartitionOffset(offset)),
        None => Box::new(NoTranslation),
    };

    let mut image = RawImage::open(&args.image)?;
    let reader = DocumentReader::from_reader(BufReader::new(File::open(&args.dfxml)?));
    let mut report = ExtractionReport::new();
    extract_all(reader, &mut image, translator.as_ref(), &args.output, &mut report)?;

    info!(
        "Extracted {} files, {} hash mismatches",
        report.extracted_count,
        report.warnings.len()
    );
    Ok(())
}
