//! dfxml_to_sha1deep - Convert a DFXML report to sha1deep format.
//!
//! The hash set is printed to stdout; redirect to a file to save it. File
//! objects without a SHA-1 are skipped.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use dfxml_tools::hashlist::write_sha1deep;
use dfxml_tools::logging;
use dfxml_tools::reader::DocumentReader;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert a DFXML report to sha1deep format.
#[derive(Parser, Debug)]
#[command(name = "dfxml_to_sha1deep")]
#[command(version = VERSION)]
#[command(about = "Convert a DFXML report to the sha1deep hash list format")]
struct Args {
    /// Target DFXML report
    dfxml: PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let reader = DocumentReader::from_reader(BufReader::new(File::open(&args.dfxml)?));
    let stdout = io::stdout();
    let written = write_sha1deep(reader, BufWriter::new(stdout.lock()))?;
    debug!("Wrote {} hashes", written);

    Ok(())
}
