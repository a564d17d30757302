//! dfxml_to_hashdeep - Convert a DFXML report to a hashdeep hash set.
//!
//! The hash set is written to `<dfxml stem>.csv` in the current directory
//! unless `--output` is given.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use dfxml_tools::hashlist::HashSet;
use dfxml_tools::logging;
use dfxml_tools::reader::DocumentReader;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert a DFXML report to a hashdeep hash set.
#[derive(Parser, Debug)]
#[command(name = "dfxml_to_hashdeep")]
#[command(version = VERSION)]
#[command(about = "Create a hashdeep hash set from DFXML metadata")]
struct Args {
    /// Target DFXML file
    dfxml: PathBuf,

    /// Include SHA-1 hash values in the hash set
    #[arg(short, long)]
    sha1: bool,

    /// Output file (defaults to <dfxml stem>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    info!("Processing: {}", args.dfxml.display());
    let output = match args.output {
        Some(ref path) => path.clone(),
        None => {
            let stem = args
                .dfxml
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "hashset".to_string());
            PathBuf::from(format!("{}.csv", stem))
        }
    };

    let mut set = HashSet::new(args.dfxml.to_string_lossy(), args.sha1);
    set.extend_from(DocumentReader::from_reader(BufReader::new(File::open(&args.dfxml)?)))?;

    info!("Writing {} entries to: {}", set.len(), output.display());
    set.write_hashdeep(BufWriter::new(File::create(&output)?), "dfxml_to_hashdeep")?;

    Ok(())
}
