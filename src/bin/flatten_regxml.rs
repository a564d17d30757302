//! flatten_regxml - Flatten RegXML hives into a list of cell objects.
//!
//! Every key and value of each input is written to stdout as a
//! `cellobject` element, one `hive` per input file.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use dfxml_tools::flatten::flatten_into;
use dfxml_tools::logging;
use dfxml_tools::objects::{Provenance, RegXMLObject};
use dfxml_tools::writer::{RegXMLWriter, WriterConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Flatten RegXML hives into cell objects.
#[derive(Parser, Debug)]
#[command(name = "flatten_regxml")]
#[command(version = VERSION)]
#[command(about = "Flatten RegXML hive files into a list of cell objects")]
struct Args {
    /// Target RegXML file(s)
    #[arg(required = true)]
    regxml: Vec<PathBuf>,

    /// Output compact XML (no indentation)
    #[arg(long)]
    compact: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let provenance = Provenance::new("flatten_regxml", VERSION)
        .with_command_line(std::env::args().collect::<Vec<_>>().join(" "))
        .capture_environment();
    let mut doc = RegXMLObject::with_provenance(provenance);

    for path in &args.regxml {
        info!("Processing: {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        flatten_into(&mut doc, reader, &path.to_string_lossy())?;
    }

    let config = if args.compact {
        WriterConfig::compact()
    } else {
        WriterConfig::default()
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    RegXMLWriter::with_config(config).write(&doc, &mut handle)?;
    handle.write_all(b"\n")?;

    Ok(())
}
