//! search_dfxml - Search file object paths in a DFXML report.
//!
//! Matching file objects (case-insensitive substring of the full path) are
//! written to a new DFXML report. The keyword is read from stdin when not
//! given with `--keyword`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use dfxml_tools::logging;
use dfxml_tools::objects::{DFXMLObject, Provenance};
use dfxml_tools::reader::DocumentReader;
use dfxml_tools::search::search_filenames;
use dfxml_tools::writer::DFXMLWriter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Search file object paths in a DFXML report.
#[derive(Parser, Debug)]
#[command(name = "search_dfxml")]
#[command(version = VERSION)]
#[command(about = "Search file object paths in a DFXML report for a keyword")]
struct Args {
    /// Target DFXML report (e.g. target.xml)
    dfxml: PathBuf,

    /// Output DFXML report (e.g. results.xml)
    output: PathBuf,

    /// Search keyword (prompted for if omitted)
    #[arg(short, long)]
    keyword: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn prompt_keyword() -> io::Result<String> {
    print!("Enter search keyword: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(args.verbose);

    let keyword = match args.keyword {
        Some(ref k) => k.clone(),
        None => prompt_keyword()?,
    };

    info!("Processing target DFXML report");
    let reader = DocumentReader::from_reader(BufReader::new(File::open(&args.dfxml)?));
    let results = search_filenames(reader, &keyword)?;

    let provenance = Provenance::new("search_dfxml", VERSION)
        .with_command_line(std::env::args().collect::<Vec<_>>().join(" "))
        .with_dc_type("Hash List")
        .capture_environment();
    let mut doc = DFXMLObject::with_provenance(provenance);
    doc.add_source(args.dfxml.to_string_lossy());
    for file in results.matches {
        doc.append_file(file);
    }

    DFXMLWriter::new().write(&doc, BufWriter::new(File::create(&args.output)?))?;
    info!(
        "{} of {} files matched, DFXML report: {}",
        doc.file_count(),
        results.processed,
        args.output.display()
    );
    Ok(())
}
