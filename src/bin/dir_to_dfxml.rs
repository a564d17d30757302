//! dir_to_dfxml - Create a DFXML report from a directory.
//!
//! Regular files are recorded with their stat fields and MD5/SHA-1 digests.
//! The report is written to stdout.
//!
//! # Examples
//!
//! ```bash
//! # Top-level files only
//! dir_to_dfxml /path/to/directory > manifest.xml
//!
//! # Recursive, basenames only, 4 hashing threads
//! dir_to_dfxml -r -b -j 4 /path/to/directory > manifest.xml
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use dfxml_tools::logging;
use dfxml_tools::objects::{DFXMLObject, Provenance};
use dfxml_tools::walk::{walk_with, WalkOptions};
use dfxml_tools::writer::{DFXMLWriter, WriterConfig};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create a DFXML report from a directory.
#[derive(Parser, Debug)]
#[command(name = "dir_to_dfxml")]
#[command(version = VERSION)]
#[command(about = "Create a DFXML report from a directory")]
struct Args {
    /// Target directory
    directory: PathBuf,

    /// Recursively scan
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Only store file basename
    #[arg(short = 'b', long)]
    basename: bool,

    /// Number of file-hashing threads to run
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Follow symbolic links when walking directories
    #[arg(long)]
    follow_links: bool,

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

    if args.jobs == 0 {
        return Err("jobs must be at least 1".into());
    }

    let options = WalkOptions {
        recursive: args.recursive,
        basename_only: args.basename,
        follow_links: args.follow_links,
        jobs: args.jobs,
    };
    let files = walk_with(&args.directory, &options)?;
    debug!("Walked {} files", files.len());

    let provenance = Provenance::new("dir_to_dfxml", VERSION)
        .with_command_line(std::env::args().collect::<Vec<_>>().join(" "))
        .with_dc_type("Hash List")
        .capture_environment();
    let mut doc = DFXMLObject::with_provenance(provenance);
    doc.add_source(args.directory.to_string_lossy());
    for file in files {
        doc.append_file(file);
    }

    let config = if args.compact {
        WriterConfig::compact()
    } else {
        WriterConfig::default()
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    DFXMLWriter::with_config(config).write(&doc, &mut handle)?;
    handle.write_all(b"\n")?;

    Ok(())
}
