use clap::{Parser, Subcommand};
use std::cell::Cell;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lntopo::gossip::Frames;
use lntopo::report::{self, CsvExporter};

#[derive(Parser)]
#[command(name = "lntopo", about = "Replay Lightning gossip datasets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a dataset and append channel/update rows to CSV files.
    Reforme {
        /// Uncompressed dataset file, or `-` for stdin.
        dataset: PathBuf,

        #[arg(long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Print every decoded record as one JSON object per line.
    Dump {
        /// Uncompressed dataset file, or `-` for stdin.
        dataset: PathBuf,

        /// Stop after this many records.
        #[arg(long)]
        limit: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reforme { dataset, out_dir } => reforme(&dataset, out_dir)?,
        Commands::Dump { dataset, limit } => dump(&dataset, limit)?,
    }

    Ok(())
}

fn open_dataset(path: &Path) -> Result<Frames<Box<dyn Read>>, Box<dyn Error>> {
    let reader: Box<dyn Read> = if path.as_os_str() == "-" {
        Box::new(BufReader::new(io::stdin().lock()))
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };

    Ok(Frames::new(reader)?)
}

fn reforme(dataset: &Path, out_dir: PathBuf) -> Result<(), Box<dyn Error>> {
    info!(dataset = %dataset.display(), out_dir = %out_dir.display(), "replaying gossip messages");

    let start = Instant::now();
    let exporter = CsvExporter::new(out_dir);
    let frames = open_dataset(dataset)?;

    let stats = report::replay(frames, |message| exporter.record(&message))?;

    info!(
        decoded = stats.decoded,
        ignored = stats.ignored,
        skipped = stats.skipped,
        elapsed = ?start.elapsed(),
        "replay finished"
    );

    Ok(())
}

fn dump(dataset: &Path, limit: Option<u64>) -> Result<(), Box<dyn Error>> {
    let frames = open_dataset(dataset)?;
    let mut out = BufWriter::new(io::stdout().lock());
    let written = Cell::new(0u64);

    // Stop early by truncating the frame stream once the limit is reached.
    let frames = frames.take_while(|_| limit.is_none_or(|max| written.get() < max));

    let stats = report::replay(frames, |message| {
        serde_json::to_writer(&mut out, &message)?;
        writeln!(out)?;
        written.set(written.get() + 1);
        Ok(())
    })?;

    out.flush()?;

    info!(
        decoded = stats.decoded,
        ignored = stats.ignored,
        skipped = stats.skipped,
        "dump finished"
    );

    Ok(())
}
