use std::path::PathBuf;

use clap::Parser;
use litesnap::{SnapshotOptions, backup_to_file};

mod resolve;

use resolve::{CliError, resolve_destination, resolve_source};

#[derive(Parser, Debug)]
#[command(name = "litesnap", version)]
#[command(about = "Snapshot a live SQLite database, including its WAL, into a new file")]
struct Cli {
    /// Skip the WAL checkpoint that makes the destination a single self-contained file
    #[arg(long)]
    no_wal_checkpoint: bool,

    /// Back up the live database files directly instead of staging a private copy first
    #[arg(long)]
    no_staging: bool,

    /// If the files change while staging them, retry <N> times
    #[arg(long, value_name = "N", default_value_t = 100)]
    copy_retry: u32,

    /// Continue with a possibly inconsistent copy if every staging retry saw a change
    #[arg(long)]
    no_copy_retry_strict: bool,

    /// Default log directive, applied on top of RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Database to copy
    source_database: PathBuf,

    /// Where to write the copy. A directory gets the source's file name; an
    /// existing file is never overwritten.
    destination: PathBuf,
}

impl Cli {
    fn options(&self) -> SnapshotOptions {
        SnapshotOptions::default()
            .with_wal_checkpoint(!self.no_wal_checkpoint)
            .with_staging(!self.no_staging)
            .with_copy_retry(self.copy_retry)
            .with_copy_retry_strict(!self.no_copy_retry_strict)
    }
}

fn run(cli: &Cli) -> Result<PathBuf, CliError> {
    let source = resolve_source(&cli.source_database)?;
    let destination = resolve_destination(&source, &cli.destination)?;
    backup_to_file(&source, &destination, &cli.options())?;
    eprintln!("Backed up {} to {}", source.display(), destination.display());
    Ok(destination)
}

fn main() {
    // Parse first, --log-level feeds the filter.
    let cli = Cli::parse();

    // Initialize JSON logging once.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match cli.log_level.parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter, // fallback to default if parsing fails
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    if let Err(e) = run(&cli) {
        tracing::error!(error = %e, "Snapshot failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
