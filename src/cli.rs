use clap::Parser;
use std::path::PathBuf;

/// Watch directories and translate new SRT/ASS subtitle files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run a single scan and exit
    #[arg(long, conflicts_with = "file")]
    pub once: bool,

    /// Translate one subtitle file, record it in the ledger and exit
    #[arg(long)]
    pub file: Option<PathBuf>,
}
