//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default number of documents per changeset when indexing a file.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Quarry - local full-text index administration
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Local full-text index administration tool", long_about = None)]
pub struct Args {
    /// Index settings file (TOML)
    #[arg(short, long, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Commands operating on the configured index.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Index documents from a JSON lines file
    Index {
        /// File with one JSON object per line; each needs a string `id`
        file: PathBuf,

        /// Documents per changeset
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Delete every document of the index
    Purge,
    /// Print the number of documents in the index
    Count,
}
