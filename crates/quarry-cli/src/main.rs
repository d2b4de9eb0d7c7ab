//! Quarry CLI
//!
//! Command-line interface for local full-text index administration.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use quarry_cli::{Args, handle_command};
use quarry_core::LoggingErrorHandler;
use quarry_fts::{IndexSettings, LocalIndexManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => IndexSettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => IndexSettings::default(),
    };

    let manager = LocalIndexManager::open(&settings, Arc::new(LoggingErrorHandler))
        .with_context(|| format!("Failed to open index '{}'", settings.name))?;

    let outcome = handle_command(&manager, args.command).await;
    let closed = manager.close().await;

    outcome?;
    closed?;
    Ok(())
}
