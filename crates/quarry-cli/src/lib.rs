//! # quarry-cli
//!
//! Admin CLI for local quarry indexes.
//!
//! This crate provides the `quarry` binary and the handlers behind it:
//! - Indexing JSON lines files (one document per line)
//! - Purging an index
//! - Counting committed documents

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod index_handlers;

pub use cli::{Args, Command};
pub use error::{Error, Result};
pub use index_handlers::{IndexStats, cmd_count, cmd_index, cmd_purge, handle_command};
