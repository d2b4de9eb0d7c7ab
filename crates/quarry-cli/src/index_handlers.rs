//! Handler functions for index CLI commands.
//!
//! Each `cmd_*` function drives an already opened [`LocalIndexManager`];
//! opening and closing the manager is left to the caller.

use std::path::Path;

use quarry_fts::{
    DocumentCommitStrategy, DocumentRefreshStrategy, DocumentWork, IndexDocument,
    LocalIndexManager,
};

use crate::cli::Command;
use crate::error::{Error, Result};

/// Outcome of indexing a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Documents read from the file.
    pub documents: usize,
    /// Changesets submitted.
    pub changesets: usize,
    /// Changesets that failed (their failures went to the error handler).
    pub failed_changesets: usize,
}

/// Run a command against `manager`.
pub async fn handle_command(manager: &LocalIndexManager, command: Command) -> Result<()> {
    match command {
        Command::Index { file, batch_size } => {
            let stats = cmd_index(manager, &file, batch_size).await?;
            println!(
                "Indexed {} document(s) from {} in {} changeset(s), {} failed",
                stats.documents,
                file.display(),
                stats.changesets,
                stats.failed_changesets
            );
            Ok(())
        }
        Command::Purge => {
            cmd_purge(manager).await?;
            println!("Purged index '{}'", manager.name());
            Ok(())
        }
        Command::Count => {
            println!("{}", cmd_count(manager));
            Ok(())
        }
    }
}

/// Index every document of a JSON lines file, then flush.
///
/// Documents are written as updates so that re-indexing a file replaces the
/// documents it indexed before. The whole file is parsed before anything is
/// written.
pub async fn cmd_index(
    manager: &LocalIndexManager,
    path: &Path,
    batch_size: usize,
) -> Result<IndexStats> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| quarry_core::Error::io_with_path(e, path))?;
    let documents = parse_documents(path, &content)?;

    let mut stats = IndexStats {
        documents: documents.len(),
        ..Default::default()
    };

    for chunk in documents.chunks(batch_size.max(1)) {
        let works = chunk.iter().cloned().map(DocumentWork::update).collect();
        stats.changesets += 1;
        if let Err(e) = manager
            .apply_changeset(
                works,
                DocumentCommitStrategy::None,
                DocumentRefreshStrategy::None,
            )
            .await
        {
            log::warn!("Changeset {} of {} failed: {e}", stats.changesets, path.display());
            stats.failed_changesets += 1;
        }
    }

    manager.flush().await?;
    log::info!(
        "Indexed {} document(s) into '{}'",
        stats.documents,
        manager.name()
    );
    Ok(stats)
}

/// Delete every document of the index.
pub async fn cmd_purge(manager: &LocalIndexManager) -> Result<()> {
    manager.purge().await?;
    Ok(())
}

/// Number of documents visible to searches.
pub fn cmd_count(manager: &LocalIndexManager) -> u64 {
    manager.document_count()
}

/// Parse non-blank lines as documents.
fn parse_documents(path: &Path, content: &str) -> Result<Vec<IndexDocument>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            IndexDocument::from_json_line(line).map_err(|source| Error::InvalidDocument {
                path: path.to_path_buf(),
                line: index + 1,
                source,
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
