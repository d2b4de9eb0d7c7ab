//! End-to-end tests of the local index manager over Tantivy.

#![cfg(feature = "fts-tantivy")]

use std::sync::Arc;

use quarry_core::CollectingErrorHandler;
use quarry_fts::{
    DocumentCommitStrategy as Commit, DocumentRefreshStrategy as Refresh, DocumentWork,
    IndexDocument, IndexSettings, LocalIndexManager,
};

fn book(id: &str, title: &str) -> IndexDocument {
    IndexDocument::builder()
        .id(id)
        .field("title", title)
        .field("pages", 300)
        .build()
}

fn open(settings: &IndexSettings) -> (LocalIndexManager, Arc<CollectingErrorHandler>) {
    let handler = Arc::new(CollectingErrorHandler::new());
    let manager = LocalIndexManager::open(settings, handler.clone()).unwrap();
    (manager, handler)
}

#[tokio::test]
async fn test_documents_visible_after_refresh_only() {
    let settings = IndexSettings {
        refresh_interval_ms: 60_000,
        ..IndexSettings::in_memory("books")
    };
    let (manager, handler) = open(&settings);
    assert_eq!(manager.name(), "books");

    manager
        .add(book("b-1", "Dune"), Commit::Force, Refresh::None)
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 0);

    manager.refresh().await.unwrap();
    assert_eq!(manager.document_count(), 1);

    manager
        .add(book("b-2", "Solaris"), Commit::None, Refresh::Force)
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 2);

    manager.close().await.unwrap();
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_committed_documents_visible_without_forced_refresh() {
    let (manager, handler) = open(&IndexSettings::in_memory("books"));

    manager
        .add(book("b-1", "Dune"), Commit::Force, Refresh::None)
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 1);

    manager
        .add(book("b-2", "Solaris"), Commit::None, Refresh::None)
        .await
        .unwrap();
    manager.flush().await.unwrap();
    assert_eq!(manager.document_count(), 2);

    manager.close().await.unwrap();
    assert_eq!(handler.call_count(), 0);
}

#[tokio::test]
async fn test_update_replaces_by_id() {
    let (manager, _) = open(&IndexSettings::in_memory("books"));

    manager
        .add(book("b-1", "Dune"), Commit::None, Refresh::None)
        .await
        .unwrap();
    manager
        .update(book("b-1", "Dune Messiah"), Commit::None, Refresh::None)
        .await
        .unwrap();
    manager
        .update(book("b-2", "Ubik"), Commit::None, Refresh::Force)
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 2);

    manager
        .delete("b-1", Commit::None, Refresh::Force)
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 1);

    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_changeset() {
    let (manager, _) = open(&IndexSettings::in_memory("books"));

    manager
        .apply_changeset(
            vec![
                DocumentWork::add(book("b-1", "Dune")),
                DocumentWork::add(book("b-2", "Solaris")),
                DocumentWork::add(book("b-3", "Ubik")),
                DocumentWork::delete("b-2"),
            ],
            Commit::None,
            Refresh::Force,
        )
        .await
        .unwrap();
    assert_eq!(manager.document_count(), 2);

    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_purge_removes_everything() {
    let (manager, _) = open(&IndexSettings::in_memory("books"));

    for (id, title) in [("b-1", "Dune"), ("b-2", "Solaris"), ("b-3", "Ubik")] {
        manager
            .add(book(id, title), Commit::None, Refresh::None)
            .await
            .unwrap();
    }
    manager.refresh().await.unwrap();
    assert_eq!(manager.document_count(), 3);

    manager.purge().await.unwrap();
    assert_eq!(manager.document_count(), 0);

    manager.close().await.unwrap();
}

#[tokio::test]
async fn test_close_and_reopen_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let settings = IndexSettings {
        index_path: Some(dir.path().join("books")),
        ..IndexSettings::in_memory("books")
    };

    let (manager, _) = open(&settings);
    manager
        .add(book("b-1", "Dune"), Commit::None, Refresh::None)
        .await
        .unwrap();
    manager.flush().await.unwrap();
    manager
        .add(book("b-2", "Solaris"), Commit::None, Refresh::None)
        .await
        .unwrap();
    // Pending changes are committed on close.
    manager.close().await.unwrap();

    let (reopened, _) = open(&settings);
    assert_eq!(reopened.document_count(), 2);
    reopened.close().await.unwrap();
}

#[tokio::test]
async fn test_open_rejects_invalid_settings() {
    let settings = IndexSettings {
        queue_size: 0,
        ..IndexSettings::in_memory("books")
    };
    let handler = Arc::new(CollectingErrorHandler::new());
    let err = LocalIndexManager::open(&settings, handler).unwrap_err();
    assert!(err.to_string().contains("queue_size"));
}
