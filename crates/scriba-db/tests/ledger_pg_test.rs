//! Integration tests for the PostgreSQL ledger repositories.
//!
//! These require a reachable PostgreSQL instance with the migrations
//! applied. They are skipped unless `SCRIBA_TEST_DATABASE_URL` is set:
//!
//! ```bash
//! SCRIBA_TEST_DATABASE_URL=postgres://localhost/scriba_test \
//! cargo test --package scriba-db --features migrations --test ledger_pg_test
//! ```

use scriba_db::Database;
use scriba_core::{HistoryRepository, MetricsRepository, ProcessedRepository, SnapshotRepository, TokenUsage};

/// Returns the configured test database, or `None` (skip) when the
/// environment does not provide one.
async fn test_database(test_name: &str) -> Option<Database> {
    let Ok(url) = std::env::var("SCRIBA_TEST_DATABASE_URL") else {
        println!("skipping {test_name} - set SCRIBA_TEST_DATABASE_URL to enable ledger tests");
        return None;
    };
    let db = Database::connect(&url).await.expect("connect test database");
    #[cfg(feature = "migrations")]
    db.migrate().await.expect("run migrations");
    Some(db)
}

#[tokio::test]
async fn test_processed_upsert_is_idempotent() {
    let Some(db) = test_database("test_processed_upsert_is_idempotent").await else {
        return;
    };
    let doc_id = 910_001;
    db.processed.delete_by_ids(&[doc_id]).await.unwrap();

    assert!(!db.processed.is_processed(doc_id).await.unwrap());

    db.processed.upsert(doc_id, Some("First title")).await.unwrap();
    db.processed.upsert(doc_id, Some("Second title")).await.unwrap();

    assert!(db.processed.is_processed(doc_id).await.unwrap());
    let records: Vec<_> = db
        .processed
        .list()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.document_id == doc_id)
        .collect();
    assert_eq!(records.len(), 1, "conflict must update, not duplicate");
    assert_eq!(records[0].title.as_deref(), Some("Second title"));
    assert!(records[0].last_updated >= records[0].processed_at);

    db.processed.delete_by_ids(&[doc_id]).await.unwrap();
}

#[tokio::test]
async fn test_reset_reinstates_eligibility() {
    let Some(db) = test_database("test_reset_reinstates_eligibility").await else {
        return;
    };
    let doc_id = 910_002;

    db.processed.upsert(doc_id, None).await.unwrap();
    assert!(db.processed.is_processed(doc_id).await.unwrap());

    let removed = db.processed.delete_by_ids(&[doc_id]).await.unwrap();
    assert_eq!(removed, 1);
    assert!(!db.processed.is_processed(doc_id).await.unwrap());
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let Some(db) = test_database("test_snapshot_round_trip").await else {
        return;
    };
    let doc_id = 910_003;
    db.snapshots.delete_by_ids(&[doc_id]).await.unwrap();

    db.snapshots
        .save(doc_id, Some("Old title"), &[3, 5, 8], Some(12))
        .await
        .unwrap();

    let snapshot = db.snapshots.get(doc_id).await.unwrap().expect("snapshot saved");
    assert_eq!(snapshot.title.as_deref(), Some("Old title"));
    assert_eq!(snapshot.tags, vec![3, 5, 8]);
    assert_eq!(snapshot.correspondent, Some(12));

    db.snapshots.delete_by_ids(&[doc_id]).await.unwrap();
    assert!(db.snapshots.get(doc_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_history_appends_and_paginates() {
    let Some(db) = test_database("test_history_appends_and_paginates").await else {
        return;
    };
    let doc_id = 910_004;
    db.history.delete_by_ids(&[doc_id]).await.unwrap();

    db.history
        .append(doc_id, &[1, 2], Some("Run one"), Some("ACME"))
        .await
        .unwrap();
    db.history
        .append(doc_id, &[2, 4], Some("Run two"), None)
        .await
        .unwrap();

    let page = db.history.list_page(100, 0).await.unwrap();
    let ours: Vec<_> = page.iter().filter(|e| e.document_id == doc_id).collect();
    assert_eq!(ours.len(), 2, "history is append-only");

    db.history.delete_by_ids(&[doc_id]).await.unwrap();
}

#[tokio::test]
async fn test_metrics_recorded() {
    let Some(db) = test_database("test_metrics_recorded").await else {
        return;
    };
    let doc_id = 910_005;

    db.metrics
        .record(
            doc_id,
            TokenUsage {
                prompt_tokens: 1200,
                completion_tokens: 80,
                total_tokens: 1280,
            },
        )
        .await
        .unwrap();

    let metrics = db.metrics.list().await.unwrap();
    let row = metrics
        .iter()
        .find(|m| m.document_id == doc_id)
        .expect("metric row written");
    assert_eq!(row.total_tokens, 1280);
}
