//! HTTP handlers for the scriba service surface.
//!
//! The dashboard itself lives elsewhere; this surface exposes the manual
//! scan trigger, the reset actions, and read-only ledger views it consumes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use scriba_core::defaults::{PAGE_LIMIT, PAGE_OFFSET};
use scriba_core::{Error, HistoryRepository, MetricsRepository, ProcessedRepository, SnapshotRepository};
use scriba_db::Database;
use scriba_scan::Scanner;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub scanner: Arc<Scanner>,
}

fn internal_error(e: Error) -> (StatusCode, Json<serde_json::Value>) {
    error!(error = %e, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
}

/// `GET /health`: verifies ledger connectivity.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "healthy"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error", "message": e.to_string()})),
        ),
    }
}

/// `POST /api/scan/now`: manual full-corpus scan.
///
/// Rejected with 409 while a scan is in flight; otherwise the scan runs to
/// completion and the terminal status is returned in this response.
pub async fn scan_now(State(state): State<AppState>) -> impl IntoResponse {
    match state.scanner.scan_now().await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "status": "completed",
                "total": report.total,
                "annotated": report.annotated,
                "skipped": report.skipped,
                "failed": report.failed,
            })),
        ),
        Err(Error::ScanInProgress) => (
            StatusCode::CONFLICT,
            Json(json!({"error": "scan already running"})),
        ),
        Err(e) => {
            error!(error = %e, "Manual scan failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"status": "failed", "error": e.to_string()})),
            )
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub ids: Vec<i64>,
}

/// `POST /api/documents/reset`: remove ledger rows for the given
/// documents so the next scan processes them again.
///
/// Usage metrics are retained as historical accounting; processed records,
/// history, and snapshots are removed.
pub async fn reset_documents(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> impl IntoResponse {
    if request.ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ids must be a non-empty list"})),
        );
    }

    let (processed, history, snapshots) = tokio::join!(
        state.db.processed.delete_by_ids(&request.ids),
        state.db.history.delete_by_ids(&request.ids),
        state.db.snapshots.delete_by_ids(&request.ids),
    );
    for result in [&processed, &history, &snapshots] {
        if let Err(e) = result {
            return internal_error(Error::Internal(e.to_string()));
        }
    }

    info!(count = request.ids.len(), "Documents reset");
    (
        StatusCode::OK,
        Json(json!({"success": true, "reset": processed.unwrap_or(0)})),
    )
}

/// `POST /api/documents/reset-all`: clear the whole ledger (except usage
/// metrics), making every document reprocessable.
pub async fn reset_all_documents(State(state): State<AppState>) -> impl IntoResponse {
    let (processed, history, snapshots) = tokio::join!(
        state.db.processed.delete_all(),
        state.db.history.delete_all(),
        state.db.snapshots.delete_all(),
    );
    for result in [&processed, &history, &snapshots] {
        if let Err(e) = result {
            return internal_error(Error::Internal(e.to_string()));
        }
    }

    info!("Full ledger reset");
    (
        StatusCode::OK,
        Json(json!({"success": true, "reset": processed.unwrap_or(0)})),
    )
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/history?limit&offset`: newest-first annotation history.
pub async fn list_history(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> impl IntoResponse {
    let limit = page.limit.unwrap_or(PAGE_LIMIT).clamp(1, 500);
    let offset = page.offset.unwrap_or(PAGE_OFFSET).max(0);

    let (entries, total) = tokio::join!(
        state.db.history.list_page(limit, offset),
        state.db.history.count(),
    );
    match (entries, total) {
        (Ok(entries), Ok(total)) => (
            StatusCode::OK,
            Json(json!({"total": total, "entries": entries})),
        ),
        (Err(e), _) | (_, Err(e)) => internal_error(e),
    }
}

/// `GET /api/metrics`: provider token accounting rows.
pub async fn list_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.metrics.list().await {
        Ok(metrics) => (StatusCode::OK, Json(json!({"metrics": metrics}))),
        Err(e) => internal_error(e),
    }
}

/// `GET /api/processed`: processed records and their count.
pub async fn list_processed(State(state): State<AppState>) -> impl IntoResponse {
    let (documents, count) = tokio::join!(state.db.processed.list(), state.db.processed.count());
    match (documents, count) {
        (Ok(documents), Ok(count)) => (
            StatusCode::OK,
            Json(json!({"count": count, "documents": documents})),
        ),
        (Err(e), _) | (_, Err(e)) => internal_error(e),
    }
}
