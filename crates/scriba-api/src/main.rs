//! scriba-api: HTTP service binary for scriba.
//!
//! Startup order: load `.env`, initialize tracing, build the typed config,
//! connect and migrate the ledger, construct the document store client and
//! the configured AI backend, spawn the scan scheduler, then serve the HTTP
//! surface until SIGTERM/SIGINT.

mod handlers;

use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use scriba_core::{DocumentStore, ScribaConfig};
use scriba_db::Database;
use scriba_dms::DmsClient;
use scriba_inference::build_backend;
use scriba_scan::{ScanScheduler, Scanner};

use handlers::AppState;

/// Generates time-ordered UUIDv7 request correlation ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scriba=info,scriba_api=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ScribaConfig::from_env()?;
    info!(provider = %config.provider, "Starting scriba");

    let db = Database::connect(&config.ledger.database_url).await?;
    db.migrate().await?;

    let store: Arc<dyn DocumentStore> = Arc::new(DmsClient::new(config.dms.clone())?);
    let backend = build_backend(&config)?;

    let scanner = Arc::new(Scanner::new(
        store,
        backend,
        db.ledger_handles(),
        config.toggles,
    ));
    let scheduler = ScanScheduler::new(scanner.clone(), &config.scan)?.start();

    let state = AppState {
        db: db.clone(),
        scanner,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/scan/now", post(handlers::scan_now))
        .route("/api/documents/reset", post(handlers::reset_documents))
        .route("/api/documents/reset-all", post(handlers::reset_all_documents))
        .route("/api/history", get(handlers::list_history))
        .route("/api/metrics", get(handlers::list_metrics))
        .route("/api/processed", get(handlers::list_processed))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    scheduler.shutdown().await;
    db.close().await;
    Ok(())
}
