//! Full-corpus scan orchestration and cron scheduling.
//!
//! The [`Scanner`] runs one scan: bulk-fetch the document list and taxonomy
//! once, then feed every document through the pipeline sequentially. The
//! [`ScanScheduler`] drives the scanner on a cron expression, running one
//! scan at startup and then on every fire, with the single-flight guard
//! arbitrating between scheduled runs and manual triggers.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use cron::Schedule;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

use scriba_core::{
    AnalysisBackend, DocumentStore, Error, FieldToggles, LedgerHandles, ProcessOutcome, Result,
    ScanConfig,
};

use crate::guard::{ScanGuard, SingleFlight};
use crate::pipeline::DocumentPipeline;
use crate::reconcile::TaxonomyReconciler;

/// Counters for one completed scan.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanReport {
    pub total: usize,
    pub annotated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs full-corpus scans under the single-flight guard.
pub struct Scanner {
    store: Arc<dyn DocumentStore>,
    pipeline: DocumentPipeline,
    flight: SingleFlight,
}

impl Scanner {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        backend: Arc<dyn AnalysisBackend>,
        ledger: LedgerHandles,
        toggles: FieldToggles,
    ) -> Self {
        let pipeline = DocumentPipeline::new(store.clone(), backend, ledger, toggles);
        Self {
            store,
            pipeline,
            flight: SingleFlight::new(),
        }
    }

    /// Whether a scan is currently in flight.
    pub fn is_running(&self) -> bool {
        self.flight.is_running()
    }

    /// Manual trigger: rejected with [`Error::ScanInProgress`] when a scan
    /// is already running, otherwise runs to completion.
    pub async fn scan_now(&self) -> Result<ScanReport> {
        let guard = self.flight.try_acquire().ok_or(Error::ScanInProgress)?;
        self.run_scan(guard).await
    }

    /// Scheduled trigger: silently no-ops when a scan is already running;
    /// failures surface only through logs.
    pub async fn scheduled_scan(&self) {
        let Some(guard) = self.flight.try_acquire() else {
            debug!("Scan already running, skipping scheduled run");
            return;
        };
        if let Err(e) = self.run_scan(guard).await {
            error!(error = %e, "Scheduled scan failed");
        }
    }

    /// One full scan. The guard is held for the duration and released on
    /// every exit path, including a bulk-fetch abort.
    #[instrument(skip_all, fields(subsystem = "scan", component = "scheduler", op = "scan"))]
    async fn run_scan(&self, _guard: ScanGuard) -> Result<ScanReport> {
        let started = Instant::now();

        // One-time bulk fetch; failure here aborts the whole scan.
        let (documents, tags, correspondents, own_user_id) = tokio::try_join!(
            self.store.list_documents(),
            self.store.list_tags(),
            self.store.list_correspondents(),
            self.store.current_user_id(),
        )?;

        info!(doc_count = documents.len(), "Scan started");
        let mut reconciler = TaxonomyReconciler::new(self.store.clone(), tags, correspondents);
        let mut report = ScanReport::default();

        // Sequential on purpose: concurrent documents could race
        // create-if-absent on the same new taxonomy name.
        for document in &documents {
            report.total += 1;
            match self
                .pipeline
                .process(document, own_user_id, &mut reconciler)
                .await
            {
                Ok(ProcessOutcome::Completed(applied)) => {
                    report.annotated += 1;
                    debug!(
                        document_id = applied.document_id,
                        tag_count = applied.tag_ids.len(),
                        "Annotated"
                    );
                }
                Ok(ProcessOutcome::Skipped(reason)) => {
                    report.skipped += 1;
                    debug!(document_id = document.id, %reason, "Skipped");
                }
                Err(e) => {
                    report.failed += 1;
                    error!(
                        document_id = document.id,
                        error = %e,
                        "Document processing failed, continuing scan"
                    );
                }
            }
        }

        info!(
            duration_ms = started.elapsed().as_millis() as u64,
            total = report.total,
            annotated = report.annotated,
            skipped = report.skipped,
            failed = report.failed,
            "Scan complete"
        );
        Ok(report)
    }
}

/// Parse a scan schedule. Standard five-field cron expressions get a
/// seconds field of `0` prepended, since the `cron` crate expects six or
/// seven fields.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    let normalized = if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    };
    Schedule::from_str(&normalized)
        .map_err(|e| Error::Config(format!("Invalid scan schedule {:?}: {}", expr, e)))
}

/// Handle for a running scheduler task.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the scheduler loop to stop and wait for it to finish. A scan
    /// already in progress runs to completion first; there is no
    /// mid-document cancellation.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

/// Cron-driven scan loop.
pub struct ScanScheduler {
    scanner: Arc<Scanner>,
    schedule: Schedule,
    expression: String,
}

impl ScanScheduler {
    pub fn new(scanner: Arc<Scanner>, config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            scanner,
            schedule: parse_schedule(&config.schedule)?,
            expression: config.schedule.clone(),
        })
    }

    /// Spawn the scheduler: one scan immediately, then one per cron fire.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(async move {
            info!(schedule = %self.expression, "Scan scheduler started, running initial scan");
            self.scanner.scheduled_scan().await;

            loop {
                let Some(next) = self.schedule.upcoming(Utc).next() else {
                    error!("Scan schedule yields no future fire times, stopping scheduler");
                    break;
                };
                let delay = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                debug!(next = %next, "Sleeping until next scheduled scan");

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scan scheduler received shutdown signal");
                        break;
                    }
                    _ = sleep(delay) => {
                        self.scanner.scheduled_scan().await;
                    }
                }
            }
        });

        SchedulerHandle { shutdown_tx, task }
    }
}
