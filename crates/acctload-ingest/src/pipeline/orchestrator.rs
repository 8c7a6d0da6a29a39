//! Ingestion orchestrator
//!
//! Drives one run: load the record sequence, mint one work unit per record,
//! start the worker pool, submit everything, wait on the completion barrier,
//! then fold the worker reports and reported failures into an
//! [`IngestReport`] or an [`IngestError`].

use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::barrier::CompletionBarrier;
use super::gateway::PersistenceGateway;
use super::queue::{dispatch_queue, Dispatcher};
use super::source::RecordSource;
use super::types::{IngestReport, RecordFailure, WorkItem, WorkerFailure};
use super::worker::Worker;
use crate::account::AccountRecord;
use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::{IngestError, IngestResult};

/// Runs account records through a fixed pool of insert workers
pub struct IngestOrchestrator {
    config: PipelineConfig,
    gateway: Arc<dyn PersistenceGateway>,
    shutdown: CancellationToken,
    progress: ProgressBar,
}

impl IngestOrchestrator {
    pub fn new(config: PipelineConfig, gateway: Arc<dyn PersistenceGateway>) -> Self {
        Self {
            config,
            gateway,
            shutdown: CancellationToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Cancel the run through `token` (e.g. on Ctrl-C)
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Advance `bar` once per processed record
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load every record from `source`, then ingest them
    pub async fn run_source(&self, source: &dyn RecordSource) -> IngestResult<IngestReport> {
        let origin = source.describe();
        info!(origin = %origin, "Loading records");

        let records = source
            .load()
            .await
            .map_err(|source| IngestError::Source { origin: origin.clone(), source })?;

        info!(origin = %origin, records = records.len(), "Records loaded");
        self.run(records).await
    }

    /// Ingest a fully materialized record sequence
    pub async fn run(&self, records: Vec<AccountRecord>) -> IngestResult<IngestReport> {
        self.config.validate().map_err(IngestError::Config)?;

        let run_id = Uuid::new_v4();
        let total = records.len();
        let workers = self.config.workers;
        let policy = self.config.failure_policy;

        info!(run_id = %run_id, total, workers, policy = %policy, "Starting ingestion run");

        // Units are minted with the barrier, before anything can be submitted.
        let (barrier, units) = CompletionBarrier::register(total);
        let items = records
            .into_iter()
            .zip(units)
            .enumerate()
            .map(|(index, (record, unit))| WorkItem { index, record, unit });

        let capacity = self.config.queue_capacity.unwrap_or(total);
        let (dispatcher, queue) = dispatch_queue(capacity);
        let (failure_tx, mut failure_rx) = mpsc::unbounded_channel();
        let halt = self.shutdown.child_token();
        self.progress.set_length(total as u64);

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let worker = Worker {
                id,
                queue: queue.clone(),
                gateway: Arc::clone(&self.gateway),
                failures: failure_tx.clone(),
                policy,
                halt: halt.clone(),
                shutdown: self.shutdown.clone(),
                progress: self.progress.clone(),
            };
            let span = info_span!("worker", run_id = %run_id, worker = id);
            handles.push(tokio::spawn(worker.run().instrument(span)));
        }
        // Workers hold the only receivers, so buffered records are dropped
        // (and their units signaled) as soon as the last worker exits.
        drop(queue);
        drop(failure_tx);

        let started = Instant::now();
        let submitted = submit_all(&dispatcher, items, &halt).await;
        dispatcher.close();
        debug!(run_id = %run_id, submitted, "Dispatch queue closed");

        barrier.wait().await;
        let elapsed = started.elapsed();

        let mut succeeded = 0;
        let mut failed = 0;
        let mut panicked = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => {
                    succeeded += report.succeeded;
                    failed += report.failed;
                    if report.interrupted > 0 {
                        warn!(run_id = %run_id, worker, interrupted = report.interrupted, "Worker abandoned inserts");
                    }
                },
                Err(e) => {
                    error!(run_id = %run_id, worker, error = %e, "Worker panicked");
                    panicked.get_or_insert(IngestError::WorkerPanicked {
                        worker,
                        message: e.to_string(),
                    });
                },
            }
        }

        let mut first_failure: Option<WorkerFailure> = None;
        let mut failures = Vec::new();
        while let Ok(failure) = failure_rx.try_recv() {
            failures.push(RecordFailure {
                index: failure.index,
                code: failure.code.clone(),
                error: failure.error.to_string(),
            });
            first_failure.get_or_insert(failure);
        }

        let report = IngestReport {
            run_id,
            workers,
            total,
            submitted,
            succeeded,
            failed,
            skipped: total.saturating_sub(succeeded + failed),
            elapsed,
            failures,
        };

        info!(
            run_id = %run_id,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Ingestion run finished"
        );

        if let Some(err) = panicked {
            return Err(err);
        }

        if self.shutdown.is_cancelled() && report.skipped > 0 {
            return Err(IngestError::Cancelled {
                processed: report.processed(),
                total,
                report: Box::new(report),
            });
        }

        if policy == FailurePolicy::FailFast {
            if let Some(failure) = first_failure {
                if report.failed > 1 {
                    warn!(
                        run_id = %run_id,
                        additional = report.failed - 1,
                        "Further inserts failed while the run was stopping"
                    );
                }
                return Err(IngestError::RecordFailed {
                    index: failure.index,
                    code: failure.code,
                    source: failure.error,
                    report: Box::new(report),
                });
            }
        }

        Ok(report)
    }
}

/// Submit items until they run out, the run halts, or every worker is gone
///
/// Items left unsubmitted are dropped on return, signaling their units.
async fn submit_all(
    dispatcher: &Dispatcher<WorkItem>,
    items: impl Iterator<Item = WorkItem>,
    halt: &CancellationToken,
) -> usize {
    let mut submitted = 0;

    for item in items {
        tokio::select! {
            biased;
            _ = halt.cancelled() => {
                debug!(submitted, "Dispatch halted before all records were submitted");
                break;
            }
            result = dispatcher.submit(item) => match result {
                Ok(()) => submitted += 1,
                Err(_) => {
                    warn!(submitted, "All workers exited before dispatch finished");
                    break;
                }
            },
        }
    }

    submitted
}
