//! Insert worker
//!
//! Each worker pulls one record at a time, writes it through the gateway and
//! lets the record's work unit signal the barrier. Two tokens stop it:
//!
//! - `halt` is checked before every dequeue; fail-fast cancels it so no new
//!   record is picked up while inserts already running complete normally.
//! - `shutdown` (the parent of `halt`) also abandons the insert in flight.

use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::gateway::PersistenceGateway;
use super::queue::QueueReceiver;
use super::types::{WorkItem, WorkerFailure, WorkerReport};
use crate::config::FailurePolicy;

pub(crate) struct Worker {
    pub id: usize,
    pub queue: QueueReceiver<WorkItem>,
    pub gateway: Arc<dyn PersistenceGateway>,
    pub failures: mpsc::UnboundedSender<WorkerFailure>,
    pub policy: FailurePolicy,
    pub halt: CancellationToken,
    pub shutdown: CancellationToken,
    pub progress: ProgressBar,
}

impl Worker {
    /// Process records until the queue is drained or the run is halted
    pub async fn run(self) -> WorkerReport {
        let mut report = WorkerReport {
            worker: self.id,
            ..WorkerReport::default()
        };

        loop {
            let item = tokio::select! {
                biased;
                _ = self.halt.cancelled() => {
                    debug!(worker = self.id, "Dispatch halted, worker stopping");
                    break;
                }
                item = self.queue.next() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            self.process(item, &mut report).await;
        }

        debug!(
            worker = self.id,
            succeeded = report.succeeded,
            failed = report.failed,
            "Worker finished"
        );
        report
    }

    async fn process(&self, item: WorkItem, report: &mut WorkerReport) {
        let WorkItem {
            index,
            record,
            unit,
        } = item;

        let result = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                warn!(worker = self.id, code = %record.code, "Insert abandoned on shutdown");
                report.interrupted += 1;
                return;
            }
            result = self.gateway.insert_account(&record) => result,
        };

        match result {
            Ok(id) => {
                trace!(worker = self.id, code = %record.code, id, "Account inserted");
                report.succeeded += 1;
            },
            Err(error) => {
                warn!(
                    worker = self.id,
                    index,
                    code = %record.code,
                    error = %error,
                    "Account insert failed"
                );
                report.failed += 1;

                // The orchestrator drains this channel only after the barrier
                // releases, and it outlives every worker.
                let _ = self.failures.send(WorkerFailure {
                    index,
                    code: record.code,
                    error,
                });

                if self.policy == FailurePolicy::FailFast {
                    self.halt.cancel();
                }
            },
        }

        self.progress.inc(1);
        // Signal only after the failure (if any) has been reported.
        unit.complete();
    }
}
