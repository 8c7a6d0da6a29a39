//! Dispatch queue between the orchestrator and the worker pool
//!
//! A bounded tokio channel whose receiving half is shared by every worker.
//! Each item is handed to exactly one consumer; there is no ordering
//! guarantee between consumers. Once every [`QueueReceiver`] clone is gone,
//! items still buffered in the channel are dropped with it.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

/// Create a queue holding at most `capacity` undelivered items
///
/// A capacity of zero is raised to one.
pub fn dispatch_queue<T>(capacity: usize) -> (Dispatcher<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Dispatcher { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producing half, owned by the orchestrator
pub struct Dispatcher<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Dispatcher<T> {
    /// Enqueue `item`, waiting for space when the queue is full
    ///
    /// Fails only when no consumer is left, handing the item back.
    pub async fn submit(&self, item: T) -> Result<(), QueueClosed<T>> {
        self.tx
            .send(item)
            .await
            .map_err(|mpsc::error::SendError(item)| QueueClosed(item))
    }

    /// Signal that nothing more will be submitted
    ///
    /// Consumers drain what is buffered and then see end-of-stream.
    pub fn close(self) {}
}

/// Consuming half; clone one per worker
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Next item, or `None` once the queue is closed and drained
    pub async fn next(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

/// Returned by [`Dispatcher::submit`] when every consumer has gone away
#[derive(Error)]
#[error("dispatch queue has no remaining consumers")]
pub struct QueueClosed<T>(pub T);

impl<T> QueueClosed<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}
