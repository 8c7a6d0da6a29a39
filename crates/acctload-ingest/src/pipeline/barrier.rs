//! Completion barrier
//!
//! The expected count is fixed when the barrier is created and the matching
//! [`WorkUnit`] tokens are minted in the same call, so no signal can arrive
//! before the count is known. A unit signals when it is dropped, whether the
//! record it travels with was written, failed, or was never dispatched.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub struct CompletionBarrier {
    expected: usize,
    remaining: AtomicUsize,
    notify: Notify,
}

impl CompletionBarrier {
    /// Create a barrier expecting `expected` signals, plus exactly that many units
    pub fn register(expected: usize) -> (Arc<Self>, Vec<WorkUnit>) {
        let barrier = Arc::new(Self {
            expected,
            remaining: AtomicUsize::new(expected),
            notify: Notify::new(),
        });

        let units = (0..expected)
            .map(|_| WorkUnit {
                barrier: Arc::clone(&barrier),
            })
            .collect();

        (barrier, units)
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Units not yet signaled
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_satisfied(&self) -> bool {
        self.remaining() == 0
    }

    /// Wait until every unit has signaled; returns at once when none were registered
    pub async fn wait(&self) {
        loop {
            // Register interest before checking so a final signal in between is not lost.
            let notified = self.notify.notified();
            if self.is_satisfied() {
                return;
            }
            notified.await;
        }
    }

    fn signal(&self) {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {},
            Err(_) => tracing::error!(
                expected = self.expected,
                "Completion barrier signaled more often than registered"
            ),
        }
    }
}

impl fmt::Debug for CompletionBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionBarrier")
            .field("expected", &self.expected)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Accounting token for one record; signals its barrier exactly once, on drop
pub struct WorkUnit {
    barrier: Arc<CompletionBarrier>,
}

impl WorkUnit {
    /// Mark the unit done
    pub fn complete(self) {}
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        self.barrier.signal();
    }
}

impl fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WorkUnit")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_barrier_is_satisfied_immediately() {
        let (barrier, units) = CompletionBarrier::register(0);
        assert!(units.is_empty());
        assert!(barrier.is_satisfied());

        tokio::time::timeout(Duration::from_millis(100), barrier.wait())
            .await
            .expect("wait on an empty barrier must not block");
    }

    #[tokio::test]
    async fn test_units_match_expected_count() {
        let (barrier, units) = CompletionBarrier::register(3);
        assert_eq!(units.len(), 3);
        assert_eq!(barrier.expected(), 3);
        assert_eq!(barrier.remaining(), 3);

        let mut units = units.into_iter();
        units.next().unwrap().complete();
        assert_eq!(barrier.remaining(), 2);

        drop(units);
        assert!(barrier.is_satisfied());
    }

    #[tokio::test]
    async fn test_wait_blocks_until_last_unit() {
        let (barrier, mut units) = CompletionBarrier::register(2);
        let last = units.pop().unwrap();
        units.pop().unwrap().complete();

        let pending = tokio::time::timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(pending.is_err(), "one unit is still outstanding");

        let waiter = {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move { barrier.wait().await })
        };
        tokio::task::yield_now().await;
        last.complete();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after the last unit")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_signals_wake_every_waiter() {
        let (barrier, units) = CompletionBarrier::register(256);

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move { barrier.wait().await })
            })
            .collect();

        let signalers: Vec<_> = units
            .into_iter()
            .map(|unit| tokio::spawn(async move { unit.complete() }))
            .collect();

        for signaler in signalers {
            signaler.await.unwrap();
        }
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("every waiter should be released")
                .unwrap();
        }
        assert_eq!(barrier.remaining(), 0);
    }
}
