//! Shared test fixtures for ingestion tests
//!
//! Provides in-memory gateways and sources so the pipeline can be exercised
//! without a database.

#![allow(dead_code)]

use acctload_common::{AcctloadError, Result};
use acctload_ingest::pipeline::{GatewayError, PersistenceGateway, RecordSource};
use acctload_ingest::AccountRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,acctload_ingest=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Records with codes `X1..=Xn`
pub fn records(n: usize) -> Vec<AccountRecord> {
    (1..=n)
        .map(|i| AccountRecord::with_code(format!("X{}", i)))
        .collect()
}

/// Gateway that remembers every call and can be told to reject some codes
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<String>>,
    reject: HashSet<String>,
    delay: Option<Duration>,
    next_id: AtomicI64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts for these codes
    pub fn rejecting(mut self, codes: &[&str]) -> Self {
        self.reject = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Hold every insert for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Codes in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Inserts currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of inserts observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for RecordingGateway {
    async fn insert_account(&self, account: &AccountRecord) -> std::result::Result<i64, GatewayError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        self.calls.lock().unwrap().push(account.code.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.reject.contains(&account.code) {
            return Err(GatewayError::Rejected(format!("duplicate code {}", account.code)));
        }

        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Gateway whose inserts never complete
#[derive(Default)]
pub struct HangingGateway {
    pub started: AtomicUsize,
}

#[async_trait]
impl PersistenceGateway for HangingGateway {
    async fn insert_account(&self, _account: &AccountRecord) -> std::result::Result<i64, GatewayError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}

/// Source backed by a fixed list, or failing with a parse error
pub struct StaticSource {
    records: Option<Vec<AccountRecord>>,
}

impl StaticSource {
    pub fn new(records: Vec<AccountRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }

    pub fn failing() -> Self {
        Self { records: None }
    }
}

#[async_trait]
impl RecordSource for StaticSource {
    async fn load(&self) -> Result<Vec<AccountRecord>> {
        self.records
            .clone()
            .ok_or_else(|| AcctloadError::parse("account #3: invalid CreditLimit"))
    }

    fn describe(&self) -> String {
        "static fixture".to_string()
    }
}
