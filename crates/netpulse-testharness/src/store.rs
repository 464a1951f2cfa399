//! ---
//! np_section: "11-simulation"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Fault-injecting metrics store."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netpulse_net::{MetricsStore, StoreError};
use netpulse_schema::Batch;
use parking_lot::Mutex;
use tracing::debug;

/// How the store answers write attempts.
#[derive(Debug, Clone)]
pub enum StoreBehavior {
    /// Accept every batch.
    Accept,
    /// Fail the first `failures` attempts with `error`, then accept.
    FailFirst { failures: usize, error: StoreError },
    /// Fail every attempt with `error`.
    AlwaysFail(StoreError),
}

#[derive(Debug, Default)]
struct Recorded {
    attempts: usize,
    delivered: Vec<Batch>,
    attempt_sizes: Vec<usize>,
}

/// Metrics store double. Clones share state.
#[derive(Debug, Clone)]
pub struct FaultInjectingStore {
    behavior: Arc<Mutex<StoreBehavior>>,
    latency: Duration,
    recorded: Arc<Mutex<Recorded>>,
}

impl FaultInjectingStore {
    pub fn new(behavior: StoreBehavior) -> Self {
        Self {
            behavior: Arc::new(Mutex::new(behavior)),
            latency: Duration::ZERO,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub fn accepting() -> Self {
        Self::new(StoreBehavior::Accept)
    }

    /// Fail `failures` times with a transient 503, then accept.
    pub fn flaky(failures: usize) -> Self {
        Self::new(StoreBehavior::FailFirst {
            failures,
            error: StoreError::Unavailable {
                status: 503,
                body: "injected".to_owned(),
            },
        })
    }

    /// Fail every attempt with a transient connection error.
    pub fn unreachable() -> Self {
        Self::new(StoreBehavior::AlwaysFail(StoreError::Connect(
            "injected outage".to_owned(),
        )))
    }

    /// Refuse every batch with a non-transient 400.
    pub fn rejecting() -> Self {
        Self::new(StoreBehavior::AlwaysFail(StoreError::Rejected {
            status: 400,
            body: "injected".to_owned(),
        }))
    }

    /// Delay every write by `latency`, simulating a slow store.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Swap behaviour mid-test; attempt counting carries on.
    pub fn set_behavior(&self, behavior: StoreBehavior) {
        *self.behavior.lock() = behavior;
    }

    /// Total write attempts seen.
    pub fn attempts(&self) -> usize {
        self.recorded.lock().attempts
    }

    /// Batches accepted so far, in order.
    pub fn delivered(&self) -> Vec<Batch> {
        self.recorded.lock().delivered.clone()
    }

    pub fn delivered_batches(&self) -> usize {
        self.recorded.lock().delivered.len()
    }

    pub fn delivered_points(&self) -> usize {
        self.recorded.lock().delivered.iter().map(Batch::len).sum()
    }

    /// Point count of every attempted batch, accepted or not.
    pub fn attempt_sizes(&self) -> Vec<usize> {
        self.recorded.lock().attempt_sizes.clone()
    }
}

#[async_trait]
impl MetricsStore for FaultInjectingStore {
    async fn write(&self, batch: &Batch) -> Result<(), StoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let attempt = {
            let mut recorded = self.recorded.lock();
            recorded.attempts += 1;
            recorded.attempt_sizes.push(batch.len());
            recorded.attempts
        };
        let outcome = {
            let mut behavior = self.behavior.lock();
            match &mut *behavior {
                StoreBehavior::Accept => Ok(()),
                StoreBehavior::FailFirst { failures, error } => {
                    if *failures > 0 {
                        *failures -= 1;
                        Err(error.clone())
                    } else {
                        Ok(())
                    }
                }
                StoreBehavior::AlwaysFail(error) => Err(error.clone()),
            }
        };
        debug!(target: "netpulse::testharness", attempt, ok = outcome.is_ok(), "store write");
        if outcome.is_ok() {
            self.recorded.lock().delivered.push(batch.clone());
        }
        outcome
    }

    fn describe(&self) -> String {
        "fault-injecting store".to_owned()
    }
}
