//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Batch writer with bounded retry."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::sync::Arc;

use netpulse_metrics::{BatchResult, PipelineMetrics};
use netpulse_net::{MetricsStore, StoreError};
use netpulse_resilience::{Retrier, RetryError};
use netpulse_schema::Batch;
use thiserror::Error;
use tokio::sync::broadcast;

/// Why a batch was dropped.
#[derive(Debug, Clone, Error)]
pub enum WriteError {
    #[error("store rejected batch after {attempts} attempt(s): {source}")]
    Rejected { attempts: usize, source: StoreError },
    #[error("gave up after {attempts} attempt(s): {source}")]
    Exhausted { attempts: usize, source: StoreError },
    #[error("abandoned at shutdown after {attempts} attempt(s): {source}")]
    Abandoned { attempts: usize, source: StoreError },
}

impl WriteError {
    pub fn attempts(&self) -> usize {
        match self {
            WriteError::Rejected { attempts, .. }
            | WriteError::Exhausted { attempts, .. }
            | WriteError::Abandoned { attempts, .. } => *attempts,
        }
    }

    pub fn is_abandoned(&self) -> bool {
        matches!(self, WriteError::Abandoned { .. })
    }

    fn batch_result(&self) -> BatchResult {
        match self {
            WriteError::Rejected { .. } => BatchResult::Rejected,
            WriteError::Exhausted { .. } => BatchResult::Exhausted,
            WriteError::Abandoned { .. } => BatchResult::Abandoned,
        }
    }
}

impl From<RetryError<StoreError>> for WriteError {
    fn from(err: RetryError<StoreError>) -> Self {
        match err {
            RetryError::Permanent { error, attempts } => WriteError::Rejected {
                attempts,
                source: error,
            },
            RetryError::Exhausted { error, attempts } => WriteError::Exhausted {
                attempts,
                source: error,
            },
            RetryError::Abandoned { error, attempts } => WriteError::Abandoned {
                attempts,
                source: error,
            },
        }
    }
}

/// Result of one [`BatchWriter::submit`].
#[derive(Debug, Clone)]
pub enum WriteOutcome {
    /// Nothing to send; the store was not contacted.
    Empty,
    Delivered,
    /// Delivered after this many retries.
    DeliveredWithRetry(usize),
    Failed(WriteError),
}

impl WriteOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(
            self,
            WriteOutcome::Delivered | WriteOutcome::DeliveredWithRetry(_)
        )
    }
}

/// Delivers one population's batches. Holds nothing beyond the batch in
/// flight: a batch that cannot be delivered is dropped and reported.
pub struct BatchWriter {
    population: &'static str,
    store: Arc<dyn MetricsStore>,
    retrier: Retrier,
    metrics: Option<PipelineMetrics>,
}

impl BatchWriter {
    pub fn new(population: &'static str, store: Arc<dyn MetricsStore>, retrier: Retrier) -> Self {
        Self {
            population,
            store,
            retrier,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Write `batch`, retrying transient store errors. With `shutdown`, a
    /// pending backoff sleep is cut short and the batch abandoned; an attempt
    /// already in flight always completes.
    pub async fn submit(
        &mut self,
        batch: &Batch,
        shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> WriteOutcome {
        if batch.is_empty() {
            return WriteOutcome::Empty;
        }
        let store = self.store.clone();
        let report = self
            .retrier
            .run(
                self.population,
                |_attempt| {
                    let store = store.clone();
                    async move { store.write(batch).await }
                },
                StoreError::is_transient,
                shutdown,
            )
            .await;

        let attempts = report.attempts;
        let outcome = match report.result {
            Ok(()) if attempts <= 1 => WriteOutcome::Delivered,
            Ok(()) => WriteOutcome::DeliveredWithRetry(attempts - 1),
            Err(err) => WriteOutcome::Failed(err.into()),
        };
        if let Some(metrics) = &self.metrics {
            let result = match &outcome {
                WriteOutcome::Failed(err) => err.batch_result(),
                WriteOutcome::DeliveredWithRetry(_) => BatchResult::DeliveredWithRetry,
                _ => BatchResult::Delivered,
            };
            metrics.record_batch(self.population, result, batch.len(), attempts);
        }
        outcome
    }
}
