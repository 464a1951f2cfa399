//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Runtime helpers supporting the pipeline."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

/// Fixed-cadence ticker that waits one full period before the first tick.
///
/// Uses `MissedTickBehavior::Delay`: after an overrun the next tick fires
/// immediately, once, and the cadence restarts from that moment. Missed
/// ticks are never replayed as a burst.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
    ticks: u64,
}

impl RateLimiter {
    /// `period` must be non-zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, ticks: 0 }
    }

    /// Wait for the next tick and return its 1-based sequence number.
    pub async fn tick(&mut self) -> u64 {
        self.interval.tick().await;
        self.ticks += 1;
        self.ticks
    }
}

/// Named set of spawned long-running tasks, joined together at shutdown.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<(String, JoinHandle<Result<()>>)>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, fut: F)
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        self.tasks.push((name.into(), handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// Await every task. All tasks are joined even when one fails; the
    /// first failure is returned.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for (name, task) in self.tasks {
            let outcome = task
                .await
                .map_err(|err| anyhow!("task '{name}' join failure: {err}"))
                .and_then(|result| result);
            match outcome {
                Ok(()) => info!(target: "netpulse::rt", task = %name, "task finished"),
                Err(err) => {
                    error!(target: "netpulse::rt", task = %name, error = %err, "task failed");
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("task '{name}' failed")));
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
