//! ---
//! np_section: "12-metrics"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Sampling and delivery metrics per population."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts};

use crate::{register, SharedRegistry};

/// Final disposition of one submitted batch, used as the `result` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchResult {
    Delivered,
    DeliveredWithRetry,
    Exhausted,
    Rejected,
    Abandoned,
}

impl BatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchResult::Delivered => "delivered",
            BatchResult::DeliveredWithRetry => "delivered_with_retry",
            BatchResult::Exhausted => "exhausted",
            BatchResult::Rejected => "rejected",
            BatchResult::Abandoned => "abandoned",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, BatchResult::Delivered | BatchResult::DeliveredWithRetry)
    }
}

/// Counters and gauges describing the sampling loops and the batch writer,
/// all labelled by population.
#[derive(Clone, Debug)]
pub struct PipelineMetrics {
    registry: SharedRegistry,
    populations_running: IntGauge,
    ticks: IntCounterVec,
    points_written: IntCounterVec,
    points_dropped: IntCounterVec,
    batches: IntCounterVec,
    write_attempts: IntCounterVec,
    skipped_reads: IntCounterVec,
    offline_devices: IntGaugeVec,
    slow_devices: IntGaugeVec,
    tick_duration: HistogramVec,
}

impl PipelineMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let per_population = |name: &str, help: &str| -> Result<IntCounterVec> {
            register(&registry, IntCounterVec::new(Opts::new(name, help), &["population"])?)
        };
        let gauge = |name: &str, help: &str| -> Result<IntGaugeVec> {
            register(&registry, IntGaugeVec::new(Opts::new(name, help), &["population"])?)
        };

        let populations_running = register(
            &registry,
            IntGauge::new(
                "netpulse_populations_running",
                "Number of population loops currently running",
            )?,
        )?;
        let ticks = per_population("netpulse_ticks_total", "Completed sampling ticks")?;
        let points_written = per_population(
            "netpulse_points_written_total",
            "Points acknowledged by the metrics store",
        )?;
        let points_dropped = per_population(
            "netpulse_points_dropped_total",
            "Points discarded after a failed batch",
        )?;
        let batches = register(
            &registry,
            IntCounterVec::new(
                Opts::new("netpulse_batches_total", "Submitted batches by final result"),
                &["population", "result"],
            )?,
        )?;
        let write_attempts = per_population(
            "netpulse_write_attempts_total",
            "Store write attempts including retries",
        )?;
        let skipped_reads = per_population(
            "netpulse_skipped_reads_total",
            "Ticks skipped because a device read failed",
        )?;
        let offline_devices = gauge(
            "netpulse_offline_devices",
            "Devices reported offline in the most recent tick",
        )?;
        let slow_devices = gauge(
            "netpulse_slow_devices",
            "Devices flagged slow in the most recent tick",
        )?;
        let buckets = prometheus::exponential_buckets(0.0005, 2.0, 16)
            .context("tick duration buckets")?;
        let tick_duration = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "netpulse_tick_duration_seconds",
                    "Wall time from tick start to batch outcome",
                )
                .buckets(buckets),
                &["population"],
            )?,
        )?;

        Ok(Self {
            registry,
            populations_running,
            ticks,
            points_written,
            points_dropped,
            batches,
            write_attempts,
            skipped_reads,
            offline_devices,
            slow_devices,
            tick_duration,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn population_started(&self) {
        self.populations_running.inc();
    }

    pub fn population_stopped(&self) {
        self.populations_running.dec();
    }

    /// Record a finished tick and how long it took.
    pub fn record_tick(&self, population: &str, seconds: f64) {
        self.ticks.with_label_values(&[population]).inc();
        self.tick_duration
            .with_label_values(&[population])
            .observe(seconds);
    }

    /// Record a batch outcome after `attempts` store writes.
    pub fn record_batch(&self, population: &str, result: BatchResult, points: usize, attempts: usize) {
        self.batches
            .with_label_values(&[population, result.as_str()])
            .inc();
        self.write_attempts
            .with_label_values(&[population])
            .inc_by(attempts as u64);
        let counter = if result.is_delivered() {
            &self.points_written
        } else {
            &self.points_dropped
        };
        counter.with_label_values(&[population]).inc_by(points as u64);
    }

    pub fn record_skipped_read(&self, population: &str) {
        self.skipped_reads.with_label_values(&[population]).inc();
    }

    pub fn set_device_health(&self, population: &str, offline: usize, slow: usize) {
        self.offline_devices
            .with_label_values(&[population])
            .set(offline as i64);
        self.slow_devices
            .with_label_values(&[population])
            .set(slow as i64);
    }

    pub fn points_written(&self, population: &str) -> u64 {
        self.points_written.with_label_values(&[population]).get()
    }

    pub fn points_dropped(&self, population: &str) -> u64 {
        self.points_dropped.with_label_values(&[population]).get()
    }

    pub fn batches(&self, population: &str, result: BatchResult) -> u64 {
        self.batches
            .with_label_values(&[population, result.as_str()])
            .get()
    }

    pub fn write_attempts(&self, population: &str) -> u64 {
        self.write_attempts.with_label_values(&[population]).get()
    }

    pub fn skipped_reads(&self, population: &str) -> u64 {
        self.skipped_reads.with_label_values(&[population]).get()
    }

    pub fn ticks(&self, population: &str) -> u64 {
        self.ticks.with_label_values(&[population]).get()
    }

    pub fn offline_devices(&self, population: &str) -> i64 {
        self.offline_devices.with_label_values(&[population]).get()
    }

    pub fn slow_devices(&self, population: &str) -> i64 {
        self.slow_devices.with_label_values(&[population]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_registry;

    #[test]
    fn batch_outcomes_split_written_and_dropped_points() {
        let metrics = PipelineMetrics::new(new_registry()).unwrap();
        metrics.record_batch("switches", BatchResult::DeliveredWithRetry, 50, 3);
        metrics.record_batch("switches", BatchResult::Exhausted, 50, 4);
        assert_eq!(metrics.points_written("switches"), 50);
        assert_eq!(metrics.points_dropped("switches"), 50);
        assert_eq!(metrics.write_attempts("switches"), 7);
        assert_eq!(metrics.batches("switches", BatchResult::Exhausted), 1);
        assert_eq!(metrics.batches("access_points", BatchResult::Delivered), 0);
    }

    #[test]
    fn health_gauges_hold_last_tick() {
        let metrics = PipelineMetrics::new(new_registry()).unwrap();
        metrics.set_device_health("access_points", 2, 1);
        metrics.set_device_health("access_points", 0, 3);
        assert_eq!(metrics.offline_devices("access_points"), 0);
        assert_eq!(metrics.slow_devices("access_points"), 3);
    }
}
