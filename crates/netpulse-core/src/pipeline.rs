//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Pipeline orchestration and lifecycle management."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use netpulse_common::time::format_duration;
use netpulse_common::{AppConfig, SensorConfig, WriterConfig};
use netpulse_logging::{log_lifecycle_event, np_error, LifecycleOutcome, LogContext};
use netpulse_metrics::PipelineMetrics;
use netpulse_net::{MetricsStore, ModbusTcpClient, ModbusTcpConfig, RegisterSource};
use netpulse_resilience::{Retrier, RetryPolicy};
use netpulse_rt::{RateLimiter, TaskSet};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::population::{
    derive_seed, population_rng, AccessPointPopulation, Population, SensorPopulation,
    SwitchPopulation,
};
use crate::summary::TickSummary;
use crate::writer::{BatchWriter, WriteOutcome};

/// Populations plus the collaborators they share, ready to start.
pub struct Pipeline {
    populations: Vec<Box<dyn Population>>,
    store: Arc<dyn MetricsStore>,
    policy: RetryPolicy,
    seed: Option<u64>,
    metrics: Option<PipelineMetrics>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn MetricsStore>, policy: RetryPolicy) -> Self {
        Self {
            populations: Vec::new(),
            store,
            policy,
            seed: None,
            metrics: None,
        }
    }

    /// Build every configured population. The sensor talks Modbus/TCP to
    /// `sensor.host` unless `sensor_source` supplies another register source.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn MetricsStore>,
        sensor_source: Option<Box<dyn RegisterSource>>,
    ) -> Result<Self> {
        let seed = config.simulation.random_seed;
        let mut pipeline = Self::new(store, retry_policy(&config.writer)).with_seed(seed);
        if let Some(aps) = &config.access_points {
            let population = AccessPointPopulation::new(aps, population_rng(seed, "access_points"))
                .context("building access point population")?;
            pipeline = pipeline.with_population(Box::new(population));
        }
        if let Some(switches) = &config.switches {
            let population = SwitchPopulation::new(switches, population_rng(seed, "switches"))
                .context("building switch population")?;
            pipeline = pipeline.with_population(Box::new(population));
        }
        if let Some(sensor) = &config.sensor {
            let source = sensor_source.unwrap_or_else(|| modbus_source(sensor));
            let population =
                SensorPopulation::new(sensor, source).context("building sensor population")?;
            pipeline = pipeline.with_population(Box::new(population));
        }
        Ok(pipeline)
    }

    pub fn with_population(mut self, population: Box<dyn Population>) -> Self {
        self.populations.push(population);
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn population_names(&self) -> Vec<&'static str> {
        self.populations.iter().map(|p| p.name()).collect()
    }

    /// Prepare every population, then spawn one task each. Any preparation
    /// failure (e.g. the sensor refusing connections) aborts startup before
    /// a single task runs.
    pub async fn start(self) -> Result<PipelineHandle> {
        let Pipeline {
            mut populations,
            store,
            policy,
            seed,
            metrics,
        } = self;

        for population in &mut populations {
            let name = population.name();
            population
                .prepare()
                .await
                .with_context(|| format!("preparing population '{name}'"))?;
        }

        let max_backoff = policy.worst_case_backoff();
        let (shutdown_tx, _) = broadcast::channel(4);
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let mut tasks = TaskSet::new();
        let mut names = Vec::with_capacity(populations.len());

        for population in populations {
            let name = population.name();
            names.push(name);
            let retrier = match seed {
                Some(seed) => Retrier::new(policy).with_seed(derive_seed(seed, name)),
                None => Retrier::new(policy),
            };
            let mut writer = BatchWriter::new(name, store.clone(), retrier);
            if let Some(metrics) = &metrics {
                writer = writer.with_metrics(metrics.clone());
            }
            info!(
                target: "netpulse::core::pipeline",
                population = name,
                devices = population.device_count(),
                interval = %format_duration(population.interval()),
                max_backoff = %format_duration(max_backoff),
                store = %store.describe(),
                "population starting"
            );
            if max_backoff >= population.interval() {
                warn!(
                    target: "netpulse::core::pipeline",
                    population = name,
                    "retry backoff can outlast the sampling interval; ticks will slip while the store is down"
                );
            }
            tasks.spawn(
                name,
                run_population(
                    population,
                    writer,
                    metrics.clone(),
                    shutdown_tx.subscribe(),
                    failure_tx.clone(),
                ),
            );
        }
        log_lifecycle_event(
            None,
            "pipeline_started",
            &format!("{} population(s) running", names.len()),
            LifecycleOutcome::Success,
        );

        Ok(PipelineHandle {
            shutdown: shutdown_tx,
            tasks,
            names,
            failures: failure_rx,
        })
    }
}

/// Lifecycle control for a running pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    shutdown: broadcast::Sender<()>,
    tasks: TaskSet,
    names: Vec<&'static str>,
    failures: mpsc::UnboundedReceiver<&'static str>,
}

impl PipelineHandle {
    pub fn populations(&self) -> &[&'static str] {
        &self.names
    }

    /// Resolves with the name of the first population that stops with an
    /// error. Never resolves while every population is healthy.
    pub async fn population_failed(&mut self) -> &'static str {
        match self.failures.recv().await {
            Some(name) => name,
            None => std::future::pending().await,
        }
    }

    /// Keep the pipeline running until `stop` resolves or every population has
    /// ended, then shut down. A population that stops with an error is
    /// reported and the others keep sampling; its error is returned once the
    /// pipeline is down.
    pub async fn run_until<F>(mut self, stop: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        tokio::pin!(stop);
        let mut failed: Vec<&'static str> = Vec::new();
        let stop_result = loop {
            tokio::select! {
                signal = &mut stop => {
                    break signal.map(|signal| {
                        info!(target: "netpulse::core::pipeline", signal, "stop requested; shutting down");
                    });
                }
                name = self.population_failed() => {
                    failed.push(name);
                    let running = self.names.len().saturating_sub(failed.len());
                    error!(
                        target: "netpulse::core::pipeline",
                        population = name,
                        running,
                        "population ended with an error"
                    );
                    if running == 0 {
                        break Ok(());
                    }
                }
            }
        };

        let stopped = self.shutdown().await;
        stop_result?;
        if failed.is_empty() {
            return stopped;
        }
        let summary = format!("population(s) {} stopped with errors", failed.join(", "));
        match stopped {
            Ok(()) => Err(anyhow!(summary)),
            Err(err) => Err(err.context(summary)),
        }
    }

    /// Signal every population and wait for them. In-flight writes finish;
    /// a batch waiting out a retry backoff is abandoned.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        let result = self.tasks.join().await;
        let outcome = if result.is_ok() {
            LifecycleOutcome::Success
        } else {
            LifecycleOutcome::Fault
        };
        log_lifecycle_event(None, "pipeline_stopped", "pipeline shutdown complete", outcome);
        result
    }
}

/// `wait → sample → submit → log`, until shutdown or a population error.
async fn run_population(
    mut population: Box<dyn Population>,
    mut writer: BatchWriter,
    metrics: Option<PipelineMetrics>,
    mut shutdown: broadcast::Receiver<()>,
    failures: mpsc::UnboundedSender<&'static str>,
) -> Result<()> {
    let name = population.name();
    let mut limiter = RateLimiter::new(population.interval());
    if let Some(metrics) = &metrics {
        metrics.population_started();
    }

    let result = loop {
        let tick = tokio::select! {
            _ = shutdown.recv() => {
                debug!(target: "netpulse::core::pipeline", population = name, "shutdown signal received");
                break Ok(());
            }
            tick = limiter.tick() => tick,
        };

        let started = Instant::now();
        let sample = match population.sample(tick).await {
            Ok(sample) => sample,
            Err(err) => {
                let ctx = LogContext::population(name).with_tick(tick);
                np_error!(context = ctx, "population stopped: {err:#}");
                let _ = failures.send(name);
                break Err(err);
            }
        };
        if let Some(metrics) = &metrics {
            if sample.skipped.is_some() {
                metrics.record_skipped_read(name);
            }
            metrics.set_device_health(name, sample.offline, sample.slow);
        }

        let outcome = writer.submit(&sample.batch, Some(&mut shutdown)).await;
        let summary = TickSummary::new(name, tick, &sample, outcome, started.elapsed());
        summary.log();
        if let Some(metrics) = &metrics {
            metrics.record_tick(name, summary.elapsed.as_secs_f64());
        }
        // The backoff consumed the shutdown signal.
        if let WriteOutcome::Failed(err) = &summary.outcome {
            if err.is_abandoned() {
                break Ok(());
            }
        }
    };

    if let Some(metrics) = &metrics {
        metrics.population_stopped();
    }
    result
}

fn retry_policy(writer: &WriterConfig) -> RetryPolicy {
    RetryPolicy::new(
        writer.max_attempts,
        writer.base_delay,
        writer.max_delay,
        writer.jitter,
    )
}

fn modbus_source(sensor: &SensorConfig) -> Box<dyn RegisterSource> {
    let config = ModbusTcpConfig {
        endpoint: sensor.address(),
        unit_id: sensor.unit_id,
        connect_timeout: sensor.connect_timeout,
        io_timeout: sensor.io_timeout,
    };
    Box::new(ModbusTcpClient::new(config))
}
