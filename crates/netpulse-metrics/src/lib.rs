//! ---
//! np_section: "12-metrics"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Metrics registry and HTTP exporter."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Prometheus registry shared by the daemon and the pipeline, exported over
//! HTTP at `/metrics`.
use std::sync::Arc;

use anyhow::Result;
use prometheus::core::Collector;
use prometheus::Registry;

mod daemon;
mod exporter;
mod pipeline;

pub use daemon::DaemonMetrics;
pub use exporter::{spawn_http_server, MetricsServer};
pub use pipeline::{BatchResult, PipelineMetrics};
pub use prometheus;

pub type SharedRegistry = Arc<Registry>;

pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Register `collector` and hand back a handle to it.
pub(crate) fn register<C>(registry: &Registry, collector: C) -> Result<C>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}
