//! ---
//! np_section: "12-metrics"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Daemon process metrics."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntGaugeVec, Opts};

use crate::{register, SharedRegistry};

/// Process-level metrics of `netpulsed`.
#[derive(Clone)]
pub struct DaemonMetrics {
    starts: IntCounter,
    config_load: Histogram,
    build_info: IntGaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts = register(
            &registry,
            IntCounter::new("netpulsed_starts_total", "Daemon start-ups")?,
        )?;
        let config_load = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "netpulsed_config_load_seconds",
                    "Seconds spent reading, overriding and validating configuration",
                )
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            )?,
        )?;
        let build_info = register(
            &registry,
            IntGaugeVec::new(
                Opts::new("netpulsed_build_info", "Always 1; labels carry build metadata"),
                &["version", "git_sha"],
            )?,
        )?;
        Ok(Self {
            starts,
            config_load,
            build_info,
        })
    }

    pub fn inc_start(&self) {
        self.starts.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, git_sha: &str) {
        self.build_info.with_label_values(&[version, git_sha]).set(1);
    }
}
