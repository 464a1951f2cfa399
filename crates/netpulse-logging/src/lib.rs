//! ---
//! np_section: "03-logging"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Structured logging context and macros."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Structured logging helpers. Every event emitted through the `np_*` macros
//! carries `population`, `device` and `tick` fields so per-tick output can be
//! filtered by population in the JSON logs.
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

#[doc(hidden)]
pub use tracing as __tracing;

/// Initialize a baseline tracing subscriber for tests and ad-hoc tools.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_test_writer())
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogContext<'a> {
    /// Population the event belongs to (`access_points`, `switches`, `sensor`).
    pub population: Option<&'a str>,
    /// Device label, when the event concerns a single device.
    pub device: Option<&'a str>,
    /// Tick sequence number within the population.
    pub tick: Option<u64>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context scoped to a population.
    pub fn population(population: &'a str) -> Self {
        Self::new().with_population(population)
    }

    /// Attach a population name.
    pub fn with_population(mut self, population: &'a str) -> Self {
        self.population = Some(population);
        self
    }

    /// Attach a device label.
    pub fn with_device(mut self, device: &'a str) -> Self {
        self.device = Some(device);
        self
    }

    /// Attach a tick value.
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }
}

/// Outcome of a population lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// The step completed.
    Success,
    /// The step failed or was aborted.
    Fault,
}

impl LifecycleOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            LifecycleOutcome::Success => "success",
            LifecycleOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized lifecycle event (population started, stopped, ...).
pub fn log_lifecycle_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: LifecycleOutcome,
) {
    let ctx = context.copied().unwrap_or_default();
    let population = ctx.population.unwrap_or("");
    let device = ctx.device.unwrap_or("");
    let tick = ctx.tick.unwrap_or_default();
    let outcome_str = outcome.as_str();
    // `tracing::event!` needs a constant level per call site.
    match outcome {
        LifecycleOutcome::Success => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome_str,
            population,
            device,
            tick,
            message = %message
        ),
        LifecycleOutcome::Fault => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome_str,
            population,
            device,
            tick,
            message = %message
        ),
    }
}
