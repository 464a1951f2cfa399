//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Sampling and ingestion pipeline."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Device populations, the batch writer and the pipeline that drives them.
//!
//! Each population runs in its own task: wait one interval, sample every
//! device, assemble the batch, hand it to its [`BatchWriter`], log the
//! [`TickSummary`], repeat until shutdown.

pub mod pipeline;
pub mod population;
pub mod summary;
pub mod writer;

pub use pipeline::{Pipeline, PipelineHandle};
pub use population::{
    population_rng, AccessPointPopulation, Population, SensorPopulation, SwitchPopulation,
    TickSample,
};
pub use summary::TickSummary;
pub use writer::{BatchWriter, WriteError, WriteOutcome};
