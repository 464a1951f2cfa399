//! ---
//! np_section: "01-core-functionality"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Runtime helpers supporting the pipeline."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Tick scheduling helpers for the NetPulse runtime.

pub mod scheduling;

pub use scheduling::{RateLimiter, TaskSet};
