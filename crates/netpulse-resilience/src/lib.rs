//! ---
//! np_section: "07-resilience"
//! np_subsection: "module"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Retry policy and retry driver."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! Bounded retry with exponential backoff and jitter.
#![warn(missing_docs)]

pub mod retry;

pub use retry::{RetryError, RetryPolicy, RetryReport, Retrier};

