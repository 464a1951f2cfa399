//! ---
//! np_section: "11-simulation"
//! np_subsection: "01-bootstrap"
//! np_type: "source"
//! np_scope: "code"
//! np_description: "Test doubles for the store and the field device."
//! np_version: "v0.1.0"
//! np_owner: "tbd"
//! ---
//! In-memory collaborators for exercising the pipeline without a network:
//! a [`FaultInjectingStore`] that fails on a schedule and records every
//! attempt, and a [`ScriptedRegisterSource`] that replays canned reads.

pub mod registers;
pub mod store;

pub use registers::{ScriptedRead, ScriptedRegisterSource};
pub use store::{FaultInjectingStore, StoreBehavior};
