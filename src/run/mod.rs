//! # Run data model.
//!
//! - [`RunSnapshot`] one observation of a run (built via [`RunSnapshotBuilder`])
//! - [`RunField`] named snapshot field, used by sinks that forward fields
//! - [`PostCommand`] a Start/End report emitted by the lifecycle tracker

mod command;
mod snapshot;

pub use command::PostCommand;
pub use snapshot::{RunField, RunNumber, RunSnapshot, RunSnapshotBuilder, Timestamp};
