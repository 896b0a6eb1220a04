//! Delivery policies.
//!
//! ## Contents
//! - [`RateGate`] minimum interval between a sink's backend writes
//! - [`StopMode`] how pipelines wind down on stop
//!
//! ## Quick wiring
//! ```text
//! LogbookSink / SpreadsheetSink
//!      └─► gate.acquire().await before every backend write
//!
//! FanoutDispatcher::stop(mode)
//!      ├─► StopMode::Drain      → close queues, pipelines finish what is queued
//!      └─► StopMode::Immediate  → cancel, pipelines exit after the in-flight delivery
//! ```
//!
//! ## Defaults
//! - `StopMode::Drain`.
//! - Spreadsheet gate 10s, logbook gate 30s (see [`SinkConfig`](crate::SinkConfig)).

mod rate;
mod stop;

pub use rate::RateGate;
pub use stop::StopMode;
