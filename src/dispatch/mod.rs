//! # Fan-out dispatch to reporting sinks.
//!
//! This module provides the [`Sink`] trait and the [`FanoutDispatcher`]
//! that feeds every sink from one producer.
//!
//! ## Architecture
//! ```text
//! producer ── publish(RunSnapshot) ──► FanoutDispatcher
//!                                         ├──► [queue] ──► Pipeline ──► ConsoleSink
//!                                         ├──► [queue] ──► Pipeline ──► ShellSink
//!                                         ├──► [queue] ──► Pipeline ──► SpreadsheetSink
//!                                         └──► [queue] ──► Pipeline ──► LogbookSink
//! ```
//!
//! ## Sink types
//! - **Stateless sinks** accept every snapshot (console, shell).
//! - **Lifecycle-aware sinks** filter and deduplicate (spreadsheet cache,
//!   logbook [`RunLifecycleTracker`](crate::RunLifecycleTracker)).

mod dispatcher;
mod pipeline;
mod signal;
mod sink;

pub use dispatcher::{DEFAULT_BUS_CAPACITY, DispatcherBuilder, FanoutDispatcher};
pub use sink::Sink;
