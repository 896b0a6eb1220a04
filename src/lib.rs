//! # runvisor
//!
//! **Runvisor** reports the start and end of numbered data-taking runs to
//! independent backends, exactly once per run and in causal order.
//!
//! Inputs are polls: the same run is observed again and again with evolving
//! fields, runs can be skipped or arrive out of order, and some never get an
//! end time. The crate turns that stream into `Start`/`End` reports and fans
//! every observation out to sinks that never block one another.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 producer (polls the facility)
//!                              │ publish(RunSnapshot)
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  FanoutDispatcher                                                 │
//! │  - one unbounded queue per sink                                   │
//! │  - one pipeline task per sink                                     │
//! │  - CancellationToken (stop flag) + Bus (runtime events)           │
//! └──────┬──────────────────┬──────────────────┬──────────────────┬───┘
//!        ▼                  ▼                  ▼                  ▼
//!   ┌──────────┐      ┌──────────┐      ┌──────────────┐   ┌──────────────────┐
//!   │ Console  │      │  Shell   │      │ Spreadsheet  │   │     Logbook      │
//!   │ (stdout) │      │ (process)│      │ cache + gate │   │ tracker + gate   │
//!   └──────────┘      └──────────┘      └──────────────┘   └────────┬─────────┘
//!                                                                   ▼
//!                                                        RunLifecycleTracker
//!                                                        ├─ current run
//!                                                        └─ BoundedSeenSet
//! ```
//!
//! ### Pipeline
//! ```text
//! loop {
//!   ├─► wait for snapshot or stop
//!   ├─► sink.filter(snapshot) ── false ──► SnapshotDropped
//!   └─► sink.deliver(snapshot)
//!           ├─ Ok     ──► Delivered
//!           ├─ Err    ──► DeliveryFailed (logged, snapshot dropped)
//!           └─ panic  ──► SinkPanicked  (pipeline keeps running)
//! }
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types                                   |
//! |-----------------|----------------------------------------------------------|---------------------------------------------|
//! | **Runs**        | Snapshot data and the commands derived from it.          | [`RunSnapshot`], [`PostCommand`]            |
//! | **Tracking**    | Start/End deduplication state machine.                   | [`RunLifecycleTracker`], [`BoundedSeenSet`] |
//! | **Dispatch**    | Non-blocking fan-out to sinks.                           | [`FanoutDispatcher`], [`Sink`]              |
//! | **Sinks**       | Console, shell, spreadsheet and logbook backends.        | [`ConsoleSink`], [`LogbookSink`], ...       |
//! | **Policies**    | Per-sink write spacing and stop behaviour.               | [`RateGate`], [`StopMode`]                  |
//! | **Events**      | Runtime events for observers.                            | [`Event`], [`EventKind`]                    |
//! | **Config**      | TOML configuration.                                      | [`Config`], [`SinkConfig`]                  |
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use runvisor::{ConsoleSink, FanoutDispatcher, RunSnapshot, StopMode};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut dispatcher = FanoutDispatcher::builder()
//!         .with_sink(ConsoleSink::default())
//!         .build();
//!     dispatcher.start();
//!
//!     let snapshot = RunSnapshot::builder(17215)
//!         .start_time(Utc::now())
//!         .configuration("bnbTest")
//!         .components(["tpc01", "pmt01"])
//!         .build()?;
//!     dispatcher.publish(snapshot);
//!
//!     dispatcher.stop(StopMode::Drain).await;
//!     Ok(())
//! }
//! ```
mod config;
mod dispatch;
mod error;
mod events;
mod policies;
mod run;
mod sinks;
mod tracking;

// ---- Public re-exports ----

pub use config::{
    Config, ConsoleConfig, DEFAULT_DATE_FORMAT, LogbookConfig, MAX_MIN_INTERVAL, ShellConfig,
    SinkConfig, SpreadsheetConfig,
};
pub use dispatch::{DEFAULT_BUS_CAPACITY, DispatcherBuilder, FanoutDispatcher, Sink};
pub use error::{ConfigError, DeliveryError, SnapshotError};
pub use events::{Bus, Event, EventKind};
pub use policies::{RateGate, StopMode};
pub use run::{PostCommand, RunField, RunNumber, RunSnapshot, RunSnapshotBuilder, Timestamp};
pub use sinks::{
    ConsoleSink, DEFAULT_CATEGORY, END_FORM, EntryId, LogbookEntry, LogbookService, LogbookSink,
    START_FORM, Services, SheetService, ShellSink, SpreadsheetOptions, SpreadsheetSink,
    build_sinks,
};
pub use tracking::{
    BoundedSeenSet, Commands, DEFAULT_SEEN_CAPACITY, RunLifecycleTracker, TrackerConfig,
};
