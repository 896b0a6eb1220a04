//! # Run lifecycle tracking.
//!
//! - [`RunLifecycleTracker`] the deduplicating Start/End state machine
//! - [`BoundedSeenSet`] FIFO-evicting memory of finalized runs
//! - [`Commands`] the ordered commands produced by one ingestion
//!
//! ## Wiring
//! ```text
//! RunSnapshot ──► tracker.accepts()? ──► tracker.ingest() ──► Commands ──► sink writes
//!                                              │
//!                                              └─► BoundedSeenSet (finalized runs)
//! ```

mod seen;
mod tracker;

pub use seen::{BoundedSeenSet, DEFAULT_SEEN_CAPACITY};
pub use tracker::{Commands, RunLifecycleTracker, TrackerConfig};
