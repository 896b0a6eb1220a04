//! # Runtime events emitted by sink pipelines and the dispatcher.
//!
//! The [`EventKind`] enum classifies what happened to a snapshot in one
//! pipeline, or to the pipeline itself. [`Event`] carries the metadata:
//! timestamps, sink name, run number, and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Events from one pipeline are published in processing order;
//! there is no ordering across pipelines.
//!
//! ## Example
//! ```rust
//! use runvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DeliveryFailed)
//!     .with_sink("logbook")
//!     .with_run(17215)
//!     .with_reason("503 service unavailable");
//!
//! assert_eq!(ev.kind, EventKind::DeliveryFailed);
//! assert_eq!(ev.sink.as_deref(), Some("logbook"));
//! assert_eq!(ev.run_number, Some(17215));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::run::RunNumber;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Per-snapshot outcomes ===
    /// The sink's filter rejected the snapshot.
    ///
    /// Sets: `sink`, `run_number`
    SnapshotDropped,

    /// The sink delivered the snapshot.
    ///
    /// Sets: `sink`, `run_number`
    Delivered,

    /// The sink's delivery failed; the snapshot is dropped for that sink.
    ///
    /// Sets: `sink`, `run_number`, `reason` (error label and message)
    DeliveryFailed,

    /// The sink panicked inside filter or deliver; the pipeline continues.
    ///
    /// Sets: `sink`, `run_number`, `reason` (panic message)
    SinkPanicked,

    /// `publish` found a pipeline's queue closed (its worker is gone).
    ///
    /// Sets: `sink`, `run_number`
    QueueClosed,

    // === Lifecycle ===
    /// `stop` was requested.
    ///
    /// Sets: `reason` (stop mode)
    StopRequested,

    /// A pipeline's consumption loop exited.
    ///
    /// Sets: `sink`, `reason` (`drained` or `cancelled`)
    PipelineStopped,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the sink, if applicable.
    pub sink: Option<Arc<str>>,
    /// Run the event concerns, if applicable.
    pub run_number: Option<RunNumber>,
    /// Human-readable reason (errors, panic details, stop mode).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            sink: None,
            run_number: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_sink(mut self, sink: impl Into<Arc<str>>) -> Self {
        self.sink = Some(sink.into());
        self
    }

    #[inline]
    pub fn with_run(mut self, run: RunNumber) -> Self {
        self.run_number = Some(run);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::DeliveryFailed | EventKind::SinkPanicked | EventKind::QueueClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::Delivered);
        let b = Event::new(EventKind::Delivered);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_failure_classification() {
        assert!(Event::new(EventKind::SinkPanicked).is_failure());
        assert!(!Event::new(EventKind::SnapshotDropped).is_failure());
    }
}
