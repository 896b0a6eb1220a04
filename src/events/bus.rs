//! # Event bus for pipeline outcomes.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every sink
//! pipeline publishes what happened to each snapshot; observers (tests,
//! metrics, operator tooling) subscribe through
//! [`FanoutDispatcher::subscribe`](crate::FanoutDispatcher::subscribe).
//!
//! ## Architecture
//! ```text
//! Publishers (many):                 Receivers (any number):
//!   pipeline 1 ──┐
//!   pipeline 2 ──┼──────► Bus ───────► observer A
//!   pipeline N ──┤  (broadcast chan)  ► observer B
//!   dispatcher ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks a pipeline.
//! - **Bounded capacity**: receivers that fall behind get `RecvError::Lagged(n)`.
//! - **No persistence**: events with no active receivers are discarded.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to a minimum of 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; a no-op without receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
