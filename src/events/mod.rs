//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: sink pipelines (per-snapshot outcomes, exit) and
//!   `FanoutDispatcher` (stop requested, closed queues).
//! - **Consumers**: whatever subscribed via `FanoutDispatcher::subscribe()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
