//! # Core sink trait
//!
//! `Sink` is the extension point for reporting backends. Each sink is driven
//! by a dedicated pipeline fed by an unbounded queue owned by the
//! [`FanoutDispatcher`](crate::FanoutDispatcher).
//!
//! ## Contract
//! - `filter` is a cheap, synchronous pre-check; `false` drops the snapshot silently.
//! - `deliver` may be slow (HTTP, process spawn, rate gating); it only delays
//!   its own pipeline, never the producer nor other sinks.
//! - The pipeline owns the sink exclusively and calls it sequentially, so
//!   `deliver` takes `&mut self` and needs no internal locking.
//! - Errors are reported, logged, and the snapshot is dropped for this sink.
//!
//! ## Example (skeleton)
//! ```rust
//! use async_trait::async_trait;
//! use runvisor::{DeliveryError, RunSnapshot, Sink};
//!
//! struct Counter(u64);
//!
//! #[async_trait]
//! impl Sink for Counter {
//!     async fn deliver(&mut self, _snapshot: &RunSnapshot) -> Result<(), DeliveryError> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//!
//!     fn filter(&self, snapshot: &RunSnapshot) -> bool {
//!         !snapshot.dev_run()
//!     }
//!
//!     fn name(&self) -> &str { "counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::run::RunSnapshot;

/// Contract for reporting backends.
///
/// Called from a sink-dedicated pipeline task, one snapshot at a time.
/// Implementations should prefer async I/O over blocking calls.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Writes whatever this sink reports for `snapshot`.
    async fn deliver(&mut self, snapshot: &RunSnapshot) -> Result<(), DeliveryError>;

    /// Returns `false` to drop the snapshot before delivery.
    ///
    /// Default: accept everything.
    fn filter(&self, _snapshot: &RunSnapshot) -> bool {
        true
    }

    /// Human-readable name (for logs and events).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
