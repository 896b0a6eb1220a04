//! # Stop modes for the fan-out dispatcher.

use serde::Deserialize;

/// How pipelines exit when the dispatcher is stopped.
///
/// In both modes an in-flight `deliver` call is never interrupted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Close the queues; each pipeline processes everything already queued, then exits.
    #[default]
    Drain,
    /// Cancel; each pipeline exits at its next dequeue, discarding queued snapshots.
    Immediate,
}

impl StopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopMode::Drain => "drain",
            StopMode::Immediate => "immediate",
        }
    }
}
