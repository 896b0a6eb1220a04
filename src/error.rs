//! Error types used by runvisor.
//!
//! - [`DeliveryError`] a sink failed to write a report to its backend.
//! - [`SnapshotError`] a snapshot failed required-field validation.
//! - [`ConfigError`] invalid setup; fatal at startup.
//!
//! Out-of-order, duplicate, and stale snapshots are normal traffic and never
//! produce an error; the lifecycle tracker handles them by branching.
//! Each enum provides `as_label` for logs/events.

use thiserror::Error;

use crate::run::{RunNumber, Timestamp};

/// # Errors produced by a sink's delivery step.
///
/// Delivery failures only affect the sink that raised them. The pipeline
/// logs the error and drops the snapshot; the next poll re-supplies state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Backend temporarily unreachable, rate-limited, or reported a retryable failure.
    #[error("sink '{sink}' transient failure: {reason}")]
    Transient {
        /// Name of the failing sink.
        sink: String,
        /// Backend-provided detail.
        reason: String,
    },

    /// Backend rejected the write in a way that resubmission will not fix.
    #[error("sink '{sink}' permanent failure: {reason}")]
    Permanent {
        /// Name of the failing sink.
        sink: String,
        /// Backend-provided detail.
        reason: String,
    },
}

impl DeliveryError {
    pub fn transient(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        DeliveryError::Transient {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    pub fn permanent(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        DeliveryError::Permanent {
            sink: sink.into(),
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use runvisor::DeliveryError;
    ///
    /// let err = DeliveryError::transient("logbook", "503");
    /// assert_eq!(err.as_label(), "delivery_transient");
    /// assert!(err.is_transient());
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Transient { .. } => "delivery_transient",
            DeliveryError::Permanent { .. } => "delivery_permanent",
        }
    }

    /// True if a later resubmission may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Transient { .. })
    }
}

/// # Malformed snapshot errors.
///
/// Raised when building a [`RunSnapshot`](crate::RunSnapshot); a snapshot
/// that fails validation never reaches a tracker.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Required start time was not provided.
    #[error("run {run_number}: missing start_time")]
    MissingStartTime {
        /// Run the snapshot describes.
        run_number: RunNumber,
    },

    /// End time precedes start time.
    #[error("run {run_number}: end_time {end_time} is before start_time {start_time}")]
    EndBeforeStart {
        /// Run the snapshot describes.
        run_number: RunNumber,
        /// Observed start.
        start_time: Timestamp,
        /// Observed end.
        end_time: Timestamp,
    },
}

impl SnapshotError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SnapshotError::MissingStartTime { .. } => "snapshot_missing_start_time",
            SnapshotError::EndBeforeStart { .. } => "snapshot_end_before_start",
        }
    }
}

/// # Configuration errors.
///
/// All are fatal at startup and surfaced to the operator.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Seen-set capacity must be at least 1.
    #[error("invalid capacity {capacity}: must be at least 1")]
    InvalidCapacity {
        /// Offending value.
        capacity: usize,
    },

    /// Rate-gate interval is unusable.
    #[error("sink '{sink}': invalid min interval: {reason}")]
    InvalidInterval {
        /// Sink being configured.
        sink: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Shell sink configured without a command.
    #[error("shell sink '{sink}': empty command")]
    EmptyCommand {
        /// Sink being configured.
        sink: String,
    },

    /// Forwarded field name does not name a snapshot field.
    #[error("unknown run field '{field}'")]
    UnknownField {
        /// The unrecognized name.
        field: String,
    },

    /// A backend sink was configured but no service was provided for it.
    #[error("sink '{sink}' requires a {service} service")]
    MissingService {
        /// Sink being configured.
        sink: String,
        /// Kind of service required.
        service: &'static str,
    },

    /// Configuration text failed to parse.
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::InvalidCapacity { .. } => "config_invalid_capacity",
            ConfigError::InvalidInterval { .. } => "config_invalid_interval",
            ConfigError::EmptyCommand { .. } => "config_empty_command",
            ConfigError::UnknownField { .. } => "config_unknown_field",
            ConfigError::MissingService { .. } => "config_missing_service",
            ConfigError::Parse(_) => "config_parse",
            ConfigError::Io(_) => "config_io",
        }
    }
}
