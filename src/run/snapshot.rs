//! # Run snapshots: one observation of a run at poll time.
//!
//! [`RunSnapshot`] is immutable once built. Producers poll the facility and
//! publish a fresh snapshot each cycle, so the same run appears many times
//! with evolving fields (typically `end_time` appears later).
//!
//! ## Construction
//! ```text
//! RunSnapshot::builder(17215)
//!     .start_time(t0)              (required)
//!     .end_time(t1)                (optional, must be >= start_time)
//!     .configuration("bnbTest")
//!     .build()? ──► RunSnapshot
//!                └► SnapshotError::{MissingStartTime, EndBeforeStart}
//! ```
//!
//! ## Rules
//! - A snapshot with `end_time` set describes a concluded run.
//! - `dev_run = true` snapshots are never reported by any lifecycle-aware sink.
//!
//! ## Example
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use runvisor::RunSnapshot;
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
//! let snap = RunSnapshot::builder(17215)
//!     .start_time(t0)
//!     .configuration("bnbTest")
//!     .components(["tpc01", "pmt01"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(snap.run_number(), 17215);
//! assert!(!snap.has_ended());
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{ConfigError, SnapshotError};

/// Timestamp type used for run start/end times.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a run; the natural ordering key.
pub type RunNumber = u64;

/// One observation of a run's state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSnapshot {
    run_number: RunNumber,
    start_time: Timestamp,
    end_time: Option<Timestamp>,
    configuration: String,
    components: Vec<String>,
    metadata: String,
    comments: Option<String>,
    bad_end: bool,
    dev_run: bool,
}

impl RunSnapshot {
    /// Starts building a snapshot for `run_number`.
    pub fn builder(run_number: RunNumber) -> RunSnapshotBuilder {
        RunSnapshotBuilder::new(run_number)
    }

    pub fn run_number(&self) -> RunNumber {
        self.run_number
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    /// True if the run ended abnormally.
    pub fn bad_end(&self) -> bool {
        self.bad_end
    }

    /// True if the run came from a non-production context.
    pub fn dev_run(&self) -> bool {
        self.dev_run
    }

    /// True if this observation carries an end time.
    #[inline]
    pub fn has_ended(&self) -> bool {
        self.end_time.is_some()
    }

    /// Components joined the way reports display them (`"a, b, c"`).
    pub fn components_joined(&self) -> String {
        self.components.join(", ")
    }

    /// Renders one field as command-line arguments.
    ///
    /// ### Rules
    /// - Sequences expand into one argument per element.
    /// - Timestamps are formatted with `date_format`, then split on whitespace
    ///   (`"2024-03-01 12:00:00"` becomes two arguments).
    /// - Absent optionals render as a single empty argument.
    pub fn field_args(&self, field: RunField, date_format: &str) -> Vec<String> {
        let stamp = |t: Timestamp| {
            t.format(date_format)
                .to_string()
                .split_whitespace()
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };

        match field {
            RunField::RunNumber => vec![self.run_number.to_string()],
            RunField::StartTime => stamp(self.start_time),
            RunField::EndTime => self.end_time.map(stamp).unwrap_or_else(|| vec![String::new()]),
            RunField::Configuration => vec![self.configuration.clone()],
            RunField::Components => self.components.clone(),
            RunField::Metadata => vec![self.metadata.clone()],
            RunField::Comments => vec![self.comments.clone().unwrap_or_default()],
            RunField::BadEnd => vec![self.bad_end.to_string()],
            RunField::DevRun => vec![self.dev_run.to_string()],
        }
    }
}

impl fmt::Display for RunSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run={} start={} end={} config={:?} components=[{}]",
            self.run_number,
            self.start_time.format("%Y-%m-%d %H:%M:%S"),
            self.end_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.configuration,
            self.components_joined(),
        )?;
        if let Some(comments) = &self.comments {
            write!(f, " comments={comments:?}")?;
        }
        if self.bad_end {
            f.write_str(" bad_end")?;
        }
        if self.dev_run {
            f.write_str(" dev")?;
        }
        Ok(())
    }
}

/// Builder for [`RunSnapshot`]; validation happens in [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct RunSnapshotBuilder {
    run_number: RunNumber,
    start_time: Option<Timestamp>,
    end_time: Option<Timestamp>,
    configuration: String,
    components: Vec<String>,
    metadata: String,
    comments: Option<String>,
    bad_end: bool,
    dev_run: bool,
}

impl RunSnapshotBuilder {
    fn new(run_number: RunNumber) -> Self {
        Self {
            run_number,
            start_time: None,
            end_time: None,
            configuration: String::new(),
            components: Vec::new(),
            metadata: String::new(),
            comments: None,
            bad_end: false,
            dev_run: false,
        }
    }

    pub fn start_time(mut self, t: Timestamp) -> Self {
        self.start_time = Some(t);
        self
    }

    pub fn end_time(mut self, t: Timestamp) -> Self {
        self.end_time = Some(t);
        self
    }

    /// Sets or clears the end time.
    pub fn maybe_end_time(mut self, t: Option<Timestamp>) -> Self {
        self.end_time = t;
        self
    }

    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    pub fn components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn bad_end(mut self, bad_end: bool) -> Self {
        self.bad_end = bad_end;
        self
    }

    pub fn dev_run(mut self, dev_run: bool) -> Self {
        self.dev_run = dev_run;
        self
    }

    /// Validates required fields and returns the snapshot.
    ///
    /// # Errors
    /// - [`SnapshotError::MissingStartTime`] if no start time was set.
    /// - [`SnapshotError::EndBeforeStart`] if `end_time < start_time`.
    pub fn build(self) -> Result<RunSnapshot, SnapshotError> {
        let start_time = self.start_time.ok_or(SnapshotError::MissingStartTime {
            run_number: self.run_number,
        })?;
        if let Some(end_time) = self.end_time {
            if end_time < start_time {
                return Err(SnapshotError::EndBeforeStart {
                    run_number: self.run_number,
                    start_time,
                    end_time,
                });
            }
        }

        Ok(RunSnapshot {
            run_number: self.run_number,
            start_time,
            end_time: self.end_time,
            configuration: self.configuration,
            components: self.components,
            metadata: self.metadata,
            comments: self.comments,
            bad_end: self.bad_end,
            dev_run: self.dev_run,
        })
    }
}

/// Named snapshot field, used to select what a shell sink forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunField {
    RunNumber,
    StartTime,
    EndTime,
    Configuration,
    Components,
    Metadata,
    Comments,
    BadEnd,
    DevRun,
}

impl RunField {
    /// Stable snake_case name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            RunField::RunNumber => "run_number",
            RunField::StartTime => "start_time",
            RunField::EndTime => "end_time",
            RunField::Configuration => "configuration",
            RunField::Components => "components",
            RunField::Metadata => "metadata",
            RunField::Comments => "comments",
            RunField::BadEnd => "bad_end",
            RunField::DevRun => "dev_run",
        }
    }
}

impl FromStr for RunField {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "run_number" => RunField::RunNumber,
            "start_time" => RunField::StartTime,
            "end_time" => RunField::EndTime,
            "configuration" => RunField::Configuration,
            "components" => RunField::Components,
            "metadata" => RunField::Metadata,
            "comments" => RunField::Comments,
            "bad_end" => RunField::BadEnd,
            "dev_run" => RunField::DevRun,
            other => {
                return Err(ConfigError::UnknownField {
                    field: other.to_string(),
                });
            }
        };
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_build_requires_start_time() {
        let err = RunSnapshot::builder(7).configuration("x").build().unwrap_err();
        assert!(matches!(err, SnapshotError::MissingStartTime { run_number: 7 }));
    }

    #[test]
    fn test_build_rejects_end_before_start() {
        let err = RunSnapshot::builder(7)
            .start_time(at(12, 0))
            .end_time(at(11, 0))
            .build()
            .unwrap_err();
        assert_eq!(err.as_label(), "snapshot_end_before_start");
    }

    #[test]
    fn test_end_equal_to_start_is_valid() {
        let snap = RunSnapshot::builder(7)
            .start_time(at(12, 0))
            .end_time(at(12, 0))
            .build()
            .unwrap();
        assert!(snap.has_ended());
    }

    #[test]
    fn test_field_args_split_timestamps_and_expand_lists() {
        let snap = RunSnapshot::builder(17215)
            .start_time(at(12, 30))
            .components(["tpc01", "pmt01"])
            .build()
            .unwrap();

        let fmt = "%Y-%m-%d %H:%M:%S";
        assert_eq!(snap.field_args(RunField::RunNumber, fmt), vec!["17215"]);
        assert_eq!(
            snap.field_args(RunField::StartTime, fmt),
            vec!["2024-03-01", "12:30:00"]
        );
        assert_eq!(snap.field_args(RunField::EndTime, fmt), vec![""]);
        assert_eq!(snap.field_args(RunField::Comments, fmt), vec![""]);
        assert_eq!(
            snap.field_args(RunField::Components, fmt),
            vec!["tpc01", "pmt01"]
        );
    }

    #[test]
    fn test_run_field_parse() {
        assert_eq!("end_time".parse::<RunField>().unwrap(), RunField::EndTime);
        assert_eq!(RunField::BadEnd.as_str(), "bad_end");
        let err = "doesn't exist".parse::<RunField>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { .. }));
    }

    #[test]
    fn test_display_line() {
        let snap = RunSnapshot::builder(5)
            .start_time(at(1, 2))
            .configuration("cosmics")
            .comments("test comment")
            .bad_end(true)
            .build()
            .unwrap();
        assert_eq!(
            snap.to_string(),
            "run=5 start=2024-03-01 01:02:00 end=- config=\"cosmics\" components=[] \
             comments=\"test comment\" bad_end"
        );
    }
}
