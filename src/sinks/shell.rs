//! # ShellSink: runs a command per snapshot
//!
//! Invokes `command` with selected snapshot fields as arguments:
//! ```text
//! command = "notify-run", forward = ["run_number", "start_time", "components"]
//!   ──► notify-run 17215 2024-03-01 12:00:00 tpc01 pmt01
//! ```
//!
//! ## Rules
//! - Argument rendering follows [`RunSnapshot::field_args`].
//! - Failing to spawn the command is a permanent delivery error.
//! - A non-zero exit status is a transient delivery error.

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DEFAULT_DATE_FORMAT;
use crate::dispatch::Sink;
use crate::error::DeliveryError;
use crate::run::{RunField, RunSnapshot};

/// Runs a program for every snapshot.
#[derive(Debug)]
pub struct ShellSink {
    name: String,
    command: String,
    forward: Vec<RunField>,
    date_format: String,
}

impl ShellSink {
    pub fn new(name: impl Into<String>, command: impl Into<String>, forward: Vec<RunField>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            forward,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Overrides the `strftime` format for timestamp fields.
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Arguments passed to the command for `snapshot`.
    pub fn args(&self, snapshot: &RunSnapshot) -> Vec<String> {
        self.forward
            .iter()
            .flat_map(|field| snapshot.field_args(*field, &self.date_format))
            .collect()
    }
}

#[async_trait]
impl Sink for ShellSink {
    async fn deliver(&mut self, snapshot: &RunSnapshot) -> Result<(), DeliveryError> {
        let args = self.args(snapshot);
        tracing::debug!(sink = %self.name, command = %self.command, ?args, "running command");

        let status = Command::new(&self.command)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|err| {
                DeliveryError::permanent(&self.name, format!("spawn {}: {err}", self.command))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(DeliveryError::transient(
                &self.name,
                format!("{} exited with {status}", self.command),
            ))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
