//! # LogbookSink: Run Start / Run End entries
//!
//! The lifecycle-aware sink. Every snapshot goes through the sink's own
//! [`RunLifecycleTracker`]; each emitted [`PostCommand`] becomes exactly one
//! logbook entry, spaced by a [`RateGate`].
//!
//! ## Entries
//! ```text
//! category = "DAQ/Automation"
//! Run Start: number, configuration, components, metadata, start_time
//! Run End:   number, configuration, components, metadata, end_time, crashed (Yes/No)
//!            reply_to = id of this run's Run Start entry, when this sink posted it
//! ```
//!
//! ## Rules
//! - `filter` applies the tracker's rejection rules (dev, floor, finalized).
//! - The tracker advances before writes; a failed write is not replayed.
//! - Every emitted command is attempted; the first failure is returned.
//! - A synthesized crash End carries no end time; `end_time` is left empty.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DEFAULT_DATE_FORMAT;
use crate::dispatch::Sink;
use crate::error::{ConfigError, DeliveryError};
use crate::policies::RateGate;
use crate::run::{PostCommand, RunNumber, RunSnapshot};
use crate::tracking::{RunLifecycleTracker, TrackerConfig};

/// Form name of start entries.
pub const START_FORM: &str = "Run Start";
/// Form name of end entries.
pub const END_FORM: &str = "Run End";
/// Default logbook category.
pub const DEFAULT_CATEGORY: &str = "DAQ/Automation";

/// Identifier the logbook assigns to a created entry.
pub type EntryId = String;

/// One logbook post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogbookEntry {
    pub category: String,
    pub form: &'static str,
    /// Form fields in posting order.
    pub fields: Vec<(&'static str, String)>,
    /// Entry this one replies to.
    pub reply_to: Option<EntryId>,
}

impl LogbookEntry {
    /// Builds the entry for `cmd` filed under `category`.
    pub fn from_command(category: &str, cmd: &PostCommand) -> Self {
        let snapshot = cmd.snapshot();
        let fmt = |t: chrono::DateTime<chrono::Utc>| t.format(DEFAULT_DATE_FORMAT).to_string();

        let mut fields = vec![
            ("number", snapshot.run_number().to_string()),
            ("configuration", snapshot.configuration().to_string()),
            ("components", snapshot.components_joined()),
            ("metadata", snapshot.metadata().to_string()),
        ];
        let form = match cmd {
            PostCommand::Start(_) => {
                fields.push(("start_time", fmt(snapshot.start_time())));
                START_FORM
            }
            PostCommand::End { crashed, .. } => {
                fields.push(("end_time", snapshot.end_time().map(fmt).unwrap_or_default()));
                fields.push(("crashed", if *crashed { "Yes" } else { "No" }.to_string()));
                END_FORM
            }
        };

        Self {
            category: category.to_string(),
            form,
            fields,
            reply_to: None,
        }
    }

    /// Value of a form field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Logbook backend boundary.
#[async_trait]
pub trait LogbookService: Send + Sync + 'static {
    /// Creates an entry; returns its identifier.
    async fn create_entry(&self, entry: &LogbookEntry) -> Result<EntryId, DeliveryError>;
}

/// Posts run starts and ends through a [`LogbookService`].
pub struct LogbookSink {
    name: String,
    service: Arc<dyn LogbookService>,
    tracker: RunLifecycleTracker,
    gate: RateGate,
    category: String,
    open_start: Option<(RunNumber, EntryId)>,
}

impl LogbookSink {
    /// # Errors
    /// [`ConfigError::InvalidCapacity`] if the tracker capacity is zero.
    pub fn new(
        name: impl Into<String>,
        service: Arc<dyn LogbookService>,
        tracker: TrackerConfig,
        gate: RateGate,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            service,
            tracker: RunLifecycleTracker::new(tracker)?,
            gate,
            category: DEFAULT_CATEGORY.to_string(),
            open_start: None,
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn tracker(&self) -> &RunLifecycleTracker {
        &self.tracker
    }

    async fn post(&mut self, cmd: &PostCommand) -> Result<(), DeliveryError> {
        let run = cmd.run_number();
        let mut entry = LogbookEntry::from_command(&self.category, cmd);

        if cmd.is_end() {
            if let Some((open_run, id)) = self.open_start.take() {
                if open_run == run {
                    entry.reply_to = Some(id);
                }
            }
        }

        self.gate.acquire().await;
        let id = self.service.create_entry(&entry).await?;
        tracing::info!(sink = %self.name, run, form = entry.form, entry = %id, "logbook entry created");

        if cmd.is_start() {
            self.open_start = Some((run, id));
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for LogbookSink {
    async fn deliver(&mut self, snapshot: &RunSnapshot) -> Result<(), DeliveryError> {
        let commands: Vec<PostCommand> = self.tracker.ingest(snapshot).collect();
        let mut first_err = None;
        for cmd in &commands {
            tracing::debug!(sink = %self.name, command = %cmd, "posting");
            if let Err(err) = self.post(cmd).await {
                tracing::warn!(sink = %self.name, command = %cmd, error = %err, "logbook entry lost");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn filter(&self, snapshot: &RunSnapshot) -> bool {
        self.tracker.accepts(snapshot)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
