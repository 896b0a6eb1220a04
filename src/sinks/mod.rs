//! # Reporting sinks.
//!
//! Concrete [`Sink`] implementations, selected at configuration time:
//!
//! | kind          | state                          | backend              |
//! |---------------|--------------------------------|----------------------|
//! | `console`     | none                           | stdout               |
//! | `shell`       | none                           | child process        |
//! | `spreadsheet` | completed-run cache, rate gate | [`SheetService`]     |
//! | `logbook`     | lifecycle tracker, rate gate   | [`LogbookService`]   |
//!
//! Network clients for the spreadsheet and logbook are supplied by the
//! embedding application through [`Services`].

mod console;
mod logbook;
mod shell;
mod spreadsheet;

use std::sync::Arc;

use chrono::Utc;

pub use console::ConsoleSink;
pub use logbook::{
    DEFAULT_CATEGORY, END_FORM, EntryId, LogbookEntry, LogbookService, LogbookSink, START_FORM,
};
pub use shell::ShellSink;
pub use spreadsheet::{SheetService, SpreadsheetOptions, SpreadsheetSink};

use crate::config::{Config, SinkConfig, min_interval};
use crate::dispatch::Sink;
use crate::error::ConfigError;
use crate::policies::RateGate;
use crate::tracking::TrackerConfig;

/// Backend clients available to [`build_sinks`].
#[derive(Clone, Default)]
pub struct Services {
    pub sheet: Option<Arc<dyn SheetService>>,
    pub logbook: Option<Arc<dyn LogbookService>>,
}

impl Services {
    pub fn with_sheet(mut self, sheet: Arc<dyn SheetService>) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn with_logbook(mut self, logbook: Arc<dyn LogbookService>) -> Self {
        self.logbook = Some(logbook);
        self
    }
}

/// Builds one sink per configured entry, in configuration order.
///
/// # Errors
/// Any [`ConfigError`] from validation, or [`ConfigError::MissingService`]
/// when a spreadsheet/logbook sink has no backend client.
pub fn build_sinks(cfg: &Config, services: &Services) -> Result<Vec<Box<dyn Sink>>, ConfigError> {
    cfg.validate()?;
    let started_at = Utc::now();

    let mut sinks: Vec<Box<dyn Sink>> = Vec::with_capacity(cfg.sinks.len());
    for entry in &cfg.sinks {
        let name = entry.name().to_string();
        let sink: Box<dyn Sink> = match entry {
            SinkConfig::Console(_) => Box::new(ConsoleSink::new(name)),
            SinkConfig::Shell(c) => {
                let forward = c.forward_fields(&name)?;
                Box::new(
                    ShellSink::new(name, c.command.clone(), forward)
                        .with_date_format(c.date_format.clone()),
                )
            }
            SinkConfig::Spreadsheet(c) => {
                let service = services.sheet.clone().ok_or(ConfigError::MissingService {
                    sink: name.clone(),
                    service: "sheet",
                })?;
                let opts = SpreadsheetOptions {
                    header_rows: c.header_rows,
                    min_interval: min_interval(&name, c.min_interval_secs)?,
                    cache_capacity: cfg.seen_capacity,
                    min_run: cfg.min_run,
                };
                Box::new(SpreadsheetSink::new(name, service, opts)?)
            }
            SinkConfig::Logbook(c) => {
                let service = services.logbook.clone().ok_or(ConfigError::MissingService {
                    sink: name.clone(),
                    service: "logbook",
                })?;
                let tracker = TrackerConfig {
                    seen_capacity: cfg.seen_capacity,
                    min_run: cfg.min_run,
                    started_at,
                };
                let gate = RateGate::new(min_interval(&name, c.min_interval_secs)?);
                Box::new(
                    LogbookSink::new(name, service, tracker, gate)?.with_category(c.category.clone()),
                )
            }
        };
        tracing::debug!(sink = sink.name(), "sink configured");
        sinks.push(sink);
    }
    Ok(sinks)
}
