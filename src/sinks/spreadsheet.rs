//! # SpreadsheetSink: one row per run
//!
//! Keeps a spreadsheet in sync with the runs it sees. Column A holds run
//! numbers below `header_rows` header rows; each run's row is updated in
//! place as its snapshot evolves, or appended when the run is new.
//!
//! ## Row layout
//! ```text
//! | run | start date | start time | end time | configuration | components | comments |
//! | 17215 | 24/03/01 | 12:00:00 | 12:30:00 | bnbTest | tpc01, pmt01 |          |
//! ```
//!
//! ## Flow
//! ```text
//! filter: not dev, not below floor, not already completed
//! deliver:
//!   ├─► gate.acquire()                 (min interval between writes)
//!   ├─► service.run_column(first_row)  ──► run → row map (last occurrence wins)
//!   ├─► update_row(row) | append_row()
//!   └─► end_time set? ──► remember run as completed
//! ```
//!
//! The HTTP client for the actual spreadsheet API lives behind [`SheetService`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::dispatch::Sink;
use crate::error::{ConfigError, DeliveryError};
use crate::policies::RateGate;
use crate::run::{RunNumber, RunSnapshot};
use crate::tracking::BoundedSeenSet;

/// Spreadsheet backend boundary.
///
/// Rows are 1-based sheet rows.
#[async_trait]
pub trait SheetService: Send + Sync + 'static {
    /// Values of column A from `first_row` downward (empty cells as `""`).
    async fn run_column(&self, first_row: usize) -> Result<Vec<String>, DeliveryError>;

    /// Overwrites `row`; returns the number of updated cells.
    async fn update_row(&self, row: usize, values: &[String]) -> Result<u64, DeliveryError>;

    /// Appends a row after the last run row; returns the number of updated cells.
    async fn append_row(&self, values: &[String]) -> Result<u64, DeliveryError>;
}

/// Spreadsheet sink settings.
#[derive(Clone, Debug)]
pub struct SpreadsheetOptions {
    /// Rows above the first run row.
    pub header_rows: usize,
    /// Minimum interval between sheet writes.
    pub min_interval: Duration,
    /// Completed runs remembered to skip repeats.
    pub cache_capacity: usize,
    /// Runs below this floor are ignored.
    pub min_run: RunNumber,
}

impl Default for SpreadsheetOptions {
    fn default() -> Self {
        Self {
            header_rows: 0,
            min_interval: Duration::from_secs(10),
            cache_capacity: crate::tracking::DEFAULT_SEEN_CAPACITY,
            min_run: 0,
        }
    }
}

/// Writes run rows through a [`SheetService`].
pub struct SpreadsheetSink {
    name: String,
    service: Arc<dyn SheetService>,
    header_rows: usize,
    min_run: RunNumber,
    gate: RateGate,
    completed: BoundedSeenSet,
}

impl SpreadsheetSink {
    /// # Errors
    /// [`ConfigError::InvalidCapacity`] if `cache_capacity == 0`.
    pub fn new(
        name: impl Into<String>,
        service: Arc<dyn SheetService>,
        opts: SpreadsheetOptions,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.into(),
            service,
            header_rows: opts.header_rows,
            min_run: opts.min_run,
            gate: RateGate::new(opts.min_interval),
            completed: BoundedSeenSet::new(opts.cache_capacity)?,
        })
    }

    /// Cell values written for `snapshot`.
    pub fn row_values(snapshot: &RunSnapshot) -> Vec<String> {
        let start = snapshot.start_time();
        vec![
            snapshot.run_number().to_string(),
            start.format("%y/%m/%d").to_string(),
            start.format("%H:%M:%S").to_string(),
            snapshot
                .end_time()
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            snapshot.configuration().to_string(),
            snapshot.components_joined(),
            snapshot.comments().unwrap_or_default().to_string(),
        ]
    }

    /// Runs already finalized in the sheet by this sink.
    pub fn completed(&self) -> &BoundedSeenSet {
        &self.completed
    }

    /// Maps run numbers to sheet rows; unparsable cells are skipped.
    async fn run_rows(&self) -> Result<HashMap<RunNumber, usize>, DeliveryError> {
        let first_row = self.header_rows + 1;
        let column = self.service.run_column(first_row).await?;

        let mut rows = HashMap::with_capacity(column.len());
        for (i, cell) in column.iter().enumerate() {
            let row = first_row + i;
            let cell = cell.trim();
            if cell.is_empty() {
                continue;
            }
            match cell.parse::<RunNumber>() {
                Ok(run) => {
                    rows.insert(run, row);
                }
                Err(_) => {
                    tracing::warn!(sink = %self.name, row, cell, "invalid run number in sheet");
                }
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl Sink for SpreadsheetSink {
    async fn deliver(&mut self, snapshot: &RunSnapshot) -> Result<(), DeliveryError> {
        let run = snapshot.run_number();
        self.gate.acquire().await;

        let values = Self::row_values(snapshot);
        let rows = self.run_rows().await?;

        let updated = match rows.get(&run) {
            Some(&row) => {
                tracing::debug!(sink = %self.name, run, row, "updating run row");
                self.service.update_row(row, &values).await?
            }
            None => {
                tracing::debug!(sink = %self.name, run, "appending run row");
                self.service.append_row(&values).await?
            }
        };
        if updated == 0 {
            tracing::warn!(sink = %self.name, run, "sheet reported no updated cells");
        }

        if snapshot.has_ended() {
            self.completed.insert(run);
        }
        Ok(())
    }

    fn filter(&self, snapshot: &RunSnapshot) -> bool {
        !snapshot.dev_run()
            && snapshot.run_number() >= self.min_run
            && !self.completed.contains(snapshot.run_number())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
