//! # ConsoleSink: prints every snapshot
//!
//! Stateless; accepts everything. Useful for demos and as a local audit trail.
//!
//! ## Example output
//! ```text
//! run=17215 start=2024-03-01 12:00:00 end=- config="bnbTest" components=[tpc01, pmt01]
//! run=17215 start=2024-03-01 12:00:00 end=2024-03-01 12:30:00 config="bnbTest" components=[tpc01, pmt01]
//! ```

use std::io::Write;

use async_trait::async_trait;

use crate::dispatch::Sink;
use crate::error::DeliveryError;
use crate::run::RunSnapshot;

/// Writes one line per snapshot.
pub struct ConsoleSink {
    name: String,
    out: Box<dyn Write + Send>,
}

impl ConsoleSink {
    /// Console sink writing to stdout.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_writer(name, Box::new(std::io::stdout()))
    }

    /// Console sink writing to an arbitrary writer.
    pub fn with_writer(name: impl Into<String>, out: Box<dyn Write + Send>) -> Self {
        Self {
            name: name.into(),
            out,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new("console")
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn deliver(&mut self, snapshot: &RunSnapshot) -> Result<(), DeliveryError> {
        writeln!(self.out, "{snapshot}")
            .and_then(|()| self.out.flush())
            .map_err(|err| DeliveryError::permanent(&self.name, err.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_prints_one_line_per_snapshot() {
        let buf = Shared::default();
        let mut sink = ConsoleSink::with_writer("console", Box::new(buf.clone()));
        let snap = RunSnapshot::builder(17215)
            .start_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
            .configuration("bnbTest")
            .dev_run(true)
            .build()
            .unwrap();

        assert!(sink.filter(&snap), "console accepts everything, dev runs included");
        sink.deliver(&snap).await.unwrap();
        sink.deliver(&snap).await.unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("run=17215 start=2024-03-01 12:00:00"));
    }
}
