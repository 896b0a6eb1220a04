//! # Runtime configuration.
//!
//! Provides [`Config`] centralized settings for the dispatcher and its sinks,
//! loadable from TOML.
//!
//! ## Example
//! ```toml
//! seen_capacity = 1000
//! min_run = 17000
//! stop = "drain"
//!
//! [[sinks]]
//! kind = "console"
//!
//! [[sinks]]
//! kind = "shell"
//! command = "echo"
//! forward = ["run_number", "start_time"]
//!
//! [[sinks]]
//! kind = "logbook"
//! min_interval_secs = 30
//! ```
//!
//! ## Rules
//! - Every error is a [`ConfigError`]; all are fatal at startup.
//! - Spreadsheet and logbook sinks additionally need a backend service at
//!   build time (see [`Services`](crate::Services)).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::DEFAULT_BUS_CAPACITY;
use crate::error::ConfigError;
use crate::policies::StopMode;
use crate::run::{RunField, RunNumber};
use crate::tracking::DEFAULT_SEEN_CAPACITY;

/// Default timestamp format for shell arguments and logbook fields.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Global configuration.
///
/// ## Field semantics
/// - `seen_capacity`: finalized runs remembered per lifecycle-aware sink (min 1)
/// - `min_run`: runs numbered below this floor are never reported
/// - `stop`: how pipelines wind down on a termination signal
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `sinks`: reporting backends, in fan-out order
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub seen_capacity: usize,
    pub min_run: RunNumber,
    pub stop: StopMode,
    pub bus_capacity: usize,
    pub sinks: Vec<SinkConfig>,
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `seen_capacity = 1000`
    /// - `min_run = 0` (no floor)
    /// - `stop = StopMode::Drain`
    /// - `bus_capacity = 1024`
    /// - no sinks
    fn default() -> Self {
        Self {
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            min_run: 0,
            stop: StopMode::default(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            sinks: Vec::new(),
        }
    }
}

impl Config {
    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every value that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seen_capacity == 0 {
            return Err(ConfigError::InvalidCapacity { capacity: 0 });
        }
        for sink in &self.sinks {
            sink.validate()?;
        }
        Ok(())
    }
}

/// One reporting backend, selected by `kind`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Prints every snapshot to stdout.
    Console(ConsoleConfig),
    /// Runs a command per snapshot.
    Shell(ShellConfig),
    /// Keeps one spreadsheet row per run.
    Spreadsheet(SpreadsheetConfig),
    /// Posts Run Start / Run End logbook entries.
    Logbook(LogbookConfig),
}

impl SinkConfig {
    /// Configured name, or the kind when none is set.
    pub fn name(&self) -> &str {
        match self {
            SinkConfig::Console(c) => c.name.as_deref().unwrap_or("console"),
            SinkConfig::Shell(c) => c.name.as_deref().unwrap_or("shell"),
            SinkConfig::Spreadsheet(c) => c.name.as_deref().unwrap_or("spreadsheet"),
            SinkConfig::Logbook(c) => c.name.as_deref().unwrap_or("logbook"),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SinkConfig::Console(_) => Ok(()),
            SinkConfig::Shell(c) => c.forward_fields(self.name()).map(|_| ()),
            SinkConfig::Spreadsheet(c) => min_interval(self.name(), c.min_interval_secs).map(|_| ()),
            SinkConfig::Logbook(c) => min_interval(self.name(), c.min_interval_secs).map(|_| ()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub name: Option<String>,
    /// Program to run; snapshot fields are passed as arguments.
    pub command: String,
    /// Snapshot field names forwarded as arguments, in order.
    pub forward: Vec<String>,
    /// `strftime` format for timestamp fields.
    pub date_format: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: None,
            command: String::new(),
            forward: Vec::new(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl ShellConfig {
    /// Validates the command and resolves the forwarded field names.
    pub fn forward_fields(&self, sink: &str) -> Result<Vec<RunField>, ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                sink: sink.to_string(),
            });
        }
        self.forward.iter().map(|f| f.parse()).collect()
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpreadsheetConfig {
    pub name: Option<String>,
    /// Rows above the first run row.
    pub header_rows: usize,
    /// Minimum seconds between sheet writes.
    pub min_interval_secs: f64,
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            name: None,
            header_rows: 0,
            min_interval_secs: 10.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogbookConfig {
    pub name: Option<String>,
    /// Logbook category entries are filed under.
    pub category: String,
    /// Minimum seconds between logbook posts.
    pub min_interval_secs: f64,
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            name: None,
            category: crate::sinks::DEFAULT_CATEGORY.to_string(),
            min_interval_secs: 30.0,
        }
    }
}

/// Longest accepted interval between backend writes.
pub const MAX_MIN_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Converts a seconds value into a gate interval, at most [`MAX_MIN_INTERVAL`].
pub(crate) fn min_interval(sink: &str, secs: f64) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidInterval {
        sink: sink.to_string(),
        reason,
    };
    let interval =
        Duration::try_from_secs_f64(secs).map_err(|err| invalid(format!("{secs}: {err}")))?;
    if interval > MAX_MIN_INTERVAL {
        return Err(invalid(format!(
            "{secs}s exceeds the {}s maximum",
            MAX_MIN_INTERVAL.as_secs()
        )));
    }
    Ok(interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.seen_capacity, 1000);
        assert_eq!(cfg.min_run, 0);
        assert_eq!(cfg.stop, StopMode::Drain);
        assert!(cfg.sinks.is_empty());
    }

    #[test]
    fn test_parse_all_sink_kinds() {
        let cfg = Config::from_toml_str(
            r#"
            min_run = 17000
            stop = "immediate"

            [[sinks]]
            kind = "console"

            [[sinks]]
            kind = "shell"
            name = "notify"
            command = "echo"
            forward = ["run_number", "start_time"]

            [[sinks]]
            kind = "spreadsheet"
            header_rows = 2

            [[sinks]]
            kind = "logbook"
            min_interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.min_run, 17000);
        assert_eq!(cfg.stop, StopMode::Immediate);
        let names: Vec<&str> = cfg.sinks.iter().map(SinkConfig::name).collect();
        assert_eq!(names, vec!["console", "notify", "spreadsheet", "logbook"]);

        match &cfg.sinks[1] {
            SinkConfig::Shell(shell) => {
                assert_eq!(shell.date_format, DEFAULT_DATE_FORMAT);
                assert_eq!(
                    shell.forward_fields("notify").unwrap(),
                    vec![RunField::RunNumber, RunField::StartTime]
                );
            }
            other => panic!("expected shell sink, got {other:?}"),
        }
        match &cfg.sinks[2] {
            SinkConfig::Spreadsheet(sheet) => {
                assert_eq!(sheet.header_rows, 2);
                assert_eq!(sheet.min_interval_secs, 10.0);
            }
            other => panic!("expected spreadsheet sink, got {other:?}"),
        }
        match &cfg.sinks[3] {
            SinkConfig::Logbook(logbook) => {
                assert_eq!(logbook.min_interval_secs, 5.0);
                assert_eq!(logbook.category, "DAQ/Automation");
            }
            other => panic!("expected logbook sink, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Config::from_toml_str("seen_capacity = 0").unwrap_err();
        assert_eq!(err.as_label(), "config_invalid_capacity");
    }

    #[test]
    fn test_unknown_forward_field_rejected() {
        let err = Config::from_toml_str(
            r#"
            [[sinks]]
            kind = "shell"
            command = "echo"
            forward = ["run_number", "doesn't exist"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { field } if field == "doesn't exist"));
    }

    #[test]
    fn test_empty_shell_command_rejected() {
        let err = Config::from_toml_str("[[sinks]]\nkind = \"shell\"\n").unwrap_err();
        assert_eq!(err.as_label(), "config_empty_command");
    }

    #[test]
    fn test_negative_interval_rejected() {
        let err = Config::from_toml_str(
            "[[sinks]]\nkind = \"logbook\"\nmin_interval_secs = -1.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInterval { .. }));
    }

    #[test]
    fn test_interval_above_one_day_rejected() {
        for secs in ["86401", "1e18", "1.5e19"] {
            let err = Config::from_toml_str(&format!(
                "[[sinks]]\nkind = \"spreadsheet\"\nmin_interval_secs = {secs}\n"
            ))
            .unwrap_err();
            assert_eq!(err.as_label(), "config_invalid_interval", "{secs}");
        }
        assert!(
            Config::from_toml_str("[[sinks]]\nkind = \"logbook\"\nmin_interval_secs = 86400\n")
                .is_ok()
        );
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "min_run = 42\n\n[[sinks]]\nkind = \"console\"").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.min_run, 42);
        assert_eq!(cfg.sinks.len(), 1);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("missing.toml")).unwrap_err();
        assert_eq!(err.as_label(), "config_io");
    }

    #[test]
    fn test_unknown_top_level_key_is_parse_error() {
        let err = Config::from_toml_str("capacity = 3").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }

    #[test]
    fn test_unknown_sink_kind_is_parse_error() {
        let err = Config::from_toml_str("[[sinks]]\nkind = \"fax\"\n").unwrap_err();
        assert_eq!(err.as_label(), "config_parse");
    }
}
