//! # Post commands emitted by the lifecycle tracker.
//!
//! A [`PostCommand`] is one report a sink should write: a run started, or a
//! run ended (possibly inferred as crashed). Commands are immutable once emitted.

use std::fmt;

use super::snapshot::{RunNumber, RunSnapshot};

/// One outbound report produced by [`RunLifecycleTracker`](crate::RunLifecycleTracker).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostCommand {
    /// The run was observed starting.
    Start(RunSnapshot),
    /// The run concluded. `crashed` is true for abnormal or inferred ends.
    End {
        snapshot: RunSnapshot,
        crashed: bool,
    },
}

impl PostCommand {
    /// Snapshot the command reports on.
    pub fn snapshot(&self) -> &RunSnapshot {
        match self {
            PostCommand::Start(snapshot) => snapshot,
            PostCommand::End { snapshot, .. } => snapshot,
        }
    }

    #[inline]
    pub fn run_number(&self) -> RunNumber {
        self.snapshot().run_number()
    }

    #[inline]
    pub fn is_start(&self) -> bool {
        matches!(self, PostCommand::Start(_))
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, PostCommand::End { .. })
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PostCommand::Start(_) => "start",
            PostCommand::End { crashed: false, .. } => "end",
            PostCommand::End { crashed: true, .. } => "end_crashed",
        }
    }
}

impl fmt::Display for PostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_label(), self.run_number())
    }
}
