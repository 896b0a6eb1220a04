//! # Run lifecycle tracker: turns repeated snapshots into Start/End reports.
//!
//! Inputs are polls, not events: the same run is observed many times, runs
//! can be skipped or arrive out of order, and some runs never receive an end
//! time. [`RunLifecycleTracker::ingest`] reduces that stream to at most one
//! `Start` and at most one `End` per run, with `Start` always first.
//!
//! ## States
//! ```text
//!             first snapshot                    same run, end_time set
//!   Empty ───────────────────► Tracking(ended=false) ──────────────────► Tracking(ended=true)
//!     │                            │        ▲                                  │
//!     │ first snapshot already     │        │ newer run, ongoing               │
//!     │ ended: End(bad_end)        │        │ (Start unless it began           │
//!     ▼                            │        │  before the tracker)             │
//!   Tracking(ended=true) ◄─────────┘        └──────────────────────────────────┘
//!        newer run: End(previous, crashed=true) if it never ended
//! ```
//!
//! ## Rules
//! - Dev runs, runs below the floor, and runs in `seen` are rejected outright.
//! - Older runs than the current one are stale: ignored, not added to `seen`.
//! - A newer run while the current one never ended synthesizes
//!   `End(current, crashed=true)` before anything about the newer run.
//! - A run already concluded when first observed gets no `Start`, only `End`.
//! - A run that began before the tracker was created gets no `Start`.
//! - State is owned by one pipeline; no internal locking.
//!
//! ## Example
//! ```rust
//! use chrono::{Duration, Utc};
//! use runvisor::{PostCommand, RunLifecycleTracker, RunSnapshot, TrackerConfig};
//!
//! let started = Utc::now();
//! let mut tracker = RunLifecycleTracker::new(TrackerConfig {
//!     started_at: started,
//!     ..TrackerConfig::default()
//! })
//! .unwrap();
//!
//! let run = |n, minutes| {
//!     RunSnapshot::builder(n)
//!         .start_time(started + Duration::minutes(minutes))
//!         .build()
//!         .unwrap()
//! };
//!
//! assert_eq!(tracker.ingest(&run(17215, 1)).count(), 0);
//!
//! let cmds: Vec<PostCommand> = tracker.ingest(&run(17216, 2)).collect();
//! assert_eq!(cmds.len(), 2);
//! assert!(matches!(&cmds[0], PostCommand::End { crashed: true, .. }));
//! assert!(cmds[1].is_start());
//! ```

use chrono::Utc;

use crate::error::ConfigError;
use crate::run::{PostCommand, RunNumber, RunSnapshot, Timestamp};
use crate::tracking::seen::{BoundedSeenSet, DEFAULT_SEEN_CAPACITY};

/// Tracker settings.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Capacity of the finalized-run set (min 1).
    pub seen_capacity: usize,
    /// Runs numbered below this floor are never reported.
    pub min_run: RunNumber,
    /// Startup reference: ongoing runs that started earlier get no `Start`.
    pub started_at: Timestamp,
}

impl Default for TrackerConfig {
    /// Defaults: capacity 1000, floor 0, `started_at = now`.
    fn default() -> Self {
        Self {
            seen_capacity: DEFAULT_SEEN_CAPACITY,
            min_run: 0,
            started_at: Utc::now(),
        }
    }
}

/// The run currently being tracked.
#[derive(Clone, Debug)]
struct CurrentRun {
    snapshot: RunSnapshot,
    ended: bool,
}

/// Deduplicating state machine over run snapshots.
#[derive(Debug)]
pub struct RunLifecycleTracker {
    current: Option<CurrentRun>,
    seen: BoundedSeenSet,
    min_run: RunNumber,
    started_at: Timestamp,
}

impl RunLifecycleTracker {
    /// Creates an empty tracker.
    ///
    /// # Errors
    /// [`ConfigError::InvalidCapacity`] if `seen_capacity == 0`.
    pub fn new(cfg: TrackerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            current: None,
            seen: BoundedSeenSet::new(cfg.seen_capacity)?,
            min_run: cfg.min_run,
            started_at: cfg.started_at,
        })
    }

    /// Returns `false` for snapshots that can never produce a command:
    /// dev runs, runs below the floor, and finalized runs.
    pub fn accepts(&self, snapshot: &RunSnapshot) -> bool {
        !snapshot.dev_run()
            && snapshot.run_number() >= self.min_run
            && !self.seen.contains(snapshot.run_number())
    }

    /// Consumes one observation and returns the commands it triggers (0..=2).
    ///
    /// Never fails: surprising input (duplicates, stale runs) yields nothing.
    pub fn ingest(&mut self, snapshot: &RunSnapshot) -> Commands {
        let run = snapshot.run_number();
        if !self.accepts(snapshot) {
            tracing::trace!(run, "snapshot rejected");
            return Commands::none();
        }

        let Some(current) = self.current.as_mut() else {
            return self.adopt_first(snapshot);
        };
        let current_run = current.snapshot.run_number();

        if run == current_run {
            if current.ended || !snapshot.has_ended() {
                return Commands::none();
            }
            current.snapshot = snapshot.clone();
            current.ended = true;
            self.seen.insert(run);
            tracing::debug!(run, crashed = snapshot.bad_end(), "run ended");
            return Commands::one(PostCommand::End {
                snapshot: snapshot.clone(),
                crashed: snapshot.bad_end(),
            });
        }

        if run < current_run {
            tracing::debug!(run, current = current_run, "stale snapshot ignored");
            return Commands::none();
        }

        // A newer run supersedes the current one.
        let superseded = if current.ended {
            None
        } else {
            tracing::debug!(
                run = current_run,
                next = run,
                "run superseded without end; reporting crash"
            );
            self.seen.insert(current_run);
            Some(PostCommand::End {
                snapshot: current.snapshot.clone(),
                crashed: true,
            })
        };

        let followup = self.adopt(snapshot);
        Commands {
            first: superseded,
            second: followup,
        }
    }

    /// Snapshot of the run currently tracked, if any.
    pub fn current_run(&self) -> Option<&RunSnapshot> {
        self.current.as_ref().map(|c| &c.snapshot)
    }

    /// True if the current run's end has already been reported.
    pub fn current_ended(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.ended)
    }

    /// Finalized runs.
    pub fn seen(&self) -> &BoundedSeenSet {
        &self.seen
    }

    pub fn min_run(&self) -> RunNumber {
        self.min_run
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// First observation: the run's start was not witnessed, so no `Start`.
    fn adopt_first(&mut self, snapshot: &RunSnapshot) -> Commands {
        let ended = snapshot.has_ended();
        self.current = Some(CurrentRun {
            snapshot: snapshot.clone(),
            ended,
        });

        if !ended {
            tracing::debug!(run = snapshot.run_number(), "adopted in-progress run");
            return Commands::none();
        }
        self.seen.insert(snapshot.run_number());
        tracing::debug!(run = snapshot.run_number(), "adopted concluded run");
        Commands::one(PostCommand::End {
            snapshot: snapshot.clone(),
            crashed: snapshot.bad_end(),
        })
    }

    /// Adopts a newer run and returns the command reporting it, if any.
    fn adopt(&mut self, snapshot: &RunSnapshot) -> Option<PostCommand> {
        let run = snapshot.run_number();
        let ended = snapshot.has_ended();
        self.current = Some(CurrentRun {
            snapshot: snapshot.clone(),
            ended,
        });

        if ended {
            self.seen.insert(run);
            tracing::debug!(run, "new run already concluded; reporting end only");
            return Some(PostCommand::End {
                snapshot: snapshot.clone(),
                crashed: snapshot.bad_end(),
            });
        }

        if snapshot.start_time() < self.started_at {
            tracing::debug!(run, "run began before tracker start; start suppressed");
            return None;
        }
        tracing::debug!(run, "run started");
        Some(PostCommand::Start(snapshot.clone()))
    }
}

/// Commands emitted by one [`RunLifecycleTracker::ingest`] call, in order.
#[must_use = "commands must be delivered or they are lost"]
#[derive(Debug)]
pub struct Commands {
    first: Option<PostCommand>,
    second: Option<PostCommand>,
}

impl Commands {
    fn none() -> Self {
        Self {
            first: None,
            second: None,
        }
    }

    fn one(cmd: PostCommand) -> Self {
        Self {
            first: Some(cmd),
            second: None,
        }
    }
}

impl Iterator for Commands {
    type Item = PostCommand;

    fn next(&mut self) -> Option<PostCommand> {
        self.first.take().or_else(|| self.second.take())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.first.is_some()) + usize::from(self.second.is_some());
        (n, Some(n))
    }
}

impl ExactSizeIterator for Commands {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn tracker() -> RunLifecycleTracker {
        RunLifecycleTracker::new(TrackerConfig {
            seen_capacity: 1000,
            min_run: 0,
            started_at: t0(),
        })
        .unwrap()
    }

    fn ongoing(run: RunNumber) -> RunSnapshot {
        RunSnapshot::builder(run)
            .start_time(t0() + Duration::minutes(run as i64 % 600))
            .configuration("bnbTest")
            .build()
            .unwrap()
    }

    fn ended(run: RunNumber, bad_end: bool) -> RunSnapshot {
        let start = t0() + Duration::minutes(run as i64 % 600);
        RunSnapshot::builder(run)
            .start_time(start)
            .end_time(start + Duration::minutes(30))
            .configuration("bnbTest")
            .bad_end(bad_end)
            .build()
            .unwrap()
    }

    fn ingest(t: &mut RunLifecycleTracker, s: &RunSnapshot) -> Vec<PostCommand> {
        t.ingest(s).collect()
    }

    #[test]
    fn test_scenario_a_first_ongoing_run_is_adopted_silently() {
        let mut t = tracker();
        assert!(ingest(&mut t, &ongoing(100)).is_empty());
        assert_eq!(t.current_run().map(RunSnapshot::run_number), Some(100));
        assert!(!t.current_ended());
    }

    #[test]
    fn test_scenario_b_same_run_gains_end_time() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(100));

        let cmds = ingest(&mut t, &ended(100, false));
        assert_eq!(cmds.len(), 1);
        assert!(matches!(&cmds[0], PostCommand::End { snapshot, crashed: false } if snapshot.run_number() == 100));
        assert!(t.seen().contains(100));
        assert_eq!(t.seen().len(), 1);
        assert!(t.current_ended());
    }

    #[test]
    fn test_scenario_c_newer_run_crashes_previous_and_starts() {
        let mut t = tracker();
        assert!(ingest(&mut t, &ongoing(17215)).is_empty());

        let cmds = ingest(&mut t, &ongoing(17216));
        assert_eq!(cmds.len(), 2);
        assert!(matches!(&cmds[0], PostCommand::End { snapshot, crashed: true } if snapshot.run_number() == 17215));
        assert!(matches!(&cmds[1], PostCommand::Start(s) if s.run_number() == 17216));
        assert!(t.seen().contains(17215));
        assert!(!t.seen().contains(17216));
    }

    #[test]
    fn test_scenario_d_concluded_first_observation_reports_end_only() {
        for bad_end in [false, true] {
            let mut t = tracker();
            let cmds = ingest(&mut t, &ended(50, bad_end));
            assert_eq!(cmds.len(), 1);
            assert!(matches!(&cmds[0], PostCommand::End { crashed, .. } if *crashed == bad_end));
            assert!(t.seen().contains(50));
        }
    }

    #[test]
    fn test_scenario_e_stale_run_ignored_and_not_seen() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(200));
        assert!(ingest(&mut t, &ongoing(9)).is_empty());
        assert!(ingest(&mut t, &ended(9, false)).is_empty());
        assert!(!t.seen().contains(9));
        assert_eq!(t.current_run().map(RunSnapshot::run_number), Some(200));
    }

    #[test]
    fn test_repeated_in_progress_updates_emit_nothing() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(3));
        for _ in 0..5 {
            assert!(ingest(&mut t, &ongoing(3)).is_empty());
        }
        let _ = ingest(&mut t, &ended(3, false));
        assert!(ingest(&mut t, &ended(3, false)).is_empty());
    }

    #[test]
    fn test_newer_run_after_clean_end_only_starts() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(10));
        let _ = ingest(&mut t, &ended(10, false));

        let cmds = ingest(&mut t, &ongoing(11));
        assert_eq!(cmds.len(), 1);
        assert!(cmds[0].is_start());
    }

    #[test]
    fn test_newer_concluded_run_after_unfinished_emits_two_ends() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(10));

        let cmds = ingest(&mut t, &ended(12, true));
        assert_eq!(cmds.len(), 2);
        assert!(matches!(&cmds[0], PostCommand::End { snapshot, crashed: true } if snapshot.run_number() == 10));
        assert!(matches!(&cmds[1], PostCommand::End { snapshot, crashed: true } if snapshot.run_number() == 12));
        assert!(t.seen().contains(10) && t.seen().contains(12));
    }

    #[test]
    fn test_start_suppressed_for_runs_older_than_tracker() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(1));

        let early = RunSnapshot::builder(2)
            .start_time(t0() - Duration::hours(1))
            .build()
            .unwrap();
        let cmds = ingest(&mut t, &early);
        assert_eq!(cmds.len(), 1, "only the crash of run 1 is reported");
        assert!(cmds[0].is_end());

        // Its end is still reported later.
        let early_end = RunSnapshot::builder(2)
            .start_time(t0() - Duration::hours(1))
            .end_time(t0())
            .build()
            .unwrap();
        let cmds = ingest(&mut t, &early_end);
        assert!(matches!(&cmds[..], [PostCommand::End { crashed: false, .. }]));
    }

    #[test]
    fn test_dev_and_floor_runs_never_emit() {
        let mut t = RunLifecycleTracker::new(TrackerConfig {
            seen_capacity: 10,
            min_run: 1000,
            started_at: t0(),
        })
        .unwrap();

        let dev = RunSnapshot::builder(2000)
            .start_time(t0() + Duration::minutes(1))
            .dev_run(true)
            .build()
            .unwrap();
        assert!(!t.accepts(&dev));
        assert!(ingest(&mut t, &dev).is_empty());
        assert!(t.current_run().is_none(), "rejected snapshots never reach state");

        assert!(ingest(&mut t, &ended(999, false)).is_empty());
        assert!(t.current_run().is_none());

        assert_eq!(ingest(&mut t, &ended(1000, false)).len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_config_error() {
        let err = RunLifecycleTracker::new(TrackerConfig {
            seen_capacity: 0,
            ..TrackerConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCapacity { capacity: 0 }));
    }

    #[test]
    fn test_commands_size_hint() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(1));
        let cmds = t.ingest(&ongoing(2));
        assert_eq!(cmds.len(), 2);
    }

    /// Deterministic xorshift stream so property checks are reproducible.
    struct Rng(u64);

    impl Rng {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }

        fn below(&mut self, n: u64) -> u64 {
            self.next() % n
        }
    }

    /// Random poll stream: mostly-increasing runs with repeats, jitter,
    /// late ends, skipped ends, dev runs, and runs below the floor.
    fn random_stream(seed: u64, len: usize) -> Vec<RunSnapshot> {
        let mut rng = Rng(seed);
        let mut head: RunNumber = 50;
        let mut out = Vec::with_capacity(len);

        for _ in 0..len {
            if rng.below(4) == 0 {
                head += 1 + rng.below(2);
            }
            let jitter = rng.below(6);
            let run = head.saturating_sub(if rng.below(5) == 0 { jitter } else { 0 });

            let snap = match rng.below(10) {
                0 => RunSnapshot::builder(run)
                    .start_time(t0() + Duration::minutes(1))
                    .dev_run(true)
                    .build()
                    .unwrap(),
                1 | 2 | 3 => ended(run, rng.below(3) == 0),
                _ => ongoing(run),
            };
            out.push(snap);
        }
        out
    }

    #[test]
    fn test_property_at_most_once_and_start_before_end() {
        for seed in 1..=40u64 {
            let mut t = RunLifecycleTracker::new(TrackerConfig {
                seen_capacity: 1000,
                min_run: 48,
                started_at: t0(),
            })
            .unwrap();

            let mut starts: HashMap<RunNumber, usize> = HashMap::new();
            let mut ends: HashMap<RunNumber, usize> = HashMap::new();
            let mut order = 0usize;

            for snap in random_stream(seed, 2_000) {
                for cmd in t.ingest(&snap) {
                    order += 1;
                    assert!(!cmd.snapshot().dev_run(), "seed {seed}: dev run reported");
                    assert!(cmd.run_number() >= 48, "seed {seed}: floor violated");
                    let slot = if cmd.is_start() { &mut starts } else { &mut ends };
                    assert!(
                        slot.insert(cmd.run_number(), order).is_none(),
                        "seed {seed}: duplicate {cmd}"
                    );
                }
            }

            for (run, start_at) in &starts {
                if let Some(end_at) = ends.get(run) {
                    assert!(start_at < end_at, "seed {seed}: run {run} ended before start");
                }
            }
        }
    }

    #[test]
    fn test_property_seen_bounded_by_capacity() {
        let mut t = RunLifecycleTracker::new(TrackerConfig {
            seen_capacity: 25,
            min_run: 0,
            started_at: t0(),
        })
        .unwrap();

        for run in 0..500 {
            let _ = t.ingest(&ongoing(run));
            let _ = t.ingest(&ended(run, false));
            assert!(t.seen().len() <= 25);
        }
        assert_eq!(t.seen().len(), 25);
    }

    #[test]
    fn test_seen_runs_never_emit_again() {
        let mut t = tracker();
        let _ = ingest(&mut t, &ongoing(1));
        let _ = ingest(&mut t, &ended(1, false));
        let _ = ingest(&mut t, &ongoing(2));

        // Run 1 is finalized; neither ongoing nor ended snapshots re-emit.
        assert!(ingest(&mut t, &ongoing(1)).is_empty());
        assert!(ingest(&mut t, &ended(1, true)).is_empty());
    }
}
