//! # Non-blocking fan-out of run snapshots to independent sinks.
//!
//! [`FanoutDispatcher`] replicates each published [`RunSnapshot`] onto every
//! sink's queue without waiting for delivery.
//!
//! ## Architecture
//! ```text
//! publish(snapshot)
//!     │                         (Arc-clone per sink)
//!     ├──► [queue 1] ──► pipeline 1 ──► filter ─► deliver  (console)
//!     │   (unbounded)
//!     ├──► [queue 2] ──► pipeline 2 ──► filter ─► deliver  (shell)
//!     │   (unbounded)
//!     └──► [queue N] ──► pipeline N ──► filter ─► deliver  (logbook: tracker + rate gate)
//!                             │
//!                             └──► Bus: Delivered / DeliveryFailed / SnapshotDropped / ...
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `publish()` never waits on a sink.
//! - **Isolation**: a slow, failing, or panicking sink only affects its own queue.
//! - **Per-sink FIFO**: each sink sees snapshots in publish order.
//! - **No cross-sink ordering**: sink A may handle snapshot N while B handles N+5.
//! - **No backpressure**: queues are unbounded; a wedged sink accumulates memory.
//!
//! ## Lifecycle
//! ```text
//! builder().with_sink(..).build() ──► publish()* ──► start() ──► publish()* ──► stop(mode)
//!                                     (buffered)                                 ├─ Drain: finish queued
//!                                                                                └─ Immediate: skip queued
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::pipeline::Pipeline;
use crate::dispatch::{Sink, signal};
use crate::error::ConfigError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::StopMode;
use crate::run::RunSnapshot;
use crate::sinks::{Services, build_sinks};

/// Default capacity of the event bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Producer side of one sink's queue.
struct Lane {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Arc<RunSnapshot>>,
}

/// Fan-out coordinator: one queue and one pipeline task per sink.
pub struct FanoutDispatcher {
    lanes: Vec<Lane>,
    pending: Vec<Pipeline>,
    workers: Vec<JoinHandle<()>>,
    token: CancellationToken,
    bus: Bus,
    stop_mode: StopMode,
}

impl FanoutDispatcher {
    /// Starts building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Builds a dispatcher with the sinks described by `cfg`.
    ///
    /// # Errors
    /// Any [`ConfigError`] from validation or sink construction.
    pub fn from_config(cfg: &Config, services: &Services) -> Result<Self, ConfigError> {
        let sinks = build_sinks(cfg, services)?;
        Ok(Self::builder()
            .with_sinks(sinks)
            .bus_capacity(cfg.bus_capacity)
            .stop_mode(cfg.stop)
            .build())
    }

    /// Spawns one pipeline task per sink. Calling it again is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for pipeline in self.pending.drain(..) {
            self.workers.push(tokio::spawn(pipeline.run()));
        }
        tracing::info!(sinks = self.workers.len(), "dispatcher started");
    }

    /// Enqueues `snapshot` for every sink and returns immediately.
    ///
    /// A sink whose pipeline is gone gets a `QueueClosed` event instead.
    pub fn publish(&self, snapshot: RunSnapshot) {
        let run = snapshot.run_number();
        let snapshot = Arc::new(snapshot);

        for lane in &self.lanes {
            if lane.sender.send(Arc::clone(&snapshot)).is_err() {
                tracing::warn!(sink = %lane.name, run, "sink queue closed; snapshot dropped");
                self.bus.publish(
                    Event::new(EventKind::QueueClosed)
                        .with_sink(Arc::clone(&lane.name))
                        .with_run(run),
                );
            }
        }
    }

    /// Stops all pipelines and waits for them to exit.
    ///
    /// In-flight deliveries are never interrupted; see [`StopMode`].
    pub async fn stop(self, mode: StopMode) {
        tracing::info!(mode = mode.as_str(), "dispatcher stopping");
        self.bus
            .publish(Event::new(EventKind::StopRequested).with_reason(mode.as_str()));

        if mode == StopMode::Immediate {
            self.token.cancel();
        }
        drop(self.lanes);
        drop(self.pending);

        for handle in self.workers {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "pipeline task failed");
            }
        }
        tracing::info!("dispatcher stopped");
    }

    /// Waits for a termination signal, then stops with the configured mode.
    pub async fn stop_on_signal(self) -> std::io::Result<()> {
        self.stop_when(signal::wait_for_termination()).await
    }

    /// Waits for `shutdown` to name its trigger, then stops with the configured mode.
    ///
    /// An `Err` from `shutdown` is returned as is; the dispatcher is dropped
    /// and its pipelines drain on their own.
    pub async fn stop_when<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = std::io::Result<&'static str>>,
    {
        let trigger = shutdown.await?;
        tracing::info!(trigger, "shutdown requested");
        let mode = self.stop_mode;
        self.stop(mode).await;
        Ok(())
    }

    /// Receiver for pipeline events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Names of the configured sinks, in configuration order.
    pub fn sink_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.lanes.iter().map(|lane| lane.name.as_ref())
    }

    /// True once [`start`](Self::start) has spawned the pipelines.
    pub fn is_started(&self) -> bool {
        self.pending.is_empty() && !self.workers.is_empty()
    }

    pub fn stop_mode(&self) -> StopMode {
        self.stop_mode
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True if there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

/// Builder for [`FanoutDispatcher`].
pub struct DispatcherBuilder {
    sinks: Vec<Box<dyn Sink>>,
    bus_capacity: usize,
    stop_mode: StopMode,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self {
            sinks: Vec::new(),
            bus_capacity: DEFAULT_BUS_CAPACITY,
            stop_mode: StopMode::default(),
        }
    }

    /// Adds one sink.
    pub fn with_sink(mut self, sink: impl Sink) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Adds already boxed sinks, e.g. from [`build_sinks`].
    pub fn with_sinks(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Event bus capacity (min 1).
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Mode used by [`FanoutDispatcher::stop_on_signal`].
    pub fn stop_mode(mut self, mode: StopMode) -> Self {
        self.stop_mode = mode;
        self
    }

    /// Creates the queues. Pipelines are spawned by [`FanoutDispatcher::start`].
    pub fn build(self) -> FanoutDispatcher {
        let bus = Bus::new(self.bus_capacity);
        let token = CancellationToken::new();
        let mut lanes = Vec::with_capacity(self.sinks.len());
        let mut pending = Vec::with_capacity(self.sinks.len());

        for sink in self.sinks {
            let name: Arc<str> = Arc::from(sink.name());
            let (tx, rx) = mpsc::unbounded_channel();
            pending.push(Pipeline::new(
                Arc::clone(&name),
                sink,
                rx,
                token.clone(),
                bus.clone(),
            ));
            lanes.push(Lane { name, sender: tx });
        }

        FanoutDispatcher {
            lanes,
            pending,
            workers: Vec::new(),
            token,
            bus,
            stop_mode: self.stop_mode,
        }
    }
}
