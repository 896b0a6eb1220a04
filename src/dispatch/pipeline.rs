//! # Per-sink consumption loop.
//!
//! A [`Pipeline`] owns one sink and the receiving end of its queue.
//!
//! ```text
//! loop {
//!   ├─► wait for: stop token cancelled ─► exit ("cancelled")
//!   │             queue closed & empty ─► exit ("drained")
//!   │             next snapshot
//!   ├─► sink.filter(snapshot)  ── false ─► SnapshotDropped
//!   ├─► sink.deliver(snapshot) ── Ok    ─► Delivered
//!   │                          └─ Err   ─► DeliveryFailed (logged, dropped)
//!   └─► panic in filter/deliver         ─► SinkPanicked (loop continues)
//! }
//! ```
//!
//! ## Rules
//! - Strictly sequential: one snapshot's filter + deliver completes before the next dequeue.
//! - The stop token is only observed between snapshots; an in-flight delivery finishes.
//! - Waiting on an empty queue parks the task (no polling interval).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Sink;
use crate::events::{Bus, Event, EventKind};
use crate::run::RunSnapshot;

/// Outcome of a single filter + deliver step.
enum Step {
    Dropped,
    Delivered,
    Failed(String),
}

/// One sink with its queue, driven by a dedicated task.
pub(crate) struct Pipeline {
    name: Arc<str>,
    sink: Box<dyn Sink>,
    rx: mpsc::UnboundedReceiver<Arc<RunSnapshot>>,
    token: CancellationToken,
    bus: Bus,
}

impl Pipeline {
    pub(crate) fn new(
        name: Arc<str>,
        sink: Box<dyn Sink>,
        rx: mpsc::UnboundedReceiver<Arc<RunSnapshot>>,
        token: CancellationToken,
        bus: Bus,
    ) -> Self {
        Self {
            name,
            sink,
            rx,
            token,
            bus,
        }
    }

    /// Runs until cancelled or until the queue is closed and drained.
    pub(crate) async fn run(mut self) {
        tracing::debug!(sink = %self.name, "pipeline started");

        let reason = loop {
            let snapshot = tokio::select! {
                biased;
                _ = self.token.cancelled() => break "cancelled",
                next = self.rx.recv() => match next {
                    Some(snapshot) => snapshot,
                    None => break "drained",
                },
            };
            self.process(&snapshot).await;
        };

        tracing::debug!(sink = %self.name, reason, "pipeline stopped");
        self.bus.publish(
            Event::new(EventKind::PipelineStopped)
                .with_sink(Arc::clone(&self.name))
                .with_reason(reason),
        );
    }

    async fn process(&mut self, snapshot: &RunSnapshot) {
        let run = snapshot.run_number();
        let name = &self.name;
        let sink = &mut self.sink;

        let step = AssertUnwindSafe(async {
            if !sink.filter(snapshot) {
                return Step::Dropped;
            }
            match sink.deliver(snapshot).await {
                Ok(()) => Step::Delivered,
                Err(err) => {
                    tracing::warn!(sink = %name, run, error = %err, "delivery failed; snapshot dropped");
                    Step::Failed(format!("{}: {err}", err.as_label()))
                }
            }
        })
        .catch_unwind()
        .await;

        let event = match step {
            Ok(Step::Dropped) => {
                tracing::trace!(sink = %self.name, run, "snapshot filtered out");
                Event::new(EventKind::SnapshotDropped)
            }
            Ok(Step::Delivered) => {
                tracing::debug!(sink = %self.name, run, "snapshot delivered");
                Event::new(EventKind::Delivered)
            }
            Ok(Step::Failed(reason)) => Event::new(EventKind::DeliveryFailed).with_reason(reason),
            Err(panic_err) => {
                let info = panic_message(panic_err.as_ref());
                tracing::error!(sink = %self.name, run, panic = %info, "sink panicked");
                Event::new(EventKind::SinkPanicked).with_reason(info)
            }
        };

        self.bus
            .publish(event.with_sink(Arc::clone(&self.name)).with_run(run));
    }
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
