//! # Fan-out demo
//!
//! Builds the dispatcher from a TOML config and feeds a short synthetic run
//! sequence to three sinks:
//! - console: prints every snapshot
//! - shell: runs `echo` with the run number and components
//! - logbook: an in-memory logbook that prints the entries it receives
//!
//! The sequence covers a normal start/end, a run that never reports its end
//! (closed as crashed when the next one appears) and a dev run (ignored by
//! the logbook).
//!
//! ## Run
//! ```bash
//! RUST_LOG=runvisor=debug cargo run --example fanout
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use runvisor::{
    Config, DeliveryError, EntryId, EventKind, FanoutDispatcher, LogbookEntry, LogbookService,
    RunSnapshot, Services,
};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
stop = "drain"

[[sinks]]
kind = "console"

[[sinks]]
kind = "shell"
name = "echo"
command = "echo"
forward = ["run_number", "components"]

[[sinks]]
kind = "logbook"
min_interval_secs = 0.2
"#;

/// Prints entries instead of posting them.
#[derive(Default)]
struct PrintingLogbook {
    next_id: AtomicU64,
}

#[async_trait]
impl LogbookService for PrintingLogbook {
    async fn create_entry(&self, entry: &LogbookEntry) -> Result<EntryId, DeliveryError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
        println!(
            "[logbook] #{id} {} ({}) reply_to={:?} {}",
            entry.form,
            entry.category,
            entry.reply_to,
            fields.join(" ")
        );
        Ok(id.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = Config::from_toml_str(CONFIG)?;
    let services = Services::default().with_logbook(Arc::new(PrintingLogbook::default()));
    let mut dispatcher = FanoutDispatcher::from_config(&cfg, &services)?;
    println!("sinks: {}", dispatcher.sink_names().collect::<Vec<_>>().join(", "));
    let started = Utc::now();

    let mut events = dispatcher.subscribe();
    let listener = tokio::spawn(async move {
        let (mut delivered, mut dropped, mut failed) = (0u32, 0u32, 0u32);
        while let Ok(ev) = events.recv().await {
            match ev.kind {
                EventKind::Delivered => delivered += 1,
                EventKind::SnapshotDropped => dropped += 1,
                EventKind::DeliveryFailed | EventKind::SinkPanicked => failed += 1,
                _ => {}
            }
        }
        (delivered, dropped, failed)
    });

    dispatcher.start();

    let at = |minutes: i64| started + ChronoDuration::minutes(minutes);
    let snapshots = [
        RunSnapshot::builder(17215).start_time(at(1)).build()?,
        RunSnapshot::builder(17216)
            .start_time(at(2))
            .configuration("bnbTest")
            .components(["tpc01", "pmt01"])
            .build()?,
        RunSnapshot::builder(17216)
            .start_time(at(2))
            .end_time(at(20))
            .configuration("bnbTest")
            .components(["tpc01", "pmt01"])
            .build()?,
        RunSnapshot::builder(17217)
            .start_time(at(21))
            .configuration("cosmics")
            .components(["tpc01"])
            .build()?,
        RunSnapshot::builder(17218)
            .start_time(at(40))
            .configuration("scratch")
            .dev_run(true)
            .build()?,
        RunSnapshot::builder(17219)
            .start_time(at(45))
            .configuration("bnbTest")
            .components(["tpc01", "pmt01", "crt01"])
            .build()?,
    ];
    for snapshot in snapshots {
        dispatcher.publish(snapshot);
    }

    dispatcher.stop(cfg.stop).await;

    match tokio::time::timeout(Duration::from_secs(1), listener).await {
        Ok(Ok((delivered, dropped, failed))) => {
            println!();
            println!("Events:");
            println!(" ├─► Delivered: {delivered}");
            println!(" ├─► Dropped:   {dropped}");
            println!(" └─► Failed:    {failed}");
        }
        _ => println!("event listener did not finish"),
    }
    Ok(())
}
