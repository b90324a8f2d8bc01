//! Sweep demo
//!
//! Runs a full sweep and writes every found record to a JSONL file:
//! - Loading configuration from an optional JSON file
//! - Subscribing to progress events
//! - Stopping cleanly on Ctrl+C after the current batch
//!
//! ```bash
//! RUST_LOG=sweep_dl=debug cargo run --example sweep -- sweep.json
//! ```

use std::sync::Arc;
use sweep_dl::{Config, Event, JsonlFileSink, Sweeper, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let sink = Arc::new(JsonlFileSink::from_config(&config.sink).await?);
    println!("Writing records to {}", sink.path().display());
    let sweeper = Sweeper::new(config, sink)?;

    let mut events = sweeper.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::BatchCompleted {
                    first_id,
                    last_id,
                    tally,
                    consecutive_failures,
                    total_collected,
                } => {
                    println!(
                        "Batch {}..={}: {} found, {} absent, {} failed (empty streak {}, total {})",
                        first_id,
                        last_id,
                        tally.collected,
                        tally.absent,
                        tally.failed,
                        consecutive_failures,
                        total_collected
                    );
                }
                Event::SweepStopped {
                    reason,
                    total_collected,
                } => {
                    println!("Sweep stopped ({reason}) with {total_collected} records");
                }
                _ => {}
            }
        }
    });

    let summary = run_with_shutdown(&sweeper).await?;
    println!(
        "Collected {} records in {} batches; resume from ID {}",
        summary.total_collected, summary.batches_completed, summary.next_id
    );
    if summary.sink_failures > 0 {
        println!("{} records could not be written", summary.sink_failures);
    }

    Ok(())
}
