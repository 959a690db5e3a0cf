//! Simulated change feed printed as server-sent events
//!
//! Run with: cargo run --example simulated_feed [MAX_EVENTS]
//!
//! Seeds the log with a few user records, starts the worker-change simulator,
//! and streams every event to stdout as SSE frames. Press Ctrl+C to stop.
//!
//! Set `RUST_LOG=changefeed=debug` for more detail on stderr.

use std::sync::Arc;
use std::time::Duration;

use changefeed::simulator::{seed, spawn_simulator};
use changefeed::sse::encode_snapshot;
use changefeed::{Broadcaster, BroadcasterConfig, SimulatorConfig, SseSink};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let max_events = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u64>()?,
        None => 0,
    };

    // Logs go to stderr so stdout carries only SSE frames
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("changefeed=info".parse()?),
        )
        .init();

    let config = BroadcasterConfig::default()
        .max_events(1000)
        .max_age(Duration::from_secs(24 * 60 * 60))
        .trim_interval(Duration::from_secs(30));
    let broadcaster = Arc::new(Broadcaster::with_config(config));
    seed(&broadcaster)?;

    let cancel = CancellationToken::new();
    let trim_task = broadcaster.spawn_trim_task();
    let simulator = spawn_simulator(
        Arc::clone(&broadcaster),
        SimulatorConfig::default().max_events(max_events),
        cancel.clone(),
    );

    let (mut subscription, backlog) = broadcaster.join_with_backlog(64);

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&encode_snapshot(&backlog)?).await?;
    stdout.flush().await?;

    let mut sink = SseSink::new(stdout);
    let forward_cancel = cancel.clone();
    let forwarder = tokio::spawn(async move {
        let result = subscription.forward(&mut sink, &forward_cancel).await;
        (result, subscription.stats())
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nShutting down...");
        }
        result = simulator => {
            let published = result?;
            eprintln!("Simulator finished after {} events", published);
            // Let the subscriber drain what is already queued
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    cancel.cancel();
    broadcaster.shutdown();
    trim_task.abort();

    let (result, stats) = forwarder.await?;
    let forwarded = result?;
    let totals = broadcaster.stats();

    eprintln!(
        "Forwarded {} events (dropped {}); log holds {} events, last sequence {}",
        forwarded,
        stats.dropped,
        totals.log_len,
        totals.last_sequence
    );

    Ok(())
}
