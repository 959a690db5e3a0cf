//! Simulator task
//!
//! Publishes generated events into a broadcaster at a jittered interval until
//! cancelled, the event budget runs out, or the broadcaster shuts down.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;
use crate::error::{Error, Result};

use super::config::SimulatorConfig;
use super::generator::{seed_events, worker_id, WorkerEventGenerator};

/// Publish the startup seed events, returning how many were accepted
pub fn seed(broadcaster: &Broadcaster) -> Result<usize> {
    let mut count = 0;
    for event in seed_events(Utc::now()) {
        broadcaster.publish(event)?;
        count += 1;
    }
    tracing::info!(events = count, "Event log seeded");
    Ok(count)
}

/// Spawn the simulator
///
/// The task resolves to the number of events it published.
pub fn spawn_simulator(
    broadcaster: Arc<Broadcaster>,
    config: SimulatorConfig,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move { run(&broadcaster, &config, &cancel).await })
}

/// Run the simulator loop on the current task
pub async fn run(
    broadcaster: &Broadcaster,
    config: &SimulatorConfig,
    cancel: &CancellationToken,
) -> u64 {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let generator = WorkerEventGenerator::new(config.canned_ratio);
    let mut published = 0u64;

    if !pause(config.initial_delay, cancel).await {
        return published;
    }

    loop {
        let event = generator.next_event(&mut rng, Utc::now());
        let operation = event.operation_type.clone();
        let worker = worker_id(&event).unwrap_or("unknown").to_string();

        match broadcaster.publish(event) {
            Ok(stored) => {
                published += 1;
                tracing::info!(
                    sequence = stored.sequence,
                    operation = %operation,
                    worker = %worker,
                    "Added simulated worker event"
                );
            }
            Err(Error::Closed) => {
                tracing::debug!("Broadcaster closed, simulator stopping");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Simulated event rejected");
            }
        }

        if config.max_events > 0 && published >= config.max_events {
            break;
        }

        let wait = jittered(&mut rng, config.min_interval, config.max_interval);
        if !pause(wait, cancel).await {
            break;
        }
    }

    tracing::info!(published = published, "Simulator stopped");
    published
}

fn jittered<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rng.gen_range(0..=span))
}

/// Sleep unless cancelled first; returns `false` on cancellation
async fn pause(wait: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    }
}
