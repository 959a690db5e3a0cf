//! Synthetic event producer
//!
//! Stands in for a real change-data-capture source during demos and tests:
//!
//! - [`seed`] pre-loads the log with a few user records
//! - [`spawn_simulator`] publishes random worker-change events every few
//!   seconds until cancelled
//!
//! The simulator only ever talks to the broadcaster through `publish`, the
//! same way a production producer would.

pub mod config;
pub mod generator;
pub mod runner;

pub use config::SimulatorConfig;
pub use generator::{seed_events, WorkerEventGenerator};
pub use runner::{run, seed, spawn_simulator};
