//! Long-running processors composing the pipeline:
//!
//! - `PollDriver`: fetches snapshots on a jittered interval, drives the
//!   tracker, emits event batches
//! - `Notifier`: renders batches and fans deliveries out to the sinks
//!
//! Both expose a `run()` that owns the processor until shutdown.

pub mod notifier;
pub mod poll_driver;

pub use notifier::{DeliveryError, Notifier};
pub use poll_driver::{LifetimeMode, PollConfig, PollDriver};
