//! Derived match events and the channel plumbing between processors.
//!
//! - `types`: the `MatchEvent` values the tracker produces
//! - `channels`: typed mpsc handles connecting the poll driver to the notifier
//! - `render`: turning a cycle's events into sink-ready message text

pub mod channels;
pub mod render;
pub mod types;

pub use channels::{EventBatchReceiver, EventBatchSender, event_batch_channel};
pub use types::{EventBatch, GoalKind, MatchEvent, Scorer};
