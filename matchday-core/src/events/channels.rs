//! Event channel factory and handles.

use super::types::EventBatch;
use tokio::sync::mpsc;

/// Buffer size for the tracker → notifier channel.
///
/// One batch per poll cycle; the buffer only matters when every sink is slow
/// enough to back the notifier up across multiple cycles.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sender handle for per-cycle event batches.
pub type EventBatchSender = mpsc::Sender<EventBatch>;
/// Receiver handle for per-cycle event batches.
pub type EventBatchReceiver = mpsc::Receiver<EventBatch>;

/// Create the tracker → notifier channel.
pub fn event_batch_channel() -> (EventBatchSender, EventBatchReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
