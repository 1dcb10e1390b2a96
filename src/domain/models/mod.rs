pub mod chain;
pub mod eblock;
pub mod entry;
pub mod queue;
pub mod status;

pub use chain::{Chain, ChainFilter, ChainPatch, WORKER_FINISHED, WORKER_UNCLAIMED};
pub use eblock::EBlock;
pub use entry::Entry;
pub use queue::{NewQueueItem, QueueAction, QueueItem, QueueItemPatch, QueueParams};
pub use status::{Status, ZERO_HASH};
