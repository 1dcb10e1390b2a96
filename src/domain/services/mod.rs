pub mod chain_service;
pub mod entry_service;
pub mod queue_service;

pub use chain_service::{ChainService, CreatedChain, EntryPage};
pub use entry_service::EntryService;
pub use queue_service::{ClearOutcome, ProcessOutcome, QueueService};
